//! HTTP request handlers for the orchestrator API.
//!
//! - `backups` - tenant backup listing, creation, download, deletion and restore
//! - `common` - response envelope and error mapping
//! - `health` - liveness

pub mod backups;
pub mod common;
pub mod health;

pub use backups::*;
pub use health::*;
