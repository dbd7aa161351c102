// File: orchestrator/src/http/mod.rs
//! Communication with the domain services that own tenant data
//!
//! Every domain service exposes the same two internal endpoints:
//!
//! ```text
//! Orchestrator ── GET  /internal/export  ──▶ Service   (x-internal-secret, x-tenant-id)
//!              ◀─ { success, data: { collection: [record] } }
//!
//! Orchestrator ── POST /internal/restore ──▶ Service   (same headers, body = collections)
//!              ◀─ { success, data: { collection: { restored, skipped } } }
//! ```
//!
//! In the single-store topology the local store stands in for the services
//! behind the same [`DomainServiceClient`] trait.

pub mod domain_client;

pub use domain_client::{build_http_client, DomainServiceClient, HttpDomainClient, LocalStoreClient};
