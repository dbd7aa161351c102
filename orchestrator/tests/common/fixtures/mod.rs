//! This module provides reusable test utilities:
//! - Mock domain services (wiremock)
//! - Test configuration directories
//! - Common tenant data

// Allow unused code in test fixtures - not every test binary uses every helper
#![allow(dead_code)]
#![allow(unused_imports)]

pub mod mock_domain_service;
pub mod test_config;
pub mod test_data;

// Re-export commonly used items
pub use mock_domain_service::{unreachable_client, MockDomainService, MockPlatform};
pub use test_config::{TestConfig, TestConfigBuilder};
pub use test_data::*;
