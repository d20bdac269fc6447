//! sakkat-admin - Typed administration client for the Sakkat Soppu farm-delivery backend
//!
//! This crate provides everything the admin dashboard does apart from rendering:
//! - Credentialed HTTP client with server-message error surfacing and 401 interception
//! - One typed API module per backend resource (orders, products, farmers, coupons, ...)
//! - Session context with public-route handling
//! - Media upload forms that mix hosted URLs with new local files, with upload progress
//! - Paged list state with optimistic patches, and CSV export

pub mod api;
pub mod config;
pub mod export;
pub mod listing;
pub mod media;
pub mod session;
#[cfg(test)]
pub mod testutil;

use api::{ApiClient, ApiError, UploadProgress};
use config::Config;

/// Shared application state
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Config,
    pub client: ApiClient,
    pub progress: UploadProgress,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, ApiError> {
        let client = ApiClient::new(&config.api)?;
        Ok(Self {
            config,
            client,
            progress: UploadProgress::new(),
        })
    }
}
