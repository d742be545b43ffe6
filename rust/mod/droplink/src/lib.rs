//! Droplink module: link-in-bio profiles for Pi Network pioneers.
//!
//! # Resources
//!
//! - **Profile**: public page addressed by a validated username
//! - **Link**: ordered outbound links, capped by plan
//! - **AnalyticsEvent**: views, clicks and shares; dashboard depth by plan
//! - **Tip**: Pi payments to a profile, approved and completed server-side
//! - **Forum**: categories, topics and replies
//! - **Session**: JWT issuance record from Pi sign-in
//!
//! # Usage
//!
//! ```ignore
//! use droplink::{DroplinkModule, service::DroplinkConfig};
//!
//! let module = DroplinkModule::new(sql, kv, Arc::new(SystemClock), DroplinkConfig::default())?;
//! let router = module.routes(); // absolute /api/... paths
//! ```

pub mod api;
pub mod model;
pub mod pi;
pub mod plan;
pub mod service;

use std::sync::Arc;

use axum::Router;
use tracing::warn;

use droplink_core::{Clock, Module, ServiceError};

use crate::pi::{HttpPiPlatform, MockPiPlatform, PiPlatform};
use crate::service::{DroplinkConfig, DroplinkService};

/// Droplink module implementing the Module trait.
pub struct DroplinkModule {
    service: Arc<DroplinkService>,
}

impl DroplinkModule {
    /// Create the module, choosing the Pi platform from `config.pi`.
    pub fn new(
        sql: Arc<dyn droplink_sql::SQLStore>,
        kv: Arc<dyn droplink_kv::KVStore>,
        clock: Arc<dyn Clock>,
        config: DroplinkConfig,
    ) -> Result<Self, ServiceError> {
        let pi: Arc<dyn PiPlatform> = if config.pi.mock_auth {
            warn!("Pi mock auth is enabled; any access token signs in");
            Arc::new(MockPiPlatform::new())
        } else {
            Arc::new(HttpPiPlatform::new(&config.pi).map_err(|e| ServiceError::Internal(e.to_string()))?)
        };
        Self::with_platform(sql, kv, pi, clock, config)
    }

    /// Create the module with an explicit Pi platform.
    pub fn with_platform(
        sql: Arc<dyn droplink_sql::SQLStore>,
        kv: Arc<dyn droplink_kv::KVStore>,
        pi: Arc<dyn PiPlatform>,
        clock: Arc<dyn Clock>,
        config: DroplinkConfig,
    ) -> Result<Self, ServiceError> {
        let service = DroplinkService::new(sql, kv, pi, clock, config).map_err(ServiceError::from)?;
        Ok(Self { service })
    }

    /// Get a reference to the underlying DroplinkService.
    pub fn service(&self) -> &Arc<DroplinkService> {
        &self.service
    }
}

impl Module for DroplinkModule {
    fn name(&self) -> &str {
        "droplink"
    }

    fn routes(&self) -> Router {
        api::build_router(self.service.clone())
    }
}
