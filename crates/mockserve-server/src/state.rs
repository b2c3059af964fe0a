//! Shared application state.

use mockserve_batch::{BatchConfig, Coordinator};
use mockserve_core::MockServeConfig;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub config: MockServeConfig,
    pub coordinator: Coordinator,
}

impl AppState {
    /// Build state and start the stats coordinator. Requires a tokio runtime.
    pub fn new(config: MockServeConfig) -> mockserve_core::Result<Self> {
        let coordinator = Coordinator::new(BatchConfig::from(&config.batch))?;
        Ok(Self {
            config,
            coordinator,
        })
    }
}
