//! API server state

use std::sync::Arc;

use crate::config::AppConfig;
use crate::storage::StorageBackend;
use crate::upload::EchoService;

/// API server state
#[derive(Clone)]
pub struct AppState {
    /// Configuration the router was built from
    pub config: Arc<AppConfig>,

    /// Storage backend for uploaded files
    pub storage: Arc<dyn StorageBackend>,

    /// Upload echo service
    pub echo: Arc<EchoService>,

    /// OpenAPI document, built once at startup
    pub openapi: Arc<utoipa::openapi::OpenApi>,

    node_id: Arc<str>,
}

impl AppState {
    pub fn new(config: AppConfig, storage: Arc<dyn StorageBackend>, node_id: String) -> Self {
        let echo = Arc::new(EchoService::new(storage.clone(), config.echo_config()));
        let openapi = Arc::new(super::openapi::build(&config.app));

        Self {
            config: Arc::new(config),
            storage,
            echo,
            openapi,
            node_id: node_id.into(),
        }
    }

    /// Get this node's ID
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn debug(&self) -> bool {
        self.config.app.debug
    }
}
