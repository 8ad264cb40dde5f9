//! Application state for the RAG server

use parking_lot::RwLock;
use std::sync::Arc;

use crate::config::RagConfig;
use crate::service::RagService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// The RAG service every route delegates to
    service: Arc<RagService>,
    /// Ready state
    ready: RwLock<bool>,
}

impl AppState {
    /// Wrap an already constructed service
    pub fn new(service: Arc<RagService>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                service,
                ready: RwLock::new(true),
            }),
        }
    }

    /// Get the RAG service
    pub fn service(&self) -> &Arc<RagService> {
        &self.inner.service
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        self.inner.service.config()
    }

    /// Check if the server is ready
    pub fn is_ready(&self) -> bool {
        *self.inner.ready.read()
    }

    /// Set ready state
    pub fn set_ready(&self, ready: bool) {
        *self.inner.ready.write() = ready;
    }
}
