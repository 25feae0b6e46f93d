use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};

use crate::handler::{chat_completions_handler, health_handler, messages_handler, responses_handler};
use crate::orchestrator::Orchestrator;
use crate::provider::ProviderRegistry;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoreConfig {
    /// Bounds provider invocation plus streaming for one request.
    pub request_timeout: Duration,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

pub struct CoreState {
    pub orchestrator: Orchestrator,
}

pub struct Core {
    state: Arc<CoreState>,
}

impl Core {
    pub fn new(registry: ProviderRegistry, config: CoreConfig) -> Self {
        Self {
            state: Arc::new(CoreState {
                orchestrator: Orchestrator::new(Arc::new(registry), config),
            }),
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/v1/chat/completions", post(chat_completions_handler))
            .route("/v1/messages", post(messages_handler))
            .route("/v1/responses", post(responses_handler))
            .route("/health", get(health_handler))
            .with_state(self.state.clone())
    }

    pub fn state(&self) -> Arc<CoreState> {
        self.state.clone()
    }
}
