use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use llmrelay_transform::canonical::{ModelOutput, ModelRef, ModelRequest, SourceEvent};

use crate::error::RelayError;

pub type SourceEventStream = BoxStream<'static, SourceEvent>;

/// A provider backend that produces semantic events for one request.
///
/// Dropping the returned stream must cancel the underlying provider call.
#[async_trait]
pub trait ModelStreamSource: Send + Sync {
    fn name(&self) -> &str;

    /// Sources that only answer in one piece return `false`; the relay then
    /// calls [`generate`](Self::generate) and replays the output as events.
    fn supports_streaming(&self) -> bool {
        true
    }

    /// Resolves credentials or other per-request configuration for `model`.
    /// Runs before any output is produced, so failures become JSON errors.
    async fn prepare(&self, _model: &str) -> Result<(), RelayError> {
        Ok(())
    }

    async fn stream(&self, request: ModelRequest) -> Result<SourceEventStream, RelayError>;

    async fn generate(&self, request: ModelRequest) -> Result<ModelOutput, RelayError>;
}

#[derive(Clone)]
pub struct ResolvedModel {
    pub source: Arc<dyn ModelStreamSource>,
    pub model: String,
}

impl std::fmt::Debug for ResolvedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedModel")
            .field("source", &self.source.name())
            .field("model", &self.model)
            .finish()
    }
}

#[derive(Default)]
pub struct ProviderRegistry {
    sources: HashMap<String, Arc<dyn ModelStreamSource>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, source: Arc<dyn ModelStreamSource>) {
        self.sources.insert(source.name().to_string(), source);
    }

    pub fn get(&self, provider: &str) -> Option<Arc<dyn ModelStreamSource>> {
        self.sources.get(provider).cloned()
    }

    pub fn provider_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.sources.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn resolve(&self, model: &ModelRef) -> Result<ResolvedModel, RelayError> {
        let Some(source) = self.get(&model.provider) else {
            return Err(RelayError::ModelNotFound(model.to_string()));
        };
        source.prepare(&model.model).await?;
        Ok(ResolvedModel {
            source,
            model: model.model.clone(),
        })
    }
}
