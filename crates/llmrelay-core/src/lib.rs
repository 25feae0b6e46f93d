pub mod classify;
pub mod core;
pub mod error;
pub mod handler;
pub mod orchestrator;
pub mod provider;

pub use classify::{Classified, InboundBody, classify_request};
pub use self::core::{Core, CoreConfig, CoreState};
pub use error::RelayError;
pub use handler::REQUEST_ID_HEADER;
pub use orchestrator::{Orchestrator, Phase, RelayResponse};
pub use provider::{ModelStreamSource, ProviderRegistry, ResolvedModel, SourceEventStream};
