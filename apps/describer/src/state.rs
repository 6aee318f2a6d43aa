use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::ChatModel;
use crate::pipeline::assembler::ExampleTables;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Chat backend. `LlmClient` in production, a canned model in tests.
    pub chat_model: Arc<dyn ChatModel>,
    pub config: Config,
    /// Few-shot example tables loaded at startup. Uploads may override them per request.
    pub examples: Option<Arc<ExampleTables>>,
}
