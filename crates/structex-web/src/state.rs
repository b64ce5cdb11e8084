use std::sync::Arc;

use structex_core::{ChatModel, PdfBackend};

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub backend: Arc<dyn PdfBackend>,
    pub model: Arc<dyn ChatModel>,
}
