use std::path::Path;
use std::sync::Arc;

use crate::ExtractError;
use crate::backend::{PdfBackend, load_document_text};
use crate::llm::ChatModel;
use crate::prompt::build_messages;
use crate::schema::{ExtractionRecord, FieldSchema};

/// Prompt `model` with the document and coerce its structured reply through `schema`.
pub async fn run_extraction_chain(
    document_text: &str,
    schema: &FieldSchema,
    model: &dyn ChatModel,
) -> Result<ExtractionRecord, ExtractError> {
    tracing::info!(
        schema = schema.name(),
        fields = schema.len(),
        model = model.name(),
        "running extraction chain"
    );

    let messages = build_messages(document_text);

    tracing::debug!("invoking model for structured output");
    let output = model.invoke_structured(&messages, schema).await?;
    tracing::debug!("model call finished");

    Ok(schema.coerce(&output)?)
}

/// Extract the requested fields from the PDF at `path`.
///
/// Text extraction is blocking and runs on the blocking thread pool.
pub async fn extract_from_pdf(
    path: &Path,
    schema: &FieldSchema,
    backend: Arc<dyn PdfBackend>,
    model: &dyn ChatModel,
) -> Result<ExtractionRecord, ExtractError> {
    let document_text = load_text_blocking(path, backend).await?;
    tracing::debug!(chars = document_text.len(), "PDF text loaded");

    run_extraction_chain(&document_text, schema, model).await
}

async fn load_text_blocking(
    path: &Path,
    backend: Arc<dyn PdfBackend>,
) -> Result<String, ExtractError> {
    let path = path.to_path_buf();
    let text = tokio::task::spawn_blocking(move || load_document_text(&path, backend.as_ref()))
        .await
        .map_err(|e| ExtractError::Task(e.to_string()))??;
    Ok(text)
}
