use std::io::Write;
use std::sync::Arc;

use axum::Json;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tempfile::NamedTempFile;

use structex_core::{ExtractError, ExtractionRecord};

use crate::models::detail_response;
use crate::state::AppState;
use crate::upload::{self, ExtractionForm, UploadError};

/// `POST /api/v1/extract/`: pull the requested fields out of an uploaded PDF.
pub async fn extract(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    tracing::info!("received extraction request");

    let multipart = match multipart {
        Ok(m) => m,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "rejected non-multipart request");
            return detail_response(rejection.status(), rejection.body_text());
        }
    };

    let form = match upload::parse_extraction_form(multipart).await {
        Ok(form) => form,
        Err(UploadError::Invalid(errors)) => {
            tracing::warn!(?errors, "request validation failed");
            return errors.into_response();
        }
        Err(UploadError::Multipart(e)) => {
            tracing::warn!(error = %e, "failed to read multipart body");
            return detail_response(e.status(), e.body_text());
        }
    };

    tracing::info!(
        filename = %form.document.filename,
        fields = %form.field_string,
        "starting extraction"
    );

    match process(&state, &form).await {
        Ok(record) => {
            tracing::info!(
                filename = %form.document.filename,
                keys = ?record.keys().collect::<Vec<_>>(),
                "extraction complete"
            );
            (StatusCode::OK, Json(record)).into_response()
        }
        Err(e) => {
            tracing::error!(
                filename = %form.document.filename,
                error = %e,
                source = ?std::error::Error::source(&e),
                "extraction failed"
            );
            detail_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("An error occurred during extraction: {e}"),
            )
        }
    }
}

/// Spool the upload to a temp file, run the pipeline, then remove the file
/// whatever the outcome.
async fn process(state: &AppState, form: &ExtractionForm) -> Result<ExtractionRecord, ExtractError> {
    let data = form.document.data.clone();
    let temp = tokio::task::spawn_blocking(move || spool_to_temp_file(&data))
        .await
        .map_err(|e| ExtractError::Task(e.to_string()))??;
    let temp_path = temp.path().to_path_buf();
    tracing::debug!(path = %temp_path.display(), "temporary file created");

    let result = structex_core::extract_from_pdf(
        &temp_path,
        &form.schema,
        state.backend.clone(),
        state.model.as_ref(),
    )
    .await;

    match temp.close() {
        Ok(()) => tracing::debug!(path = %temp_path.display(), "cleaned up temporary file"),
        Err(e) => {
            tracing::warn!(path = %temp_path.display(), error = %e, "failed to remove temporary file")
        }
    }

    result
}

fn spool_to_temp_file(data: &[u8]) -> std::io::Result<NamedTempFile> {
    let mut temp = tempfile::Builder::new()
        .prefix("structex-")
        .suffix(".pdf")
        .tempfile()?;
    temp.write_all(data)?;
    temp.flush()?;
    Ok(temp)
}
