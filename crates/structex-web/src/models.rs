use std::collections::BTreeMap;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Per-field validation messages, serialized as `{"<field>": ["<message>", ...]}`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<&'static str, Vec<String>>);

impl ValidationErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }
}

impl IntoResponse for ValidationErrors {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, Json(self)).into_response()
    }
}

/// `{"detail": "..."}` body used for every non-validation error.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetail {
    pub detail: String,
}

pub fn detail_response(status: StatusCode, detail: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorDetail {
            detail: detail.into(),
        }),
    )
        .into_response()
}
