//! Router-level tests for the extraction endpoint.
//!
//! The PDF backend and chat model are replaced with in-process doubles so no
//! MuPDF parsing or network traffic happens.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use structex_core::{BackendError, MockChatModel, PdfBackend};

use crate::state::AppState;
use crate::{EXTRACT_ROUTE, router};

const BOUNDARY: &str = "structex-test-boundary";
const TEST_PDF_CONTENT: &[u8] = b"%PDF-1.7\n1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\ntrailer\n<< /Root 1 0 R >>\n%%EOF";

/// Backend double that records the temp path it was handed and whether the
/// file existed at that moment.
struct RecordingBackend {
    result: Result<Vec<String>, String>,
    seen: Mutex<Vec<(PathBuf, bool)>>,
}

impl RecordingBackend {
    fn pages(pages: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(pages.iter().map(|p| p.to_string()).collect()),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            result: Err(message.to_string()),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn seen(&self) -> Vec<(PathBuf, bool)> {
        self.seen.lock().unwrap().clone()
    }
}

impl PdfBackend for RecordingBackend {
    fn extract_pages(&self, path: &Path) -> Result<Vec<String>, BackendError> {
        self.seen
            .lock()
            .unwrap()
            .push((path.to_path_buf(), path.exists()));
        self.result
            .clone()
            .map_err(BackendError::ExtractionError)
    }
}

fn app(backend: Arc<RecordingBackend>, model: Arc<MockChatModel>) -> Router {
    let state = Arc::new(AppState { backend, model });
    router(state, 10 * 1024 * 1024)
}

enum Part<'a> {
    File {
        name: &'a str,
        filename: &'a str,
        content_type: &'a str,
        data: &'a [u8],
    },
    Text {
        name: &'a str,
        value: &'a str,
    },
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::File {
                name,
                filename,
                content_type,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
            Part::Text { name, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}")
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn pdf_part(filename: &str) -> Part<'_> {
    Part::File {
        name: "document",
        filename,
        content_type: "application/pdf",
        data: TEST_PDF_CONTENT,
    }
}

fn extract_request(parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(EXTRACT_ROUTE)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn successful_data_extraction() {
    let expected = json!({
        "invoice_number": "INV-2025-456",
        "customer_name": "Acme Corp.",
        "total_amount": "500.00"
    });
    let backend = RecordingBackend::pages(&["This is document text for testing."]);
    let model = Arc::new(MockChatModel::returning(expected.clone()));

    let (status, body) = send(
        app(backend.clone(), model.clone()),
        extract_request(&[
            pdf_part("test_invoice.pdf"),
            Part::Text {
                name: "fields",
                value: "Invoice Number, Customer Name, Total Amount",
            },
        ]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, expected);
    assert_eq!(model.call_count(), 1);
    assert!(
        model.last_messages()[1]
            .content
            .contains("This is document text for testing.")
    );
}

#[tokio::test]
async fn missing_fields() {
    let backend = RecordingBackend::pages(&["text"]);
    let model = Arc::new(MockChatModel::returning(json!({})));

    let (status, body) = send(
        app(backend.clone(), model.clone()),
        extract_request(&[pdf_part("test.pdf")]),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"], json!(["This field is required."]));
    assert!(body.get("document").is_none());
    assert_eq!(model.call_count(), 0);
    assert!(backend.seen().is_empty());
}

#[tokio::test]
async fn invalid_file_type() {
    let backend = RecordingBackend::pages(&["text"]);
    let model = Arc::new(MockChatModel::returning(json!({})));

    let (status, body) = send(
        app(backend, model.clone()),
        extract_request(&[
            Part::File {
                name: "document",
                filename: "test_doc.txt",
                content_type: "text/plain",
                data: b"This is not a PDF.",
            },
            Part::Text {
                name: "fields",
                value: "Name",
            },
        ]),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["document"], json!(["Only PDF files are supported."]));
    assert_eq!(model.call_count(), 0);
}

#[tokio::test]
async fn missing_document_and_fields_report_both() {
    let backend = RecordingBackend::pages(&["text"]);
    let model = Arc::new(MockChatModel::returning(json!({})));

    let (status, body) = send(
        app(backend, model),
        extract_request(&[Part::Text {
            name: "notes",
            value: "ignored",
        }]),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({
            "document": ["No file was submitted."],
            "fields": ["This field is required."]
        })
    );
}

#[tokio::test]
async fn handles_missing_data_as_null() {
    let expected = json!({
        "name": "Acme Corp.",
        "total_amount": "100.00",
        "delivery_driver": null
    });
    let backend = RecordingBackend::pages(&["Acme Corp. owes 100.00"]);
    let model = Arc::new(MockChatModel::returning(expected.clone()));

    let (status, body) = send(
        app(backend, model),
        extract_request(&[
            pdf_part("doc.pdf"),
            Part::Text {
                name: "fields",
                value: "Name, Total Amount, Delivery Driver",
            },
        ]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["delivery_driver"], Value::Null);
    assert_eq!(body, expected);
}

#[tokio::test]
async fn response_has_exactly_the_requested_keys() {
    let backend = RecordingBackend::pages(&["text"]);
    // The model forgets one field and invents another.
    let model = Arc::new(MockChatModel::returning(json!({
        "customer_name": "Acme Corp.",
        "favourite_colour": "blue"
    })));

    let (status, body) = send(
        app(backend, model),
        extract_request(&[
            pdf_part("doc.pdf"),
            Part::Text {
                name: "fields",
                value: "Customer Name, Due-Date",
            },
        ]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "customer_name": "Acme Corp.", "due_date": null })
    );
}

#[tokio::test]
async fn numeric_model_value_is_500() {
    let backend = RecordingBackend::pages(&["Total: 500.00"]);
    let model = Arc::new(MockChatModel::returning(json!({ "total_amount": 500.00 })));

    let (status, body) = send(
        app(backend.clone(), model),
        extract_request(&[
            pdf_part("invoice.pdf"),
            Part::Text {
                name: "fields",
                value: "Total Amount",
            },
        ]),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.starts_with("An error occurred during extraction: schema mismatch"));
    assert!(detail.contains("total_amount"));

    let (path, _) = &backend.seen()[0];
    assert!(!path.exists());
}

#[tokio::test]
async fn temp_file_removed_after_success() {
    let backend = RecordingBackend::pages(&["text"]);
    let model = Arc::new(MockChatModel::returning(json!({ "name": "Acme" })));

    let (status, _) = send(
        app(backend.clone(), model),
        extract_request(&[
            pdf_part("doc.pdf"),
            Part::Text {
                name: "fields",
                value: "Name",
            },
        ]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let seen = backend.seen();
    assert_eq!(seen.len(), 1);
    let (path, existed) = &seen[0];
    assert!(existed, "temp file should exist while the backend reads it");
    assert!(!path.exists(), "temp file should be removed after the response");
}

#[tokio::test]
async fn model_failure_is_500_and_cleans_up() {
    let backend = RecordingBackend::pages(&["text"]);
    let model = Arc::new(MockChatModel::failing("upstream unavailable"));

    let (status, body) = send(
        app(backend.clone(), model),
        extract_request(&[
            pdf_part("doc.pdf"),
            Part::Text {
                name: "fields",
                value: "Name",
            },
        ]),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.starts_with("An error occurred during extraction: "));
    assert!(detail.contains("upstream unavailable"));

    let (path, _) = &backend.seen()[0];
    assert!(!path.exists());
}

#[tokio::test]
async fn pdf_failure_is_500_and_cleans_up() {
    let backend = RecordingBackend::failing("no objects found");
    let model = Arc::new(MockChatModel::returning(json!({})));

    let (status, body) = send(
        app(backend.clone(), model.clone()),
        extract_request(&[
            pdf_part("broken.pdf"),
            Part::Text {
                name: "fields",
                value: "Name",
            },
        ]),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(
        body["detail"]
            .as_str()
            .unwrap()
            .contains("no objects found")
    );
    assert_eq!(model.call_count(), 0);

    let (path, _) = &backend.seen()[0];
    assert!(!path.exists());
}

#[tokio::test]
async fn non_multipart_body_is_rejected() {
    let backend = RecordingBackend::pages(&["text"]);
    let model = Arc::new(MockChatModel::returning(json!({})));

    let request = Request::builder()
        .method("POST")
        .uri(EXTRACT_ROUTE)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"fields":"Name"}"#))
        .unwrap();

    let (status, body) = send(app(backend, model.clone()), request).await;

    assert!(status.is_client_error());
    assert!(body["detail"].is_string());
    assert_eq!(model.call_count(), 0);
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let backend = RecordingBackend::pages(&["text"]);
    let model = Arc::new(MockChatModel::returning(json!({})));
    let state = Arc::new(AppState {
        backend: backend.clone(),
        model: model.clone(),
    });
    let big = vec![b'x'; 64 * 1024];

    let (status, _) = send(
        router(state, 1024),
        extract_request(&[
            Part::File {
                name: "document",
                filename: "big.pdf",
                content_type: "application/pdf",
                data: &big,
            },
            Part::Text {
                name: "fields",
                value: "Name",
            },
        ]),
    )
    .await;

    assert!(status.is_client_error());
    assert_eq!(model.call_count(), 0);
    assert!(backend.seen().is_empty());
}

#[tokio::test]
async fn get_is_not_allowed() {
    let backend = RecordingBackend::pages(&["text"]);
    let model = Arc::new(MockChatModel::returning(json!({})));

    let request = Request::builder()
        .method("GET")
        .uri(EXTRACT_ROUTE)
        .body(Body::empty())
        .unwrap();

    let (status, _) = send(app(backend, model), request).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}
