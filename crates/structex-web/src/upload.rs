use axum::body::Bytes;
use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;

use structex_core::FieldSchema;

use crate::models::ValidationErrors;

pub const DOCUMENT_FIELD: &str = "document";
pub const FIELDS_FIELD: &str = "fields";
pub const FIELDS_MAX_LENGTH: usize = 1024;

/// An uploaded PDF with its original filename.
#[derive(Debug)]
pub struct UploadedFile {
    pub filename: String,
    pub data: Bytes,
}

/// A validated extraction request.
#[derive(Debug)]
pub struct ExtractionForm {
    pub document: UploadedFile,
    /// The trimmed field string as submitted.
    pub field_string: String,
    pub schema: FieldSchema,
}

#[derive(Debug)]
pub enum UploadError {
    Invalid(ValidationErrors),
    Multipart(MultipartError),
}

impl From<MultipartError> for UploadError {
    fn from(e: MultipartError) -> Self {
        UploadError::Multipart(e)
    }
}

/// The `document` part as received, before validation.
#[derive(Debug)]
pub struct RawDocument {
    pub filename: Option<String>,
    pub data: Bytes,
}

/// Form parts collected from the multipart stream.
#[derive(Debug, Default)]
pub struct RawForm {
    pub document: Option<RawDocument>,
    pub fields: Option<String>,
}

/// Read the multipart stream and validate it into an [`ExtractionForm`].
pub async fn parse_extraction_form(mut multipart: Multipart) -> Result<ExtractionForm, UploadError> {
    let mut raw = RawForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            DOCUMENT_FIELD => {
                let filename = field.file_name().map(String::from);
                let data = field.bytes().await?;
                raw.document = Some(RawDocument { filename, data });
            }
            FIELDS_FIELD => {
                raw.fields = Some(field.text().await?);
            }
            _ => {
                // Ignore unknown fields
                let _ = field.bytes().await?;
            }
        }
    }

    raw.validate().map_err(UploadError::Invalid)
}

impl RawForm {
    /// Check both parts, collecting every error before rejecting.
    pub fn validate(self) -> Result<ExtractionForm, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let document = match self.document {
            None => {
                errors.add(DOCUMENT_FIELD, "No file was submitted.");
                None
            }
            Some(RawDocument { filename: None, .. }) => {
                errors.add(
                    DOCUMENT_FIELD,
                    "The submitted data was not a file. Check the encoding type on the form.",
                );
                None
            }
            Some(RawDocument {
                filename: Some(filename),
                data,
            }) => {
                if data.is_empty() {
                    errors.add(DOCUMENT_FIELD, "The submitted file is empty.");
                    None
                } else if !has_pdf_extension(&filename) {
                    errors.add(DOCUMENT_FIELD, "Only PDF files are supported.");
                    None
                } else {
                    Some(UploadedFile { filename, data })
                }
            }
        };

        let fields = match self.fields.as_deref().map(str::trim) {
            None => {
                errors.add(FIELDS_FIELD, "This field is required.");
                None
            }
            Some("") => {
                errors.add(FIELDS_FIELD, "This field may not be blank.");
                None
            }
            Some(s) if s.chars().count() > FIELDS_MAX_LENGTH => {
                errors.add(
                    FIELDS_FIELD,
                    format!("Ensure this field has no more than {FIELDS_MAX_LENGTH} characters."),
                );
                None
            }
            Some(s) => match FieldSchema::from_field_string(s) {
                Ok(schema) => Some((s.to_string(), schema)),
                Err(_) => {
                    errors.add(FIELDS_FIELD, "At least one field name is required.");
                    None
                }
            },
        };

        match (document, fields) {
            (Some(document), Some((field_string, schema))) if errors.is_empty() => {
                Ok(ExtractionForm {
                    document,
                    field_string,
                    schema,
                })
            }
            _ => Err(errors),
        }
    }
}

fn has_pdf_extension(filename: &str) -> bool {
    filename.to_lowercase().ends_with(".pdf")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdf(name: &str) -> Option<RawDocument> {
        Some(RawDocument {
            filename: Some(name.to_string()),
            data: Bytes::from_static(b"%PDF-1.7\n"),
        })
    }

    #[test]
    fn valid_form_builds_schema() {
        let form = RawForm {
            document: pdf("invoice.PDF"),
            fields: Some("  Invoice Number, Total  ".into()),
        }
        .validate()
        .unwrap();

        assert_eq!(form.document.filename, "invoice.PDF");
        assert_eq!(form.field_string, "Invoice Number, Total");
        assert_eq!(
            form.schema.keys().collect::<Vec<_>>(),
            ["invoice_number", "total"]
        );
    }

    #[test]
    fn missing_everything_reports_both_fields() {
        let errors = RawForm::default().validate().unwrap_err();
        assert_eq!(
            errors.get(DOCUMENT_FIELD).unwrap(),
            ["No file was submitted."]
        );
        assert_eq!(errors.get(FIELDS_FIELD).unwrap(), ["This field is required."]);
    }

    #[test]
    fn non_pdf_extension_is_rejected() {
        let errors = RawForm {
            document: pdf("test_doc.txt"),
            fields: Some("Name".into()),
        }
        .validate()
        .unwrap_err();
        assert_eq!(
            errors.get(DOCUMENT_FIELD).unwrap(),
            ["Only PDF files are supported."]
        );
        assert!(errors.get(FIELDS_FIELD).is_none());
    }

    #[test]
    fn empty_file_is_rejected() {
        let errors = RawForm {
            document: Some(RawDocument {
                filename: Some("empty.pdf".into()),
                data: Bytes::new(),
            }),
            fields: Some("Name".into()),
        }
        .validate()
        .unwrap_err();
        assert_eq!(
            errors.get(DOCUMENT_FIELD).unwrap(),
            ["The submitted file is empty."]
        );
    }

    #[test]
    fn document_without_filename_is_not_a_file() {
        let errors = RawForm {
            document: Some(RawDocument {
                filename: None,
                data: Bytes::from_static(b"%PDF-1.7"),
            }),
            fields: Some("Name".into()),
        }
        .validate()
        .unwrap_err();
        assert!(errors.get(DOCUMENT_FIELD).unwrap()[0].starts_with("The submitted data was not a file"));
    }

    #[test]
    fn blank_fields_are_rejected() {
        let errors = RawForm {
            document: pdf("a.pdf"),
            fields: Some("   ".into()),
        }
        .validate()
        .unwrap_err();
        assert_eq!(
            errors.get(FIELDS_FIELD).unwrap(),
            ["This field may not be blank."]
        );
    }

    #[test]
    fn only_commas_is_rejected() {
        let errors = RawForm {
            document: pdf("a.pdf"),
            fields: Some(", ,".into()),
        }
        .validate()
        .unwrap_err();
        assert_eq!(
            errors.get(FIELDS_FIELD).unwrap(),
            ["At least one field name is required."]
        );
    }

    #[test]
    fn field_string_length_is_capped() {
        let at_limit = "a".repeat(FIELDS_MAX_LENGTH);
        assert!(
            RawForm {
                document: pdf("a.pdf"),
                fields: Some(at_limit),
            }
            .validate()
            .is_ok()
        );

        let errors = RawForm {
            document: pdf("a.pdf"),
            fields: Some("a".repeat(FIELDS_MAX_LENGTH + 1)),
        }
        .validate()
        .unwrap_err();
        assert_eq!(
            errors.get(FIELDS_FIELD).unwrap(),
            ["Ensure this field has no more than 1024 characters."]
        );
    }
}
