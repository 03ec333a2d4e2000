//! Request extraction: JSON bodies, path parameters, multipart forms.
//!
//! Rejections are folded into [`CoreError`] so every failure shares one body shape.

use axum::extract::{FromRequest, FromRequestParts, Multipart};

use crate::error::{CoreError, CoreResult};
use crate::properties::{PropertyDraft, UploadedFile};

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(CoreError))]
pub struct JsonBody<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(CoreError))]
pub struct PathParam<T>(pub T);

/// A property form: one `data` JSON part and one or more `files` parts.
#[derive(Debug)]
pub struct PropertyForm {
    pub draft: PropertyDraft,
    pub files: Vec<UploadedFile>,
}

impl PropertyForm {
    pub async fn parse(mut multipart: Multipart) -> CoreResult<Self> {
        let mut draft: Option<PropertyDraft> = None;
        let mut files = Vec::new();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "data" => {
                    let text = field.text().await?;
                    let parsed = serde_json::from_str(&text)
                        .map_err(|e| CoreError::BadRequest(format!("invalid data field: {}", e)))?;
                    draft = Some(parsed);
                }
                "files" | "files[]" => {
                    let filename = field.file_name().unwrap_or("file").to_string();
                    let content = field.bytes().await?;
                    files.push(UploadedFile { filename, content });
                }
                other => {
                    tracing::debug!(field = %other, "Ignoring unknown multipart field");
                }
            }
        }

        let draft = draft.ok_or_else(|| CoreError::BadRequest("missing data field".into()))?;
        if files.is_empty() {
            return Err(CoreError::BadRequest("at least one file is required".into()));
        }
        Ok(Self { draft, files })
    }
}

/// The single `file` part of a standalone upload.
pub async fn single_file(mut multipart: Multipart) -> CoreResult<UploadedFile> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("file").to_string();
            let content = field.bytes().await?;
            return Ok(UploadedFile { filename, content });
        }
    }
    Err(CoreError::BadRequest("missing file field".into()))
}
