//! File naming, type inference, and pinning for property documents.

use bytes::Bytes;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::CoreResult;
use crate::mirror::models::DocumentType;
use crate::pinning::PinStore;

/// One multipart file part, fully buffered.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content: Bytes,
}

/// A pinned file not yet linked to a property or request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinnedDocument {
    pub name: String,
    pub stored_name: String,
    pub cid: String,
    pub url: String,
    pub type_tag: DocumentType,
}

/// Strip any client-supplied directory components.
pub fn base_name(filename: &str) -> &str {
    filename
        .rsplit(['/', '\\'])
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("file")
}

/// `<nanos>_<base name>`; the extension is kept as-is.
pub fn stored_name(filename: &str, nanos: u128) -> String {
    format!("{}_{}", nanos, base_name(filename))
}

/// First match wins, checked against the case-folded name.
pub fn infer_document_type(filename: &str) -> DocumentType {
    let name = filename.to_lowercase();
    let has = |needle: &str| name.contains(needle);

    if has("deed") {
        DocumentType::Deed
    } else if has("inspection") {
        DocumentType::InspectionReport
    } else if has("valuation") || has("appraisal") {
        DocumentType::ValuationReport
    } else if has("image") || has("img") {
        DocumentType::Photo
    } else if has("contract") || has("agreement") {
        DocumentType::LegalContract
    } else {
        DocumentType::GeneralDocument
    }
}

fn now_nanos() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default()
}

/// Pin every file in order. The first CID is the metadata CID.
///
/// Each file's bytes are released as soon as its upload finishes. A pin
/// failure aborts the batch; files already pinned stay pinned.
pub async fn pin_files(pins: &dyn PinStore, files: Vec<UploadedFile>) -> CoreResult<Vec<PinnedDocument>> {
    let mut pinned = Vec::with_capacity(files.len());
    for file in files {
        let stored = stored_name(&file.filename, now_nanos());
        let type_tag = infer_document_type(&file.filename);
        let cid = pins.upload(file.content, &stored).await?;
        tracing::debug!(file = %stored, cid = %cid, kind = %type_tag, "Document pinned");
        pinned.push(PinnedDocument {
            name: base_name(&file.filename).to_string(),
            url: pins.gateway_url(&cid),
            stored_name: stored,
            cid,
            type_tag,
        });
    }
    Ok(pinned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_priority() {
        assert_eq!(infer_document_type("deed.pdf"), DocumentType::Deed);
        assert_eq!(infer_document_type("Home-INSPECTION.pdf"), DocumentType::InspectionReport);
        assert_eq!(infer_document_type("appraisal_2024.pdf"), DocumentType::ValuationReport);
        assert_eq!(infer_document_type("front_img.jpg"), DocumentType::Photo);
        assert_eq!(infer_document_type("lease_agreement.docx"), DocumentType::LegalContract);
        assert_eq!(infer_document_type("notes.txt"), DocumentType::GeneralDocument);
        // deed outranks contract
        assert_eq!(infer_document_type("deed_contract.pdf"), DocumentType::Deed);
        // inspection outranks image
        assert_eq!(infer_document_type("inspection_images.zip"), DocumentType::InspectionReport);
    }

    #[test]
    fn test_stored_name_keeps_extension() {
        assert_eq!(stored_name("deed.pdf", 1700000000123456789), "1700000000123456789_deed.pdf");
        assert_eq!(stored_name("../../etc/deed.pdf", 5), "5_deed.pdf");
        assert_eq!(stored_name("C:\\docs\\photo.png", 5), "5_photo.png");
    }
}
