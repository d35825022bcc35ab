#![warn(clippy::unwrap_in_result)]
#![warn(clippy::unwrap_used)]

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use utoipa::ToSchema;

/// File name suffix both the server and the client insist on.
pub const PDF_SUFFIX: &str = ".pdf";

/// MIME type every stored object is written with.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Metadata of one uploaded PDF as it is persisted in the metadata store.
///
/// The record is written once by the upload handler and never changed afterwards.
/// `id` and `file_key` come from two independent random identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    /// Unique identifier of the record
    pub id: String,
    /// Name of the file as supplied by the uploader
    pub file_name: String,
    /// Object store key of the file content, always `<uuid>.pdf`
    pub file_key: String,
    /// Time the record was written (ISO-8601, UTC, millisecond precision)
    #[serde(serialize_with = "iso_millis")]
    pub upload_date: DateTime<Utc>,
}

/// A [`FileRecord`] enriched with a temporary URL to view its content.
///
/// Never persisted, computed on every listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ViewEntry {
    #[serde(flatten)]
    pub record: FileRecord,
    /// Signed URL granting read access to the file content for a limited time
    pub view_url: String,
}

/// Upload request body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    /// Original file name, must end with `.pdf`
    pub file_name: String,
    /// File content encoded with standard base64
    pub file_content: String,
}

/// Successful upload reply.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadReply {
    /// Human readable outcome
    pub message: String,
    /// The record that was stored
    pub metadata: FileRecord,
}

/// Body of every non successful reply.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorReply {
    pub error: String,
}

impl ErrorReply {
    #[must_use]
    pub fn new(error: &str) -> Self {
        Self {
            error: error.to_owned(),
        }
    }
}

/// Tells whether a file name carries the `.pdf` suffix. The check is case sensitive.
#[must_use]
pub fn has_pdf_suffix(file_name: &str) -> bool {
    file_name.ends_with(PDF_SUFFIX)
}

fn iso_millis<S: Serializer>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&date.to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record() -> FileRecord {
        FileRecord {
            id: "2b1c8f0e-1111-4a1a-9a1a-000000000001".to_owned(),
            file_name: "report.pdf".to_owned(),
            file_key: "7f0c2a52-2222-4b2b-8b2b-000000000002.pdf".to_owned(),
            upload_date: Utc.with_ymd_and_hms(2024, 5, 17, 9, 30, 0).unwrap(),
        }
    }

    #[test]
    fn record_uses_camel_case_and_millis() {
        // Arrange
        let r = record();

        // Act
        let json = serde_json::to_value(&r).unwrap();

        // Assert
        assert_eq!(json["fileName"], "report.pdf");
        assert_eq!(json["fileKey"], "7f0c2a52-2222-4b2b-8b2b-000000000002.pdf");
        assert_eq!(json["uploadDate"], "2024-05-17T09:30:00.000Z");
        assert_eq!(json["id"], "2b1c8f0e-1111-4a1a-9a1a-000000000001");
    }

    #[test]
    fn view_entry_is_flat() {
        // Arrange
        let entry = ViewEntry {
            record: record(),
            view_url: "http://localhost/objects/x.pdf".to_owned(),
        };

        // Act
        let json = serde_json::to_string(&entry).unwrap();
        let back: ViewEntry = serde_json::from_str(&json).unwrap();

        // Assert
        assert!(json.contains(r#""viewUrl":"http://localhost/objects/x.pdf""#));
        assert!(json.contains(r#""fileName":"report.pdf""#));
        assert_eq!(back, entry);
    }

    #[test]
    fn upload_request_reads_camel_case() {
        // Arrange
        let body = r#"{"fileName":"a.pdf","fileContent":"JVBERi0xLjQ="}"#;

        // Act
        let req: UploadRequest = serde_json::from_str(body).unwrap();

        // Assert
        assert_eq!(req.file_name, "a.pdf");
        assert_eq!(req.file_content, "JVBERi0xLjQ=");
    }

    #[test]
    fn pdf_suffix() {
        assert!(has_pdf_suffix("report.pdf"));
        assert!(has_pdf_suffix(".pdf"));
        assert!(!has_pdf_suffix("report.PDF"));
        assert!(!has_pdf_suffix("report.txt"));
        assert!(!has_pdf_suffix("report.pdf.txt"));
        assert!(!has_pdf_suffix(""));
    }
}
