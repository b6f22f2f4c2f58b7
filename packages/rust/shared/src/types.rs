//! Core domain types for drivedocs batches.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// MIME type of a native Google Docs document.
pub const GOOGLE_DOC_MIME: &str = "application/vnd.google-apps.document";

/// MIME type of an uploaded Word document.
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// MIME type of a plain text file.
pub const PLAIN_TEXT_MIME: &str = "text/plain";

/// Title used when the listing carries no name for a file.
pub const UNTITLED: &str = "Untitled";

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one batch run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// FileType
// ---------------------------------------------------------------------------

/// The closed set of content kinds the reader knows how to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    /// Word-processor content (native Google Doc or uploaded `.docx`).
    RichDocument,
    /// UTF-8 text.
    PlainText,
}

impl FileType {
    /// Classify a remote MIME type. Anything that is not plain text is a rich document.
    pub fn from_mime(mime: &str) -> Self {
        if mime == PLAIN_TEXT_MIME {
            Self::PlainText
        } else {
            Self::RichDocument
        }
    }

    /// Classify a declared type string (`"txt"`, `"docx"`, `"google_doc"`, ...).
    ///
    /// Unrecognized values fall back to [`FileType::RichDocument`].
    pub fn from_declared(declared: &str) -> Self {
        match declared.trim().to_ascii_lowercase().as_str() {
            "txt" | "text" | "plain_text" | PLAIN_TEXT_MIME => Self::PlainText,
            _ => Self::RichDocument,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RichDocument => "rich_document",
            Self::PlainText => "plain_text",
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ModifiedDate
// ---------------------------------------------------------------------------

/// Last-modified date of a remote file, or the "Unknown" sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifiedDate {
    Known(NaiveDate),
    Unknown,
}

impl ModifiedDate {
    /// Parse an RFC 3339 timestamp (e.g. `2024-11-01T09:30:00.000Z`).
    ///
    /// Missing or malformed timestamps yield [`ModifiedDate::Unknown`].
    pub fn from_timestamp(raw: Option<&str>) -> Self {
        raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| Self::Known(dt.date_naive()))
            .unwrap_or(Self::Unknown)
    }
}

impl std::fmt::Display for ModifiedDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Known(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Self::Unknown => f.write_str("Unknown"),
        }
    }
}

impl Serialize for ModifiedDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ModifiedDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
            .map(Self::Known)
            .unwrap_or(Self::Unknown))
    }
}

// ---------------------------------------------------------------------------
// FileDescriptor
// ---------------------------------------------------------------------------

/// A remote file as returned by the listing, without its content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    /// Raw title; may carry the leader marker and an extension suffix.
    pub title: String,
    /// Opaque remote identifier.
    pub id: String,
    /// Last-modified date, or "Unknown".
    pub modified: ModifiedDate,
    /// Content kind used to pick a decoder. Any declared type string is
    /// accepted on input, see [`FileType::from_declared`].
    #[serde(deserialize_with = "deserialize_declared_type")]
    pub file_type: FileType,
    /// Remote MIME type (decides export vs. direct download).
    #[serde(default)]
    pub mime_type: String,
}

fn deserialize_declared_type<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<FileType, D::Error> {
    let declared = String::deserialize(deserializer)?;
    Ok(FileType::from_declared(&declared))
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One normalized output record per successfully processed file.
///
/// Serialized with the key names the downstream ingestion expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Sanitized display title.
    pub title: String,
    /// Document text without its first line, lines joined by spaces.
    pub body: String,
    /// Batch-wide date (`YYYY-MM-DD`).
    #[serde(rename = "LAST UPDATED")]
    pub last_updated: String,
    /// URL taken from the first line, or empty.
    #[serde(rename = "URL")]
    pub url: String,
    /// Topical tags from the keyword extractor.
    pub tags: Vec<String>,
    /// Whether the source title marked the document as leaders-only.
    #[serde(rename = "forLeaders")]
    pub for_leaders: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_type_from_mime() {
        assert_eq!(FileType::from_mime(PLAIN_TEXT_MIME), FileType::PlainText);
        assert_eq!(FileType::from_mime(GOOGLE_DOC_MIME), FileType::RichDocument);
        assert_eq!(FileType::from_mime(DOCX_MIME), FileType::RichDocument);
        assert_eq!(FileType::from_mime("application/pdf"), FileType::RichDocument);
    }

    #[test]
    fn file_type_from_declared_defaults_to_rich() {
        assert_eq!(FileType::from_declared("txt"), FileType::PlainText);
        assert_eq!(FileType::from_declared("docx"), FileType::RichDocument);
        assert_eq!(FileType::from_declared("google_doc"), FileType::RichDocument);
        assert_eq!(FileType::from_declared("spreadsheet"), FileType::RichDocument);
    }

    #[test]
    fn modified_date_parsing() {
        let known = ModifiedDate::from_timestamp(Some("2024-11-01T09:30:00.123Z"));
        assert_eq!(known.to_string(), "2024-11-01");

        assert_eq!(ModifiedDate::from_timestamp(None), ModifiedDate::Unknown);
        assert_eq!(
            ModifiedDate::from_timestamp(Some("yesterday")),
            ModifiedDate::Unknown
        );
        assert_eq!(ModifiedDate::Unknown.to_string(), "Unknown");
    }

    #[test]
    fn record_uses_ingestion_keys() {
        let record = Record {
            title: "Ferie".into(),
            body: "First real line.".into(),
            last_updated: "2024-11-01".into(),
            url: "https://example.com/doc".into(),
            tags: vec!["ferie".into(), "permisjon".into()],
            for_leaders: true,
        };

        let value = serde_json::to_value(&record).expect("serialize");
        assert_eq!(value["LAST UPDATED"], "2024-11-01");
        assert_eq!(value["URL"], "https://example.com/doc");
        assert_eq!(value["forLeaders"], true);
        assert_eq!(value["tags"][1], "permisjon");
        assert!(value.get("last_updated").is_none());
    }

    #[test]
    fn descriptor_serializes_unknown_date() {
        let descriptor = FileDescriptor {
            title: "Notes.txt".into(),
            id: "f1".into(),
            modified: ModifiedDate::Unknown,
            file_type: FileType::PlainText,
            mime_type: PLAIN_TEXT_MIME.into(),
        };

        let json = serde_json::to_string(&descriptor).expect("serialize");
        assert!(json.contains("\"modified\":\"Unknown\""));
        assert!(json.contains("\"file_type\":\"plain_text\""));

        let parsed: FileDescriptor = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, descriptor);
    }

    #[test]
    fn descriptor_accepts_any_declared_type() {
        let parse = |declared: &str| -> FileType {
            let json = format!(
                r#"{{"title": "t", "id": "f1", "modified": "2024-11-01", "file_type": "{declared}"}}"#
            );
            serde_json::from_str::<FileDescriptor>(&json)
                .expect("deserialize")
                .file_type
        };

        assert_eq!(parse("txt"), FileType::PlainText);
        assert_eq!(parse("plain_text"), FileType::PlainText);
        assert_eq!(parse("docx"), FileType::RichDocument);
        assert_eq!(parse("spreadsheet"), FileType::RichDocument);
        assert_eq!(parse("rich_document"), FileType::RichDocument);
    }
}
