//! Data models for Google Drive API responses.

use serde::{Deserialize, Serialize};

/// MIME type the Drive API uses for folders.
pub const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

/// MIME type the Drive API uses for shortcuts.
pub const SHORTCUT_MIME: &str = "application/vnd.google-apps.shortcut";

/// The kind of a remote resource, derived from its MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    File,
    Folder,
    Shortcut,
}

impl ResourceKind {
    pub fn from_mime(mime: &str) -> Self {
        match mime {
            FOLDER_MIME => ResourceKind::Folder,
            SHORTCUT_MIME => ResourceKind::Shortcut,
            _ => ResourceKind::File,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::File => "file",
            ResourceKind::Folder => "folder",
            ResourceKind::Shortcut => "shortcut",
        }
    }
}

/// Shortcut target recorded on a shortcut resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortcutDetails {
    pub target_id: String,
    #[serde(default)]
    pub target_mime_type: Option<String>,
}

/// Metadata for a file, folder or shortcut in Google Drive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default, deserialize_with = "deserialize_size")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortcut_details: Option<ShortcutDetails>,
}

impl ResourceRef {
    pub fn kind(&self) -> ResourceKind {
        ResourceKind::from_mime(&self.mime_type)
    }
}

fn deserialize_size<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    match opt {
        Some(s) => s.parse::<u64>().map(Some).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

impl std::fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let size_str = self
            .size
            .map(format_size)
            .unwrap_or_else(|| "-".to_string());
        write!(
            f,
            "{:<44} {:>10} {:<8} {}",
            self.id,
            size_str,
            self.kind().as_str(),
            self.name
        )
    }
}

/// Format bytes into human-readable size.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Export target for a Google-native document type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportFormat {
    pub mime_type: &'static str,
    pub extension: &'static str,
}

/// Export mapping for Google-native document types.
///
/// Anything not listed here downloads as native bytes with its display
/// name untouched.
pub fn export_format(mime: &str) -> Option<ExportFormat> {
    match mime {
        "application/vnd.google-apps.document" => Some(ExportFormat {
            mime_type:
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            extension: ".docx",
        }),
        "application/vnd.google-apps.spreadsheet" => Some(ExportFormat {
            mime_type:
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            extension: ".xlsx",
        }),
        "application/vnd.google-apps.presentation" => Some(ExportFormat {
            mime_type:
                "application/vnd.openxmlformats-officedocument.presentationml.presentation",
            extension: ".pptx",
        }),
        _ => None,
    }
}

/// Response from the files.list API endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileListResponse {
    #[serde(default)]
    pub files: Vec<ResourceRef>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Google API error response.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    pub code: u16,
    pub message: String,
    #[serde(default)]
    pub errors: Vec<ApiErrorItem>,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorItem {
    #[serde(default)]
    pub reason: String,
}

/// Service account credentials from JSON file.
#[derive(Debug, Deserialize)]
pub struct ServiceAccountCredentials {
    pub client_email: String,
    pub private_key: String,
    pub token_uri: Option<String>,
}

/// OAuth2 token response.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(500), "500 B");
        assert_eq!(format_size(1024), "1.00 KB");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(1048576), "1.00 MB");
        assert_eq!(format_size(1073741824), "1.00 GB");
    }

    #[test]
    fn test_kind_from_mime() {
        assert_eq!(ResourceKind::from_mime(FOLDER_MIME), ResourceKind::Folder);
        assert_eq!(ResourceKind::from_mime(SHORTCUT_MIME), ResourceKind::Shortcut);
        assert_eq!(ResourceKind::from_mime("text/plain"), ResourceKind::File);
        assert_eq!(
            ResourceKind::from_mime("application/vnd.google-apps.document"),
            ResourceKind::File
        );
    }

    #[test]
    fn test_export_format_mapping() {
        let sheet = export_format("application/vnd.google-apps.spreadsheet").unwrap();
        assert_eq!(sheet.extension, ".xlsx");
        assert!(sheet.mime_type.contains("spreadsheetml"));

        let doc = export_format("application/vnd.google-apps.document").unwrap();
        assert_eq!(doc.extension, ".docx");

        let slides = export_format("application/vnd.google-apps.presentation").unwrap();
        assert_eq!(slides.extension, ".pptx");

        assert!(export_format("application/pdf").is_none());
        assert!(export_format(FOLDER_MIME).is_none());
    }

    #[test]
    fn test_resource_ref_deserialize() {
        let json = r#"{
            "id": "abc123",
            "name": "test.txt",
            "mimeType": "text/plain",
            "size": "1024"
        }"#;

        let resource: ResourceRef = serde_json::from_str(json).unwrap();
        assert_eq!(resource.id, "abc123");
        assert_eq!(resource.name, "test.txt");
        assert_eq!(resource.kind(), ResourceKind::File);
        assert_eq!(resource.size, Some(1024));
        assert!(resource.shortcut_details.is_none());
    }

    #[test]
    fn test_shortcut_deserialize() {
        let json = r#"{
            "id": "sc1",
            "name": "link to report",
            "mimeType": "application/vnd.google-apps.shortcut",
            "shortcutDetails": {
                "targetId": "target9",
                "targetMimeType": "application/vnd.google-apps.folder"
            }
        }"#;

        let resource: ResourceRef = serde_json::from_str(json).unwrap();
        assert_eq!(resource.kind(), ResourceKind::Shortcut);
        let details = resource.shortcut_details.unwrap();
        assert_eq!(details.target_id, "target9");
        assert_eq!(
            details.target_mime_type.as_deref(),
            Some("application/vnd.google-apps.folder")
        );
    }
}
