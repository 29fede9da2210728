//! Attachment metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A file attached to a page. The bytes are fetched on demand.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    /// Attachment content ID
    pub id: String,

    /// Media file ID; absent on older Confluence versions
    pub file_id: Option<String>,

    /// File name as uploaded
    pub title: String,

    /// MIME type (e.g., "image/png")
    pub media_type: String,

    /// Upload comment
    pub comment: String,

    /// Owning page ID
    pub owner_id: String,

    /// Space key of the owning page
    pub space_key: String,

    /// Download path relative to the Confluence base URL
    pub download_link: Option<String>,

    /// Size in bytes
    pub file_size: u64,

    /// Latest version information
    pub modified: Option<AttachmentVersion>,
}

/// Who changed an attachment, and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentVersion {
    /// Modification time
    pub when: DateTime<Utc>,

    /// Display name of the author
    pub by: Option<String>,
}

impl Attachment {
    /// Create a new attachment.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        owner_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            owner_id: owner_id.into(),
            ..Default::default()
        }
    }

    /// Set the file ID.
    pub fn with_file_id(mut self, file_id: impl Into<String>) -> Self {
        self.file_id = Some(file_id.into());
        self
    }

    /// Set the MIME type.
    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = media_type.into();
        self
    }

    /// Set the upload comment.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// Set the space key.
    pub fn with_space(mut self, space_key: impl Into<String>) -> Self {
        self.space_key = space_key.into();
        self
    }

    /// Set the download link.
    pub fn with_download_link(mut self, link: impl Into<String>) -> Self {
        self.download_link = Some(link.into());
        self
    }

    /// Set the version information.
    pub fn with_modified(mut self, when: DateTime<Utc>, by: Option<String>) -> Self {
        self.modified = Some(AttachmentVersion { when, by });
        self
    }

    /// The file ID, or `None` when absent or blank.
    pub fn effective_file_id(&self) -> Option<&str> {
        self.file_id.as_deref().filter(|s| !s.trim().is_empty())
    }

    /// Check if this attachment is an image.
    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }

    /// File extension including the leading dot, or an empty string.
    ///
    /// Draw.io diagrams and their previews are recognised from the upload
    /// comment Confluence stores with them.
    pub fn extension(&self) -> String {
        let comment = self.comment.as_str();
        if self.media_type == "application/vnd.jgraph.mxfile" && comment == "draw.io diagram" {
            return ".drawio".to_string();
        }
        if self.media_type == "image/png" && comment == "draw.io preview" {
            return ".drawio.png".to_string();
        }

        let by_type = match self.media_type.as_str() {
            "image/jpeg" => "jpg",
            "image/png" => "png",
            "image/gif" => "gif",
            "image/svg+xml" => "svg",
            "image/webp" => "webp",
            "image/bmp" => "bmp",
            "image/tiff" => "tiff",
            "application/pdf" => "pdf",
            "application/zip" => "zip",
            "application/json" => "json",
            "application/xml" | "text/xml" => "xml",
            "text/plain" => "txt",
            "text/csv" => "csv",
            "text/html" => "html",
            "video/mp4" => "mp4",
            "application/msword" => "doc",
            "application/vnd.ms-excel" => "xls",
            "application/vnd.ms-powerpoint" => "ppt",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => "docx",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => "xlsx",
            "application/vnd.openxmlformats-officedocument.presentationml.presentation" => "pptx",
            _ => "",
        };
        if !by_type.is_empty() {
            return format!(".{}", by_type);
        }

        match self.title.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() && !ext.contains(' ') => {
                format!(".{}", ext)
            }
            _ => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_from_media_type() {
        let att = Attachment::new("att1", "photo", "1").with_media_type("image/jpeg");
        assert_eq!(att.extension(), ".jpg");
        assert!(att.is_image());
    }

    #[test]
    fn test_extension_drawio() {
        let diagram = Attachment::new("att1", "flow", "1")
            .with_media_type("application/vnd.jgraph.mxfile")
            .with_comment("draw.io diagram");
        assert_eq!(diagram.extension(), ".drawio");

        let preview = Attachment::new("att2", "flow.png", "1")
            .with_media_type("image/png")
            .with_comment("draw.io preview");
        assert_eq!(preview.extension(), ".drawio.png");
    }

    #[test]
    fn test_extension_fallback_to_title() {
        let att = Attachment::new("att1", "notes.md", "1")
            .with_media_type("application/octet-stream");
        assert_eq!(att.extension(), ".md");

        let bare = Attachment::new("att2", "README", "1");
        assert_eq!(bare.extension(), "");
    }

    #[test]
    fn test_effective_file_id() {
        let att = Attachment::new("att1", "a.png", "1").with_file_id("  ");
        assert_eq!(att.effective_file_id(), None);
        let att = att.with_file_id("f-1");
        assert_eq!(att.effective_file_id(), Some("f-1"));
    }
}
