//! Media staging for farmer and product forms.
//!
//! An operator composes a final ordered media collection out of files already hosted by the
//! server (identified by URL) and new local files (identified by position), then submits
//! everything in one multipart request.

mod field;
mod form;

use std::path::Path;

use bytes::Bytes;

pub use field::MediaField;
pub use form::{
    AddOutcome, FormError, FormMode, FormSender, FormState, MediaForm, MultipartUpload,
};

/// Image types the farmer form accepts.
pub const WEB_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png", "image/webp"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Multipart field carrying new uploads.
    pub fn upload_field(self) -> &'static str {
        match self {
            MediaKind::Image => "images",
            MediaKind::Video => "videos",
        }
    }

    /// Multipart field carrying URLs to delete.
    pub fn remove_field(self) -> &'static str {
        match self {
            MediaKind::Image => "removeImages",
            MediaKind::Video => "removeVideos",
        }
    }

    /// Multipart field carrying the final order of kept URLs.
    pub fn order_field(self) -> &'static str {
        match self {
            MediaKind::Image => "imagesOrder",
            MediaKind::Video => "videosOrder",
        }
    }

    pub fn default_policy(self) -> AcceptPolicy {
        match self {
            MediaKind::Image => AcceptPolicy::Prefix("image/"),
            MediaKind::Video => AcceptPolicy::Prefix("video/"),
        }
    }
}

/// Which MIME types a media field takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptPolicy {
    Prefix(&'static str),
    OneOf(&'static [&'static str]),
}

impl AcceptPolicy {
    pub fn accepts(&self, mime_type: &str) -> bool {
        let mime_type = mime_type.trim().to_ascii_lowercase();
        match self {
            AcceptPolicy::Prefix(prefix) => mime_type.starts_with(prefix),
            AcceptPolicy::OneOf(types) => types.contains(&mime_type.as_str()),
        }
    }
}

/// A local file selected for upload but not yet sent.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedFile {
    pub file_name: String,
    pub mime_type: String,
    pub data: Bytes,
}

impl StagedFile {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, data: Bytes) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Read a file from disk, guessing its MIME type from the extension.
    pub async fn from_path(path: impl AsRef<Path>, max_size: u64) -> Result<Self, FormError> {
        let path = path.as_ref();
        let size = tokio::fs::metadata(path).await?.len();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload".to_string());

        if size > max_size {
            return Err(FormError::FileTooLarge {
                file_name,
                size,
                limit: max_size,
            });
        }

        let data = tokio::fs::read(path).await?;
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .to_string();

        Ok(Self::new(file_name, mime_type, Bytes::from(data)))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_policy() {
        let policy = MediaKind::Video.default_policy();
        assert!(policy.accepts("video/mp4"));
        assert!(policy.accepts("Video/QuickTime"));
        assert!(!policy.accepts("image/png"));
    }

    #[test]
    fn test_one_of_policy_rejects_other_images() {
        let policy = AcceptPolicy::OneOf(WEB_IMAGE_TYPES);
        assert!(policy.accepts("image/webp"));
        assert!(!policy.accepts("image/gif"));
    }

    #[tokio::test]
    async fn test_from_path_guesses_mime_and_enforces_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tomatoes.png");
        tokio::fs::write(&path, vec![7u8; 64]).await.unwrap();

        let file = StagedFile::from_path(&path, 1024).await.unwrap();
        assert_eq!(file.file_name, "tomatoes.png");
        assert_eq!(file.mime_type, "image/png");
        assert_eq!(file.len(), 64);

        let err = StagedFile::from_path(&path, 10).await.unwrap_err();
        assert!(matches!(err, FormError::FileTooLarge { size: 64, limit: 10, .. }));
    }
}
