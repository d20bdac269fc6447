use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use thiserror::Error;

use super::{AcceptPolicy, MediaField, MediaKind, StagedFile};
use crate::api::{ApiClient, ApiError, FormPayload, UploadProgress};

#[derive(Debug, Error)]
pub enum FormError {
    #[error("Please add at least one image or video.")]
    NoMedia,
    #[error("A submission is already in progress")]
    AlreadySubmitting,
    #[error("The form has been submitted and closed")]
    Closed,
    #[error("{field} is required")]
    MissingField { field: &'static str },
    #[error("{file_name} is {size} bytes, over the {limit} byte limit")]
    FileTooLarge {
        file_name: String,
        size: u64,
        limit: u64,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit,
}

/// `Idle -> Editing -> Submitting -> Closed`, with a failed submission returning to `Editing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormState {
    Idle,
    Editing,
    Submitting,
    Closed,
}

/// Result of staging a batch of files. Files of the wrong type are reported back by name
/// rather than silently dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddOutcome {
    pub accepted: usize,
    pub rejected: Vec<String>,
}

// ============================================================================
// Sending
// ============================================================================

/// Destination for a finished payload.
#[async_trait]
pub trait FormSender: Send + Sync {
    async fn send(&self, payload: FormPayload) -> Result<Value, ApiError>;
}

/// Sends the payload as a multipart request to one backend route.
pub struct MultipartUpload<'a> {
    client: &'a ApiClient,
    method: Method,
    path: String,
    progress: Option<&'a UploadProgress>,
}

impl<'a> MultipartUpload<'a> {
    pub fn post(client: &'a ApiClient, path: impl Into<String>) -> Self {
        Self {
            client,
            method: Method::POST,
            path: path.into(),
            progress: None,
        }
    }

    pub fn put(client: &'a ApiClient, path: impl Into<String>) -> Self {
        Self {
            client,
            method: Method::PUT,
            path: path.into(),
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: Option<&'a UploadProgress>) -> Self {
        self.progress = progress;
        self
    }
}

#[async_trait]
impl<'a> FormSender for MultipartUpload<'a> {
    async fn send(&self, payload: FormPayload) -> Result<Value, ApiError> {
        self.client
            .send_form(self.method.clone(), &self.path, payload, self.progress)
            .await
    }
}

// ============================================================================
// Form state machine
// ============================================================================

#[derive(Debug, Clone)]
pub struct MediaForm {
    mode: FormMode,
    state: FormState,
    images: MediaField,
    videos: MediaField,
    image_policy: AcceptPolicy,
    video_policy: AcceptPolicy,
}

impl MediaForm {
    pub fn create() -> Self {
        Self::with_fields(FormMode::Create, MediaField::default(), MediaField::default())
    }

    /// Edit form seeded with the URLs the server already hosts.
    pub fn edit(
        images: impl IntoIterator<Item = String>,
        videos: impl IntoIterator<Item = String>,
    ) -> Self {
        Self::with_fields(
            FormMode::Edit,
            MediaField::with_existing(images),
            MediaField::with_existing(videos),
        )
    }

    fn with_fields(mode: FormMode, images: MediaField, videos: MediaField) -> Self {
        Self {
            mode,
            state: FormState::Idle,
            images,
            videos,
            image_policy: MediaKind::Image.default_policy(),
            video_policy: MediaKind::Video.default_policy(),
        }
    }

    pub fn with_image_policy(mut self, policy: AcceptPolicy) -> Self {
        self.image_policy = policy;
        self
    }

    pub fn mode(&self) -> FormMode {
        self.mode
    }

    pub fn state(&self) -> FormState {
        self.state
    }

    pub fn field(&self, kind: MediaKind) -> &MediaField {
        match kind {
            MediaKind::Image => &self.images,
            MediaKind::Video => &self.videos,
        }
    }

    /// Field for a mutation; moves `Idle` to `Editing` and refuses while locked.
    fn field_mut(&mut self, kind: MediaKind) -> Result<&mut MediaField, FormError> {
        match self.state {
            FormState::Submitting => return Err(FormError::AlreadySubmitting),
            FormState::Closed => return Err(FormError::Closed),
            FormState::Idle => self.state = FormState::Editing,
            FormState::Editing => {}
        }
        Ok(match kind {
            MediaKind::Image => &mut self.images,
            MediaKind::Video => &mut self.videos,
        })
    }

    pub fn add_files(
        &mut self,
        kind: MediaKind,
        files: impl IntoIterator<Item = StagedFile>,
    ) -> Result<AddOutcome, FormError> {
        let policy = match kind {
            MediaKind::Image => self.image_policy,
            MediaKind::Video => self.video_policy,
        };
        let (accepted, rejected) = self.field_mut(kind)?.add(files, policy);
        if !rejected.is_empty() {
            tracing::debug!(?kind, rejected = rejected.len(), "Rejected files of the wrong type");
        }
        Ok(AddOutcome {
            accepted,
            rejected: rejected.into_iter().map(|f| f.file_name).collect(),
        })
    }

    pub fn remove_new_file(
        &mut self,
        kind: MediaKind,
        index: usize,
    ) -> Result<Option<StagedFile>, FormError> {
        Ok(self.field_mut(kind)?.remove_new(index))
    }

    pub fn clear_new(&mut self, kind: MediaKind) -> Result<(), FormError> {
        self.field_mut(kind)?.clear_new();
        Ok(())
    }

    /// Mark or unmark an existing URL for deletion. Nothing is deleted until a submission
    /// succeeds.
    pub fn toggle_remove_existing(&mut self, kind: MediaKind, url: &str) -> Result<bool, FormError> {
        Ok(self.field_mut(kind)?.toggle_removed(url))
    }

    /// Drag-and-drop reorder of existing items.
    pub fn reorder_existing(
        &mut self,
        kind: MediaKind,
        from: usize,
        to: usize,
    ) -> Result<bool, FormError> {
        Ok(self.field_mut(kind)?.reorder(from, to))
    }

    /// Validate and build the payload, moving to `Submitting`. On validation failure the state
    /// is unchanged and nothing should be sent.
    pub fn begin_submit(&mut self, fields: &[(&str, String)]) -> Result<FormPayload, FormError> {
        match self.state {
            FormState::Submitting => return Err(FormError::AlreadySubmitting),
            FormState::Closed => return Err(FormError::Closed),
            FormState::Idle | FormState::Editing => {}
        }

        if self.mode == FormMode::Create
            && self.images.surviving_count() + self.videos.surviving_count() == 0
        {
            return Err(FormError::NoMedia);
        }

        let mut payload = FormPayload::new();
        for (name, value) in fields {
            payload.text(*name, value.clone());
        }
        for (kind, field) in [(MediaKind::Image, &self.images), (MediaKind::Video, &self.videos)] {
            for file in field.new_files() {
                payload.file(kind.upload_field(), file.clone());
            }
        }
        if self.mode == FormMode::Edit {
            for (kind, field) in [(MediaKind::Image, &self.images), (MediaKind::Video, &self.videos)]
            {
                for url in field.removed() {
                    payload.text(kind.remove_field(), url);
                }
            }
            for (kind, field) in [(MediaKind::Image, &self.images), (MediaKind::Video, &self.videos)]
            {
                for url in field.kept() {
                    payload.text(kind.order_field(), url);
                }
            }
        }

        self.state = FormState::Submitting;
        Ok(payload)
    }

    /// Settle a submission. Failure keeps every staged change for a retry.
    pub fn finish_submit(&mut self, succeeded: bool) {
        if self.state != FormState::Submitting {
            return;
        }
        self.state = if succeeded {
            FormState::Closed
        } else {
            FormState::Editing
        };
    }

    /// Validate, send and settle as one step.
    pub async fn submit_with(
        &mut self,
        fields: &[(&str, String)],
        sender: &dyn FormSender,
    ) -> Result<Value, FormError> {
        let payload = self.begin_submit(fields)?;
        let result = sender.send(payload).await;
        self.finish_submit(result.is_ok());
        if let Err(e) = &result {
            tracing::warn!(error = %e, "Media form submission failed");
        }
        Ok(result?)
    }
}
