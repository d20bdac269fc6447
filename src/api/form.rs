use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use reqwest::Body;
use tokio_util::io::ReaderStream;

use super::progress::{ProgressReader, ProgressTracker, RequestId, UploadProgress};
use super::ApiError;
use crate::media::StagedFile;

/// One part of a multipart submission.
#[derive(Debug, Clone, PartialEq)]
pub enum FormPart {
    Text { name: String, value: String },
    File { name: String, file: StagedFile },
}

impl FormPart {
    pub fn name(&self) -> &str {
        match self {
            FormPart::Text { name, .. } | FormPart::File { name, .. } => name,
        }
    }
}

/// Ordered multipart payload. Repeated names are kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormPayload {
    parts: Vec<FormPart>,
}

impl FormPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.parts.push(FormPart::Text {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn file(&mut self, name: impl Into<String>, file: StagedFile) -> &mut Self {
        self.parts.push(FormPart::File {
            name: name.into(),
            file,
        });
        self
    }

    pub fn parts(&self) -> &[FormPart] {
        &self.parts
    }

    /// All text values sent under `name`, in order.
    pub fn texts(&self, name: &str) -> Vec<&str> {
        self.parts
            .iter()
            .filter_map(|p| match p {
                FormPart::Text { name: n, value } if n == name => Some(value.as_str()),
                _ => None,
            })
            .collect()
    }

    /// All files sent under `name`, in order.
    pub fn files(&self, name: &str) -> Vec<&StagedFile> {
        self.parts
            .iter()
            .filter_map(|p| match p {
                FormPart::File { name: n, file } if n == name => Some(file),
                _ => None,
            })
            .collect()
    }

    pub fn upload_bytes(&self) -> u64 {
        self.parts
            .iter()
            .map(|p| match p {
                FormPart::File { file, .. } => file.len() as u64,
                FormPart::Text { .. } => 0,
            })
            .sum()
    }

    /// Build the reqwest form. When `progress` is given, file parts stream through a counting
    /// reader that reports to the registry under `id`.
    pub(crate) fn into_multipart(
        self,
        progress: Option<(&UploadProgress, &RequestId)>,
    ) -> Result<Form, ApiError> {
        let tracker = progress.map(|(registry, id)| {
            Arc::new(ProgressTracker::new(
                registry.clone(),
                id.clone(),
                self.upload_bytes(),
            ))
        });

        let mut form = Form::new();
        for part in self.parts {
            form = match part {
                FormPart::Text { name, value } => form.text(name, value),
                FormPart::File { name, file } => {
                    let len = file.len() as u64;
                    let body = match &tracker {
                        Some(tracker) => {
                            let reader = ProgressReader::new(
                                std::io::Cursor::new(file.data.clone()),
                                tracker.clone(),
                            );
                            Body::wrap_stream(ReaderStream::new(reader))
                        }
                        None => Body::from(file.data.clone()),
                    };
                    let part = Part::stream_with_length(body, len)
                        .file_name(file.file_name.clone())
                        .mime_str(&file.mime_type)?;
                    form.part(name, part)
                }
            };
        }
        Ok(form)
    }
}
