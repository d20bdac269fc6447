use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::api::envelope::{decode_list, decode_record, Page, PageRequest};
use crate::api::{cancellable, ApiClient, ApiError, FormPayload, UploadProgress};
use crate::media::{MediaKind, StagedFile};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomepageVideo {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    pub video_url: String,
    #[serde(default)]
    pub video_public_id: Option<String>,
    #[serde(default)]
    pub display_order: i64,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HomepageVideoUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReorderBody<'a> {
    video_order: &'a [String],
}

pub struct HomepageVideos<'a> {
    client: &'a ApiClient,
}

impl ApiClient {
    pub fn homepage_videos(&self) -> HomepageVideos<'_> {
        HomepageVideos { client: self }
    }
}

impl HomepageVideos<'_> {
    pub async fn list(&self, cancel: &CancellationToken) -> Result<Page<HomepageVideo>, ApiError> {
        cancellable(cancel, async {
            let body = self.client.get("/admin/homepage-videos").await?;
            let mut page: Page<HomepageVideo> =
                decode_list(body, "videos", PageRequest::default())?;
            page.data.sort_by_key(|v| v.display_order);
            Ok(page)
        })
        .await
    }

    /// Upload a new homepage video. Only `video/*` files are accepted.
    pub async fn create(
        &self,
        title: Option<&str>,
        video: StagedFile,
        active: Option<bool>,
        progress: Option<&UploadProgress>,
    ) -> Result<HomepageVideo, ApiError> {
        if !MediaKind::Video.default_policy().accepts(&video.mime_type) {
            return Err(ApiError::invalid(format!(
                "{} is {}, not a video",
                video.file_name, video.mime_type
            )));
        }

        let mut payload = FormPayload::new();
        if let Some(title) = title.filter(|t| !t.trim().is_empty()) {
            payload.text("title", title);
        }
        payload.file("video", video);
        if let Some(active) = active {
            payload.text("active", active.to_string());
        }

        let body = self
            .client
            .send_form(Method::POST, "/admin/homepage-videos", payload, progress)
            .await?;
        let created: HomepageVideo = decode_record(body, "video")?;
        tracing::debug!(video_id = %created.id, "Uploaded homepage video");
        Ok(created)
    }

    pub async fn update(
        &self,
        id: &str,
        update: &HomepageVideoUpdate,
    ) -> Result<HomepageVideo, ApiError> {
        let body = self
            .client
            .put(&format!("/admin/homepage-videos/{id}"), update)
            .await?;
        decode_record(body, "video")
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .delete(&format!("/admin/homepage-videos/{id}"))
            .await?;
        tracing::debug!(video_id = %id, "Deleted homepage video");
        Ok(())
    }

    /// Persist a new display order, given as the full list of video ids.
    pub async fn reorder(&self, ids: &[String]) -> Result<(), ApiError> {
        self.client
            .put("/admin/homepage-videos/reorder", &ReorderBody { video_order: ids })
            .await?;
        tracing::debug!(count = ids.len(), "Reordered homepage videos");
        Ok(())
    }
}
