use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::api::envelope::{decode_list, decode_record, Page, PageRequest};
use crate::api::{cancellable, ApiClient, ApiError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ListCategoriesParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
}

#[derive(Serialize)]
struct NameBody<'a> {
    name: &'a str,
}

pub struct Categories<'a> {
    client: &'a ApiClient,
}

impl ApiClient {
    pub fn categories(&self) -> Categories<'_> {
        Categories { client: self }
    }
}

impl Categories<'_> {
    /// Public list used to populate category pickers.
    pub async fn list_public(&self, cancel: &CancellationToken) -> Result<Vec<Category>, ApiError> {
        cancellable(cancel, async {
            let body = self.client.get("/categories").await?;
            let page: Page<Category> = decode_list(body, "categories", PageRequest::default())?;
            Ok(page.data)
        })
        .await
    }

    pub async fn list(
        &self,
        params: &ListCategoriesParams,
        cancel: &CancellationToken,
    ) -> Result<Page<Category>, ApiError> {
        cancellable(cancel, async {
            let body = self.client.get_query("/admin/categories", params).await?;
            decode_list(
                body,
                "categories",
                PageRequest {
                    page: params.page,
                    limit: params.limit,
                },
            )
        })
        .await
    }

    pub async fn create(&self, name: &str) -> Result<Category, ApiError> {
        let name = validate_name(name)?;
        let body = self
            .client
            .post("/admin/categories", &NameBody { name })
            .await
            .map_err(|e| e.with_message_for(StatusCode::CONFLICT, "Category already exists"))?;
        tracing::debug!(name, "Created category");
        decode_record(body, "category")
    }

    pub async fn update(&self, id: &str, name: &str) -> Result<Category, ApiError> {
        let name = validate_name(name)?;
        let body = self
            .client
            .put(&format!("/admin/categories/{id}"), &NameBody { name })
            .await
            .map_err(|e| {
                e.with_message_for(StatusCode::CONFLICT, "Category already exists")
                    .with_message_for(StatusCode::NOT_FOUND, "Category not found")
            })?;
        tracing::debug!(category_id = %id, "Updated category");
        decode_record(body, "category")
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .delete(&format!("/admin/categories/{id}"))
            .await
            .map_err(|e| e.with_message_for(StatusCode::NOT_FOUND, "Category not found"))?;
        tracing::debug!(category_id = %id, "Deleted category");
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<&str, ApiError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::invalid("category name must not be empty"));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::spawn_backend;
    use axum::extract::State;
    use axum::http::StatusCode as AxumStatus;
    use axum::response::IntoResponse;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    type Names = Arc<Mutex<HashSet<String>>>;

    async fn create_handler(State(names): State<Names>, Json(body): Json<Value>) -> impl IntoResponse {
        let name = body["name"].as_str().unwrap_or_default().to_string();
        let mut names = names.lock().unwrap();
        if !names.insert(name.to_lowercase()) {
            return (
                AxumStatus::CONFLICT,
                Json(json!({"message": "E11000 duplicate key"})),
            );
        }
        (
            AxumStatus::CREATED,
            Json(json!({"data": {"_id": format!("c{}", names.len()), "name": name, "slug": "leafy-greens"}})),
        )
    }

    #[tokio::test]
    async fn test_duplicate_category_surfaces_conflict() {
        let router = Router::new()
            .route("/api/admin/categories", post(create_handler))
            .with_state(Names::default());
        let client = spawn_backend(router).await;

        let created = client.categories().create("Leafy Greens").await.unwrap();
        assert_eq!(created.name, "Leafy Greens");
        assert_eq!(created.slug.as_deref(), Some("leafy-greens"));

        let err = client.categories().create("Leafy Greens").await.unwrap_err();
        assert!(err.is_status(StatusCode::CONFLICT));
        assert_eq!(err.to_string(), "Category already exists");
    }

    #[tokio::test]
    async fn test_update_missing_category_is_not_found() {
        let client = spawn_backend(Router::new()).await;
        let err = client.categories().update("nope", "Herbs").await.unwrap_err();
        assert_eq!(err.to_string(), "Category not found");
    }

    #[tokio::test]
    async fn test_blank_name_never_reaches_network() {
        let client = spawn_backend(Router::new()).await;
        let err = client.categories().create("   ").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidRequest(_)));
    }
}
