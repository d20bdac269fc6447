use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::api::envelope::{decode_list, Page, PageRequest};
use crate::api::{cancellable, ApiClient, ApiError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub actor: Option<Actor>,
    pub action: String,
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub resource_id: Option<String>,
    #[serde(default)]
    pub details: Option<Value>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl AuditLog {
    pub fn actor_label(&self) -> &str {
        self.actor
            .as_ref()
            .and_then(|a| a.name.as_deref().or(a.email.as_deref()))
            .unwrap_or("system")
    }
}

#[derive(Serialize)]
struct AuditQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
}

pub struct AuditLogs<'a> {
    client: &'a ApiClient,
}

impl ApiClient {
    pub fn audit_logs(&self) -> AuditLogs<'_> {
        AuditLogs { client: self }
    }
}

impl AuditLogs<'_> {
    pub async fn list(
        &self,
        page: Option<u32>,
        limit: Option<u32>,
        cancel: &CancellationToken,
    ) -> Result<Page<AuditLog>, ApiError> {
        cancellable(cancel, async {
            let body = self
                .client
                .get_query("/admin/audit-logs", &AuditQuery { page, limit })
                .await?;
            decode_list(body, "logs", PageRequest { page, limit })
        })
        .await
    }
}
