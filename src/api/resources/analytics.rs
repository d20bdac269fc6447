use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::api::envelope::decode;
use crate::api::{cancellable, ApiClient, ApiError};

/// Dashboard totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    #[serde(default)]
    pub total_users: u64,
    #[serde(default)]
    pub total_orders: u64,
    #[serde(default)]
    pub total_products: u64,
    #[serde(default)]
    pub total_sales: f64,
}

pub struct AnalyticsApi<'a> {
    client: &'a ApiClient,
}

impl ApiClient {
    pub fn analytics(&self) -> AnalyticsApi<'_> {
        AnalyticsApi { client: self }
    }
}

impl AnalyticsApi<'_> {
    pub async fn get(&self, cancel: &CancellationToken) -> Result<Analytics, ApiError> {
        cancellable(cancel, async {
            match self.client.get("/admin/analytics").await? {
                Value::Object(mut map) if matches!(map.get("data"), Some(Value::Object(_))) => {
                    decode(map.remove("data").unwrap_or_default())
                }
                other => decode(other),
            }
        })
        .await
    }
}
