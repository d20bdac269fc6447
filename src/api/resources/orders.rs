use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::api::envelope::{decode_list, decode_record, Page, PageRequest};
use crate::api::{cancellable, ApiClient, ApiError};

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 4] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown order status '{0}' (expected pending, confirmed, delivered or cancelled)")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// The ordering customer, populated or as a bare id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserRef {
    Populated(UserSummary),
    Id(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl UserRef {
    /// Name, then username, then email. A bare id displays as nothing.
    pub fn display_name(&self) -> &str {
        match self {
            UserRef::Id(_) => "",
            UserRef::Populated(user) => [&user.name, &user.username, &user.email]
                .into_iter()
                .flatten()
                .map(String::as_str)
                .find(|s| !s.is_empty())
                .unwrap_or(""),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductRef {
    Populated(ProductSummary),
    Id(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    #[serde(default, rename = "productId")]
    pub product: Option<ProductRef>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub unit_label: Option<String>,
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub price: f64,
}

impl OrderItem {
    /// Line title: the item's own name, then the populated product name.
    pub fn title(&self) -> &str {
        let product_name = match &self.product {
            Some(ProductRef::Populated(p)) => p.name.as_deref(),
            _ => None,
        };
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .or(product_name.filter(|n| !n.is_empty()))
            .unwrap_or("[product]")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default, rename = "userId")]
    pub user: Option<UserRef>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub total_price: f64,
    pub status: OrderStatus,
    #[serde(default)]
    pub payment_mode: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn customer(&self) -> &str {
        self.user.as_ref().map(UserRef::display_name).unwrap_or("")
    }
}

/// Filters for the admin order list.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrdersQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
}

/// Partial order update. Unset fields are not sent.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_mode: Option<String>,
}

#[derive(Serialize)]
struct StatusBody {
    status: OrderStatus,
}

// ============================================================================
// Operations
// ============================================================================

pub struct Orders<'a> {
    client: &'a ApiClient,
}

impl ApiClient {
    pub fn orders(&self) -> Orders<'_> {
        Orders { client: self }
    }
}

impl Orders<'_> {
    pub async fn list(
        &self,
        query: &OrdersQuery,
        cancel: &CancellationToken,
    ) -> Result<Page<Order>, ApiError> {
        cancellable(cancel, async {
            let body = self.client.get_query("/admin/orders", query).await?;
            decode_list(
                body,
                "orders",
                PageRequest {
                    page: query.page,
                    limit: query.limit,
                },
            )
        })
        .await
    }

    pub async fn get(&self, id: &str, cancel: &CancellationToken) -> Result<Order, ApiError> {
        cancellable(cancel, async {
            let body = self.client.get(&format!("/admin/orders/{id}")).await?;
            decode_record(body, "order")
        })
        .await
    }

    pub async fn update(&self, id: &str, patch: &OrderPatch) -> Result<(), ApiError> {
        self.client
            .put(&format!("/admin/orders/{id}"), patch)
            .await?;
        tracing::debug!(order_id = %id, "Updated order");
        Ok(())
    }

    /// Change an order's status. Backends without the admin route get the legacy
    /// `PUT /orders/:id/status` instead.
    pub async fn update_status(&self, id: &str, status: OrderStatus) -> Result<(), ApiError> {
        let body = StatusBody { status };
        match self
            .client
            .patch(&format!("/admin/orders/{id}/status"), &body)
            .await
        {
            Ok(_) => {}
            Err(e)
                if e.is_status(StatusCode::NOT_FOUND)
                    || e.is_status(StatusCode::METHOD_NOT_ALLOWED) =>
            {
                tracing::warn!(order_id = %id, "Admin status route unavailable, using legacy route");
                self.client
                    .put(&format!("/orders/{id}/status"), &body)
                    .await?;
            }
            Err(e) => return Err(e),
        }
        tracing::debug!(order_id = %id, %status, "Updated order status");
        Ok(())
    }
}
