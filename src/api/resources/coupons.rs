//! Coupons. The dashboard's coupon model differs from the backend's; [`CouponWire`] is the
//! server shape and the conversions below are the only place the two meet.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::api::envelope::{decode_list, decode_record, Page, PageRequest};
use crate::api::{cancellable, ApiClient, ApiError};

// ============================================================================
// Client model
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CouponType {
    Percent,
    Flat,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coupon {
    pub id: String,
    pub code: String,
    pub kind: CouponType,
    pub value: f64,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub usage_limit: Option<u32>,
    pub used_count: Option<u32>,
    pub min_amount: Option<f64>,
    pub max_discount: Option<f64>,
    pub active: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Fields for create and partial update. Unset fields are not sent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CouponInput {
    pub code: Option<String>,
    pub kind: Option<CouponType>,
    pub value: Option<f64>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub usage_limit: Option<u32>,
    pub min_amount: Option<f64>,
    pub max_discount: Option<f64>,
    pub active: Option<bool>,
}

// ============================================================================
// Server model
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    Percentage,
    Flat,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponWire {
    #[serde(rename = "_id", alias = "id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_type: Option<DiscountType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_order_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_discount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<CouponType> for DiscountType {
    fn from(kind: CouponType) -> Self {
        match kind {
            CouponType::Percent => DiscountType::Percentage,
            CouponType::Flat => DiscountType::Flat,
        }
    }
}

impl From<DiscountType> for CouponType {
    fn from(kind: DiscountType) -> Self {
        match kind {
            DiscountType::Percentage => CouponType::Percent,
            DiscountType::Flat => CouponType::Flat,
        }
    }
}

impl From<&CouponInput> for CouponWire {
    fn from(input: &CouponInput) -> Self {
        CouponWire {
            code: input
                .code
                .as_deref()
                .map(|c| c.trim().to_uppercase())
                .filter(|c| !c.is_empty()),
            discount_type: input.kind.map(DiscountType::from),
            discount_value: input.value,
            starts_at: input.start_at,
            expires_at: input.end_at,
            usage_limit: input.usage_limit,
            min_order_value: input.min_amount,
            max_discount: input.max_discount,
            is_active: input.active,
            ..Default::default()
        }
    }
}

impl TryFrom<CouponWire> for Coupon {
    type Error = ApiError;

    fn try_from(wire: CouponWire) -> Result<Self, ApiError> {
        let id = wire
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ApiError::decode("coupon record has no id"))?;
        Ok(Coupon {
            id,
            code: wire.code.unwrap_or_default(),
            kind: wire
                .discount_type
                .map(CouponType::from)
                .unwrap_or(CouponType::Flat),
            value: wire.discount_value.unwrap_or_default(),
            start_at: wire.starts_at,
            end_at: wire.expires_at,
            usage_limit: wire.usage_limit,
            used_count: wire.usage_count,
            min_amount: wire.min_order_value,
            max_discount: wire.max_discount,
            active: wire.is_active.unwrap_or(false),
            created_at: wire.created_at,
            updated_at: wire.updated_at,
        })
    }
}

impl Coupon {
    /// Fields of this coupon as an input, e.g. to prefill an edit form.
    pub fn to_input(&self) -> CouponInput {
        CouponInput {
            code: Some(self.code.clone()),
            kind: Some(self.kind),
            value: Some(self.value),
            start_at: self.start_at,
            end_at: self.end_at,
            usage_limit: self.usage_limit,
            min_amount: self.min_amount,
            max_discount: self.max_discount,
            active: Some(self.active),
        }
    }
}

// ============================================================================
// Operations
// ============================================================================

#[derive(Debug, Clone, Default, Serialize)]
pub struct ListCouponsParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(rename = "isActive", skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

pub struct Coupons<'a> {
    client: &'a ApiClient,
}

impl ApiClient {
    pub fn coupons(&self) -> Coupons<'_> {
        Coupons { client: self }
    }
}

impl Coupons<'_> {
    /// Newest first. Records the server returns without an id are skipped.
    pub async fn list(
        &self,
        params: &ListCouponsParams,
        cancel: &CancellationToken,
    ) -> Result<Page<Coupon>, ApiError> {
        cancellable(cancel, async {
            let body = self.client.get_query("/admin/coupons", params).await?;
            let page: Page<CouponWire> = decode_list(
                body,
                "coupons",
                PageRequest {
                    page: params.page,
                    limit: params.limit,
                },
            )?;

            let mut page = page.filter_map(|wire| match Coupon::try_from(wire) {
                Ok(c) => Some(c),
                Err(_) => {
                    tracing::debug!("Skipping coupon without id");
                    None
                }
            });
            page.data.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(page)
        })
        .await
    }

    pub async fn create(&self, input: &CouponInput) -> Result<Coupon, ApiError> {
        if input.code.as_deref().map_or(true, |c| c.trim().is_empty()) {
            return Err(ApiError::invalid("coupon code is required"));
        }
        if input.value.is_some_and(|v| v < 0.0) {
            return Err(ApiError::invalid("coupon value must not be negative"));
        }
        let body = self
            .client
            .post("/admin/coupons", &CouponWire::from(input))
            .await?;
        let wire: CouponWire = decode_record(body, "coupon")?;
        Coupon::try_from(wire)
    }

    pub async fn update(&self, id: &str, input: &CouponInput) -> Result<Coupon, ApiError> {
        let body = self
            .client
            .put(&format!("/admin/coupons/{id}"), &CouponWire::from(input))
            .await?;
        let wire: CouponWire = decode_record(body, "coupon")?;
        Coupon::try_from(wire)
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete(&format!("/admin/coupons/{id}")).await?;
        tracing::debug!(coupon_id = %id, "Deleted coupon");
        Ok(())
    }
}
