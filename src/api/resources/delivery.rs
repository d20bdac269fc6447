use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::api::envelope::decode;
use crate::api::{cancellable, ApiClient, ApiError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitySettings {
    pub name: String,
    #[serde(default)]
    pub base_price: f64,
    #[serde(default)]
    pub price_per_kg: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub free_delivery_threshold: Option<f64>,
}

/// Per-city rates, as sent to the city route (the name travels in the path).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CityRates {
    pub base_price: f64,
    pub price_per_kg: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_delivery_threshold: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliverySettings {
    #[serde(default, rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub min_order_subtotal: f64,
    #[serde(default)]
    pub delivery_fee: Option<f64>,
    #[serde(default)]
    pub free_delivery_threshold: Option<f64>,
    #[serde(default)]
    pub cities: Vec<CitySettings>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Partial update of the global settings. Unset fields are left alone by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_order_subtotal: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_fee: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_delivery_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cities: Option<Vec<CitySettings>>,
}

/// Settings come back bare or wrapped in `data`.
fn decode_settings(body: Value) -> Result<DeliverySettings, ApiError> {
    match body {
        Value::Object(mut map) if matches!(map.get("data"), Some(Value::Object(_))) => {
            decode(map.remove("data").unwrap_or_default())
        }
        Value::Null => Ok(DeliverySettings::default()),
        other => decode(other),
    }
}

pub struct Delivery<'a> {
    client: &'a ApiClient,
}

impl ApiClient {
    pub fn delivery(&self) -> Delivery<'_> {
        Delivery { client: self }
    }
}

impl Delivery<'_> {
    pub async fn get(&self, cancel: &CancellationToken) -> Result<DeliverySettings, ApiError> {
        cancellable(cancel, async {
            decode_settings(self.client.get("/admin/delivery-settings").await?)
        })
        .await
    }

    pub async fn update(&self, patch: &DeliveryPatch) -> Result<DeliverySettings, ApiError> {
        let body = self.client.put("/admin/delivery-settings", patch).await?;
        tracing::debug!("Updated delivery settings");
        decode_settings(body)
    }

    pub async fn update_city(&self, name: &str, rates: &CityRates) -> Result<DeliverySettings, ApiError> {
        let url = self
            .client
            .url_segments(&["admin", "delivery-settings", "cities", name])?;
        let body = self.client.send_json(Method::PUT, url, rates).await?;
        tracing::debug!(city = %name, "Updated city delivery rates");
        decode_settings(body)
    }

    pub async fn delete_city(&self, name: &str) -> Result<DeliverySettings, ApiError> {
        let url = self
            .client
            .url_segments(&["admin", "delivery-settings", "cities", name])?;
        let body = self.client.send_empty(Method::DELETE, url).await?;
        tracing::debug!(city = %name, "Deleted city delivery rates");
        decode_settings(body)
    }

    /// Settings as shown to shoppers.
    pub async fn public(&self, cancel: &CancellationToken) -> Result<DeliverySettings, ApiError> {
        cancellable(cancel, async {
            decode_settings(self.client.get("/public/settings/delivery").await?)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::spawn_backend;
    use axum::extract::Path;
    use axum::routing::{get, put};
    use axum::{Json, Router};
    use serde_json::json;

    #[test]
    fn test_patch_omits_unset_fields() {
        let patch = DeliveryPatch {
            enabled: Some(false),
            free_delivery_threshold: Some(499.0),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!({"enabled": false, "freeDeliveryThreshold": 499.0})
        );
    }

    #[test]
    fn test_wrapped_and_bare_settings_decode_alike() {
        let bare = json!({"enabled": true, "minOrderSubtotal": 200, "deliveryFee": 30});
        let wrapped = json!({"success": true, "data": bare.clone()});
        assert_eq!(
            decode_settings(bare).unwrap(),
            decode_settings(wrapped).unwrap()
        );
    }

    #[tokio::test]
    async fn test_city_name_is_path_encoded() {
        let router = Router::new().route(
            "/api/admin/delivery-settings/cities/:name",
            put(|Path(name): Path<String>, Json(rates): Json<Value>| async move {
                Json(json!({
                    "enabled": true,
                    "minOrderSubtotal": 0,
                    "cities": [{
                        "name": name,
                        "basePrice": rates["basePrice"],
                        "pricePerKg": rates["pricePerKg"]
                    }]
                }))
            }),
        );
        let client = spawn_backend(router).await;

        let settings = client
            .delivery()
            .update_city(
                "Mysuru City/North",
                &CityRates {
                    base_price: 40.0,
                    price_per_kg: 5.0,
                    free_delivery_threshold: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(settings.cities[0].name, "Mysuru City/North");
        assert_eq!(settings.cities[0].base_price, 40.0);
    }

    #[tokio::test]
    async fn test_public_settings() {
        let router = Router::new().route(
            "/api/public/settings/delivery",
            get(|| async { Json(json!({"data": {"enabled": true, "deliveryFee": 25, "freeDeliveryThreshold": 500}})) }),
        );
        let client = spawn_backend(router).await;

        let settings = client
            .delivery()
            .public(&CancellationToken::new())
            .await
            .unwrap();
        assert!(settings.enabled);
        assert_eq!(settings.delivery_fee, Some(25.0));
    }
}
