use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::categories::Category;
use crate::api::envelope::{decode_list, decode_record, Page, PageRequest};
use crate::api::{cancellable, ApiClient, ApiError, FormPayload, UploadProgress};
use crate::media::{FormError, FormSender, MediaForm, MultipartUpload};

// ============================================================================
// Types
// ============================================================================

/// A product's category, either as an id or populated by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CategoryRef {
    Populated(Category),
    Id(String),
}

impl CategoryRef {
    pub fn id(&self) -> &str {
        match self {
            CategoryRef::Populated(c) => &c.id,
            CategoryRef::Id(id) => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    #[serde(default, alias = "categoryId")]
    pub category: Option<CategoryRef>,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub videos: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_organic: Option<bool>,
    #[serde(default)]
    pub farmer_id: Option<String>,
    #[serde(default)]
    pub g: Option<f64>,
    #[serde(default)]
    pub pieces: Option<f64>,
    #[serde(default)]
    pub litre: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitType {
    None,
    Grams,
    Pieces,
    Litre,
}

/// The unit fields of a product form. At most one unit field is ever sent.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UnitSelection {
    /// Explicit selection; `None` means the operator never picked one
    pub unit_type: Option<UnitType>,
    pub g: f64,
    pub pieces: f64,
    pub litre: f64,
}

impl UnitSelection {
    /// Seed from a product: the first positive unit becomes the explicit selection.
    pub fn from_product(product: &Product) -> Self {
        let g = product.g.unwrap_or_default();
        let pieces = product.pieces.unwrap_or_default();
        let litre = product.litre.unwrap_or_default();
        let unit_type = if g > 0.0 {
            UnitType::Grams
        } else if pieces > 0.0 {
            UnitType::Pieces
        } else if litre > 0.0 {
            UnitType::Litre
        } else {
            UnitType::None
        };
        Self {
            unit_type: Some(unit_type),
            g,
            pieces,
            litre,
        }
    }

    /// The single unit field to transmit. An explicit selection wins and is sent only when
    /// positive; `none` sends nothing; with no selection the first positive of `g`, `pieces`,
    /// `litre` is used.
    pub fn resolve(&self) -> Option<(&'static str, f64)> {
        let candidates = [
            (UnitType::Grams, "g", self.g),
            (UnitType::Pieces, "pieces", self.pieces),
            (UnitType::Litre, "litre", self.litre),
        ];
        match self.unit_type {
            Some(UnitType::None) => None,
            Some(selected) => candidates
                .into_iter()
                .find(|(t, _, v)| *t == selected && *v > 0.0)
                .map(|(_, name, v)| (name, v)),
            None => candidates
                .into_iter()
                .find(|(_, _, v)| *v > 0.0)
                .map(|(_, name, v)| (name, v)),
        }
    }
}

/// Text fields of the product form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFields {
    pub name: String,
    pub category_id: String,
    pub price: f64,
    pub stock: i64,
    pub description: String,
    pub is_organic: bool,
    pub units: UnitSelection,
}

impl ProductFields {
    pub fn from_product(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            category_id: product
                .category
                .as_ref()
                .map(|c| c.id().to_string())
                .unwrap_or_default(),
            price: product.price,
            stock: product.stock,
            description: product.description.clone().unwrap_or_default(),
            is_organic: product.is_organic.unwrap_or(false),
            units: UnitSelection::from_product(product),
        }
    }

    fn validate(&self) -> Result<(), FormError> {
        if self.name.trim().is_empty() {
            return Err(FormError::MissingField { field: "name" });
        }
        if self.category_id.trim().is_empty() {
            return Err(FormError::MissingField { field: "category" });
        }
        Ok(())
    }

    pub fn to_parts(&self) -> Vec<(&'static str, String)> {
        let mut parts = vec![
            ("name", self.name.trim().to_string()),
            ("categoryId", self.category_id.clone()),
            ("price", self.price.to_string()),
            ("stock", self.stock.to_string()),
            ("description", self.description.clone()),
            ("isOrganic", self.is_organic.to_string()),
        ];
        if let Some((field, value)) = self.units.resolve() {
            parts.push((field, value.to_string()));
        }
        parts
    }
}

// ============================================================================
// Form
// ============================================================================

/// Create or edit form for a product, including its media.
#[derive(Debug, Clone)]
pub struct ProductForm {
    pub fields: ProductFields,
    pub media: MediaForm,
    product_id: Option<String>,
}

impl ProductForm {
    pub fn create(fields: ProductFields) -> Self {
        Self {
            fields,
            media: MediaForm::create(),
            product_id: None,
        }
    }

    /// Edit form. Products created before multi-image support only carry `imageUrl`.
    pub fn edit(product: &Product) -> Self {
        let images = if product.images.is_empty() {
            product.image_url.clone().into_iter().collect()
        } else {
            product.images.clone()
        };
        Self {
            fields: ProductFields::from_product(product),
            media: MediaForm::edit(images, product.videos.clone()),
            product_id: Some(product.id.clone()),
        }
    }

    pub async fn submit_via(&mut self, sender: &dyn FormSender) -> Result<Value, FormError> {
        self.fields.validate()?;
        let parts: Vec<(&str, String)> = self.fields.to_parts();
        self.media.submit_with(&parts, sender).await
    }

    pub async fn submit(
        &mut self,
        client: &ApiClient,
        progress: Option<&UploadProgress>,
    ) -> Result<Value, FormError> {
        let upload = match &self.product_id {
            Some(id) => MultipartUpload::put(client, format!("/products/{id}")),
            None => MultipartUpload::post(client, "/products"),
        }
        .with_progress(progress);
        self.submit_via(&upload).await
    }
}

// ============================================================================
// Operations
// ============================================================================

pub struct Products<'a> {
    client: &'a ApiClient,
}

impl ApiClient {
    pub fn products(&self) -> Products<'_> {
        Products { client: self }
    }
}

impl Products<'_> {
    pub async fn list(&self, cancel: &CancellationToken) -> Result<Page<Product>, ApiError> {
        cancellable(cancel, async {
            let body = self.client.get("/products").await?;
            decode_list(body, "products", PageRequest::default())
        })
        .await
    }

    pub async fn get(&self, id: &str, cancel: &CancellationToken) -> Result<Product, ApiError> {
        cancellable(cancel, async {
            let body = self.client.get(&format!("/products/{id}")).await?;
            decode_record(body, "product")
        })
        .await
    }

    pub async fn create(
        &self,
        payload: FormPayload,
        progress: Option<&UploadProgress>,
    ) -> Result<Value, ApiError> {
        MultipartUpload::post(self.client, "/products")
            .with_progress(progress)
            .send(payload)
            .await
    }

    pub async fn update(
        &self,
        id: &str,
        payload: FormPayload,
        progress: Option<&UploadProgress>,
    ) -> Result<Value, ApiError> {
        MultipartUpload::put(self.client, format!("/products/{id}"))
            .with_progress(progress)
            .send(payload)
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete(&format!("/products/{id}")).await?;
        tracing::debug!(product_id = %id, "Deleted product");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_explicit_selection_without_value_sends_nothing() {
        let units = UnitSelection {
            unit_type: Some(UnitType::Pieces),
            g: 250.0,
            ..Default::default()
        };
        assert_eq!(units.resolve(), None);
    }

    #[test]
    fn test_explicit_none_suppresses_positive_values() {
        let units = UnitSelection {
            unit_type: Some(UnitType::None),
            g: 250.0,
            pieces: 4.0,
            litre: 1.0,
        };
        assert_eq!(units.resolve(), None);
    }

    #[test]
    fn test_product_decodes_populated_category() {
        let product: Product = serde_json::from_value(json!({
            "_id": "p1",
            "name": "Spinach",
            "category": {"_id": "c1", "name": "Leafy Greens"},
            "price": 30,
            "stock": 12,
            "g": 250
        }))
        .unwrap();
        assert_eq!(product.category.as_ref().unwrap().id(), "c1");

        let fields = ProductFields::from_product(&product);
        assert_eq!(fields.category_id, "c1");
        assert_eq!(fields.units.unit_type, Some(UnitType::Grams));
    }

    #[test]
    fn test_legacy_image_url_seeds_edit_form() {
        let product: Product = serde_json::from_value(json!({
            "_id": "p2",
            "name": "Okra",
            "categoryId": "c9",
            "imageUrl": "https://cdn/okra.jpg"
        }))
        .unwrap();
        let form = ProductForm::edit(&product);
        assert_eq!(
            form.media.field(crate::media::MediaKind::Image).existing(),
            ["https://cdn/okra.jpg"]
        );
        assert_eq!(form.fields.category_id, "c9");
    }
}
