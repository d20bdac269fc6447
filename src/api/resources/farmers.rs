use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::api::envelope::{decode_list, decode_record, Page, PageRequest};
use crate::api::{cancellable, ApiClient, ApiError, FormPayload, UploadProgress};
use crate::media::{
    AcceptPolicy, FormError, FormSender, MediaForm, MultipartUpload, WEB_IMAGE_TYPES,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Farmer {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub farm_name: Option<String>,
    #[serde(default)]
    pub farm_description: Option<String>,
    #[serde(default)]
    pub farm_images: Vec<String>,
    #[serde(default)]
    pub farm_videos: Vec<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

/// Text fields of the farmer form. Blank optional fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FarmerFields {
    pub name: String,
    pub phone: String,
    pub address: String,
    pub farm_name: String,
    pub farm_description: String,
}

impl FarmerFields {
    pub fn from_farmer(farmer: &Farmer) -> Self {
        Self {
            name: farmer.name.clone(),
            phone: farmer.phone.clone().unwrap_or_default(),
            address: farmer.address.clone().unwrap_or_default(),
            farm_name: farmer.farm_name.clone().unwrap_or_default(),
            farm_description: farmer.farm_description.clone().unwrap_or_default(),
        }
    }

    pub fn to_parts(&self) -> Vec<(&'static str, String)> {
        let mut parts = vec![("name", self.name.trim().to_string())];
        for (key, value) in [
            ("phone", &self.phone),
            ("address", &self.address),
            ("farmName", &self.farm_name),
            ("farmDescription", &self.farm_description),
        ] {
            if !value.trim().is_empty() {
                parts.push((key, value.clone()));
            }
        }
        parts
    }
}

/// Create or edit form for a farmer, including farm photos and videos.
#[derive(Debug, Clone)]
pub struct FarmerForm {
    pub fields: FarmerFields,
    pub media: MediaForm,
    farmer_id: Option<String>,
}

impl FarmerForm {
    pub fn create(fields: FarmerFields) -> Self {
        Self {
            fields,
            media: MediaForm::create().with_image_policy(AcceptPolicy::OneOf(WEB_IMAGE_TYPES)),
            farmer_id: None,
        }
    }

    pub fn edit(farmer: &Farmer) -> Self {
        Self {
            fields: FarmerFields::from_farmer(farmer),
            media: MediaForm::edit(farmer.farm_images.clone(), farmer.farm_videos.clone())
                .with_image_policy(AcceptPolicy::OneOf(WEB_IMAGE_TYPES)),
            farmer_id: Some(farmer.id.clone()),
        }
    }

    pub async fn submit_via(&mut self, sender: &dyn FormSender) -> Result<Value, FormError> {
        if self.fields.name.trim().is_empty() {
            return Err(FormError::MissingField { field: "name" });
        }
        let parts: Vec<(&str, String)> = self.fields.to_parts();
        self.media.submit_with(&parts, sender).await
    }

    pub async fn submit(
        &mut self,
        client: &ApiClient,
        progress: Option<&UploadProgress>,
    ) -> Result<Value, FormError> {
        let upload = match &self.farmer_id {
            Some(id) => MultipartUpload::put(client, format!("/admin/farmers/{id}")),
            None => MultipartUpload::post(client, "/admin/farmers"),
        }
        .with_progress(progress);
        self.submit_via(&upload).await
    }
}

pub struct Farmers<'a> {
    client: &'a ApiClient,
}

impl ApiClient {
    pub fn farmers(&self) -> Farmers<'_> {
        Farmers { client: self }
    }
}

impl Farmers<'_> {
    pub async fn list(&self, cancel: &CancellationToken) -> Result<Page<Farmer>, ApiError> {
        cancellable(cancel, async {
            let body = self.client.get("/admin/farmers").await?;
            decode_list(body, "farmers", PageRequest::default())
        })
        .await
    }

    pub async fn get(&self, id: &str, cancel: &CancellationToken) -> Result<Farmer, ApiError> {
        cancellable(cancel, async {
            let body = self.client.get(&format!("/admin/farmers/{id}")).await?;
            decode_record(body, "farmer")
        })
        .await
    }

    pub async fn create(
        &self,
        payload: FormPayload,
        progress: Option<&UploadProgress>,
    ) -> Result<Value, ApiError> {
        MultipartUpload::post(self.client, "/admin/farmers")
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
        MultipartUpload::put(self.client, format!("/admin/farmers/{id}"))
            .with_progress(progress)
            .send(payload)
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete(&format!("/admin/farmers/{id}")).await?;
        tracing::debug!(farmer_id = %id, "Deleted farmer");
        Ok(())
    }
}
