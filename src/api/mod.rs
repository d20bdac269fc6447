mod client;
pub mod envelope;
mod form;
pub mod progress;
pub mod resources;
mod response;

pub use client::{cancellable, ApiClient};
pub use envelope::{Page, PageRequest};
pub use form::{FormPart, FormPayload};
pub use progress::{RequestId, UploadProgress};
pub use response::ApiError;
