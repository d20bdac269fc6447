//! One module per backend resource. Each exposes a borrowed handle on [`ApiClient`], e.g.
//! `client.coupons().list(..)`.
//!
//! [`ApiClient`]: crate::api::ApiClient

pub mod analytics;
pub mod audit;
pub mod auth;
pub mod categories;
pub mod coupons;
pub mod delivery;
pub mod farmers;
pub mod homepage_videos;
pub mod orders;
pub mod products;

pub use analytics::Analytics;
pub use audit::AuditLog;
pub use auth::AdminUser;
pub use categories::Category;
pub use coupons::{Coupon, CouponInput, CouponType};
pub use delivery::{CityRates, CitySettings, DeliveryPatch, DeliverySettings};
pub use farmers::{Farmer, FarmerFields, FarmerForm};
pub use homepage_videos::HomepageVideo;
pub use orders::{Order, OrderItem, OrderStatus, OrdersQuery};
pub use products::{Product, ProductFields, ProductForm, UnitSelection, UnitType};
