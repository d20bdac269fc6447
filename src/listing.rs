//! State behind the paged list views: pagination math and optimistic row patches.

use crate::api::resources::{
    Category, Coupon, Farmer, HomepageVideo, Order, OrderStatus, Product,
};
use crate::api::{ApiClient, ApiError, Page};

/// Records that can be addressed by id within a list.
pub trait Identified {
    fn id(&self) -> &str;
}

macro_rules! identified_by_id_field {
    ($($ty:ty),* $(,)?) => {
        $(impl Identified for $ty {
            fn id(&self) -> &str {
                &self.id
            }
        })*
    };
}

identified_by_id_field!(Category, Coupon, Farmer, HomepageVideo, Order, Product);

// ============================================================================
// Pagination
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: u32,
    pub limit: u32,
    /// Unknown until the server reports it
    pub total: Option<u64>,
}

impl Pagination {
    pub fn new(limit: u32) -> Self {
        Self {
            page: 1,
            limit,
            total: None,
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn set_page(&mut self, page: u32) {
        self.page = page.max(1);
    }

    /// Page count, when both total and limit are known. Never less than 1.
    pub fn total_pages(&self) -> Option<u32> {
        match self.total {
            Some(total) if total > 0 && self.limit > 0 => {
                Some((total.div_ceil(u64::from(self.limit)) as u32).max(1))
            }
            Some(_) if self.limit > 0 => Some(1),
            _ => None,
        }
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// With an unknown page count, next is always allowed.
    pub fn has_next(&self) -> bool {
        self.total_pages().map_or(true, |pages| self.page < pages)
    }

    pub fn next(&mut self) -> bool {
        if !self.has_next() {
            return false;
        }
        self.page += 1;
        true
    }

    pub fn prev(&mut self) -> bool {
        if !self.has_prev() {
            return false;
        }
        self.page -= 1;
        true
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(20)
    }
}

// ============================================================================
// Rendered list
// ============================================================================

/// Snapshot taken before an optimistic patch.
#[derive(Debug, Clone)]
#[must_use = "an optimistic patch should be rolled back if the server rejects it"]
pub struct Rollback<T> {
    items: Vec<T>,
}

/// The page of records currently shown.
#[derive(Debug, Clone)]
pub struct ResourceList<T> {
    items: Vec<T>,
    pub pagination: Pagination,
}

impl<T: Identified + Clone> ResourceList<T> {
    pub fn new(limit: u32) -> Self {
        Self {
            items: Vec::new(),
            pagination: Pagination::new(limit),
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn find(&self, id: &str) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    /// Swap in a freshly fetched page.
    pub fn replace(&mut self, page: Page<T>) {
        self.pagination.total = Some(page.total);
        self.pagination.set_page(page.page);
        self.items = page.data;
    }

    /// Apply `f` to the row with `id` ahead of the server. Returns the prior state, or `None`
    /// when no such row is shown.
    pub fn patch_optimistic(&mut self, id: &str, f: impl FnOnce(&mut T)) -> Option<Rollback<T>> {
        let index = self.items.iter().position(|item| item.id() == id)?;
        let snapshot = Rollback {
            items: self.items.clone(),
        };
        f(&mut self.items[index]);
        Some(snapshot)
    }

    pub fn rollback(&mut self, rollback: Rollback<T>) {
        self.items = rollback.items;
    }
}

pub type OrderList = ResourceList<Order>;

impl ResourceList<Order> {
    /// Show the new status immediately and restore the previous list if the server refuses.
    pub async fn change_status(
        &mut self,
        client: &ApiClient,
        id: &str,
        status: OrderStatus,
    ) -> Result<(), ApiError> {
        let rollback = self.patch_optimistic(id, |order| order.status = status);
        match client.orders().update_status(id, status).await {
            Ok(()) => Ok(()),
            Err(e) => {
                if let Some(rollback) = rollback {
                    self.rollback(rollback);
                }
                tracing::warn!(order_id = %id, error = %e, "Status change rejected, rolled back");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::spawn_backend;
    use axum::http::StatusCode;
    use axum::routing::{patch, put};
    use axum::{Json, Router};
    use serde_json::json;

    fn order(id: &str, status: &str) -> Order {
        serde_json::from_value(json!({
            "_id": id,
            "userId": {"_id": "u1", "name": "Asha"},
            "items": [],
            "totalPrice": 100,
            "status": status
        }))
        .unwrap()
    }

    fn order_page(orders: Vec<Order>) -> Page<Order> {
        let total = orders.len() as u64;
        Page {
            data: orders,
            page: 1,
            limit: 20,
            total,
            total_pages: 1,
        }
    }

    #[test]
    fn test_page_clamped_to_one() {
        let mut p = Pagination::new(20);
        p.set_page(0);
        assert_eq!(p.page(), 1);
        assert!(!p.prev());
    }

    #[test]
    fn test_page_count_and_next() {
        let mut p = Pagination::new(20);
        assert!(p.has_next());
        p.total = Some(41);
        assert_eq!(p.total_pages(), Some(3));
        assert!(p.next());
        assert!(p.next());
        assert!(!p.next());
        assert_eq!(p.page(), 3);
    }

    #[test]
    fn test_empty_total_has_one_page() {
        let mut p = Pagination::new(10);
        p.total = Some(0);
        assert_eq!(p.total_pages(), Some(1));
        assert!(!p.has_next());
    }

    #[tokio::test]
    async fn test_rejected_status_change_rolls_back() {
        let router = Router::new().route(
            "/api/admin/orders/o2/status",
            patch(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"message": "Order already delivered"})),
                )
            }),
        );
        let client = spawn_backend(router).await;

        let mut list = OrderList::new(20);
        list.replace(order_page(vec![order("o1", "pending"), order("o2", "delivered")]));
        let before = list.items().to_vec();

        let err = list
            .change_status(&client, "o2", OrderStatus::Cancelled)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Order already delivered");
        assert_eq!(list.items(), before.as_slice());
    }

    #[tokio::test]
    async fn test_accepted_status_change_keeps_patch() {
        let router = Router::new()
            .route(
                "/api/admin/orders/o1/status",
                patch(|| async { StatusCode::METHOD_NOT_ALLOWED }),
            )
            .route(
                "/api/orders/o1/status",
                put(|| async { Json(json!({"success": true})) }),
            );
        let client = spawn_backend(router).await;

        let mut list = OrderList::new(20);
        list.replace(order_page(vec![order("o1", "pending")]));

        list.change_status(&client, "o1", OrderStatus::Confirmed)
            .await
            .unwrap();
        assert_eq!(list.find("o1").unwrap().status, OrderStatus::Confirmed);
    }
}
