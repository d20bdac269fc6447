//! Process-wide admin session state.
//!
//! The backend keeps the session in an http-only cookie held by the client's cookie jar, so
//! the only state kept here is whether an admin session is believed to be active.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

use crate::api::ApiClient;

/// Routes that never need a session check.
pub const PUBLIC_PATHS: [&str; 5] = [
    "/",
    "/login",
    "/forgot-password",
    "/reset-password",
    "/admin-signup",
];

/// Authenticated endpoint used to check the session cheaply.
const CHECK_PATH: &str = "/admin/orders";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionState {
    /// True until the first check has settled
    pub loading: bool,
    pub authenticated: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            loading: true,
            authenticated: false,
        }
    }
}

#[derive(Serialize)]
struct CheckQuery {
    page: u32,
    limit: u32,
}

/// Shared session flag. Clones observe and update the same state.
#[derive(Debug, Clone)]
pub struct Session {
    state: Arc<watch::Sender<SessionState>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionState::default());
        Self {
            state: Arc::new(tx),
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().authenticated
    }

    /// Receive every subsequent state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub(crate) fn mark_signed_in(&self) {
        self.state.send_replace(SessionState {
            loading: false,
            authenticated: true,
        });
    }

    pub(crate) fn mark_signed_out(&self) {
        self.state.send_replace(SessionState {
            loading: false,
            authenticated: false,
        });
    }

    /// Settle the session for a route. Public routes skip the network and stay signed out
    /// until an explicit login; protected routes call an authenticated endpoint.
    pub async fn check(&self, client: &ApiClient, path: &str) -> SessionState {
        if PUBLIC_PATHS.contains(&path) {
            self.state.send_modify(|s| s.loading = false);
            return self.state();
        }

        match client
            .get_query(CHECK_PATH, &CheckQuery { page: 1, limit: 1 })
            .await
        {
            Ok(_) => self.mark_signed_in(),
            Err(e) => {
                tracing::debug!(error = %e, "Session check failed");
                self.mark_signed_out();
            }
        }
        self.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use crate::testutil::spawn_backend;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;

    #[tokio::test]
    async fn test_public_path_skips_check() {
        // Nothing listens here; a check would fail with a transport error
        let client = ApiClient::new(&ApiConfig::with_base_url("http://127.0.0.1:9/api")).unwrap();
        let session = client.session().clone();

        let state = session.check(&client, "/login").await;
        assert_eq!(
            state,
            SessionState {
                loading: false,
                authenticated: false
            }
        );
    }

    #[tokio::test]
    async fn test_check_success_authenticates() {
        let router = Router::new().route(
            "/api/admin/orders",
            get(|| async { Json(json!({"data": [], "total": 0})) }),
        );
        let client = spawn_backend(router).await;
        let mut rx = client.session().subscribe();

        let state = client.session().check(&client, "/orders").await;
        assert!(state.authenticated);
        assert!(!state.loading);
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().authenticated);
    }

    #[tokio::test]
    async fn test_check_failure_leaves_signed_out() {
        let router = Router::new().route(
            "/api/admin/orders",
            get(|| async { (StatusCode::UNAUTHORIZED, Json(json!({"message": "no session"}))) }),
        );
        let client = spawn_backend(router).await;

        let state = client.session().check(&client, "/dashboard").await;
        assert!(!state.authenticated);
        assert!(!state.loading);
    }
}
