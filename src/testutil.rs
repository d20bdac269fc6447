//! Shared test helpers: an in-process mock of the admin backend.

use axum::Router;

use crate::api::ApiClient;
use crate::config::ApiConfig;

/// Serve `router` on an ephemeral port and return a client whose base URL is `/api` on it.
/// Routes in `router` must therefore be prefixed with `/api`.
pub async fn spawn_backend(router: Router) -> ApiClient {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock backend");
    let addr = listener.local_addr().expect("Mock backend has no address");

    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("Mock backend crashed");
    });

    ApiClient::new(&ApiConfig::with_base_url(format!("http://{addr}/api")))
        .expect("Failed to create test client")
}
