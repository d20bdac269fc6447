use std::future::Future;
use std::sync::Arc;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::form::FormPayload;
use super::progress::UploadProgress;
use super::response::error_message;
use super::ApiError;
use crate::config::ApiConfig;
use crate::session::Session;

/// Credentialed HTTP client for the admin backend.
///
/// Cheap to clone; clones share the connection pool, cookie jar and session.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: Url,
    http: Client,
    login_paths: Arc<[String]>,
    session: Session,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let base_url = Url::parse(config.base_url.trim_end_matches('/'))
            .map_err(|e| ApiError::invalid(format!("invalid base URL: {e}")))?;
        let http = Client::builder()
            .cookie_store(true)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            base_url,
            http,
            login_paths: config.login_paths.clone().into(),
            session: Session::new(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub(crate) fn login_paths(&self) -> &[String] {
        &self.login_paths
    }

    // ========================================================================
    // JSON requests
    // ========================================================================

    pub async fn get(&self, path: &str) -> Result<Value, ApiError> {
        let req = self.request(Method::GET, self.url(path)?);
        self.execute_json(req).await
    }

    pub async fn get_query<Q: Serialize>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<Value, ApiError> {
        let req = self.request(Method::GET, self.url_with_query(path, query)?);
        self.execute_json(req).await
    }

    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value, ApiError> {
        self.send_json(Method::POST, self.url(path)?, body).await
    }

    pub async fn put<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value, ApiError> {
        self.send_json(Method::PUT, self.url(path)?, body).await
    }

    pub async fn patch<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Value, ApiError> {
        self.send_json(Method::PATCH, self.url(path)?, body).await
    }

    pub async fn delete(&self, path: &str) -> Result<Value, ApiError> {
        let req = self.request(Method::DELETE, self.url(path)?);
        self.execute_json(req).await
    }

    /// Send a JSON body to a URL built with [`ApiClient::url_segments`].
    pub async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: &B,
    ) -> Result<Value, ApiError> {
        let req = self.request(method, url).json(body);
        self.execute_json(req).await
    }

    pub async fn send_empty(&self, method: Method, url: Url) -> Result<Value, ApiError> {
        let req = self.request(method, url);
        self.execute_json(req).await
    }

    // ========================================================================
    // Multipart requests
    // ========================================================================

    /// Submit a multipart payload. With a progress registry, the request is tracked under a
    /// fresh id for its whole lifetime and removed once it settles.
    pub async fn send_form(
        &self,
        method: Method,
        path: &str,
        payload: FormPayload,
        progress: Option<&UploadProgress>,
    ) -> Result<Value, ApiError> {
        let url = self.url(path)?;
        let parts = payload.parts().len();
        let bytes = payload.upload_bytes();

        let Some(registry) = progress else {
            let form = payload.into_multipart(None)?;
            return self.execute_json(self.request(method, url).multipart(form)).await;
        };

        let id = registry.begin();
        tracing::debug!(request_id = %id, path, parts, bytes, "Uploading form");
        let result = async {
            let form = payload.into_multipart(Some((registry, &id)))?;
            self.execute_json(self.request(method, url).multipart(form))
                .await
        }
        .await;
        if result.is_ok() {
            registry.set(&id, 100.0);
        }
        registry.remove(&id);
        result
    }

    // ========================================================================
    // Internals
    // ========================================================================

    pub fn url(&self, path: &str) -> Result<Url, ApiError> {
        let joined = format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path);
        Url::parse(&joined).map_err(|e| ApiError::invalid(format!("invalid path '{path}': {e}")))
    }

    /// Build a URL from raw path segments, percent-encoding each one.
    pub fn url_segments(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::invalid("base URL cannot carry a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn url_with_query<Q: Serialize>(&self, path: &str, query: &Q) -> Result<Url, ApiError> {
        let mut url = self.url(path)?;
        let qs = serde_qs::to_string(query)
            .map_err(|e| ApiError::invalid(format!("invalid query: {e}")))?;
        if !qs.is_empty() {
            url.set_query(Some(&qs));
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http.request(method, url)
    }

    async fn execute_json(&self, req: RequestBuilder) -> Result<Value, ApiError> {
        let resp = self.execute(req).await?;
        let body = resp.bytes().await?;
        if body.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&body).map_err(|e| ApiError::decode(format!("invalid JSON: {e}")))
    }

    /// Send and intercept failures. A 401 signs the shared session out.
    async fn execute(&self, req: RequestBuilder) -> Result<Response, ApiError> {
        let resp = req.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let url = resp.url().path().to_string();
        let body = resp.bytes().await.unwrap_or_default();
        let message = error_message(status, &body);

        if status == StatusCode::UNAUTHORIZED {
            if self.session.is_authenticated() {
                tracing::warn!(path = %url, "Session rejected by server, signing out");
            }
            self.session.mark_signed_out();
            return Err(ApiError::Unauthorized(message));
        }

        tracing::debug!(path = %url, status = status.as_u16(), message = %message, "Request failed");
        Err(ApiError::Http { status, message })
    }
}

/// Run a data fetch that should be abandoned once `cancel` fires. A cancelled fetch yields
/// [`ApiError::Cancelled`] and never its (stale) result.
pub async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T, ApiError>
where
    F: Future<Output = Result<T, ApiError>>,
{
    if cancel.is_cancelled() {
        return Err(ApiError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ApiError::Cancelled),
        result = fut => result,
    }
}
