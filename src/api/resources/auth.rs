use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::api::envelope::decode;
use crate::api::{ApiClient, ApiError};

/// Statuses on which the next candidate login route is tried.
const LOGIN_FALLBACK_STATUSES: [StatusCode; 4] = [
    StatusCode::BAD_REQUEST,
    StatusCode::UNAUTHORIZED,
    StatusCode::NOT_FOUND,
    StatusCode::METHOD_NOT_ALLOWED,
];

const LOGOUT_PATHS: [&str; 2] = ["/auth/logout", "/admin/auth/logout"];

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminUser {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub email: String,
    #[serde(default)]
    pub role: Option<String>,
}

/// The backend sets an http-only cookie and may also echo a token and the user.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<AdminUser>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "signupUrl")]
    pub signup_url: Option<String>,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Clone)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub signup_code: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignupWire<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
    admin_code: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResetPasswordWire<'a> {
    email: &'a str,
    token: &'a str,
    new_password: &'a str,
}

// ============================================================================
// Operations
// ============================================================================

pub struct Auth<'a> {
    client: &'a ApiClient,
}

impl ApiClient {
    pub fn auth(&self) -> Auth<'_> {
        Auth { client: self }
    }
}

impl Auth<'_> {
    /// Sign in, trying each configured login route in order. Only 400/401/404/405 move on to
    /// the next route; any other failure is returned immediately.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let payload = LoginRequest { email, password };
        let mut last_err = None;

        for path in self.client.login_paths() {
            match self.client.post(path, &payload).await {
                Ok(body) => {
                    self.client.session().mark_signed_in();
                    tracing::debug!(path = %path, "Login route accepted credentials");
                    return decode_optional(body);
                }
                Err(e)
                    if e.status()
                        .is_some_and(|s| LOGIN_FALLBACK_STATUSES.contains(&s)) =>
                {
                    tracing::warn!(path = %path, error = %e, "Login route rejected, trying next");
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_err.unwrap_or_else(|| ApiError::invalid("no login routes configured")))
    }

    /// Sign out. The local session is cleared even if both logout routes fail.
    pub async fn logout(&self) {
        for path in LOGOUT_PATHS {
            match self.client.post(path, &serde_json::json!({})).await {
                Ok(_) => break,
                Err(e) => tracing::debug!(path, error = %e, "Logout route failed"),
            }
        }
        self.client.session().mark_signed_out();
    }

    pub async fn signup(&self, req: &SignupRequest) -> Result<LoginResponse, ApiError> {
        let wire = SignupWire {
            name: &req.name,
            email: &req.email,
            password: &req.password,
            admin_code: &req.signup_code,
        };
        let body = self.client.post("/auth/admin/signup", &wire).await?;
        decode_optional(body)
    }

    pub async fn forgot_password(&self, email: &str) -> Result<MessageResponse, ApiError> {
        let body = self
            .client
            .post("/auth/forgot-password", &serde_json::json!({ "email": email }))
            .await?;
        decode_optional(body)
    }

    pub async fn reset_password(
        &self,
        email: &str,
        token: &str,
        new_password: &str,
    ) -> Result<MessageResponse, ApiError> {
        let wire = ResetPasswordWire {
            email,
            token,
            new_password,
        };
        let body = self.client.post("/auth/reset-password", &wire).await?;
        decode_optional(body)
    }
}

/// Empty bodies decode to the type's default.
fn decode_optional<T: Default + serde::de::DeserializeOwned>(
    body: serde_json::Value,
) -> Result<T, ApiError> {
    if body.is_null() {
        Ok(T::default())
    } else {
        decode(body)
    }
}
