//! Authenticated HTTP client for the backend API.
//!
//! Wraps outgoing requests with bearer-credential attachment and a
//! single-shot refresh-and-retry on authorization failure. Credentials are
//! injected explicitly per request from the [`CredentialStore`]; there is no
//! process-global default header.

pub mod models;
pub mod store;

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::Mutex;
use url::Url;

use models::{RefreshedAccess, TokenPair, UserProfile};
use store::{CredentialStore, StoreError};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid request URL: {0}")]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("session expired, log in again")]
    SessionExpired,

    #[error("API error ({status}): {message}")]
    Api { status: StatusCode, message: String },
}

/// Where a request stands in its lifecycle. A request is resent at most once,
/// regardless of how many further authorization failures occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SendState {
    Unsent,
    Sent,
    RetriedOnce,
}

impl SendState {
    fn advance(self) -> Self {
        match self {
            SendState::Unsent => SendState::Sent,
            SendState::Sent | SendState::RetriedOnce => SendState::RetriedOnce,
        }
    }
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    store: CredentialStore,
    // At most one refresh exchange in flight per client instance; concurrent
    // 401s queue here and re-read the store instead of refreshing again.
    refresh_lock: Mutex<()>,
}

impl ApiClient {
    pub fn new(base_url: Url, store: CredentialStore) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            base_url,
            store,
            refresh_lock: Mutex::new(()),
        })
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Issue a request with the stored access token attached. On the first
    /// 401 the refresh token is exchanged for a new access token and the
    /// request is resent exactly once; a second 401 propagates. All other
    /// statuses and network errors propagate unchanged.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Response, ClientError> {
        let mut state = SendState::Unsent;

        loop {
            let access = self.store.access_token()?;
            let mut builder = self.http.request(method.clone(), self.endpoint(path)?);
            if let Some(token) = &access {
                builder = builder.bearer_auth(token);
            }
            if let Some(body) = body {
                builder = builder.json(body);
            }

            let response = builder.send().await?;
            state = state.advance();

            if response.status() != StatusCode::UNAUTHORIZED || state == SendState::RetriedOnce {
                return Ok(response);
            }

            if !self.refresh_access_token(access.as_deref()).await? {
                // No refresh token to exchange: the stored credentials are
                // gone and the original failure propagates.
                return Ok(response);
            }
        }
    }

    /// Exchange the stored refresh token for a new access token. Returns
    /// false when no refresh token is stored (credentials cleared, caller
    /// propagates the original failure). Any exchange failure also clears
    /// the credentials and surfaces as [`ClientError::SessionExpired`].
    async fn refresh_access_token(&self, stale_access: Option<&str>) -> Result<bool, ClientError> {
        let _guard = self.refresh_lock.lock().await;

        // Another request may have finished the exchange while we waited.
        let credentials = self.store.credentials()?;
        if credentials.access.as_deref() != stale_access {
            return Ok(true);
        }

        let Some(refresh) = credentials.refresh else {
            self.store.clear()?;
            return Ok(false);
        };

        let exchange = self
            .http
            .post(self.endpoint("/api/token/refresh/")?)
            .json(&json!({ "refresh": refresh }))
            .send()
            .await;

        match exchange {
            Ok(response) if response.status().is_success() => {
                match response.json::<RefreshedAccess>().await {
                    Ok(refreshed) => {
                        self.store.save_access(&refreshed.access)?;
                        tracing::debug!("access token refreshed");
                        Ok(true)
                    }
                    Err(err) => {
                        tracing::debug!(error = %err, "refresh response was malformed");
                        self.store.clear()?;
                        Err(ClientError::SessionExpired)
                    }
                }
            }
            Ok(response) => {
                tracing::debug!(status = %response.status(), "refresh exchange rejected");
                self.store.clear()?;
                Err(ClientError::SessionExpired)
            }
            Err(err) => {
                tracing::debug!(error = %err, "refresh exchange failed");
                self.store.clear()?;
                Err(ClientError::SessionExpired)
            }
        }
    }

    /// Authenticate and persist both credentials.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), ClientError> {
        let response = self
            .http
            .post(self.endpoint("/api/token/")?)
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let pair: TokenPair = response.json().await?;
        self.store.save(&pair.access, &pair.refresh)?;
        Ok(())
    }

    /// Drop the session: both credentials are cleared together.
    pub fn logout(&self) -> Result<(), ClientError> {
        self.store.clear()?;
        Ok(())
    }

    /// Create a new account. Registration is unauthenticated.
    pub async fn register(&self, registration: &Value) -> Result<Value, ClientError> {
        let response = self
            .http
            .post(self.endpoint("/api/register/")?)
            .json(registration)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        Ok(response.json().await?)
    }

    /// Force a refresh exchange now, independent of any failing request.
    pub async fn refresh_now(&self) -> Result<(), ClientError> {
        let access = self.store.access_token()?;
        if self.refresh_access_token(access.as_deref()).await? {
            Ok(())
        } else {
            Err(ClientError::SessionExpired)
        }
    }

    pub async fn profile(&self) -> Result<UserProfile, ClientError> {
        self.get_json("/api/profile/").await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response = self.request(Method::GET, path, None).await?;
        Self::into_json(response).await
    }

    pub async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &Value,
    ) -> Result<T, ClientError> {
        let response = self.request(Method::POST, path, Some(body)).await?;
        Self::into_json(response).await
    }

    pub async fn put_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &Value,
    ) -> Result<T, ClientError> {
        let response = self.request(Method::PUT, path, Some(body)).await?;
        Self::into_json(response).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ClientError> {
        let response = self.request(Method::DELETE, path, None).await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::api_error(response).await)
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base_url.join(path)?)
    }

    async fn into_json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(Self::api_error(response).await)
        }
    }

    async fn api_error(response: Response) -> ClientError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        ClientError::Api {
            status,
            message: error_message(&body),
        }
    }
}

/// Pull a human-readable message out of an API error body. The backend
/// reports either `{"detail": "..."}` or a map of field errors.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => {
            if let Some(detail) = value.get("detail").and_then(Value::as_str) {
                return detail.to_string();
            }
            if let Some(object) = value.as_object() {
                let fields: Vec<String> = object
                    .iter()
                    .map(|(field, errors)| match errors {
                        Value::Array(messages) => {
                            let joined: Vec<&str> =
                                messages.iter().filter_map(Value::as_str).collect();
                            format!("{}: {}", field, joined.join("; "))
                        }
                        other => format!("{}: {}", field, other),
                    })
                    .collect();
                if !fields.is_empty() {
                    return fields.join(", ");
                }
            }
            value.to_string()
        }
        Err(_) if body.trim().is_empty() => "request failed".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

/// Claims we display from an access token. Decoded without signature
/// verification: the CLI only reads them for presentation, the backend is
/// the authority.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessClaims {
    pub exp: i64,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

pub fn peek_access_claims(token: &str) -> Option<AccessClaims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.required_spec_claims = Default::default();

    decode::<AccessClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .ok()
        .map(|data| data.claims)
}
