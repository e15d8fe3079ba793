use std::sync::Mutex;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;
use tracing::warn;

use crate::api::{api_base_url, api_key, bearer_headers, connect_failed, into_json, ApiError};
use crate::models::CurrentUser;

#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn current_user(&self) -> Result<Option<CurrentUser>, ApiError>;
    async fn sign_out(&self) -> Result<(), ApiError>;
}

type SessionCallback = Box<dyn Fn(Option<&CurrentUser>) + Send + Sync>;

// Pull-based stand-in for a session push channel: the engine notifies
// subscribers itself whenever a sign-out or refresh settles.
#[derive(Default)]
pub struct SessionEvents {
    subscribers: Mutex<Vec<SessionCallback>>,
}

impl SessionEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, callback: F)
    where
        F: Fn(Option<&CurrentUser>) + Send + Sync + 'static,
    {
        self.subscribers.lock().unwrap().push(Box::new(callback));
    }

    pub fn notify(&self, user: Option<&CurrentUser>) {
        for callback in self.subscribers.lock().unwrap().iter() {
            callback(user);
        }
    }
}

#[derive(Deserialize)]
struct JwtPayload {
    sub: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Deserialize)]
struct UserMetadata {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    avatar_url: Option<String>,
}

#[derive(Deserialize)]
struct AuthUserResponse {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: Option<UserMetadata>,
}

pub struct RestAuthApi {
    base_url: String,
    api_key: String,
    access_token: String,
    client: reqwest::Client,
}

impl RestAuthApi {
    pub fn new(access_token: &str) -> Self {
        Self {
            base_url: api_base_url(),
            api_key: api_key(),
            access_token: access_token.to_string(),
            client: reqwest::Client::new(),
        }
    }

    // Offline fallback: the JWT payload (middle segment) already carries the
    // subject and email, so a dead auth endpoint doesn't log the user out.
    fn user_from_token(&self) -> Option<CurrentUser> {
        let parts: Vec<&str> = self.access_token.split('.').collect();
        if parts.len() != 3 {
            return None;
        }
        let payload_bytes = general_purpose::URL_SAFE_NO_PAD.decode(parts[1]).ok()?;
        let payload: JwtPayload = serde_json::from_slice(&payload_bytes).ok()?;
        Some(CurrentUser {
            id: payload.sub,
            email: payload.email.unwrap_or_default(),
            name: None,
            avatar_url: None,
        })
    }
}

#[async_trait]
impl AuthApi for RestAuthApi {
    async fn current_user(&self) -> Result<Option<CurrentUser>, ApiError> {
        let url = format!("{}/auth/v1/user", self.base_url.trim_end_matches('/'));
        let resp = self
            .client
            .get(&url)
            .headers(bearer_headers(&self.api_key, &self.access_token))
            .send()
            .await;

        let resp = match resp {
            Ok(r) => r,
            Err(e) => {
                warn!("Auth endpoint unreachable, decoding session token locally: {}", e);
                return Ok(self.user_from_token());
            }
        };

        if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Ok(None);
        }

        let body = into_json(&url, resp).await?;
        let user: AuthUserResponse =
            serde_json::from_value(body).map_err(|e| connect_failed(&url, e))?;
        let metadata = user.user_metadata;
        Ok(Some(CurrentUser {
            id: user.id,
            email: user.email.unwrap_or_default(),
            name: metadata.as_ref().and_then(|m| m.name.clone()),
            avatar_url: metadata.as_ref().and_then(|m| m.avatar_url.clone()),
        }))
    }

    async fn sign_out(&self) -> Result<(), ApiError> {
        let url = format!("{}/auth/v1/logout", self.base_url.trim_end_matches('/'));
        let resp = self
            .client
            .post(&url)
            .headers(bearer_headers(&self.api_key, &self.access_token))
            .send()
            .await
            .map_err(|e| connect_failed(&url, e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.json().await.ok();
            return Err(ApiError::new(status, body));
        }
        Ok(())
    }
}
