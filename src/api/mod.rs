use std::fmt;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::Value;

pub mod auth_api;
pub mod friends_api;
pub mod geocode_api;
pub mod memories_api;
pub mod storage_api;

pub use auth_api::{AuthApi, RestAuthApi, SessionEvents};
pub use friends_api::{FriendsApi, RestFriendsApi};
pub use geocode_api::{RestReverseGeocoder, ReverseGeocode, ReverseGeocoder};
pub use memories_api::{MemoriesApi, RestMemoriesApi};
pub use storage_api::{RestStorageApi, StorageApi};

#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: Option<Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, body: Option<Value>) -> Self {
        Self { status, body }
    }

    // PostgREST signals a duplicate row either as 409 or as error code 23505.
    pub fn is_duplicate(&self) -> bool {
        if self.status == StatusCode::CONFLICT {
            return true;
        }
        self.body
            .as_ref()
            .and_then(|b| b.get("code"))
            .and_then(|c| c.as_str())
            .map(|c| c == "23505")
            .unwrap_or(false)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let detail = self
            .body
            .as_ref()
            .and_then(|b| b.get("message").or_else(|| b.get("detail")))
            .and_then(|m| m.as_str())
            .unwrap_or("");
        if detail.is_empty() {
            write!(f, "{}", self.status)
        } else {
            write!(f, "{}: {}", self.status, detail)
        }
    }
}

impl std::error::Error for ApiError {}

pub(crate) fn connect_failed(url: &str, err: impl ToString) -> ApiError {
    ApiError::new(
        StatusCode::BAD_GATEWAY,
        Some(serde_json::json!({
            "error": "connect_failed",
            "detail": err.to_string(),
            "url": url
        })),
    )
}

// Embedders call this once at startup; every *_URL / *_KEY setting below is
// read from the environment.
pub fn load_env() {
    dotenvy::dotenv().ok();
}

pub(crate) fn api_base_url() -> String {
    std::env::var("MEMORIES_API_URL").unwrap_or_else(|_| "http://127.0.0.1:54321".to_string())
}

pub(crate) fn api_key() -> String {
    std::env::var("MEMORIES_API_KEY").unwrap_or_default()
}

pub(crate) fn storage_bucket() -> String {
    std::env::var("MEMORIES_STORAGE_BUCKET").unwrap_or_else(|_| "memory-media".to_string())
}

pub(crate) fn bearer_headers(api_key: &str, token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Ok(key_value) = HeaderValue::from_str(api_key) {
        headers.insert("apikey", key_value);
    }
    if let Ok(auth_value) = HeaderValue::from_str(&format!("Bearer {}", token)) {
        headers.insert(AUTHORIZATION, auth_value);
    }
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers
}

// Every row endpoint ends the same way: non-2xx becomes an ApiError carrying
// whatever JSON body the upstream produced. Writes often succeed with an
// empty body (201/204), which reads as Null.
pub(crate) async fn into_json(url: &str, resp: reqwest::Response) -> Result<Value, ApiError> {
    let status = resp.status();
    if !status.is_success() {
        let body: Option<Value> = resp.json().await.ok();
        return Err(ApiError::new(status, body));
    }
    let text = resp.text().await.map_err(|e| connect_failed(url, e))?;
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text).map_err(|e| connect_failed(url, e))
}
