use async_trait::async_trait;
use serde_json::Value;

use crate::api::{api_base_url, api_key, bearer_headers, connect_failed, into_json, ApiError};
use crate::models::{LikeRecord, MemoryRecord, NewMemoryRecord};

// Memory + like persistence contract. Only the request/response shapes are
// fixed; the transport behind the REST implementation is the store's concern.
#[async_trait]
pub trait MemoriesApi: Send + Sync {
    // All memories visible to the viewer: owned or public, newest first.
    async fn list_memories(&self, viewer_id: &str) -> Result<Vec<MemoryRecord>, ApiError>;
    async fn list_likes(&self, memory_ids: &[String]) -> Result<Vec<LikeRecord>, ApiError>;
    async fn insert_memory(&self, fields: NewMemoryRecord) -> Result<MemoryRecord, ApiError>;
    async fn delete_memory(&self, id: &str) -> Result<(), ApiError>;
    async fn insert_like(&self, memory_id: &str, user_id: &str) -> Result<(), ApiError>;
    async fn delete_like(&self, memory_id: &str, user_id: &str) -> Result<(), ApiError>;
}

pub struct RestMemoriesApi {
    base_url: String,
    api_key: String,
    access_token: String,
    client: reqwest::Client,
}

impl RestMemoriesApi {
    pub fn new(access_token: &str) -> Self {
        Self {
            base_url: api_base_url(),
            api_key: api_key(),
            access_token: access_token.to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn rows_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url.trim_end_matches('/'), table)
    }
}

#[async_trait]
impl MemoriesApi for RestMemoriesApi {
    async fn list_memories(&self, viewer_id: &str) -> Result<Vec<MemoryRecord>, ApiError> {
        let url = self.rows_url("memories");
        let or_filter = format!("(user_id.eq.{},is_public.eq.true)", viewer_id);
        let resp = self
            .client
            .get(&url)
            .headers(bearer_headers(&self.api_key, &self.access_token))
            .query(&[
                ("select", "*"),
                ("or", or_filter.as_str()),
                ("order", "created_at.desc"),
            ])
            .send()
            .await
            .map_err(|e| connect_failed(&url, e))?;

        let body = into_json(&url, resp).await?;
        serde_json::from_value(body).map_err(|e| connect_failed(&url, e))
    }

    async fn list_likes(&self, memory_ids: &[String]) -> Result<Vec<LikeRecord>, ApiError> {
        if memory_ids.is_empty() {
            return Ok(Vec::new());
        }
        let url = self.rows_url("memory_likes");
        let in_filter = format!("in.({})", memory_ids.join(","));
        let resp = self
            .client
            .get(&url)
            .headers(bearer_headers(&self.api_key, &self.access_token))
            .query(&[
                ("select", "memory_id,user_id"),
                ("memory_id", in_filter.as_str()),
            ])
            .send()
            .await
            .map_err(|e| connect_failed(&url, e))?;

        let body = into_json(&url, resp).await?;
        serde_json::from_value(body).map_err(|e| connect_failed(&url, e))
    }

    async fn insert_memory(&self, fields: NewMemoryRecord) -> Result<MemoryRecord, ApiError> {
        let url = self.rows_url("memories");
        let resp = self
            .client
            .post(&url)
            .headers(bearer_headers(&self.api_key, &self.access_token))
            .header("Prefer", "return=representation")
            .json(&fields)
            .send()
            .await
            .map_err(|e| connect_failed(&url, e))?;

        let body = into_json(&url, resp).await?;
        // Inserts come back as a single-row array.
        let row = match body {
            Value::Array(mut rows) if !rows.is_empty() => rows.remove(0),
            other => other,
        };
        serde_json::from_value(row).map_err(|e| connect_failed(&url, e))
    }

    async fn delete_memory(&self, id: &str) -> Result<(), ApiError> {
        let url = self.rows_url("memories");
        let resp = self
            .client
            .delete(&url)
            .headers(bearer_headers(&self.api_key, &self.access_token))
            .query(&[("id", format!("eq.{}", id))])
            .send()
            .await
            .map_err(|e| connect_failed(&url, e))?;

        into_json(&url, resp).await.map(|_| ())
    }

    async fn insert_like(&self, memory_id: &str, user_id: &str) -> Result<(), ApiError> {
        let url = self.rows_url("memory_likes");
        let resp = self
            .client
            .post(&url)
            .headers(bearer_headers(&self.api_key, &self.access_token))
            .json(&serde_json::json!({
                "memory_id": memory_id,
                "user_id": user_id
            }))
            .send()
            .await
            .map_err(|e| connect_failed(&url, e))?;

        into_json(&url, resp).await.map(|_| ())
    }

    async fn delete_like(&self, memory_id: &str, user_id: &str) -> Result<(), ApiError> {
        let url = self.rows_url("memory_likes");
        let resp = self
            .client
            .delete(&url)
            .headers(bearer_headers(&self.api_key, &self.access_token))
            .query(&[
                ("memory_id", format!("eq.{}", memory_id)),
                ("user_id", format!("eq.{}", user_id)),
            ])
            .send()
            .await
            .map_err(|e| connect_failed(&url, e))?;

        into_json(&url, resp).await.map(|_| ())
    }
}
