use async_trait::async_trait;

use crate::api::{api_base_url, api_key, bearer_headers, connect_failed, storage_bucket, ApiError};

// Media blob storage: upload under a caller-chosen object path, get back the
// public URL the memory record will reference.
#[async_trait]
pub trait StorageApi: Send + Sync {
    async fn upload_media(&self, path: &str, bytes: Vec<u8>) -> Result<String, ApiError>;
}

pub struct RestStorageApi {
    base_url: String,
    bucket: String,
    api_key: String,
    access_token: String,
    client: reqwest::Client,
}

impl RestStorageApi {
    pub fn new(access_token: &str) -> Self {
        Self {
            base_url: api_base_url(),
            bucket: storage_bucket(),
            api_key: api_key(),
            access_token: access_token.to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.bucket,
            path
        )
    }
}

#[async_trait]
impl StorageApi for RestStorageApi {
    async fn upload_media(&self, path: &str, bytes: Vec<u8>) -> Result<String, ApiError> {
        let url = format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.bucket,
            path
        );

        let mut headers = bearer_headers(&self.api_key, &self.access_token);
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            reqwest::header::HeaderValue::from_static("application/octet-stream"),
        );

        let resp = self
            .client
            .post(&url)
            .headers(headers)
            .body(bytes)
            .send()
            .await
            .map_err(|e| connect_failed(&url, e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.json().await.ok();
            return Err(ApiError::new(status, body));
        }

        Ok(self.public_url(path))
    }
}
