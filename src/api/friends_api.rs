use async_trait::async_trait;
use serde_json::Value;

use crate::api::{api_base_url, api_key, bearer_headers, connect_failed, into_json, ApiError};
use crate::models::{Friend, FriendRequest, UserProfile};

// Social-graph persistence contract. Accept/decline are server-side
// transactions (flip the request row + materialize both friend edges); the
// engine cannot compare-and-swap across two tables itself, so both return the
// transaction's boolean outcome.
#[async_trait]
pub trait FriendsApi: Send + Sync {
    async fn list_friends(&self, user_id: &str) -> Result<Vec<Friend>, ApiError>;
    async fn list_pending_requests(&self, user_id: &str) -> Result<Vec<FriendRequest>, ApiError>;
    async fn list_sent_requests(&self, user_id: &str) -> Result<Vec<FriendRequest>, ApiError>;
    async fn insert_friend_request(&self, sender: &str, receiver: &str) -> Result<(), ApiError>;
    async fn accept_friend_request(&self, request_id: &str) -> Result<bool, ApiError>;
    async fn decline_friend_request(&self, request_id: &str) -> Result<bool, ApiError>;
    // One directed row; removal calls this once per direction.
    async fn delete_friend_edge(&self, user_id: &str, friend_id: &str) -> Result<(), ApiError>;
    async fn list_profiles(&self, excluding: &str) -> Result<Vec<UserProfile>, ApiError>;
}

pub struct RestFriendsApi {
    base_url: String,
    api_key: String,
    access_token: String,
    client: reqwest::Client,
}

impl RestFriendsApi {
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

    fn rpc_url(&self, function: &str) -> String {
        format!(
            "{}/rest/v1/rpc/{}",
            self.base_url.trim_end_matches('/'),
            function
        )
    }

    async fn call_rpc(&self, function: &str, args: Value) -> Result<Value, ApiError> {
        let url = self.rpc_url(function);
        let resp = self
            .client
            .post(&url)
            .headers(bearer_headers(&self.api_key, &self.access_token))
            .json(&args)
            .send()
            .await
            .map_err(|e| connect_failed(&url, e))?;

        into_json(&url, resp).await
    }

    async fn rpc_rows<T: serde::de::DeserializeOwned>(
        &self,
        function: &str,
        user_id: &str,
    ) -> Result<Vec<T>, ApiError> {
        let body = self
            .call_rpc(function, serde_json::json!({ "user_uuid": user_id }))
            .await?;
        serde_json::from_value(body).map_err(|e| connect_failed(&self.rpc_url(function), e))
    }
}

#[async_trait]
impl FriendsApi for RestFriendsApi {
    async fn list_friends(&self, user_id: &str) -> Result<Vec<Friend>, ApiError> {
        self.rpc_rows("get_user_friends", user_id).await
    }

    async fn list_pending_requests(&self, user_id: &str) -> Result<Vec<FriendRequest>, ApiError> {
        self.rpc_rows("get_pending_friend_requests", user_id).await
    }

    async fn list_sent_requests(&self, user_id: &str) -> Result<Vec<FriendRequest>, ApiError> {
        self.rpc_rows("get_sent_friend_requests", user_id).await
    }

    async fn insert_friend_request(&self, sender: &str, receiver: &str) -> Result<(), ApiError> {
        let url = self.rows_url("friend_requests");
        let resp = self
            .client
            .post(&url)
            .headers(bearer_headers(&self.api_key, &self.access_token))
            .json(&serde_json::json!({
                "sender_id": sender,
                "receiver_id": receiver
            }))
            .send()
            .await
            .map_err(|e| connect_failed(&url, e))?;

        into_json(&url, resp).await.map(|_| ())
    }

    async fn accept_friend_request(&self, request_id: &str) -> Result<bool, ApiError> {
        let body = self
            .call_rpc(
                "accept_friend_request",
                serde_json::json!({ "request_id": request_id }),
            )
            .await?;
        Ok(body.as_bool().unwrap_or(false))
    }

    async fn decline_friend_request(&self, request_id: &str) -> Result<bool, ApiError> {
        let body = self
            .call_rpc(
                "decline_friend_request",
                serde_json::json!({ "request_id": request_id }),
            )
            .await?;
        Ok(body.as_bool().unwrap_or(false))
    }

    async fn delete_friend_edge(&self, user_id: &str, friend_id: &str) -> Result<(), ApiError> {
        let url = self.rows_url("friends");
        let resp = self
            .client
            .delete(&url)
            .headers(bearer_headers(&self.api_key, &self.access_token))
            .query(&[
                ("user_id", format!("eq.{}", user_id)),
                ("friend_id", format!("eq.{}", friend_id)),
            ])
            .send()
            .await
            .map_err(|e| connect_failed(&url, e))?;

        into_json(&url, resp).await.map(|_| ())
    }

    async fn list_profiles(&self, excluding: &str) -> Result<Vec<UserProfile>, ApiError> {
        let url = self.rows_url("profiles");
        let resp = self
            .client
            .get(&url)
            .headers(bearer_headers(&self.api_key, &self.access_token))
            .query(&[
                ("select", "id,email,name,avatar_url,created_at".to_string()),
                ("id", format!("neq.{}", excluding)),
                ("order", "created_at.desc".to_string()),
            ])
            .send()
            .await
            .map_err(|e| connect_failed(&url, e))?;

        let body = into_json(&url, resp).await?;
        serde_json::from_value(body).map_err(|e| connect_failed(&url, e))
    }
}
