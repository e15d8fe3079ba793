use serde::{Deserialize, Serialize};

// One undirected edge per pair; the store keeps two directed rows behind it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Friend {
    pub friend_id: String,
    pub friend_email: String,
    pub friend_name: Option<String>,
    pub friend_avatar_url: Option<String>,
    pub friendship_created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Declined,
}

// The pending/sent list RPCs return direction-specific column sets, so the
// counterparty fields are all optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendRequest {
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver_avatar_url: Option<String>,
    #[serde(default = "default_status")]
    pub status: RequestStatus,
    pub created_at: String,
}

fn default_status() -> RequestStatus {
    RequestStatus::Pending
}
