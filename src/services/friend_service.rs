use std::sync::Arc;

use tracing::warn;

use crate::api::FriendsApi;
use crate::error::{Error, Result};
use crate::models::{Friend, FriendRequest, UserProfile};

// One state container for the whole social graph: the three raw collections
// plus a cached discoverable projection, recomputed on every mutation so
// call sites never cross-filter the sets themselves.
pub struct FriendGraph {
    viewer_id: String,
    api: Arc<dyn FriendsApi>,
    friends: Vec<Friend>,
    pending: Vec<FriendRequest>,
    sent: Vec<FriendRequest>,
    all_users: Vec<UserProfile>,
    discoverable: Vec<UserProfile>,
}

impl FriendGraph {
    pub fn new(viewer_id: &str, api: Arc<dyn FriendsApi>) -> Self {
        Self {
            viewer_id: viewer_id.to_string(),
            api,
            friends: Vec::new(),
            pending: Vec::new(),
            sent: Vec::new(),
            all_users: Vec::new(),
            discoverable: Vec::new(),
        }
    }

    // The four queries run concurrently; a failed leg keeps its previous
    // collection and logs, the other legs still apply.
    pub async fn load_all(&mut self) {
        let (friends, pending, sent, profiles) = tokio::join!(
            self.api.list_friends(&self.viewer_id),
            self.api.list_pending_requests(&self.viewer_id),
            self.api.list_sent_requests(&self.viewer_id),
            self.api.list_profiles(&self.viewer_id),
        );

        match friends {
            Ok(rows) => self.friends = rows,
            Err(e) => warn!("Friend list load failed: {}", e),
        }
        match pending {
            Ok(rows) => self.pending = rows,
            Err(e) => warn!("Pending request load failed: {}", e),
        }
        match sent {
            Ok(rows) => self.sent = rows,
            Err(e) => warn!("Sent request load failed: {}", e),
        }
        match profiles {
            Ok(rows) => self.all_users = rows,
            Err(e) => warn!("Profile pool load failed: {}", e),
        }

        self.recompute_discoverable();
    }

    // The discovery pool is the first line of defense against duplicates,
    // but the check here still runs in case the caller holds a stale pool,
    // and the upstream may reject a racing insert as a duplicate too.
    pub async fn send_request(&mut self, receiver_id: &str) -> Result<()> {
        if receiver_id == self.viewer_id {
            return Err(Error::Validation(
                "cannot send a friend request to yourself".to_string(),
            ));
        }
        if self.has_relation(receiver_id) {
            return Err(Error::Conflict(
                "a friendship or pending request already exists".to_string(),
            ));
        }

        self.api
            .insert_friend_request(&self.viewer_id, receiver_id)
            .await
            .map_err(|e| Error::from_api(e, "a friend request for this user already exists"))?;

        self.reload_sent().await;
        self.reload_profiles().await;
        self.recompute_discoverable();
        Ok(())
    }

    // The flip-to-accepted plus both friend edges is one server-side
    // transaction; a logical `false` means someone else resolved the request
    // first, which is not a transport failure.
    pub async fn accept_request(&mut self, request_id: &str) -> Result<()> {
        let accepted = self.api.accept_friend_request(request_id).await?;
        if !accepted {
            return Err(Error::Conflict(
                "friend request was already resolved".to_string(),
            ));
        }

        self.reload_friends().await;
        self.reload_pending().await;
        self.recompute_discoverable();
        Ok(())
    }

    pub async fn decline_request(&mut self, request_id: &str) -> Result<()> {
        let declined = self.api.decline_friend_request(request_id).await?;
        if !declined {
            return Err(Error::Conflict(
                "friend request was already resolved".to_string(),
            ));
        }

        self.reload_pending().await;
        self.recompute_discoverable();
        Ok(())
    }

    // Both directed rows must be confirmed gone before the edge leaves the
    // local projection; a half-removed edge is surfaced for retry, never
    // silently treated as removed.
    pub async fn remove_friend(&mut self, friend_id: &str) -> Result<()> {
        self.api
            .delete_friend_edge(&self.viewer_id, friend_id)
            .await?;
        if let Err(e) = self.api.delete_friend_edge(friend_id, &self.viewer_id).await {
            warn!(
                "Second direction of friend removal failed for {}: {}",
                friend_id, e
            );
            return Err(Error::PartialRemoval(friend_id.to_string()));
        }

        self.friends.retain(|f| f.friend_id != friend_id);
        self.reload_friends().await;
        self.recompute_discoverable();
        Ok(())
    }

    pub fn discover(&self, query: &str) -> Vec<UserProfile> {
        let query = query.trim().to_lowercase();
        self.discoverable
            .iter()
            .filter(|user| {
                query.is_empty()
                    || user
                        .name
                        .as_deref()
                        .unwrap_or("")
                        .to_lowercase()
                        .contains(&query)
                    || user.email.to_lowercase().contains(&query)
            })
            .cloned()
            .collect()
    }

    pub fn friends(&self) -> &[Friend] {
        &self.friends
    }

    // Incoming requests, with the loser of a mutual-request race hidden:
    // when both directions are pending for a pair, the surviving request is
    // the one whose sender id sorts lower.
    pub fn pending_requests(&self) -> Vec<FriendRequest> {
        self.pending
            .iter()
            .filter(|req| {
                let Some(sender) = req.sender_id.as_deref() else {
                    return true;
                };
                !self.has_sent_to(sender) || sender < self.viewer_id.as_str()
            })
            .cloned()
            .collect()
    }

    pub fn sent_requests(&self) -> Vec<FriendRequest> {
        self.sent
            .iter()
            .filter(|req| {
                let Some(receiver) = req.receiver_id.as_deref() else {
                    return true;
                };
                !self.has_pending_from(receiver) || self.viewer_id.as_str() < receiver
            })
            .cloned()
            .collect()
    }

    pub fn discoverable(&self) -> &[UserProfile] {
        &self.discoverable
    }

    fn has_relation(&self, user_id: &str) -> bool {
        self.friends.iter().any(|f| f.friend_id == user_id)
            || self.has_pending_from(user_id)
            || self.has_sent_to(user_id)
    }

    fn has_pending_from(&self, user_id: &str) -> bool {
        self.pending
            .iter()
            .any(|r| r.sender_id.as_deref() == Some(user_id))
    }

    fn has_sent_to(&self, user_id: &str) -> bool {
        self.sent
            .iter()
            .any(|r| r.receiver_id.as_deref() == Some(user_id))
    }

    // Candidate pool: everyone minus friends, minus either direction of a
    // pending request. Holds for any combination of the three sets.
    fn recompute_discoverable(&mut self) {
        let discoverable = self
            .all_users
            .iter()
            .filter(|user| user.id != self.viewer_id && !self.has_relation(&user.id))
            .cloned()
            .collect();
        self.discoverable = discoverable;
    }

    async fn reload_friends(&mut self) {
        match self.api.list_friends(&self.viewer_id).await {
            Ok(rows) => self.friends = rows,
            Err(e) => warn!("Friend list reload failed: {}", e),
        }
    }

    async fn reload_pending(&mut self) {
        match self.api.list_pending_requests(&self.viewer_id).await {
            Ok(rows) => self.pending = rows,
            Err(e) => warn!("Pending request reload failed: {}", e),
        }
    }

    async fn reload_sent(&mut self) {
        match self.api.list_sent_requests(&self.viewer_id).await {
            Ok(rows) => self.sent = rows,
            Err(e) => warn!("Sent request reload failed: {}", e),
        }
    }

    async fn reload_profiles(&mut self) {
        match self.api.list_profiles(&self.viewer_id).await {
            Ok(rows) => self.all_users = rows,
            Err(e) => warn!("Profile pool reload failed: {}", e),
        }
    }
}
