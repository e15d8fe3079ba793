use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use crate::api::{MemoriesApi, StorageApi};
use crate::error::{Error, Result};
use crate::models::{CreateMemoryData, Memory, MemoryRecord, NewMemoryRecord};

// Optimistic like values live here until the remote call settles; canonical
// fields are only written on commit, so rollback is just dropping the entry.
#[derive(Debug, Clone, Copy)]
struct LikeShadow {
    like_count: i64,
    liked: bool,
}

// Owns the canonical memory list (newest first), the active selection and
// the optimistic like state for one viewer session.
pub struct MemoryStore {
    viewer_id: String,
    api: Arc<dyn MemoriesApi>,
    storage: Arc<dyn StorageApi>,
    memories: Vec<Memory>,
    pending_likes: HashMap<String, LikeShadow>,
    selected_id: Option<String>,
}

impl MemoryStore {
    pub fn new(viewer_id: &str, api: Arc<dyn MemoriesApi>, storage: Arc<dyn StorageApi>) -> Self {
        Self {
            viewer_id: viewer_id.to_string(),
            api,
            storage,
            memories: Vec::new(),
            pending_likes: HashMap::new(),
            selected_id: None,
        }
    }

    // Fetches everything visible to the viewer and attaches like aggregates.
    // A failed like sub-fetch degrades to zero counts instead of failing the
    // whole load; in-flight like mutations keep their shadow entries.
    pub async fn load(&mut self) -> Result<()> {
        let records = self.api.list_memories(&self.viewer_id).await?;
        let mut memories: Vec<Memory> = records
            .into_iter()
            .map(MemoryRecord::into_memory)
            .collect();

        let ids: Vec<String> = memories.iter().map(|m| m.id.clone()).collect();
        match self.api.list_likes(&ids).await {
            Ok(likes) => {
                for memory in &mut memories {
                    memory.like_count =
                        likes.iter().filter(|l| l.memory_id == memory.id).count() as i64;
                    memory.is_liked_by_user = likes
                        .iter()
                        .any(|l| l.memory_id == memory.id && l.user_id == self.viewer_id);
                }
            }
            Err(e) => {
                warn!("Like aggregation failed, loading memories without counts: {}", e);
            }
        }

        // ISO-8601 strings order lexicographically.
        memories.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        self.memories = memories;
        Ok(())
    }

    // Validates locally, uploads media in order, then inserts the record.
    // Any upload failure aborts the whole creation; no record ever references
    // a missing blob.
    pub async fn create(&mut self, data: CreateMemoryData) -> Result<Memory> {
        let title = data.title.trim();
        if title.is_empty() {
            return Err(Error::Validation("a title is required".to_string()));
        }
        let Some(location) = data.location else {
            return Err(Error::Validation(
                "a location is required; pick one on the map first".to_string(),
            ));
        };

        let mut media_urls = Vec::with_capacity(data.media_files.len());
        for file in &data.media_files {
            let ext = file
                .file_name
                .rsplit_once('.')
                .map(|(_, ext)| ext)
                .filter(|ext| !ext.is_empty())
                .unwrap_or("bin");
            let path = format!("memories/{}/{}.{}", self.viewer_id, Uuid::new_v4(), ext);
            let url = self
                .storage
                .upload_media(&path, file.bytes.clone())
                .await
                .map_err(|e| Error::Upload(e.to_string()))?;
            media_urls.push(url);
        }

        let record = self
            .api
            .insert_memory(NewMemoryRecord {
                title: title.to_string(),
                description: data.description,
                latitude: location.latitude,
                longitude: location.longitude,
                address: location.address,
                city: location.city,
                country: location.country,
                media_urls,
                tags: if data.tags.is_empty() {
                    None
                } else {
                    Some(data.tags)
                },
                is_public: data.is_public,
                user_id: self.viewer_id.clone(),
            })
            .await?;

        let memory = record.into_memory();
        self.memories.insert(0, memory.clone());
        Ok(memory)
    }

    // Precondition: the embedder has already asked the user to confirm.
    pub async fn remove(&mut self, id: &str) -> Result<()> {
        self.api.delete_memory(id).await?;
        self.memories.retain(|m| m.id != id);
        self.pending_likes.remove(id);
        if self.selected_id.as_deref() == Some(id) {
            self.selected_id = None;
        }
        Ok(())
    }

    // Optimistic toggle. The shadow entry doubles as the per-memory
    // serialization guard: a second toggle before the first settles is
    // rejected, so the local count can't drift from server truth.
    pub async fn toggle_like(&mut self, id: &str) -> Result<()> {
        if self.pending_likes.contains_key(id) {
            return Err(Error::LikeInFlight(id.to_string()));
        }
        let Some(memory) = self.memories.iter().find(|m| m.id == id) else {
            return Err(Error::Validation(format!("unknown memory {}", id)));
        };

        let was_liked = memory.is_liked_by_user;
        let shadow = if was_liked {
            LikeShadow {
                // Clamp: the count must never show negative, even transiently.
                like_count: (memory.like_count - 1).max(0),
                liked: false,
            }
        } else {
            LikeShadow {
                like_count: memory.like_count + 1,
                liked: true,
            }
        };
        self.pending_likes.insert(id.to_string(), shadow);

        let settled = if was_liked {
            self.api.delete_like(id, &self.viewer_id).await
        } else {
            self.api.insert_like(id, &self.viewer_id).await
        };

        match settled {
            Ok(()) => {
                if let Some(shadow) = self.pending_likes.remove(id) {
                    if let Some(memory) = self.memories.iter_mut().find(|m| m.id == id) {
                        memory.like_count = shadow.like_count;
                        memory.is_liked_by_user = shadow.liked;
                    }
                }
                Ok(())
            }
            Err(e) => {
                // Rollback: canonical state was never touched.
                self.pending_likes.remove(id);
                Err(Error::from_api(e, "this like was already recorded"))
            }
        }
    }

    // Canonical list with pending like shadows merged in, newest first.
    pub fn memories(&self) -> Vec<Memory> {
        self.memories.iter().map(|m| self.with_shadow(m)).collect()
    }

    pub fn filter(&self, query: &str, tags: &[String]) -> Vec<Memory> {
        self.memories
            .iter()
            .filter(|m| matches_filter(m, query, tags))
            .map(|m| self.with_shadow(m))
            .collect()
    }

    pub fn select(&mut self, id: &str) {
        if self.memories.iter().any(|m| m.id == id) {
            self.selected_id = Some(id.to_string());
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected_id = None;
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected_id.as_deref()
    }

    fn with_shadow(&self, memory: &Memory) -> Memory {
        let mut memory = memory.clone();
        if let Some(shadow) = self.pending_likes.get(&memory.id) {
            memory.like_count = shadow.like_count;
            memory.is_liked_by_user = shadow.liked;
        }
        memory
    }
}

// Case-insensitive substring on title OR description, AND-ed with any-of tag
// membership when tags are given. Empty query and tags pass everything.
fn matches_filter(memory: &Memory, query: &str, tags: &[String]) -> bool {
    let query = query.trim().to_lowercase();
    let matches_search = query.is_empty()
        || memory.title.to_lowercase().contains(&query)
        || memory.description.to_lowercase().contains(&query);

    let matches_tags = tags.is_empty() || tags.iter().any(|tag| memory.tags.contains(tag));

    matches_search && matches_tags
}
