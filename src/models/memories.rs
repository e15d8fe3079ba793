use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl Location {
    pub fn from_coordinates(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            address: None,
            city: None,
            country: None,
        }
    }

    // "40.7128, -74.0060" style label, used wherever no address is known.
    pub fn coordinate_label(&self) -> String {
        format!("{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    // Tagged once per URL (at upload or load), never re-sniffed at render time.
    pub fn from_url(url: &str) -> Self {
        let ext = url
            .rsplit('.')
            .next()
            .unwrap_or_default()
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match ext.as_str() {
            "mp4" | "mov" | "avi" | "webm" => MediaKind::Video,
            _ => MediaKind::Image,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub kind: MediaKind,
    pub url: String,
}

impl MediaItem {
    pub fn from_url(url: String) -> Self {
        Self {
            kind: MediaKind::from_url(&url),
            url,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Memory {
    pub id: String,
    pub title: String,
    pub description: String,
    pub location: Location,
    pub media: Vec<MediaItem>,
    pub tags: Vec<String>,
    pub is_public: bool,
    pub user_id: String,
    pub created_at: String,
    pub updated_at: String,
    // Derived from the like-record set; `like_count` never goes below 0.
    pub like_count: i64,
    pub is_liked_by_user: bool,
}

// A file handed in by the embedder for upload; bytes are already in memory
// by the time they reach the store.
#[derive(Debug, Clone)]
pub struct MediaUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct CreateMemoryData {
    pub title: String,
    pub description: String,
    pub location: Option<Location>,
    pub media_files: Vec<MediaUpload>,
    pub tags: Vec<String>,
    pub is_public: bool,
}

// Wire row as the store returns it: flat snake_case columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    #[serde(default)]
    pub media_urls: Vec<String>,
    pub tags: Option<Vec<String>>,
    pub is_public: bool,
    pub user_id: String,
    pub created_at: String,
    pub updated_at: String,
}

impl MemoryRecord {
    pub fn into_memory(self) -> Memory {
        Memory {
            id: self.id,
            title: self.title,
            description: self.description,
            location: Location {
                latitude: self.latitude,
                longitude: self.longitude,
                address: self.address,
                city: self.city,
                country: self.country,
            },
            media: self.media_urls.into_iter().map(MediaItem::from_url).collect(),
            tags: self.tags.unwrap_or_default(),
            is_public: self.is_public,
            user_id: self.user_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
            like_count: 0,
            is_liked_by_user: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewMemoryRecord {
    pub title: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    pub media_urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    pub is_public: bool,
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikeRecord {
    pub memory_id: String,
    pub user_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_kind_is_tagged_from_the_extension() {
        assert_eq!(MediaKind::from_url("https://cdn/x/a.webm"), MediaKind::Video);
        assert_eq!(MediaKind::from_url("https://cdn/x/a.PNG"), MediaKind::Image);
        assert_eq!(
            MediaKind::from_url("https://cdn/x/a.mp4?token=abc"),
            MediaKind::Video
        );
        // No usable extension defaults to image.
        assert_eq!(MediaKind::from_url("https://cdn/x/raw"), MediaKind::Image);
    }

    #[test]
    fn record_maps_into_a_memory_with_zeroed_aggregates() {
        let memory = MemoryRecord {
            id: "m1".to_string(),
            title: "Pier".to_string(),
            description: "boards".to_string(),
            latitude: 1.5,
            longitude: 2.5,
            address: Some("Pier 7".to_string()),
            city: None,
            country: None,
            media_urls: vec!["https://cdn/a.mov".to_string()],
            tags: None,
            is_public: false,
            user_id: "u1".to_string(),
            created_at: "2024-01-01T00:00:00Z".to_string(),
            updated_at: "2024-01-01T00:00:00Z".to_string(),
        }
        .into_memory();

        assert_eq!(memory.location.latitude, 1.5);
        assert_eq!(memory.location.address.as_deref(), Some("Pier 7"));
        assert_eq!(memory.media[0].kind, MediaKind::Video);
        assert!(memory.tags.is_empty());
        assert_eq!(memory.like_count, 0);
        assert!(!memory.is_liked_by_user);
    }
}
