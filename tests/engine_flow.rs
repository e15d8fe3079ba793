// End-to-end pass over the public surface: acquire a location, create a
// memory with it, and reconcile the marker set from the filtered list.

use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::StatusCode;

use memories::api::{
    ApiError, MemoriesApi, ReverseGeocode, ReverseGeocoder, StorageApi,
};
use memories::models::{
    CreateMemoryData, LikeRecord, MapViewport, Memory, MemoryRecord, NewMemoryRecord,
};
use memories::services::{
    AcquisitionAttempt, GeolocationError, GeolocationProvider, MapWidget, MarkerReconciler,
    MemoryStore,
};

#[derive(Default)]
struct InMemoryBackend {
    records: Mutex<Vec<MemoryRecord>>,
    likes: Mutex<Vec<LikeRecord>>,
}

#[async_trait]
impl MemoriesApi for InMemoryBackend {
    async fn list_memories(&self, _viewer_id: &str) -> Result<Vec<MemoryRecord>, ApiError> {
        Ok(self.records.lock().unwrap().clone())
    }

    async fn list_likes(&self, _memory_ids: &[String]) -> Result<Vec<LikeRecord>, ApiError> {
        Ok(self.likes.lock().unwrap().clone())
    }

    async fn insert_memory(&self, fields: NewMemoryRecord) -> Result<MemoryRecord, ApiError> {
        let record = MemoryRecord {
            id: format!("m{}", self.records.lock().unwrap().len() + 1),
            title: fields.title,
            description: fields.description,
            latitude: fields.latitude,
            longitude: fields.longitude,
            address: fields.address,
            city: fields.city,
            country: fields.country,
            media_urls: fields.media_urls,
            tags: fields.tags,
            is_public: fields.is_public,
            user_id: fields.user_id,
            created_at: "2024-06-01T12:00:00Z".to_string(),
            updated_at: "2024-06-01T12:00:00Z".to_string(),
        };
        self.records.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn delete_memory(&self, id: &str) -> Result<(), ApiError> {
        self.records.lock().unwrap().retain(|r| r.id != id);
        Ok(())
    }

    async fn insert_like(&self, memory_id: &str, user_id: &str) -> Result<(), ApiError> {
        self.likes.lock().unwrap().push(LikeRecord {
            memory_id: memory_id.to_string(),
            user_id: user_id.to_string(),
        });
        Ok(())
    }

    async fn delete_like(&self, memory_id: &str, user_id: &str) -> Result<(), ApiError> {
        self.likes
            .lock()
            .unwrap()
            .retain(|l| !(l.memory_id == memory_id && l.user_id == user_id));
        Ok(())
    }
}

struct RejectingStorage;

#[async_trait]
impl StorageApi for RejectingStorage {
    async fn upload_media(&self, _path: &str, _bytes: Vec<u8>) -> Result<String, ApiError> {
        Err(ApiError::new(StatusCode::BAD_GATEWAY, None))
    }
}

struct FixedProvider;

#[async_trait]
impl GeolocationProvider for FixedProvider {
    fn is_supported(&self) -> bool {
        true
    }

    fn is_secure_context(&self) -> bool {
        true
    }

    async fn current_position(
        &self,
        _attempt: &AcquisitionAttempt,
    ) -> Result<(f64, f64), GeolocationError> {
        Ok((40.0, -74.0))
    }
}

struct OfflineGeocoder;

#[async_trait]
impl ReverseGeocoder for OfflineGeocoder {
    async fn reverse(&self, _latitude: f64, _longitude: f64) -> Result<ReverseGeocode, ()> {
        Err(())
    }
}

#[derive(Default)]
struct CountingWidget {
    adds: usize,
    removes: usize,
}

impl MapWidget for CountingWidget {
    fn add_marker(&mut self, _id: &str, _latitude: f64, _longitude: f64, _selected: bool) {
        self.adds += 1;
    }

    fn remove_marker(&mut self, _id: &str) {
        self.removes += 1;
    }

    fn set_marker_selected(&mut self, _id: &str, _selected: bool) {}

    fn set_view(&mut self, _viewport: &MapViewport) {}
}

fn visible_ids(memories: &[Memory]) -> Vec<&str> {
    memories.iter().map(|m| m.id.as_str()).collect()
}

#[tokio::test]
async fn acquired_location_flows_into_a_rendered_marker() {
    let backend = Arc::new(InMemoryBackend::default());
    let mut store = MemoryStore::new("viewer", backend, Arc::new(RejectingStorage));

    let mut flow = memories::services::LocationFlow::new();
    flow.request_location(&FixedProvider, &OfflineGeocoder).await;
    let location = flow.confirm().expect("acquisition should grant");

    // Geocoder was down: the address degraded to the coordinate label.
    assert_eq!(location.address.as_deref(), Some("40.0000, -74.0000"));

    store
        .create(CreateMemoryData {
            title: "Sunset".to_string(),
            description: "over the river".to_string(),
            location: Some(location),
            ..Default::default()
        })
        .await
        .unwrap();

    let visible = store.filter("sunset", &[]);
    assert_eq!(visible_ids(&visible), vec!["m1"]);

    let mut reconciler = MarkerReconciler::new();
    let mut widget = CountingWidget::default();
    reconciler.reconcile(&visible, store.selected_id(), &mut widget);

    assert_eq!(widget.adds, 1);
    let marker = &reconciler.markers()["m1"];
    assert_eq!((marker.latitude, marker.longitude), (40.0, -74.0));

    // A narrower filter empties the visible set, and the marker follows.
    let visible = store.filter("no-such-title", &[]);
    reconciler.reconcile(&visible, None, &mut widget);
    assert_eq!(widget.removes, 1);
    assert!(reconciler.markers().is_empty());
}

#[tokio::test]
async fn likes_round_trip_through_load() {
    let backend = Arc::new(InMemoryBackend::default());
    let mut store = MemoryStore::new("viewer", backend.clone(), Arc::new(RejectingStorage));

    store
        .create(CreateMemoryData {
            title: "Pier".to_string(),
            location: Some(memories::models::Location::from_coordinates(1.0, 2.0)),
            ..Default::default()
        })
        .await
        .unwrap();
    store.toggle_like("m1").await.unwrap();

    // A fresh session sees the like reflected in the aggregates.
    let mut fresh = MemoryStore::new("viewer", backend, Arc::new(RejectingStorage));
    fresh.load().await.unwrap();
    assert_eq!(fresh.memories()[0].like_count, 1);
    assert!(fresh.memories()[0].is_liked_by_user);
}
