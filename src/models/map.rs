use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapViewport {
    pub latitude: f64,
    pub longitude: f64,
    pub zoom: f64,
}

impl Default for MapViewport {
    fn default() -> Self {
        Self {
            latitude: 40.7128,
            longitude: -74.006,
            zoom: 10.0,
        }
    }
}

// Reconciler-side mirror of one rendered marker; never persisted, fully
// recomputed from the visible memory list + selection.
#[derive(Debug, Clone, PartialEq)]
pub struct MapMarker {
    pub latitude: f64,
    pub longitude: f64,
    pub selected: bool,
}
