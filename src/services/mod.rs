pub mod friend_service;
pub mod location_service;
pub mod marker_service;
pub mod memory_service;

pub use friend_service::FriendGraph;
pub use location_service::{
    AcquisitionAttempt, AcquisitionPolicy, GeolocationError, GeolocationProvider, LocationFlow,
    LocationStatus,
};
pub use marker_service::{MapWidget, MarkerReconciler, COORD_EPSILON, ZOOM_EPSILON};
pub use memory_service::MemoryStore;
