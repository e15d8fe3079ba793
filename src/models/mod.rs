pub mod friends;
pub mod map;
pub mod memories;
pub mod user_profiles;

pub use friends::{Friend, FriendRequest, RequestStatus};
pub use map::{MapMarker, MapViewport};
pub use memories::{
    CreateMemoryData, LikeRecord, Location, MediaItem, MediaKind, MediaUpload, Memory,
    MemoryRecord, NewMemoryRecord,
};
pub use user_profiles::{CurrentUser, UserProfile};
