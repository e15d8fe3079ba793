use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::api::ReverseGeocoder;
use crate::models::Location;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationStatus {
    Idle,
    Requesting,
    Granted,
    Denied,
    Error,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeolocationError {
    PermissionDenied,
    PositionUnavailable,
    Timeout,
    Unknown,
}

// One acquisition tier: the capability call's own options plus the overall
// watchdog after which the caller stops waiting for this tier.
#[derive(Debug, Clone, Copy)]
pub struct AcquisitionAttempt {
    pub high_accuracy: bool,
    pub timeout_ms: u64,
    pub maximum_age_ms: u64,
    pub watchdog_ms: u64,
}

#[derive(Debug, Clone)]
pub struct AcquisitionPolicy {
    pub attempts: Vec<AcquisitionAttempt>,
}

impl Default for AcquisitionPolicy {
    // Compatibility-first tiering: a forgiving low-accuracy attempt, then a
    // high-accuracy retry on a shorter leash.
    fn default() -> Self {
        Self {
            attempts: vec![
                AcquisitionAttempt {
                    high_accuracy: false,
                    timeout_ms: 15_000,
                    maximum_age_ms: 60_000,
                    watchdog_ms: 20_000,
                },
                AcquisitionAttempt {
                    high_accuracy: true,
                    timeout_ms: 10_000,
                    maximum_age_ms: 0,
                    watchdog_ms: 15_000,
                },
            ],
        }
    }
}

// The device-position capability. `current_position` may outlive its
// watchdog; the flow then simply stops listening, it does not cancel the
// underlying call.
#[async_trait]
pub trait GeolocationProvider: Send + Sync {
    fn is_supported(&self) -> bool;
    fn is_secure_context(&self) -> bool;
    async fn current_position(
        &self,
        attempt: &AcquisitionAttempt,
    ) -> Result<(f64, f64), GeolocationError>;
}

// idle -> requesting -> {granted | error | denied}, error -> manual ->
// granted. Denied is the terminal "use the map instead" fallback. A granted
// location is only handed over through an explicit confirm().
pub struct LocationFlow {
    status: LocationStatus,
    resolved: Option<Location>,
    error_message: Option<String>,
    attempts_made: u32,
    policy: AcquisitionPolicy,
}

impl LocationFlow {
    pub fn new() -> Self {
        Self::with_policy(AcquisitionPolicy::default())
    }

    pub fn with_policy(policy: AcquisitionPolicy) -> Self {
        Self {
            status: LocationStatus::Idle,
            resolved: None,
            error_message: None,
            attempts_made: 0,
            policy,
        }
    }

    pub async fn request_location(
        &mut self,
        provider: &dyn GeolocationProvider,
        geocoder: &dyn ReverseGeocoder,
    ) {
        // A second request while one is running would double-acquire.
        if self.status == LocationStatus::Requesting {
            return;
        }
        self.status = LocationStatus::Requesting;
        self.error_message = None;

        // Both preconditions are checked synchronously; no attempt is made
        // when either fails.
        if !provider.is_supported() {
            self.fail("Geolocation is not supported in this environment.");
            return;
        }
        if !provider.is_secure_context() {
            self.fail("Location access requires a secure connection (HTTPS or localhost).");
            return;
        }

        let attempts = self.policy.attempts.clone();
        let mut last_error = GeolocationError::Unknown;
        let mut coordinates = None;
        for attempt in &attempts {
            self.attempts_made += 1;
            let watchdog = Duration::from_millis(attempt.watchdog_ms);
            match tokio::time::timeout(watchdog, provider.current_position(attempt)).await {
                Ok(Ok(position)) => {
                    coordinates = Some(position);
                    break;
                }
                Ok(Err(e)) => last_error = e,
                Err(_) => last_error = GeolocationError::Timeout,
            }
        }

        let Some((latitude, longitude)) = coordinates else {
            self.fail(error_text(last_error));
            return;
        };

        // Address enrichment is best-effort; a dead geocoder degrades to the
        // bare coordinate label.
        let location = match geocoder.reverse(latitude, longitude).await {
            Ok(geo) => Location {
                latitude,
                longitude,
                address: Some(geo.address),
                city: Some(geo.city),
                country: Some(geo.country),
            },
            Err(()) => {
                warn!("Reverse geocoding failed, keeping bare coordinates");
                let mut location = Location::from_coordinates(latitude, longitude);
                location.address = Some(location.coordinate_label());
                location.city = Some("Unknown City".to_string());
                location.country = Some("Unknown Country".to_string());
                location
            }
        };

        self.resolved = Some(location);
        self.status = LocationStatus::Granted;
    }

    // The explicit "use this location" action; acquisition success alone
    // never advances the creation flow.
    pub fn confirm(&mut self) -> Option<Location> {
        if self.status != LocationStatus::Granted {
            return None;
        }
        self.status = LocationStatus::Idle;
        self.resolved.take()
    }

    pub fn deny(&mut self) {
        self.status = LocationStatus::Denied;
    }

    pub fn enter_manual(&mut self) {
        if self.status == LocationStatus::Error {
            self.status = LocationStatus::Manual;
        }
    }

    // A free-text label becomes a placeholder coordinate; the caller lets
    // the user refine it on the map afterward.
    pub fn submit_manual(&mut self, label: &str) -> bool {
        let label = label.trim();
        if self.status != LocationStatus::Manual || label.is_empty() {
            return false;
        }
        self.resolved = Some(Location {
            latitude: 0.0,
            longitude: 0.0,
            address: Some(label.to_string()),
            city: Some("Unknown".to_string()),
            country: Some("Unknown".to_string()),
        });
        self.status = LocationStatus::Granted;
        true
    }

    pub fn retry(&mut self) {
        if self.status == LocationStatus::Error {
            self.status = LocationStatus::Idle;
            self.error_message = None;
        }
    }

    pub fn status(&self) -> LocationStatus {
        self.status
    }

    pub fn resolved_location(&self) -> Option<&Location> {
        self.resolved.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn attempts_made(&self) -> u32 {
        self.attempts_made
    }

    fn fail(&mut self, message: &str) {
        self.status = LocationStatus::Error;
        self.error_message = Some(message.to_string());
    }
}

impl Default for LocationFlow {
    fn default() -> Self {
        Self::new()
    }
}

fn error_text(error: GeolocationError) -> &'static str {
    match error {
        GeolocationError::PermissionDenied => {
            "Location access was denied. Check the device and browser location \
             settings, then try again or enter a location manually."
        }
        GeolocationError::PositionUnavailable => {
            "Location information is unavailable. Check GPS settings and make \
             sure location services are enabled."
        }
        GeolocationError::Timeout => {
            "Location request timed out. Try again or enter a location manually."
        }
        GeolocationError::Unknown => {
            "An error occurred while getting the location. Check the device \
             location settings and try again."
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use crate::api::ReverseGeocode;

    struct FakeProvider {
        supported: bool,
        secure: bool,
        // Outcome per call, in order; calls past the end report Unknown.
        outcomes: Vec<Result<(f64, f64), GeolocationError>>,
        calls: AtomicU32,
        hang: bool,
    }

    impl FakeProvider {
        fn succeeding() -> Self {
            Self {
                supported: true,
                secure: true,
                outcomes: vec![Ok((40.7128, -74.006))],
                calls: AtomicU32::new(0),
                hang: false,
            }
        }
    }

    #[async_trait]
    impl GeolocationProvider for FakeProvider {
        fn is_supported(&self) -> bool {
            self.supported
        }

        fn is_secure_context(&self) -> bool {
            self.secure
        }

        async fn current_position(
            &self,
            _attempt: &AcquisitionAttempt,
        ) -> Result<(f64, f64), GeolocationError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
            if self.hang {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            self.outcomes
                .get(call)
                .cloned()
                .unwrap_or(Err(GeolocationError::Unknown))
        }
    }

    struct FakeGeocoder {
        fail: bool,
    }

    #[async_trait]
    impl ReverseGeocoder for FakeGeocoder {
        async fn reverse(&self, _latitude: f64, _longitude: f64) -> Result<ReverseGeocode, ()> {
            if self.fail {
                return Err(());
            }
            Ok(ReverseGeocode {
                address: "Broadway".to_string(),
                city: "New York".to_string(),
                country: "United States".to_string(),
            })
        }
    }

    fn fast_policy(attempts: usize) -> AcquisitionPolicy {
        AcquisitionPolicy {
            attempts: vec![
                AcquisitionAttempt {
                    high_accuracy: false,
                    timeout_ms: 10,
                    maximum_age_ms: 0,
                    watchdog_ms: 20,
                };
                attempts
            ],
        }
    }

    #[tokio::test]
    async fn missing_capability_errors_without_any_attempt() {
        let provider = FakeProvider {
            supported: false,
            ..FakeProvider::succeeding()
        };
        let mut flow = LocationFlow::new();

        flow.request_location(&provider, &FakeGeocoder { fail: false })
            .await;

        assert_eq!(flow.status(), LocationStatus::Error);
        assert!(flow.error_message().unwrap().contains("not supported"));
        assert_eq!(flow.attempts_made(), 0);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn insecure_transport_errors_without_any_attempt() {
        let provider = FakeProvider {
            secure: false,
            ..FakeProvider::succeeding()
        };
        let mut flow = LocationFlow::new();

        flow.request_location(&provider, &FakeGeocoder { fail: false })
            .await;

        assert_eq!(flow.status(), LocationStatus::Error);
        assert!(flow.error_message().unwrap().contains("secure"));
        assert_eq!(flow.attempts_made(), 0);
    }

    #[tokio::test]
    async fn duplicate_request_while_requesting_is_a_noop() {
        let provider = FakeProvider::succeeding();
        let mut flow = LocationFlow::new();
        flow.status = LocationStatus::Requesting;

        flow.request_location(&provider, &FakeGeocoder { fail: false })
            .await;

        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        assert_eq!(flow.status(), LocationStatus::Requesting);
    }

    #[tokio::test]
    async fn second_tier_wins_after_first_fails() {
        let provider = FakeProvider {
            outcomes: vec![
                Err(GeolocationError::PositionUnavailable),
                Ok((40.7128, -74.006)),
            ],
            ..FakeProvider::succeeding()
        };
        let mut flow = LocationFlow::with_policy(fast_policy(2));

        flow.request_location(&provider, &FakeGeocoder { fail: false })
            .await;

        assert_eq!(flow.status(), LocationStatus::Granted);
        assert_eq!(flow.attempts_made(), 2);
        assert_eq!(
            flow.resolved_location().unwrap().city.as_deref(),
            Some("New York")
        );
    }

    #[tokio::test]
    async fn watchdog_abandons_hanging_attempts() {
        let provider = FakeProvider {
            hang: true,
            ..FakeProvider::succeeding()
        };
        let mut flow = LocationFlow::with_policy(fast_policy(2));

        flow.request_location(&provider, &FakeGeocoder { fail: false })
            .await;

        assert_eq!(flow.status(), LocationStatus::Error);
        assert!(flow.error_message().unwrap().contains("timed out"));
        assert_eq!(flow.attempts_made(), 2);
    }

    #[tokio::test]
    async fn permission_denied_selects_its_own_message() {
        let provider = FakeProvider {
            outcomes: vec![
                Err(GeolocationError::PermissionDenied),
                Err(GeolocationError::PermissionDenied),
            ],
            ..FakeProvider::succeeding()
        };
        let mut flow = LocationFlow::with_policy(fast_policy(2));

        flow.request_location(&provider, &FakeGeocoder { fail: false })
            .await;

        assert_eq!(flow.status(), LocationStatus::Error);
        assert!(flow.error_message().unwrap().contains("denied"));
    }

    #[tokio::test]
    async fn geocode_failure_degrades_to_coordinate_label() {
        let provider = FakeProvider::succeeding();
        let mut flow = LocationFlow::new();

        flow.request_location(&provider, &FakeGeocoder { fail: true })
            .await;

        assert_eq!(flow.status(), LocationStatus::Granted);
        let location = flow.resolved_location().unwrap();
        assert_eq!(location.address.as_deref(), Some("40.7128, -74.0060"));
        assert_eq!(location.city.as_deref(), Some("Unknown City"));
    }

    #[tokio::test]
    async fn granted_location_needs_explicit_confirmation() {
        let provider = FakeProvider::succeeding();
        let mut flow = LocationFlow::new();

        flow.request_location(&provider, &FakeGeocoder { fail: false })
            .await;
        assert_eq!(flow.status(), LocationStatus::Granted);

        let location = flow.confirm().unwrap();
        assert_eq!(location.latitude, 40.7128);
        assert_eq!(flow.status(), LocationStatus::Idle);
        // Nothing left to confirm twice.
        assert!(flow.confirm().is_none());
    }

    #[test]
    fn confirm_outside_granted_hands_nothing_over() {
        let mut flow = LocationFlow::new();
        assert!(flow.confirm().is_none());

        flow.deny();
        assert!(flow.confirm().is_none());
        assert_eq!(flow.status(), LocationStatus::Denied);
    }

    #[test]
    fn manual_entry_synthesizes_a_placeholder_location() {
        let mut flow = LocationFlow::new();
        flow.fail("boom");
        flow.enter_manual();
        assert_eq!(flow.status(), LocationStatus::Manual);

        assert!(!flow.submit_manual("   "));
        assert!(flow.submit_manual("Central Park, Manhattan"));

        let location = flow.confirm().unwrap();
        assert_eq!(location.latitude, 0.0);
        assert_eq!(location.longitude, 0.0);
        assert_eq!(location.address.as_deref(), Some("Central Park, Manhattan"));
        assert_eq!(location.city.as_deref(), Some("Unknown"));
    }

    #[test]
    fn retry_resets_only_from_error() {
        let mut flow = LocationFlow::new();
        flow.fail("boom");
        flow.retry();
        assert_eq!(flow.status(), LocationStatus::Idle);
        assert!(flow.error_message().is_none());

        flow.deny();
        flow.retry();
        assert_eq!(flow.status(), LocationStatus::Denied);
    }
}
