use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

// Best-effort address enrichment. Callers treat any Err as "keep the bare
// coordinates" — a dead geocoder never fails an acquisition.
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    async fn reverse(&self, latitude: f64, longitude: f64) -> Result<ReverseGeocode, ()>;
}

#[derive(Debug, Clone)]
pub struct ReverseGeocode {
    pub address: String,
    pub city: String,
    pub country: String,
}

#[derive(Debug, Deserialize)]
struct NamedEntry {
    name: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct LocalityInfo {
    administrative: Option<Vec<NamedEntry>>,
    informative: Option<Vec<NamedEntry>>,
}

#[derive(Debug, Deserialize)]
struct ReverseGeocodeResponse {
    city: Option<String>,
    locality: Option<String>,
    #[serde(rename = "countryName")]
    country_name: Option<String>,
    #[serde(rename = "localityInfo")]
    locality_info: Option<LocalityInfo>,
}

pub struct RestReverseGeocoder {
    base_url: String,
    client: reqwest::Client,
}

impl RestReverseGeocoder {
    pub fn new() -> Self {
        Self {
            base_url: std::env::var("GEOCODE_API_URL")
                .unwrap_or_else(|_| "https://api.bigdatacloud.net".to_string()),
            client: reqwest::Client::new(),
        }
    }
}

impl Default for RestReverseGeocoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReverseGeocoder for RestReverseGeocoder {
    async fn reverse(&self, latitude: f64, longitude: f64) -> Result<ReverseGeocode, ()> {
        let url = format!(
            "{}/data/reverse-geocode-client",
            self.base_url.trim_end_matches('/')
        );

        let resp = match self
            .client
            .get(&url)
            .query(&[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                ("localityLanguage", "en".to_string()),
            ])
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!("Reverse geocode upstream unreachable: {}", e);
                return Err(());
            }
        };

        if !resp.status().is_success() {
            warn!("Reverse geocode upstream non-OK: {}", resp.status());
            return Err(());
        }

        let parsed: ReverseGeocodeResponse = match resp.json().await {
            Ok(data) => data,
            Err(e) => {
                warn!("Reverse geocode JSON parse failed: {}", e);
                return Err(());
            }
        };

        let first_name = |entries: &Option<Vec<NamedEntry>>| {
            entries
                .as_ref()
                .and_then(|list| list.first())
                .and_then(|entry| entry.name.clone())
        };

        let locality_info = parsed.locality_info.unwrap_or_default();
        let address = first_name(&locality_info.administrative)
            .or_else(|| first_name(&locality_info.informative))
            .unwrap_or_else(|| format!("{:.4}, {:.4}", latitude, longitude));

        Ok(ReverseGeocode {
            address,
            city: parsed
                .city
                .or(parsed.locality)
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| "Unknown City".to_string()),
            country: parsed
                .country_name
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| "Unknown Country".to_string()),
        })
    }
}
