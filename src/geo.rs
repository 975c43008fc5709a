//! Geolocation resolver
//!
//! Best-effort IP-to-location lookup, modeled as an injected capability
//! returning `Option<Location>`. The prober never needs a failure path
//! around this collaborator: any error is a `None`.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::types::Location;

/// Lookup timeout. Geolocation is decoration, not data; keep it short.
const GEO_TIMEOUT_SECS: u64 = 3;

/// Best-effort host location lookup.
#[async_trait]
pub trait GeolocationResolver: Send + Sync {
    /// Resolve a host to a location, or `None` on any failure.
    async fn resolve(&self, host: &str) -> Option<Location>;
}

/// Resolver that never resolves. For tests and `--no-geo` runs.
pub struct NullGeoResolver;

#[async_trait]
impl GeolocationResolver for NullGeoResolver {
    async fn resolve(&self, _host: &str) -> Option<Location> {
        None
    }
}

/// JSON shape of the lookup service response
#[derive(Debug, Deserialize)]
struct GeoResponse {
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
}

/// HTTP-backed resolver against a `GET {endpoint}/{host}` JSON service.
pub struct HttpGeoResolver {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpGeoResolver {
    /// `endpoint` is the URL prefix the host gets appended to,
    /// e.g. `http://ip-api.com/json`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(GEO_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl GeolocationResolver for HttpGeoResolver {
    async fn resolve(&self, host: &str) -> Option<Location> {
        let url = format!("{}/{}", self.endpoint.trim_end_matches('/'), host);

        let response = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                debug!("geo lookup for {} failed: {}", host, e);
                return None;
            }
        };

        if !response.status().is_success() {
            debug!("geo lookup for {} returned {}", host, response.status());
            return None;
        }

        let geo: GeoResponse = match response.json().await {
            Ok(g) => g,
            Err(e) => {
                debug!("geo lookup for {} unparseable: {}", host, e);
                return None;
            }
        };

        Some(Location {
            country: geo.country,
            city: geo.city,
            latitude: geo.lat,
            longitude: geo.lon,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_null_resolver() {
        let resolver = NullGeoResolver;
        assert!(resolver.resolve("10.0.0.1").await.is_none());
    }

    #[test]
    fn test_geo_response_parsing() {
        let raw = r#"{"country": "Germany", "city": "Berlin", "lat": 52.52, "lon": 13.40}"#;
        let geo: GeoResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(geo.country.as_deref(), Some("Germany"));
        assert_eq!(geo.lat, Some(52.52));
    }

    #[test]
    fn test_geo_response_partial_fields() {
        let geo: GeoResponse = serde_json::from_str(r#"{"country": "France"}"#).unwrap();
        assert_eq!(geo.country.as_deref(), Some("France"));
        assert!(geo.city.is_none());
        assert!(geo.lat.is_none());
    }
}
