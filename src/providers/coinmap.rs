use crate::domain::{Currency, LocationSource, Provider};
use crate::error::Result;
use crate::providers::LocationProvider;
use async_trait::async_trait;
use serde::Deserialize;

/// Adapter for the Coinmap venues feed. The feed is flat and only ever lists
/// bitcoin acceptance; its own category vocabulary does not map onto ours, so
/// the category is left for the matcher to derive.
pub struct CoinmapProvider {
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct VenuesResponse {
    #[serde(default)]
    venues: Vec<Venue>,
}

#[derive(Debug, Deserialize)]
struct Venue {
    id: u64,
    #[serde(default)]
    name: String,
    lat: f64,
    lon: f64,
}

fn into_source(venue: Venue) -> LocationSource {
    LocationSource {
        id: venue.id.to_string(),
        name: venue.name,
        lat: venue.lat,
        lng: venue.lon,
        address: None,
        accepts: vec![Currency::BTC],
        sells: Vec::new(),
        category: None,
        facebook: None,
        instagram: None,
        provider: Provider::Coinmap,
    }
}

impl CoinmapProvider {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for CoinmapProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LocationProvider for CoinmapProvider {
    fn provider(&self) -> Provider {
        Provider::Coinmap
    }

    async fn fetch_locations(&self, url: &str) -> Result<Vec<LocationSource>> {
        let response: VenuesResponse = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.venues.into_iter().map(into_source).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn venues_map_to_bitcoin_accepting_sources() {
        let response: VenuesResponse = serde_json::from_value(json!({
            "venues": [
                { "id": 1001, "name": "Room 77", "lat": 52.49, "lon": 13.42 },
                { "id": 1002, "lat": 0.0, "lon": 0.0 }
            ]
        }))
        .unwrap();

        let sources: Vec<_> = response.venues.into_iter().map(into_source).collect();
        assert_eq!(sources[0].id, "1001");
        assert_eq!(sources[0].name, "Room 77");
        assert_eq!(sources[0].accepts, vec![Currency::BTC]);
        assert_eq!(sources[0].provider, Provider::Coinmap);
        // A nameless venue still parses; validation rejects it downstream.
        assert!(sources[1].name.is_empty());
    }
}
