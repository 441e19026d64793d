use crate::domain::Provider;
use crate::error::{FetcherError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;

/// Tunables for the classification engine. The threshold and weight values
/// mirror the empirically tuned defaults; treat them as knobs, not invariants.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Distance (km) at which the geo score reaches zero.
    pub max_distance_km: f64,
    /// Rough km per degree of latitude or longitude.
    pub km_per_degree: f64,
    /// Candidates scoring above this are considered high-confidence.
    pub high_score_threshold: f64,
    /// A runner-up at or above this blocks a single-candidate match.
    pub runner_up_threshold: f64,
    /// Richness weight for a populated address.
    pub richness_address: f64,
    /// Richness weight for a populated photo reference.
    pub richness_photo: f64,
    /// Richness weight for a populated rating.
    pub richness_rating: f64,
    /// Richness weight for a resolved (non-default) category.
    pub richness_category: f64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            max_distance_km: 50.0,
            km_per_degree: 111.0,
            high_score_threshold: 0.9,
            runner_up_threshold: 0.5,
            richness_address: 0.9,
            richness_photo: 0.8,
            richness_rating: 0.25,
            richness_category: 0.5,
        }
    }
}

/// Settings for the Google Places candidate retriever.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlacesConfig {
    pub base_url: String,
    /// Number of concurrent findplacefromtext requests per fan-out group.
    pub sub_batch_size: usize,
    /// Location bias radius in meters when the source has an address.
    pub radius_with_address_m: u32,
    /// Location bias radius in meters when it does not.
    pub radius_without_address_m: u32,
}

impl Default for PlacesConfig {
    fn default() -> Self {
        Self {
            base_url: "https://maps.googleapis.com".to_string(),
            sub_batch_size: 10,
            radius_with_address_m: 1000,
            radius_without_address_m: 5000,
        }
    }
}

/// Settings for the Supabase storage and database sinks.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub supabase_url: String,
    pub bucket: String,
    pub locations_table: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            bucket: "locations-sources".to_string(),
            locations_table: "locations".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub matcher: MatcherConfig,
    pub places: PlacesConfig,
    pub storage: StorageConfig,
    /// Source feed URL per provider, replacing the original's global lookup.
    pub provider_sources: HashMap<Provider, String>,
}

impl Config {
    /// Loads `config.toml` from the working directory, falling back to
    /// defaults when the file does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from("config.toml")
    }

    pub fn load_from(path: &str) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(FetcherError::Config(format!(
                "Failed to read config file '{}': {}",
                path, e
            ))),
        }
    }

    /// Resolves the source feed URL for a provider.
    pub fn provider_source(&self, provider: Provider) -> Result<&str> {
        self.provider_sources
            .get(&provider)
            .map(String::as_str)
            .ok_or_else(|| {
                FetcherError::Config(format!("No source URL configured for provider {provider}"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_tuned_values() {
        let config = MatcherConfig::default();
        assert_eq!(config.max_distance_km, 50.0);
        assert_eq!(config.high_score_threshold, 0.9);
        assert_eq!(config.runner_up_threshold, 0.5);
        assert_eq!(config.richness_address, 0.9);
    }

    #[test]
    fn parses_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [matcher]
            max_distance_km = 25.0

            [provider_sources]
            BtcMap = "https://api.btcmap.org/v2/elements"
            "#,
        )
        .unwrap();
        assert_eq!(config.matcher.max_distance_km, 25.0);
        // Untouched sections keep their defaults
        assert_eq!(config.matcher.high_score_threshold, 0.9);
        assert_eq!(config.places.sub_batch_size, 10);
        assert!(config.provider_source(Provider::BtcMap).is_ok());
        assert!(config.provider_source(Provider::Coinmap).is_err());
    }
}
