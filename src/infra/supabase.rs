//! Supabase-backed adapters: CSV checkpoints go to a storage bucket, the
//! final matched set is upserted into a PostgREST table.

use crate::app::ports::{CheckpointSink, PersistenceSink};
use crate::config::StorageConfig;
use crate::domain::{Category, Currency, LocationCandidates};
use crate::error::{FetcherError, Result};
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};

pub struct SupabaseStorageSink {
    client: reqwest::Client,
    config: StorageConfig,
    api_key: String,
}

impl SupabaseStorageSink {
    pub fn new(config: StorageConfig, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            api_key,
        }
    }

    /// Reads the service key from `SUPABASE_SERVICE_KEY`.
    pub fn from_env(config: StorageConfig) -> Result<Self> {
        let api_key = std::env::var("SUPABASE_SERVICE_KEY")?;
        Ok(Self::new(config, api_key))
    }
}

#[async_trait]
impl CheckpointSink for SupabaseStorageSink {
    async fn write(&self, path: &str, content: &str) -> Result<String> {
        let url = format!(
            "{}/storage/v1/object/{}/{}",
            self.config.supabase_url, self.config.bucket, path
        );
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("apikey", &self.api_key)
            .header("x-upsert", "true")
            .header(reqwest::header::CONTENT_TYPE, "text/csv")
            .body(content.to_string())
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(FetcherError::Checkpoint {
                path: path.to_string(),
                message: format!("storage upload failed with {status}: {body}"),
            });
        }
        debug!("Uploaded checkpoint to bucket '{}' at {}", self.config.bucket, path);
        Ok(url)
    }

    async fn read(&self, path: &str) -> Result<String> {
        let url = format!(
            "{}/storage/v1/object/{}/{}",
            self.config.supabase_url, self.config.bucket, path
        );
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .header("apikey", &self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FetcherError::Checkpoint {
                path: path.to_string(),
                message: format!("storage download failed with {}", response.status()),
            });
        }
        Ok(response.text().await?)
    }
}

pub struct SupabaseDatabaseSink {
    client: reqwest::Client,
    config: StorageConfig,
    api_key: String,
}

/// Row shape for the locations table. Matched locations are flattened to the
/// winning candidate plus the source record it confirmed.
#[derive(Debug, Serialize)]
struct LocationRow<'a> {
    id: &'a str,
    name: &'a str,
    lat: f64,
    lng: f64,
    address: Option<&'a str>,
    category: &'a str,
    provider: &'a str,
    accepts: &'a [Currency],
    sells: &'a [Currency],
    gmaps_place_id: &'a str,
    rating: Option<f64>,
    photo: Option<&'a str>,
}

impl SupabaseDatabaseSink {
    pub fn new(config: StorageConfig, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            api_key,
        }
    }

    pub fn from_env(config: StorageConfig) -> Result<Self> {
        let api_key = std::env::var("SUPABASE_SERVICE_KEY")?;
        Ok(Self::new(config, api_key))
    }

    fn rows<'a>(matched: &'a [LocationCandidates]) -> Vec<LocationRow<'a>> {
        matched
            .iter()
            .filter_map(|location| {
                let candidate = location.best_candidate()?;
                Some(LocationRow {
                    id: &location.source.id,
                    name: &candidate.name,
                    lat: candidate.lat,
                    lng: candidate.lng,
                    address: Some(candidate.address.as_str()),
                    category: resolved_category(location).as_str(),
                    provider: location.source.provider.name(),
                    accepts: &location.source.accepts,
                    sells: &location.source.sells,
                    gmaps_place_id: &candidate.place_id,
                    rating: candidate.rating,
                    photo: candidate.photo.as_deref(),
                })
            })
            .collect()
    }
}

/// The source's own category wins over the candidate's derived one.
fn resolved_category(location: &LocationCandidates) -> Category {
    location
        .source
        .category
        .or_else(|| location.best_candidate().map(|c| c.category))
        .unwrap_or_default()
}

#[async_trait]
impl PersistenceSink for SupabaseDatabaseSink {
    async fn upsert(&self, matched: &[LocationCandidates]) -> Result<()> {
        let rows = Self::rows(matched);
        if rows.is_empty() {
            debug!("No matched locations to persist, skipping upsert");
            return Ok(());
        }

        let url = format!(
            "{}/rest/v1/{}",
            self.config.supabase_url, self.config.locations_table
        );
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("apikey", &self.api_key)
            .header("Prefer", "resolution=merge-duplicates")
            .json(&rows)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(FetcherError::Retrieval(format!(
                "upsert into '{}' failed with {status}: {body}",
                self.config.locations_table
            )));
        }
        info!("Upserted {} matched locations", rows.len());
        Ok(())
    }
}
