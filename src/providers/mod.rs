//! Provider adapters that pull raw location records from the public
//! directories we ingest. Each adapter normalizes one feed's shape into
//! [`LocationSource`] records; shape problems surface later, in validation.

pub mod btcmap;
pub mod coinmap;

use crate::config::Config;
use crate::domain::{LocationSource, Provider};
use crate::error::{FetcherError, Result};
use async_trait::async_trait;
use tracing::info;

pub use btcmap::BtcMapProvider;
pub use coinmap::CoinmapProvider;

/// Fetches the full current snapshot of a provider's public feed.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    fn provider(&self) -> Provider;
    async fn fetch_locations(&self, url: &str) -> Result<Vec<LocationSource>>;
}

/// Resolves the adapter for a provider and pulls its feed using the
/// configured source URL.
pub async fn fetch_from_provider(provider: Provider, config: &Config) -> Result<Vec<LocationSource>> {
    let url = config.provider_source(provider)?;
    let adapter: Box<dyn LocationProvider> = match provider {
        Provider::BtcMap => Box::new(BtcMapProvider::new()),
        Provider::Coinmap => Box::new(CoinmapProvider::new()),
        other => {
            return Err(FetcherError::Config(format!(
                "Provider {other} has no fetcher implemented"
            )))
        }
    };

    let locations = adapter.fetch_locations(url).await?;
    info!("Fetched {} locations from {}", locations.len(), provider);
    Ok(locations)
}
