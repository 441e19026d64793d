use crate::domain::Provider;

/// Default outer batch size for the matching loop.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Turns a provider's display name into a storage-path-safe segment,
/// e.g. "Bitcoin Jungle" -> "bitcoin-jungle".
pub fn sanitize_provider_name(provider: Provider) -> String {
    provider.name().to_lowercase().replace(' ', "-")
}

/// Timestamp segment for checkpoint root paths.
pub fn date_to_path_segment(date: chrono::DateTime<chrono::Utc>) -> String {
    date.format("%Y-%m-%d_%H-%M-%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_names_become_path_safe() {
        assert_eq!(sanitize_provider_name(Provider::BtcMap), "btcmap");
        assert_eq!(sanitize_provider_name(Provider::BitcoinJungle), "bitcoin-jungle");
        assert_eq!(
            sanitize_provider_name(Provider::CryptopaymentLink),
            "cryptopayment-link"
        );
    }
}
