use crate::error::{FetcherError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Currencies the crypto map knows how to display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    NIM,
    BTC,
    #[serde(rename = "USDC_on_POLYGON")]
    UsdcOnPolygon,
    ETH,
    LTC,
    LBTC,
    XLM,
    XRP,
    DASH,
    BCH,
    #[serde(rename = "BINANCE_PAY")]
    BinancePay,
}

impl Currency {
    pub const ALL: [Currency; 11] = [
        Currency::NIM,
        Currency::BTC,
        Currency::UsdcOnPolygon,
        Currency::ETH,
        Currency::LTC,
        Currency::LBTC,
        Currency::XLM,
        Currency::XRP,
        Currency::DASH,
        Currency::BCH,
        Currency::BinancePay,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Currency::NIM => "NIM",
            Currency::BTC => "BTC",
            Currency::UsdcOnPolygon => "USDC_on_POLYGON",
            Currency::ETH => "ETH",
            Currency::LTC => "LTC",
            Currency::LBTC => "LBTC",
            Currency::XLM => "XLM",
            Currency::XRP => "XRP",
            Currency::DASH => "DASH",
            Currency::BCH => "BCH",
            Currency::BinancePay => "BINANCE_PAY",
        }
    }
}

/// Keeps only the currency codes the map supports, matching case-insensitively
/// on the uppercased code.
pub fn filter_currencies(codes: &[String]) -> Vec<Currency> {
    Currency::ALL
        .iter()
        .copied()
        .filter(|c| codes.iter().any(|code| code.eq_ignore_ascii_case(c.code())))
        .collect()
}

/// Business category shown on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    CarsBikes,
    Cash,
    ComputerElectronics,
    Entertainment,
    FoodDrinks,
    HealthBeauty,
    HotelLodging,
    LeisureActivities,
    RestaurantBar,
    Shop,
    SportsFitness,
    Miscellaneous,
}

impl Default for Category {
    fn default() -> Self {
        Category::Miscellaneous
    }
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::CarsBikes => "cars_bikes",
            Category::Cash => "cash",
            Category::ComputerElectronics => "computer_electronics",
            Category::Entertainment => "entertainment",
            Category::FoodDrinks => "food_drinks",
            Category::HealthBeauty => "health_beauty",
            Category::HotelLodging => "hotel_lodging",
            Category::LeisureActivities => "leisure_activities",
            Category::RestaurantBar => "restaurant_bar",
            Category::Shop => "shop",
            Category::SportsFitness => "sports_fitness",
            Category::Miscellaneous => "miscellaneous",
        }
    }

    pub fn parse(s: &str) -> Option<Category> {
        match s {
            "cars_bikes" => Some(Category::CarsBikes),
            "cash" => Some(Category::Cash),
            "computer_electronics" => Some(Category::ComputerElectronics),
            "entertainment" => Some(Category::Entertainment),
            "food_drinks" => Some(Category::FoodDrinks),
            "health_beauty" => Some(Category::HealthBeauty),
            "hotel_lodging" => Some(Category::HotelLodging),
            "leisure_activities" => Some(Category::LeisureActivities),
            "restaurant_bar" => Some(Category::RestaurantBar),
            "shop" => Some(Category::Shop),
            "sports_fitness" => Some(Category::SportsFitness),
            "miscellaneous" => Some(Category::Miscellaneous),
            _ => None,
        }
    }
}

/// Directories we ingest locations from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provider {
    DefaultShop,
    DefaultAtm,
    GoCrypto,
    Kurant,
    Bluecode,
    #[serde(rename = "Cryptopayment Link")]
    CryptopaymentLink,
    Edenia,
    Coinmap,
    #[serde(rename = "Bitcoin Jungle")]
    BitcoinJungle,
    #[serde(rename = "Accept Lightning")]
    AcceptLightning,
    Bridge2Bitcoin,
    BtcMap,
}

impl Provider {
    pub fn name(&self) -> &'static str {
        match self {
            Provider::DefaultShop => "DefaultShop",
            Provider::DefaultAtm => "DefaultAtm",
            Provider::GoCrypto => "GoCrypto",
            Provider::Kurant => "Kurant",
            Provider::Bluecode => "Bluecode",
            Provider::CryptopaymentLink => "Cryptopayment Link",
            Provider::Edenia => "Edenia",
            Provider::Coinmap => "Coinmap",
            Provider::BitcoinJungle => "Bitcoin Jungle",
            Provider::AcceptLightning => "Accept Lightning",
            Provider::Bridge2Bitcoin => "Bridge2Bitcoin",
            Provider::BtcMap => "BtcMap",
        }
    }

    pub fn parse(name: &str) -> Option<Provider> {
        [
            Provider::DefaultShop,
            Provider::DefaultAtm,
            Provider::GoCrypto,
            Provider::Kurant,
            Provider::Bluecode,
            Provider::CryptopaymentLink,
            Provider::Edenia,
            Provider::Coinmap,
            Provider::BitcoinJungle,
            Provider::AcceptLightning,
            Provider::Bridge2Bitcoin,
            Provider::BtcMap,
        ]
        .into_iter()
        .find(|p| p.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A location as published by one directory, before matching.
///
/// Immutable once produced by a provider adapter; only `category`, `accepts`
/// and `sells` may later be overwritten by an update step keyed by `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationSource {
    /// Provider-local identifier.
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default)]
    pub accepts: Vec<Currency>,
    #[serde(default)]
    pub sells: Vec<Currency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facebook: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instagram: Option<String>,
    pub provider: Provider,
}

impl LocationSource {
    /// Rejects records that would poison the scorers: a missing name makes
    /// string scoring meaningless and non-finite coordinates would propagate
    /// NaN into every distance score.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(FetcherError::DataShape {
                id: self.id.clone(),
                reason: "name is empty".to_string(),
            });
        }
        if !self.lat.is_finite() || !self.lng.is_finite() {
            return Err(FetcherError::DataShape {
                id: self.id.clone(),
                reason: format!("coordinates are not finite: ({}, {})", self.lat, self.lng),
            });
        }
        Ok(())
    }
}
