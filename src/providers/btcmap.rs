use crate::domain::{filter_currencies, Category, Currency, LocationSource, Provider};
use crate::error::Result;
use crate::providers::LocationProvider;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;

/// Adapter for the BTC Map elements feed. Records arrive as OpenStreetMap
/// nodes with free-form tag maps, so most of the work here is untangling the
/// many `addr:*` spellings into one display address.
pub struct BtcMapProvider {
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct Element {
    id: String,
    osm_json: OsmJson,
    #[serde(default)]
    tags: ElementTags,
}

#[derive(Debug, Deserialize)]
struct OsmJson {
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
    #[serde(default)]
    geometry: Vec<GeometryPoint>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct GeometryPoint {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Default, Deserialize)]
struct ElementTags {
    #[serde(default)]
    category: Option<String>,
}

/// `currency:<code>=yes` OSM tags we recognize. Codes outside the map's
/// supported set are dropped afterwards by [`filter_currencies`].
const CURRENCY_TAGS: [&str; 29] = [
    "XBT", "XMR", "ERC20", "ETH", "XRP", "Tether", "BCH", "LTC", "USDT", "BNB", "DASH", "NEM",
    "DOGE", "TRX", "XBR", "XMB", "doge_coin", "bitcoin", "ZEC", "BTG", "dot", "link", "ADA", "BTC",
    "DAI", "UBQ", "IOTA", "XNO", "XLM",
];

fn currency_symbol(code: &str) -> &str {
    match code {
        "bitcoin" => "BTC",
        "doge_coin" => "DOGE",
        "dot" => "DOT",
        "link" => "LINK",
        other => other,
    }
}

fn first_tag<'a>(tags: &'a HashMap<String, String>, keys: &[&str]) -> &'a str {
    keys.iter()
        .filter_map(|key| tags.get(*key))
        .map(String::as_str)
        .find(|value| !value.is_empty())
        .unwrap_or("")
}

fn accepted_currencies(tags: &HashMap<String, String>) -> Vec<Currency> {
    let codes: Vec<String> = tags
        .iter()
        .filter(|(key, value)| {
            key.strip_prefix("currency:")
                .is_some_and(|code| CURRENCY_TAGS.contains(&code))
                && value.as_str() == "yes"
        })
        .map(|(key, _)| currency_symbol(&key["currency:".len()..]).to_string())
        .collect();
    filter_currencies(&codes)
}

fn assemble_address(tags: &HashMap<String, String>) -> Option<String> {
    let full = first_tag(tags, &["addr:full", "addr:full:en"]);
    if !full.is_empty() {
        return Some(full.to_string());
    }

    let street = first_tag(
        tags,
        &["addr:street", "addr:street:name", "addr:street:it", "addr:street:de", "addr:street:fr", "addr:street:ar"],
    );
    let city = first_tag(
        tags,
        &[
            "addr:city", "addr:village", "addr:town", "addr:city:it", "addr:city:de",
            "addr:city:en", "addr:city:ur", "addr:city:ar", "addr:city:fr", "addr:city:ru",
            "addr:city:el",
        ],
    );
    let postcode = first_tag(tags, &["addr:postcode", "addr:postal_district"]);
    let country = first_tag(tags, &["addr:country"]);
    let street_number = first_tag(
        tags,
        &[
            "addr:streetnumber", "addr:housenumber", "addr:block_number", "addr:door",
            "addr:unit", "addr:unit_number", "addr:nostreet",
        ],
    );

    let assembled = format!("{street_number} {street}, {postcode} {city}, {country}");
    let collapsed = assembled
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|c: char| c == ',' || c.is_whitespace())
        .replace(" ,", ",");
    (!collapsed.is_empty() && collapsed != ",").then_some(collapsed)
}

fn element_category(element: &Element) -> Category {
    match element.tags.category.as_deref() {
        Some("atm") => Category::Cash,
        Some("bar") | Some("pub") | Some("restaurant") => Category::RestaurantBar,
        Some("cafe") => Category::FoodDrinks,
        Some("hotel") => Category::HotelLodging,
        _ => Category::Miscellaneous,
    }
}

fn into_source(element: Element) -> LocationSource {
    let category = element_category(&element);
    let tags = &element.osm_json.tags;

    // Nodes carry lat/lon directly; ways only carry a geometry outline.
    let (lat, lng) = match (element.osm_json.lat, element.osm_json.lon) {
        (Some(lat), Some(lon)) => (lat, lon),
        _ => element
            .osm_json
            .geometry
            .first()
            .map(|p| (p.lat, p.lon))
            .unwrap_or((f64::NAN, f64::NAN)),
    };

    let name = first_tag(tags, &["name", "addr:place", "addr:place:it", "addr:place:de"]);
    let sells = if tags.get("amenity").map(String::as_str) == Some("atm") {
        // ATMs in this feed only dispense bitcoin
        vec![Currency::BTC]
    } else {
        Vec::new()
    };

    LocationSource {
        id: element.id.clone(),
        name: name.to_string(),
        lat,
        lng,
        address: assemble_address(tags),
        accepts: accepted_currencies(tags),
        sells,
        category: Some(category),
        facebook: tags.get("facebook").cloned(),
        instagram: tags.get("instagram").cloned(),
        provider: Provider::BtcMap,
    }
}

impl BtcMapProvider {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for BtcMapProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LocationProvider for BtcMapProvider {
    fn provider(&self) -> Provider {
        Provider::BtcMap
    }

    async fn fetch_locations(&self, url: &str) -> Result<Vec<LocationSource>> {
        let elements: Vec<Element> = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(elements.into_iter().map(into_source).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn element(value: serde_json::Value) -> Element {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn node_with_full_tags_maps_cleanly() {
        let source = into_source(element(json!({
            "id": "node:123",
            "osm_json": {
                "lat": 47.668,
                "lon": -122.383,
                "tags": {
                    "name": "Cafe Satoshi",
                    "addr:street": "Market St",
                    "addr:housenumber": "2060",
                    "addr:city": "Seattle",
                    "addr:postcode": "98107",
                    "currency:BTC": "yes",
                    "currency:XMR": "yes",
                    "currency:LTC": "no",
                    "instagram": "cafesatoshi"
                }
            },
            "tags": { "category": "cafe" }
        })));

        assert_eq!(source.id, "node:123");
        assert_eq!(source.name, "Cafe Satoshi");
        assert_eq!(source.category, Some(Category::FoodDrinks));
        assert_eq!(source.address.as_deref(), Some("2060 Market St, 98107 Seattle"));
        // XMR is recognized in the feed but not supported by the map;
        // LTC is tagged "no" so it never qualifies.
        assert_eq!(source.accepts, vec![Currency::BTC]);
        assert!(source.sells.is_empty());
        assert_eq!(source.instagram.as_deref(), Some("cafesatoshi"));
    }

    #[test]
    fn atm_sells_bitcoin_and_maps_to_cash() {
        let source = into_source(element(json!({
            "id": "node:9",
            "osm_json": {
                "lat": 1.0,
                "lon": 2.0,
                "tags": { "name": "Orange ATM", "amenity": "atm" }
            },
            "tags": { "category": "atm" }
        })));

        assert_eq!(source.category, Some(Category::Cash));
        assert_eq!(source.sells, vec![Currency::BTC]);
    }

    #[test]
    fn way_without_coordinates_falls_back_to_geometry() {
        let source = into_source(element(json!({
            "id": "way:7",
            "osm_json": {
                "geometry": [{ "lat": 48.1, "lon": 11.5 }, { "lat": 48.2, "lon": 11.6 }],
                "tags": { "name": "Biergarten" }
            },
            "tags": {}
        })));

        assert_eq!(source.lat, 48.1);
        assert_eq!(source.lng, 11.5);
        assert_eq!(source.category, Some(Category::Miscellaneous));
    }

    #[test]
    fn missing_address_tags_yield_no_address() {
        let source = into_source(element(json!({
            "id": "node:1",
            "osm_json": { "lat": 1.0, "lon": 2.0, "tags": { "name": "Kiosk" } },
            "tags": {}
        })));
        assert_eq!(source.address, None);
    }

    #[test]
    fn addr_full_wins_over_assembled_parts() {
        let source = into_source(element(json!({
            "id": "node:2",
            "osm_json": {
                "lat": 1.0,
                "lon": 2.0,
                "tags": {
                    "name": "Shop",
                    "addr:full": "Calle 8 #43B-90, Medellin",
                    "addr:street": "Calle 8"
                }
            },
            "tags": {}
        })));
        assert_eq!(source.address.as_deref(), Some("Calle 8 #43B-90, Medellin"));
    }
}
