use crate::app::ports::CandidateRetriever;
use crate::config::PlacesConfig;
use crate::domain::{Candidate, Category, LocationSource};
use crate::error::{FetcherError, Result};
use async_trait::async_trait;
use futures::future::try_join_all;
use serde::Deserialize;
use tracing::debug;

/// Candidate retriever backed by the Google Places "find place from text"
/// endpoint.
///
/// Requests for one outer batch are fanned out in fixed-size sub-batches and
/// awaited as a group, so a failure of any one call fails its whole sub-batch
/// instead of silently dropping entries.
pub struct GooglePlacesRetriever {
    client: reqwest::Client,
    config: PlacesConfig,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct FindPlaceResponse {
    #[serde(default)]
    candidates: Vec<PlaceDetails>,
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
struct PlaceDetails {
    name: String,
    place_id: String,
    #[serde(default)]
    formatted_address: Option<String>,
    geometry: Geometry,
    #[serde(default)]
    rating: Option<f64>,
    #[serde(default)]
    photos: Vec<Photo>,
    #[serde(default)]
    types: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct Photo {
    photo_reference: String,
}

impl GooglePlacesRetriever {
    pub fn new(config: PlacesConfig, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            api_key,
        }
    }

    /// Reads the API key from `GOOGLE_MAPS_API_KEY`.
    pub fn from_env(config: PlacesConfig) -> Result<Self> {
        let api_key = std::env::var("GOOGLE_MAPS_API_KEY")?;
        Ok(Self::new(config, api_key))
    }

    async fn candidates_for(&self, source: &LocationSource) -> Result<Vec<Candidate>> {
        let input = match &source.address {
            Some(address) => format!("{}, {}", source.name, address),
            None => source.name.clone(),
        };
        let radius = if source.address.is_some() {
            self.config.radius_with_address_m
        } else {
            self.config.radius_without_address_m
        };
        let url = format!("{}/maps/api/place/findplacefromtext/json", self.config.base_url);
        let bias = format!("circle:{}@{},{}", radius, source.lat, source.lng);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("fields", "name,formatted_address,geometry,place_id,rating,photos,types"),
                ("input", input.trim()),
                ("inputtype", "textquery"),
                ("locationbias", bias.as_str()),
                ("language", "en"),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let body: FindPlaceResponse = response.json().await?;
        if !matches!(body.status.as_str(), "OK" | "ZERO_RESULTS" | "") {
            return Err(FetcherError::Retrieval(format!(
                "places service returned status '{}' for source '{}'",
                body.status, source.id
            )));
        }

        debug!(
            "Retrieved {} candidates for source '{}'",
            body.candidates.len(),
            source.id
        );
        Ok(body.candidates.into_iter().map(into_candidate).collect())
    }
}

fn into_candidate(details: PlaceDetails) -> Candidate {
    let category = category_from_gmaps_types(&details.types);
    Candidate::new(
        details.place_id,
        details.name,
        details.formatted_address.unwrap_or_default(),
        details.geometry.location.lat,
        details.geometry.location.lng,
        details.rating,
        details.photos.into_iter().next().map(|p| p.photo_reference),
        details.types,
        category,
    )
}

/// Maps the raw Google place type tags to the map's category vocabulary.
/// The first tag with a non-default mapping wins.
pub fn category_from_gmaps_types(types: &[String]) -> Category {
    types
        .iter()
        .find_map(|tag| category_for_tag(tag))
        .unwrap_or_default()
}

fn category_for_tag(tag: &str) -> Option<Category> {
    let category = match tag {
        "atm" | "bank" | "currency_exchange" | "finance" | "insurance_agency" | "lawyer"
        | "money_transfer" | "travel_agency" => Category::Cash,
        "car_dealer" | "car_rental" | "car_repair" | "car_wash" | "gas_station" | "parking"
        | "taxi_stand" | "train_station" | "transit_station" => Category::CarsBikes,
        "hardware_store" | "locksmith" | "moving_company" | "painter" | "plumber"
        | "roofing_contractor" => Category::ComputerElectronics,
        "amusement_park" | "aquarium" | "art_gallery" | "bowling_alley" | "casino"
        | "movie_theater" | "night_club" | "stadium" | "zoo" => Category::Entertainment,
        "beauty_salon" | "bicycle_store" | "campground" | "laundry" | "library"
        | "movie_rental" | "museum" => Category::LeisureActivities,
        "bakery" | "cafe" | "food" => Category::FoodDrinks,
        "bar" | "meal_delivery" | "meal_takeaway" | "restaurant" => Category::RestaurantBar,
        "dentist" | "doctor" | "drugstore" | "hair_care" | "hospital" | "pharmacy"
        | "physiotherapist" | "spa" | "veterinary_care" => Category::HealthBeauty,
        "gym" | "park" => Category::SportsFitness,
        "lodging" | "rv_park" => Category::HotelLodging,
        "book_store" | "clothing_store" | "convenience_store" | "department_store"
        | "electronics_store" | "florist" | "furniture_store" | "home_goods_store"
        | "jewelry_store" | "liquor_store" | "pet_store" | "shoe_store" | "shopping_mall"
        | "store" | "supermarket" => Category::Shop,
        _ => return None,
    };
    Some(category)
}

#[async_trait]
impl CandidateRetriever for GooglePlacesRetriever {
    async fn fetch(&self, sources: &[LocationSource]) -> Result<Vec<Vec<Candidate>>> {
        let mut results = Vec::with_capacity(sources.len());
        for sub_batch in sources.chunks(self.config.sub_batch_size.max(1)) {
            let group = try_join_all(sub_batch.iter().map(|s| self.candidates_for(s))).await?;
            results.extend(group);
        }
        Ok(results)
    }
}
