use crate::domain::Category;
use serde::{Deserialize, Serialize};

/// Sentinel for a score field that no stage has written yet.
pub const UNSCORED: f64 = -1.0;

/// An externally proposed real-world place that might be the same as a
/// source record.
///
/// Candidates are mutable scratch objects owned by the classification pass
/// that produced them; the scorers rewrite the score fields and the ordering
/// in place. All scores are normalized to `[0, 1]` with higher meaning more
/// similar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub place_id: String,
    pub name: String,
    pub address: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    /// Raw type tags as reported by the places service.
    #[serde(default)]
    pub gmaps_types: Vec<String>,
    pub category: Category,

    #[serde(default = "unscored")]
    pub distance_score: f64,
    #[serde(default = "unscored")]
    pub string_score: f64,
    #[serde(default = "unscored")]
    pub name_damerau_levenshtein_score: f64,
    #[serde(default = "unscored")]
    pub name_fuzzy_search_score: f64,
    #[serde(default = "unscored")]
    pub address_damerau_levenshtein_score: f64,
    #[serde(default = "unscored")]
    pub address_fuzzy_search_score: f64,
}

fn unscored() -> f64 {
    UNSCORED
}

impl Candidate {
    pub fn new(
        place_id: String,
        name: String,
        address: String,
        lat: f64,
        lng: f64,
        rating: Option<f64>,
        photo: Option<String>,
        gmaps_types: Vec<String>,
        category: Category,
    ) -> Self {
        Self {
            place_id,
            name,
            address,
            lat,
            lng,
            rating,
            photo,
            gmaps_types,
            category,
            distance_score: UNSCORED,
            string_score: UNSCORED,
            name_damerau_levenshtein_score: UNSCORED,
            name_fuzzy_search_score: UNSCORED,
            address_damerau_levenshtein_score: UNSCORED,
            address_fuzzy_search_score: UNSCORED,
        }
    }
}
