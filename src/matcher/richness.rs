use crate::config::MatcherConfig;
use crate::domain::{Candidate, Category};

/// Weighs how much descriptive data a candidate carries.
///
/// Used exclusively to break ties among multiple high-confidence candidates,
/// never to decide match/no-match on its own.
pub fn richness_weight(candidate: &Candidate, config: &MatcherConfig) -> f64 {
    let mut weight = 0.0;
    if !candidate.address.is_empty() {
        weight += config.richness_address;
    }
    if candidate.photo.is_some() {
        weight += config.richness_photo;
    }
    if candidate.rating.is_some() {
        weight += config.richness_rating;
    }
    if candidate.category != Category::default() {
        weight += config.richness_category;
    }
    weight
}
