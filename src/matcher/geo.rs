use crate::config::MatcherConfig;
use crate::domain::{Candidate, LocationCandidates, LocationSource, MatchState};
use crate::matcher::resolve_by_score;

/// Returns a score between 0 (`max_distance_km` or further away) and 1
/// (exactly the same point).
///
/// Planar Euclidean distance in degrees times a rough km-per-degree factor is
/// accurate enough at the city scale the thresholds operate on.
pub fn geolocation_score(source: &LocationSource, candidate: &Candidate, config: &MatcherConfig) -> f64 {
    let distance = ((source.lat - candidate.lat).powi(2) + (source.lng - candidate.lng).powi(2))
        .sqrt()
        * config.km_per_degree;

    1.0 - (distance / config.max_distance_km).min(1.0)
}

/// Scores every candidate by proximity and resolves locations where proximity
/// alone identifies the place.
///
/// A location becomes `GeoMatch` when a single candidate dominates (top score
/// at or above the high threshold, runner-up below the runner-up threshold) or
/// when several candidates clear the high threshold and richness breaks the
/// tie. Everything else stays `Unknown` for the string stage.
pub fn classify_by_geolocation(locations: &mut [LocationCandidates], config: &MatcherConfig) {
    for location in locations.iter_mut() {
        if location.state != MatchState::Unknown {
            continue;
        }
        for candidate in &mut location.candidates {
            candidate.distance_score = geolocation_score(&location.source, candidate, config);
        }
        resolve_by_score(location, |c| c.distance_score, MatchState::GeoMatch, config);
    }
}
