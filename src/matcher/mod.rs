// Candidate classification engine: geographic scoring, textual-similarity
// scoring, and the shared threshold/tie-break rule that assigns match states.

pub mod geo;
pub mod richness;
pub mod stats;
pub mod string;

use crate::app::ports::CandidateRetriever;
use crate::config::MatcherConfig;
use crate::domain::{Candidate, LocationCandidates, LocationSource, MatchState};
use crate::error::{FetcherError, Result};
use crate::matcher::richness::richness_weight;
use std::cmp::Ordering;
use tracing::{debug, warn};

/// Which rule of the classification step fired for one location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// More than one high-confidence candidate; richness broke the tie.
    TieBreak,
    /// A single dominant candidate without a close runner-up.
    Dominant,
    /// The top candidate cleared the threshold but a runner-up stayed close.
    Ambiguous,
    /// No candidate cleared the high-score threshold.
    NoHighScore,
}

/// Applies the shared threshold/tie-break rule over already-computed scores.
///
/// Sorts `candidates` descending by `score` (stable, so ties keep their prior
/// relative order), then either advances the location to `success` with the
/// winner moved to the front, or leaves the state untouched and reports why.
pub fn resolve_by_score<F>(
    location: &mut LocationCandidates,
    score: F,
    success: MatchState,
    config: &MatcherConfig,
) -> Resolution
where
    F: Fn(&Candidate) -> f64,
{
    location.candidates.sort_by(|a, b| {
        score(b).partial_cmp(&score(a)).unwrap_or(Ordering::Equal)
    });

    let high_count = location
        .candidates
        .iter()
        .filter(|c| score(c) > config.high_score_threshold)
        .count();

    if high_count > 1 {
        // Richness decides between multiple high-confidence candidates; the
        // higher score wins only when the richness weights tie. The high
        // scorers are a prefix of the sorted list, so moving the winner to the
        // front keeps the remaining ones in their prior relative order.
        let mut winner = 0;
        for i in 1..high_count {
            let challenger = richness_weight(&location.candidates[i], config);
            let incumbent = richness_weight(&location.candidates[winner], config);
            // Strictly-greater keeps the earlier (higher-scored) candidate
            // when richness weights tie.
            if challenger > incumbent {
                winner = i;
            }
        }
        let winner = location.candidates.remove(winner);
        location.candidates.insert(0, winner);
        location.advance(success);
        return Resolution::TieBreak;
    }

    let top = score(&location.candidates[0]);
    let runner_up = location.candidates.get(1).map(&score);
    if top >= config.high_score_threshold
        && runner_up.map_or(true, |s| s < config.runner_up_threshold)
    {
        location.advance(success);
        return Resolution::Dominant;
    }

    if top >= config.high_score_threshold {
        Resolution::Ambiguous
    } else {
        Resolution::NoHighScore
    }
}

/// Splits a vector by a predicate, preserving relative order on both sides.
pub fn partition<T>(items: Vec<T>, predicate: impl Fn(&T) -> bool) -> (Vec<T>, Vec<T>) {
    let mut yes = Vec::new();
    let mut no = Vec::new();
    for item in items {
        if predicate(&item) {
            yes.push(item);
        } else {
            no.push(item);
        }
    }
    (yes, no)
}

/// Outcome of classifying one batch of source records.
#[derive(Debug, Clone, Default)]
pub struct MatchingResult {
    pub matched: Vec<LocationCandidates>,
    pub unmatched: Vec<LocationCandidates>,
}

impl MatchingResult {
    pub fn extend(&mut self, other: MatchingResult) {
        self.matched.extend(other.matched);
        self.unmatched.extend(other.unmatched);
    }

    pub fn total(&self) -> usize {
        self.matched.len() + self.unmatched.len()
    }
}

/// Classifies a set of source records against externally retrieved candidates.
///
/// Shape-invalid records are rejected before retrieval and deterministically
/// land in `NoCandidates`; retrieval failures propagate without partially
/// applied classification.
pub async fn classify(
    sources: Vec<LocationSource>,
    retriever: &dyn CandidateRetriever,
    config: &MatcherConfig,
) -> Result<MatchingResult> {
    let mut rejected = Vec::new();
    let mut valid = Vec::new();
    for source in sources {
        match source.validate() {
            Ok(()) => valid.push(source),
            Err(e) => {
                warn!("Rejecting source record before scoring: {}", e);
                rejected.push(LocationCandidates::new(source, Vec::new()));
            }
        }
    }

    let candidate_lists = retriever.fetch(&valid).await?;
    if candidate_lists.len() != valid.len() {
        return Err(FetcherError::Retrieval(format!(
            "retriever returned {} candidate lists for {} sources",
            candidate_lists.len(),
            valid.len()
        )));
    }

    let locations: Vec<LocationCandidates> = valid
        .into_iter()
        .zip(candidate_lists)
        .map(|(source, candidates)| LocationCandidates::new(source, candidates))
        .collect();

    let (mut with_candidates, no_candidates) =
        partition(locations, |l| l.state != MatchState::NoCandidates);

    geo::classify_by_geolocation(&mut with_candidates, config);
    let (geo_matched, mut geo_unmatched) =
        partition(with_candidates, |l| l.state == MatchState::GeoMatch);

    string::classify_by_string_score(&mut geo_unmatched, config);
    let (string_matched, unresolved) =
        partition(geo_unmatched, |l| l.state == MatchState::StringMatch);

    debug!(
        "Classified batch: {} geo, {} string, {} without candidates, {} rejected, {} unresolved",
        geo_matched.len(),
        string_matched.len(),
        no_candidates.len(),
        rejected.len(),
        unresolved.len()
    );

    let mut matched = geo_matched;
    matched.extend(string_matched);

    let mut unmatched = no_candidates;
    unmatched.extend(rejected);
    unmatched.extend(unresolved);

    Ok(MatchingResult { matched, unmatched })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::{Category, Currency, Provider};
    use async_trait::async_trait;
    use std::collections::HashMap;

    pub(crate) fn test_source(id: &str, name: &str, lat: f64, lng: f64) -> LocationSource {
        LocationSource {
            id: id.to_string(),
            name: name.to_string(),
            lat,
            lng,
            address: None,
            accepts: vec![Currency::BTC],
            sells: Vec::new(),
            category: None,
            facebook: None,
            instagram: None,
            provider: Provider::Coinmap,
        }
    }

    pub(crate) fn test_candidate(place_id: &str, name: &str, lat: f64, lng: f64) -> Candidate {
        Candidate::new(
            place_id.to_string(),
            name.to_string(),
            String::new(),
            lat,
            lng,
            None,
            None,
            Vec::new(),
            Category::Miscellaneous,
        )
    }

    /// Retriever serving canned candidate lists keyed by source id.
    struct MapRetriever {
        by_id: HashMap<String, Vec<Candidate>>,
    }

    #[async_trait]
    impl CandidateRetriever for MapRetriever {
        async fn fetch(&self, sources: &[LocationSource]) -> Result<Vec<Vec<Candidate>>> {
            Ok(sources
                .iter()
                .map(|s| self.by_id.get(&s.id).cloned().unwrap_or_default())
                .collect())
        }
    }

    #[tokio::test]
    async fn classify_partitions_into_matched_and_unmatched() {
        let config = MatcherConfig::default();
        let sources = vec![
            test_source("near", "Cafe Alpha", 10.0, 10.0),
            test_source("empty", "Cafe Beta", 20.0, 20.0),
            test_source("", "", f64::NAN, 0.0),
        ];
        let retriever = MapRetriever {
            by_id: HashMap::from([(
                "near".to_string(),
                vec![test_candidate("p1", "Cafe Alpha", 10.0, 10.0)],
            )]),
        };

        let result = classify(sources, &retriever, &config).await.unwrap();

        assert_eq!(result.matched.len(), 1);
        assert_eq!(result.matched[0].state, MatchState::GeoMatch);
        assert_eq!(result.unmatched.len(), 2);
        for location in &result.unmatched {
            assert_eq!(location.state, MatchState::NoCandidates);
            assert!(location.candidates.is_empty());
        }
    }

    #[tokio::test]
    async fn classify_is_idempotent_over_identical_inputs() {
        let config = MatcherConfig::default();
        let make_sources = || {
            vec![
                test_source("a", "Cafe Alpha", 10.0, 10.0),
                test_source("b", "Cafe Beta", 20.0, 20.0),
            ]
        };
        let retriever = MapRetriever {
            by_id: HashMap::from([
                (
                    "a".to_string(),
                    vec![
                        test_candidate("p1", "Cafe Alpha", 10.0, 10.0),
                        test_candidate("p2", "Cafe Gamma", 12.0, 12.0),
                    ],
                ),
                (
                    "b".to_string(),
                    vec![test_candidate("p3", "Unrelated Hardware", 21.0, 21.0)],
                ),
            ]),
        };

        let first = classify(make_sources(), &retriever, &config).await.unwrap();
        let second = classify(make_sources(), &retriever, &config).await.unwrap();

        let states = |r: &MatchingResult| -> Vec<(String, MatchState, Vec<String>)> {
            r.matched
                .iter()
                .chain(r.unmatched.iter())
                .map(|l| {
                    (
                        l.source.id.clone(),
                        l.state,
                        l.candidates.iter().map(|c| c.place_id.clone()).collect(),
                    )
                })
                .collect()
        };
        assert_eq!(states(&first), states(&second));
    }

    #[tokio::test]
    async fn classify_rejects_truncated_retriever_output() {
        struct DroppingRetriever;

        #[async_trait]
        impl CandidateRetriever for DroppingRetriever {
            async fn fetch(&self, _sources: &[LocationSource]) -> Result<Vec<Vec<Candidate>>> {
                Ok(Vec::new())
            }
        }

        let config = MatcherConfig::default();
        let sources = vec![test_source("a", "Cafe Alpha", 10.0, 10.0)];
        let err = classify(sources, &DroppingRetriever, &config).await.unwrap_err();
        assert!(matches!(err, FetcherError::Retrieval(_)));
    }
}
