use crate::config::MatcherConfig;
use crate::domain::{Candidate, LocationCandidates, MatchState};
use crate::matcher::{resolve_by_score, Resolution};
use strsim::{jaro_winkler, normalized_damerau_levenshtein};

/// Lowercases, strips punctuation and collapses whitespace so the similarity
/// metrics compare content rather than formatting.
fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = true;
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
            last_was_space = false;
        } else if !last_was_space {
            out.push(' ');
            last_was_space = true;
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

/// Normalized Damerau-Levenshtein similarity: 1 for identical strings, 0 for
/// unrelated ones.
pub fn damerau_levenshtein_score(a: &str, b: &str) -> f64 {
    let a = normalize(a);
    let b = normalize(b);
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    normalized_damerau_levenshtein(&a, &b)
}

/// Approximate token-level search score of `query` against `field`: each query
/// token is matched to its best counterpart and the similarities are averaged.
/// 1 means identical, 0 means unrelated; word order does not matter.
pub fn fuzzy_search_score(query: &str, field: &str) -> f64 {
    let query = normalize(query);
    let field = normalize(field);
    let query_tokens: Vec<&str> = query.split(' ').filter(|t| !t.is_empty()).collect();
    let field_tokens: Vec<&str> = field.split(' ').filter(|t| !t.is_empty()).collect();
    if query_tokens.is_empty() || field_tokens.is_empty() {
        return 0.0;
    }

    let total: f64 = query_tokens
        .iter()
        .map(|q| {
            field_tokens
                .iter()
                .map(|f| jaro_winkler(q, f))
                .fold(0.0, f64::max)
        })
        .sum();
    total / query_tokens.len() as f64
}

/// Computes every textual sub-score for one location's candidate set and
/// combines them into `string_score`.
///
/// The fuzzy search runs across the whole candidate set at once because it
/// ranks candidates against each other; the edit-distance scores are pairwise.
/// All sub-scores share the same contract: normalized to `[0, 1]`, higher
/// meaning more similar.
pub fn score_candidates(location: &mut LocationCandidates) {
    let name = location.source.name.clone();
    let address = location.source.address.clone();

    for candidate in &mut location.candidates {
        candidate.name_fuzzy_search_score = fuzzy_search_score(&name, &candidate.name);
        candidate.name_damerau_levenshtein_score = damerau_levenshtein_score(&name, &candidate.name);

        if let Some(address) = &address {
            candidate.address_fuzzy_search_score = fuzzy_search_score(address, &candidate.address);
            candidate.address_damerau_levenshtein_score =
                damerau_levenshtein_score(address, &candidate.address);
        }

        let name_score =
            (candidate.name_damerau_levenshtein_score + candidate.name_fuzzy_search_score) / 2.0;
        candidate.string_score = if address.is_some() {
            let address_score = (candidate.address_damerau_levenshtein_score
                + candidate.address_fuzzy_search_score)
                / 2.0;
            (name_score + address_score) / 2.0
        } else {
            name_score
        };
    }
}

/// Resolves locations the geo stage left `Unknown` by textual similarity.
///
/// Uses the same threshold/tie-break rule as the geo stage with the terminal
/// state `StringMatch`. Locations that still fail to resolve are labeled
/// terminally: `MultipleCandidates` when the top candidate cleared the high
/// threshold but a runner-up stayed close, `Inconclusive` otherwise.
pub fn classify_by_string_score(locations: &mut [LocationCandidates], config: &MatcherConfig) {
    for location in locations.iter_mut() {
        if location.state != MatchState::Unknown {
            continue;
        }
        score_candidates(location);
        match resolve_by_score(location, |c| c.string_score, MatchState::StringMatch, config) {
            Resolution::TieBreak | Resolution::Dominant => {}
            Resolution::Ambiguous => location.advance(MatchState::MultipleCandidates),
            Resolution::NoHighScore => location.advance(MatchState::Inconclusive),
        }
    }
}
