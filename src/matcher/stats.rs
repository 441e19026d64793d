use crate::domain::{LocationCandidates, MatchState};
use serde::Serialize;

/// One entry of the outcome distribution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateCount {
    pub state: MatchState,
    pub count: usize,
    /// Share of the total in percent, rounded to two decimals.
    pub percentage: f64,
}

/// Outcome distribution of a processed set, for operator visibility.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchStats {
    pub total: usize,
    pub distribution: Vec<StateCount>,
}

impl MatchStats {
    /// Single-line rendering for console summaries, e.g.
    /// `geo-match: 2 (66.67%) | no-candidates: 1 (33.33%)`.
    pub fn inline(&self) -> String {
        self.distribution
            .iter()
            .map(|entry| format!("{}: {} ({}%)", entry.state, entry.count, entry.percentage))
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

const STATE_ORDER: [MatchState; 6] = [
    MatchState::GeoMatch,
    MatchState::StringMatch,
    MatchState::NoCandidates,
    MatchState::MultipleCandidates,
    MatchState::Inconclusive,
    MatchState::Unknown,
];

/// Summarizes the match-state distribution of a processed set.
///
/// Pure and total: empty input yields `total = 0` with an empty distribution
/// instead of dividing by zero. Only states actually present appear, in a
/// fixed order so output is deterministic.
pub fn summarize(matched: &[LocationCandidates], unmatched: &[LocationCandidates]) -> MatchStats {
    let total = matched.len() + unmatched.len();
    if total == 0 {
        return MatchStats { total: 0, distribution: Vec::new() };
    }

    let distribution = STATE_ORDER
        .iter()
        .filter_map(|&state| {
            let count = matched
                .iter()
                .chain(unmatched.iter())
                .filter(|l| l.state == state)
                .count();
            (count > 0).then(|| StateCount {
                state,
                count,
                percentage: round2(100.0 * count as f64 / total as f64),
            })
        })
        .collect();

    MatchStats { total, distribution }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
