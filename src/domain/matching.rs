use crate::domain::{Candidate, LocationSource};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome label of the classification pipeline for one source record.
///
/// Every state except `Unknown` is terminal; a location never regresses to an
/// earlier stage once advanced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchState {
    /// Candidate retrieval returned empty (or the record was rejected
    /// before retrieval).
    #[serde(rename = "no-candidates")]
    NoCandidates,
    /// Candidates exist but no stage has classified them yet.
    #[serde(rename = "unknown")]
    Unknown,
    /// Resolved by proximity.
    #[serde(rename = "geo-match")]
    GeoMatch,
    /// Resolved by textual similarity after geo failed to resolve.
    #[serde(rename = "string-match")]
    StringMatch,
    /// Two or more plausible candidates remained after both stages.
    #[serde(rename = "multiple-matches")]
    MultipleCandidates,
    /// Neither stage resolved uniquely.
    #[serde(rename = "inconclusive")]
    Inconclusive,
}

impl MatchState {
    pub fn is_matched(&self) -> bool {
        matches!(self, MatchState::GeoMatch | MatchState::StringMatch)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchState::NoCandidates => "no-candidates",
            MatchState::Unknown => "unknown",
            MatchState::GeoMatch => "geo-match",
            MatchState::StringMatch => "string-match",
            MatchState::MultipleCandidates => "multiple-matches",
            MatchState::Inconclusive => "inconclusive",
        }
    }

    pub fn parse(s: &str) -> Option<MatchState> {
        match s {
            "no-candidates" => Some(MatchState::NoCandidates),
            "unknown" => Some(MatchState::Unknown),
            "geo-match" => Some(MatchState::GeoMatch),
            "string-match" => Some(MatchState::StringMatch),
            "multiple-matches" => Some(MatchState::MultipleCandidates),
            "inconclusive" => Some(MatchState::Inconclusive),
            _ => None,
        }
    }
}

impl fmt::Display for MatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The unit the classification engine operates on: one source record and the
/// externally supplied candidates proposed for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationCandidates {
    pub source: LocationSource,
    /// Rewritten in place by each scoring stage, best candidate first.
    pub candidates: Vec<Candidate>,
    pub state: MatchState,
}

impl LocationCandidates {
    /// Builds the initial record for freshly retrieved candidates, upholding
    /// the invariant that `NoCandidates` is exactly the empty-candidates case.
    pub fn new(source: LocationSource, candidates: Vec<Candidate>) -> Self {
        let state = if candidates.is_empty() {
            MatchState::NoCandidates
        } else {
            MatchState::Unknown
        };
        Self { source, candidates, state }
    }

    /// Advances the state machine. Transitions are only taken out of
    /// `Unknown`; a terminal state is never overwritten.
    pub fn advance(&mut self, state: MatchState) {
        if self.state == MatchState::Unknown && state != MatchState::Unknown {
            self.state = state;
        }
    }

    pub fn best_candidate(&self) -> Option<&Candidate> {
        self.candidates.first()
    }
}
