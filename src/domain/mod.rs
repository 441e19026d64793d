// Shared data shapes for the location matching pipeline

pub mod candidate;
pub mod location;
pub mod matching;

pub use candidate::{Candidate, UNSCORED};
pub use location::{filter_currencies, Category, Currency, LocationSource, Provider};
pub use matching::{LocationCandidates, MatchState};
