//! Fetches crypto-payment locations from public directories, matches them
//! against Google Places candidates and persists the confirmed set.

pub mod app;
pub mod config;
pub mod constants;
pub mod domain;
pub mod error;
pub mod infra;
pub mod logging;
pub mod matcher;
pub mod providers;
