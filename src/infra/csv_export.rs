//! CSV serialization of source records and classification output.
//!
//! Classified locations flatten to one row per candidate with `source.*` and
//! `candidate.*` column groups plus the match state. A location without
//! candidates still emits a single row with empty candidate columns so that
//! `NoCandidates` entries survive a round-trip.

use crate::domain::{
    Candidate, Category, Currency, LocationCandidates, LocationSource, MatchState, Provider,
};
use crate::error::{FetcherError, Result};

const SOURCE_HEADERS: [&str; 11] = [
    "source.id",
    "source.name",
    "source.lat",
    "source.lng",
    "source.address",
    "source.accepts",
    "source.sells",
    "source.category",
    "source.facebook",
    "source.instagram",
    "source.provider",
];

const CANDIDATE_HEADERS: [&str; 15] = [
    "candidate.placeId",
    "candidate.name",
    "candidate.address",
    "candidate.lat",
    "candidate.lng",
    "candidate.rating",
    "candidate.photo",
    "candidate.gmapsTypes",
    "candidate.category",
    "candidate.distanceScore",
    "candidate.stringScore",
    "candidate.nameDamerauLevensteinScore",
    "candidate.nameFuzzySearchScore",
    "candidate.addressDamerauLevensteinScore",
    "candidate.addressFuzzySearchScore",
];

fn source_fields(source: &LocationSource) -> Result<Vec<String>> {
    Ok(vec![
        source.id.clone(),
        source.name.clone(),
        source.lat.to_string(),
        source.lng.to_string(),
        source.address.clone().unwrap_or_default(),
        serde_json::to_string(&source.accepts)?,
        serde_json::to_string(&source.sells)?,
        source.category.map(|c| c.as_str().to_string()).unwrap_or_default(),
        source.facebook.clone().unwrap_or_default(),
        source.instagram.clone().unwrap_or_default(),
        source.provider.name().to_string(),
    ])
}

fn candidate_fields(candidate: &Candidate) -> Result<Vec<String>> {
    Ok(vec![
        candidate.place_id.clone(),
        candidate.name.clone(),
        candidate.address.clone(),
        candidate.lat.to_string(),
        candidate.lng.to_string(),
        candidate.rating.map(|r| r.to_string()).unwrap_or_default(),
        candidate.photo.clone().unwrap_or_default(),
        serde_json::to_string(&candidate.gmaps_types)?,
        candidate.category.as_str().to_string(),
        candidate.distance_score.to_string(),
        candidate.string_score.to_string(),
        candidate.name_damerau_levenshtein_score.to_string(),
        candidate.name_fuzzy_search_score.to_string(),
        candidate.address_damerau_levenshtein_score.to_string(),
        candidate.address_fuzzy_search_score.to_string(),
    ])
}

/// Serializes plain source records, one row per location.
pub fn locations_to_csv(locations: &[LocationSource]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(SOURCE_HEADERS)?;
    for location in locations {
        writer.write_record(source_fields(location)?)?;
    }
    finish(writer)
}

/// Serializes classified locations, one row per candidate.
pub fn locations_with_candidates_to_csv(locations: &[LocationCandidates]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let mut headers = vec!["state"];
    headers.extend(SOURCE_HEADERS);
    headers.extend(CANDIDATE_HEADERS);
    writer.write_record(&headers)?;

    for location in locations {
        let source = source_fields(&location.source)?;
        if location.candidates.is_empty() {
            let mut row = vec![location.state.as_str().to_string()];
            row.extend(source);
            row.extend(std::iter::repeat(String::new()).take(CANDIDATE_HEADERS.len()));
            writer.write_record(&row)?;
            continue;
        }
        for candidate in &location.candidates {
            let mut row = vec![location.state.as_str().to_string()];
            row.extend(source.clone());
            row.extend(candidate_fields(candidate)?);
            writer.write_record(&row)?;
        }
    }
    finish(writer)
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = writer
        .into_inner()
        .map_err(|e| FetcherError::Config(format!("CSV writer flush failed: {e}")))?;
    String::from_utf8(bytes).map_err(|e| FetcherError::Config(format!("CSV is not UTF-8: {e}")))
}

struct Row<'a> {
    headers: &'a csv::StringRecord,
    record: &'a csv::StringRecord,
}

impl<'a> Row<'a> {
    fn get(&self, column: &str) -> &'a str {
        self.headers
            .iter()
            .position(|h| h == column)
            .and_then(|i| self.record.get(i))
            .unwrap_or("")
    }

    fn opt(&self, column: &str) -> Option<String> {
        let value = self.get(column);
        (!value.is_empty()).then(|| value.to_string())
    }

    fn f64(&self, column: &str) -> Result<f64> {
        let value = self.get(column);
        value
            .parse()
            .map_err(|_| FetcherError::MissingField(format!("{column}: '{value}' is not a number")))
    }

    fn currencies(&self, column: &str) -> Result<Vec<Currency>> {
        let value = self.get(column);
        if value.is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(value)?)
    }
}

fn source_from_row(row: &Row<'_>) -> Result<LocationSource> {
    let provider_name = row.get("source.provider");
    let provider = Provider::parse(provider_name)
        .ok_or_else(|| FetcherError::MissingField(format!("unknown provider '{provider_name}'")))?;
    Ok(LocationSource {
        id: row.get("source.id").to_string(),
        name: row.get("source.name").to_string(),
        lat: row.f64("source.lat")?,
        lng: row.f64("source.lng")?,
        address: row.opt("source.address"),
        accepts: row.currencies("source.accepts")?,
        sells: row.currencies("source.sells")?,
        category: Category::parse(row.get("source.category")),
        facebook: row.opt("source.facebook"),
        instagram: row.opt("source.instagram"),
        provider,
    })
}

fn candidate_from_row(row: &Row<'_>) -> Result<Candidate> {
    let gmaps_types = match row.get("candidate.gmapsTypes") {
        "" => Vec::new(),
        json => serde_json::from_str(json)?,
    };
    let mut candidate = Candidate::new(
        row.get("candidate.placeId").to_string(),
        row.get("candidate.name").to_string(),
        row.get("candidate.address").to_string(),
        row.f64("candidate.lat")?,
        row.f64("candidate.lng")?,
        row.opt("candidate.rating").and_then(|r| r.parse().ok()),
        row.opt("candidate.photo"),
        gmaps_types,
        Category::parse(row.get("candidate.category")).unwrap_or_default(),
    );
    candidate.distance_score = row.f64("candidate.distanceScore")?;
    candidate.string_score = row.f64("candidate.stringScore")?;
    candidate.name_damerau_levenshtein_score = row.f64("candidate.nameDamerauLevensteinScore")?;
    candidate.name_fuzzy_search_score = row.f64("candidate.nameFuzzySearchScore")?;
    candidate.address_damerau_levenshtein_score =
        row.f64("candidate.addressDamerauLevensteinScore")?;
    candidate.address_fuzzy_search_score = row.f64("candidate.addressFuzzySearchScore")?;
    Ok(candidate)
}

/// Parses plain source records written by [`locations_to_csv`].
pub fn locations_from_csv(content: &str) -> Result<Vec<LocationSource>> {
    let mut reader = csv::Reader::from_reader(content.as_bytes());
    let headers = reader.headers()?.clone();
    let mut locations = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row = Row { headers: &headers, record: &record };
        locations.push(source_from_row(&row)?);
    }
    Ok(locations)
}

/// Parses classified locations written by [`locations_with_candidates_to_csv`],
/// regrouping candidate rows under their source record by `source.id`.
pub fn locations_with_candidates_from_csv(content: &str) -> Result<Vec<LocationCandidates>> {
    let mut reader = csv::Reader::from_reader(content.as_bytes());
    let headers = reader.headers()?.clone();
    let mut locations: Vec<LocationCandidates> = Vec::new();

    for record in reader.records() {
        let record = record?;
        let row = Row { headers: &headers, record: &record };
        let source_id = row.get("source.id").to_string();

        let candidate = if row.get("candidate.placeId").is_empty() {
            None
        } else {
            Some(candidate_from_row(&row)?)
        };

        if let Some(existing) = locations.iter_mut().find(|l| l.source.id == source_id) {
            if let Some(candidate) = candidate {
                existing.candidates.push(candidate);
            }
            continue;
        }

        let state_label = row.get("state");
        let state = MatchState::parse(state_label)
            .ok_or_else(|| FetcherError::MissingField(format!("unknown state '{state_label}'")))?;
        locations.push(LocationCandidates {
            source: source_from_row(&row)?,
            candidates: candidate.into_iter().collect(),
            state,
        });
    }
    Ok(locations)
}
