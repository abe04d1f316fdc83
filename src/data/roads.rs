use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;

use super::fetch::{decode, Fetch};
use crate::error::{DashboardError, Result};

pub const LABEL_SEPARATOR: &str = " <=> ";

// ---------------------------------------------------------------------------
// RoadSegment – one row of the roads CSV
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RoadSegment {
    #[serde(rename = "COD. TRECHO")]
    pub code: String,
    #[serde(rename = "INÍCIO")]
    pub start: String,
    #[serde(rename = "FIM")]
    pub end: String,
}

impl RoadSegment {
    /// `"<start> <=> <end>"`.
    pub fn label(&self) -> String {
        format!("{}{LABEL_SEPARATOR}{}", self.start, self.end)
    }
}

/// Display label → segment code, iterated in label order.
///
/// Later rows overwrite earlier ones with the same label.
pub type RoadCatalog = BTreeMap<String, String>;

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Download and parse the roads CSV.
pub fn load_segments(
    fetcher: &dyn Fetch,
    url: &str,
    encoding: &str,
    delimiter: u8,
) -> Result<Vec<RoadSegment>> {
    let bytes = fetcher.fetch(url)?;
    let text = decode(&bytes, encoding)?;
    let segments = parse_segments(&text, delimiter)?;
    log::info!("Loaded {} road segments from {url}", segments.len());
    Ok(segments)
}

pub fn parse_segments(text: &str, delimiter: u8) -> Result<Vec<RoadSegment>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut segments = Vec::new();
    for (row_no, result) in reader.deserialize::<RoadSegment>().enumerate() {
        let segment =
            result.map_err(|e| DashboardError::parse(format!("roads CSV row {row_no}: {e}")))?;
        if segment.code.is_empty() {
            log::warn!("roads CSV row {row_no}: empty segment code, skipping");
            continue;
        }
        segments.push(segment);
    }
    Ok(segments)
}

/// Build the road dropdown from parsed segments.
///
/// An empty `restrict_to` set means no restriction: every segment is
/// included.
pub fn road_catalog(segments: &[RoadSegment], restrict_to: &BTreeSet<String>) -> RoadCatalog {
    let mut labelled: Vec<(String, &RoadSegment)> =
        segments.iter().map(|s| (s.label(), s)).collect();
    labelled.sort_by(|a, b| a.0.cmp(&b.0));

    labelled
        .into_iter()
        .filter(|(_, s)| restrict_to.is_empty() || restrict_to.contains(&s.code))
        .map(|(label, s)| (label, s.code.clone()))
        .collect()
}
