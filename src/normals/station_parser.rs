/// Normals Report Header Parser
///
/// Parses station metadata from the first five lines of a NOAA station normals report.
/// Each header line has the form `Label: value`:
///
/// ```text
/// Station Name: MINNEAPOLIS ST PAUL INTL AP
/// GHCN Daily ID: USW00014922
/// Latitude: 44.8831
/// Longitude: -93.2289
/// Elevation: 265.8m
/// ```
use serde::{Deserialize, Serialize};

/// Station metadata extracted from the report header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationMetadata {
    pub name: String,
    #[serde(rename = "ghcnDailyID")]
    pub ghcn_daily_id: String,
    pub lat: f64,
    pub lon: f64,
    pub elevation: f64,
}

/// Parse errors
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid number for {field}: '{value}'")]
    InvalidNumber { field: String, value: String },

    #[error("Section {marker} has {found} of 12 month rows")]
    TruncatedSection { marker: String, found: usize },

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),
}

/// Header lines in report order
const HEADER_FIELDS: [&str; 5] = ["Station Name", "GHCN Daily ID", "Latitude", "Longitude", "Elevation"];

impl StationMetadata {
    /// Parse metadata from the report lines (only the first five are read)
    pub fn from_header_lines(lines: &[&str]) -> Result<Self, ParseError> {
        let name = header_value(lines, 0)?.to_string();
        let ghcn_daily_id = header_value(lines, 1)?.to_string();
        let lat = parse_float_field(HEADER_FIELDS[2], header_value(lines, 2)?)?;
        let lon = parse_float_field(HEADER_FIELDS[3], header_value(lines, 3)?)?;
        let elevation = parse_float_field(HEADER_FIELDS[4], header_value(lines, 4)?)?;

        Ok(StationMetadata {
            name,
            ghcn_daily_id,
            lat,
            lon,
            elevation,
        })
    }
}

/// Text after the first colon of header line `idx`, trimmed
fn header_value<'a>(lines: &[&'a str], idx: usize) -> Result<&'a str, ParseError> {
    let field = HEADER_FIELDS[idx];
    let line = lines.get(idx).copied().ok_or(ParseError::MissingField(field))?;
    let (_, value) = line.split_once(':').ok_or(ParseError::MissingField(field))?;
    Ok(value.trim())
}

/// Parse a float header value, allowing a trailing unit suffix like "265.8m"
fn parse_float_field(field: &str, value: &str) -> Result<f64, ParseError> {
    let numeric = value.trim_end_matches(|c: char| c.is_ascii_alphabetic()).trim_end();

    numeric
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ParseError::InvalidNumber {
            field: field.to_string(),
            value: value.to_string(),
        })
}
