/// Normals Daily Section Parser
///
/// Decodes the fixed-width daily sections of a NOAA station normals report.
/// A section is 12 consecutive lines (January..December) beginning with the line
/// that starts with the section marker, e.g. `dly-tmax-normal`.
///
/// Row layout:
/// - Columns 0..20: label (marker, month number)
/// - From column 20: one 7-character slot per day, e.g. `   354C`
///
/// Slot values are integers with an optional alphabetic flag suffix
/// (`C` complete, `S` standard, `P` provisional, ...). Sentinels:
/// - `-7777`: non-zero value that rounds to zero, decoded as 0 (only when unflagged)
/// - `-9999`: missing, decoded as null
///
/// Temperatures are tenths of a degree F. Precipitation (hundredths of inch) and
/// snowfall (tenths of inch) are month-to-date running totals and are first-differenced
/// within each month row to recover daily amounts.
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

use crate::normals::station_parser::ParseError;

/// Byte offset of the first day slot in a section row
pub const FIRST_SLOT_OFFSET: usize = 20;
/// Width of each day slot
pub const SLOT_WIDTH: usize = 7;

const MONTH_ROWS: usize = 12;
const FEBRUARY_ROW: usize = 1;
const FEBRUARY_DAYS: usize = 28;

const TRACE_SENTINEL: &str = "-7777";
const MISSING_SENTINEL: i64 = -9999;
const VALID_FLOOR: i64 = -1000;

/// Daily sections decoded for every station, in output order
pub const DAILY_SECTIONS: [(&str, SectionKind); 6] = [
    ("dly-tmax-normal", SectionKind::Temp),
    ("dly-tmin-normal", SectionKind::Temp),
    ("dly-tavg-normal", SectionKind::Temp),
    ("dly-dutr-normal", SectionKind::Temp),
    ("mtd-prcp-normal", SectionKind::Precip),
    ("mtd-snow-normal", SectionKind::Snow),
];

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Section not found: {0}")]
    SectionNotFound(String),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// How the values of a section are encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    /// Tenths of a degree F
    Temp,
    /// Month-to-date hundredths of an inch
    Precip,
    /// Month-to-date tenths of an inch
    Snow,
}

impl SectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKind::Temp => "temp",
            SectionKind::Precip => "precip",
            SectionKind::Snow => "snow",
        }
    }

    /// Raw units per output unit
    pub fn divisor(&self) -> f64 {
        match self {
            SectionKind::Temp => 10.0,
            SectionKind::Precip => 100.0,
            SectionKind::Snow => 10.0,
        }
    }

    /// Whether raw values are month-to-date running totals
    pub fn is_cumulative(&self) -> bool {
        matches!(self, SectionKind::Precip | SectionKind::Snow)
    }
}

/// Handling of slots at or below -1000 that are not the -9999 missing sentinel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutOfRangePolicy {
    /// Omit the slot; later days in the row shift down by one
    #[default]
    Drop,
    /// Keep the slot as a null value
    Null,
}

impl OutOfRangePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutOfRangePolicy::Drop => "drop",
            OutOfRangePolicy::Null => "null",
        }
    }
}

impl FromStr for OutOfRangePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drop" => Ok(OutOfRangePolicy::Drop),
            "null" => Ok(OutOfRangePolicy::Null),
            other => Err(format!(
                "Invalid out-of-range policy '{other}'. Valid values: drop, null"
            )),
        }
    }
}

/// One decoded day of a section
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyValue {
    #[serde(rename = "m")]
    pub month: u32,
    #[serde(rename = "d")]
    pub day: u32,
    #[serde(rename = "v")]
    pub value: Option<f64>,
}

/// Decoded daily sections keyed by section name, in decode order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailySeries {
    sections: Vec<(String, Vec<DailyValue>)>,
}

impl DailySeries {
    pub fn get(&self, section: &str) -> Option<&[DailyValue]> {
        self.sections
            .iter()
            .find(|(name, _)| name == section)
            .map(|(_, values)| values.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[DailyValue])> {
        self.sections
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

// Serialized as a JSON object that keeps section order
impl Serialize for DailySeries {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.sections.len()))?;
        for (name, values) in &self.sections {
            map.serialize_entry(name, values)?;
        }
        map.end()
    }
}

/// Find the first line starting with `marker`
pub fn locate_section(lines: &[&str], marker: &str) -> Result<usize, DecodeError> {
    lines
        .iter()
        .position(|line| line.starts_with(marker))
        .ok_or_else(|| DecodeError::SectionNotFound(marker.to_string()))
}

/// Start lines of several sections, located in a single pass over the report
#[derive(Debug, Clone)]
pub struct SectionIndex<'m> {
    starts: HashMap<&'m str, usize>,
}

impl<'m> SectionIndex<'m> {
    pub fn build(lines: &[&str], markers: &[&'m str]) -> Self {
        let mut starts = HashMap::with_capacity(markers.len());

        for (idx, line) in lines.iter().enumerate() {
            if starts.len() == markers.len() {
                break;
            }
            for &marker in markers {
                if !starts.contains_key(marker) && line.starts_with(marker) {
                    starts.insert(marker, idx);
                }
            }
        }

        Self { starts }
    }

    pub fn locate(&self, marker: &str) -> Result<usize, DecodeError> {
        self.starts
            .get(marker)
            .copied()
            .ok_or_else(|| DecodeError::SectionNotFound(marker.to_string()))
    }
}

/// Decoded content of one slot
#[derive(Debug, Clone, Copy, PartialEq)]
enum Slot {
    Value(i64),
    Missing,
    Skipped,
}

/// Parser for the daily sections of a normals report
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalsDailyParser {
    out_of_range: OutOfRangePolicy,
}

impl NormalsDailyParser {
    pub fn new(out_of_range: OutOfRangePolicy) -> Self {
        Self { out_of_range }
    }

    pub fn out_of_range(&self) -> OutOfRangePolicy {
        self.out_of_range
    }

    /// Decode all fixed daily sections of a report
    pub fn decode_daily(&self, lines: &[&str]) -> Result<DailySeries, DecodeError> {
        let markers: Vec<&str> = DAILY_SECTIONS.iter().map(|(marker, _)| *marker).collect();
        let index = SectionIndex::build(lines, &markers);

        let mut sections = Vec::with_capacity(DAILY_SECTIONS.len());
        for (marker, kind) in DAILY_SECTIONS {
            let start = index.locate(marker)?;
            let values = self.decode_section_at(lines, start, marker, kind)?;
            debug!(
                "Decoded {} {} values from {}",
                values.len(),
                kind.as_str(),
                marker
            );
            sections.push((marker.to_string(), values));
        }

        Ok(DailySeries { sections })
    }

    /// Decode one section into daily values, month by month
    pub fn decode_section(
        &self,
        lines: &[&str],
        marker: &str,
        kind: SectionKind,
    ) -> Result<Vec<DailyValue>, DecodeError> {
        let start = locate_section(lines, marker)?;
        self.decode_section_at(lines, start, marker, kind)
    }

    fn decode_section_at(
        &self,
        lines: &[&str],
        start: usize,
        marker: &str,
        kind: SectionKind,
    ) -> Result<Vec<DailyValue>, DecodeError> {
        let rows = lines
            .get(start..start + MONTH_ROWS)
            .ok_or_else(|| ParseError::TruncatedSection {
                marker: marker.to_string(),
                found: lines.len().saturating_sub(start),
            })?;

        let divisor = kind.divisor();
        let mut data = Vec::new();

        for (row_idx, line) in rows.iter().enumerate() {
            let mut raw = self.decode_row(line)?;

            // Leap day is dropped regardless of year
            if row_idx == FEBRUARY_ROW {
                raw.truncate(FEBRUARY_DAYS);
            }

            for (slot_idx, current) in raw.iter().enumerate() {
                let value = if !kind.is_cumulative() || slot_idx == 0 {
                    current.map(|v| v as f64 / divisor)
                } else {
                    match (*current, raw[slot_idx - 1]) {
                        (Some(v), Some(prev)) => Some((v - prev) as f64 / divisor),
                        _ => None,
                    }
                };

                data.push(DailyValue {
                    month: row_idx as u32 + 1,
                    day: slot_idx as u32 + 1,
                    value,
                });
            }
        }

        Ok(data)
    }

    /// Decode the raw integer slots of one section row
    ///
    /// `None` entries are missing values. Blank slots are omitted, as are
    /// out-of-range slots under [`OutOfRangePolicy::Drop`].
    pub fn decode_row(&self, line: &str) -> Result<Vec<Option<i64>>, ParseError> {
        let bytes = line.as_bytes();
        if bytes.len() <= FIRST_SLOT_OFFSET {
            return Ok(Vec::new());
        }

        let mut parsed = Vec::new();
        for (slot_idx, chunk) in bytes[FIRST_SLOT_OFFSET..].chunks(SLOT_WIDTH).enumerate() {
            let text = std::str::from_utf8(chunk).map_err(|_| {
                ParseError::InvalidFormat(format!("Non-ASCII data in slot {}", slot_idx + 1))
            })?;

            match self.decode_slot(text)? {
                Slot::Value(v) => parsed.push(Some(v)),
                Slot::Missing => parsed.push(None),
                Slot::Skipped => {}
            }
        }

        Ok(parsed)
    }

    fn decode_slot(&self, text: &str) -> Result<Slot, ParseError> {
        // Only the bare sentinel means zero; a flagged -7777 falls through as out of range
        let trimmed = text.trim();
        let trimmed = if trimmed == TRACE_SENTINEL { "0" } else { trimmed };

        let digits: String = trimmed
            .chars()
            .filter(|c| !c.is_ascii_alphabetic())
            .collect();
        let digits = digits.trim();

        if digits.is_empty() {
            return Ok(Slot::Skipped);
        }

        let value = digits
            .parse::<i64>()
            .map_err(|_| ParseError::InvalidNumber {
                field: "daily slot".to_string(),
                value: text.to_string(),
            })?;

        if value > VALID_FLOOR {
            Ok(Slot::Value(value))
        } else if value == MISSING_SENTINEL {
            Ok(Slot::Missing)
        } else {
            debug!("Out-of-range slot '{}' ({})", text.trim(), self.out_of_range.as_str());
            match self.out_of_range {
                OutOfRangePolicy::Drop => Ok(Slot::Skipped),
                OutOfRangePolicy::Null => Ok(Slot::Missing),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a section row: 20-character label then one 7-character slot per value
    fn row(label: &str, values: &[&str]) -> String {
        let mut line = format!("{label:<20}");
        for value in values {
            line.push_str(&format!("{value:>7}"));
        }
        line
    }

    /// Build a 12-row section with `first` as January and plain rows for other months
    fn section(marker: &str, first: &[&str], february: &[&str]) -> Vec<String> {
        let mut rows = vec![row(&format!("{marker} 01"), first), row(&format!("{marker} 02"), february)];
        for month in 3..=12 {
            rows.push(row(&format!("{marker} {month:02}"), &["100C", "110C"]));
        }
        rows
    }

    fn as_refs(lines: &[String]) -> Vec<&str> {
        lines.iter().map(|s| s.as_str()).collect()
    }

    #[test]
    fn test_decode_row_plain_and_flagged() {
        let parser = NormalsDailyParser::default();
        let line = row("dly-tmax-normal 01", &["354S", "156C", "  -12P", "88"]);
        assert_eq!(
            parser.decode_row(&line).unwrap(),
            vec![Some(354), Some(156), Some(-12), Some(88)]
        );
    }

    #[test]
    fn test_decode_row_trace_sentinel_is_zero() {
        let parser = NormalsDailyParser::default();
        let line = row("mtd-prcp-normal 01", &["-7777", "-7777C", "5C"]);
        assert_eq!(parser.decode_row(&line).unwrap(), vec![Some(0), Some(5)]);
    }

    #[test]
    fn test_decode_row_flagged_trace_sentinel_is_out_of_range() {
        let line = row("mtd-prcp-normal 01", &["  -7777", "-7777C", "5C"]);

        let dropped = NormalsDailyParser::new(OutOfRangePolicy::Drop);
        assert_eq!(dropped.decode_row(&line).unwrap(), vec![Some(0), Some(5)]);

        let nulled = NormalsDailyParser::new(OutOfRangePolicy::Null);
        assert_eq!(nulled.decode_row(&line).unwrap(), vec![Some(0), None, Some(5)]);
    }

    #[test]
    fn test_decode_row_missing_sentinel_is_null() {
        let parser = NormalsDailyParser::default();
        let line = row("dly-tmin-normal 01", &["12C", "-9999", "-9999S"]);
        assert_eq!(parser.decode_row(&line).unwrap(), vec![Some(12), None, None]);
    }

    #[test]
    fn test_decode_row_out_of_range_dropped_by_default() {
        let parser = NormalsDailyParser::default();
        let line = row("dly-tmin-normal 01", &["12C", "-1000", "-5555C", "-999C"]);
        assert_eq!(parser.decode_row(&line).unwrap(), vec![Some(12), Some(-999)]);
    }

    #[test]
    fn test_decode_row_out_of_range_as_null() {
        let parser = NormalsDailyParser::new(OutOfRangePolicy::Null);
        let line = row("dly-tmin-normal 01", &["12C", "-1000", "-5555C"]);
        assert_eq!(parser.decode_row(&line).unwrap(), vec![Some(12), None, None]);
    }

    #[test]
    fn test_decode_row_short_and_blank() {
        let parser = NormalsDailyParser::default();
        assert!(parser.decode_row("dly-tmax-normal").unwrap().is_empty());
        assert!(parser.decode_row(&format!("{:<20}", "dly-tmax-normal 01")).unwrap().is_empty());

        // trailing padding and a short final slot
        let line = format!("{}{:>7}{:>7}  42", format!("{:<20}", "x"), "1C", "");
        assert_eq!(parser.decode_row(&line).unwrap(), vec![Some(1), Some(42)]);
    }

    #[test]
    fn test_decode_row_invalid_number() {
        let parser = NormalsDailyParser::default();
        let line = row("dly-tmax-normal 01", &["12C", "1*2"]);
        assert!(matches!(
            parser.decode_row(&line),
            Err(ParseError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_temp_section_scales_tenths() {
        let lines = section("dly-tmax-normal", &[" 354S", "-5C", "-9999"], &["200C"]);
        let parser = NormalsDailyParser::default();

        let values = parser
            .decode_section(&as_refs(&lines), "dly-tmax-normal", SectionKind::Temp)
            .unwrap();

        assert_eq!(values[0], DailyValue { month: 1, day: 1, value: Some(35.4) });
        assert_eq!(values[1].value, Some(-0.5));
        assert_eq!(values[2], DailyValue { month: 1, day: 3, value: None });
        assert_eq!(values[3], DailyValue { month: 2, day: 1, value: Some(20.0) });
        assert_eq!(values.last().unwrap().month, 12);
    }

    #[test]
    fn test_precip_section_differences_month_to_date() {
        let lines = section("mtd-prcp-normal", &["63", "120", "120"], &["7C", "9C"]);
        let parser = NormalsDailyParser::default();

        let values = parser
            .decode_section(&as_refs(&lines), "mtd-prcp-normal", SectionKind::Precip)
            .unwrap();

        let january: Vec<Option<f64>> = values.iter().filter(|v| v.month == 1).map(|v| v.value).collect();
        assert_eq!(january, vec![Some(0.63), Some(0.57), Some(0.0)]);

        // February restarts from its own first slot
        let february: Vec<Option<f64>> = values.iter().filter(|v| v.month == 2).map(|v| v.value).collect();
        assert_eq!(february, vec![Some(0.07), Some(0.02)]);
    }

    #[test]
    fn test_snow_section_uses_tenths() {
        let lines = section("mtd-snow-normal", &["4S", "10S", "-7777"], &["1S"]);
        let parser = NormalsDailyParser::default();

        let values = parser
            .decode_section(&as_refs(&lines), "mtd-snow-normal", SectionKind::Snow)
            .unwrap();

        let january: Vec<Option<f64>> = values.iter().filter(|v| v.month == 1).map(|v| v.value).collect();
        assert_eq!(january, vec![Some(0.4), Some(0.6), Some(-1.0)]);
    }

    #[test]
    fn test_cumulative_null_neighbours() {
        let lines = section("mtd-prcp-normal", &["-9999", "20", "-9999", "40"], &["1"]);
        let parser = NormalsDailyParser::default();

        let values = parser
            .decode_section(&as_refs(&lines), "mtd-prcp-normal", SectionKind::Precip)
            .unwrap();

        let january: Vec<Option<f64>> = values.iter().filter(|v| v.month == 1).map(|v| v.value).collect();
        assert_eq!(january, vec![None, None, None, None]);
    }

    #[test]
    fn test_february_truncated_to_28_days() {
        let february: Vec<String> = (1..=29).map(|d| format!("{}C", 300 + d)).collect();
        let february: Vec<&str> = february.iter().map(|s| s.as_str()).collect();
        let lines = section("dly-tavg-normal", &["1C"], &february);
        let parser = NormalsDailyParser::default();

        let values = parser
            .decode_section(&as_refs(&lines), "dly-tavg-normal", SectionKind::Temp)
            .unwrap();

        let feb: Vec<&DailyValue> = values.iter().filter(|v| v.month == 2).collect();
        assert_eq!(feb.len(), 28);
        assert_eq!(feb.last().unwrap().day, 28);
        assert_eq!(feb.last().unwrap().value, Some(32.8));
    }

    #[test]
    fn test_section_not_found() {
        let lines = section("dly-tmax-normal", &["1C"], &["1C"]);
        let parser = NormalsDailyParser::default();

        let err = parser
            .decode_section(&as_refs(&lines), "dly-tmin-normal", SectionKind::Temp)
            .unwrap_err();
        assert!(matches!(err, DecodeError::SectionNotFound(ref m) if m == "dly-tmin-normal"));
    }

    #[test]
    fn test_truncated_section() {
        let mut lines = section("dly-tmax-normal", &["1C"], &["1C"]);
        lines.truncate(7);
        let parser = NormalsDailyParser::default();

        let err = parser
            .decode_section(&as_refs(&lines), "dly-tmax-normal", SectionKind::Temp)
            .unwrap_err();
        assert!(matches!(
            err,
            DecodeError::Parse(ParseError::TruncatedSection { found: 7, .. })
        ));
    }

    #[test]
    fn test_locate_first_match_only_at_line_start() {
        let lines = vec![
            "header",
            " dly-tmax-normal indented",
            "dly-tmax-normal 01",
            "dly-tmax-normal 02",
        ];
        assert_eq!(locate_section(&lines, "dly-tmax-normal").unwrap(), 2);
        assert!(locate_section(&lines, "dly-tmin-normal").is_err());
    }

    #[test]
    fn test_section_index_matches_linear_scan() {
        let lines = vec![
            "dly-tmax-stddev 01",
            "dly-tmax-normal 01",
            "mtd-prcp-normal 01",
            "dly-tmax-normal 01 again",
        ];
        let markers = ["dly-tmax-normal", "mtd-prcp-normal", "mtd-snow-normal"];
        let index = SectionIndex::build(&lines, &markers);

        for marker in ["dly-tmax-normal", "mtd-prcp-normal"] {
            assert_eq!(index.locate(marker).unwrap(), locate_section(&lines, marker).unwrap());
        }
        assert!(matches!(
            index.locate("mtd-snow-normal"),
            Err(DecodeError::SectionNotFound(_))
        ));
    }

    #[test]
    fn test_daily_series_serializes_in_section_order() {
        let series = DailySeries {
            sections: vec![
                ("dly-tmax-normal".to_string(), vec![DailyValue { month: 1, day: 1, value: Some(35.4) }]),
                ("mtd-prcp-normal".to_string(), vec![DailyValue { month: 1, day: 1, value: None }]),
            ],
        };

        let json = serde_json::to_string(&series).unwrap();
        assert_eq!(
            json,
            r#"{"dly-tmax-normal":[{"m":1,"d":1,"v":35.4}],"mtd-prcp-normal":[{"m":1,"d":1,"v":null}]}"#
        );
    }

    #[test]
    fn test_out_of_range_policy_from_str() {
        assert_eq!("drop".parse::<OutOfRangePolicy>().unwrap(), OutOfRangePolicy::Drop);
        assert_eq!(" NULL ".parse::<OutOfRangePolicy>().unwrap(), OutOfRangePolicy::Null);
        assert!("omit".parse::<OutOfRangePolicy>().is_err());
    }
}
