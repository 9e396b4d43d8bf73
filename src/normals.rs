// Station normals module
//
// This module decodes NOAA 1981-2010 station normals reports.
// A report contains:
// - A five line header: station name, GHCN daily id, latitude, longitude, elevation
// - Named 12-row sections of fixed-width daily values (dly-tmax-normal, mtd-prcp-normal, ...)

pub mod daily_parser;
pub mod station_parser;

pub use daily_parser::{
    locate_section, DailySeries, DailyValue, DecodeError, NormalsDailyParser, OutOfRangePolicy,
    SectionIndex, SectionKind, DAILY_SECTIONS,
};
pub use station_parser::{ParseError, StationMetadata};
