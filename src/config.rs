use std::env;
use std::path::PathBuf;
use tracing::warn;

use crate::fetcher::DEFAULT_URL_TEMPLATE;
use crate::normals::OutOfRangePolicy;

/// Minneapolis-St Paul airport
pub const DEFAULT_STATION: &str = "USW00014922";

#[derive(Debug, Clone)]
pub struct Config {
    pub url_template: String,
    pub data_dir: PathBuf,
    pub pretty_json: bool,
    pub stations: Vec<String>,
    pub parallel: usize,
    pub out_of_range: OutOfRangePolicy,
    pub request_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            url_template: env::var("NORMALS_URL_TEMPLATE")
                .unwrap_or_else(|_| DEFAULT_URL_TEMPLATE.to_string()),
            data_dir: env::var("NORMALS_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data")),
            pretty_json: env::var("NORMALS_PRETTY_JSON")
                .map(|v| parse_bool(&v))
                .unwrap_or(false),
            stations: env::var("NORMALS_STATIONS")
                .map(|v| split_stations(&v))
                .unwrap_or_else(|_| vec![DEFAULT_STATION.to_string()]),
            parallel: env::var("NORMALS_PARALLEL")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .unwrap_or(5),
            out_of_range: env::var("NORMALS_OUT_OF_RANGE")
                .ok()
                .map(|v| {
                    v.parse().unwrap_or_else(|e| {
                        warn!("{e}, falling back to 'drop'");
                        OutOfRangePolicy::Drop
                    })
                })
                .unwrap_or_default(),
            request_timeout_secs: env::var("NORMALS_REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .unwrap_or(60),
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Split a comma separated station list, dropping empty entries
pub fn split_stations(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
