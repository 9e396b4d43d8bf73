/// Shared utility functions for the normals scraper
///
/// GHCN daily station ids are 11 alphanumeric characters: a 2-letter country code,
/// a network code and an 8-character station number (e.g. `USW00014922`).
pub const GHCN_ID_LEN: usize = 11;

/// Extract an 11-character GHCN station id from a string that may contain additional text
///
/// Station lists often carry a trailing name or comment, like `USW00014922 Minneapolis`
/// or `USW00014922 // MSP airport`. The id is returned uppercased.
///
/// # Examples
///
/// ```
/// use normals_scraper::utils::extract_station_id;
///
/// assert_eq!(extract_station_id("USW00014922").unwrap(), "USW00014922");
/// assert_eq!(extract_station_id("usw00014922 Minneapolis").unwrap(), "USW00014922");
/// assert_eq!(extract_station_id("'USW00014922', // Minneapolis").unwrap(), "USW00014922");
/// ```
pub fn extract_station_id(value: &str) -> Result<String, &'static str> {
    value
        .split(|c: char| !c.is_ascii_alphanumeric())
        .find(|token| token.len() == GHCN_ID_LEN && token[..2].chars().all(|c| c.is_ascii_alphabetic()))
        .map(|token| token.to_ascii_uppercase())
        .ok_or("No valid 11-character GHCN station ID found")
}

/// Parse a station list: one id per line, blank lines and `#` comments skipped
pub fn parse_station_list(text: &str) -> Vec<Result<String, String>> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| extract_station_id(line).map_err(|e| format!("{e}: '{line}'")))
        .collect()
}
