use std::time::Duration;
use tracing::{debug, instrument};

use crate::fetch_error::FetchError;

/// Placeholder replaced by the station id in report URL templates
pub const STATION_PLACEHOLDER: &str = "{station}";

/// NOAA 1981-2010 station normals product
pub const DEFAULT_URL_TEMPLATE: &str =
    "https://www.ncei.noaa.gov/pub/data/normals/1981-2010/products/station/{station}.normals.txt";

#[derive(Clone)]
pub struct NormalsFetcher {
    client: reqwest::Client,
    url_template: String,
}

impl NormalsFetcher {
    pub fn new(url_template: String) -> Self {
        Self::with_timeout(url_template, Duration::from_secs(60))
    }

    pub fn with_timeout(url_template: String, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            url_template,
        }
    }

    /// Report URL for a station, e.g. `.../USW00014922.normals.txt`
    pub fn station_url(&self, station_id: &str) -> String {
        self.url_template.replace(STATION_PLACEHOLDER, station_id)
    }

    /// Download the plaintext normals report for one station
    #[instrument(skip(self))]
    pub async fn fetch_report(&self, station_id: &str) -> Result<String, FetchError> {
        let url = self.station_url(station_id);

        debug!("Sending HTTP request for normals report: {url}");
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        debug!("Received HTTP response with status: {status}");

        if status.is_success() {
            let text = response.text().await?;
            debug!("Retrieved report for {station_id}, size: {} bytes", text.len());
            Ok(text)
        } else if status.as_u16() == 404 {
            Err(FetchError::NotFound(url))
        } else if status.is_server_error() {
            Err(FetchError::ServerError(format!(
                "Server error {status} while fetching {url}"
            )))
        } else {
            Err(FetchError::UnexpectedStatus(format!(
                "{status} while fetching {url}"
            )))
        }
    }
}

impl Default for NormalsFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_URL_TEMPLATE.to_string())
    }
}
