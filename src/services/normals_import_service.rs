use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info, instrument};

use crate::fetch_error::FetchError;
use crate::fetcher::NormalsFetcher;
use crate::normals::{DailySeries, DecodeError, NormalsDailyParser, StationMetadata};
use crate::output_writer::{JsonWriter, WriteError};

/// Error types for a single station's import
#[derive(Debug, thiserror::Error)]
pub enum StationError {
    #[error("Error with fetching station: {0}")]
    Fetch(#[from] FetchError),

    #[error("Decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("Write failed: {0}")]
    Write(#[from] WriteError),
}

/// Decoded content of one normals report
#[derive(Debug, Clone)]
pub struct StationNormals {
    pub metadata: StationMetadata,
    pub daily: DailySeries,
}

/// Files written for one station
#[derive(Debug, Clone)]
pub struct ImportedStation {
    pub station_id: String,
    pub station_file: PathBuf,
    pub daily_file: PathBuf,
}

/// Outcome of a multi-station run
#[derive(Debug, Default)]
pub struct ImportSummary {
    pub imported: Vec<ImportedStation>,
    pub failed: Vec<(String, StationError)>,
}

/// Service for turning NOAA normals reports into per-station JSON files
#[derive(Clone)]
pub struct NormalsImportService {
    fetcher: NormalsFetcher,
    writer: JsonWriter,
    parser: NormalsDailyParser,
}

impl NormalsImportService {
    pub fn new(fetcher: NormalsFetcher, writer: JsonWriter, parser: NormalsDailyParser) -> Self {
        Self {
            fetcher,
            writer,
            parser,
        }
    }

    /// Decode header metadata and all daily sections of a report
    pub fn decode_report(&self, text: &str) -> Result<StationNormals, DecodeError> {
        let lines: Vec<&str> = text.lines().collect();

        let metadata = StationMetadata::from_header_lines(&lines)?;
        let daily = self.parser.decode_daily(&lines)?;

        Ok(StationNormals { metadata, daily })
    }

    /// Write both output files for an already decoded report
    ///
    /// A failed daily write leaves no station file behind.
    pub async fn write_normals(
        &self,
        station_id: &str,
        normals: &StationNormals,
    ) -> Result<ImportedStation, StationError> {
        let (station_file, daily_file) = self
            .writer
            .write_station_files(station_id, &normals.metadata, &normals.daily)
            .await?;

        Ok(ImportedStation {
            station_id: station_id.to_string(),
            station_file,
            daily_file,
        })
    }

    /// Decode an already downloaded report and write both output files
    ///
    /// Nothing is written unless the whole report decodes.
    #[instrument(skip(self, text), fields(text_size = text.len()))]
    pub async fn import_report(
        &self,
        station_id: &str,
        text: &str,
    ) -> Result<ImportedStation, StationError> {
        let normals = self.decode_report(text)?;
        info!(
            "Decoded {} ({}) with {} daily sections",
            station_id,
            normals.metadata.name,
            normals.daily.len()
        );

        self.write_normals(station_id, &normals).await
    }

    /// Fetch, decode and write one station
    #[instrument(skip(self))]
    pub async fn import_station(&self, station_id: &str) -> Result<ImportedStation, StationError> {
        let text = self.fetcher.fetch_report(station_id).await?;
        self.import_report(station_id, &text).await
    }

    /// Import several stations with at most `parallel` in flight
    ///
    /// Failures are logged and collected; they never stop the other stations.
    pub async fn import_stations(
        &self,
        station_ids: Vec<String>,
        parallel: usize,
        pb: &ProgressBar,
    ) -> ImportSummary {
        let start_time = Instant::now();
        let total = station_ids.len();
        info!("Importing normals for {} stations", total);

        let mut results = stream::iter(station_ids)
            .map(move |station_id| async move {
                let result = self.import_station(&station_id).await;
                (station_id, result)
            })
            .buffer_unordered(parallel.max(1));

        let mut summary = ImportSummary::default();
        while let Some((station_id, result)) = results.next().await {
            match result {
                Ok(imported) => summary.imported.push(imported),
                Err(e) => {
                    error!("Station {} failed: {}", station_id, e);
                    summary.failed.push((station_id, e));
                }
            }
            pb.set_message(format!(
                "{} successful, {} failed",
                summary.imported.len(),
                summary.failed.len()
            ));
            pb.inc(1);
        }

        info!(
            "Imported {} of {} stations in {:.2}s",
            summary.imported.len(),
            total,
            start_time.elapsed().as_secs_f64()
        );

        summary
    }
}
