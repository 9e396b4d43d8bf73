/// JSON output for decoded station normals
///
/// Each station produces two files in the data directory:
/// - `<station>-station.json`: header metadata
/// - `<station>-daily.json`: daily series keyed by section name
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::normals::{DailySeries, StationMetadata};

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize JSON: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct JsonWriter {
    data_dir: PathBuf,
    pretty: bool,
}

impl JsonWriter {
    pub fn new(data_dir: impl Into<PathBuf>, pretty: bool) -> Self {
        Self {
            data_dir: data_dir.into(),
            pretty,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn station_path(&self, station_id: &str) -> PathBuf {
        self.data_dir.join(format!("{station_id}-station.json"))
    }

    pub fn daily_path(&self, station_id: &str) -> PathBuf {
        self.data_dir.join(format!("{station_id}-daily.json"))
    }

    pub async fn write_station(
        &self,
        station_id: &str,
        metadata: &StationMetadata,
    ) -> Result<PathBuf, WriteError> {
        let path = self.station_path(station_id);
        self.write_json(&path, &self.to_json(metadata)?).await?;
        Ok(path)
    }

    pub async fn write_daily(
        &self,
        station_id: &str,
        daily: &DailySeries,
    ) -> Result<PathBuf, WriteError> {
        let path = self.daily_path(station_id);
        self.write_json(&path, &self.to_json(daily)?).await?;
        Ok(path)
    }

    /// Write both station files, or neither
    ///
    /// Both documents are serialized before anything touches the disk. If the
    /// daily file cannot be written, the station file just written is removed.
    pub async fn write_station_files(
        &self,
        station_id: &str,
        metadata: &StationMetadata,
        daily: &DailySeries,
    ) -> Result<(PathBuf, PathBuf), WriteError> {
        let station_content = self.to_json(metadata)?;
        let daily_content = self.to_json(daily)?;

        let station_path = self.station_path(station_id);
        let daily_path = self.daily_path(station_id);

        self.write_json(&station_path, &station_content).await?;
        if let Err(e) = self.write_json(&daily_path, &daily_content).await {
            if let Err(remove_err) = tokio::fs::remove_file(&station_path).await {
                warn!(
                    "Failed to remove {} after daily write error: {}",
                    station_path.display(),
                    remove_err
                );
            }
            return Err(e);
        }

        Ok((station_path, daily_path))
    }

    fn to_json<T: Serialize + ?Sized>(&self, data: &T) -> Result<String, WriteError> {
        let content = if self.pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        Ok(content)
    }

    async fn write_json(&self, path: &Path, content: &str) -> Result<(), WriteError> {
        tokio::fs::create_dir_all(&self.data_dir)
            .await
            .map_err(|source| WriteError::Io {
                path: self.data_dir.clone(),
                source,
            })?;

        tokio::fs::write(path, content.as_bytes())
            .await
            .map_err(|source| WriteError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        debug!("Wrote {} bytes to {}", content.len(), path.display());
        info!("Data saved to: {}", path.display());
        Ok(())
    }
}
