//! File-backed snapshot of the current airport's weather.
//!
//! The snapshot is a single JSON document. Writes go to a temporary file in
//! the same directory which is then renamed over the target, so a reader
//! never sees a partially written snapshot.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::CacheError;
use crate::station::StationId;
use crate::types::Airport;

const CACHE_DIR_NAME: &str = "pilot-bar";
const CACHE_FILE_NAME: &str = "currentWX.json";

#[derive(Debug, Clone)]
pub struct AirportCache {
    cache_path: PathBuf,
}

impl AirportCache {
    /// Cache at `<dir>/currentWX.json`.
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            cache_path: cache_dir.join(CACHE_FILE_NAME),
        }
    }

    /// Cache under the user's cache directory (`$XDG_CACHE_HOME/pilot-bar`).
    pub fn open_default() -> Result<Self, CacheError> {
        let dir = dirs::cache_dir()
            .ok_or(CacheError::NoCacheDir)?
            .join(CACHE_DIR_NAME);
        Ok(Self::new(&dir))
    }

    pub fn path(&self) -> &Path {
        &self.cache_path
    }

    pub fn exists(&self) -> bool {
        self.cache_path.exists()
    }

    /// Read the whole snapshot. The flight category is recomputed from the
    /// stored ceiling and visibility.
    pub fn load(&self) -> Result<Airport, CacheError> {
        let data = match fs::read_to_string(&self.cache_path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CacheError::NotFound(self.cache_path.clone()))
            }
            Err(source) => {
                return Err(CacheError::Io {
                    path: self.cache_path.clone(),
                    source,
                })
            }
        };

        let mut airport: Airport =
            serde_json::from_str(&data).map_err(|source| CacheError::Corrupt {
                path: self.cache_path.clone(),
                source,
            })?;
        // The stored category is derived; never trust it over the fields.
        airport.metar.flight_category = airport.metar.classify();
        Ok(airport)
    }

    /// Replace the snapshot atomically.
    pub fn store(&self, airport: &Airport) -> Result<(), CacheError> {
        let dir = self
            .cache_path
            .parent()
            .ok_or(CacheError::NoCacheDir)?;
        let io_err = |source| CacheError::Io {
            path: self.cache_path.clone(),
            source,
        };

        fs::create_dir_all(dir).map_err(io_err)?;

        let json = serde_json::to_string_pretty(airport).map_err(|source| CacheError::Corrupt {
            path: self.cache_path.clone(),
            source,
        })?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
        tmp.write_all(json.as_bytes()).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&self.cache_path).map_err(|e| io_err(e.error))?;

        tracing::debug!("Stored snapshot for {} at {:?}", airport.icao, self.cache_path);
        Ok(())
    }

    /// Write a never-populated snapshot for `station` if none exists yet.
    pub fn ensure_exists(&self, station: &StationId) -> Result<(), CacheError> {
        if self.exists() {
            return Ok(());
        }
        tracing::info!("Creating weather cache for {}", station);
        self.store(&Airport::reset(station.clone()))
    }

    /// Station of the cached snapshot, if there is a readable one.
    pub fn cached_station(&self) -> Option<StationId> {
        self.load().ok().map(|airport| airport.icao)
    }
}
