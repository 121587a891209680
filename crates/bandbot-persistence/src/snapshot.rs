//! Whole-record state snapshot.
//!
//! Written once per cycle by the orchestration loop, read once at bootstrap.
//! Saves go to a sibling temp file which is fsynced and renamed over the
//! target, so a crash leaves either the old or the new record, never a torn
//! one.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{PersistenceError, PersistenceResult};

/// All adaptive state needed to resume after a restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub long_down: f64,
    pub long_up: f64,
    pub short_down: f64,
    pub short_up: f64,
    pub long_open_count: u32,
    pub short_open_count: u32,
    pub u_p_1: u32,
    pub u_p_2: u32,
    pub u_p_3: u32,
    pub u_p_4: u32,
    pub d_p_1: u32,
    pub d_p_2: u32,
    pub d_p_3: u32,
    pub d_p_4: u32,
    pub order_size_units: u32,
    pub cumulative_loss: Decimal,
    pub cumulative_profit: Decimal,
    /// Absent in records written before the cap was persisted.
    #[serde(default)]
    pub position_value_cap: Option<Decimal>,
    /// Trading day the state belongs to.
    #[serde(default)]
    pub trading_day: Option<NaiveDate>,
}

/// Result of reading the snapshot file.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Loaded(StateSnapshot),
    NotFound,
    Malformed(String),
}

/// File-backed snapshot store.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PersistenceResult<PathBuf> {
        let name = self
            .path
            .file_name()
            .ok_or_else(|| PersistenceError::InvalidPath(self.path.display().to_string()))?;
        let mut tmp = name.to_os_string();
        tmp.push(".tmp");
        Ok(self.path.with_file_name(tmp))
    }

    /// Read the snapshot.
    ///
    /// Missing file and unparseable content are outcomes, not errors; only
    /// I/O failures other than not-found are returned as `Err`.
    pub fn load(&self) -> PersistenceResult<LoadOutcome> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(LoadOutcome::NotFound),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_slice::<StateSnapshot>(&bytes) {
            Ok(snapshot) => Ok(LoadOutcome::Loaded(snapshot)),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Malformed state snapshot");
                Ok(LoadOutcome::Malformed(e.to_string()))
            }
        }
    }

    /// Atomically replace the snapshot.
    pub fn save(&self, snapshot: &StateSnapshot) -> PersistenceResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let bytes = serde_json::to_vec_pretty(snapshot)?;
        let tmp = self.temp_path()?;
        {
            let mut file = File::create(&tmp)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;

        debug!(path = %self.path.display(), bytes = bytes.len(), "State snapshot saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn sample() -> StateSnapshot {
        StateSnapshot {
            long_down: 0.0017,
            long_up: 0.0052,
            short_down: 0.0015,
            short_up: 0.0063,
            long_open_count: 4,
            short_open_count: 1,
            u_p_1: 3,
            u_p_2: 0,
            u_p_3: 0,
            u_p_4: 0,
            d_p_1: 1,
            d_p_2: 0,
            d_p_3: 0,
            d_p_4: 2,
            order_size_units: 2,
            cumulative_loss: dec!(-3.25),
            cumulative_profit: dec!(7.1),
            position_value_cap: Some(dec!(175)),
            trading_day: NaiveDate::from_ymd_opt(2026, 3, 14),
        }
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path().join("state.json"));
        assert_eq!(store.load().unwrap(), LoadOutcome::NotFound);
    }

    #[test]
    fn test_save_then_load_is_byte_identical() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path().join("state.json"));

        store.save(&sample()).unwrap();
        let first = fs::read(store.path()).unwrap();

        let loaded = match store.load().unwrap() {
            LoadOutcome::Loaded(s) => s,
            other => panic!("unexpected outcome: {other:?}"),
        };
        assert_eq!(loaded, sample());

        store.save(&loaded).unwrap();
        let second = fs::read(store.path()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, b"{\"long_down\": 0.1,").unwrap();

        let store = SnapshotStore::new(&path);
        assert!(matches!(store.load().unwrap(), LoadOutcome::Malformed(_)));
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path().join("nested").join("state.json"));
        store.save(&sample()).unwrap();
        store.save(&sample()).unwrap();

        let names: Vec<_> = fs::read_dir(dir.path().join("nested"))
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("state.json")]);
    }

    #[test]
    fn test_older_record_without_optional_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        let mut value = serde_json::to_value(sample()).unwrap();
        let obj = value.as_object_mut().unwrap();
        obj.remove("position_value_cap");
        obj.remove("trading_day");
        fs::write(&path, serde_json::to_vec(&value).unwrap()).unwrap();

        match SnapshotStore::new(&path).load().unwrap() {
            LoadOutcome::Loaded(s) => {
                assert_eq!(s.position_value_cap, None);
                assert_eq!(s.trading_day, None);
                assert_eq!(s.long_open_count, 4);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
