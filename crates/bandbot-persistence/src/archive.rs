//! Append-only archive of daily reference closes.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::PersistenceResult;
use crate::records::DailyCloseRecord;

/// One JSON line per archived trading day.
#[derive(Debug, Clone)]
pub struct DailyCloseArchive {
    path: PathBuf,
}

impl DailyCloseArchive {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a record. A day that is already archived is not written again.
    ///
    /// Returns `true` if the record was written.
    pub fn append(&self, record: &DailyCloseRecord) -> PersistenceResult<bool> {
        if self.last()?.is_some_and(|last| last.day >= record.day) {
            warn!(day = %record.day, "Daily close already archived, skipping");
            return Ok(false);
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", serde_json::to_string(record)?)?;
        file.sync_all()?;

        info!(
            day = %record.day,
            instrument = %record.instrument,
            reference_close = %record.reference_close,
            "Archived daily close"
        );
        Ok(true)
    }

    /// Most recent parseable record, if any.
    pub fn last(&self) -> PersistenceResult<Option<DailyCloseRecord>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Ok(content
            .lines()
            .rev()
            .filter(|l| !l.trim().is_empty())
            .find_map(|l| serde_json::from_str(l).ok()))
    }
}
