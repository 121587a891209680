//! JSON Lines file writer for cycle records and events.
//!
//! One file per UTC day, `<prefix>_<YYYY-MM-DD>.jsonl`, opened in append
//! mode. Each line is a complete JSON object, so an interrupted write only
//! costs the last line.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::PersistenceResult;

/// Active writer state for the current day's file.
struct ActiveWriter {
    writer: BufWriter<File>,
    day: NaiveDate,
    records_written: usize,
}

/// Buffered, day-rotating JSON Lines writer.
pub struct JsonLinesWriter<T: Serialize> {
    base_dir: PathBuf,
    prefix: String,
    buffer: Vec<T>,
    max_buffer_size: usize,
    active_writer: Option<ActiveWriter>,
    _record: PhantomData<fn(T)>,
}

impl<T: Serialize> JsonLinesWriter<T> {
    pub fn new(base_dir: impl Into<PathBuf>, prefix: impl Into<String>, max_buffer_size: usize) -> Self {
        let base_dir = base_dir.into();
        if let Err(e) = std::fs::create_dir_all(&base_dir) {
            warn!(?e, dir = %base_dir.display(), "Failed to create record directory");
        }

        let max_buffer_size = max_buffer_size.max(1);
        Self {
            base_dir,
            prefix: prefix.into(),
            buffer: Vec::with_capacity(max_buffer_size),
            max_buffer_size,
            active_writer: None,
            _record: PhantomData,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Path of the file holding records for `day`.
    pub fn file_for(&self, day: NaiveDate) -> PathBuf {
        self.base_dir
            .join(format!("{}_{}.jsonl", self.prefix, day.format("%Y-%m-%d")))
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Buffer a record, flushing when the buffer is full.
    pub fn add_record(&mut self, record: T) -> PersistenceResult<()> {
        self.buffer.push(record);
        if self.buffer.len() >= self.max_buffer_size {
            self.flush()?;
        }
        Ok(())
    }

    fn close_active_writer(&mut self) {
        if let Some(mut active) = self.active_writer.take() {
            if let Err(e) = active.writer.flush() {
                warn!(?e, "Failed to flush writer on close");
            }
            info!(
                prefix = %self.prefix,
                day = %active.day,
                records = active.records_written,
                "Closed JSON Lines writer"
            );
        }
    }

    fn open_writer(&mut self, day: NaiveDate) -> PersistenceResult<&mut ActiveWriter> {
        let active = match self.active_writer.take() {
            Some(current) if current.day == day => current,
            stale => {
                if stale.is_some() {
                    self.active_writer = stale;
                    self.close_active_writer();
                }
                let path = self.file_for(day);
                info!(path = %path.display(), "Opening JSON Lines writer (append mode)");
                let file = OpenOptions::new().create(true).append(true).open(&path)?;
                ActiveWriter {
                    writer: BufWriter::new(file),
                    day,
                    records_written: 0,
                }
            }
        };
        Ok(self.active_writer.insert(active))
    }

    /// Write buffered records to today's file.
    pub fn flush(&mut self) -> PersistenceResult<()> {
        self.flush_for(Utc::now().date_naive())
    }

    /// Write buffered records to the file for `day`, rotating if needed.
    ///
    /// On error the buffer is kept so the caller can retry.
    pub fn flush_for(&mut self, day: NaiveDate) -> PersistenceResult<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let mut lines = String::new();
        for record in &self.buffer {
            lines.push_str(&serde_json::to_string(record)?);
            lines.push('\n');
        }

        let count = self.buffer.len();
        let active = self.open_writer(day)?;
        active.writer.write_all(lines.as_bytes())?;
        active.writer.flush()?;
        active.records_written += count;

        debug!(prefix = %self.prefix, day = %day, records = count, "Flushed JSON Lines");
        self.buffer.clear();
        Ok(())
    }

    /// Flush pending records and close the file.
    pub fn close(&mut self) -> PersistenceResult<()> {
        self.flush()?;
        self.close_active_writer();
        Ok(())
    }
}

impl<T: Serialize> Drop for JsonLinesWriter<T> {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!(?e, prefix = %self.prefix, "Failed to flush buffer on drop");
        }
        self.close_active_writer();
    }
}
