//! Reads JSON Lines files written by [`crate::JsonLinesWriter`].

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::PersistenceResult;

/// Read every `<prefix>_*.jsonl` file under `dir`, oldest day first.
///
/// Lines that fail to parse are skipped with a warning; a missing directory
/// yields no records.
pub fn read_records<T: DeserializeOwned>(dir: &Path, prefix: &str) -> PersistenceResult<Vec<T>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let file_prefix = format!("{prefix}_");
    let mut paths: Vec<_> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(&file_prefix) && n.ends_with(".jsonl"))
        })
        .collect();
    // Date-stamped names sort chronologically.
    paths.sort();

    let mut records = Vec::new();
    let mut skipped = 0usize;
    for path in &paths {
        let reader = BufReader::new(File::open(path)?);
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<T>(&line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    skipped += 1;
                    warn!(
                        path = %path.display(),
                        line = line_no + 1,
                        error = %e,
                        "Skipping malformed record"
                    );
                }
            }
        }
    }

    debug!(
        prefix,
        files = paths.len(),
        records = records.len(),
        skipped,
        "Read JSON Lines records"
    );
    Ok(records)
}
