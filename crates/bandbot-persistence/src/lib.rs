//! State snapshots and JSON Lines records.
//!
//! - `SnapshotStore`: one whole-record state file, replaced atomically
//! - `JsonLinesWriter`: append-only daily files for cycle records and events
//! - `DailyCloseArchive`: one line per closed trading day
//! - `read_records`: reads the daily files back for model retraining

pub mod archive;
pub mod error;
pub mod reader;
pub mod records;
pub mod snapshot;
pub mod writer;

pub use archive::DailyCloseArchive;
pub use error::{PersistenceError, PersistenceResult};
pub use reader::read_records;
pub use records::{CycleRecord, DailyCloseRecord, EventRecord, EventStatus};
pub use snapshot::{LoadOutcome, SnapshotStore, StateSnapshot};
pub use writer::JsonLinesWriter;
