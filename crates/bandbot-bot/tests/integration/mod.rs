//! Integration tests for the bandbot loop.
//!
//! These tests drive the orchestration loop against the paper exchange:
//! - one cycle at a time through `Engine::run_cycle_on`
//! - day rollover and restart from the persisted snapshot
//! - the full application with its side workers

pub mod common;
