//! Shared fixtures for the integration tests.

pub mod harness;
pub mod market;
