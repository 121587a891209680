//! External run/stop switch.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use crate::error::{GatewayError, GatewayResult};

/// Externally mutable boolean; `false` asks every worker to stop.
#[async_trait]
pub trait ShutdownSwitch: Send + Sync {
    /// Create the switch in the "on" position if it does not exist.
    async fn ensure_exists(&self) -> GatewayResult<()>;

    async fn is_on(&self) -> GatewayResult<bool>;
}

/// Switch stored as a one-line file: `1`/`true` on, `0`/`false` off.
#[derive(Debug, Clone)]
pub struct FileSwitch {
    path: PathBuf,
}

impl FileSwitch {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the switch value.
    pub async fn set(&self, on: bool) -> GatewayResult<()> {
        tokio::fs::write(&self.path, if on { "1\n" } else { "0\n" }).await?;
        Ok(())
    }
}

fn parse_switch(raw: &str) -> GatewayResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" => Ok(true),
        "0" | "false" | "off" => Ok(false),
        other => Err(GatewayError::InvalidSwitch(other.to_string())),
    }
}

#[async_trait]
impl ShutdownSwitch for FileSwitch {
    async fn ensure_exists(&self) -> GatewayResult<()> {
        if tokio::fs::try_exists(&self.path).await? {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        self.set(true).await?;
        info!(path = %self.path.display(), "Created shutdown switch (on)");
        Ok(())
    }

    async fn is_on(&self) -> GatewayResult<bool> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        parse_switch(&raw)
    }
}
