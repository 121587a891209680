//! Strategy configuration.

use serde::{Deserialize, Serialize};

use crate::band::BandLimits;
use crate::counters::{default_long_bins, default_short_bins, BinEdges};
use crate::error::{StrategyError, StrategyResult};

/// Configuration for bands, counters and entry signals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Band defaults and rails.
    #[serde(default)]
    pub band: BandLimits,
    /// Up bins on the daily change, `(low, high]`.
    #[serde(default = "default_long_bins")]
    pub long_bins: [BinEdges; 4],
    /// Down bins on the daily change, `(low, high]`.
    #[serde(default = "default_short_bins")]
    pub short_bins: [BinEdges; 4],
    /// Long opens allowed since the last reset.
    #[serde(default = "default_open_limit")]
    pub long_open_limit: u32,
    /// Short opens allowed since the last reset.
    #[serde(default = "default_open_limit")]
    pub short_open_limit: u32,
}

fn default_open_limit() -> u32 {
    10
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            band: BandLimits::default(),
            long_bins: default_long_bins(),
            short_bins: default_short_bins(),
            long_open_limit: default_open_limit(),
            short_open_limit: default_open_limit(),
        }
    }
}

impl StrategyConfig {
    /// Validate configuration values.
    ///
    /// Bins must be non-empty and pairwise disjoint within each bank so a
    /// single daily change can move at most one counter per bank.
    pub fn validate(&self) -> StrategyResult<()> {
        self.band.validate().map_err(StrategyError::InvalidConfig)?;

        for (name, bins) in [("long_bins", &self.long_bins), ("short_bins", &self.short_bins)] {
            for (i, bin) in bins.iter().enumerate() {
                if bin.low >= bin.high {
                    return Err(StrategyError::InvalidConfig(format!(
                        "{name}[{i}] is empty: ({}, {}]",
                        bin.low, bin.high
                    )));
                }
            }
            for (i, a) in bins.iter().enumerate() {
                for b in bins.iter().skip(i + 1) {
                    if a.low < b.high && b.low < a.high {
                        return Err(StrategyError::InvalidConfig(format!(
                            "{name} overlap: ({}, {}] and ({}, {}]",
                            a.low, a.high, b.low, b.high
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}
