//! Query configuration.
//!
//! Tuning knobs for the scan strategy and output allocation. Everything has
//! a default, so `QueryConfig::default()` is a complete configuration.

use serde::{Deserialize, Serialize};

use crate::planner::ScanMode;
use crate::{Error, Result};

/// Default divisor for the filtered-query capacity estimate.
pub const DEFAULT_RESERVE_DIVISOR: usize = 10;

/// Default cost of one target lookup, in connections scanned.
pub const DEFAULT_SCOPED_RATIO: usize = 8;

/// Configuration applied to every query issued through a `FastConn` handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Iteration strategy when the caller does not pick one.
    pub mode: ScanMode,
    /// Filtered queries reserve `num_connections / reserve_divisor` rows up
    /// front. Unfiltered queries always reserve the full count.
    pub reserve_divisor: usize,
    /// `Auto` picks a scoped scan when `nodes * scoped_ratio < num_connections`.
    pub scoped_ratio: usize,
    /// Evaluate the predicate data-parallel. Needs the `parallel` feature;
    /// ignored with a warning otherwise.
    pub parallel: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            mode: ScanMode::Global,
            reserve_divisor: DEFAULT_RESERVE_DIVISOR,
            scoped_ratio: DEFAULT_SCOPED_RATIO,
            parallel: false,
        }
    }
}

impl QueryConfig {
    pub fn with_mode(mut self, mode: ScanMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_reserve_divisor(mut self, divisor: usize) -> Self {
        self.reserve_divisor = divisor;
        self
    }

    pub fn with_scoped_ratio(mut self, ratio: usize) -> Self {
        self.scoped_ratio = ratio;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Parse and validate a JSON configuration document.
    /// Missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.reserve_divisor == 0 {
            return Err(Error::ValidationError {
                key: "reserve_divisor".into(),
                message: "must be at least 1".into(),
            });
        }
        if self.scoped_ratio == 0 {
            return Err(Error::ValidationError {
                key: "scoped_ratio".into(),
                message: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Whether queries actually run data-parallel in this build.
    pub fn runs_parallel(&self) -> bool {
        if self.parallel && !cfg!(feature = "parallel") {
            tracing::warn!("parallel scan requested but the `parallel` feature is disabled");
            return false;
        }
        self.parallel
    }
}
