//! # fastconn: Filtered Columnar Connection Export
//!
//! Pulls a filtered view of a simulation kernel's connection table out as
//! four index-aligned columns: `source`, `target`, `weight`, `delay`.
//!
//! ## Pipeline
//!
//! ```text
//! FilterSpec ──compile──▶ CompiledPredicate ──plan──▶ ScanPlan
//!                                                        │
//!                     ConnectionColumns ◀──ColumnWriter◀─ Scan (one pass)
//! ```
//!
//! 1. **Predicate builder**: resolves the synapse model name once, turns id
//!    lists into hash sets, keeps bounds as tagged optionals.
//! 2. **Scan engine**: walks the collection exactly once, either globally
//!    or one target lookup per locally owned node.
//! 3. **Column writer**: appends matches into pre-reserved columns and
//!    trims them at the end.
//!
//! ## Quick Start
//!
//! ```rust
//! use fastconn::{FastConn, FilterSpec};
//!
//! # fn example() -> fastconn::Result<()> {
//! let conn = FastConn::open_memory();
//! let nodes = conn.kernel().create_nodes(3);
//! conn.kernel().connect_all_to_all(&nodes, &nodes, "stdp_synapse", 1.0, 1.5)?;
//!
//! let filter = FilterSpec::new()
//!     .with_sources([nodes[0]])
//!     .with_type_name("stdp_synapse");
//! let columns = conn.query(&filter)?;
//! assert_eq!(columns.len(), 3);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! ## Kernels
//!
//! | Kernel | Description |
//! |--------|-------------|
//! | `MemoryKernel` | In-memory connection store for testing/embedding |
//! | your binding | Implement [`Kernel`] over the real simulator |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod kernel;
pub mod predicate;
pub mod planner;
pub mod scan;
pub mod columns;
pub mod execution;
pub mod marshal;
pub mod config;

// ============================================================================
// Re-exports
// ============================================================================

pub use model::{
    Connection, NodeId, SynapseModelId, Locality, Value, PropertyMap,
};
pub use kernel::{Kernel, KernelCapabilities, MemoryKernel, ConnectionIter};
pub use predicate::{FilterSpec, CompiledPredicate, IdFilter, ModelFilter, Interval};
pub use planner::{ScanMode, ScanPlan};
pub use scan::Scan;
pub use columns::{ColumnWriter, ConnectionColumns};
pub use execution::{QueryResult, ExecutionStats};
pub use config::QueryConfig;

// ============================================================================
// Top-level handle
// ============================================================================

/// The primary entry point. A `FastConn` wraps a kernel and answers
/// connection queries against it.
///
/// Queries are synchronous and run to completion on the calling thread
/// (unless the `parallel` feature is enabled and configured). The kernel
/// must not be mutated while a query runs.
pub struct FastConn<K: Kernel> {
    kernel: K,
    config: QueryConfig,
}

impl<K: Kernel> FastConn<K> {
    /// Wrap a kernel with the default configuration.
    pub fn with_kernel(kernel: K) -> Self {
        Self { kernel, config: QueryConfig::default() }
    }

    /// Wrap a kernel with a validated configuration.
    pub fn with_config(kernel: K, config: QueryConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { kernel, config })
    }

    /// Query with the configured scan mode.
    pub fn query(&self, filter: &FilterSpec) -> Result<ConnectionColumns> {
        self.query_with_mode(filter, self.config.mode)
    }

    /// Query with an explicit scan mode.
    pub fn query_with_mode(&self, filter: &FilterSpec, mode: ScanMode) -> Result<ConnectionColumns> {
        Ok(self.execute(filter, mode)?.columns)
    }

    /// Query and also return execution statistics.
    pub fn execute(&self, filter: &FilterSpec, mode: ScanMode) -> Result<QueryResult> {
        // Phase 1: Compile (validation + model lookup, before any scan)
        let predicate = CompiledPredicate::compile(filter, &self.kernel)?;

        // Phase 2: Plan
        let plan = planner::plan(&self.kernel, &predicate, mode, &self.config)?;

        // Phase 3: Scan + write
        execution::execute(&self.kernel, predicate, plan, &self.config)
    }

    /// Key-value entry point: filter map in, result map out.
    ///
    /// Accepts the keys documented in [`marshal`], including an optional
    /// `scan_mode`. The result has exactly `source`, `target`, `weight` and
    /// `delay`.
    pub fn get_connections(&self, params: &PropertyMap) -> Result<PropertyMap> {
        let filter = FilterSpec::try_from(params)?;
        let mode = marshal::scan_mode(params)?.unwrap_or(self.config.mode);
        self.query_with_mode(&filter, mode)?.into_property_map()
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Access the underlying kernel.
    pub fn kernel(&self) -> &K {
        &self.kernel
    }
}

/// In-memory kernel for testing and embedding.
impl FastConn<MemoryKernel> {
    pub fn open_memory() -> Self {
        Self::with_kernel(MemoryKernel::new())
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid parameter '{key}': {message}")]
    ValidationError { key: String, message: String },

    #[error("Unknown synapse model: {0}")]
    LookupError(String),

    #[error("Connection scan failed: {0}")]
    ScanError(String),

    #[error("Type error: expected {expected}, got {got}")]
    TypeError { expected: String, got: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "arrow-results")]
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}

pub type Result<T> = std::result::Result<T, Error>;
