//! # Kernel Adapter Trait
//!
//! This is THE contract between fastconn and the simulation kernel that
//! owns the connections. Everything the scan needs from the outside world
//! goes through here, so the engine can run against a real kernel binding
//! or a synthetic in-memory collection alike.
//!
//! ## Implementations
//!
//! | Kernel | Module | Description |
//! |--------|--------|-------------|
//! | `MemoryKernel` | `memory` | In-memory connection store for testing/embedding |
//!
//! ## Preconditions
//!
//! The connection collection and the synapse model registry are shared,
//! read-only resources for the duration of a query. Implementations must not
//! allow connection edits while a scan is running; the engine does not guard
//! against it.

pub mod memory;

use crate::model::*;
use crate::{Error, Result};

pub use memory::MemoryKernel;

/// Lazily produced connections. Each item is fallible so that a kernel can
/// report a broken iteration in the middle of a scan.
pub type ConnectionIter<'a> = Box<dyn Iterator<Item = Result<Connection>> + 'a>;

// ============================================================================
// Kernel capabilities
// ============================================================================

/// What a kernel can do. The planner picks a scan strategy from this.
///
/// All fields default to false / 1. Kernels override via `capabilities()`.
#[derive(Debug, Clone)]
pub struct KernelCapabilities {
    /// `connections_to` is served by an index instead of a full scan.
    pub indexed_target_lookup: bool,
    /// Number of independent connection partitions (kernel threads).
    pub partitions: usize,
}

impl Default for KernelCapabilities {
    fn default() -> Self {
        Self {
            indexed_target_lookup: false,
            partitions: 1,
        }
    }
}

// ============================================================================
// Kernel Trait
// ============================================================================

/// The read-only kernel surface consumed by the connection exporter.
///
/// Only `synapse_model_id`, `num_connections`, `partition` and `local_nodes`
/// are required; the rest have defaults expressed in terms of those.
pub trait Kernel: Send + Sync {
    // ========================================================================
    // Synapse model registry
    // ========================================================================

    /// Resolve a synapse model name to its registry key.
    ///
    /// Unknown names must fail with `Error::LookupError`.
    fn synapse_model_id(&self, name: &str) -> Result<SynapseModelId>;

    // ========================================================================
    // Connection collection
    // ========================================================================

    /// Total number of connections held by this process.
    fn num_connections(&self) -> usize;

    /// Number of partitions the collection is stored in.
    fn num_partitions(&self) -> usize {
        self.capabilities().partitions.max(1)
    }

    /// Iterate the connections of one partition.
    fn partition(&self, index: usize) -> Result<ConnectionIter<'_>>;

    /// Iterate every connection, partition by partition.
    fn connections(&self) -> Result<ConnectionIter<'_>> {
        Ok(Box::new(PartitionChain::new(self)))
    }

    /// Append every connection ending at `target` to `out`.
    ///
    /// Default: full scan of `connections()`. Kernels with a target index
    /// should override this and advertise `indexed_target_lookup`.
    fn connections_to(&self, target: NodeId, out: &mut Vec<Connection>) -> Result<()> {
        for conn in self.connections()? {
            let conn = conn?;
            if conn.target == target {
                out.push(conn);
            }
        }
        Ok(())
    }

    // ========================================================================
    // Node ownership
    // ========================================================================

    /// Nodes whose incoming connections are stored in this process.
    ///
    /// Order and duplicates are not significant; the planner sorts and
    /// deduplicates before issuing target lookups.
    fn local_nodes(&self) -> Result<Vec<NodeId>>;

    // ========================================================================
    // Capability negotiation
    // ========================================================================

    fn capabilities(&self) -> KernelCapabilities {
        KernelCapabilities::default()
    }
}

// ============================================================================
// Partition chaining
// ============================================================================

/// Walks partitions `0..num_partitions()` in order, opening each lazily.
struct PartitionChain<'a, K: Kernel + ?Sized> {
    kernel: &'a K,
    next: usize,
    total: usize,
    current: Option<ConnectionIter<'a>>,
}

impl<'a, K: Kernel + ?Sized> PartitionChain<'a, K> {
    fn new(kernel: &'a K) -> Self {
        Self {
            kernel,
            next: 0,
            total: kernel.num_partitions(),
            current: None,
        }
    }
}

impl<'a, K: Kernel + ?Sized> Iterator for PartitionChain<'a, K> {
    type Item = Result<Connection>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.current.as_mut().and_then(Iterator::next) {
                return Some(item);
            }
            if self.next >= self.total {
                return None;
            }
            let index = self.next;
            self.next += 1;
            match self.kernel.partition(index) {
                Ok(iter) => self.current = Some(iter),
                Err(e) => {
                    // Stop after the first failure; the scan is fatal anyway.
                    self.next = self.total;
                    self.current = None;
                    return Some(Err(scan_error(e)));
                }
            }
        }
    }
}

/// Normalize a kernel failure during iteration into `Error::ScanError`.
pub(crate) fn scan_error(e: Error) -> Error {
    match e {
        Error::ScanError(_) => e,
        other => Error::ScanError(other.to_string()),
    }
}

// ============================================================================
// Tests
// ============================================================================
