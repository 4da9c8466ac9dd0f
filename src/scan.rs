//! Scan engine: one pass over the connection collection.
//!
//! [`Scan`] is a lazy iterator of matching connections. It owns the
//! compiled predicate for the lifetime of the query and borrows the kernel.
//! Every connection is visited at most once and emitted in kernel order.
//!
//! Two sources are supported:
//!
//! ```text
//! Global         kernel.connections()  ──▶ predicate ──▶ matches
//! LocallyScoped  for node in local:
//!                  kernel.connections_to(node, buf) ──▶ predicate ──▶ matches
//! ```
//!
//! The scan has no recoverable errors. A kernel failure is yielded once as
//! `Error::ScanError` and the iterator is fused afterwards.

use crate::kernel::{scan_error, ConnectionIter, Kernel};
use crate::model::{Connection, NodeId};
use crate::planner::{ScanMode, ScanPlan};
use crate::predicate::CompiledPredicate;
use crate::Result;

/// Lazy, filtered scan over a kernel's connections.
pub struct Scan<'k, K: Kernel + ?Sized> {
    predicate: CompiledPredicate,
    source: Source<'k, K>,
    mode: ScanMode,
    visited: usize,
}

enum Source<'k, K: Kernel + ?Sized> {
    Global(ConnectionIter<'k>),
    Local {
        kernel: &'k K,
        nodes: std::vec::IntoIter<NodeId>,
        // Reused across sub-queries to keep its allocation.
        buffer: Vec<Connection>,
        pos: usize,
    },
    Done,
}

impl<'k, K: Kernel + ?Sized> Scan<'k, K> {
    /// Start a scan executing `plan`.
    pub fn new(kernel: &'k K, predicate: CompiledPredicate, plan: ScanPlan) -> Result<Self> {
        match plan {
            ScanPlan::Global => Self::global(kernel, predicate),
            ScanPlan::LocallyScoped(nodes) => Ok(Self::locally_scoped(kernel, predicate, nodes)),
        }
    }

    /// Scan the entire collection once.
    pub fn global(kernel: &'k K, predicate: CompiledPredicate) -> Result<Self> {
        let iter = kernel.connections().map_err(scan_error)?;
        Ok(Self {
            predicate,
            source: Source::Global(iter),
            mode: ScanMode::Global,
            visited: 0,
        })
    }

    /// Scan only connections ending at `nodes`, one kernel lookup per node.
    pub fn locally_scoped(kernel: &'k K, predicate: CompiledPredicate, nodes: Vec<NodeId>) -> Self {
        Self {
            predicate,
            source: Source::Local {
                kernel,
                nodes: nodes.into_iter(),
                buffer: Vec::new(),
                pos: 0,
            },
            mode: ScanMode::LocallyScoped,
            visited: 0,
        }
    }

    pub fn predicate(&self) -> &CompiledPredicate {
        &self.predicate
    }

    /// The resolved mode (never `Auto`).
    pub fn mode(&self) -> ScanMode {
        self.mode
    }

    /// Connections examined so far, matching or not.
    pub fn visited(&self) -> usize {
        self.visited
    }
}

impl<'k, K: Kernel + ?Sized> Iterator for Scan<'k, K> {
    type Item = Result<Connection>;

    fn next(&mut self) -> Option<Self::Item> {
        let Self { predicate, source, visited, .. } = self;
        loop {
            let next = match source {
                Source::Done => return None,
                Source::Global(iter) => iter.next(),
                Source::Local { kernel, nodes, buffer, pos } => {
                    if let Some(conn) = buffer.get(*pos) {
                        *pos += 1;
                        Some(Ok(*conn))
                    } else {
                        let Some(node) = nodes.next() else {
                            *source = Source::Done;
                            return None;
                        };
                        buffer.clear();
                        *pos = 0;
                        match kernel.connections_to(node, buffer) {
                            Ok(()) => {
                                tracing::trace!(%node, incoming = buffer.len(), "target lookup");
                                continue;
                            }
                            Err(e) => Some(Err(e)),
                        }
                    }
                }
            };

            match next {
                None => {
                    *source = Source::Done;
                    return None;
                }
                Some(Ok(conn)) => {
                    *visited += 1;
                    if predicate.matches(&conn) {
                        return Some(Ok(conn));
                    }
                }
                Some(Err(e)) => {
                    *source = Source::Done;
                    return Some(Err(scan_error(e)));
                }
            }
        }
    }
}

impl<'k, K: Kernel + ?Sized> std::iter::FusedIterator for Scan<'k, K> {}

// ============================================================================
// Parallel filtering
// ============================================================================

/// Matches of one unit of parallel work, with the number of connections it examined.
#[cfg(feature = "parallel")]
pub(crate) struct Chunk {
    pub visited: usize,
    pub matches: Vec<Connection>,
}

/// Evaluate the predicate data-parallel, one unit per kernel partition
/// (global) or per local node (scoped).
///
/// Chunks come back in unit order, so appending them sequentially yields
/// the same output as the sequential [`Scan`].
#[cfg(feature = "parallel")]
pub(crate) fn par_filter<K: Kernel + ?Sized>(
    kernel: &K,
    predicate: &CompiledPredicate,
    plan: &ScanPlan,
) -> Result<Vec<Chunk>> {
    use rayon::prelude::*;

    match plan {
        ScanPlan::Global => (0..kernel.num_partitions())
            .into_par_iter()
            .map(|p| {
                let mut chunk = Chunk { visited: 0, matches: Vec::new() };
                for conn in kernel.partition(p).map_err(scan_error)? {
                    let conn = conn.map_err(scan_error)?;
                    chunk.visited += 1;
                    if predicate.matches(&conn) {
                        chunk.matches.push(conn);
                    }
                }
                Ok(chunk)
            })
            .collect(),
        ScanPlan::LocallyScoped(nodes) => nodes
            .par_iter()
            .map(|&node| {
                let mut buffer = Vec::new();
                kernel.connections_to(node, &mut buffer).map_err(scan_error)?;
                let visited = buffer.len();
                buffer.retain(|c| predicate.matches(c));
                Ok(Chunk { visited, matches: buffer })
            })
            .collect(),
    }
}

// ============================================================================
// Tests
// ============================================================================
