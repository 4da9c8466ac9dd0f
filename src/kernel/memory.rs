//! In-memory kernel.
//!
//! This is the reference implementation of `Kernel`. It models the parts of
//! a simulation kernel the connection exporter talks to: a synapse model
//! registry, node ownership, and a connection store split into per-thread
//! partitions.
//!
//! ## Layout
//!
//! - A connection lives in the partition of its target
//!   (`target % partitions`), like a kernel that stores synapses on the
//!   thread owning the postsynaptic node.
//! - Each partition is an `Arc<Vec<Connection>>`. Scans iterate a cloned
//!   `Arc`, so a connect call during a scan copies the partition on write
//!   instead of disturbing the iteration.
//! - A target index maps every node to the positions of its incoming
//!   connections inside its partition.
//!
//! ## Limitations
//!
//! - **Append-only**: connections cannot be removed or edited.
//! - **Single process**: remote nodes exist only as connection sources.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use parking_lot::RwLock;
use smallvec::SmallVec;

use crate::model::*;
use crate::{Error, Result};
use super::{ConnectionIter, Kernel, KernelCapabilities};

/// Synapse models every fresh kernel knows about.
pub const BUILTIN_SYNAPSE_MODELS: &[&str] = &["static_synapse", "stdp_synapse"];

// ============================================================================
// MemoryKernel
// ============================================================================

/// In-memory connection store. Cloning yields another handle to the same data.
#[derive(Clone)]
pub struct MemoryKernel {
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    models: RwLock<ModelRegistry>,
    nodes: RwLock<HashMap<NodeId, Locality>>,
    store: RwLock<ConnectionStore>,
    next_node_id: AtomicU64,
}

#[derive(Default)]
struct ModelRegistry {
    by_name: HashMap<String, SynapseModelId>,
    names: Vec<String>,
}

struct ConnectionStore {
    partitions: Vec<Arc<Vec<Connection>>>,
    /// target → positions of its incoming connections in its partition
    incoming: HashMap<NodeId, SmallVec<[usize; 8]>>,
    len: usize,
}

impl MemoryKernel {
    /// A single-partition kernel.
    pub fn new() -> Self {
        Self::with_threads(1)
    }

    /// A kernel whose connection store is split across `threads` partitions.
    pub fn with_threads(threads: usize) -> Self {
        let threads = threads.max(1);
        let mut models = ModelRegistry::default();
        for name in BUILTIN_SYNAPSE_MODELS {
            models.register(name);
        }
        Self {
            inner: Arc::new(MemoryInner {
                models: RwLock::new(models),
                nodes: RwLock::new(HashMap::new()),
                store: RwLock::new(ConnectionStore {
                    partitions: (0..threads).map(|_| Arc::new(Vec::new())).collect(),
                    incoming: HashMap::new(),
                    len: 0,
                }),
                next_node_id: AtomicU64::new(1),
            }),
        }
    }

    // ========================================================================
    // Registry
    // ========================================================================

    /// Register a synapse model, returning its key. Idempotent.
    pub fn register_synapse_model(&self, name: &str) -> Result<SynapseModelId> {
        let mut models = self.inner.models.write();
        if let Some(id) = models.by_name.get(name) {
            return Ok(*id);
        }
        if models.names.len() > usize::from(u16::MAX) {
            return Err(Error::ConstraintViolation(
                format!("synapse model registry is full, cannot add '{name}'")
            ));
        }
        Ok(models.register(name))
    }

    /// All registered synapse model names, in registration order.
    pub fn synapse_models(&self) -> Vec<String> {
        self.inner.models.read().names.clone()
    }

    // ========================================================================
    // Nodes
    // ========================================================================

    /// Create a node owned by this process.
    pub fn create_node(&self) -> NodeId {
        self.create_node_with(Locality::Local)
    }

    /// Create a node owned by another process.
    pub fn create_remote_node(&self) -> NodeId {
        self.create_node_with(Locality::Remote)
    }

    /// Create `count` local nodes with consecutive ids.
    pub fn create_nodes(&self, count: usize) -> Vec<NodeId> {
        (0..count).map(|_| self.create_node()).collect()
    }

    fn create_node_with(&self, locality: Locality) -> NodeId {
        let id = NodeId(self.inner.next_node_id.fetch_add(1, Ordering::Relaxed));
        self.inner.nodes.write().insert(id, locality);
        id
    }

    pub fn num_nodes(&self) -> usize {
        self.inner.nodes.read().len()
    }

    pub fn locality(&self, id: NodeId) -> Option<Locality> {
        self.inner.nodes.read().get(&id).copied()
    }

    // ========================================================================
    // Connections
    // ========================================================================

    /// Connect `source` to `target` with the named synapse model.
    pub fn connect(
        &self,
        source: NodeId,
        target: NodeId,
        synapse_model: &str,
        weight: f64,
        delay: f64,
    ) -> Result<()> {
        let model = self.synapse_model_id(synapse_model)?;
        self.check_endpoints(source, target)?;
        let conn = Connection::new(source, target, model)
            .with_weight(weight)
            .with_delay(delay);
        self.inner.store.write().push(conn);
        Ok(())
    }

    /// Connect every source to every target (autapses included).
    ///
    /// Returns the number of connections created.
    pub fn connect_all_to_all(
        &self,
        sources: &[NodeId],
        targets: &[NodeId],
        synapse_model: &str,
        weight: f64,
        delay: f64,
    ) -> Result<usize> {
        let model = self.synapse_model_id(synapse_model)?;
        for &target in targets {
            for &source in sources {
                self.check_endpoints(source, target)?;
            }
        }

        let mut store = self.inner.store.write();
        for &target in targets {
            for &source in sources {
                store.push(
                    Connection::new(source, target, model)
                        .with_weight(weight)
                        .with_delay(delay),
                );
            }
        }
        Ok(sources.len() * targets.len())
    }

    fn check_endpoints(&self, source: NodeId, target: NodeId) -> Result<()> {
        let nodes = self.inner.nodes.read();
        if !nodes.contains_key(&source) {
            return Err(Error::NotFound(format!("Source node {source}")));
        }
        match nodes.get(&target) {
            None => Err(Error::NotFound(format!("Target node {target}"))),
            Some(Locality::Remote) => Err(Error::ConstraintViolation(
                format!("Target node {target} is not owned by this process")
            )),
            Some(Locality::Local) => Ok(()),
        }
    }
}

impl Default for MemoryKernel {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelRegistry {
    fn register(&mut self, name: &str) -> SynapseModelId {
        let id = SynapseModelId(self.names.len() as u16);
        self.names.push(name.to_string());
        self.by_name.insert(name.to_string(), id);
        id
    }
}

impl ConnectionStore {
    fn partition_of(&self, target: NodeId) -> usize {
        (target.0 % self.partitions.len() as u64) as usize
    }

    fn push(&mut self, conn: Connection) {
        let p = self.partition_of(conn.target);
        let part = Arc::make_mut(&mut self.partitions[p]);
        self.incoming.entry(conn.target).or_default().push(part.len());
        part.push(conn);
        self.len += 1;
    }
}

// ============================================================================
// Snapshot iteration
// ============================================================================

/// Iterates a partition snapshot by position.
struct SnapshotIter {
    data: Arc<Vec<Connection>>,
    pos: usize,
}

impl Iterator for SnapshotIter {
    type Item = Result<Connection>;

    fn next(&mut self) -> Option<Self::Item> {
        let conn = self.data.get(self.pos).copied()?;
        self.pos += 1;
        Some(Ok(conn))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let rest = self.data.len().saturating_sub(self.pos);
        (rest, Some(rest))
    }
}

// ============================================================================
// Kernel impl
// ============================================================================

impl Kernel for MemoryKernel {
    fn synapse_model_id(&self, name: &str) -> Result<SynapseModelId> {
        self.inner.models.read().by_name.get(name)
            .copied()
            .ok_or_else(|| Error::LookupError(name.to_string()))
    }

    fn num_connections(&self) -> usize {
        self.inner.store.read().len
    }

    fn partition(&self, index: usize) -> Result<ConnectionIter<'_>> {
        let store = self.inner.store.read();
        let data = store.partitions.get(index).cloned().ok_or_else(|| {
            Error::ScanError(format!(
                "partition {index} out of range ({} partitions)",
                store.partitions.len()
            ))
        })?;
        Ok(Box::new(SnapshotIter { data, pos: 0 }))
    }

    fn connections_to(&self, target: NodeId, out: &mut Vec<Connection>) -> Result<()> {
        let store = self.inner.store.read();
        let Some(positions) = store.incoming.get(&target) else {
            return Ok(());
        };
        let part = &store.partitions[store.partition_of(target)];
        out.reserve(positions.len());
        for &pos in positions {
            let conn = part.get(pos).copied().ok_or_else(|| {
                Error::ScanError(format!("target index for node {target} points past partition end"))
            })?;
            out.push(conn);
        }
        Ok(())
    }

    fn local_nodes(&self) -> Result<Vec<NodeId>> {
        let mut ids: Vec<NodeId> = self.inner.nodes.read().iter()
            .filter(|(_, locality)| locality.is_local())
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    fn capabilities(&self) -> KernelCapabilities {
        KernelCapabilities {
            indexed_target_lookup: true,
            partitions: self.inner.store.read().partitions.len(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
