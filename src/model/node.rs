//! Node identity as seen by the connection API.

use serde::{Deserialize, Serialize};

/// Process-local node handle (a kernel "gid").
///
/// Identities are not guaranteed to be contiguous or sorted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for NodeId {
    fn from(v: u64) -> Self { NodeId(v) }
}

/// Whether a node's incoming connections live in this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Locality {
    /// Owned here: incoming connections are stored locally.
    Local,
    /// Owned by another process; only reachable as a connection source.
    Remote,
}

impl Locality {
    pub fn is_local(self) -> bool {
        matches!(self, Locality::Local)
    }
}
