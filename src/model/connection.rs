//! Connection (directed edge) record.

use serde::{Deserialize, Serialize};
use super::NodeId;

/// Registry key of a synapse model (the edge type).
///
/// Resolved once per query from a human-readable model name and then
/// compared by value in the scan loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SynapseModelId(pub u16);

impl std::fmt::Display for SynapseModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One connection as stored by the kernel. Read-only to this crate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub source: NodeId,
    pub target: NodeId,
    pub synapse_model: SynapseModelId,
    pub weight: f64,
    pub delay: f64,
}

impl Connection {
    pub fn new(source: NodeId, target: NodeId, synapse_model: SynapseModelId) -> Self {
        Self {
            source,
            target,
            synapse_model,
            weight: 1.0,
            delay: 1.0,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_delay(mut self, delay: f64) -> Self {
        self.delay = delay;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let c = Connection::new(NodeId(1), NodeId(2), SynapseModelId(0));
        assert_eq!(c.weight, 1.0);
        assert_eq!(c.delay, 1.0);

        let c = c.with_weight(-2.5).with_delay(0.1);
        assert_eq!(c.weight, -2.5);
        assert_eq!(c.delay, 0.1);
    }
}
