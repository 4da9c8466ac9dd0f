//! Scan planner: picks how a query walks the connection collection.
//!
//! The planner is kernel-agnostic. It only looks at the capabilities a
//! kernel advertises, the collection size and the local node set, and
//! produces a [`ScanPlan`] that the scan engine executes.

use serde::{Deserialize, Serialize};

use crate::config::QueryConfig;
use crate::kernel::Kernel;
use crate::model::NodeId;
use crate::predicate::CompiledPredicate;
use crate::Result;

/// Caller-visible iteration strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    /// One pass over the whole collection.
    #[default]
    Global,
    /// One target lookup per locally owned node.
    LocallyScoped,
    /// Let the planner decide from collection size and local node count.
    Auto,
}

impl std::fmt::Display for ScanMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanMode::Global => write!(f, "global"),
            ScanMode::LocallyScoped => write!(f, "locally_scoped"),
            ScanMode::Auto => write!(f, "auto"),
        }
    }
}

impl std::str::FromStr for ScanMode {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "global" => Ok(ScanMode::Global),
            "locally_scoped" | "local" => Ok(ScanMode::LocallyScoped),
            "auto" => Ok(ScanMode::Auto),
            other => Err(crate::Error::ValidationError {
                key: "scan_mode".into(),
                message: format!("expected one of global, locally_scoped, auto; got '{other}'"),
            }),
        }
    }
}

/// Resolved strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanPlan {
    Global,
    /// Local nodes to look up, already narrowed by the target filter.
    LocallyScoped(Vec<NodeId>),
}

impl ScanPlan {
    pub fn mode(&self) -> ScanMode {
        match self {
            ScanPlan::Global => ScanMode::Global,
            ScanPlan::LocallyScoped(_) => ScanMode::LocallyScoped,
        }
    }
}

/// Create a scan plan for `predicate` against `kernel`.
pub fn plan<K: Kernel + ?Sized>(
    kernel: &K,
    predicate: &CompiledPredicate,
    mode: ScanMode,
    config: &QueryConfig,
) -> Result<ScanPlan> {
    let caps = kernel.capabilities();
    match mode {
        ScanMode::Global => Ok(ScanPlan::Global),
        ScanMode::LocallyScoped => {
            if !caps.indexed_target_lookup {
                tracing::warn!(
                    "kernel has no target index; locally scoped scan falls back to a full scan per node"
                );
            }
            Ok(ScanPlan::LocallyScoped(scoped_nodes(kernel, predicate)?))
        }
        ScanMode::Auto => {
            if !caps.indexed_target_lookup {
                return Ok(ScanPlan::Global);
            }
            let nodes = scoped_nodes(kernel, predicate)?;
            let lookups = nodes.len().saturating_mul(config.scoped_ratio);
            let total = kernel.num_connections();
            tracing::debug!(lookups = nodes.len(), total, "auto scan mode");
            if lookups < total {
                Ok(ScanPlan::LocallyScoped(nodes))
            } else {
                Ok(ScanPlan::Global)
            }
        }
    }
}

/// Local nodes that can still contribute under the target filter, each once.
fn scoped_nodes<K: Kernel + ?Sized>(kernel: &K, predicate: &CompiledPredicate) -> Result<Vec<NodeId>> {
    let mut nodes = kernel.local_nodes()?;
    // A node listed twice would be looked up twice and its connections emitted twice.
    nodes.sort_unstable();
    nodes.dedup();
    if !predicate.targets.is_any() {
        nodes.retain(|n| predicate.targets.admits(*n));
    }
    Ok(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::MemoryKernel;
    use crate::predicate::FilterSpec;

    fn dense_kernel(n: usize) -> MemoryKernel {
        let k = MemoryKernel::new();
        let nodes = k.create_nodes(n);
        k.connect_all_to_all(&nodes, &nodes, "static_synapse", 1.0, 1.0).unwrap();
        k
    }

    #[test]
    fn test_explicit_modes_are_honored() {
        let k = dense_kernel(3);
        let p = CompiledPredicate::unrestricted();
        let cfg = QueryConfig::default();

        assert_eq!(plan(&k, &p, ScanMode::Global, &cfg).unwrap(), ScanPlan::Global);
        assert_eq!(
            plan(&k, &p, ScanMode::LocallyScoped, &cfg).unwrap(),
            ScanPlan::LocallyScoped(vec![NodeId(1), NodeId(2), NodeId(3)])
        );
    }

    /// Lists every local node once per kernel thread.
    struct PerThreadListing {
        inner: MemoryKernel,
    }

    impl Kernel for PerThreadListing {
        fn synapse_model_id(&self, name: &str) -> Result<crate::model::SynapseModelId> {
            self.inner.synapse_model_id(name)
        }
        fn num_connections(&self) -> usize { self.inner.num_connections() }
        fn partition(&self, index: usize) -> Result<crate::kernel::ConnectionIter<'_>> {
            self.inner.partition(index)
        }
        fn connections_to(&self, target: NodeId, out: &mut Vec<crate::model::Connection>) -> Result<()> {
            self.inner.connections_to(target, out)
        }
        fn local_nodes(&self) -> Result<Vec<NodeId>> {
            let nodes = self.inner.local_nodes()?;
            Ok(nodes.iter().chain(&nodes).copied().collect())
        }
        fn capabilities(&self) -> crate::kernel::KernelCapabilities {
            self.inner.capabilities()
        }
    }

    #[test]
    fn test_scoped_nodes_are_unique() {
        let k = PerThreadListing { inner: dense_kernel(3) };
        assert_eq!(k.local_nodes().unwrap().len(), 6);

        let p = CompiledPredicate::unrestricted();
        let plan = plan(&k, &p, ScanMode::LocallyScoped, &QueryConfig::default()).unwrap();
        assert_eq!(plan, ScanPlan::LocallyScoped(vec![NodeId(1), NodeId(2), NodeId(3)]));
    }

    #[test]
    fn test_scoped_nodes_narrowed_by_target_filter() {
        let k = dense_kernel(4);
        let spec = FilterSpec::new().with_targets([NodeId(2), NodeId(4), NodeId(99)]);
        let p = CompiledPredicate::compile(&spec, &k).unwrap();
        let plan = plan(&k, &p, ScanMode::LocallyScoped, &QueryConfig::default()).unwrap();
        assert_eq!(plan, ScanPlan::LocallyScoped(vec![NodeId(2), NodeId(4)]));
    }

    #[test]
    fn test_auto_prefers_scoped_for_few_nodes() {
        // 20 nodes, 400 connections: 20 * 8 lookups < 400.
        let k = dense_kernel(20);
        let p = CompiledPredicate::unrestricted();
        let plan = plan(&k, &p, ScanMode::Auto, &QueryConfig::default()).unwrap();
        assert_eq!(plan.mode(), ScanMode::LocallyScoped);
    }

    #[test]
    fn test_auto_prefers_global_for_sparse_collection() {
        let k = dense_kernel(3);
        let p = CompiledPredicate::unrestricted();
        let plan = plan(&k, &p, ScanMode::Auto, &QueryConfig::default()).unwrap();
        assert_eq!(plan, ScanPlan::Global);
    }

    #[test]
    fn test_scan_mode_parse() {
        assert_eq!("auto".parse::<ScanMode>().unwrap(), ScanMode::Auto);
        assert_eq!("local".parse::<ScanMode>().unwrap(), ScanMode::LocallyScoped);
        assert!("sideways".parse::<ScanMode>().is_err());
        assert_eq!(ScanMode::LocallyScoped.to_string(), "locally_scoped");
    }
}
