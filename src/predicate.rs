//! Predicate builder. Turns a caller's filter into a compiled predicate.
//!
//! A [`FilterSpec`] is what the caller asks for: optional identity lists,
//! an optional synapse model name and optional weight/delay bounds. Compiling
//! it against a kernel resolves the model name once and converts the lists
//! into hash sets, so the scan loop only does set probes, one integer
//! compare and four float compares per connection.
//!
//! Every dimension is a tagged optional. "No restriction" is never encoded
//! as a sentinel value that could collide with a real one.

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};

use crate::kernel::Kernel;
use crate::model::*;
use crate::{Error, Result};

// ============================================================================
// FilterSpec (caller side)
// ============================================================================

/// Caller-supplied connection filter. Every field is optional; a missing
/// field leaves that dimension unrestricted.
///
/// Deserializes from a plain document such as
/// `{"sources": [1, 2], "synapse_model": "stdp_synapse", "min_weight": 0.5}`.
/// Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSpec {
    pub sources: Option<Vec<NodeId>>,
    pub targets: Option<Vec<NodeId>>,
    #[serde(alias = "synapse_model")]
    pub type_name: Option<String>,
    pub min_weight: Option<f64>,
    pub max_weight: Option<f64>,
    pub min_delay: Option<f64>,
    pub max_delay: Option<f64>,
}

impl FilterSpec {
    /// A filter that matches every connection.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sources(mut self, ids: impl IntoIterator<Item = NodeId>) -> Self {
        self.sources = Some(ids.into_iter().collect());
        self
    }

    pub fn with_targets(mut self, ids: impl IntoIterator<Item = NodeId>) -> Self {
        self.targets = Some(ids.into_iter().collect());
        self
    }

    pub fn with_type_name(mut self, name: impl Into<String>) -> Self {
        self.type_name = Some(name.into());
        self
    }

    pub fn with_min_weight(mut self, v: f64) -> Self {
        self.min_weight = Some(v);
        self
    }

    pub fn with_max_weight(mut self, v: f64) -> Self {
        self.max_weight = Some(v);
        self
    }

    pub fn with_min_delay(mut self, v: f64) -> Self {
        self.min_delay = Some(v);
        self
    }

    pub fn with_max_delay(mut self, v: f64) -> Self {
        self.max_delay = Some(v);
        self
    }

    /// Check the filter for values that can never be evaluated.
    pub fn validate(&self) -> Result<()> {
        for (key, bound) in [
            ("min_weight", self.min_weight),
            ("max_weight", self.max_weight),
            ("min_delay", self.min_delay),
            ("max_delay", self.max_delay),
        ] {
            if bound.is_some_and(f64::is_nan) {
                return Err(Error::ValidationError {
                    key: key.into(),
                    message: "bound must be a number, got NaN".into(),
                });
            }
        }
        Ok(())
    }
}

// ============================================================================
// Compiled dimensions
// ============================================================================

/// Node identity restriction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum IdFilter {
    /// No restriction.
    #[default]
    Any,
    /// Only these identities. Never empty.
    Only(HashSet<NodeId>),
}

impl IdFilter {
    /// Absent and empty lists both mean "unrestricted".
    pub fn from_ids(ids: Option<&[NodeId]>) -> Self {
        match ids {
            Some(ids) if !ids.is_empty() => IdFilter::Only(ids.iter().copied().collect()),
            _ => IdFilter::Any,
        }
    }

    #[inline]
    pub fn admits(&self, id: NodeId) -> bool {
        match self {
            IdFilter::Any => true,
            IdFilter::Only(set) => set.contains(&id),
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, IdFilter::Any)
    }

    /// Number of admitted identities, `None` when unrestricted.
    pub fn len(&self) -> Option<usize> {
        match self {
            IdFilter::Any => None,
            IdFilter::Only(set) => Some(set.len()),
        }
    }
}

/// Synapse model restriction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelFilter {
    #[default]
    Any,
    Only(SynapseModelId),
}

impl ModelFilter {
    #[inline]
    pub fn admits(&self, id: SynapseModelId) -> bool {
        match self {
            ModelFilter::Any => true,
            ModelFilter::Only(wanted) => *wanted == id,
        }
    }
}

/// Closed interval with optional ends: `lo <= v <= hi`.
///
/// A missing end is unbounded. `lo > hi` is a legal, empty interval.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Interval {
    pub lo: Option<f64>,
    pub hi: Option<f64>,
}

impl Interval {
    pub fn new(lo: Option<f64>, hi: Option<f64>) -> Self {
        Self { lo, hi }
    }

    #[inline]
    pub fn contains(&self, v: f64) -> bool {
        self.lo.is_none_or(|lo| v >= lo) && self.hi.is_none_or(|hi| v <= hi)
    }

    pub fn is_unbounded(&self) -> bool {
        self.lo.is_none() && self.hi.is_none()
    }
}

// ============================================================================
// CompiledPredicate
// ============================================================================

/// A filter resolved against a kernel, ready for the scan loop.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompiledPredicate {
    pub sources: IdFilter,
    pub targets: IdFilter,
    pub synapse_model: ModelFilter,
    pub weight: Interval,
    pub delay: Interval,
}

impl CompiledPredicate {
    /// Predicate matching every connection.
    pub fn unrestricted() -> Self {
        Self::default()
    }

    /// Compile `spec`, resolving its synapse model name through `kernel`.
    ///
    /// Fails with `ValidationError` for NaN bounds and with `LookupError`
    /// for a model name the kernel does not know.
    pub fn compile<K: Kernel + ?Sized>(spec: &FilterSpec, kernel: &K) -> Result<Self> {
        spec.validate()?;

        let synapse_model = match spec.type_name.as_deref() {
            Some(name) => ModelFilter::Only(kernel.synapse_model_id(name)?),
            None => ModelFilter::Any,
        };

        let predicate = Self {
            sources: IdFilter::from_ids(spec.sources.as_deref()),
            targets: IdFilter::from_ids(spec.targets.as_deref()),
            synapse_model,
            weight: Interval::new(spec.min_weight, spec.max_weight),
            delay: Interval::new(spec.min_delay, spec.max_delay),
        };

        tracing::debug!(
            sources = ?predicate.sources.len(),
            targets = ?predicate.targets.len(),
            synapse_model = ?predicate.synapse_model,
            "compiled connection predicate"
        );
        Ok(predicate)
    }

    /// Evaluate against one connection. All active dimensions are AND-ed,
    /// cheapest and most selective first.
    #[inline]
    pub fn matches(&self, conn: &Connection) -> bool {
        self.sources.admits(conn.source)
            && self.targets.admits(conn.target)
            && self.synapse_model.admits(conn.synapse_model)
            && self.weight.contains(conn.weight)
            && self.delay.contains(conn.delay)
    }

    /// True if no dimension restricts anything.
    pub fn is_unrestricted(&self) -> bool {
        self.sources.is_any()
            && self.targets.is_any()
            && self.synapse_model == ModelFilter::Any
            && self.weight.is_unbounded()
            && self.delay.is_unbounded()
    }
}

// ============================================================================
// Tests
// ============================================================================
