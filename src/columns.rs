//! Column writer. Accumulates matches into four index-aligned columns.
//!
//! ```text
//! scan ──▶ ColumnWriter::push ──▶ finish() ──▶ ConnectionColumns
//!           (pre-reserved)         (shrunk)      source | target | weight | delay
//! ```
//!
//! Row `i` of every column describes the same connection. The writer is the
//! only code that appends, and it only appends.

use serde::Serialize;

use crate::model::{Connection, NodeId};
use crate::predicate::CompiledPredicate;

/// Rows to reserve before a scan.
///
/// An unrestricted query returns the whole collection, so it reserves
/// exactly `total`. Filtered queries reserve `total / divisor`; the columns
/// grow normally if that undershoots.
pub fn estimate_capacity(total: usize, predicate: &CompiledPredicate, divisor: usize) -> usize {
    if predicate.is_unrestricted() {
        total
    } else {
        total / divisor.max(1)
    }
}

// ============================================================================
// ConnectionColumns
// ============================================================================

/// Columnar query result. All four columns always have the same length.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConnectionColumns {
    source: Vec<NodeId>,
    target: Vec<NodeId>,
    weight: Vec<f64>,
    delay: Vec<f64>,
}

impl ConnectionColumns {
    pub fn len(&self) -> usize {
        self.source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    pub fn source(&self) -> &[NodeId] { &self.source }
    pub fn target(&self) -> &[NodeId] { &self.target }
    pub fn weight(&self) -> &[f64] { &self.weight }
    pub fn delay(&self) -> &[f64] { &self.delay }

    /// Iterate rows as `(source, target, weight, delay)`.
    pub fn rows(&self) -> impl Iterator<Item = (NodeId, NodeId, f64, f64)> + '_ {
        self.source.iter()
            .zip(&self.target)
            .zip(&self.weight)
            .zip(&self.delay)
            .map(|(((s, t), w), d)| (*s, *t, *w, *d))
    }

    /// Take the columns apart as `(source, target, weight, delay)`.
    pub fn into_parts(self) -> (Vec<NodeId>, Vec<NodeId>, Vec<f64>, Vec<f64>) {
        (self.source, self.target, self.weight, self.delay)
    }
}

// ============================================================================
// ColumnWriter
// ============================================================================

/// Append-only builder for [`ConnectionColumns`].
#[derive(Debug)]
pub struct ColumnWriter {
    columns: ConnectionColumns,
    reserved: usize,
}

impl ColumnWriter {
    pub fn with_capacity(rows: usize) -> Self {
        Self {
            columns: ConnectionColumns {
                source: Vec::with_capacity(rows),
                target: Vec::with_capacity(rows),
                weight: Vec::with_capacity(rows),
                delay: Vec::with_capacity(rows),
            },
            reserved: rows,
        }
    }

    #[inline]
    pub fn push(&mut self, conn: &Connection) {
        let c = &mut self.columns;
        c.source.push(conn.source);
        c.target.push(conn.target);
        c.weight.push(conn.weight);
        c.delay.push(conn.delay);
    }

    /// Append a batch in order.
    pub fn extend(&mut self, batch: &[Connection]) {
        let c = &mut self.columns;
        c.source.extend(batch.iter().map(|conn| conn.source));
        c.target.extend(batch.iter().map(|conn| conn.target));
        c.weight.extend(batch.iter().map(|conn| conn.weight));
        c.delay.extend(batch.iter().map(|conn| conn.delay));
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Rows reserved up front.
    pub fn reserved(&self) -> usize {
        self.reserved
    }

    /// Seal the columns, trimming spare capacity.
    pub fn finish(self) -> ConnectionColumns {
        let mut columns = self.columns;
        if columns.len() > self.reserved {
            tracing::debug!(
                rows = columns.len(),
                reserved = self.reserved,
                "column capacity estimate undershot"
            );
        }
        columns.source.shrink_to_fit();
        columns.target.shrink_to_fit();
        columns.weight.shrink_to_fit();
        columns.delay.shrink_to_fit();
        debug_assert!(
            columns.target.len() == columns.len()
                && columns.weight.len() == columns.len()
                && columns.delay.len() == columns.len()
        );
        columns
    }
}

// ============================================================================
// Arrow export
// ============================================================================

#[cfg(feature = "arrow-results")]
impl ConnectionColumns {
    /// Export as an Arrow `RecordBatch` with columns
    /// `source: Int64, target: Int64, weight: Float64, delay: Float64`.
    pub fn to_record_batch(&self) -> crate::Result<arrow::record_batch::RecordBatch> {
        use std::sync::Arc;
        use arrow::array::{ArrayRef, Float64Array, Int64Array};
        use arrow::datatypes::{DataType, Field, Schema};
        use arrow::record_batch::RecordBatch;
        use crate::marshal::node_to_i64;

        let schema = Arc::new(Schema::new(vec![
            Field::new(crate::marshal::SOURCE, DataType::Int64, false),
            Field::new(crate::marshal::TARGET, DataType::Int64, false),
            Field::new(crate::marshal::WEIGHT, DataType::Float64, false),
            Field::new(crate::marshal::DELAY, DataType::Float64, false),
        ]));

        let ids = |col: &[NodeId]| -> crate::Result<Int64Array> {
            let values = col.iter().map(|id| node_to_i64(*id)).collect::<crate::Result<Vec<i64>>>()?;
            Ok(Int64Array::from(values))
        };

        let arrays: Vec<ArrayRef> = vec![
            Arc::new(ids(&self.source)?),
            Arc::new(ids(&self.target)?),
            Arc::new(Float64Array::from(self.weight.clone())),
            Arc::new(Float64Array::from(self.delay.clone())),
        ];
        Ok(RecordBatch::try_new(schema, arrays)?)
    }
}

// ============================================================================
// Tests
// ============================================================================
