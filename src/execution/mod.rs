//! Query execution.
//!
//! Drives a scan plan against a kernel and writes the matches into columns.
//! A query either produces complete columns or fails without producing any.

use std::time::Instant;

use crate::columns::{estimate_capacity, ColumnWriter, ConnectionColumns};
use crate::config::QueryConfig;
use crate::kernel::Kernel;
use crate::planner::{ScanMode, ScanPlan};
use crate::predicate::CompiledPredicate;
use crate::scan::Scan;
use crate::Result;

/// Query execution result.
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub columns: ConnectionColumns,
    pub stats: ExecutionStats,
}

/// Execution statistics.
#[derive(Debug, Clone, Default)]
pub struct ExecutionStats {
    /// Resolved scan mode (never `Auto`).
    pub mode: ScanMode,
    /// Connections examined.
    pub visited: usize,
    /// Connections written.
    pub matched: usize,
    /// Rows reserved before the scan.
    pub reserved: usize,
    pub parallel: bool,
    pub execution_time_us: u64,
}

/// Execute `plan` for `predicate` against `kernel`.
pub fn execute<K: Kernel + ?Sized>(
    kernel: &K,
    predicate: CompiledPredicate,
    plan: ScanPlan,
    config: &QueryConfig,
) -> Result<QueryResult> {
    let started = Instant::now();
    let reserved = estimate_capacity(kernel.num_connections(), &predicate, config.reserve_divisor);
    let mode = plan.mode();

    let (columns, visited, parallel) = match config.runs_parallel() {
        #[cfg(feature = "parallel")]
        true => run_parallel(kernel, &predicate, &plan, reserved)?,
        _ => run_sequential(kernel, predicate, plan, reserved)?,
    };

    let stats = ExecutionStats {
        mode,
        visited,
        matched: columns.len(),
        reserved,
        parallel,
        execution_time_us: u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX),
    };
    tracing::debug!(
        mode = %stats.mode,
        visited = stats.visited,
        matched = stats.matched,
        reserved = stats.reserved,
        parallel = stats.parallel,
        elapsed_us = stats.execution_time_us,
        "connection query finished"
    );
    Ok(QueryResult { columns, stats })
}

fn run_sequential<K: Kernel + ?Sized>(
    kernel: &K,
    predicate: CompiledPredicate,
    plan: ScanPlan,
    reserved: usize,
) -> Result<(ConnectionColumns, usize, bool)> {
    let mut scan = Scan::new(kernel, predicate, plan)?;
    let mut writer = ColumnWriter::with_capacity(reserved);
    for conn in scan.by_ref() {
        writer.push(&conn?);
    }
    Ok((writer.finish(), scan.visited(), false))
}

#[cfg(feature = "parallel")]
fn run_parallel<K: Kernel + ?Sized>(
    kernel: &K,
    predicate: &CompiledPredicate,
    plan: &ScanPlan,
    reserved: usize,
) -> Result<(ConnectionColumns, usize, bool)> {
    let chunks = crate::scan::par_filter(kernel, predicate, plan)?;
    // Single writer: chunks are appended in unit order.
    let mut writer = ColumnWriter::with_capacity(reserved);
    let mut visited = 0;
    for chunk in &chunks {
        visited += chunk.visited;
        writer.extend(&chunk.matches);
    }
    Ok((writer.finish(), visited, true))
}
