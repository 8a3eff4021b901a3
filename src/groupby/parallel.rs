//! Fork-join group aggregation.
//!
//! The coordinator flattens the columns a call needs into
//! [`SerializedColumn`]s, deals the groups out round-robin and lets each
//! worker of a dedicated rayon pool compute its share with the same
//! kernels as the synchronous path. Results come back over a channel and
//! are reassembled in original group order. A call that cannot use workers
//! runs synchronously instead.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;
use std::sync::Arc;

use crossbeam::channel;
use tracing::{debug, warn};

use super::protocol::{AggTask, DispatchMessage, GroupResult, SerializedColumn, WorkerAgg, WorkerResponse};
use super::GroupBy;
use crate::column::Column;
use crate::config::ParallelConfig;
use crate::expr::Expr;
use crate::table::Table;
use crate::value::DataType;
use crate::{Error, Result};

/// Why a call stays on the calling thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    Disabled,
    BelowThreshold,
    SingleWorker,
    NoGroups,
    UnsupportedAggregation,
    PoolUnavailable,
}

/// Map every aggregation onto the worker vocabulary, or `None` if any of
/// them needs the general evaluator or a key column cannot be flattened.
fn plan<S: AsRef<str>>(
    group_by: &GroupBy<'_>,
    aggregations: &[(S, Expr)],
) -> Option<Vec<(String, AggTask)>> {
    for key in group_by.keys() {
        if group_by.table().column_ref(key).ok()?.data_type() == DataType::Object {
            return None;
        }
    }
    aggregations
        .iter()
        .map(|(name, expr)| {
            let (func, source) = expr.as_column_aggregate()?;
            let kind = WorkerAgg::from_func(func)?;
            let column = group_by.table().column_ref(source).ok()?;
            if column.data_type() == DataType::Object {
                return None;
            }
            Some((
                name.as_ref().to_string(),
                AggTask {
                    source: source.to_string(),
                    kind,
                },
            ))
        })
        .collect()
}

fn check_engagement(rows: usize, groups: usize, config: &ParallelConfig) -> Option<Fallback> {
    if !config.enabled {
        Some(Fallback::Disabled)
    } else if rows < config.threshold_rows {
        Some(Fallback::BelowThreshold)
    } else if config.workers <= 1 {
        Some(Fallback::SingleWorker)
    } else if groups == 0 {
        Some(Fallback::NoGroups)
    } else {
        None
    }
}

pub(crate) fn aggregate<S: AsRef<str>>(
    group_by: &GroupBy<'_>,
    aggregations: &[(S, Expr)],
    config: &ParallelConfig,
) -> Result<Table> {
    let rows = group_by.table().len();
    if let Some(reason) = check_engagement(rows, group_by.num_groups(), config) {
        debug!(?reason, rows, "parallel aggregation not engaged");
        return group_by.agg(aggregations);
    }
    let Some(tasks) = plan(group_by, aggregations) else {
        debug!(reason = ?Fallback::UnsupportedAggregation, "parallel aggregation not engaged");
        return group_by.agg(aggregations);
    };
    let pool = match rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers)
        .thread_name(|i| format!("lightning-frame-agg-{}", i))
        .build()
    {
        Ok(pool) => pool,
        Err(e) => {
            warn!(error = %e, reason = ?Fallback::PoolUnavailable, "falling back to synchronous aggregation");
            return group_by.agg(aggregations);
        }
    };

    let messages = dispatch(group_by, &tasks, config.workers)?;
    debug!(rows, groups = group_by.num_groups(), workers = messages.len(), "parallel aggregation engaged");
    let mut results = run_workers(&pool, messages)?;
    results.sort_by_key(|r| r.position);
    if results.len() != group_by.num_groups() {
        return Err(Error::Worker(format!(
            "workers returned {} groups, expected {}",
            results.len(),
            group_by.num_groups()
        )));
    }
    assemble(group_by, &tasks, results)
}

/// Serialize the needed columns once and deal groups out round-robin.
fn dispatch(
    group_by: &GroupBy<'_>,
    tasks: &[(String, AggTask)],
    workers: usize,
) -> Result<Vec<DispatchMessage>> {
    let table = group_by.table();
    let mut columns: HashMap<String, SerializedColumn> = HashMap::new();
    let needed = group_by
        .keys()
        .iter()
        .map(String::as_str)
        .chain(tasks.iter().map(|(_, task)| task.source.as_str()));
    for name in needed {
        if !columns.contains_key(name) {
            let flat = SerializedColumn::from_column(table.column_ref(name)?)?;
            columns.insert(name.to_string(), flat);
        }
    }
    let columns = Arc::new(columns);

    let workers = workers.min(group_by.num_groups());
    let mut buckets: Vec<Vec<(usize, Vec<usize>)>> = vec![Vec::new(); workers];
    for (position, indices) in group_by.groups().iter().enumerate() {
        buckets[position % workers].push((position, indices.clone()));
    }
    Ok(buckets
        .into_iter()
        .map(|groups| DispatchMessage {
            columns: Arc::clone(&columns),
            groups,
            aggregations: tasks.to_vec(),
            key_columns: group_by.keys().to_vec(),
        })
        .collect())
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}

/// Run every message on `pool` and wait for all of them. Any failure fails
/// the whole call.
fn run_workers(pool: &rayon::ThreadPool, messages: Vec<DispatchMessage>) -> Result<Vec<GroupResult>> {
    run_on_pool(pool, messages, |message| message.execute())
}

fn run_on_pool<F>(
    pool: &rayon::ThreadPool,
    messages: Vec<DispatchMessage>,
    work: F,
) -> Result<Vec<GroupResult>>
where
    F: Fn(&DispatchMessage) -> Result<WorkerResponse> + Sync,
{
    let expected = messages.len();
    let (tx, rx) = channel::unbounded::<(usize, Result<WorkerResponse>)>();
    let work = &work;
    pool.scope(move |scope| {
        for (worker, message) in messages.into_iter().enumerate() {
            let tx = tx.clone();
            scope.spawn(move |_| {
                let result = catch_unwind(AssertUnwindSafe(|| work(&message)))
                    .map_err(|payload| Error::Worker(panic_message(payload)))
                    .and_then(|r| r);
                let _ = tx.send((worker, result));
            });
        }
    });

    let mut results = Vec::new();
    let mut received = 0;
    for (worker, response) in rx.try_iter() {
        received += 1;
        match response {
            Ok(response) => results.extend(response.groups),
            Err(Error::Worker(message)) => {
                warn!(worker, %message, "aggregation worker failed");
                return Err(Error::Worker(format!("worker {}: {}", worker, message)));
            }
            Err(other) => {
                warn!(worker, error = %other, "aggregation worker failed");
                return Err(Error::Worker(format!("worker {}: {}", worker, other)));
            }
        }
    }
    if received != expected {
        return Err(Error::Worker(format!(
            "{} of {} workers reported",
            received, expected
        )));
    }
    Ok(results)
}

fn assemble(
    group_by: &GroupBy<'_>,
    tasks: &[(String, AggTask)],
    results: Vec<GroupResult>,
) -> Result<Table> {
    let table = group_by.table();
    let mut key_values = vec![Vec::with_capacity(results.len()); group_by.keys().len()];
    let mut agg_values = vec![Vec::with_capacity(results.len()); tasks.len()];
    for result in results {
        for (slot, value) in key_values.iter_mut().zip(result.key_values) {
            slot.push(value);
        }
        for (slot, value) in agg_values.iter_mut().zip(result.values) {
            slot.push(value);
        }
    }

    let mut columns: Vec<(String, Rc<Column>)> = Vec::new();
    for (name, values) in group_by.keys().iter().zip(key_values) {
        let dtype = table.column_ref(name)?.data_type();
        columns.push((name.clone(), Rc::new(Column::from_values_typed(dtype, values)?)));
    }
    for ((name, task), values) in tasks.iter().zip(agg_values) {
        let source_type = table.column_ref(&task.source)?.data_type();
        let hint = task.kind.func().output_type(source_type);
        columns.push((name.clone(), Rc::new(Column::from_values_with_hint(values, hint))));
    }
    Table::from_shared(columns)
}
