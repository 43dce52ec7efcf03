//! Linearization of asynchronous plans.
//!
//! Raw emission order is already a valid topological order. In asynchronous
//! contexts a [`Scheduler`] may reorder it so that independent suspensions
//! start as early as their dependencies allow. Swapping the scheduler changes
//! how much waiting overlaps, never correctness.

use std::collections::HashSet;
use std::fmt;

use tracing::trace;

use crate::error::{PlanError, PlanResult};

use super::operation::{Operation, OperationRef};

/// Reorders the operations of an asynchronous plan.
///
/// Implementations must return a permutation of the input in which every
/// dependency that belongs to the input precedes its dependent. Dependencies
/// outside the input (values of an enclosing plan) count as available.
pub trait Scheduler: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    fn schedule(&self, operations: Vec<OperationRef>) -> PlanResult<Vec<OperationRef>>;
}

/// Keeps raw dependency order.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmissionOrder;

impl Scheduler for EmissionOrder {
    fn name(&self) -> &'static str {
        "emission_order"
    }

    fn schedule(&self, operations: Vec<OperationRef>) -> PlanResult<Vec<OperationRef>> {
        Ok(operations)
    }
}

/// Greedy ready-set scheduler with a longest-pending-chain tie-break.
///
/// Each round:
///
/// 1. every ready suspension start (async initialization, async singleton
///    access, async factory or decorator call) is scheduled, in one pass
///    over the pending list;
/// 2. otherwise-ready non-await operations are scheduled one at a time;
/// 3. if nothing is ready, every pending operation waits on an await. Walking
///    back from the last pending operation through unscheduled dependencies,
///    the await at the end of the longest chain of awaits is forced next.
///
/// This is a heuristic with no optimality guarantee. Its exact output order
/// is observable in generated code and is pinned by tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct LongestSuspensionChain;

impl Scheduler for LongestSuspensionChain {
    fn name(&self) -> &'static str {
        "longest_suspension_chain"
    }

    fn schedule(&self, operations: Vec<OperationRef>) -> PlanResult<Vec<OperationRef>> {
        let in_plan: HashSet<usize> = operations.iter().map(|op| op.id).collect();
        let mut ordered = HashSet::with_capacity(operations.len());
        let mut scheduled = Vec::with_capacity(operations.len());
        let mut pending = operations;

        let is_ready = |op: &Operation, ordered: &HashSet<usize>| {
            op.dependencies
                .iter()
                .all(|dep| ordered.contains(&dep.id) || !in_plan.contains(&dep.id))
        };

        while !pending.is_empty() {
            let mut i = 0;
            while i < pending.len() {
                if pending[i].statement.starts_suspension() && is_ready(&pending[i], &ordered) {
                    let op = pending.remove(i);
                    trace!(op = op.id, "Scheduled suspension start");
                    ordered.insert(op.id);
                    scheduled.push(op);
                } else {
                    i += 1;
                }
            }

            if let Some(i) = pending
                .iter()
                .position(|op| !op.statement.is_await() && is_ready(op, &ordered))
            {
                let op = pending.remove(i);
                trace!(op = op.id, "Scheduled ready operation");
                ordered.insert(op.id);
                scheduled.push(op);
                continue;
            }

            let Some(last) = pending.last() else {
                break;
            };
            let mut longest: Option<(usize, usize)> = None;
            find_longest_await_chain(last, 0, &ordered, &in_plan, &mut longest);
            let Some((id, length)) = longest else {
                return Err(PlanError::Unsupported(format!(
                    "scheduler found no await to force among {} pending operations",
                    pending.len()
                )));
            };
            let Some(i) = pending.iter().position(|op| op.id == id) else {
                return Err(PlanError::Unsupported(format!("forced await {} is not pending", id)));
            };
            let op = pending.remove(i);
            trace!(op = op.id, chain = length, "Forced await");
            ordered.insert(op.id);
            scheduled.push(op);
        }

        Ok(scheduled)
    }
}

fn find_longest_await_chain(
    op: &Operation,
    mut length: usize,
    ordered: &HashSet<usize>,
    in_plan: &HashSet<usize>,
    longest: &mut Option<(usize, usize)>,
) {
    if op.statement.is_await() {
        length += 1;
        if longest.map_or(true, |(_, best)| length > best) {
            *longest = Some((op.id, length));
        }
    }
    for dep in &op.dependencies {
        if in_plan.contains(&dep.id) && !ordered.contains(&dep.id) {
            find_longest_await_chain(dep, length, ordered, in_plan, longest);
        }
    }
}
