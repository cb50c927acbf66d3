//! Dispatch ordering.
//!
//! The order is fixed in one pass before the timeline runs; nothing is re-ranked while dispatching.
use std::cmp::Ordering;

use crate::policy::Policy;
use crate::types::Task;
use crate::utils::prelude::*;

/// Arrival, then id. The baseline order and the tie-break for every other key.
fn by_arrival(a: &Task, b: &Task) -> Ordering {
    a.arrival.cmp(&b.arrival).then_with(|| a.id.cmp(&b.id))
}

fn by_priority(a: &Task, b: &Task) -> Ordering {
    a.priority.cmp(&b.priority).then_with(|| by_arrival(a, b))
}

fn by_deadline(a: &Task, b: &Task) -> Ordering {
    a.deadline.cmp(&b.deadline).then_with(|| by_arrival(a, b))
}

/// Sort the tasks into the order the timeline will dispatch them in
#[instrument(level = "debug", skip(tasks, policy), fields(tasks.len = tasks.len(), %policy))]
pub fn order(tasks: &[Task], policy: &Policy) -> Vec<Task> {
    let key: fn(&Task, &Task) -> Ordering = match policy {
        Policy::Priority => by_priority,
        Policy::Edf => by_deadline,
        // round robin caps slices in the timeline, load balancing only books VMs
        Policy::Fcfs | Policy::RoundRobinSimplified { .. } | Policy::RandomLoadBalancing => by_arrival,
    };

    let mut ordered = tasks.to_vec();
    ordered.sort_by(key);
    debug!(first = ?ordered.first().map(|t| t.id), "dispatch order fixed");
    ordered
}
