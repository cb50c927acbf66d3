//! Per-run aggregates and the VM load table.
use rand::Rng;

use crate::policy::Policy;
use crate::types::{ScheduleEntry, SimulationResult, Task, Time};
use crate::utils::prelude::*;
use crate::vms::VmLedger;

/// Mean of `values`, or zero when there are none. Callers tell the two apart by the count.
fn mean(values: impl Iterator<Item = Time>) -> (f64, usize) {
    // summed wide: each value fits a Time, their total need not
    let (sum, count) = values.fold((0u128, 0usize), |(s, c), v| (s + u128::from(v), c + 1));
    if count == 0 {
        (0.0, 0)
    } else {
        (sum as f64 / count as f64, count)
    }
}

/// Turn timeline entries into the final result.
///
/// `ordered` must be the tasks the entries were produced from, in the same order.
/// Under random load balancing every task's full burst is booked on a VM drawn from `rng`;
/// every other policy leaves all `vm_count` loads at zero and does not touch `rng`.
#[instrument(level = "debug", skip(entries, ordered, policy, rng), fields(entries.len = entries.len(), %policy))]
pub fn aggregate<R>(
    mut entries: Vec<ScheduleEntry>,
    ordered: &[Task],
    policy: &Policy,
    vm_count: usize,
    rng: &mut R,
) -> SimulationResult
where
    R: Rng + ?Sized,
{
    debug_assert_eq!(entries.len(), ordered.len());

    let mut ledger = VmLedger::new(vm_count);
    if let Policy::RandomLoadBalancing = policy {
        for (entry, task) in entries.iter_mut().zip(ordered) {
            entry.vm = ledger.assign_random(rng, task.burst);
        }
    }

    let (average_waiting, task_count) = mean(entries.iter().map(|e| e.waiting));
    let (average_turnaround, _) = mean(entries.iter().map(|e| e.turnaround));
    let makespan = entries.iter().map(|e| e.finish).max().unwrap_or(0);
    let deadlines_missed = entries
        .iter()
        .zip(ordered)
        .filter(|(e, t)| e.finish > t.deadline)
        .count();

    info!(
        task_count,
        average_waiting, average_turnaround, makespan, deadlines_missed, "aggregated"
    );

    SimulationResult {
        policy: *policy,
        entries,
        average_waiting,
        average_turnaround,
        task_count,
        makespan,
        deadlines_missed,
        vm_loads: ledger.loads(),
    }
}
