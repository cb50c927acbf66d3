//! The single shared dispatch clock.
//!
//! However many VMs are configured, tasks run one after another on this one
//! timeline. VMs only show up later as a load ledger.
use std::cmp::{max, min};

use crate::policy::Policy;
use crate::types::{ScheduleEntry, Task, Time};
use crate::utils::prelude::*;

/// Non-preemptive dispatcher over one execution resource
#[derive(Debug)]
pub struct Timeline {
    clock: Time,
    quantum: Option<Time>,
}

impl Timeline {
    pub fn new(policy: &Policy) -> Result<Self> {
        let quantum = policy.quantum();
        if quantum == Some(0) {
            return Err(Error::invalid_config("RoundRobin quantum must be positive, got 0"));
        }
        Ok(Self { clock: 0, quantum })
    }

    pub fn now(&self) -> Time {
        self.clock
    }

    /// Run one task to completion, or for a single capped slice under round robin.
    ///
    /// Fails when the finish time would not fit the clock.
    pub fn dispatch(&mut self, task: &Task) -> Result<ScheduleEntry> {
        let start = max(self.clock, task.arrival);
        let executed = match self.quantum {
            Some(q) => min(task.burst, q),
            None => task.burst,
        };
        let finish = start.checked_add(executed).ok_or_else(|| {
            Error::invalid_config(format!("{} would finish past the end of the clock (start {})", task.id, start))
        })?;
        self.clock = finish;

        trace!(%task, start, finish, "dispatched");
        Ok(ScheduleEntry {
            task_id: task.id,
            start,
            finish,
            executed,
            waiting: start - task.arrival,
            turnaround: finish - task.arrival,
            vm: None,
        })
    }
}

/// Walk the already ordered tasks over a fresh clock, one entry per task in input order
#[instrument(level = "debug", skip(ordered, policy), fields(tasks.len = ordered.len(), %policy))]
pub fn run(ordered: &[Task], policy: &Policy) -> Result<Vec<ScheduleEntry>> {
    let mut timeline = Timeline::new(policy)?;
    let entries = ordered
        .iter()
        .map(|t| timeline.dispatch(t))
        .collect::<Result<Vec<_>>>()?;
    debug!(clock = timeline.now(), "timeline drained");
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TaskId;

    fn task(id: u32, arrival: Time, burst: Time) -> Task {
        Task {
            id: TaskId(id),
            arrival,
            burst,
            priority: 1,
            deadline: 20,
        }
    }

    #[test]
    fn fcfs_two_tasks() {
        let entries = run(&[task(1, 0, 3), task(2, 1, 2)], &Policy::Fcfs).unwrap();

        assert_eq!((entries[0].start, entries[0].finish), (0, 3));
        assert_eq!((entries[0].waiting, entries[0].turnaround), (0, 3));
        assert_eq!((entries[1].start, entries[1].finish), (3, 5));
        assert_eq!((entries[1].waiting, entries[1].turnaround), (2, 4));
    }

    #[test]
    fn idle_gap_until_arrival() {
        let entries = run(&[task(1, 0, 2), task(2, 7, 1)], &Policy::Fcfs).unwrap();
        assert_eq!(entries[1].start, 7);
        assert_eq!(entries[1].waiting, 0);
        assert_eq!(entries[1].finish, 8);
    }

    #[test]
    fn round_robin_runs_a_single_capped_slice() {
        let policy = Policy::RoundRobinSimplified { quantum: 2 };
        let entries = run(&[task(1, 0, 5), task(2, 0, 1)], &policy).unwrap();

        assert_eq!(entries[0].executed, 2);
        assert_eq!(entries[0].finish, 2);
        // the remaining 3 units of T1 are not requeued
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].start, 2);
        assert_eq!(entries[1].executed, 1);
    }

    #[test]
    fn zero_quantum_is_rejected() {
        let policy = Policy::RoundRobinSimplified { quantum: 0 };
        assert!(matches!(
            run(&[task(1, 0, 5)], &policy),
            Err(Error::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn clock_never_goes_back() {
        // deliberately not sorted by arrival, as priority or EDF orders can be
        let tasks = vec![task(1, 9, 4), task(2, 0, 3), task(3, 2, 1), task(4, 30, 2)];
        let entries = run(&tasks, &Policy::Priority).unwrap();

        for (entry, task) in entries.iter().zip(&tasks) {
            assert!(entry.finish >= entry.start);
            assert!(entry.start >= task.arrival);
        }
        for pair in entries.windows(2) {
            assert!(pair[1].start >= pair[0].finish);
            assert!(pair[1].finish >= pair[0].finish);
        }
    }

    #[test]
    fn clock_overflow_is_an_error() {
        let tasks = vec![task(1, 0, 2), task(2, Time::MAX - 1, 5)];
        assert!(matches!(run(&tasks, &Policy::Fcfs), Err(Error::InvalidConfiguration(_))));

        // the very last representable instant is still fine
        let entries = run(&[task(1, Time::MAX - 5, 5)], &Policy::Fcfs).unwrap();
        assert_eq!(entries[0].finish, Time::MAX);
    }

    #[test]
    fn empty_input() {
        assert!(run(&[], &Policy::Fcfs).unwrap().is_empty());
    }
}
