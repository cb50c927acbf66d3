use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::policy::Policy;

/// A point or span on the simulated timeline, in abstract time units
pub type Time = u64;

/// Task identifier, shown as `T<n>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct TaskId(pub u32);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = std::num::ParseIntError;

    /// Accepts both `T7` and `7`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let digits = s.strip_prefix('T').or_else(|| s.strip_prefix('t')).unwrap_or(s);
        digits.parse().map(TaskId)
    }
}

impl From<TaskId> for String {
    fn from(id: TaskId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for TaskId {
    type Error = std::num::ParseIntError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// A unit of work, immutable once generated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    /// when the task becomes schedulable
    pub arrival: Time,
    /// total work required, positive
    pub burst: Time,
    /// lower value means higher priority
    pub priority: u32,
    /// target completion time, only steers ordering under EDF
    pub deadline: Time,
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Task({}, @{}+{}, p{}, <{})",
            self.id, self.arrival, self.burst, self.priority, self.deadline
        )
    }
}

/// Where and when one task ran on the shared timeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub task_id: TaskId,
    pub start: Time,
    pub finish: Time,
    /// time actually run, may be less than the burst under round robin
    pub executed: Time,
    /// `start - arrival`
    pub waiting: Time,
    /// `finish - arrival`
    pub turnaround: Time,
    /// VM picked for the task, only under random load balancing
    pub vm: Option<VmId>,
}

/// Zero based VM index, shown one based as `VM<n>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VmId(pub usize);

impl fmt::Display for VmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VM{}", self.0 + 1)
    }
}

/// One row of the VM load table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmLoad {
    pub vm: VmId,
    /// summed burst of all tasks assigned to this VM
    pub cumulative_load: Time,
}

/// Everything a run produces. Built once, never changed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResult {
    pub policy: Policy,
    /// in dispatch order
    pub entries: Vec<ScheduleEntry>,
    /// zero when `task_count` is zero
    pub average_waiting: f64,
    /// zero when `task_count` is zero
    pub average_turnaround: f64,
    /// number of entries the averages were taken over
    pub task_count: usize,
    /// finish time of the last dispatched task
    pub makespan: Time,
    /// entries finishing after their task's deadline
    pub deadlines_missed: usize,
    pub vm_loads: Vec<VmLoad>,
}

impl SimulationResult {
    /// Whether the averages are meaningful, i.e. at least one task ran
    pub fn has_tasks(&self) -> bool {
        self.task_count > 0
    }

    pub fn total_vm_load(&self) -> Time {
        self.vm_loads.iter().map(|v| v.cumulative_load).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_id_parses_with_or_without_prefix() {
        assert_eq!("T12".parse::<TaskId>().unwrap(), TaskId(12));
        assert_eq!(" 3 ".parse::<TaskId>().unwrap(), TaskId(3));
        assert!("VM1".parse::<TaskId>().is_err());
        assert_eq!(TaskId(4).to_string(), "T4");
    }

    #[test]
    fn vm_id_is_shown_one_based() {
        assert_eq!(VmId(0).to_string(), "VM1");
        assert_eq!(VmId(9).to_string(), "VM10");
    }

    #[test]
    fn task_id_serializes_as_label() {
        let json = serde_json::to_string(&TaskId(5)).unwrap();
        assert_eq!(json, "\"T5\"");
        let back: TaskId = serde_json::from_str("\"T5\"").unwrap();
        assert_eq!(back, TaskId(5));
    }
}
