//! Where tasks come from: synthesized from uniform ranges, or read from a CSV file.
use std::collections::HashSet;
use std::convert::TryFrom;
use std::fmt;
use std::path::Path;

use rand::distributions::{Distribution, Uniform};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::types::{Task, TaskId, Time};
use crate::utils::prelude::*;

/// Inclusive integer range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntRange {
    pub low: u64,
    pub high: u64,
}

impl IntRange {
    pub const fn new(low: u64, high: u64) -> Self {
        Self { low, high }
    }

    fn uniform(&self, field: &str, min_low: u64) -> Result<Uniform<u64>> {
        if self.low > self.high || self.low < min_low {
            return Err(Error::invalid_config(format!(
                "workload.{} must satisfy {} <= low <= high, got {}",
                field, min_low, self
            )));
        }
        Ok(Uniform::new_inclusive(self.low, self.high))
    }
}

impl fmt::Display for IntRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.low, self.high)
    }
}

/// The `workload` config section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadConfig {
    pub arrival: IntRange,
    pub burst: IntRange,
    pub priority: IntRange,
    pub deadline: IntRange,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            arrival: IntRange::new(0, 10),
            burst: IntRange::new(1, 10),
            priority: IntRange::new(1, 5),
            deadline: IntRange::new(5, 20),
        }
    }
}

/// Synthesize `count` tasks `T1..Tcount`
pub fn generate<R>(rng: &mut R, count: usize, cfg: &WorkloadConfig) -> Result<Vec<Task>>
where
    R: Rng + ?Sized,
{
    let arrival = cfg.arrival.uniform("arrival", 0)?;
    let burst = cfg.burst.uniform("burst", 1)?;
    let priority = cfg.priority.uniform("priority", 1)?;
    let deadline = cfg.deadline.uniform("deadline", 1)?;
    if cfg.priority.high > u64::from(u32::MAX) {
        return Err(Error::invalid_config("workload.priority.high does not fit in 32 bits"));
    }

    let last = u32::try_from(count)
        .map_err(|_| Error::invalid_config(format!("cannot number {} tasks with 32-bit ids", count)))?;

    let mut tasks = Vec::with_capacity(count);
    for i in 1..=last {
        tasks.push(Task {
            id: TaskId(i),
            arrival: arrival.sample(rng),
            burst: burst.sample(rng),
            priority: priority.sample(rng) as u32,
            deadline: deadline.sample(rng),
        });
    }
    debug!(tasks.len = tasks.len(), "workload generated");
    Ok(tasks)
}

/// Read tasks from a CSV file with header `id,arrival,burst,priority,deadline`
pub fn load_csv(path: impl AsRef<Path>) -> Result<Vec<Task>> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut seen = HashSet::new();
    let mut tasks = vec![];
    for row in reader.deserialize() {
        let task: Task = row?;
        check_task(&task)?;
        if !seen.insert(task.id) {
            return Err(Error::invalid_config(format!("duplicate task id {} in {}", task.id, path.display())));
        }
        tasks.push(task);
    }
    info!(path = %path.display(), tasks.len = tasks.len(), "workload loaded");
    Ok(tasks)
}

fn check_task(task: &Task) -> Result<()> {
    let positive: [(&str, Time); 3] = [
        ("burst", task.burst),
        ("priority", u64::from(task.priority)),
        ("deadline", task.deadline),
    ];
    match positive.iter().find(|(_, v)| *v == 0) {
        Some((field, _)) => Err(Error::invalid_config(format!("{} of {} must be positive", field, task.id))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_seeder::{Seeder, SipRng};
    use std::fs;
    use std::path::PathBuf;

    fn rng() -> SipRng {
        Seeder::from("workload").make_rng()
    }

    fn tmp_csv(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("cloudsched-{}-{}.csv", name, std::process::id()));
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn generated_tasks_respect_ranges() {
        let cfg = WorkloadConfig::default();
        let tasks = generate(&mut rng(), 200, &cfg).unwrap();

        assert_eq!(tasks.len(), 200);
        assert_eq!(tasks[0].id, TaskId(1));
        assert_eq!(tasks[199].id, TaskId(200));
        for t in &tasks {
            assert!(t.arrival <= 10);
            assert!((1..=10).contains(&t.burst));
            assert!((1..=5).contains(&t.priority));
            assert!((5..=20).contains(&t.deadline));
        }
    }

    #[test]
    fn same_seed_same_workload() {
        let cfg = WorkloadConfig::default();
        assert_eq!(generate(&mut rng(), 30, &cfg).unwrap(), generate(&mut rng(), 30, &cfg).unwrap());
    }

    #[test]
    fn zero_tasks() {
        assert!(generate(&mut rng(), 0, &WorkloadConfig::default()).unwrap().is_empty());
    }

    #[test]
    fn bad_ranges_are_rejected() {
        let mut cfg = WorkloadConfig::default();
        cfg.burst = IntRange::new(0, 4);
        assert!(matches!(generate(&mut rng(), 3, &cfg), Err(Error::InvalidConfiguration(_))));

        let mut cfg = WorkloadConfig::default();
        cfg.arrival = IntRange::new(8, 2);
        assert!(matches!(generate(&mut rng(), 3, &cfg), Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn task_count_must_fit_the_ids() {
        if let Some(count) = (u32::MAX as usize).checked_add(1) {
            // rejected before anything is allocated or drawn
            assert!(matches!(
                generate(&mut rng(), count, &WorkloadConfig::default()),
                Err(Error::InvalidConfiguration(_))
            ));
        }
    }

    #[test]
    fn loads_csv_with_either_id_style() {
        let path = tmp_csv(
            "ok",
            "id,arrival,burst,priority,deadline\nT1, 0, 3, 2, 10\n2,1,2,1,5\n",
        );
        let tasks = load_csv(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].id, TaskId(1));
        assert_eq!(tasks[0].burst, 3);
        assert_eq!(tasks[1].id, TaskId(2));
        assert_eq!(tasks[1].deadline, 5);
    }

    #[test]
    fn csv_rejects_zero_burst_and_duplicates() {
        let path = tmp_csv("zero", "id,arrival,burst,priority,deadline\nT1,0,0,2,10\n");
        let res = load_csv(&path);
        fs::remove_file(&path).ok();
        assert!(matches!(res, Err(Error::InvalidConfiguration(_))));

        let path = tmp_csv("dup", "id,arrival,burst,priority,deadline\nT1,0,1,2,10\nT1,3,1,2,10\n");
        let res = load_csv(&path);
        fs::remove_file(&path).ok();
        assert!(matches!(res, Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn csv_rejects_malformed_rows() {
        let path = tmp_csv("bad", "id,arrival,burst,priority,deadline\nT1,-2,1,2,10\n");
        let res = load_csv(&path);
        fs::remove_file(&path).ok();
        assert!(matches!(res, Err(Error::Csv(_))));
    }
}
