use std::convert::TryFrom;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::metrics::aggregate;
use crate::orderer::order;
use crate::policy::{Policy, PolicyKind};
use crate::timeline;
use crate::types::{SimulationResult, Task};
use crate::utils::prelude::*;

/// Parameters of one simulation run, the `sim` config section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimParams {
    /// how many tasks the workload source should produce
    pub task_count: usize,
    pub vm_count: i64,
    pub policy: PolicyKind,
    /// read only when `policy` is `RoundRobin`
    #[serde(default)]
    pub quantum: Option<i64>,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            task_count: 15,
            vm_count: 3,
            policy: PolicyKind::FCFS,
            quantum: Some(3),
        }
    }
}

impl SimParams {
    /// Check everything up front, before any simulation work
    pub fn validate(&self) -> Result<(Policy, usize)> {
        if self.vm_count < 1 {
            return Err(Error::invalid_config(format!(
                "vm_count must be at least 1, got {} (policy {})",
                self.vm_count, self.policy
            )));
        }
        let vm_count = usize::try_from(self.vm_count)
            .map_err(|_| Error::invalid_config(format!("vm_count {} is out of range", self.vm_count)))?;
        let policy = Policy::new(self.policy, self.quantum)?;
        Ok((policy, vm_count))
    }
}

/// Order, dispatch and aggregate one batch of tasks.
///
/// Each call works on its own clock and ledger; `rng` is only drawn from under random load balancing.
pub fn simulate<R>(tasks: &[Task], params: &SimParams, rng: &mut R) -> Result<SimulationResult>
where
    R: Rng + ?Sized,
{
    let (policy, vm_count) = params.validate()?;
    let _g = info_span!("simulate", %policy, vm_count, tasks.len = tasks.len()).entered();

    let ordered = order(tasks, &policy);
    let entries = timeline::run(&ordered, &policy)?;
    Ok(aggregate(entries, &ordered, &policy, vm_count, rng))
}
