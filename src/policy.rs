use parse_display::{Display, FromStr};
use serde::{Deserialize, Serialize};

use crate::types::Time;
use crate::utils::prelude::*;

/// Policy names as they appear in config files and on the command line
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, FromStr, Serialize, Deserialize)]
pub enum PolicyKind {
    FCFS,
    RoundRobin,
    Priority,
    EDF,
    RandomLoadBalancing,
}

impl PolicyKind {
    pub const ALL: [PolicyKind; 5] = [
        PolicyKind::FCFS,
        PolicyKind::RoundRobin,
        PolicyKind::Priority,
        PolicyKind::EDF,
        PolicyKind::RandomLoadBalancing,
    ];

    pub fn describe(&self) -> &'static str {
        match self {
            PolicyKind::FCFS => "first come first served, by arrival",
            PolicyKind::RoundRobin => "one quantum-capped slice per task, remainder dropped",
            PolicyKind::Priority => "lowest priority value first",
            PolicyKind::EDF => "earliest deadline first",
            PolicyKind::RandomLoadBalancing => "by arrival, each task booked on a random VM",
        }
    }
}

/// A validated scheduling discipline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[serde(tag = "name")]
pub enum Policy {
    #[display("FCFS")]
    Fcfs,
    /// Round robin approximated by a single slice of at most `quantum` per task.
    /// Whatever is left of the burst is never requeued.
    #[display("RoundRobin(quantum={quantum})")]
    RoundRobinSimplified { quantum: Time },
    #[display("Priority")]
    Priority,
    #[display("EDF")]
    Edf,
    #[display("RandomLoadBalancing")]
    RandomLoadBalancing,
}

impl Policy {
    /// Build a policy from its config name; `quantum` is only consulted for round robin
    pub fn new(kind: PolicyKind, quantum: Option<i64>) -> Result<Self> {
        Ok(match kind {
            PolicyKind::FCFS => Policy::Fcfs,
            PolicyKind::RoundRobin => Policy::round_robin(
                quantum.ok_or_else(|| Error::invalid_config("RoundRobin requires a quantum"))?,
            )?,
            PolicyKind::Priority => Policy::Priority,
            PolicyKind::EDF => Policy::Edf,
            PolicyKind::RandomLoadBalancing => Policy::RandomLoadBalancing,
        })
    }

    pub fn round_robin(quantum: i64) -> Result<Self> {
        if quantum <= 0 {
            return Err(Error::invalid_config(format!(
                "RoundRobin quantum must be positive, got {}",
                quantum
            )));
        }
        Ok(Policy::RoundRobinSimplified {
            quantum: quantum as Time,
        })
    }

    pub fn kind(&self) -> PolicyKind {
        match self {
            Policy::Fcfs => PolicyKind::FCFS,
            Policy::RoundRobinSimplified { .. } => PolicyKind::RoundRobin,
            Policy::Priority => PolicyKind::Priority,
            Policy::Edf => PolicyKind::EDF,
            Policy::RandomLoadBalancing => PolicyKind::RandomLoadBalancing,
        }
    }

    /// Cap on the time a single task may run, if any
    pub fn quantum(&self) -> Option<Time> {
        match self {
            Policy::RoundRobinSimplified { quantum } => Some(*quantum),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_names() {
        for kind in PolicyKind::ALL.iter() {
            let parsed: PolicyKind = kind.to_string().parse().unwrap();
            assert_eq!(parsed, *kind);
        }
        assert!("SJF".parse::<PolicyKind>().is_err());
    }

    #[test]
    fn round_robin_needs_positive_quantum() {
        assert!(matches!(
            Policy::new(PolicyKind::RoundRobin, Some(0)),
            Err(Error::InvalidConfiguration(_))
        ));
        assert!(matches!(
            Policy::new(PolicyKind::RoundRobin, Some(-3)),
            Err(Error::InvalidConfiguration(_))
        ));
        assert!(matches!(
            Policy::new(PolicyKind::RoundRobin, None),
            Err(Error::InvalidConfiguration(_))
        ));
        assert_eq!(
            Policy::new(PolicyKind::RoundRobin, Some(4)).unwrap(),
            Policy::RoundRobinSimplified { quantum: 4 }
        );
    }

    #[test]
    fn quantum_is_ignored_by_other_policies() {
        assert_eq!(Policy::new(PolicyKind::EDF, Some(0)).unwrap(), Policy::Edf);
        assert_eq!(Policy::new(PolicyKind::FCFS, None).unwrap(), Policy::Fcfs);
        assert_eq!(Policy::Edf.quantum(), None);
        assert_eq!(Policy::RoundRobinSimplified { quantum: 2 }.kind(), PolicyKind::RoundRobin);
    }

    #[test]
    fn display() {
        assert_eq!(Policy::RoundRobinSimplified { quantum: 3 }.to_string(), "RoundRobin(quantum=3)");
        assert_eq!(Policy::RandomLoadBalancing.to_string(), "RandomLoadBalancing");
    }
}
