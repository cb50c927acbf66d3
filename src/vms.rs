use rand::Rng;

use crate::types::{Time, VmId, VmLoad};

/// A passive load bucket. It never executes anything.
#[derive(Debug, Clone)]
pub struct Vm {
    id: VmId,
    cumulative_load: Time,
}

impl Vm {
    fn new(id: usize) -> Self {
        Self {
            id: VmId(id),
            cumulative_load: 0,
        }
    }

    pub fn id(&self) -> VmId {
        self.id
    }

    pub fn cumulative_load(&self) -> Time {
        self.cumulative_load
    }

    fn book(&mut self, burst: Time) {
        self.cumulative_load += burst;
    }
}

/// Side ledger of VM loads, updated independently of the timeline clock
#[derive(Debug, Clone)]
pub struct VmLedger {
    vms: Vec<Vm>,
}

impl VmLedger {
    /// `count` VMs, all at zero load
    pub fn new(count: usize) -> Self {
        Self {
            vms: (0..count).map(Vm::new).collect(),
        }
    }

    /// Book `burst` on a uniformly drawn VM, returning which one
    pub fn assign_random<R>(&mut self, rng: &mut R, burst: Time) -> Option<VmId>
    where
        R: Rng + ?Sized,
    {
        if self.vms.is_empty() {
            return None;
        }
        let idx = rng.gen_range(0..self.vms.len());
        let vm = &mut self.vms[idx];
        vm.book(burst);
        Some(vm.id())
    }

    pub fn loads(&self) -> Vec<VmLoad> {
        self.vms
            .iter()
            .map(|vm| VmLoad {
                vm: vm.id(),
                cumulative_load: vm.cumulative_load(),
            })
            .collect()
    }
}
