use std::io;
use std::path::Path;

use rand_seeder::{Seeder, SipRng};

use crate::config::{AppConfigExt, OutputFormat, RunConfig};
use crate::types::{SimulationResult, Task};
use crate::utils::prelude::*;

pub mod config;
pub mod metrics;
pub mod orderer;
pub mod output;
pub mod policy;
pub mod sim;
pub mod timeline;
pub mod types;
pub mod utils;
pub mod vms;
pub mod workload;

/// Independent random stream for one concern, derived from the run seed
fn rng_for(seed: &str, stream: &str) -> SipRng {
    Seeder::from((seed, stream)).make_rng()
}

/// Produce the workload and simulate it, without rendering anything
pub fn run(cfg: &RunConfig, tasks_file: Option<&Path>) -> Result<(Vec<Task>, SimulationResult)> {
    // reject bad parameters before spending anything on the workload
    cfg.sim.validate()?;

    let tasks = {
        let _g = info_span!("workload").entered();
        match tasks_file {
            Some(path) => workload::load_csv(path)?,
            None => workload::generate(
                &mut rng_for(&cfg.seed, "workload"),
                cfg.sim.task_count,
                &cfg.workload,
            )?,
        }
    };

    let result = sim::simulate(&tasks, &cfg.sim, &mut rng_for(&cfg.seed, "vms"))?;
    Ok((tasks, result))
}

/// Run end-to-end with the global config and render every configured output
pub fn run_sim(tasks_file: Option<&Path>) -> Result<()> {
    let _g = info_span!("sim").entered();

    let cfg = config().run_config()?;
    info!(seed = %cfg.seed, policy = %cfg.sim.policy, "starting");
    let (tasks, result) = run(&cfg, tasks_file)?;

    {
        let _g = info_span!("output").entered();
        let out = &cfg.output;
        if out.wants(OutputFormat::Table) {
            output::render_tables(io::stdout().lock(), &tasks, &result)?;
        }
        if out.wants(OutputFormat::Csv) {
            output::write_schedule_csv(&out.dir.file("schedule.csv")?, &result)?;
        }
        if out.wants(OutputFormat::Json) {
            output::write_json(&out.dir.file("result.json")?, &result, &cfg.sim)?;
        }
        if out.wants(OutputFormat::Trace) {
            output::render_chrome_trace(&out.dir.file("trace.json")?, &result)?;
        }
    }

    Ok(())
}
