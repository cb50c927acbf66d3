use std::path::PathBuf;

use structopt::StructOpt;

use cloudsched::config::OutputFormat;
use cloudsched::policy::PolicyKind;
use cloudsched::utils::prelude::*;

/// Should be implemented by individual subcommand
pub trait Cmd {
    /// Push command line overrides into the global config
    fn prepare(&self) -> Result<()> {
        Ok(())
    }

    /// Whether results go to stdout, so logs should stay off it
    fn produces_output(&self) -> Result<bool> {
        Ok(true)
    }

    fn run(&self) -> Result<()>;
}

/// Show the effective configuration
#[derive(StructOpt)]
pub struct Config {}

impl Cmd for Config {
    fn run(&self) -> Result<()> {
        let value: serde_yaml::Value = config().fetch()?;
        print!("{}", serde_yaml::to_string(&value)?);
        Ok(())
    }
}

/// List the scheduling policies
#[derive(StructOpt)]
pub struct Policies {}

impl Cmd for Policies {
    fn run(&self) -> Result<()> {
        for kind in PolicyKind::ALL.iter() {
            println!("{:<20} {}", kind.to_string(), kind.describe());
        }
        Ok(())
    }
}

/// Run one simulation end-to-end
#[derive(StructOpt)]
pub struct Run {
    /// Scheduling policy: FCFS, RoundRobin, Priority, EDF or RandomLoadBalancing
    #[structopt(long)]
    policy: Option<PolicyKind>,

    /// Number of tasks to synthesize (5 to 50)
    #[structopt(long, value_name = "N", validator = in_range(5, 50))]
    tasks: Option<i64>,

    /// Number of virtual machines (1 to 10)
    #[structopt(long, value_name = "N", validator = in_range(1, 10))]
    vms: Option<i64>,

    /// Round robin time quantum (1 to 10)
    #[structopt(long, value_name = "Q", validator = in_range(1, 10))]
    quantum: Option<i64>,

    /// Seed for all random draws
    #[structopt(long)]
    seed: Option<String>,

    /// Read tasks from a CSV file instead of synthesizing them
    #[structopt(long, parse(from_os_str), value_name = "FILE")]
    tasks_file: Option<PathBuf>,

    /// Outputs to produce: table, csv, json, trace (repeatable)
    #[structopt(long = "format", value_name = "FORMAT", number_of_values = 1)]
    formats: Vec<OutputFormat>,

    /// Directory for csv, json and trace outputs
    #[structopt(long, parse(from_os_str), value_name = "DIR")]
    out_dir: Option<PathBuf>,
}

fn in_range(low: i64, high: i64) -> impl Fn(String) -> std::result::Result<(), String> {
    move |s| match s.parse::<i64>() {
        Ok(v) if (low..=high).contains(&v) => Ok(()),
        Ok(v) => Err(format!("{} is outside {}..={}", v, low, high)),
        Err(e) => Err(e.to_string()),
    }
}

impl Cmd for Run {
    fn prepare(&self) -> Result<()> {
        let mut cfg = config_mut();
        if let Some(policy) = self.policy {
            cfg.set("sim.policy", policy.to_string())?;
        }
        if let Some(n) = self.tasks {
            cfg.set("sim.task_count", n)?;
        }
        if let Some(n) = self.vms {
            cfg.set("sim.vm_count", n)?;
        }
        if let Some(q) = self.quantum {
            cfg.set("sim.quantum", q)?;
        }
        if let Some(seed) = &self.seed {
            cfg.set("seed", seed.as_str())?;
        }
        if !self.formats.is_empty() {
            let formats: Vec<String> = self.formats.iter().map(ToString::to_string).collect();
            cfg.set("output.formats", formats)?;
        }
        if let Some(dir) = &self.out_dir {
            cfg.set("output.dir", dir.to_string_lossy().into_owned())?;
        }
        Ok(())
    }

    fn produces_output(&self) -> Result<bool> {
        let formats: Vec<OutputFormat> = config().get("output.formats")?;
        Ok(formats.contains(&OutputFormat::Table))
    }

    fn run(&self) -> Result<()> {
        cloudsched::run_sim(self.tasks_file.as_deref())
    }
}
