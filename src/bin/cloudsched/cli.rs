use std::path::PathBuf;

use structopt::StructOpt;

use cloudsched::utils::logging::LoggingContext;
use cloudsched::utils::prelude::*;

use crate::commands::{self, Cmd};

#[derive(StructOpt)]
#[structopt(about = "Simulate cloud task dispatching under classic scheduling policies")]
struct Opt {
    /// Config file layered over the built-in defaults
    #[structopt(short, long, global = true, parse(from_os_str), value_name = "FILE")]
    config: Option<PathBuf>,

    /// Named preset from the `presets` table, applied after the config file
    #[structopt(short, long, global = true, value_name = "NAME")]
    preset: Option<String>,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(StructOpt)]
enum Command {
    Run(commands::Run),
    Config(commands::Config),
    Policies(commands::Policies),
}

impl Command {
    fn as_cmd(&self) -> &dyn Cmd {
        match self {
            Command::Run(c) => c as &dyn Cmd,
            Command::Config(c) => c as &dyn Cmd,
            Command::Policies(c) => c as &dyn Cmd,
        }
    }
}

/// Parse args, finish config and logging, then run the subcommand
pub fn execute(logging: &mut LoggingContext) -> Result<()> {
    let opt = Opt::from_args();

    {
        let mut cfg = config_mut();
        if let Some(path) = &opt.config {
            cfg.use_file(path)?;
        }
        if let Some(name) = &opt.preset {
            cfg.use_preset(name)?;
        }
    }

    let cmd = opt.cmd.as_cmd();
    cmd.prepare()?;
    logging.reconfigure(cmd.produces_output()?)?;
    cmd.run()
}
