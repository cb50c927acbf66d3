use cloudsched::utils;
use cloudsched::utils::prelude::*;

mod cli;
mod commands;

fn main() -> Result<()> {
    // panic setup should be done early
    utils::panic::setup();
    // basic logging setup, reconfigured once config is loaded
    let mut logging = utils::logging::setup()?;

    utils::app_config::setup()?;

    trace!("Start cli execution");

    cli::execute(&mut logging)
}
