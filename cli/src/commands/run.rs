//! `gbampy run` command.

use std::path::Path;

use clap::Args;
use gbampy_core::ProjectConfig;
use gbampy_runtime::GbaEmulator;

use super::build::run_build;

#[derive(Args)]
pub struct RunArgs;

pub fn execute(_args: RunArgs, config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = ProjectConfig::load(config_path)?;
    let emulator = GbaEmulator::from_config(&config)?;
    let result = run_build(&config)?;
    emulator.run(&result.output)?;
    Ok(())
}
