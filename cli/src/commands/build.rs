//! `gbampy build` command - Pack the project into the ROM template.

use std::path::Path;

use clap::Args;
use gbampy_core::ProjectConfig;
use gbampy_runtime::{BuildResult, CommandHookResolver, MpyCross};

use crate::output::format_bytes;

#[derive(Args)]
pub struct BuildArgs {
    /// Suppress the build summary
    #[arg(short, long)]
    pub quiet: bool,
}

pub fn execute(args: BuildArgs, config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = ProjectConfig::load(config_path)?;
    let result = run_build(&config)?;
    if !args.quiet {
        for line in summary(&result) {
            println!("{line}");
        }
    }
    Ok(())
}

/// Build with the configured compiler and command hooks.
pub(crate) fn run_build(config: &ProjectConfig) -> Result<BuildResult, Box<dyn std::error::Error>> {
    let compiler = MpyCross::from_config(config)?;
    let hooks = CommandHookResolver::new(&config.base_dir);
    Ok(gbampy_runtime::build(config, &compiler, &hooks)?)
}

fn summary(result: &BuildResult) -> Vec<String> {
    let used = result.block_size as u64 * result.block_count as u64;
    vec![
        format!(
            "Packed {} files ({} compiled) in {} directories",
            result.files, result.compiled, result.directories
        ),
        format!(
            "Filesystem: {} blocks of {} bytes ({} of {} region)",
            result.block_count,
            result.block_size,
            format_bytes(used),
            format_bytes(result.capacity as u64)
        ),
        format!("Written {}", result.output.display()),
    ]
}
