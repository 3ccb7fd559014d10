//! CLI command definitions and dispatch.

mod build;
mod info;
mod list;
mod run;
mod version;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// gbampy - pack MicroPython projects into GBA ROMs.
#[derive(Parser)]
#[command(name = "gbampy", version, about)]
pub struct Cli {
    /// Config file path, or workspace which contains the config file (.gbampy.toml)
    #[arg(short = 'c', long = "config", default_value = ".", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Command {
    /// List all the files that will be written into the ROM
    List(list::ListArgs),
    /// Build the GBA ROM
    Build(build::BuildArgs),
    /// Build the GBA ROM and run it with the emulator
    Run(run::RunArgs),
    /// Show the filesystem region of a ROM
    Info(info::InfoArgs),
    /// Show version information
    Version(version::VersionArgs),
}

/// Dispatch a parsed CLI to the appropriate command handler.
pub fn dispatch(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Command::List(args) => list::execute(args, &cli.config),
        Command::Build(args) => build::execute(args, &cli.config),
        Command::Run(args) => run::execute(args, &cli.config),
        Command::Info(args) => info::execute(args, &cli.config),
        Command::Version(args) => version::execute(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_default_config() {
        let cli = Cli::try_parse_from(["gbampy", "build"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("."));
        assert!(matches!(cli.command, Command::Build(_)));
    }

    #[test]
    fn test_parse_config_before_and_after_command() {
        let cli = Cli::try_parse_from(["gbampy", "-c", "game/.gbampy.toml", "list"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("game/.gbampy.toml"));

        let cli = Cli::try_parse_from(["gbampy", "run", "--config", "game"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("game"));
        assert!(matches!(cli.command, Command::Run(_)));
    }

    #[test]
    fn test_parse_info_image() {
        let cli = Cli::try_parse_from(["gbampy", "info", "out.gba"]).unwrap();
        match cli.command {
            Command::Info(args) => assert_eq!(args.image, Some(PathBuf::from("out.gba"))),
            _ => panic!("expected info"),
        }
    }

    #[test]
    fn test_missing_command() {
        assert!(Cli::try_parse_from(["gbampy"]).is_err());
    }
}
