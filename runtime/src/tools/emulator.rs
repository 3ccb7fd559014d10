//! GBA emulator launcher.

use std::path::{Path, PathBuf};
use std::process::Command;

use gbampy_core::error::{GbaError, Result};
use gbampy_core::ProjectConfig;

use super::locate::find_program;

#[derive(Debug, Clone)]
pub struct GbaEmulator {
    name: String,
    program: Option<PathBuf>,
    params: Vec<String>,
}

impl GbaEmulator {
    pub fn new(name: impl Into<String>, program: Option<PathBuf>, params: Vec<String>) -> Self {
        Self {
            name: name.into(),
            program,
            params,
        }
    }

    /// The configured emulator, as a path relative to the project or a name on `PATH`.
    pub fn from_config(config: &ProjectConfig) -> Result<Self> {
        let params = config.emulator_params()?;
        let Some(name) = config.emulator() else {
            return Ok(Self::new("GBA emulator", None, params));
        };
        let program = find_program(Some(config.base_dir.join(name).as_path()), name);
        Ok(Self::new(name, program, params))
    }

    pub fn program(&self) -> Option<&Path> {
        self.program.as_deref()
    }

    /// Launch the emulator on `rom` and wait for it to exit.
    pub fn run(&self, rom: &Path) -> Result<()> {
        let program = self.program.as_ref().ok_or_else(|| GbaError::ExternalToolNotFound {
            tool: self.name.clone(),
        })?;
        if !rom.exists() {
            return Err(GbaError::SourceNotFound {
                path: rom.to_path_buf(),
            });
        }

        tracing::info!(emulator = %program.display(), rom = %rom.display(), "Starting emulator");
        let status = Command::new(program)
            .args(&self.params)
            .arg(rom)
            .status()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => GbaError::ExternalToolNotFound {
                    tool: self.name.clone(),
                },
                _ => GbaError::IoError(e),
            })?;
        tracing::info!(%status, "Emulator exited");
        Ok(())
    }
}
