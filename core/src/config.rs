//! Project configuration (`.gbampy.toml`).
//!
//! Every key has a default, so a project without a configuration file
//! still resolves to a usable (if minimal) configuration. Relative paths
//! are resolved against the directory that holds the configuration file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{GbaError, Result};

/// Name of the configuration file looked up inside a workspace directory.
pub const DEFAULT_CONFIG_FILENAME: &str = ".gbampy.toml";

/// Resolved project configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Directory containing the configuration file; relative paths resolve here.
    #[serde(skip)]
    pub base_dir: PathBuf,

    /// Source tree settings
    #[serde(default)]
    pub project: ProjectSection,

    /// Cross-compiler settings
    #[serde(default, rename = "mpy-cross")]
    pub mpy_cross: MpyCrossSection,

    /// ROM template, output and emulator settings
    #[serde(default)]
    pub gba: GbaSection,

    /// Before/after build hooks
    #[serde(default)]
    pub hooks: HookSection,
}

/// `[project]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSection {
    /// Host directory whose contents go into the image
    #[serde(default = "current_dir_str")]
    pub source_dir: String,

    /// Directory inside the image, relative to its root
    #[serde(default = "current_dir_str")]
    pub target_dir: String,

    /// Glob patterns excluding entries from the image
    #[serde(default, rename = "ignore-pattern")]
    pub ignore_pattern: Vec<String>,
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            source_dir: current_dir_str(),
            target_dir: current_dir_str(),
            ignore_pattern: Vec::new(),
        }
    }
}

/// `[mpy-cross]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MpyCrossSection {
    /// Compile `.py` scripts to `.mpy` before placing them
    #[serde(default)]
    pub compile: bool,

    /// Explicit path to the `mpy-cross` executable
    #[serde(default)]
    pub path: Option<String>,

    /// Extra compiler arguments, shell-quoted
    #[serde(default)]
    pub params: String,

    /// Glob patterns for scripts copied verbatim instead of compiled
    #[serde(default, rename = "ignore-pattern")]
    pub ignore_pattern: Vec<String>,
}

/// `[gba]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GbaSection {
    /// MicroPython ROM template carrying the reserved filesystem region
    #[serde(default = "current_dir_str")]
    pub template: String,

    /// Where the patched ROM is written
    #[serde(default = "current_dir_str")]
    pub output: String,

    /// Emulator executable (path or program name)
    #[serde(default)]
    pub emulator: Option<String>,

    /// Extra emulator arguments, shell-quoted
    #[serde(default)]
    pub params: String,
}

impl Default for GbaSection {
    fn default() -> Self {
        Self {
            template: current_dir_str(),
            output: current_dir_str(),
            emulator: None,
            params: String::new(),
        }
    }
}

/// `[hooks]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookSection {
    /// `module:function` invoked before the source tree is mapped
    #[serde(default, rename = "before-build")]
    pub before_build: String,

    /// `module:function` invoked after the output image is saved
    #[serde(default, rename = "after-build")]
    pub after_build: String,
}

fn current_dir_str() -> String {
    ".".to_string()
}

impl ProjectConfig {
    /// Load configuration from a file, or from `.gbampy.toml` inside a directory.
    ///
    /// A missing file yields the defaults.
    pub fn load(config_file_or_dir: impl AsRef<Path>) -> Result<Self> {
        let given = config_file_or_dir.as_ref();
        let (config_path, base_dir) = if given.is_dir() {
            (given.join(DEFAULT_CONFIG_FILENAME), given.to_path_buf())
        } else {
            let parent = match given.parent() {
                Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
                _ => PathBuf::from("."),
            };
            (given.to_path_buf(), parent)
        };

        if !config_path.is_file() {
            tracing::warn!(
                path = %config_path.display(),
                "Configuration file not found, using defaults"
            );
            return Ok(Self {
                base_dir,
                ..Self::default()
            });
        }

        let content = std::fs::read_to_string(&config_path).map_err(|e| {
            GbaError::ConfigError(format!(
                "Failed to read {}: {}",
                config_path.display(),
                e
            ))
        })?;
        tracing::debug!(path = %config_path.display(), "Loaded configuration");
        Self::from_toml_str(&content, base_dir)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str, base_dir: impl Into<PathBuf>) -> Result<Self> {
        let mut config: ProjectConfig = toml::from_str(content)?;
        config.base_dir = base_dir.into();
        Ok(config)
    }

    fn resolve(&self, relative: &str) -> PathBuf {
        self.base_dir.join(relative)
    }

    /// Absolute project source directory.
    pub fn source_dir(&self) -> Result<PathBuf> {
        let dir = self.resolve(&self.project.source_dir);
        dir.canonicalize()
            .map_err(|_| GbaError::SourceNotFound { path: dir })
    }

    /// Target root inside the image, as configured (root-relative).
    pub fn target_dir(&self) -> &str {
        &self.project.target_dir
    }

    /// Patterns excluding entries from the image.
    pub fn project_ignore_patterns(&self) -> &[String] {
        &self.project.ignore_pattern
    }

    /// Whether `.py` scripts are compiled.
    pub fn compile_enabled(&self) -> bool {
        self.mpy_cross.compile
    }

    /// Patterns suppressing compilation.
    pub fn compile_ignore_patterns(&self) -> &[String] {
        &self.mpy_cross.ignore_pattern
    }

    /// Configured compiler path, if any.
    pub fn mpy_cross_path(&self) -> Option<PathBuf> {
        self.mpy_cross.path.as_deref().map(|p| self.resolve(p))
    }

    /// Extra compiler arguments.
    pub fn mpy_cross_params(&self) -> Result<Vec<String>> {
        split_params("mpy-cross.params", &self.mpy_cross.params)
    }

    /// ROM template path.
    pub fn template_path(&self) -> PathBuf {
        self.resolve(&self.gba.template)
    }

    /// Output ROM path.
    pub fn output_path(&self) -> PathBuf {
        self.resolve(&self.gba.output)
    }

    /// Configured emulator, as written in the file.
    pub fn emulator(&self) -> Option<&str> {
        self.gba.emulator.as_deref().filter(|e| !e.trim().is_empty())
    }

    /// Extra emulator arguments.
    pub fn emulator_params(&self) -> Result<Vec<String>> {
        split_params("gba.params", &self.gba.params)
    }
}

fn split_params(key: &str, value: &str) -> Result<Vec<String>> {
    shell_words::split(value)
        .map_err(|e| GbaError::ConfigError(format!("Invalid {key} '{value}': {e}")))
}
