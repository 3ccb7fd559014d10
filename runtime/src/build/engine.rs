//! Build engine producing a ROM from a project tree.
//!
//! One linear pass: run the before-build hook, map the source tree, format
//! the template's filesystem region, populate it, save the patched ROM and
//! run the after-build hook. Any failure aborts the build; nothing is
//! written before the final save.

use std::path::{Path, PathBuf};

use gbampy_core::error::{GbaError, Result};
use gbampy_core::ProjectConfig;

use crate::hooks::{run_hook, HookResolver};
use crate::image::{ImageBuilder, DEFAULT_BLOCK_SIZE};
use crate::mapper::{list_files, FileItem};
use crate::rom::Container;
use crate::tools::ScriptCompiler;

/// Progress of a build invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BuildStage {
    Init,
    Mapped,
    Formatted,
    Populated,
    Saved,
}

impl std::fmt::Display for BuildStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Mapped => "mapped",
            Self::Formatted => "formatted",
            Self::Populated => "populated",
            Self::Saved => "saved",
        };
        f.write_str(name)
    }
}

/// Result of a successful build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildResult {
    /// Path of the written ROM
    pub output: PathBuf,
    /// Directories created in the image
    pub directories: usize,
    /// Files written to the image, compiled ones included
    pub files: usize,
    /// Scripts written in compiled form
    pub compiled: usize,
    pub block_size: u32,
    pub block_count: u32,
    /// Size of the reserved region in bytes
    pub capacity: usize,
}

#[derive(Debug, Default)]
struct PopulateStats {
    directories: usize,
    files: usize,
    compiled: usize,
}

/// Drives one build over a project configuration.
pub struct BuildEngine<'a> {
    config: &'a ProjectConfig,
    compiler: &'a dyn ScriptCompiler,
    hooks: &'a dyn HookResolver,
    stage: BuildStage,
}

impl<'a> BuildEngine<'a> {
    pub fn new(
        config: &'a ProjectConfig,
        compiler: &'a dyn ScriptCompiler,
        hooks: &'a dyn HookResolver,
    ) -> Self {
        Self {
            config,
            compiler,
            hooks,
            stage: BuildStage::Init,
        }
    }

    /// The last stage reached.
    pub fn stage(&self) -> BuildStage {
        self.stage
    }

    fn advance(&mut self, stage: BuildStage) {
        self.stage = stage;
        tracing::info!(stage = %stage, "Build stage reached");
    }

    /// Run every stage in order.
    pub fn run(&mut self) -> Result<BuildResult> {
        run_hook(&self.config.hooks.before_build, self.hooks, self.config)?;

        let items = list_files(self.config)?;
        self.advance(BuildStage::Mapped);

        let template = self.config.template_path();
        let mut container = Container::load(&template)?;
        container.format(DEFAULT_BLOCK_SIZE, None)?;
        self.advance(BuildStage::Formatted);

        let stats = populate(container.image_mut()?, &items, self.compiler)?;
        self.advance(BuildStage::Populated);

        let output = self.config.output_path();
        container.save(&output)?;
        self.advance(BuildStage::Saved);

        run_hook(&self.config.hooks.after_build, self.hooks, self.config)?;

        let image = container.image()?;
        Ok(BuildResult {
            output,
            directories: stats.directories,
            files: stats.files,
            compiled: stats.compiled,
            block_size: image.block_size(),
            block_count: image.block_count(),
            capacity: image.buffer().len(),
        })
    }
}

/// Build the project described by `config`.
pub fn build(
    config: &ProjectConfig,
    compiler: &dyn ScriptCompiler,
    hooks: &dyn HookResolver,
) -> Result<BuildResult> {
    BuildEngine::new(config, compiler, hooks).run()
}

fn populate(
    image: &mut ImageBuilder,
    items: &[FileItem],
    compiler: &dyn ScriptCompiler,
) -> Result<PopulateStats> {
    let mut stats = PopulateStats::default();
    for item in items {
        let target = item.target_path.as_str();
        if item.is_directory {
            image.make_directory(target)?;
            stats.directories += 1;
            continue;
        }

        let content = if item.needs_compile {
            stats.compiled += 1;
            compiler.compile(&item.source_path)?
        } else {
            read_source(&item.source_path)?
        };
        image.write_file(target, &content)?;
        stats.files += 1;
        tracing::debug!(
            source = %item.source_path.display(),
            target,
            compiled = item.needs_compile,
            "Placed file"
        );
    }
    Ok(stats)
}

fn read_source(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => GbaError::SourceNotFound {
            path: path.to_path_buf(),
        },
        _ => GbaError::IoError(e),
    })
}
