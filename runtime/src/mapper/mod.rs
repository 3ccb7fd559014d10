//! Source tree to image path mapping.
//!
//! Produces the ordered [`FileItem`] plan for one build: which host files
//! end up where inside the image, and which scripts get compiled.

mod ignore;
mod path;

pub use ignore::IgnoreSet;
pub use path::ImagePath;

use std::path::{Path, PathBuf};

use gbampy_core::error::{GbaError, Result};
use gbampy_core::ProjectConfig;

/// Extension of scripts handed to the compiler (compared case-insensitively).
pub const SCRIPT_EXTENSION: &str = "py";

/// Extension of compiled scripts.
pub const COMPILED_EXTENSION: &str = "mpy";

/// One planned placement inside the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileItem {
    pub source_path: PathBuf,
    pub target_path: ImagePath,
    pub is_directory: bool,
    pub needs_compile: bool,
}

/// Maps host paths under a source root onto a target root in the image.
#[derive(Debug, Clone)]
pub struct PathMapper {
    source_root: PathBuf,
    target_root: ImagePath,
    project_ignore: IgnoreSet,
    compile: bool,
    compile_ignore: IgnoreSet,
}

impl PathMapper {
    /// Create a mapper with no ignore patterns and compilation off.
    pub fn new(source_root: impl Into<PathBuf>, target_root: &str) -> Self {
        Self {
            source_root: source_root.into(),
            target_root: ImagePath::new(target_root),
            project_ignore: IgnoreSet::default(),
            compile: false,
            compile_ignore: IgnoreSet::default(),
        }
    }

    /// Build a mapper from the project configuration.
    pub fn from_config(config: &ProjectConfig) -> Result<Self> {
        Ok(Self::new(config.source_dir()?, config.target_dir())
            .with_project_ignore(IgnoreSet::new(config.project_ignore_patterns())?)
            .with_compile(
                config.compile_enabled(),
                IgnoreSet::new(config.compile_ignore_patterns())?,
            ))
    }

    /// Exclude matching entries from the image.
    pub fn with_project_ignore(mut self, patterns: IgnoreSet) -> Self {
        self.project_ignore = patterns;
        self
    }

    /// Enable or disable compilation; matching scripts are copied instead.
    pub fn with_compile(mut self, enabled: bool, ignore: IgnoreSet) -> Self {
        self.compile = enabled;
        self.compile_ignore = ignore;
        self
    }

    /// Rebase `source` from the source root onto the target root.
    pub fn to_target_path(&self, source: &Path) -> Result<ImagePath> {
        let relative = source
            .strip_prefix(&self.source_root)
            .map_err(|_| GbaError::OutOfScopePath {
                path: source.to_path_buf(),
                root: self.source_root.clone(),
            })?;
        self.target_root.join_host(relative)
    }

    /// Whether `target`, taken relative to the target root, matches `patterns`.
    pub fn should_ignore(&self, target: &ImagePath, patterns: &IgnoreSet) -> bool {
        match target.relative_to(&self.target_root) {
            Some(relative) => patterns.matches(relative),
            None => false,
        }
    }

    /// Plan a single file, resolving its compile decision.
    pub fn map_file(&self, source: &Path) -> Result<FileItem> {
        let target = self.to_target_path(source)?;
        let is_script = target
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(SCRIPT_EXTENSION));
        let needs_compile =
            self.compile && is_script && !self.should_ignore(&target, &self.compile_ignore);

        let target_path = if needs_compile {
            target.with_extension(COMPILED_EXTENSION)
        } else {
            target
        };
        Ok(FileItem {
            source_path: source.to_path_buf(),
            target_path,
            is_directory: false,
            needs_compile,
        })
    }

    fn is_ignored(&self, item: &FileItem) -> bool {
        if self.project_ignore.is_empty() {
            return false;
        }
        if self.should_ignore(&item.target_path, &self.project_ignore) {
            return true;
        }
        // a compiled script is also ignored under its source name
        item.needs_compile
            && self
                .to_target_path(&item.source_path)
                .is_ok_and(|original| self.should_ignore(&original, &self.project_ignore))
    }

    /// Walk the source root and plan every placement.
    ///
    /// Directories come before their contents. Children are visited in the
    /// order the host filesystem lists them, which is stable between runs
    /// on an unchanged tree. Ignored directories are not descended into.
    pub fn list_files(&self) -> Result<Vec<FileItem>> {
        let mut items = Vec::new();
        if self.source_root.is_dir() {
            self.walk_dir(&self.source_root, &mut items)?;
        } else if self.source_root.exists() {
            items.push(self.map_file(&self.source_root)?);
        } else {
            return Err(GbaError::SourceNotFound {
                path: self.source_root.clone(),
            });
        }
        tracing::debug!(count = items.len(), "Mapped source tree");
        Ok(items)
    }

    fn walk_dir(&self, dir: &Path, items: &mut Vec<FileItem>) -> Result<()> {
        items.push(FileItem {
            source_path: dir.to_path_buf(),
            target_path: self.to_target_path(dir)?,
            is_directory: true,
            needs_compile: false,
        });

        let read_dir = std::fs::read_dir(dir).map_err(|e| {
            tracing::error!(path = %dir.display(), error = %e, "Failed to read directory");
            GbaError::IoError(e)
        })?;

        for entry in read_dir {
            let path = entry?.path();
            if path.is_dir() {
                let target = self.to_target_path(&path)?;
                if self.should_ignore(&target, &self.project_ignore) {
                    tracing::debug!(path = %target, "Ignored directory");
                    continue;
                }
                self.walk_dir(&path, items)?;
            } else {
                let item = self.map_file(&path)?;
                if self.is_ignored(&item) {
                    tracing::debug!(path = %item.target_path, "Ignored file");
                    continue;
                }
                items.push(item);
            }
        }
        Ok(())
    }
}

/// Plan the image contents for a project.
pub fn list_files(config: &ProjectConfig) -> Result<Vec<FileItem>> {
    PathMapper::from_config(config)?.list_files()
}
