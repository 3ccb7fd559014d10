//! Before/after build hooks.
//!
//! A hook is configured as `module:function`. How that pair becomes
//! something callable is up to a [`HookResolver`]: [`HookRegistry`] looks
//! it up among in-process closures, [`CommandHookResolver`] runs `module`
//! as a program that receives `function` as its first argument.

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use gbampy_core::error::{GbaError, Result};
use gbampy_core::ProjectConfig;

use crate::tools::find_program;

/// A parsed `module:function` hook specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookSpec {
    module: String,
    function: String,
}

impl HookSpec {
    /// Parse a hook specification. Blank means "no hook".
    pub fn parse(spec: &str) -> Result<Option<Self>> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Ok(None);
        }
        match spec.split_once(':') {
            Some((module, function)) if !module.trim().is_empty() && !function.trim().is_empty() => {
                Ok(Some(Self {
                    module: module.trim().to_string(),
                    function: function.trim().to_string(),
                }))
            }
            _ => Err(GbaError::InvalidHook {
                spec: spec.to_string(),
            }),
        }
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn function(&self) -> &str {
        &self.function
    }
}

impl std::fmt::Display for HookSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.module, self.function)
    }
}

/// A resolved hook.
pub trait Hook {
    fn invoke(&self, config: &ProjectConfig) -> Result<()>;
}

impl<F> Hook for F
where
    F: Fn(&ProjectConfig) -> Result<()>,
{
    fn invoke(&self, config: &ProjectConfig) -> Result<()> {
        self(config)
    }
}

/// Locates the function named by a hook specification.
pub trait HookResolver {
    fn resolve(&self, module: &str, function: &str) -> Result<Box<dyn Hook + '_>>;
}

type HookFn = Box<dyn Fn(&ProjectConfig) -> Result<()>>;

/// In-process hooks registered by name.
#[derive(Default)]
pub struct HookRegistry {
    hooks: HashMap<(String, String), HookFn>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, module: &str, function: &str, hook: F)
    where
        F: Fn(&ProjectConfig) -> Result<()> + 'static,
    {
        self.hooks
            .insert((module.to_string(), function.to_string()), Box::new(hook));
    }
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRegistry")
            .field("hooks", &self.hooks.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl HookResolver for HookRegistry {
    fn resolve(&self, module: &str, function: &str) -> Result<Box<dyn Hook + '_>> {
        let hook = self
            .hooks
            .get(&(module.to_string(), function.to_string()))
            .ok_or_else(|| GbaError::HookNotFound {
                hook: format!("{module}:{function}"),
                reason: "no such hook registered".to_string(),
            })?;
        Ok(Box::new(&**hook))
    }
}

/// Runs hooks as external programs.
///
/// `module` is an executable path relative to the project directory, or a
/// name on `PATH`. It is started with `function` as its only argument and
/// the configuration as JSON on stdin, from the project directory.
#[derive(Debug, Clone)]
pub struct CommandHookResolver {
    base_dir: PathBuf,
}

impl CommandHookResolver {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }
}

impl HookResolver for CommandHookResolver {
    fn resolve(&self, module: &str, function: &str) -> Result<Box<dyn Hook + '_>> {
        let program = find_program(Some(self.base_dir.join(module).as_path()), module).ok_or_else(|| {
            GbaError::HookNotFound {
                hook: format!("{module}:{function}"),
                reason: format!("program '{module}' not found"),
            }
        })?;
        Ok(Box::new(CommandHook {
            name: format!("{module}:{function}"),
            program,
            function: function.to_string(),
            working_dir: self.base_dir.clone(),
        }))
    }
}

struct CommandHook {
    name: String,
    program: PathBuf,
    function: String,
    working_dir: PathBuf,
}

impl Hook for CommandHook {
    fn invoke(&self, config: &ProjectConfig) -> Result<()> {
        let payload = serde_json::to_vec(config)?;

        let mut child = Command::new(&self.program)
            .arg(&self.function)
            .current_dir(&self.working_dir)
            .stdin(Stdio::piped())
            .spawn()
            .map_err(|e| GbaError::HookNotFound {
                hook: self.name.clone(),
                reason: e.to_string(),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            // a hook that ignores its input may exit before reading it
            if let Err(e) = stdin.write_all(&payload) {
                if e.kind() != std::io::ErrorKind::BrokenPipe {
                    drop(stdin);
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(e.into());
                }
            }
        }

        let status = child.wait()?;
        if !status.success() {
            return Err(GbaError::HookFailed {
                hook: self.name.clone(),
                reason: format!("exited with {status}"),
            });
        }
        Ok(())
    }
}

/// Parse `spec` and, unless blank, resolve and invoke it.
pub fn run_hook(spec: &str, resolver: &dyn HookResolver, config: &ProjectConfig) -> Result<()> {
    let Some(spec) = HookSpec::parse(spec)? else {
        return Ok(());
    };
    tracing::info!(hook = %spec, "Running hook");
    resolver
        .resolve(spec.module(), spec.function())?
        .invoke(config)
}
