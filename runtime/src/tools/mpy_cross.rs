//! MicroPython cross-compiler wrapper.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use gbampy_core::error::{GbaError, Result};
use gbampy_core::ProjectConfig;

use super::locate::find_program;

/// Turns a source script into compiled bytes.
pub trait ScriptCompiler {
    fn compile(&self, source: &Path) -> Result<Vec<u8>>;
}

impl<F> ScriptCompiler for F
where
    F: Fn(&Path) -> Result<Vec<u8>>,
{
    fn compile(&self, source: &Path) -> Result<Vec<u8>> {
        self(source)
    }
}

/// `mpy-cross` run as a child process.
#[derive(Debug, Clone)]
pub struct MpyCross {
    program: Option<PathBuf>,
    params: Vec<String>,
}

impl MpyCross {
    pub const PROGRAM: &'static str = "mpy-cross";

    /// Use `program` (if found) with extra `params` before the fixed arguments.
    pub fn new(program: Option<PathBuf>, params: Vec<String>) -> Self {
        Self { program, params }
    }

    /// Locate the compiler from the configured path, else `PATH`.
    ///
    /// A compiler that cannot be found is reported on first use.
    pub fn from_config(config: &ProjectConfig) -> Result<Self> {
        let program = find_program(config.mpy_cross_path().as_deref(), Self::PROGRAM);
        match &program {
            Some(path) => tracing::debug!(path = %path.display(), "Using mpy-cross"),
            None => tracing::debug!("mpy-cross not found"),
        }
        Ok(Self::new(program, config.mpy_cross_params()?))
    }

    pub fn program(&self) -> Option<&Path> {
        self.program.as_deref()
    }
}

impl ScriptCompiler for MpyCross {
    fn compile(&self, source: &Path) -> Result<Vec<u8>> {
        let program = self.program.as_ref().ok_or_else(|| GbaError::ExternalToolNotFound {
            tool: Self::PROGRAM.to_string(),
        })?;
        if !source.exists() {
            return Err(GbaError::SourceNotFound {
                path: source.to_path_buf(),
            });
        }

        let output_path = tempfile::Builder::new()
            .prefix("gbampy-")
            .suffix(".mpy")
            .tempfile()?
            .into_temp_path();
        let file_name = source.file_name().unwrap_or(source.as_os_str());

        let output = Command::new(program)
            .args(&self.params)
            .arg("-o")
            .arg(&output_path)
            .arg("-s")
            .arg(file_name)
            .arg(source)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => GbaError::ExternalToolNotFound {
                    tool: program.display().to_string(),
                },
                _ => GbaError::IoError(e),
            })?;

        if !output.status.success() {
            tracing::debug!(source = %source.display(), status = %output.status, "mpy-cross failed");
            return Err(GbaError::CompileError {
                script: source.to_path_buf(),
                diagnostics: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let compiled = std::fs::read(&output_path)?;
        tracing::debug!(source = %source.display(), len = compiled.len(), "Compiled script");
        Ok(compiled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_compiler_reported_on_use() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("main.py");
        std::fs::write(&source, "print(1)").unwrap();

        let compiler = MpyCross::new(None, Vec::new());
        let err = compiler.compile(&source).unwrap_err();
        assert_eq!(
            err.to_string(),
            "'mpy-cross' not found, please make sure it is in your PATH or configured"
        );
    }

    #[test]
    fn test_closure_compiler() {
        let compiler = |source: &Path| -> Result<Vec<u8>> {
            Ok(source.file_name().unwrap().to_string_lossy().as_bytes().to_vec())
        };
        assert_eq!(compiler.compile(Path::new("/x/main.py")).unwrap(), b"main.py");
    }

    #[cfg(unix)]
    mod process {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        fn script(dir: &Path, body: &str) -> PathBuf {
            let path = dir.join("fake-mpy-cross");
            std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        #[test]
        fn test_compile_reads_output_file() {
            let dir = TempDir::new().unwrap();
            // args: [params..] -o OUT -s NAME SOURCE
            let program = script(dir.path(), r#"printf 'M6:%s:%s' "$1" "$5" > "$3""#);
            let source = dir.path().join("main.py");
            std::fs::write(&source, "print(1)").unwrap();

            let compiler = MpyCross::new(Some(program), vec!["-O2".to_string()]);
            let compiled = compiler.compile(&source).unwrap();
            assert_eq!(compiled, b"M6:-O2:main.py");
        }

        #[test]
        fn test_compile_error_carries_stderr() {
            let dir = TempDir::new().unwrap();
            let program = script(dir.path(), "echo 'SyntaxError: invalid syntax' >&2; exit 1");
            let source = dir.path().join("bad.py");
            std::fs::write(&source, "def").unwrap();

            let compiler = MpyCross::new(Some(program), Vec::new());
            match compiler.compile(&source).unwrap_err() {
                GbaError::CompileError {
                    script,
                    diagnostics,
                } => {
                    assert_eq!(script, source);
                    assert_eq!(diagnostics, "SyntaxError: invalid syntax\n");
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        #[test]
        fn test_missing_source() {
            let dir = TempDir::new().unwrap();
            let program = script(dir.path(), "exit 0");
            let compiler = MpyCross::new(Some(program), Vec::new());
            let err = compiler.compile(&dir.path().join("gone.py")).unwrap_err();
            assert!(matches!(err, GbaError::SourceNotFound { .. }));
        }

        #[test]
        fn test_from_config_uses_configured_path() {
            let dir = TempDir::new().unwrap();
            script(dir.path(), "exit 0");
            let config = ProjectConfig::from_toml_str(
                r#"
                [mpy-cross]
                path = "fake-mpy-cross"
                params = "-march=armv6m '-X emit=bytecode'"
                "#,
                dir.path(),
            )
            .unwrap();

            let compiler = MpyCross::from_config(&config).unwrap();
            assert_eq!(compiler.program(), Some(dir.path().join("fake-mpy-cross").as_path()));
            assert_eq!(compiler.params, vec!["-march=armv6m", "-X emit=bytecode"]);
        }
    }
}
