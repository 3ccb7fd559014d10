//! Executable lookup.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Resolve an external program.
///
/// A configured path that is a regular file wins; otherwise `fallback` is
/// searched on `PATH`.
pub fn find_program(configured: Option<&Path>, fallback: &str) -> Option<PathBuf> {
    if let Some(path) = configured {
        if path.is_file() {
            return Some(path.to_path_buf());
        }
        tracing::debug!(path = %path.display(), "Configured program not found, searching PATH");
    }
    which(fallback)
}

/// Search `PATH` for an executable named `name`.
pub fn which(name: &str) -> Option<PathBuf> {
    let paths = std::env::var_os("PATH")?;
    which_in(name, &paths)
}

/// Search a `PATH`-style list of directories for `name`.
pub fn which_in(name: &str, paths: &OsStr) -> Option<PathBuf> {
    if name.is_empty() {
        return None;
    }

    let direct = Path::new(name);
    if direct.components().count() > 1 {
        return is_executable(direct).then(|| direct.to_path_buf());
    }

    for dir in std::env::split_paths(paths) {
        for candidate in candidates(&dir, name) {
            if is_executable(&candidate) {
                return Some(candidate);
            }
        }
    }
    None
}

#[cfg(windows)]
fn candidates(dir: &Path, name: &str) -> Vec<PathBuf> {
    let exts = std::env::var("PATHEXT").unwrap_or_else(|_| ".EXE;.CMD;.BAT;.COM".to_string());
    let mut found = vec![dir.join(name)];
    found.extend(
        exts.split(';')
            .filter(|ext| !ext.is_empty())
            .map(|ext| dir.join(format!("{name}{ext}"))),
    );
    found
}

#[cfg(not(windows))]
fn candidates(dir: &Path, name: &str) -> Vec<PathBuf> {
    vec![dir.join(name)]
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
