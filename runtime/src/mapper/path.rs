//! Paths inside the filesystem image.

use std::path::{Component, Path};

use gbampy_core::error::{GbaError, Result};

/// An absolute, normalized `/`-separated path inside the image.
///
/// Never empty and never ends with `/` except for the root itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImagePath(String);

impl ImagePath {
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Normalize a root-relative path; `.`, `app/`, `/app` all work.
    pub fn new(path: &str) -> Self {
        let mut parts: Vec<&str> = Vec::new();
        for part in path.split('/') {
            match part {
                "" | "." => {}
                ".." => {
                    parts.pop();
                }
                other => parts.push(other),
            }
        }
        Self::from_parts(parts)
    }

    fn from_parts<S: AsRef<str>>(parts: impl IntoIterator<Item = S>) -> Self {
        let mut path = String::new();
        for part in parts {
            path.push('/');
            path.push_str(part.as_ref());
        }
        if path.is_empty() {
            path.push('/');
        }
        Self(path)
    }

    /// Append the normal components of a relative host path.
    ///
    /// Fails on names that are not valid UTF-8.
    pub fn join_host(&self, relative: &Path) -> Result<Self> {
        let mut joined = self.0.trim_end_matches('/').to_string();
        for component in relative.components() {
            if let Component::Normal(name) = component {
                let name = name.to_str().ok_or_else(|| GbaError::NonUtf8Path {
                    path: relative.to_path_buf(),
                })?;
                joined.push('/');
                joined.push_str(name);
            }
        }
        if joined.is_empty() {
            joined.push('/');
        }
        Ok(Self(joined))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Last component, empty for the root.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or("")
    }

    /// Extension of the last component, without the dot.
    ///
    /// A leading dot (`.env`) does not start an extension.
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name();
        match name.rfind('.') {
            Some(0) | None => None,
            Some(dot) => Some(&name[dot + 1..]),
        }
    }

    /// Replace (or add) the extension of the last component.
    pub fn with_extension(&self, extension: &str) -> Self {
        let name = self.file_name();
        let stem_len = match name.rfind('.') {
            Some(0) | None => name.len(),
            Some(dot) => dot,
        };
        let prefix_len = self.0.len() - name.len();
        let mut path = self.0[..prefix_len + stem_len].to_string();
        path.push('.');
        path.push_str(extension);
        Self(path)
    }

    /// This path relative to `base`, or `None` if it lies outside.
    ///
    /// `base` itself is the empty string.
    pub fn relative_to(&self, base: &ImagePath) -> Option<&str> {
        if base.is_root() {
            return Some(&self.0[1..]);
        }
        let rest = self.0.strip_prefix(base.as_str())?;
        if rest.is_empty() {
            Some(rest)
        } else {
            rest.strip_prefix('/')
        }
    }
}

impl std::fmt::Display for ImagePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ImagePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
