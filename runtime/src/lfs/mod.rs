//! LittleFS module - embedded filesystem engine integration.
//!
//! This module provides a safe wrapper around the `littlefs2-sys` FFI
//! bindings, running LittleFS against an in-memory block device.

mod context;
mod device;

pub use context::{LfsContext, LfsGeometry};
pub use device::RamBlockDevice;

/// Read and program granularity handed to LittleFS.
pub const IO_SIZE: u32 = 16;

/// Smallest block size LittleFS accepts.
pub const MIN_BLOCK_SIZE: u32 = 128;

/// Lookahead bitmap size in bytes.
pub const LOOKAHEAD_SIZE: u32 = 32;

// Open flags from lfs.h
pub(crate) const LFS_O_RDONLY: i32 = 0x1;
pub(crate) const LFS_O_WRONLY: i32 = 0x2;
pub(crate) const LFS_O_CREAT: i32 = 0x0100;
pub(crate) const LFS_O_TRUNC: i32 = 0x0400;

// Error codes from lfs.h
pub const LFS_ERR_OK: i32 = 0;
pub const LFS_ERR_IO: i32 = -5;
pub const LFS_ERR_CORRUPT: i32 = -84;
pub const LFS_ERR_NOENT: i32 = -2;
pub const LFS_ERR_EXIST: i32 = -17;
pub const LFS_ERR_NOTDIR: i32 = -20;
pub const LFS_ERR_ISDIR: i32 = -21;
pub const LFS_ERR_NOTEMPTY: i32 = -39;
pub const LFS_ERR_BADF: i32 = -9;
pub const LFS_ERR_FBIG: i32 = -27;
pub const LFS_ERR_INVAL: i32 = -22;
pub const LFS_ERR_NOSPC: i32 = -28;
pub const LFS_ERR_NOMEM: i32 = -12;
pub const LFS_ERR_NOATTR: i32 = -61;
pub const LFS_ERR_NAMETOOLONG: i32 = -36;

/// A failed LittleFS call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LfsError {
    /// The `lfs_*` entry point that failed.
    pub call: &'static str,
    /// Negative status code it returned.
    pub code: i32,
}

impl LfsError {
    /// Symbolic name of the status code.
    pub fn name(&self) -> &'static str {
        match self.code {
            LFS_ERR_IO => "LFS_ERR_IO",
            LFS_ERR_CORRUPT => "LFS_ERR_CORRUPT",
            LFS_ERR_NOENT => "LFS_ERR_NOENT",
            LFS_ERR_EXIST => "LFS_ERR_EXIST",
            LFS_ERR_NOTDIR => "LFS_ERR_NOTDIR",
            LFS_ERR_ISDIR => "LFS_ERR_ISDIR",
            LFS_ERR_NOTEMPTY => "LFS_ERR_NOTEMPTY",
            LFS_ERR_BADF => "LFS_ERR_BADF",
            LFS_ERR_FBIG => "LFS_ERR_FBIG",
            LFS_ERR_INVAL => "LFS_ERR_INVAL",
            LFS_ERR_NOSPC => "LFS_ERR_NOSPC",
            LFS_ERR_NOMEM => "LFS_ERR_NOMEM",
            LFS_ERR_NOATTR => "LFS_ERR_NOATTR",
            LFS_ERR_NAMETOOLONG => "LFS_ERR_NAMETOOLONG",
            _ => "LFS_ERR_UNKNOWN",
        }
    }
}

impl std::fmt::Display for LfsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} returned {} ({})", self.call, self.name(), self.code)
    }
}

/// Check a LittleFS status and convert it to a Result.
///
/// Non-negative values (byte counts, `LFS_ERR_OK`) pass through.
pub fn check_status(call: &'static str, status: i32) -> std::result::Result<i32, LfsError> {
    if status < LFS_ERR_OK {
        tracing::debug!(status, call, "LittleFS call failed");
        Err(LfsError { call, code: status })
    } else {
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_status_passes_counts() {
        assert_eq!(check_status("lfs_file_write", 42), Ok(42));
        assert_eq!(check_status("lfs_mount", LFS_ERR_OK), Ok(0));
    }

    #[test]
    fn test_check_status_decodes_error() {
        let err = check_status("lfs_file_write", LFS_ERR_NOSPC).unwrap_err();
        assert_eq!(err.code, -28);
        assert_eq!(err.name(), "LFS_ERR_NOSPC");
        assert_eq!(
            err.to_string(),
            "lfs_file_write returned LFS_ERR_NOSPC (-28)"
        );
    }

    #[test]
    fn test_unknown_code_name() {
        let err = LfsError {
            call: "lfs_format",
            code: -1000,
        };
        assert_eq!(err.name(), "LFS_ERR_UNKNOWN");
    }
}
