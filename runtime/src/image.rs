//! Filesystem image builder.
//!
//! Owns one LittleFS instance together with its block-device buffer. A
//! builder is created by formatting (or by mounting existing bytes) and is
//! replaced whole on every format; it is never reformatted in place.

use gbampy_core::error::{GbaError, Result};

use crate::lfs::{LfsContext, LfsError, LfsGeometry};

/// Block size used by the build pipeline.
pub const DEFAULT_BLOCK_SIZE: u32 = 512;

/// In-memory LittleFS image sized to a ROM's reserved region.
#[derive(Debug)]
pub struct ImageBuilder {
    ctx: LfsContext,
}

impl ImageBuilder {
    /// Format a fresh zero-filled image of exactly `capacity` bytes.
    ///
    /// Without an explicit `block_count`, as many whole blocks as fit in
    /// `capacity` are used; any remainder stays unused padding.
    pub fn format(capacity: usize, block_size: u32, block_count: Option<u32>) -> Result<Self> {
        let block_count = match block_count {
            Some(count) => count,
            None => derive_block_count(capacity, block_size)?,
        };
        let geometry = LfsGeometry {
            block_size,
            block_count,
        };
        geometry
            .validate(capacity)
            .map_err(|message| GbaError::FilesystemFormatError { message })?;

        let ctx = LfsContext::format(capacity, geometry).map_err(format_error)?;
        tracing::info!(capacity, block_size, block_count, "Formatted LittleFS image");
        Ok(Self { ctx })
    }

    /// Mount an already formatted image.
    pub fn open(image: Vec<u8>, block_size: u32, block_count: u32) -> Result<Self> {
        let geometry = LfsGeometry {
            block_size,
            block_count,
        };
        geometry
            .validate(image.len())
            .map_err(|message| GbaError::FilesystemFormatError { message })?;
        let ctx = LfsContext::mount(image, geometry).map_err(format_error)?;
        Ok(Self { ctx })
    }

    pub fn block_size(&self) -> u32 {
        self.ctx.geometry().block_size
    }

    pub fn block_count(&self) -> u32 {
        self.ctx.geometry().block_count
    }

    /// Image bytes; always the capacity the builder was created with.
    pub fn buffer(&self) -> &[u8] {
        self.ctx.device().as_bytes()
    }

    /// Create `path` and any missing ancestors. Existing directories are fine.
    pub fn make_directory(&mut self, path: &str) -> Result<()> {
        let mut current = String::new();
        for component in path.split('/').filter(|c| !c.is_empty()) {
            current.push('/');
            current.push_str(component);
            self.ctx
                .mkdir(&current, true)
                .map_err(|e| io_error(&current, e))?;
        }
        tracing::debug!(path, "Created directory");
        Ok(())
    }

    /// Create or truncate the file at `path` and write `content` to it.
    pub fn write_file(&mut self, path: &str, content: &[u8]) -> Result<()> {
        self.ctx
            .write_file(path, content)
            .map_err(|e| io_error(path, e))?;
        tracing::debug!(path, len = content.len(), "Wrote file");
        Ok(())
    }

    /// Read back the file at `path`.
    pub fn read_file(&mut self, path: &str) -> Result<Vec<u8>> {
        self.ctx.read_file(path).map_err(|e| io_error(path, e))
    }
}

fn derive_block_count(capacity: usize, block_size: u32) -> Result<u32> {
    if block_size == 0 {
        return Err(GbaError::FilesystemFormatError {
            message: "block size must be non-zero".to_string(),
        });
    }
    let count = capacity / block_size as usize;
    u32::try_from(count).map_err(|_| GbaError::FilesystemFormatError {
        message: format!("{count} blocks exceed the block count field"),
    })
}

fn format_error(e: LfsError) -> GbaError {
    GbaError::FilesystemFormatError {
        message: e.to_string(),
    }
}

fn io_error(path: &str, e: LfsError) -> GbaError {
    tracing::error!(path, error = %e, "LittleFS operation failed");
    GbaError::FilesystemIoError {
        path: path.to_string(),
        cause: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_block_count_floors() {
        let image = ImageBuilder::format(4096 + 300, 512, None).unwrap();
        assert_eq!(image.block_count(), 8);
        assert_eq!(image.buffer().len(), 4096 + 300);
    }

    #[test]
    fn test_auto_block_count_non_power_of_two() {
        let image = ImageBuilder::format(4096, 768, None).unwrap();
        assert_eq!(image.block_size(), 768);
        assert_eq!(image.block_count(), 5);
        assert_eq!(image.buffer().len(), 4096);
    }

    #[test]
    fn test_explicit_block_count_keeps_buffer_size() {
        let image = ImageBuilder::format(8192, 512, Some(4)).unwrap();
        assert_eq!(image.block_count(), 4);
        assert_eq!(image.buffer().len(), 8192);
    }

    #[test]
    fn test_block_count_too_large() {
        let err = ImageBuilder::format(4096, 512, Some(9)).unwrap_err();
        assert!(matches!(err, GbaError::FilesystemFormatError { .. }));
    }

    #[test]
    fn test_zero_block_size() {
        let err = ImageBuilder::format(4096, 0, None).unwrap_err();
        assert!(matches!(err, GbaError::FilesystemFormatError { .. }));
    }

    #[test]
    fn test_capacity_too_small() {
        let err = ImageBuilder::format(600, 512, None).unwrap_err();
        assert!(err.to_string().contains("at least 2"));
    }

    #[test]
    fn test_make_directory_creates_ancestors() {
        let mut image = ImageBuilder::format(8192, 512, None).unwrap();
        image.make_directory("/app/lib/vendor").unwrap();
        image.write_file("/app/lib/vendor/x.py", b"x = 1").unwrap();
        assert_eq!(image.read_file("/app/lib/vendor/x.py").unwrap(), b"x = 1");
    }

    #[test]
    fn test_make_directory_idempotent() {
        let mut image = ImageBuilder::format(4096, 512, None).unwrap();
        image.make_directory("/lib").unwrap();
        image.make_directory("/lib").unwrap();
        image.make_directory("/").unwrap();
    }

    #[test]
    fn test_write_without_parent_is_io_error() {
        let mut image = ImageBuilder::format(4096, 512, None).unwrap();
        let err = image.write_file("/missing/main.py", b"").unwrap_err();
        match err {
            GbaError::FilesystemIoError { path, cause } => {
                assert_eq!(path, "/missing/main.py");
                assert!(cause.contains("LFS_ERR_NOENT"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_device_full_is_io_error() {
        let mut image = ImageBuilder::format(4096, 512, None).unwrap();
        let err = image.write_file("/big.bin", &vec![0x5Au8; 64 * 1024]).unwrap_err();
        match err {
            GbaError::FilesystemIoError { cause, .. } => assert!(cause.contains("LFS_ERR_NOSPC")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_open_existing_image() {
        let bytes = {
            let mut image = ImageBuilder::format(4096, 512, None).unwrap();
            image.write_file("/boot.py", b"import main").unwrap();
            image.buffer().to_vec()
        };

        let mut reopened = ImageBuilder::open(bytes.clone(), 512, 8).unwrap();
        assert_eq!(reopened.buffer(), &bytes[..]);
        assert_eq!(reopened.read_file("/boot.py").unwrap(), b"import main");
    }
}
