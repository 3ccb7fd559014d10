//! Owned LittleFS instance over an in-memory block device.
//!
//! All unsafe code in this module wraps littlefs2-sys calls. The `lfs_t`
//! state, its configuration, the caches and the block device live in one
//! boxed allocation, so every pointer handed to C stays put for as long
//! as the context exists.

use std::ffi::{c_int, c_void, CString};
use std::{mem, ptr};

use littlefs2_sys as ll;

use super::{
    check_status, LfsError, RamBlockDevice, IO_SIZE, LFS_ERR_EXIST, LFS_ERR_FBIG, LFS_ERR_INVAL,
    LFS_ERR_NOSPC, LFS_O_CREAT, LFS_O_RDONLY, LFS_O_TRUNC, LFS_O_WRONLY, LOOKAHEAD_SIZE,
    MIN_BLOCK_SIZE,
};

/// Block geometry of a LittleFS image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LfsGeometry {
    pub block_size: u32,
    pub block_count: u32,
}

impl LfsGeometry {
    /// Check the geometry against LittleFS limits and a device of `capacity` bytes.
    pub fn validate(&self, capacity: usize) -> std::result::Result<(), String> {
        if self.block_size < MIN_BLOCK_SIZE {
            return Err(format!(
                "block size {} is below the minimum of {}",
                self.block_size, MIN_BLOCK_SIZE
            ));
        }
        if self.block_size % IO_SIZE != 0 {
            return Err(format!(
                "block size {} is not a multiple of {}",
                self.block_size, IO_SIZE
            ));
        }
        if self.block_count < 2 {
            return Err(format!(
                "{} block(s) of {} bytes; LittleFS needs at least 2",
                self.block_count, self.block_size
            ));
        }
        let needed = self.block_size as u64 * self.block_count as u64;
        if needed > capacity as u64 {
            return Err(format!(
                "{} blocks of {} bytes need {} bytes, region holds {}",
                self.block_count, self.block_size, needed, capacity
            ));
        }
        Ok(())
    }
}

struct Inner {
    lfs: ll::lfs_t,
    config: ll::lfs_config,
    device: RamBlockDevice,
    read_cache: Vec<u8>,
    prog_cache: Vec<u8>,
    lookahead: Vec<u64>,
    file_cache: Vec<u8>,
}

/// Thin wrapper that owns a mounted LittleFS instance and its block device.
pub struct LfsContext {
    inner: Box<Inner>,
    geometry: LfsGeometry,
    mounted: bool,
}

impl std::fmt::Debug for LfsContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LfsContext")
            .field("geometry", &self.geometry)
            .field("device_len", &self.inner.device.len())
            .field("mounted", &self.mounted)
            .finish()
    }
}

impl LfsContext {
    fn with_device(device: RamBlockDevice, geometry: LfsGeometry) -> Result<Self, LfsError> {
        if geometry.validate(device.len()).is_err() {
            return Err(LfsError {
                call: "lfs_config",
                code: LFS_ERR_INVAL,
            });
        }

        let cache_size = geometry.block_size as usize;
        let mut inner = Box::new(Inner {
            // SAFETY: both are plain C structs for which all-zero is the unset state
            lfs: unsafe { mem::zeroed() },
            config: unsafe { mem::zeroed() },
            device,
            read_cache: vec![0; cache_size],
            prog_cache: vec![0; cache_size],
            lookahead: vec![0; (LOOKAHEAD_SIZE / 8) as usize],
            file_cache: vec![0; cache_size],
        });

        let context = ptr::addr_of_mut!(inner.device).cast::<c_void>();
        let read_buffer = inner.read_cache.as_mut_ptr().cast::<c_void>();
        let prog_buffer = inner.prog_cache.as_mut_ptr().cast::<c_void>();
        let lookahead_buffer = inner.lookahead.as_mut_ptr().cast::<c_void>();

        let config = &mut inner.config;
        config.context = context;
        config.read = Some(lfs_read);
        config.prog = Some(lfs_prog);
        config.erase = Some(lfs_erase);
        config.sync = Some(lfs_sync);
        config.read_size = IO_SIZE;
        config.prog_size = IO_SIZE;
        config.block_size = geometry.block_size;
        config.block_count = geometry.block_count;
        config.block_cycles = -1;
        config.cache_size = geometry.block_size;
        config.lookahead_size = LOOKAHEAD_SIZE;
        config.read_buffer = read_buffer;
        config.prog_buffer = prog_buffer;
        config.lookahead_buffer = lookahead_buffer;

        Ok(Self {
            inner,
            geometry,
            mounted: false,
        })
    }

    /// Format a fresh zero-filled device of `capacity` bytes and mount it.
    pub fn format(capacity: usize, geometry: LfsGeometry) -> Result<Self, LfsError> {
        let mut ctx = Self::with_device(
            RamBlockDevice::zeroed(capacity, geometry.block_size),
            geometry,
        )?;
        tracing::trace!(capacity, ?geometry, "Calling lfs_format");
        let inner = &mut *ctx.inner;
        // SAFETY: lfs and config point into the boxed Inner, which outlives the call
        check_status("lfs_format", unsafe {
            ll::lfs_format(ptr::addr_of_mut!(inner.lfs), ptr::addr_of!(inner.config))
        })?;
        ctx.mount_device()?;
        Ok(ctx)
    }

    /// Mount an existing image.
    pub fn mount(image: Vec<u8>, geometry: LfsGeometry) -> Result<Self, LfsError> {
        let mut ctx = Self::with_device(
            RamBlockDevice::from_bytes(image, geometry.block_size),
            geometry,
        )?;
        ctx.mount_device()?;
        Ok(ctx)
    }

    fn mount_device(&mut self) -> Result<(), LfsError> {
        let inner = &mut *self.inner;
        // SAFETY: see format()
        check_status("lfs_mount", unsafe {
            ll::lfs_mount(ptr::addr_of_mut!(inner.lfs), ptr::addr_of!(inner.config))
        })?;
        self.mounted = true;
        Ok(())
    }

    pub fn geometry(&self) -> LfsGeometry {
        self.geometry
    }

    /// The backing block device.
    pub fn device(&self) -> &RamBlockDevice {
        &self.inner.device
    }

    /// Create one directory; its parent must exist.
    pub fn mkdir(&mut self, path: &str, exist_ok: bool) -> Result<(), LfsError> {
        let c_path = c_path(path)?;
        let inner = &mut *self.inner;
        // SAFETY: c_path is NUL-terminated and lives across the call
        let status = unsafe { ll::lfs_mkdir(ptr::addr_of_mut!(inner.lfs), c_path.as_ptr()) };
        match check_status("lfs_mkdir", status) {
            Err(e) if exist_ok && e.code == LFS_ERR_EXIST => Ok(()),
            other => other.map(|_| ()),
        }
    }

    /// Create or truncate `path` and write `data` to it.
    pub fn write_file(&mut self, path: &str, data: &[u8]) -> Result<(), LfsError> {
        let c_path = c_path(path)?;
        let len = u32::try_from(data.len()).map_err(|_| LfsError {
            call: "lfs_file_write",
            code: LFS_ERR_FBIG,
        })?;

        let inner = &mut *self.inner;
        let lfs = ptr::addr_of_mut!(inner.lfs);
        // SAFETY: zeroed file config means "no attributes"; buffer is set below
        let mut file_config: ll::lfs_file_config = unsafe { mem::zeroed() };
        file_config.buffer = inner.file_cache.as_mut_ptr().cast::<c_void>();
        // SAFETY: lfs_file_opencfg initialises the handle
        let mut file: ll::lfs_file_t = unsafe { mem::zeroed() };

        // SAFETY: file and file_config stay on this frame until lfs_file_close
        unsafe {
            check_status(
                "lfs_file_opencfg",
                ll::lfs_file_opencfg(
                    lfs,
                    &mut file,
                    c_path.as_ptr(),
                    LFS_O_WRONLY | LFS_O_CREAT | LFS_O_TRUNC,
                    &file_config,
                ),
            )?;
            let written = ll::lfs_file_write(lfs, &mut file, data.as_ptr().cast::<c_void>(), len);
            let closed = ll::lfs_file_close(lfs, &mut file);

            let written = check_status("lfs_file_write", written)?;
            check_status("lfs_file_close", closed)?;
            if written as u32 != len {
                return Err(LfsError {
                    call: "lfs_file_write",
                    code: LFS_ERR_NOSPC,
                });
            }
        }
        Ok(())
    }

    /// Read the whole content of `path`.
    pub fn read_file(&mut self, path: &str) -> Result<Vec<u8>, LfsError> {
        let c_path = c_path(path)?;
        let inner = &mut *self.inner;
        let lfs = ptr::addr_of_mut!(inner.lfs);
        // SAFETY: see write_file()
        let mut file_config: ll::lfs_file_config = unsafe { mem::zeroed() };
        file_config.buffer = inner.file_cache.as_mut_ptr().cast::<c_void>();
        let mut file: ll::lfs_file_t = unsafe { mem::zeroed() };

        let mut content = Vec::new();
        // SAFETY: see write_file()
        unsafe {
            check_status(
                "lfs_file_opencfg",
                ll::lfs_file_opencfg(lfs, &mut file, c_path.as_ptr(), LFS_O_RDONLY, &file_config),
            )?;
            let mut chunk = [0u8; 256];
            let read = loop {
                let n = ll::lfs_file_read(
                    lfs,
                    &mut file,
                    chunk.as_mut_ptr().cast::<c_void>(),
                    chunk.len() as u32,
                );
                match check_status("lfs_file_read", n) {
                    Ok(0) => break Ok(()),
                    Ok(n) => content.extend_from_slice(&chunk[..n as usize]),
                    Err(e) => break Err(e),
                }
            };
            let closed = ll::lfs_file_close(lfs, &mut file);
            read?;
            check_status("lfs_file_close", closed)?;
        }
        Ok(content)
    }
}

impl Drop for LfsContext {
    fn drop(&mut self) {
        if self.mounted {
            let inner = &mut *self.inner;
            // SAFETY: the instance was mounted by this context
            let status = unsafe { ll::lfs_unmount(ptr::addr_of_mut!(inner.lfs)) };
            if let Err(e) = check_status("lfs_unmount", status) {
                tracing::warn!(error = %e, "Failed to unmount LittleFS");
            }
        }
    }
}

fn c_path(path: &str) -> Result<CString, LfsError> {
    CString::new(path).map_err(|_| LfsError {
        call: "lfs_path",
        code: LFS_ERR_INVAL,
    })
}

unsafe fn device_of<'a>(c: *const ll::lfs_config) -> &'a mut RamBlockDevice {
    &mut *(*c).context.cast::<RamBlockDevice>()
}

unsafe extern "C" fn lfs_read(
    c: *const ll::lfs_config,
    block: ll::lfs_block_t,
    off: ll::lfs_off_t,
    buffer: *mut c_void,
    size: ll::lfs_size_t,
) -> c_int {
    let dst = std::slice::from_raw_parts_mut(buffer.cast::<u8>(), size as usize);
    device_of(c).read(block, off, dst)
}

unsafe extern "C" fn lfs_prog(
    c: *const ll::lfs_config,
    block: ll::lfs_block_t,
    off: ll::lfs_off_t,
    buffer: *const c_void,
    size: ll::lfs_size_t,
) -> c_int {
    let src = std::slice::from_raw_parts(buffer.cast::<u8>(), size as usize);
    device_of(c).prog(block, off, src)
}

unsafe extern "C" fn lfs_erase(c: *const ll::lfs_config, block: ll::lfs_block_t) -> c_int {
    device_of(c).erase(block)
}

unsafe extern "C" fn lfs_sync(_c: *const ll::lfs_config) -> c_int {
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lfs::{LFS_ERR_NOENT, LFS_ERR_NOTDIR};

    const GEOMETRY: LfsGeometry = LfsGeometry {
        block_size: 512,
        block_count: 8,
    };

    #[test]
    fn test_geometry_validation() {
        assert!(GEOMETRY.validate(4096).is_ok());
        assert!(GEOMETRY.validate(4095).is_err());

        let small = LfsGeometry {
            block_size: 64,
            block_count: 8,
        };
        assert!(small.validate(4096).unwrap_err().contains("minimum"));

        let odd = LfsGeometry {
            block_size: 200,
            block_count: 4,
        };
        assert!(odd.validate(4096).unwrap_err().contains("multiple"));

        let single = LfsGeometry {
            block_size: 512,
            block_count: 1,
        };
        assert!(single.validate(4096).is_err());
    }

    #[test]
    fn test_format_rejects_bad_geometry() {
        let err = LfsContext::format(1024, GEOMETRY).unwrap_err();
        assert_eq!(err.code, LFS_ERR_INVAL);
    }

    #[test]
    fn test_format_and_write_read() {
        let mut ctx = LfsContext::format(4096, GEOMETRY).unwrap();
        assert_eq!(ctx.device().len(), 4096);

        ctx.mkdir("/lib", false).unwrap();
        ctx.write_file("/lib/util.mpy", b"M\x06compiled").unwrap();
        assert_eq!(ctx.read_file("/lib/util.mpy").unwrap(), b"M\x06compiled");
    }

    #[test]
    fn test_mkdir_exist_ok() {
        let mut ctx = LfsContext::format(4096, GEOMETRY).unwrap();
        ctx.mkdir("/app", false).unwrap();
        ctx.mkdir("/app", true).unwrap();

        let err = ctx.mkdir("/app", false).unwrap_err();
        assert_eq!(err.code, LFS_ERR_EXIST);
    }

    #[test]
    fn test_mkdir_missing_parent() {
        let mut ctx = LfsContext::format(4096, GEOMETRY).unwrap();
        let err = ctx.mkdir("/a/b", true).unwrap_err();
        assert_eq!(err.code, LFS_ERR_NOENT);
    }

    #[test]
    fn test_write_under_file_fails() {
        let mut ctx = LfsContext::format(4096, GEOMETRY).unwrap();
        ctx.write_file("/main.py", b"print(1)").unwrap();
        let err = ctx.write_file("/main.py/x", b"").unwrap_err();
        assert_eq!(err.code, LFS_ERR_NOTDIR);
    }

    #[test]
    fn test_write_truncates() {
        let mut ctx = LfsContext::format(4096, GEOMETRY).unwrap();
        ctx.write_file("/data.bin", &[7u8; 300]).unwrap();
        ctx.write_file("/data.bin", b"short").unwrap();
        assert_eq!(ctx.read_file("/data.bin").unwrap(), b"short");
    }

    #[test]
    fn test_device_full() {
        let mut ctx = LfsContext::format(4096, GEOMETRY).unwrap();
        let err = ctx.write_file("/big.bin", &[1u8; 16 * 1024]).unwrap_err();
        assert_eq!(err.code, LFS_ERR_NOSPC);
    }

    #[test]
    fn test_nul_in_path() {
        let mut ctx = LfsContext::format(4096, GEOMETRY).unwrap();
        let err = ctx.write_file("/bad\0name", b"").unwrap_err();
        assert_eq!(err.code, LFS_ERR_INVAL);
    }

    #[test]
    fn test_remount_from_bytes() {
        let image = {
            let mut ctx = LfsContext::format(4096, GEOMETRY).unwrap();
            ctx.write_file("/main.py", b"print('hi')").unwrap();
            ctx.device().as_bytes().to_vec()
        };

        let mut ctx = LfsContext::mount(image, GEOMETRY).unwrap();
        assert_eq!(ctx.read_file("/main.py").unwrap(), b"print('hi')");
    }

    #[test]
    fn test_mount_garbage_fails() {
        let err = LfsContext::mount(vec![0u8; 4096], GEOMETRY).unwrap_err();
        assert_eq!(err.call, "lfs_mount");
    }
}
