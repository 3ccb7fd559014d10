//! In-memory block device backing a LittleFS instance.

use super::{LFS_ERR_IO, LFS_ERR_OK};

/// Byte value of an erased block.
const ERASED: u8 = 0xFF;

/// A block device over a byte buffer.
///
/// The buffer may be longer than `block_size * block_count`; the tail is
/// never addressed by LittleFS and keeps whatever it was created with.
#[derive(Debug, Clone)]
pub struct RamBlockDevice {
    data: Vec<u8>,
    block_size: u32,
}

impl RamBlockDevice {
    /// A zero-filled device of `len` bytes.
    pub fn zeroed(len: usize, block_size: u32) -> Self {
        Self {
            data: vec![0u8; len],
            block_size,
        }
    }

    /// A device over existing image bytes.
    pub fn from_bytes(data: Vec<u8>, block_size: u32) -> Self {
        Self { data, block_size }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn span(&self, block: u32, off: u32, len: usize) -> Option<std::ops::Range<usize>> {
        let start = (block as usize)
            .checked_mul(self.block_size as usize)?
            .checked_add(off as usize)?;
        let end = start.checked_add(len)?;
        (end <= self.data.len()).then_some(start..end)
    }

    /// Copy `dst.len()` bytes starting at `off` within `block`.
    pub fn read(&self, block: u32, off: u32, dst: &mut [u8]) -> i32 {
        match self.span(block, off, dst.len()) {
            Some(range) => {
                dst.copy_from_slice(&self.data[range]);
                LFS_ERR_OK
            }
            None => {
                tracing::error!(block, off, len = dst.len(), "Block device read out of range");
                LFS_ERR_IO
            }
        }
    }

    /// Program `src` starting at `off` within `block`.
    pub fn prog(&mut self, block: u32, off: u32, src: &[u8]) -> i32 {
        match self.span(block, off, src.len()) {
            Some(range) => {
                self.data[range].copy_from_slice(src);
                LFS_ERR_OK
            }
            None => {
                tracing::error!(block, off, len = src.len(), "Block device program out of range");
                LFS_ERR_IO
            }
        }
    }

    /// Reset `block` to the erased state.
    pub fn erase(&mut self, block: u32) -> i32 {
        match self.span(block, 0, self.block_size as usize) {
            Some(range) => {
                self.data[range].fill(ERASED);
                LFS_ERR_OK
            }
            None => {
                tracing::error!(block, "Block device erase out of range");
                LFS_ERR_IO
            }
        }
    }
}
