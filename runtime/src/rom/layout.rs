//! Reserved filesystem region layout inside a MicroPython ROM.
//!
//! ```text
//! offset + 0   "GBABDEV\0"        opening tag, 8-byte aligned
//! offset + 8   block_size  u32 LE
//! offset + 12  block_count u32 LE
//! offset + 16  capacity    u32 LE
//! offset + 20  payload     capacity bytes
//! end          "BDEVGBA\0"        closing tag
//! ```

/// Tag opening the reserved region.
pub const OPEN_TAG: [u8; 8] = *b"GBABDEV\0";

/// Tag closing the reserved region.
pub const CLOSE_TAG: [u8; 8] = *b"BDEVGBA\0";

/// Stride of the opening tag scan.
pub const TAG_ALIGN: usize = 8;

/// Bytes from the opening tag to the first payload byte.
pub const HEADER_LEN: usize = 20;

const BLOCK_SIZE_FIELD: usize = 8;
const BLOCK_COUNT_FIELD: usize = 12;
const CAPACITY_FIELD: usize = 16;

/// `block_size` value of a region that was never formatted.
pub const UNFORMATTED_BLOCK_SIZE: u32 = 0x6745_2301;

/// `block_count` value of a region that was never formatted.
pub const UNFORMATTED_BLOCK_COUNT: u32 = 0xEFCD_AB89;

/// Location and raw geometry of a validated reserved region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionDescriptor {
    /// Byte position of the opening tag.
    pub offset: usize,
    /// Payload size in bytes.
    pub capacity: usize,
    /// Raw `block_size` header field.
    pub block_size: u32,
    /// Raw `block_count` header field.
    pub block_count: u32,
}

impl RegionDescriptor {
    /// First payload byte.
    pub fn payload_start(&self) -> usize {
        self.offset + HEADER_LEN
    }

    /// One past the last payload byte; the closing tag starts here.
    pub fn payload_end(&self) -> usize {
        self.payload_start() + self.capacity
    }

    /// Block size, or `None` while the header still carries the sentinel.
    pub fn formatted_block_size(&self) -> Option<u32> {
        geometry_field(self.block_size, UNFORMATTED_BLOCK_SIZE)
    }

    /// Block count, or `None` while the header still carries the sentinel.
    pub fn formatted_block_count(&self) -> Option<u32> {
        geometry_field(self.block_count, UNFORMATTED_BLOCK_COUNT)
    }

    /// Overwrite the geometry fields of `rom` in place.
    pub(crate) fn write_geometry(&self, rom: &mut [u8], block_size: u32, block_count: u32) {
        let base = self.offset;
        rom[base + BLOCK_SIZE_FIELD..base + BLOCK_SIZE_FIELD + 4]
            .copy_from_slice(&block_size.to_le_bytes());
        rom[base + BLOCK_COUNT_FIELD..base + BLOCK_COUNT_FIELD + 4]
            .copy_from_slice(&block_count.to_le_bytes());
    }
}

fn geometry_field(value: u32, sentinel: u32) -> Option<u32> {
    if value == 0 || value == sentinel {
        None
    } else {
        Some(value)
    }
}

/// Why a ROM carries no usable region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    /// No opening tag at any aligned offset.
    NoOpeningTag,
    /// The blob ends inside the region header.
    TruncatedHeader { offset: usize },
    /// Zero-byte payload.
    EmptyRegion { offset: usize },
    /// Payload plus closing tag run past the end of the blob.
    CapacityOutOfBounds { offset: usize, capacity: usize },
    /// The bytes after the payload are not the closing tag.
    ClosingTagMismatch { offset: usize, capacity: usize },
}

impl std::fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoOpeningTag => write!(f, "no filesystem region tag found"),
            Self::TruncatedHeader { offset } => {
                write!(f, "region header at {offset:#x} is truncated")
            }
            Self::EmptyRegion { offset } => {
                write!(f, "region at {offset:#x} has zero capacity")
            }
            Self::CapacityOutOfBounds { offset, capacity } => write!(
                f,
                "region at {offset:#x} claims {capacity} bytes past the end of the ROM"
            ),
            Self::ClosingTagMismatch { offset, capacity } => write!(
                f,
                "region at {offset:#x} ({capacity} bytes) is missing its closing tag"
            ),
        }
    }
}

/// Outcome of scanning a ROM for its reserved region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionLayout {
    Valid(RegionDescriptor),
    Invalid(InvalidReason),
}

impl RegionLayout {
    /// Scan `rom` for the opening tag at 8-byte strides and validate the region.
    ///
    /// The first aligned tag wins; nothing after it is considered.
    pub fn parse(rom: &[u8]) -> Self {
        let Some(offset) = find_open_tag(rom) else {
            return Self::Invalid(InvalidReason::NoOpeningTag);
        };

        if offset + HEADER_LEN > rom.len() {
            return Self::Invalid(InvalidReason::TruncatedHeader { offset });
        }

        let block_size = read_u32_le(rom, offset + BLOCK_SIZE_FIELD);
        let block_count = read_u32_le(rom, offset + BLOCK_COUNT_FIELD);
        let capacity = read_u32_le(rom, offset + CAPACITY_FIELD) as usize;

        if capacity == 0 {
            return Self::Invalid(InvalidReason::EmptyRegion { offset });
        }

        let end = match (offset + HEADER_LEN).checked_add(capacity) {
            Some(end) if end + CLOSE_TAG.len() <= rom.len() => end,
            _ => {
                return Self::Invalid(InvalidReason::CapacityOutOfBounds { offset, capacity });
            }
        };

        if rom[end..end + CLOSE_TAG.len()] != CLOSE_TAG {
            return Self::Invalid(InvalidReason::ClosingTagMismatch { offset, capacity });
        }

        Self::Valid(RegionDescriptor {
            offset,
            capacity,
            block_size,
            block_count,
        })
    }

    /// The descriptor, if the region is valid.
    pub fn descriptor(&self) -> Option<&RegionDescriptor> {
        match self {
            Self::Valid(region) => Some(region),
            Self::Invalid(_) => None,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }
}

fn find_open_tag(rom: &[u8]) -> Option<usize> {
    rom.chunks_exact(TAG_ALIGN)
        .position(|chunk| chunk == OPEN_TAG)
        .map(|index| index * TAG_ALIGN)
}

fn read_u32_le(rom: &[u8], at: usize) -> u32 {
    let mut field = [0u8; 4];
    field.copy_from_slice(&rom[at..at + 4]);
    u32::from_le_bytes(field)
}
