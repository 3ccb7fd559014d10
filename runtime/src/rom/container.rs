//! Loaded MicroPython ROM with an optional filesystem image.

use std::io::Write;
use std::path::Path;

use gbampy_core::error::{GbaError, Result};

use super::layout::{RegionDescriptor, RegionLayout};
use crate::image::ImageBuilder;

/// A template or built ROM.
///
/// The loaded bytes are never modified; [`Container::patched_bytes`]
/// produces a patched copy on demand.
#[derive(Debug)]
pub struct Container {
    rom: Vec<u8>,
    layout: RegionLayout,
    image: Option<ImageBuilder>,
}

impl Container {
    /// Read a ROM from disk.
    ///
    /// An invalid ROM still loads; see [`Container::is_valid`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let rom = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => GbaError::SourceNotFound {
                path: path.to_path_buf(),
            },
            _ => GbaError::IoError(e),
        })?;
        let container = Self::from_bytes(rom);
        tracing::info!(
            path = %path.display(),
            len = container.rom.len(),
            valid = container.is_valid(),
            "Loaded ROM"
        );
        Ok(container)
    }

    /// Wrap ROM bytes already in memory.
    pub fn from_bytes(rom: Vec<u8>) -> Self {
        let layout = RegionLayout::parse(&rom);
        match &layout {
            RegionLayout::Valid(region) => tracing::debug!(
                offset = region.offset,
                capacity = region.capacity,
                "Found filesystem region"
            ),
            RegionLayout::Invalid(reason) => tracing::debug!(%reason, "No usable filesystem region"),
        }
        Self {
            rom,
            layout,
            image: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.layout.is_valid()
    }

    pub fn layout(&self) -> &RegionLayout {
        &self.layout
    }

    /// Descriptor of the reserved region, if the ROM is valid.
    pub fn region(&self) -> Option<&RegionDescriptor> {
        self.layout.descriptor()
    }

    /// The bytes as loaded.
    pub fn as_bytes(&self) -> &[u8] {
        &self.rom
    }

    pub fn capacity(&self) -> Option<usize> {
        self.region().map(|r| r.capacity)
    }

    /// Block size of the current image, else the header value unless unset.
    pub fn block_size(&self) -> Option<u32> {
        match &self.image {
            Some(image) => Some(image.block_size()),
            None => self.region().and_then(RegionDescriptor::formatted_block_size),
        }
    }

    /// Block count of the current image, else the header value unless unset.
    pub fn block_count(&self) -> Option<u32> {
        match &self.image {
            Some(image) => Some(image.block_count()),
            None => self.region().and_then(RegionDescriptor::formatted_block_count),
        }
    }

    fn require_region(&self) -> Result<RegionDescriptor> {
        match self.layout {
            RegionLayout::Valid(region) => Ok(region),
            RegionLayout::Invalid(reason) => Err(GbaError::ContainerInvalid {
                reason: reason.to_string(),
            }),
        }
    }

    /// Format a fresh filesystem over the whole reserved region.
    ///
    /// Any previous image is discarded first, also when formatting fails.
    pub fn format(&mut self, block_size: u32, block_count: Option<u32>) -> Result<()> {
        let region = self.require_region()?;
        self.image = None;
        self.image = Some(ImageBuilder::format(
            region.capacity,
            block_size,
            block_count,
        )?);
        Ok(())
    }

    /// Mount the filesystem already stored in the region.
    pub fn open_filesystem(&mut self) -> Result<()> {
        let region = self.require_region()?;
        let (Some(block_size), Some(block_count)) = (
            region.formatted_block_size(),
            region.formatted_block_count(),
        ) else {
            return Err(GbaError::ContainerInvalid {
                reason: "block geometry is unset".to_string(),
            });
        };
        let payload = self.rom[region.payload_start()..region.payload_end()].to_vec();
        self.image = None;
        self.image = Some(ImageBuilder::open(payload, block_size, block_count)?);
        Ok(())
    }

    /// The current filesystem image.
    pub fn image(&self) -> Result<&ImageBuilder> {
        self.image.as_ref().ok_or(GbaError::FilesystemNotFormatted)
    }

    /// The current filesystem image, for population.
    pub fn image_mut(&mut self) -> Result<&mut ImageBuilder> {
        self.image.as_mut().ok_or(GbaError::FilesystemNotFormatted)
    }

    /// The loaded ROM with geometry fields and payload replaced by the current image.
    pub fn patched_bytes(&self) -> Result<Vec<u8>> {
        let region = self.require_region()?;
        let image = self.image()?;

        let buffer = image.buffer();
        if buffer.len() != region.capacity {
            return Err(GbaError::BufferSizeMismatch {
                expected: region.capacity,
                actual: buffer.len(),
            });
        }

        let mut rom = self.rom.clone();
        region.write_geometry(&mut rom, image.block_size(), image.block_count());
        rom[region.payload_start()..region.payload_end()].copy_from_slice(buffer);
        Ok(rom)
    }

    /// Write the patched ROM to `path`.
    ///
    /// The bytes go to a temporary file next to `path` which is then
    /// renamed over it, so a failed save leaves no partial output.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let rom = self.patched_bytes()?;

        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&rom)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| GbaError::IoError(e.error))?;

        tracing::info!(path = %path.display(), len = rom.len(), "Saved ROM");
        Ok(())
    }
}

impl std::fmt::Display for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn field(value: Option<impl std::fmt::Display>) -> String {
            value.map_or_else(|| "unset".to_string(), |v| v.to_string())
        }
        write!(
            f,
            "<GbaRom block_size={} block_count={} capacity={}>",
            field(self.block_size()),
            field(self.block_count()),
            field(self.capacity())
        )
    }
}
