//! `gbampy info` command.

use std::path::{Path, PathBuf};

use clap::Args;
use gbampy_core::ProjectConfig;
use gbampy_runtime::{Container, RegionLayout};

use crate::output::{format_bytes, format_optional};

#[derive(Args)]
pub struct InfoArgs {
    /// ROM to inspect (default: the configured template)
    pub image: Option<PathBuf>,
}

pub fn execute(args: InfoArgs, config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let path = match args.image {
        Some(path) => path,
        None => ProjectConfig::load(config_path)?.template_path(),
    };
    let rom = Container::load(&path)?;

    println!("ROM: {}", path.display());
    for line in describe(&rom) {
        println!("{line}");
    }
    Ok(())
}

fn describe(rom: &Container) -> Vec<String> {
    let mut lines = vec![format!("Size: {}", format_bytes(rom.as_bytes().len() as u64))];
    match rom.layout() {
        RegionLayout::Valid(region) => {
            lines.push("Filesystem region: valid".to_string());
            lines.push(format!("Offset: {:#x}", region.offset));
            lines.push(format!(
                "Capacity: {} ({} bytes)",
                format_bytes(region.capacity as u64),
                region.capacity
            ));
        }
        RegionLayout::Invalid(reason) => {
            lines.push(format!("Filesystem region: invalid ({reason})"));
        }
    }
    lines.push(format!("Block size: {}", format_optional(rom.block_size())));
    lines.push(format!("Block count: {}", format_optional(rom.block_count())));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(capacity: u32) -> Vec<u8> {
        let mut rom = vec![0u8; 32];
        rom.extend_from_slice(b"GBABDEV\0");
        rom.extend_from_slice(&0x6745_2301u32.to_le_bytes());
        rom.extend_from_slice(&0xEFCD_AB89u32.to_le_bytes());
        rom.extend_from_slice(&capacity.to_le_bytes());
        rom.extend(std::iter::repeat(0u8).take(capacity as usize));
        rom.extend_from_slice(b"BDEVGBA\0");
        rom
    }

    #[test]
    fn test_describe_unformatted_template() {
        let rom = Container::from_bytes(template(4096));
        assert_eq!(
            describe(&rom),
            vec![
                "Size: 4.1 KB",
                "Filesystem region: valid",
                "Offset: 0x20",
                "Capacity: 4.0 KB (4096 bytes)",
                "Block size: unset",
                "Block count: unset",
            ]
        );
    }

    #[test]
    fn test_describe_formatted_rom() {
        let mut rom = Container::from_bytes(template(4096));
        rom.format(512, None).unwrap();
        let rom = Container::from_bytes(rom.patched_bytes().unwrap());
        let lines = describe(&rom);
        assert!(lines.contains(&"Block size: 512".to_string()));
        assert!(lines.contains(&"Block count: 8".to_string()));
    }

    #[test]
    fn test_describe_invalid_rom() {
        let rom = Container::from_bytes(vec![0u8; 64]);
        let lines = describe(&rom);
        assert_eq!(lines[1], "Filesystem region: invalid (no filesystem region tag found)");
        assert_eq!(lines[2], "Block size: unset");
    }
}
