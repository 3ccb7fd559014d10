//! gbampy Runtime - cartridge image engine.
//!
//! Locates the reserved LittleFS region in a MicroPython GBA ROM, builds a
//! filesystem image from a project tree and patches it back into the ROM.

#![allow(clippy::result_large_err)]

pub mod build;
pub mod hooks;
pub mod image;
pub mod lfs;
pub mod mapper;
pub mod rom;
pub mod tools;

// Re-export common types
pub use build::{build, BuildEngine, BuildResult, BuildStage, DEFAULT_BLOCK_SIZE};
pub use hooks::{CommandHookResolver, Hook, HookRegistry, HookResolver, HookSpec};
pub use image::ImageBuilder;
pub use mapper::{list_files, FileItem, IgnoreSet, ImagePath, PathMapper};
pub use rom::{Container, RegionDescriptor, RegionLayout};
pub use tools::{GbaEmulator, MpyCross, ScriptCompiler};

/// gbampy Runtime version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
