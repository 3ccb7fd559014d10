//! gbampy CLI - pack MicroPython projects into GBA ROMs.

pub mod commands;
pub mod output;
