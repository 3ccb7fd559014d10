//! External programs driven by the build: the cross-compiler and the emulator.

mod emulator;
mod locate;
mod mpy_cross;

pub use emulator::GbaEmulator;
pub use locate::{find_program, which, which_in};
pub use mpy_cross::{MpyCross, ScriptCompiler};
