//! ROM build orchestration.

mod engine;

pub use engine::{build, BuildEngine, BuildResult, BuildStage};
pub use crate::image::DEFAULT_BLOCK_SIZE;
