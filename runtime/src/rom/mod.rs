//! MicroPython ROM container.
//!
//! A ROM is an opaque blob with one reserved region for the embedded
//! filesystem. [`RegionLayout`] locates and validates that region;
//! [`Container`] patches a built filesystem image back into it.

mod container;
pub mod layout;

pub use container::Container;
pub use layout::{InvalidReason, RegionDescriptor, RegionLayout};
