//! framereel-core: shared error, media and configuration types.
//!
//! This crate is the foundational dependency for the other framereel
//! crates, providing the unified error type, frame geometry, and the
//! serde-backed configuration model.

pub mod config;
pub mod error;
pub mod media;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use media::FrameShape;
