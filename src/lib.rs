//! framereel - compose a video from a directory of still images
//!
//! This library crate exposes the CLI building blocks for integration testing.

pub mod compose;
pub mod config;
