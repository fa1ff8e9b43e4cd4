//! Core trait definitions implemented by platform adapters.

pub mod platform;

pub use platform::Platform;
