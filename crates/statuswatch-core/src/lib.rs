//! # statuswatch-core
//!
//! Core crate for statuswatch. Contains the configuration schema, typed
//! identifiers, the platform abstraction every other crate talks through,
//! normalized inbound platform events, and the unified error system.
//!
//! This crate has **no** internal dependencies on other statuswatch crates.

pub mod config;
pub mod error;
pub mod events;
pub mod memory;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use memory::MemoryPlatform;
pub use result::AppResult;
pub use traits::platform::Platform;
