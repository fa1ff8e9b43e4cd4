//! # statuswatch-discord
//!
//! Discord adapter for statuswatch.
//!
//! - [`DiscordPlatform`]: REST implementation of the platform interface,
//!   with presence served from a cache the gateway keeps current
//! - [`Gateway`]: websocket session producing normalized platform events

pub mod cache;
pub mod gateway;
pub mod model;
pub mod permissions;
pub mod rest;

pub use cache::PresenceCache;
pub use gateway::Gateway;
pub use rest::DiscordPlatform;
