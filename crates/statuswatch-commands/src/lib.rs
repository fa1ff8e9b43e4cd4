//! # statuswatch-commands
//!
//! Prefix chat commands:
//!
//! - `status`: last-known reachability of every monitored bot
//! - `summary`: health and provisioning summary (administrators only)
//! - `ensure`: provision a private resource (a full sweep for administrators)
//! - `restart`: relay a restart request, guarded by per-user and global cooldowns

pub mod command;
pub mod cooldown;
pub mod gateway;
pub mod response;

pub use command::{Command, ParsedCommand};
pub use cooldown::{CooldownKey, CooldownRegistry};
pub use gateway::CommandGateway;
pub use response::{CommandRejection, Response};
