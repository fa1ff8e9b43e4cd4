//! Built-in periodic tasks.

pub mod archival;
pub mod cooldown;
pub mod presence_poll;
pub mod provisioning;

pub use archival::ArchivalSweepTask;
pub use cooldown::CooldownPruneTask;
pub use presence_poll::PresencePollTask;
pub use provisioning::ProvisioningSweepTask;
