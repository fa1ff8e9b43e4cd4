//! # statuswatch-provision
//!
//! Lifecycle automation for per-member private resources:
//!
//! - Deterministic, collision-checked resource naming
//! - Idempotent provisioning serialized over the active container
//! - Rolling count of recent creations
//! - Inactivity-based archival sweeps

pub mod archive;
pub mod provisioner;
pub mod slug;
pub mod snapshot;
pub mod telemetry;

pub use archive::{ArchivalSweeper, ArchivePolicy, ArchiveReport};
pub use provisioner::{
    ProvisionOutcome, ProvisioningPass, ResourceProvisioner, SkipReason, SweepReport,
};
pub use snapshot::ContainerSnapshot;
pub use telemetry::CreationLog;
