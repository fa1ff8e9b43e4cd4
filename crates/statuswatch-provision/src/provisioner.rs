//! Per-member private resource provisioning.
//!
//! Every check-then-create against the active container runs inside a
//! [`ProvisioningPass`], which holds the container lock for its lifetime.
//! Two passes never interleave, so the "name already exists" check and the
//! create that follows it are atomic with respect to every other caller
//! (scheduled sweeps, member-joined events, and chat commands alike).

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing;

use statuswatch_core::result::AppResult;
use statuswatch_core::traits::platform::Platform;
use statuswatch_core::types::{AccessRule, ChannelId, Member, RoleId, UserId};

use crate::slug::{disambiguated, resource_name};
use crate::snapshot::ContainerSnapshot;
use crate::telemetry::CreationLog;

/// Why a member was not given a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Automated account.
    ServiceAccount,
    /// Administrators are exempt.
    Administrator,
    /// Holds a role on the ignore list.
    IgnoredRole,
    /// Already owns a resource in the active container.
    AlreadyOwned,
    /// A resource with the computed name already exists.
    NameTaken(String),
    /// Not a member of the workspace.
    NotAMember,
}

impl SkipReason {
    /// Short machine-friendly label used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ServiceAccount => "service_account",
            Self::Administrator => "administrator",
            Self::IgnoredRole => "ignored_role",
            Self::AlreadyOwned => "already_owned",
            Self::NameTaken(_) => "name_taken",
            Self::NotAMember => "not_a_member",
        }
    }
}

/// Result of one ensure step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// A resource was created.
    Created {
        /// New resource id
        resource: ChannelId,
        /// Name it was created under
        name: String,
    },
    /// Nothing was created.
    Skipped(SkipReason),
}

/// Totals of a full provisioning sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Resources created
    pub created: usize,
    /// Members skipped
    pub skipped: usize,
    /// Members whose ensure step failed
    pub failed: usize,
}

/// Exclusive access to the active container for one batch of ensure steps.
pub struct ProvisioningPass {
    /// Held for the lifetime of the pass
    _guard: OwnedMutexGuard<()>,
    /// Names in the active container, updated as resources are created
    snapshot: ContainerSnapshot,
    /// Designated role resolved for this pass
    designated: Option<RoleId>,
}

/// Creates a private resource for each eligible member.
#[derive(Debug)]
pub struct ResourceProvisioner {
    /// Platform used for listing and creation
    platform: Arc<dyn Platform>,
    /// Container holding active resources
    active: ChannelId,
    /// Role names whose holders are skipped
    ignore_roles: Vec<String>,
    /// Role granted after creation, by name
    designated_role: Option<String>,
    /// Recent creations
    creations: CreationLog,
    /// Serializes every pass over the active container
    container_lock: Arc<Mutex<()>>,
}

impl ResourceProvisioner {
    /// Create a new provisioner.
    pub fn new(
        platform: Arc<dyn Platform>,
        active: ChannelId,
        ignore_roles: Vec<String>,
        designated_role: Option<String>,
        creation_window_hours: u64,
    ) -> Self {
        Self {
            platform,
            active,
            ignore_roles,
            designated_role,
            creations: CreationLog::new(creation_window_hours),
            container_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Lock shared with anything else that mutates the active container.
    pub fn container_lock(&self) -> Arc<Mutex<()>> {
        Arc::clone(&self.container_lock)
    }

    /// Container holding active resources.
    pub fn active_container(&self) -> ChannelId {
        self.active
    }

    /// Rolling creation log.
    pub fn creations(&self) -> &CreationLog {
        &self.creations
    }

    /// Take the container lock and load a fresh snapshot.
    pub async fn begin(&self) -> AppResult<ProvisioningPass> {
        let guard = Arc::clone(&self.container_lock).lock_owned().await;
        let resources = self.platform.resources(self.active).await?;
        let snapshot = ContainerSnapshot::from_resources(&resources);

        let designated = match self.designated_role.as_deref() {
            Some(name) => match self.platform.role_by_name(name).await {
                Ok(Some(role)) => Some(role),
                Ok(None) => {
                    tracing::warn!(role = %name, "Designated role not found");
                    None
                }
                Err(e) => {
                    tracing::warn!(role = %name, error = %e, "Failed to resolve designated role");
                    None
                }
            },
            None => None,
        };

        Ok(ProvisioningPass {
            _guard: guard,
            snapshot,
            designated,
        })
    }

    /// Ensure `member` has a private resource in the active container.
    ///
    /// Eligibility is checked in order: service account, administrator,
    /// ignore list. A creation is appended to the pass snapshot, so calling
    /// this twice for the same member within one pass creates at most one
    /// resource. A failed role grant is logged and does not undo creation.
    pub async fn ensure(
        &self,
        pass: &mut ProvisioningPass,
        member: &Member,
    ) -> AppResult<ProvisionOutcome> {
        if member.is_bot {
            return Ok(ProvisionOutcome::Skipped(SkipReason::ServiceAccount));
        }
        if member.is_admin {
            return Ok(ProvisionOutcome::Skipped(SkipReason::Administrator));
        }
        if member.has_any_role_named(&self.ignore_roles) {
            return Ok(ProvisionOutcome::Skipped(SkipReason::IgnoredRole));
        }
        if pass.snapshot.owns(member.id) {
            return Ok(ProvisionOutcome::Skipped(SkipReason::AlreadyOwned));
        }

        let name = match self.available_name(&pass.snapshot, member) {
            Ok(name) => name,
            Err(taken) => return Ok(ProvisionOutcome::Skipped(SkipReason::NameTaken(taken))),
        };

        let access = AccessRule::private_to(member.id, self.platform.self_id());
        let resource = self
            .platform
            .create_resource(self.active, &name, &access)
            .await?;
        pass.snapshot.insert(&name, Some(member.id));
        self.creations.record(Utc::now());

        tracing::info!(
            member = %member.id,
            resource = %resource,
            name = %name,
            "Created private resource"
        );

        if let Some(role) = pass.designated {
            if !member.has_role(role) {
                if let Err(e) = self.platform.assign_role(member.id, role).await {
                    tracing::warn!(
                        member = %member.id,
                        role = %role,
                        error = %e,
                        "Failed to assign designated role"
                    );
                }
            }
        }

        Ok(ProvisionOutcome::Created { resource, name })
    }

    /// Run the ensure step for every member of the workspace.
    ///
    /// A failure for one member is logged and the sweep moves on.
    pub async fn sweep(&self) -> AppResult<SweepReport> {
        let members = self.platform.members().await?;
        let mut pass = self.begin().await?;
        let mut report = SweepReport::default();

        for member in &members {
            match self.ensure(&mut pass, member).await {
                Ok(ProvisionOutcome::Created { .. }) => report.created += 1,
                Ok(ProvisionOutcome::Skipped(reason)) => {
                    let reason = reason.as_str();
                    tracing::trace!(member = %member.id, reason, "Provisioning skipped");
                    report.skipped += 1;
                }
                Err(e) => {
                    tracing::error!(member = %member.id, error = %e, "Provisioning failed");
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            created = report.created,
            skipped = report.skipped,
            failed = report.failed,
            "Provisioning sweep complete"
        );
        Ok(report)
    }

    /// Run the ensure step for a single member, looked up by id.
    pub async fn ensure_member(&self, id: UserId) -> AppResult<ProvisionOutcome> {
        let Some(member) = self.platform.member(id).await? else {
            return Ok(ProvisionOutcome::Skipped(SkipReason::NotAMember));
        };
        let mut pass = self.begin().await?;
        self.ensure(&mut pass, &member).await
    }

    /// Pick the member's resource name, or report the name that blocks it.
    fn available_name(
        &self,
        snapshot: &ContainerSnapshot,
        member: &Member,
    ) -> Result<String, String> {
        let base = resource_name(member);
        match snapshot.owner_of(&base) {
            None => Ok(base),
            Some(Some(owner)) if owner != member.id => {
                let alt = disambiguated(&base, member.id);
                if snapshot.contains(&alt) { Err(alt) } else { Ok(alt) }
            }
            Some(_) => Err(base),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use statuswatch_core::MemoryPlatform;
    use statuswatch_core::types::{ResourceInfo, Role};

    const SERVICE: UserId = UserId::new(1);
    const ACTIVE: ChannelId = ChannelId::new(900);

    fn member(id: u64, name: &str) -> Member {
        Member {
            id: UserId::new(id),
            display_name: name.to_string(),
            is_bot: false,
            is_admin: false,
            roles: Vec::new(),
        }
    }

    fn setup() -> (Arc<MemoryPlatform>, ResourceProvisioner) {
        let platform = Arc::new(MemoryPlatform::new(SERVICE));
        let provisioner = ResourceProvisioner::new(
            platform.clone(),
            ACTIVE,
            vec!["Guests".to_string()],
            Some("Member".to_string()),
            24,
        );
        (platform, provisioner)
    }

    #[tokio::test]
    async fn test_ensure_twice_in_one_pass_creates_once() {
        let (platform, provisioner) = setup();
        let ada = member(10, "Ada");
        platform.add_member(ada.clone());

        let mut pass = provisioner.begin().await.unwrap();
        let first = provisioner.ensure(&mut pass, &ada).await.unwrap();
        let second = provisioner.ensure(&mut pass, &ada).await.unwrap();

        assert!(matches!(first, ProvisionOutcome::Created { ref name, .. } if name == "ada"));
        assert_eq!(second, ProvisionOutcome::Skipped(SkipReason::AlreadyOwned));
        assert_eq!(platform.create_calls(), 1);
    }

    #[tokio::test]
    async fn test_eligibility_order() {
        let (platform, provisioner) = setup();
        let mut bot = member(11, "Helper");
        bot.is_bot = true;
        bot.is_admin = true;
        let mut admin = member(12, "Boss");
        admin.is_admin = true;
        let mut guest = member(13, "Visitor");
        guest.roles.push(Role {
            id: RoleId::new(70),
            name: "guests".into(),
        });

        let mut pass = provisioner.begin().await.unwrap();
        for (m, reason) in [
            (&bot, SkipReason::ServiceAccount),
            (&admin, SkipReason::Administrator),
            (&guest, SkipReason::IgnoredRole),
        ] {
            assert_eq!(
                provisioner.ensure(&mut pass, m).await.unwrap(),
                ProvisionOutcome::Skipped(reason)
            );
        }
        assert_eq!(platform.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_name_collision_with_other_owner_is_disambiguated() {
        let (platform, provisioner) = setup();
        platform.add_resource(ResourceInfo {
            id: ChannelId::new(5),
            name: "sam".into(),
            parent: Some(ACTIVE),
            owner: Some(UserId::new(20)),
            created_at: Utc::now(),
            last_activity_at: None,
        });
        let other_sam = member(123_4567, "Sam");

        let mut pass = provisioner.begin().await.unwrap();
        let outcome = provisioner.ensure(&mut pass, &other_sam).await.unwrap();
        assert!(matches!(
            outcome,
            ProvisionOutcome::Created { ref name, .. } if name == "sam-4567"
        ));
    }

    #[tokio::test]
    async fn test_unowned_existing_name_is_skipped() {
        let (platform, provisioner) = setup();
        platform.add_resource(ResourceInfo {
            id: ChannelId::new(5),
            name: "Ada".into(),
            parent: Some(ACTIVE),
            owner: None,
            created_at: Utc::now(),
            last_activity_at: None,
        });
        let outcome = {
            let mut pass = provisioner.begin().await.unwrap();
            provisioner.ensure(&mut pass, &member(10, "ada")).await.unwrap()
        };
        assert_eq!(outcome, ProvisionOutcome::Skipped(SkipReason::NameTaken("ada".into())));
    }

    #[tokio::test]
    async fn test_designated_role_failure_keeps_resource() {
        let (platform, provisioner) = setup();
        platform.add_role(Role {
            id: RoleId::new(3),
            name: "Member".into(),
        });
        platform.add_member(member(10, "Ada"));
        platform.add_member(member(11, "Grace"));

        assert!(matches!(
            provisioner.ensure_member(UserId::new(10)).await.unwrap(),
            ProvisionOutcome::Created { .. }
        ));
        assert_eq!(platform.role_grants(), vec![(UserId::new(10), RoleId::new(3))]);

        platform.fail_role_grants(true);
        assert!(matches!(
            provisioner.ensure_member(UserId::new(11)).await.unwrap(),
            ProvisionOutcome::Created { .. }
        ));
        assert_eq!(platform.resources_in(ACTIVE).len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_triggers_create_at_most_once() {
        let (platform, provisioner) = setup();
        platform.add_member(member(10, "Ada"));
        platform.set_create_delay(Duration::from_millis(20));
        let provisioner = Arc::new(provisioner);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let provisioner = Arc::clone(&provisioner);
            handles.push(tokio::spawn(async move {
                provisioner.ensure_member(UserId::new(10)).await.unwrap()
            }));
        }
        let sweeper = Arc::clone(&provisioner);
        handles.push(tokio::spawn(async move {
            sweeper.sweep().await.unwrap();
            ProvisionOutcome::Skipped(SkipReason::NotAMember)
        }));
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(platform.create_calls(), 1);
        assert_eq!(platform.resources_in(ACTIVE).len(), 1);
    }

    #[tokio::test]
    async fn test_sweep_isolates_failures() {
        let (platform, provisioner) = setup();
        platform.add_member(member(10, "Ada"));
        platform.add_member(member(11, "Grace"));
        platform.fail_creates(true);

        let report = provisioner.sweep().await.unwrap();
        assert_eq!(report.failed, 2);

        platform.fail_creates(false);
        let report = provisioner.sweep().await.unwrap();
        assert_eq!(report.created, 2);
        assert_eq!(provisioner.creations().count_recent(Utc::now()), 2);

        let report = provisioner.sweep().await.unwrap();
        assert_eq!(report.created, 0);
        assert_eq!(report.skipped, 2);
    }

    #[tokio::test]
    async fn test_unknown_member_is_skipped() {
        let (_platform, provisioner) = setup();
        assert_eq!(
            provisioner.ensure_member(UserId::new(404)).await.unwrap(),
            ProvisionOutcome::Skipped(SkipReason::NotAMember)
        );
    }
}
