//! In-memory platform for tests and dry runs.
//!
//! Holds members, presences, roles, and resources behind a std mutex. The
//! lock is never held across an await point. Individual operations can be
//! made to fail so callers' per-item failure isolation can be exercised.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::result::AppResult;
use crate::traits::platform::Platform;
use crate::types::{
    AccessRule, AccessSubject, ChannelId, Member, MessagePayload, RawPresence, ResourceInfo, Role,
    RoleId, UserId,
};

/// Mutable state of the in-memory platform.
#[derive(Debug, Default)]
struct MemoryState {
    members: BTreeMap<UserId, Member>,
    presences: HashMap<UserId, RawPresence>,
    roles: Vec<Role>,
    resources: BTreeMap<ChannelId, ResourceInfo>,
    sent: Vec<(ChannelId, MessagePayload)>,
    role_grants: Vec<(UserId, RoleId)>,
    create_calls: usize,
    next_id: u64,
    failing_sends: HashSet<ChannelId>,
    failing_moves: HashSet<ChannelId>,
    fail_creates: bool,
    fail_role_grants: bool,
    fail_listings: bool,
    create_delay: Option<Duration>,
}

/// In-memory [`Platform`] implementation.
#[derive(Debug)]
pub struct MemoryPlatform {
    /// Id of the controlling service account.
    self_id: UserId,
    /// Protected state.
    state: Mutex<MemoryState>,
}

impl MemoryPlatform {
    /// Create an empty platform controlled by `self_id`.
    pub fn new(self_id: UserId) -> Self {
        Self {
            self_id,
            state: Mutex::new(MemoryState {
                next_id: 1_000,
                ..MemoryState::default()
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add or replace a member.
    pub fn add_member(&self, member: Member) {
        self.lock().members.insert(member.id, member);
    }

    /// Remove a member and its presence.
    pub fn remove_member(&self, id: UserId) {
        let mut state = self.lock();
        state.members.remove(&id);
        state.presences.remove(&id);
    }

    /// Set the presence of an account. `None` makes it absent.
    pub fn set_presence(&self, id: UserId, presence: Option<RawPresence>) {
        let mut state = self.lock();
        match presence {
            Some(p) => {
                state.presences.insert(id, p);
            }
            None => {
                state.presences.remove(&id);
            }
        }
    }

    /// Register a role that members may hold.
    pub fn add_role(&self, role: Role) {
        self.lock().roles.push(role);
    }

    /// Insert a pre-existing resource.
    pub fn add_resource(&self, resource: ResourceInfo) {
        self.lock().resources.insert(resource.id, resource);
    }

    /// Record content activity inside a resource.
    pub fn set_last_activity(&self, resource: ChannelId, at: DateTime<Utc>) {
        if let Some(r) = self.lock().resources.get_mut(&resource) {
            r.last_activity_at = Some(at);
        }
    }

    /// Resources currently inside `container`, ordered by id.
    pub fn resources_in(&self, container: ChannelId) -> Vec<ResourceInfo> {
        self.lock()
            .resources
            .values()
            .filter(|r| r.parent == Some(container))
            .cloned()
            .collect()
    }

    /// Every message sent so far, in order.
    pub fn sent_messages(&self) -> Vec<(ChannelId, MessagePayload)> {
        self.lock().sent.clone()
    }

    /// Every role grant performed so far, in order.
    pub fn role_grants(&self) -> Vec<(UserId, RoleId)> {
        self.lock().role_grants.clone()
    }

    /// Number of successful resource creations.
    pub fn create_calls(&self) -> usize {
        self.lock().create_calls
    }

    /// Make every send into `channel` fail.
    pub fn fail_sends_to(&self, channel: ChannelId) {
        self.lock().failing_sends.insert(channel);
    }

    /// Make every move of `resource` fail.
    pub fn fail_moves_of(&self, resource: ChannelId) {
        self.lock().failing_moves.insert(resource);
    }

    /// Toggle failure of resource creation.
    pub fn fail_creates(&self, fail: bool) {
        self.lock().fail_creates = fail;
    }

    /// Toggle failure of role grants.
    pub fn fail_role_grants(&self, fail: bool) {
        self.lock().fail_role_grants = fail;
    }

    /// Toggle failure of member and resource listings.
    pub fn fail_listings(&self, fail: bool) {
        self.lock().fail_listings = fail;
    }

    /// Delay every resource creation, widening race windows in tests.
    pub fn set_create_delay(&self, delay: Duration) {
        self.lock().create_delay = Some(delay);
    }
}

#[async_trait]
impl Platform for MemoryPlatform {
    fn self_id(&self) -> UserId {
        self.self_id
    }

    async fn presence(&self, entity: UserId) -> AppResult<Option<RawPresence>> {
        let state = self.lock();
        if !state.members.contains_key(&entity) {
            return Ok(None);
        }
        Ok(Some(
            state
                .presences
                .get(&entity)
                .copied()
                .unwrap_or(RawPresence::Offline),
        ))
    }

    async fn member(&self, id: UserId) -> AppResult<Option<Member>> {
        Ok(self.lock().members.get(&id).cloned())
    }

    async fn members(&self) -> AppResult<Vec<Member>> {
        let state = self.lock();
        if state.fail_listings {
            return Err(AppError::platform("member listing rejected"));
        }
        Ok(state.members.values().cloned().collect())
    }

    async fn resources(&self, container: ChannelId) -> AppResult<Vec<ResourceInfo>> {
        if self.lock().fail_listings {
            return Err(AppError::platform(format!(
                "listing of container {container} rejected"
            )));
        }
        Ok(self.resources_in(container))
    }

    async fn send_message(&self, channel: ChannelId, payload: &MessagePayload) -> AppResult<()> {
        let mut state = self.lock();
        if state.failing_sends.contains(&channel) {
            return Err(AppError::platform(format!(
                "send to channel {channel} rejected"
            )));
        }
        state.sent.push((channel, payload.clone()));
        Ok(())
    }

    async fn create_resource(
        &self,
        container: ChannelId,
        name: &str,
        access: &[AccessRule],
    ) -> AppResult<ChannelId> {
        let delay = self.lock().create_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.lock();
        if state.fail_creates {
            return Err(AppError::platform(format!(
                "create of '{name}' rejected"
            )));
        }

        state.next_id += 1;
        let id = ChannelId::new(state.next_id);
        let service = self.self_id;
        let owner = access.iter().find_map(|rule| match rule.subject {
            AccessSubject::Member(user) if rule.allow && user != service => Some(user),
            _ => None,
        });

        state.resources.insert(
            id,
            ResourceInfo {
                id,
                name: name.to_string(),
                parent: Some(container),
                owner,
                created_at: Utc::now(),
                last_activity_at: None,
            },
        );
        state.create_calls += 1;
        Ok(id)
    }

    async fn move_resource(&self, resource: ChannelId, container: ChannelId) -> AppResult<()> {
        let mut state = self.lock();
        if state.failing_moves.contains(&resource) {
            return Err(AppError::platform(format!(
                "missing access to resource {resource}"
            )));
        }
        match state.resources.get_mut(&resource) {
            Some(r) => {
                r.parent = Some(container);
                Ok(())
            }
            None => Err(AppError::not_found(format!("resource {resource}"))),
        }
    }

    async fn assign_role(&self, member: UserId, role: RoleId) -> AppResult<()> {
        let mut state = self.lock();
        if state.fail_role_grants {
            return Err(AppError::platform(format!(
                "role grant {role} to {member} rejected"
            )));
        }
        let role_entry = state
            .roles
            .iter()
            .find(|r| r.id == role)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("role {role}")))?;
        let target = state
            .members
            .get_mut(&member)
            .ok_or_else(|| AppError::not_found(format!("member {member}")))?;
        if !target.has_role(role) {
            target.roles.push(role_entry);
        }
        state.role_grants.push((member, role));
        Ok(())
    }

    async fn role_by_name(&self, name: &str) -> AppResult<Option<RoleId>> {
        Ok(self
            .lock()
            .roles
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(name))
            .map(|r| r.id))
    }
}
