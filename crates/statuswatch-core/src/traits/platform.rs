//! The collaboration platform seen as a black box.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::{
    AccessRule, ChannelId, Member, MessagePayload, RawPresence, ResourceInfo, RoleId, UserId,
};

/// Query and resource-management surface of the collaboration platform.
///
/// Every call is bounded by the adapter's request timeout and fails with an
/// [`ErrorKind::Platform`](crate::error::ErrorKind::Platform) error rather
/// than blocking. Nothing here retries.
#[async_trait]
pub trait Platform: Send + Sync + std::fmt::Debug + 'static {
    /// Id of the controlling service account.
    fn self_id(&self) -> UserId;

    /// Current presence of an account, `None` if it is not in the workspace.
    async fn presence(&self, entity: UserId) -> AppResult<Option<RawPresence>>;

    /// A single member, `None` if not in the workspace.
    async fn member(&self, id: UserId) -> AppResult<Option<Member>>;

    /// All members of the workspace.
    async fn members(&self) -> AppResult<Vec<Member>>;

    /// Resources currently inside a container.
    async fn resources(&self, container: ChannelId) -> AppResult<Vec<ResourceInfo>>;

    /// Post a message into a channel.
    async fn send_message(&self, channel: ChannelId, payload: &MessagePayload) -> AppResult<()>;

    /// Create a resource inside a container with the given access rules.
    async fn create_resource(
        &self,
        container: ChannelId,
        name: &str,
        access: &[AccessRule],
    ) -> AppResult<ChannelId>;

    /// Move a resource into another container.
    async fn move_resource(&self, resource: ChannelId, container: ChannelId) -> AppResult<()>;

    /// Grant a role to a member.
    async fn assign_role(&self, member: UserId, role: RoleId) -> AppResult<()>;

    /// Look up a role by name (case-insensitive).
    async fn role_by_name(&self, name: &str) -> AppResult<Option<RoleId>>;
}
