//! Discord REST implementation of [`Platform`].
//!
//! Every request carries the configured timeout. Status codes map onto error
//! kinds: 404 → `NotFound`, 401/403 → `Authorization`, 429 → `RateLimit`,
//! anything else non-2xx and every transport failure → `Platform`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing;

use statuswatch_core::config::PlatformConfig;
use statuswatch_core::error::{AppError, ErrorKind};
use statuswatch_core::result::AppResult;
use statuswatch_core::traits::platform::Platform;
use statuswatch_core::types::id::snowflake_timestamp;
use statuswatch_core::types::{
    AccessRule, ChannelId, GuildId, Member, MessagePayload, RawPresence, ResourceInfo, Role,
    RoleId, UserId,
};

use crate::cache::PresenceCache;
use crate::model::{ApiChannel, ApiGuild, ApiMember, ApiRole, ApiUser, CHANNEL_TYPE_TEXT};
use crate::permissions::{is_admin, overwrites_for, owner_from_overwrites};

/// Page size for member listing.
const MEMBER_PAGE: usize = 1000;

/// Discord-backed platform.
#[derive(Debug, Clone)]
pub struct DiscordPlatform {
    client: reqwest::Client,
    api_base: String,
    token: String,
    guild: GuildId,
    /// Bot account id, fetched on connect
    self_id: UserId,
    presences: Arc<PresenceCache>,
}

impl DiscordPlatform {
    /// Build the client and resolve the bot's own id.
    pub async fn connect(
        config: &PlatformConfig,
        guild: GuildId,
        presences: Arc<PresenceCache>,
    ) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .user_agent(concat!("statuswatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                AppError::with_source(ErrorKind::Internal, "Failed to build HTTP client", e)
            })?;

        let mut platform = Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            guild,
            self_id: UserId::new(0),
            presences,
        };

        let me: ApiUser = platform.get("/users/@me").await?;
        tracing::info!(user = %me.id, name = %me.username, "Authenticated with Discord");
        platform.self_id = me.id;
        Ok(platform)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> AppResult<reqwest::Response> {
        let url = format!("{}{}", self.api_base, path);
        let mut request = self
            .client
            .request(method.clone(), &url)
            .header("Authorization", format!("Bot {}", self.token));
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            AppError::with_source(ErrorKind::Platform, format!("{method} {path} failed: {e}"), e)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = format!("{method} {path} returned {}: {}", status.as_u16(), text);
        Err(match status {
            StatusCode::NOT_FOUND => AppError::not_found(message),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppError::authorization(message),
            StatusCode::TOO_MANY_REQUESTS => AppError::rate_limit(message),
            _ => AppError::platform(message),
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> AppResult<T> {
        self.json(Method::GET, path, None).await
    }

    async fn json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> AppResult<T> {
        let response = self.send(method, path, body).await?;
        response.json::<T>().await.map_err(|e| {
            let message = format!("Malformed response from {path}");
            AppError::with_source(ErrorKind::Serialization, message, e)
        })
    }

    async fn guild(&self) -> AppResult<ApiGuild> {
        self.get(&format!("/guilds/{}", self.guild)).await
    }

    fn to_member(&self, guild: &ApiGuild, api: ApiMember) -> Option<Member> {
        let user = api.user.as_ref()?;
        let id = user.id;
        let is_bot = user.bot;
        let admin = is_admin(guild, id, &api.roles);
        let roles = guild
            .roles
            .iter()
            .filter(|r| api.roles.contains(&r.id))
            .map(|r| Role {
                id: r.id,
                name: r.name.clone(),
            })
            .collect();
        Some(Member {
            id,
            display_name: api.display_name(),
            is_bot,
            is_admin: admin,
            roles,
        })
    }

    fn to_resource(&self, channel: ApiChannel) -> ResourceInfo {
        let last_activity_at = channel
            .last_message_id
            .as_deref()
            .and_then(|raw| raw.parse::<u64>().ok())
            .map(snowflake_timestamp);
        ResourceInfo {
            id: channel.id,
            name: channel.name.unwrap_or_default(),
            parent: channel.parent_id,
            owner: owner_from_overwrites(&channel.permission_overwrites, self.self_id),
            created_at: channel.id.created_at(),
            last_activity_at,
        }
    }
}

#[async_trait]
impl Platform for DiscordPlatform {
    fn self_id(&self) -> UserId {
        self.self_id
    }

    async fn presence(&self, entity: UserId) -> AppResult<Option<RawPresence>> {
        if let Some(cached) = self.presences.get(entity) {
            return Ok(Some(cached));
        }
        // Absence only means offline once the guild snapshot is in.
        if !self.presences.is_synced() {
            return Err(AppError::platform(format!(
                "presence of {entity} unknown until the guild snapshot arrives"
            )));
        }
        let path = format!("/guilds/{}/members/{}", self.guild, entity);
        match self.get::<ApiMember>(&path).await {
            Ok(_) => Ok(Some(RawPresence::Offline)),
            Err(e) if e.kind == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn member(&self, id: UserId) -> AppResult<Option<Member>> {
        let path = format!("/guilds/{}/members/{}", self.guild, id);
        let api = match self.get::<ApiMember>(&path).await {
            Ok(api) => api,
            Err(e) if e.kind == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        let guild = self.guild().await?;
        Ok(self.to_member(&guild, api))
    }

    async fn members(&self) -> AppResult<Vec<Member>> {
        let guild = self.guild().await?;
        let mut members = Vec::new();
        let mut after = 0u64;
        loop {
            let path = format!(
                "/guilds/{}/members?limit={}&after={}",
                self.guild, MEMBER_PAGE, after
            );
            let page: Vec<ApiMember> = self.get(&path).await?;
            let count = page.len();
            for api in page {
                if let Some(id) = api.user.as_ref().map(|u| u.id.get()) {
                    after = after.max(id);
                }
                members.extend(self.to_member(&guild, api));
            }
            if count < MEMBER_PAGE {
                break;
            }
        }
        tracing::debug!(count = members.len(), "Fetched guild members");
        Ok(members)
    }

    async fn resources(&self, container: ChannelId) -> AppResult<Vec<ResourceInfo>> {
        let path = format!("/guilds/{}/channels", self.guild);
        let channels: Vec<ApiChannel> = self.get(&path).await?;
        Ok(channels
            .into_iter()
            .filter(|c| c.kind == CHANNEL_TYPE_TEXT && c.parent_id == Some(container))
            .map(|c| self.to_resource(c))
            .collect())
    }

    async fn send_message(&self, channel: ChannelId, payload: &MessagePayload) -> AppResult<()> {
        let mut body = json!({
            "allowed_mentions": {
                "parse": [],
                "users": payload.mention_users.iter().map(|u| u.to_string()).collect::<Vec<_>>(),
            }
        });
        if let Some(content) = &payload.content {
            body["content"] = json!(content);
        }
        if let Some(embed) = &payload.embed {
            let mut rendered = json!({
                "title": embed.title,
                "description": embed.description,
                "color": embed.color,
                "fields": embed.fields,
            });
            if let Some(footer) = &embed.footer {
                rendered["footer"] = json!({ "text": footer });
            }
            body["embeds"] = json!([rendered]);
        }
        self.send(Method::POST, &format!("/channels/{channel}/messages"), Some(&body))
            .await?;
        Ok(())
    }

    async fn create_resource(
        &self,
        container: ChannelId,
        name: &str,
        access: &[AccessRule],
    ) -> AppResult<ChannelId> {
        let body = json!({
            "name": name,
            "type": CHANNEL_TYPE_TEXT,
            "parent_id": container.to_string(),
            "permission_overwrites": overwrites_for(self.guild, access),
        });
        let created: ApiChannel = self
            .json(Method::POST, &format!("/guilds/{}/channels", self.guild), Some(&body))
            .await?;
        Ok(created.id)
    }

    async fn move_resource(&self, resource: ChannelId, container: ChannelId) -> AppResult<()> {
        let body = json!({
            "parent_id": container.to_string(),
            "lock_permissions": false,
        });
        self.send(Method::PATCH, &format!("/channels/{resource}"), Some(&body))
            .await?;
        Ok(())
    }

    async fn assign_role(&self, member: UserId, role: RoleId) -> AppResult<()> {
        let path = format!("/guilds/{}/members/{}/roles/{}", self.guild, member, role);
        self.send(Method::PUT, &path, None).await?;
        Ok(())
    }

    async fn role_by_name(&self, name: &str) -> AppResult<Option<RoleId>> {
        let roles: Vec<ApiRole> = self.get(&format!("/guilds/{}/roles", self.guild)).await?;
        Ok(roles
            .into_iter()
            .find(|r| r.name.eq_ignore_ascii_case(name))
            .map(|r| r.id))
    }
}
