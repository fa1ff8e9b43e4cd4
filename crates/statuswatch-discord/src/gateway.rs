//! Discord gateway session.
//!
//! Connects, identifies, heartbeats on the interval advertised in HELLO, and
//! turns the dispatches the watcher cares about into [`PlatformEvent`]s.
//! A dropped or unhealthy session is reconnected after a fixed delay until
//! the cancellation token fires. Sessions are not resumed; every reconnect
//! identifies afresh and the guild's presences are replayed in GUILD_CREATE.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing;

use statuswatch_core::config::PlatformConfig;
use statuswatch_core::error::{AppError, ErrorKind};
use statuswatch_core::events::PlatformEvent;
use statuswatch_core::result::AppResult;
use statuswatch_core::types::{ChannelId, GuildId, RawPresence, UserId};

use crate::cache::PresenceCache;
use crate::model::{GatewayPayload, intents, opcode};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// How long to wait for HELLO after connecting.
const HELLO_TIMEOUT: Duration = Duration::from_secs(10);

/// Why a session ended without a transport error.
#[derive(Debug)]
enum SessionEnd {
    /// Shutdown requested, or nobody is listening for events anymore.
    Stopped,
    /// The session should be replaced.
    Reconnect(String),
}

/// Per-session heartbeat bookkeeping.
#[derive(Debug, Default)]
struct SessionState {
    /// Last sequence number received
    seq: Option<u64>,
    /// A heartbeat was sent and not yet acknowledged
    awaiting_ack: bool,
}

/// Long-running gateway client.
#[derive(Debug)]
pub struct Gateway {
    url: String,
    token: String,
    guild: GuildId,
    reconnect_delay: Duration,
    presences: Arc<PresenceCache>,
    events: mpsc::Sender<PlatformEvent>,
}

impl Gateway {
    /// Create a gateway client feeding `events`.
    pub fn new(
        config: &PlatformConfig,
        guild: GuildId,
        presences: Arc<PresenceCache>,
        events: mpsc::Sender<PlatformEvent>,
    ) -> Self {
        Self {
            url: config.gateway_url.clone(),
            token: config.token.clone(),
            guild,
            reconnect_delay: Duration::from_secs(config.reconnect_delay_seconds),
            presences,
            events,
        }
    }

    /// Run sessions until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) {
        loop {
            match self.session(&cancel).await {
                Ok(SessionEnd::Stopped) => break,
                Ok(SessionEnd::Reconnect(reason)) => {
                    tracing::warn!(reason = %reason, "Gateway session ended, reconnecting");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Gateway session failed, reconnecting");
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }
        tracing::info!("Gateway stopped");
    }

    async fn session(&self, cancel: &CancellationToken) -> AppResult<SessionEnd> {
        let (ws, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Platform, "Gateway connect failed", e))?;
        let (mut sink, mut stream) = ws.split();

        let hello = match tokio::time::timeout(HELLO_TIMEOUT, stream.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => {
                serde_json::from_str::<GatewayPayload>(text.as_str())?
            }
            Ok(other) => {
                return Ok(SessionEnd::Reconnect(format!("expected HELLO, got {other:?}")));
            }
            Err(_) => return Ok(SessionEnd::Reconnect("timed out waiting for HELLO".into())),
        };
        if hello.op != opcode::HELLO {
            return Ok(SessionEnd::Reconnect(format!("expected HELLO, got op {}", hello.op)));
        }
        let interval_ms = hello.d["heartbeat_interval"].as_u64().unwrap_or(41_250);
        let interval = Duration::from_millis(interval_ms);

        send(&mut sink, &identify(&self.token)).await?;
        tracing::info!(heartbeat_ms = interval_ms, "Gateway identified");

        let first_beat = tokio::time::Instant::now() + interval;
        let mut heartbeat = tokio::time::interval_at(first_beat, interval);
        let mut state = SessionState::default();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    let _ = sink.send(Message::Close(None)).await;
                    return Ok(SessionEnd::Stopped);
                }
                _ = heartbeat.tick() => {
                    if state.awaiting_ack {
                        return Ok(SessionEnd::Reconnect("heartbeat not acknowledged".into()));
                    }
                    send(&mut sink, &heartbeat_payload(state.seq)).await?;
                    state.awaiting_ack = true;
                }
                frame = stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        let end = self.on_frame(&mut sink, &mut state, text.as_str()).await?;
                        if let Some(end) = end {
                            return Ok(end);
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(frame))) => {
                        return Ok(SessionEnd::Reconnect(format!("closed by server: {frame:?}")));
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        let message = "Gateway read failed";
                        return Err(AppError::with_source(ErrorKind::Platform, message, e));
                    }
                    None => return Ok(SessionEnd::Reconnect("stream ended".into())),
                }
            }
        }
    }

    /// Handle one text frame. `Some` ends the session.
    async fn on_frame(
        &self,
        sink: &mut WsSink,
        state: &mut SessionState,
        text: &str,
    ) -> AppResult<Option<SessionEnd>> {
        let payload: GatewayPayload = match serde_json::from_str(text) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring malformed gateway frame");
                return Ok(None);
            }
        };
        if payload.s.is_some() {
            state.seq = payload.s;
        }

        match payload.op {
            opcode::DISPATCH => {
                if !self.dispatch(payload).await {
                    return Ok(Some(SessionEnd::Stopped));
                }
            }
            opcode::HEARTBEAT => send(sink, &heartbeat_payload(state.seq)).await?,
            opcode::HEARTBEAT_ACK => state.awaiting_ack = false,
            opcode::RECONNECT => {
                return Ok(Some(SessionEnd::Reconnect("server requested reconnect".into())));
            }
            opcode::INVALID_SESSION => {
                return Ok(Some(SessionEnd::Reconnect("invalid session".into())));
            }
            op => tracing::trace!(op, "Unhandled gateway opcode"),
        }
        Ok(None)
    }

    /// Apply a dispatch to the cache and forward its events. Returns `false`
    /// once the receiver is gone.
    ///
    /// Our guild's GUILD_CREATE swaps in the presence snapshot before
    /// `Ready` goes out, so consumers reacting to `Ready` see a synced cache.
    async fn dispatch(&self, payload: GatewayPayload) -> bool {
        let Some(name) = payload.t.as_deref() else {
            return true;
        };
        if name == "GUILD_CREATE" {
            let Some(snapshot) = decode_guild_presences(&payload.d, self.guild) else {
                return true;
            };
            tracing::info!(presences = snapshot.len(), "Guild presences synced");
            self.presences.replace(snapshot);
            return self.forward(PlatformEvent::Ready).await;
        }

        for event in decode_dispatch(name, &payload.d, self.guild) {
            match &event {
                PlatformEvent::PresenceChanged { entity, status } => {
                    self.presences.update(*entity, *status);
                }
                PlatformEvent::MemberRemoved { member } => self.presences.update(*member, None),
                _ => {}
            }
            if !self.forward(event).await {
                return false;
            }
        }
        true
    }

    async fn forward(&self, event: PlatformEvent) -> bool {
        tracing::trace!(kind = event.kind(), "Gateway event");
        self.events.send(event).await.is_ok()
    }
}

async fn send(sink: &mut WsSink, payload: &Value) -> AppResult<()> {
    sink.send(Message::text(payload.to_string()))
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Platform, "Gateway write failed", e))
}

fn identify(token: &str) -> Value {
    json!({
        "op": opcode::IDENTIFY,
        "d": {
            "token": token,
            "intents": intents::WATCHER,
            "properties": {
                "os": std::env::consts::OS,
                "browser": "statuswatch",
                "device": "statuswatch",
            },
        },
    })
}

fn heartbeat_payload(seq: Option<u64>) -> Value {
    json!({ "op": opcode::HEARTBEAT, "d": seq })
}

#[derive(Deserialize)]
struct IdOnly {
    id: UserId,
}

#[derive(Deserialize)]
struct PresenceData {
    user: IdOnly,
    #[serde(default)]
    guild_id: Option<GuildId>,
    status: String,
}

#[derive(Deserialize)]
struct GuildCreateData {
    id: GuildId,
    #[serde(default)]
    presences: Vec<PresenceData>,
}

#[derive(Deserialize)]
struct Author {
    id: UserId,
    #[serde(default)]
    bot: bool,
}

#[derive(Deserialize)]
struct MessageData {
    #[serde(default)]
    guild_id: Option<GuildId>,
    channel_id: ChannelId,
    author: Author,
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct MemberData {
    guild_id: GuildId,
    user: IdOnly,
}

fn parse<T: for<'de> Deserialize<'de>>(name: &str, data: &Value) -> Option<T> {
    match T::deserialize(data) {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(event = name, error = %e, "Failed to decode dispatch");
            None
        }
    }
}

/// Presences carried by GUILD_CREATE, if it is for `guild`.
pub fn decode_guild_presences(
    data: &Value,
    guild: GuildId,
) -> Option<Vec<(UserId, RawPresence)>> {
    parse::<GuildCreateData>("GUILD_CREATE", data)
        .filter(|g| g.id == guild)
        .map(|g| {
            g.presences
                .into_iter()
                .map(|p| (p.user.id, RawPresence::from_str_value(&p.status)))
                .collect()
        })
}

/// Normalize one dispatch into platform events for `guild`.
///
/// The session counts as ready once our guild's GUILD_CREATE arrives, not on
/// READY, since only then are presences known. Dispatches for other guilds,
/// bot-authored messages, and event types the watcher does not consume yield
/// nothing.
pub fn decode_dispatch(name: &str, data: &Value, guild: GuildId) -> Vec<PlatformEvent> {
    match name {
        "GUILD_CREATE" => decode_guild_presences(data, guild)
            .map(|_| vec![PlatformEvent::Ready])
            .unwrap_or_default(),
        "PRESENCE_UPDATE" => parse::<PresenceData>(name, data)
            .filter(|p| p.guild_id == Some(guild))
            .map(|p| PlatformEvent::PresenceChanged {
                entity: p.user.id,
                status: Some(RawPresence::from_str_value(&p.status)),
            })
            .into_iter()
            .collect(),
        "MESSAGE_CREATE" => parse::<MessageData>(name, data)
            .filter(|m| m.guild_id == Some(guild) && !m.author.bot && !m.content.is_empty())
            .map(|m| PlatformEvent::MessageReceived {
                author: m.author.id,
                channel: m.channel_id,
                text: m.content,
            })
            .into_iter()
            .collect(),
        "GUILD_MEMBER_ADD" => parse::<MemberData>(name, data)
            .filter(|m| m.guild_id == guild)
            .map(|m| PlatformEvent::MemberJoined { member: m.user.id })
            .into_iter()
            .collect(),
        "GUILD_MEMBER_REMOVE" => parse::<MemberData>(name, data)
            .filter(|m| m.guild_id == guild)
            .map(|m| PlatformEvent::MemberRemoved { member: m.user.id })
            .into_iter()
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GUILD: GuildId = GuildId::new(100);

    #[test]
    fn test_decode_presence_update() {
        let data = json!({
            "user": {"id": "42"},
            "guild_id": "100",
            "status": "dnd",
        });
        assert_eq!(
            decode_dispatch("PRESENCE_UPDATE", &data, GUILD),
            vec![PlatformEvent::PresenceChanged {
                entity: UserId::new(42),
                status: Some(RawPresence::DoNotDisturb),
            }]
        );
        let other = json!({"user": {"id": "42"}, "guild_id": "999", "status": "online"});
        assert!(decode_dispatch("PRESENCE_UPDATE", &other, GUILD).is_empty());
    }

    #[test]
    fn test_guild_create_signals_ready() {
        let data = json!({
            "id": "100",
            "presences": [
                {"user": {"id": "1"}, "status": "online"},
                {"user": {"id": "2"}, "status": "idle"},
            ],
        });
        assert_eq!(
            decode_dispatch("GUILD_CREATE", &data, GUILD),
            vec![PlatformEvent::Ready]
        );
        assert_eq!(
            decode_guild_presences(&data, GUILD),
            Some(vec![
                (UserId::new(1), RawPresence::Online),
                (UserId::new(2), RawPresence::Idle),
            ])
        );
        assert!(decode_dispatch("READY", &json!({"v": 10}), GUILD).is_empty());

        let other = json!({"id": "999", "presences": []});
        assert!(decode_dispatch("GUILD_CREATE", &other, GUILD).is_empty());
        assert_eq!(decode_guild_presences(&other, GUILD), None);
    }

    #[test]
    fn test_decode_messages_skip_bots() {
        let human = json!({
            "guild_id": "100",
            "channel_id": "7",
            "author": {"id": "5"},
            "content": "!status",
        });
        let bot = json!({
            "guild_id": "100",
            "channel_id": "7",
            "author": {"id": "6", "bot": true},
            "content": "!status",
        });
        assert_eq!(
            decode_dispatch("MESSAGE_CREATE", &human, GUILD),
            vec![PlatformEvent::MessageReceived {
                author: UserId::new(5),
                channel: ChannelId::new(7),
                text: "!status".into(),
            }]
        );
        assert!(decode_dispatch("MESSAGE_CREATE", &bot, GUILD).is_empty());
    }

    #[test]
    fn test_decode_membership() {
        let data = json!({"guild_id": "100", "user": {"id": "9", "username": "x"}});
        assert_eq!(
            decode_dispatch("GUILD_MEMBER_REMOVE", &data, GUILD),
            vec![PlatformEvent::MemberRemoved { member: UserId::new(9) }]
        );
        assert_eq!(
            decode_dispatch("GUILD_MEMBER_ADD", &data, GUILD),
            vec![PlatformEvent::MemberJoined { member: UserId::new(9) }]
        );
        assert!(decode_dispatch("TYPING_START", &data, GUILD).is_empty());
    }

    #[test]
    fn test_identify_requests_watcher_intents() {
        let payload = identify("secret");
        assert_eq!(payload["op"], 2);
        assert_eq!(payload["d"]["intents"], intents::WATCHER);
    }
}
