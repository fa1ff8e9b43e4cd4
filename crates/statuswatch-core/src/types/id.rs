//! Newtype wrappers around platform snowflake identifiers.
//!
//! Using distinct types prevents accidentally passing a `ChannelId` where a
//! `UserId` is expected. Ids serialize as decimal strings (the platform's
//! wire form and the persisted state file's key form) and deserialize from
//! either a string or an integer, so configuration files may use both.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Milliseconds between the Unix epoch and the platform's snowflake epoch.
pub const SNOWFLAKE_EPOCH_MS: u64 = 1_420_070_400_000;

/// Extracts the creation timestamp embedded in a snowflake id.
pub fn snowflake_timestamp(raw: u64) -> DateTime<Utc> {
    let millis = (raw >> 22) + SNOWFLAKE_EPOCH_MS;
    DateTime::from_timestamp_millis(millis as i64).unwrap_or_default()
}

/// Either wire form of a snowflake.
#[derive(Deserialize)]
#[serde(untagged)]
enum SnowflakeRepr {
    Int(u64),
    Str(String),
}

impl SnowflakeRepr {
    fn into_raw(self) -> Result<u64, String> {
        match self {
            Self::Int(v) => Ok(v),
            Self::Str(s) => s
                .trim()
                .parse()
                .map_err(|e| format!("invalid snowflake '{s}': {e}")),
        }
    }
}

/// Macro to define a newtype ID wrapper around a `u64` snowflake.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "SnowflakeRepr", into = "String")]
        pub struct $name(pub u64);

        impl $name {
            /// Wrap a raw snowflake value.
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// Return the raw snowflake value.
            pub const fn get(self) -> u64 {
                self.0
            }

            /// Creation time encoded in the snowflake.
            pub fn created_at(self) -> DateTime<Utc> {
                snowflake_timestamp(self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> u64 {
                id.0
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> String {
                id.0.to_string()
            }
        }

        impl TryFrom<SnowflakeRepr> for $name {
            type Error = String;

            fn try_from(repr: SnowflakeRepr) -> Result<Self, Self::Error> {
                repr.into_raw().map(Self)
            }
        }
    };
}

define_id!(
    /// Identifier of a user account: a human member, a monitored worker
    /// entity, or the watcher's own service account.
    UserId
);

define_id!(
    /// Identifier of a channel or a category (container).
    ChannelId
);

define_id!(
    /// Identifier of a role (access tag).
    RoleId
);

define_id!(
    /// Identifier of the shared workspace (guild).
    GuildId
);

impl UserId {
    /// The platform's mention markup for this user.
    pub fn mention(self) -> String {
        format!("<@{}>", self.0)
    }
}
