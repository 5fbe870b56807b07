//! Discord REST types used by the guild resources.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid snowflake '{0}'")]
pub struct SnowflakeParseError(pub String);

/// Discord's 64-bit identifier. Zero is treated as "unset".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Snowflake(u64);

impl Snowflake {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Snowflake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Snowflake {
    type Err = SnowflakeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Snowflake)
            .map_err(|_| SnowflakeParseError(s.to_string()))
    }
}

impl Serialize for Snowflake {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Snowflake {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Discord sends ids as strings, but older payloads and fixtures use numbers.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Str(String),
            Num(u64),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Str(s) => s.parse().map_err(serde::de::Error::custom),
            Repr::Num(n) => Ok(Snowflake(n)),
        }
    }
}

/// Guild object as returned by `GET /guilds/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Guild {
    pub id: Snowflake,
    pub name: String,
    /// Deprecated by Discord in favour of per-channel RTC regions; kept for older guilds.
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub splash: Option<String>,
    #[serde(default)]
    pub owner_id: Snowflake,
    #[serde(default)]
    pub afk_channel_id: Option<Snowflake>,
    #[serde(default)]
    pub afk_timeout: u32,
    #[serde(default)]
    pub verification_level: u8,
    #[serde(default)]
    pub default_message_notifications: u8,
    #[serde(default)]
    pub explicit_content_filter: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: Snowflake,
    #[serde(rename = "type")]
    pub channel_type: i32,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Body of `POST /guilds`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CreateGuild {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub verification_level: u8,
    pub default_message_notifications: u8,
    pub explicit_content_filter: u8,
}

/// Body of `PATCH /guilds/{id}`.
///
/// `None` leaves a field untouched. For the nullable fields, `Some(None)`
/// is sent as an explicit `null` and clears the value on Discord's side.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModifyGuild {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_level: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_message_notifications: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explicit_content_filter: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub afk_channel_id: Option<Option<Snowflake>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub afk_timeout: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub splash: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<Snowflake>,
}

impl ModifyGuild {
    /// True when the patch would not change anything.
    pub fn is_empty(&self) -> bool {
        self == &ModifyGuild::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_snowflake_parse() {
        let id: Snowflake = "81384788765712384".parse().unwrap();
        assert_eq!(id.get(), 81384788765712384);
        assert_eq!(id.to_string(), "81384788765712384");
        assert!("".parse::<Snowflake>().is_err());
        assert!("abc".parse::<Snowflake>().is_err());
        assert!(Snowflake::default().is_zero());
    }

    #[test]
    fn test_snowflake_accepts_string_and_number() {
        let from_str: Snowflake = serde_json::from_value(json!("42")).unwrap();
        let from_num: Snowflake = serde_json::from_value(json!(42)).unwrap();
        assert_eq!(from_str, from_num);
        assert_eq!(serde_json::to_value(from_str).unwrap(), json!("42"));
    }

    #[test]
    fn test_guild_deserializes_sparse_payload() {
        let guild: Guild = serde_json::from_value(json!({
            "id": "197038439483310086",
            "name": "Discord Testers",
            "icon": null,
            "owner_id": "73193882359173120",
            "afk_timeout": 300,
            "verification_level": 3,
            "unknown_field": true
        }))
        .unwrap();

        assert_eq!(guild.name, "Discord Testers");
        assert_eq!(guild.icon, None);
        assert_eq!(guild.afk_channel_id, None);
        assert_eq!(guild.owner_id, Snowflake::new(73193882359173120));
        assert_eq!(guild.verification_level, 3);
    }

    #[test]
    fn test_modify_guild_omits_untouched_and_nulls_cleared() {
        let patch = ModifyGuild {
            afk_timeout: Some(900),
            icon: Some(None),
            afk_channel_id: Some(Some(Snowflake::new(7))),
            ..Default::default()
        };

        let body = serde_json::to_value(&patch).unwrap();
        assert_eq!(
            body,
            json!({"afk_timeout": 900, "icon": null, "afk_channel_id": "7"})
        );
        assert!(!patch.is_empty());
        assert!(ModifyGuild::default().is_empty());
    }
}
