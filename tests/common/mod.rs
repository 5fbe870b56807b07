#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use tfdiscord::discord::error::{DiscordError, DiscordResult, UNKNOWN_GUILD};
use tfdiscord::discord::image::{to_data_uri, ImageLoader};
use tfdiscord::discord::model::{Channel, CreateGuild, Guild, ModifyGuild, Snowflake};
use tfdiscord::discord::DiscordApi;
use tfdiscord::{Provider, ProviderContext, Runner};

/// User id the mock bot creates guilds as.
pub const BOT_USER_ID: u64 = 1000;

/// Hash the mock assigns to an uploaded image.
pub fn image_hash(data_uri: &str) -> String {
    format!("hash-{}", data_uri.len())
}

/// In-memory stand-in for the Discord REST API.
#[derive(Default)]
pub struct MockDiscord {
    next_id: AtomicU64,
    pub guilds: Mutex<BTreeMap<Snowflake, Guild>>,
    pub channels: Mutex<BTreeMap<Snowflake, Vec<Channel>>>,
    pub calls: Mutex<Vec<String>>,
    pub patches: Mutex<Vec<ModifyGuild>>,
    failing: Mutex<Option<&'static str>>,
}

impl MockDiscord {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicU64::new(500),
            ..Default::default()
        })
    }

    fn next_id(&self) -> Snowflake {
        Snowflake::new(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Make every later call to `operation` fail with a 500.
    pub async fn fail_on(&self, operation: &'static str) {
        *self.failing.lock().await = Some(operation);
    }

    pub async fn recover(&self) {
        *self.failing.lock().await = None;
    }

    /// Seed a guild that exists before the provider touches it.
    pub async fn insert_guild(&self, guild: Guild) {
        self.guilds.lock().await.insert(guild.id, guild);
    }

    pub async fn guild(&self, id: &str) -> Option<Guild> {
        let id: Snowflake = id.parse().ok()?;
        self.guilds.lock().await.get(&id).cloned()
    }

    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }

    pub async fn patches(&self) -> Vec<ModifyGuild> {
        self.patches.lock().await.clone()
    }

    pub async fn clear_log(&self) {
        self.calls.lock().await.clear();
        self.patches.lock().await.clear();
    }

    async fn record(&self, call: String, operation: &'static str) -> DiscordResult<()> {
        self.calls.lock().await.push(call);
        if *self.failing.lock().await == Some(operation) {
            return Err(DiscordError::Api {
                status: 500,
                code: 0,
                message: "Internal Server Error".to_string(),
            });
        }
        Ok(())
    }
}

fn unknown_guild() -> DiscordError {
    DiscordError::Api {
        status: 404,
        code: UNKNOWN_GUILD,
        message: "Unknown Guild".to_string(),
    }
}

#[async_trait]
impl DiscordApi for MockDiscord {
    async fn create_guild(&self, request: &CreateGuild) -> DiscordResult<Guild> {
        self.record("create_guild".to_string(), "create_guild").await?;

        let id = self.next_id();
        let guild = Guild {
            id,
            name: request.name.clone(),
            region: request.region.clone(),
            icon: request.icon.as_deref().map(image_hash),
            splash: None,
            owner_id: Snowflake::new(BOT_USER_ID),
            afk_channel_id: None,
            afk_timeout: 300,
            verification_level: request.verification_level,
            default_message_notifications: request.default_message_notifications,
            explicit_content_filter: request.explicit_content_filter,
        };

        let defaults = ["general", "General"]
            .iter()
            .enumerate()
            .map(|(i, name)| Channel {
                id: self.next_id(),
                channel_type: if i == 0 { 0 } else { 2 },
                guild_id: Some(id),
                name: Some(name.to_string()),
            })
            .collect();

        self.channels.lock().await.insert(id, defaults);
        self.guilds.lock().await.insert(id, guild.clone());
        Ok(guild)
    }

    async fn get_guild(&self, guild_id: Snowflake) -> DiscordResult<Guild> {
        self.record(format!("get_guild {}", guild_id), "get_guild").await?;
        self.guilds
            .lock()
            .await
            .get(&guild_id)
            .cloned()
            .ok_or_else(unknown_guild)
    }

    async fn modify_guild(
        &self,
        guild_id: Snowflake,
        request: &ModifyGuild,
    ) -> DiscordResult<Guild> {
        self.record(format!("modify_guild {}", guild_id), "modify_guild")
            .await?;
        self.patches.lock().await.push(request.clone());

        let mut guilds = self.guilds.lock().await;
        let guild = guilds.get_mut(&guild_id).ok_or_else(unknown_guild)?;

        if let Some(name) = &request.name {
            guild.name = name.clone();
        }
        if let Some(region) = &request.region {
            guild.region = Some(region.clone());
        }
        if let Some(level) = request.verification_level {
            guild.verification_level = level;
        }
        if let Some(level) = request.default_message_notifications {
            guild.default_message_notifications = level;
        }
        if let Some(level) = request.explicit_content_filter {
            guild.explicit_content_filter = level;
        }
        if let Some(channel) = request.afk_channel_id {
            guild.afk_channel_id = channel;
        }
        if let Some(timeout) = request.afk_timeout {
            guild.afk_timeout = timeout;
        }
        if let Some(icon) = &request.icon {
            guild.icon = icon.as_deref().map(image_hash);
        }
        if let Some(splash) = &request.splash {
            guild.splash = splash.as_deref().map(image_hash);
        }
        if let Some(owner) = request.owner_id {
            guild.owner_id = owner;
        }

        Ok(guild.clone())
    }

    async fn delete_guild(&self, guild_id: Snowflake) -> DiscordResult<()> {
        self.record(format!("delete_guild {}", guild_id), "delete_guild")
            .await?;
        self.channels.lock().await.remove(&guild_id);
        self.guilds
            .lock()
            .await
            .remove(&guild_id)
            .map(|_| ())
            .ok_or_else(unknown_guild)
    }

    async fn get_guild_channels(&self, guild_id: Snowflake) -> DiscordResult<Vec<Channel>> {
        self.record(format!("get_guild_channels {}", guild_id), "get_guild_channels")
            .await?;
        Ok(self
            .channels
            .lock()
            .await
            .get(&guild_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn delete_channel(&self, channel_id: Snowflake) -> DiscordResult<()> {
        self.record(format!("delete_channel {}", channel_id), "delete_channel")
            .await?;
        for channels in self.channels.lock().await.values_mut() {
            channels.retain(|c| c.id != channel_id);
        }
        Ok(())
    }
}

/// Image loader that encodes the URL itself instead of downloading it.
#[derive(Default)]
pub struct MockImages {
    pub loaded: Mutex<Vec<String>>,
}

#[async_trait]
impl ImageLoader for MockImages {
    async fn load(&self, url: &str) -> DiscordResult<String> {
        self.loaded.lock().await.push(url.to_string());
        Ok(to_data_uri("image/png", url.as_bytes()))
    }
}

pub fn context(discord: Arc<MockDiscord>) -> ProviderContext {
    ProviderContext::new(discord, Arc::new(MockImages::default()))
}

pub fn runner(discord: Arc<MockDiscord>) -> Runner {
    Runner::new(Provider::new(), context(discord))
}

pub fn config(value: Value) -> Map<String, Value> {
    value
        .as_object()
        .cloned()
        .expect("test config must be a JSON object")
}
