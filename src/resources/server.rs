//! `discord_server`: a guild created, owned and deleted by the provider.
//!
//! The read and update handlers are shared with `discord_managed_server`.

use crate::core::provider::ProviderContext;
use crate::discord::model::{CreateGuild, ModifyGuild, Snowflake};
use crate::resources::resource::{Resource, ResourceError, ResourceResult};
use crate::schema::attribute::{Attribute, AttributeType, Schema};
use crate::schema::data::ResourceData;
use crate::schema::validation::{data_uri, int_between, int_one_of, snowflake};
use async_trait::async_trait;
use tracing::{debug, info, warn};

pub const SERVER_TYPE: &str = "discord_server";

/// Allowed AFK timeouts in seconds, as listed in Discord's guild object docs.
pub const AFK_TIMEOUTS: &[i64] = &[60, 300, 900, 1800, 3600];

pub fn base_server_schema() -> Schema {
    use AttributeType::{Int, String as Str};

    Schema::new()
        .with_attribute(
            "region",
            Attribute::optional(Str)
                .and_computed()
                .with_description("Voice region. Deprecated by Discord; kept for older guilds."),
        )
        .with_attribute(
            "verification_level",
            Attribute::optional(Int)
                .with_default(0)
                .with_validator(int_between(0, 4)),
        )
        .with_attribute(
            "explicit_content_filter",
            Attribute::optional(Int)
                .with_default(0)
                .with_validator(int_between(0, 2)),
        )
        .with_attribute(
            "default_message_notifications",
            Attribute::optional(Int)
                .with_default(0)
                .with_validator(int_one_of(&[0, 1])),
        )
        .with_attribute(
            "afk_channel_id",
            Attribute::optional(Str).with_validator(snowflake()),
        )
        .with_attribute(
            "afk_timeout",
            Attribute::optional(Int)
                .with_default(300)
                .with_validator(int_one_of(AFK_TIMEOUTS)),
        )
        .with_attribute(
            "icon_url",
            Attribute::optional(Str).with_description("Remote image used as the guild icon."),
        )
        .with_attribute(
            "icon_data_uri",
            Attribute::optional(Str)
                .with_validator(data_uri())
                .with_description("Inline icon image. Takes precedence over icon_url."),
        )
        .with_attribute("icon_hash", Attribute::computed(Str))
        .with_attribute("splash_url", Attribute::optional(Str))
        .with_attribute(
            "splash_data_uri",
            Attribute::optional(Str).with_validator(data_uri()),
        )
        .with_attribute("splash_hash", Attribute::computed(Str))
        .with_attribute(
            "owner_id",
            Attribute::optional(Str).with_validator(snowflake()),
        )
}

pub fn server_schema() -> Schema {
    base_server_schema()
        .with_attribute("server_id", Attribute::computed(AttributeType::String))
        .with_attribute("name", Attribute::required(AttributeType::String))
}

pub(crate) fn parse_id(attribute: &'static str, value: &str) -> ResourceResult<Snowflake> {
    value.parse().map_err(|_| ResourceError::InvalidId {
        attribute,
        value: value.to_string(),
    })
}

/// Validated integer attributes always fit; out-of-range values fall back to 0.
fn get_u8(d: &ResourceData, key: &str) -> u8 {
    u8::try_from(d.get_int(key)).unwrap_or_default()
}

fn get_u32(d: &ResourceData, key: &str) -> u32 {
    u32::try_from(d.get_int(key)).unwrap_or_default()
}

/// Image for a new guild. The data URI wins when both inputs are set.
async fn configured_image(
    ctx: &ProviderContext,
    d: &ResourceData,
    url_key: &str,
    data_uri_key: &str,
) -> ResourceResult<Option<String>> {
    if let Some(data_uri) = d.get_str_ok(data_uri_key) {
        return Ok(Some(data_uri));
    }
    match d.get_str_ok(url_key) {
        Some(url) => ctx
            .images
            .load(&url)
            .await
            .map(Some)
            .map_err(|e| ResourceError::api("Failed to load image", e)),
        None => Ok(None),
    }
}

/// Image patch for an existing guild: `None` when neither input changed,
/// `Some(None)` to clear the image.
async fn changed_image(
    ctx: &ProviderContext,
    d: &ResourceData,
    url_key: &str,
    data_uri_key: &str,
) -> ResourceResult<Option<Option<String>>> {
    if !d.has_change(url_key) && !d.has_change(data_uri_key) {
        return Ok(None);
    }
    configured_image(ctx, d, url_key, data_uri_key)
        .await
        .map(Some)
}

/// Refresh state from the guild. A guild that no longer exists clears the id.
pub(crate) async fn read_server(ctx: &ProviderContext, d: &mut ResourceData) -> ResourceResult<()> {
    let guild_id = parse_id("id", d.id())?;

    let guild = match ctx.client.get_guild(guild_id).await {
        Ok(guild) => guild,
        Err(e) if e.is_not_found() => {
            warn!("Guild {} no longer exists, removing it from state", guild_id);
            d.set_id("");
            return Ok(());
        }
        Err(e) => return Err(ResourceError::api("Error fetching server", e)),
    };

    d.set("server_id", guild.id.to_string())?;
    d.set("name", guild.name.clone())?;
    // v10 payloads may omit the deprecated region; keep what we had.
    if let Some(region) = &guild.region {
        d.set("region", region.clone())?;
    }
    d.set("verification_level", guild.verification_level)?;
    d.set("explicit_content_filter", guild.explicit_content_filter)?;
    d.set(
        "default_message_notifications",
        guild.default_message_notifications,
    )?;
    d.set("afk_timeout", guild.afk_timeout)?;
    d.set("icon_hash", guild.icon.clone().unwrap_or_default())?;
    d.set("splash_hash", guild.splash.clone().unwrap_or_default())?;

    if let Some(channel) = guild.afk_channel_id.filter(|c| !c.is_zero()) {
        d.set("afk_channel_id", channel.to_string())?;
    }

    // Only track the owner when the configuration asks for it.
    if !d.get_string("owner_id").is_empty() && !guild.owner_id.is_zero() {
        d.set("owner_id", guild.owner_id.to_string())?;
    }

    debug!("Refreshed guild {}", guild_id);
    Ok(())
}

/// Send one PATCH containing every changed attribute, then refresh.
pub(crate) async fn update_server(
    ctx: &ProviderContext,
    d: &mut ResourceData,
) -> ResourceResult<()> {
    let guild_id = parse_id("id", d.id())?;
    let guild = ctx
        .client
        .get_guild(guild_id)
        .await
        .map_err(|e| ResourceError::api("Error fetching server", e))?;

    let mut patch = ModifyGuild {
        icon: changed_image(ctx, d, "icon_url", "icon_data_uri").await?,
        splash: changed_image(ctx, d, "splash_url", "splash_data_uri").await?,
        ..Default::default()
    };

    if d.has_change("afk_channel_id") {
        patch.afk_channel_id = Some(match d.get_str_ok("afk_channel_id") {
            Some(id) => Some(parse_id("afk_channel_id", &id)?),
            None => None,
        });
    }
    if d.has_change("afk_timeout") {
        patch.afk_timeout = Some(get_u32(d, "afk_timeout"));
    }
    if d.has_change("verification_level") {
        patch.verification_level = Some(get_u8(d, "verification_level"));
    }
    if d.has_change("default_message_notifications") {
        patch.default_message_notifications = Some(get_u8(d, "default_message_notifications"));
    }
    if d.has_change("explicit_content_filter") {
        patch.explicit_content_filter = Some(get_u8(d, "explicit_content_filter"));
    }
    // Discord has no way to unset a name or region, so empty values are skipped.
    if d.has_change("name") {
        patch.name = d.get_str_ok("name");
    }
    if d.has_change("region") {
        patch.region = d.get_str_ok("region");
    }
    // Re-sending the current owner fails with "User is already owner".
    if d.has_change("owner_id") {
        if let Some(owner) = d.get_str_ok("owner_id") {
            let owner = parse_id("owner_id", &owner)?;
            if owner != guild.owner_id {
                patch.owner_id = Some(owner);
            }
        }
    }

    if patch.is_empty() {
        debug!("No changes to send for guild {}", guild_id);
    } else {
        debug!("Updating guild {}: {:?}", guild_id, patch);
        ctx.client
            .modify_guild(guild_id, &patch)
            .await
            .map_err(|e| ResourceError::api("Failed to edit server", e))?;
        info!("Updated guild {}", guild_id);
    }

    read_server(ctx, d).await
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ServerResource;

#[async_trait]
impl Resource for ServerResource {
    fn type_name(&self) -> &'static str {
        SERVER_TYPE
    }

    fn schema(&self) -> Schema {
        server_schema()
    }

    async fn create(&self, ctx: &ProviderContext, d: &mut ResourceData) -> ResourceResult<()> {
        let request = CreateGuild {
            name: d.get_string("name"),
            region: d.get_str_ok("region"),
            icon: configured_image(ctx, d, "icon_url", "icon_data_uri").await?,
            verification_level: get_u8(d, "verification_level"),
            default_message_notifications: get_u8(d, "default_message_notifications"),
            explicit_content_filter: get_u8(d, "explicit_content_filter"),
        };

        let guild = ctx
            .client
            .create_guild(&request)
            .await
            .map_err(|e| ResourceError::api("Failed to create server", e))?;
        // Track the guild before anything else can fail so it is never orphaned.
        d.set_id(guild.id.to_string());
        info!("Created guild {} ({})", guild.name, guild.id);

        let channels = ctx
            .client
            .get_guild_channels(guild.id)
            .await
            .map_err(|e| ResourceError::api("Failed to fetch channels for new server", e))?;
        for channel in &channels {
            ctx.client
                .delete_channel(channel.id)
                .await
                .map_err(|e| ResourceError::api("Failed to delete channel for new server", e))?;
        }
        debug!("Deleted {} default channels of guild {}", channels.len(), guild.id);

        let mut patch = ModifyGuild {
            splash: configured_image(ctx, d, "splash_url", "splash_data_uri")
                .await?
                .map(Some),
            ..Default::default()
        };
        if let Some(channel) = d.get_str_ok("afk_channel_id") {
            patch.afk_channel_id = Some(Some(parse_id("afk_channel_id", &channel)?));
        }
        if d.get_ok("afk_timeout").is_some() {
            let timeout = get_u32(d, "afk_timeout");
            if timeout != guild.afk_timeout {
                patch.afk_timeout = Some(timeout);
            }
        }
        if !patch.is_empty() {
            ctx.client
                .modify_guild(guild.id, &patch)
                .await
                .map_err(|e| ResourceError::api("Failed to edit server", e))?;
        }

        // Re-sending the current owner fails with "User is already owner".
        if let Some(owner) = d.get_str_ok("owner_id") {
            let owner = parse_id("owner_id", &owner)?;
            if owner != guild.owner_id {
                let transfer = ModifyGuild {
                    owner_id: Some(owner),
                    ..Default::default()
                };
                ctx.client
                    .modify_guild(guild.id, &transfer)
                    .await
                    .map_err(|e| ResourceError::api("Failed to edit server", e))?;
                info!("Transferred ownership of guild {} to {}", guild.id, owner);
            }
        }

        read_server(ctx, d).await
    }

    async fn read(&self, ctx: &ProviderContext, d: &mut ResourceData) -> ResourceResult<()> {
        read_server(ctx, d).await
    }

    async fn update(&self, ctx: &ProviderContext, d: &mut ResourceData) -> ResourceResult<()> {
        update_server(ctx, d).await
    }

    async fn delete(&self, ctx: &ProviderContext, d: &mut ResourceData) -> ResourceResult<()> {
        let guild_id = parse_id("id", d.id())?;
        match ctx.client.delete_guild(guild_id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                warn!("Guild {} was already deleted, removing it from state", guild_id);
            }
            Err(e) => return Err(ResourceError::api("Failed to delete server", e)),
        }
        d.set_id("");
        Ok(())
    }
}
