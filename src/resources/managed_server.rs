//! `discord_managed_server`: an existing guild adopted by id.
//!
//! The provider manages its settings but never created it, so destroying
//! the resource only forgets it.

use crate::core::provider::ProviderContext;
use crate::resources::resource::{Resource, ResourceError, ResourceResult};
use crate::resources::server::{base_server_schema, parse_id, read_server, update_server};
use crate::schema::attribute::{Attribute, AttributeType, Schema};
use crate::schema::data::ResourceData;
use crate::schema::validation::snowflake;
use async_trait::async_trait;
use tracing::info;

pub const MANAGED_SERVER_TYPE: &str = "discord_managed_server";

pub fn managed_server_schema() -> Schema {
    base_server_schema()
        .with_attribute(
            "server_id",
            Attribute::required(AttributeType::String).with_validator(snowflake()),
        )
        .with_attribute(
            "name",
            Attribute::optional(AttributeType::String).and_computed(),
        )
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ManagedServerResource;

#[async_trait]
impl Resource for ManagedServerResource {
    fn type_name(&self) -> &'static str {
        MANAGED_SERVER_TYPE
    }

    fn schema(&self) -> Schema {
        managed_server_schema()
    }

    async fn create(&self, ctx: &ProviderContext, d: &mut ResourceData) -> ResourceResult<()> {
        let server_id = d
            .get_str_ok("server_id")
            .ok_or(ResourceError::MissingAttribute("server_id"))?;
        let guild_id = parse_id("server_id", &server_id)?;

        d.set_id(guild_id.to_string());
        read_server(ctx, d).await?;
        if d.id().is_empty() {
            return Err(ResourceError::GuildNotFound(guild_id.to_string()));
        }
        info!("Adopted existing guild {}", guild_id);

        // Diff the configuration against the adopted guild, not an empty state.
        d.promote_written();
        update_server(ctx, d).await
    }

    async fn read(&self, ctx: &ProviderContext, d: &mut ResourceData) -> ResourceResult<()> {
        read_server(ctx, d).await
    }

    async fn update(&self, ctx: &ProviderContext, d: &mut ResourceData) -> ResourceResult<()> {
        // Pointing the resource at another guild just re-targets it.
        if d.has_change("server_id") {
            let server_id = d
                .get_str_ok("server_id")
                .ok_or(ResourceError::MissingAttribute("server_id"))?;
            let guild_id = parse_id("server_id", &server_id)?;
            info!("Re-targeting managed server from {} to {}", d.id(), guild_id);
            d.set_id(guild_id.to_string());
        }
        update_server(ctx, d).await
    }

    async fn delete(&self, _ctx: &ProviderContext, d: &mut ResourceData) -> ResourceResult<()> {
        info!("Releasing managed guild {} without deleting it", d.id());
        d.set_id("");
        Ok(())
    }
}
