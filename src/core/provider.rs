use crate::config::ProviderConfig;
use crate::discord::client::{DiscordApi, DiscordClient};
use crate::discord::error::DiscordError;
use crate::discord::image::{ImageLoader, RemoteImageLoader};
use crate::resources::managed_server::ManagedServerResource;
use crate::resources::resource::Resource;
use crate::resources::server::ServerResource;
use crate::schema::attribute::{Attribute, AttributeType, Schema};
use crate::shared::logging;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Unknown resource type \"{0}\". Supported types: {1}")]
    UnknownResource(String, String),

    #[error("Discord token is not configured. Set DISCORD_TOKEN or \"token\" in the provider config")]
    MissingToken,

    #[error("Failed to build Discord client: {0}")]
    Client(#[from] DiscordError),
}

/// Shared collaborators handed to every resource handler.
#[derive(Clone)]
pub struct ProviderContext {
    pub client: Arc<dyn DiscordApi>,
    pub images: Arc<dyn ImageLoader>,
}

impl ProviderContext {
    pub fn new(client: Arc<dyn DiscordApi>, images: Arc<dyn ImageLoader>) -> Self {
        Self { client, images }
    }
}

/// Registry of the resource kinds this provider serves.
#[derive(Clone)]
pub struct Provider {
    resources: BTreeMap<&'static str, Arc<dyn Resource>>,
}

impl Default for Provider {
    fn default() -> Self {
        Self::new()
    }
}

impl Provider {
    pub fn new() -> Self {
        let mut provider = Self {
            resources: BTreeMap::new(),
        };
        provider.register(Arc::new(ServerResource));
        provider.register(Arc::new(ManagedServerResource));
        provider
    }

    pub fn register(&mut self, resource: Arc<dyn Resource>) {
        self.resources.insert(resource.type_name(), resource);
    }

    /// Schema of the provider block itself.
    pub fn schema() -> Schema {
        Schema::new()
            .with_attribute(
                "token",
                Attribute::optional(AttributeType::String)
                    .sensitive()
                    .with_description("Bot token. Falls back to DISCORD_TOKEN."),
            )
            .with_attribute(
                "api_url",
                Attribute::optional(AttributeType::String)
                    .with_default(crate::config::DEFAULT_API_URL),
            )
            .with_attribute(
                "timeout_secs",
                Attribute::optional(AttributeType::Int).with_default(30),
            )
    }

    pub fn resource_types(&self) -> Vec<&'static str> {
        self.resources.keys().copied().collect()
    }

    pub fn resource(&self, type_name: &str) -> Result<Arc<dyn Resource>, ProviderError> {
        self.resources.get(type_name).cloned().ok_or_else(|| {
            ProviderError::UnknownResource(type_name.to_string(), self.resource_types().join(", "))
        })
    }

    /// Build the HTTP-backed context used by the resource handlers.
    pub fn configure(&self, config: &ProviderConfig) -> Result<ProviderContext, ProviderError> {
        if config.token.trim().is_empty() {
            return Err(ProviderError::MissingToken);
        }

        logging::debug(&format!("Configuring provider: {:?}", config));
        let client = DiscordClient::new(config)?;
        let images = RemoteImageLoader::new(Duration::from_secs(config.timeout_secs))?;

        Ok(ProviderContext::new(Arc::new(client), Arc::new(images)))
    }
}
