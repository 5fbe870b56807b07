use crate::core::provider::ProviderContext;
use crate::discord::error::DiscordError;
use crate::schema::attribute::Schema;
use crate::schema::data::{ResourceData, ResourceDataError};
use crate::schema::diagnostics::Diagnostic;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResourceError {
    /// A Discord call failed; `action` reads like "Failed to create server".
    #[error("{action}: {source}")]
    Api {
        action: &'static str,
        #[source]
        source: DiscordError,
    },

    #[error("Error: {0} must be set")]
    MissingAttribute(&'static str),

    #[error("Error: server {0} does not exist")]
    GuildNotFound(String),

    #[error("Error: {attribute} is not a valid id: {value}")]
    InvalidId {
        attribute: &'static str,
        value: String,
    },

    #[error(transparent)]
    Data(#[from] ResourceDataError),
}

impl ResourceError {
    pub fn api(action: &'static str, source: DiscordError) -> Self {
        ResourceError::Api { action, source }
    }

    pub fn attribute(&self) -> Option<&str> {
        match self {
            ResourceError::MissingAttribute(attribute) => Some(*attribute),
            ResourceError::InvalidId { attribute, .. } => Some(*attribute),
            _ => None,
        }
    }
}

impl From<ResourceError> for Diagnostic {
    fn from(error: ResourceError) -> Self {
        let mut diagnostic = Diagnostic::error(error.to_string());
        if let ResourceError::Api {
            source: DiscordError::RateLimited { retry_after },
            ..
        } = &error
        {
            diagnostic = diagnostic.with_detail(format!(
                "nothing is retried automatically; run the command again in {} seconds",
                retry_after.ceil()
            ));
        }
        match error.attribute() {
            Some(attribute) => diagnostic.with_attribute(attribute),
            None => diagnostic,
        }
    }
}

pub type ResourceResult<T> = Result<T, ResourceError>;

/// CRUD handlers for one resource kind.
#[async_trait]
pub trait Resource: Send + Sync {
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> Schema;

    async fn create(&self, ctx: &ProviderContext, d: &mut ResourceData) -> ResourceResult<()>;

    async fn read(&self, ctx: &ProviderContext, d: &mut ResourceData) -> ResourceResult<()>;

    async fn update(&self, ctx: &ProviderContext, d: &mut ResourceData) -> ResourceResult<()>;

    async fn delete(&self, ctx: &ProviderContext, d: &mut ResourceData) -> ResourceResult<()>;

    /// Passthrough import: the given id becomes the resource id and the
    /// caller reads the rest.
    async fn import(&self, _ctx: &ProviderContext, id: &str) -> ResourceResult<ResourceData> {
        Ok(ResourceData::imported(self.schema(), id))
    }
}
