// Re-export modules for testing and external use
pub mod schema {
    pub mod attribute;
    pub mod data;
    pub mod diagnostics;
    pub mod validation;

    // Re-export commonly used items
    pub use attribute::{Attribute, AttributeType, Schema};
    pub use data::{InstanceState, ResourceData, ResourceDataError};
    pub use diagnostics::{Diagnostic, Diagnostics, Severity};
    pub use validation::{ValidationResult, Validator};
}

pub mod discord {
    pub mod client;
    pub mod error;
    pub mod image;
    pub mod model;

    pub use client::{DiscordApi, DiscordClient};
    pub use error::{DiscordError, DiscordResult};
    pub use image::{ImageLoader, RemoteImageLoader};
    pub use model::{Channel, CreateGuild, Guild, ModifyGuild, Snowflake};
}

pub mod resources {
    pub mod managed_server;
    pub mod resource;
    pub mod server;

    pub use managed_server::ManagedServerResource;
    pub use resource::{Resource, ResourceError, ResourceResult};
    pub use server::ServerResource;
}

pub mod shared {
    pub mod logging;
}

pub mod core {
    pub mod provider;
    pub mod runner;
    pub mod state;
}

pub mod config;

// Re-export commonly used types for easier testing and external use
pub use config::ProviderConfig;
pub use core::provider::{Provider, ProviderContext, ProviderError};
pub use core::runner::{Action, ApplyResult, Plan, Runner};
pub use core::state::StateFile;
