use thiserror::Error;

/// JSON error code Discord returns for a guild that no longer exists.
pub const UNKNOWN_GUILD: i32 = 10004;

#[derive(Error, Debug)]
pub enum DiscordError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Discord API error {code} (HTTP {status}): {message}")]
    Api {
        status: u16,
        code: i32,
        message: String,
    },

    #[error("Rate limited by Discord, retry after {retry_after} seconds")]
    RateLimited { retry_after: f64 },

    #[error("Failed to load image from '{url}': {reason}")]
    Image { url: String, reason: String },
}

impl DiscordError {
    /// True when the target object does not exist on Discord's side.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Api { status, code, .. } => *status == 404 || *code == UNKNOWN_GUILD,
            _ => false,
        }
    }
}

pub type DiscordResult<T> = Result<T, DiscordError>;
