use crate::config::ProviderConfig;
use crate::discord::error::{DiscordError, DiscordResult};
use crate::discord::model::{Channel, CreateGuild, Guild, ModifyGuild, Snowflake};
use async_trait::async_trait;
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// The subset of the Discord REST API the guild resources talk to.
#[async_trait]
pub trait DiscordApi: Send + Sync {
    async fn create_guild(&self, request: &CreateGuild) -> DiscordResult<Guild>;

    async fn get_guild(&self, guild_id: Snowflake) -> DiscordResult<Guild>;

    async fn modify_guild(&self, guild_id: Snowflake, request: &ModifyGuild)
        -> DiscordResult<Guild>;

    async fn delete_guild(&self, guild_id: Snowflake) -> DiscordResult<()>;

    async fn get_guild_channels(&self, guild_id: Snowflake) -> DiscordResult<Vec<Channel>>;

    async fn delete_channel(&self, channel_id: Snowflake) -> DiscordResult<()>;
}

#[derive(Deserialize)]
struct ApiErrorBody {
    code: Option<i32>,
    message: Option<String>,
}

/// HTTP implementation of [`DiscordApi`].
#[derive(Debug, Clone)]
pub struct DiscordClient {
    client: Client,
    base_url: String,
    token: String,
}

impl DiscordClient {
    pub fn new(config: &ProviderConfig) -> DiscordResult<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let token = config
            .token
            .trim()
            .strip_prefix("Bot ")
            .unwrap_or(config.token.trim())
            .to_string();

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorization(&self) -> String {
        format!("Bot {}", self.token)
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
    ) -> DiscordResult<Response> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("{} {}", method, url);

        let mut request = self
            .client
            .request(method, &url)
            .header("Authorization", self.authorization());
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        debug!("Response status: {}", status);

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<f64>().ok())
                .unwrap_or(0.0);
            warn!("Rate limited on {}, retry after {}s", endpoint, retry_after);
            return Err(DiscordError::RateLimited { retry_after });
        }

        if status.is_success() {
            return Ok(response);
        }

        let bytes = response.bytes().await?;
        Err(api_error(status, &bytes))
    }

    async fn json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
    ) -> DiscordResult<T> {
        let response = self.send(method, endpoint, body).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

fn api_error(status: StatusCode, bytes: &[u8]) -> DiscordError {
    match serde_json::from_slice::<ApiErrorBody>(bytes) {
        Ok(body) => DiscordError::Api {
            status: status.as_u16(),
            code: body.code.unwrap_or(i32::from(status.as_u16())),
            message: body
                .message
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown error").to_string()),
        },
        Err(_) => DiscordError::Api {
            status: status.as_u16(),
            code: i32::from(status.as_u16()),
            message: String::from_utf8_lossy(bytes).into_owned(),
        },
    }
}

#[async_trait]
impl DiscordApi for DiscordClient {
    async fn create_guild(&self, request: &CreateGuild) -> DiscordResult<Guild> {
        self.json(Method::POST, "/guilds", Some(request)).await
    }

    async fn get_guild(&self, guild_id: Snowflake) -> DiscordResult<Guild> {
        self.json::<Guild, ()>(Method::GET, &format!("/guilds/{}", guild_id), None)
            .await
    }

    async fn modify_guild(
        &self,
        guild_id: Snowflake,
        request: &ModifyGuild,
    ) -> DiscordResult<Guild> {
        self.json(Method::PATCH, &format!("/guilds/{}", guild_id), Some(request))
            .await
    }

    async fn delete_guild(&self, guild_id: Snowflake) -> DiscordResult<()> {
        self.send::<()>(Method::DELETE, &format!("/guilds/{}", guild_id), None)
            .await?;
        info!("Deleted guild {}", guild_id);
        Ok(())
    }

    async fn get_guild_channels(&self, guild_id: Snowflake) -> DiscordResult<Vec<Channel>> {
        self.json::<Vec<Channel>, ()>(
            Method::GET,
            &format!("/guilds/{}/channels", guild_id),
            None,
        )
        .await
    }

    async fn delete_channel(&self, channel_id: Snowflake) -> DiscordResult<()> {
        self.send::<()>(Method::DELETE, &format!("/channels/{}", channel_id), None)
            .await?;
        Ok(())
    }
}
