use anyhow::{Context, Result, bail};

const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Credentials and settings sourced from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub mongodb_uri: String,
    pub openai_api_key: String,
    pub openai_model: String,
}

impl Config {
    /// Reads all required credentials, failing before any traffic is served.
    pub fn from_env() -> Result<Self> {
        let discord_token = std::env::var("DISCORD_TOKEN")
            .unwrap_or_default()
            .trim()
            .to_string();
        if discord_token.is_empty() {
            bail!("The DISCORD_TOKEN environment variable is not set or is empty.");
        }

        let mongodb_uri = std::env::var("MONGODB_URI")
            .context("The MONGODB_URI environment variable is not set")?;
        let openai_api_key = std::env::var("OPENAI_API_KEY")
            .context("The OPENAI_API_KEY environment variable is not set")?;
        let openai_model =
            std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        Ok(Self {
            discord_token,
            mongodb_uri,
            openai_api_key,
            openai_model,
        })
    }
}
