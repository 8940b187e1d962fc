use crate::catalog::DEFAULT_API_BASE;
use crate::error::{AppError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub access_token: String,
    pub api_base: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let access_token = std::env::var("SPOTIFY_ACCESS_TOKEN")
            .map_err(|_| AppError::Config("SPOTIFY_ACCESS_TOKEN not set".into()))?;

        let api_base =
            std::env::var("SPOTIFY_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());

        Ok(Self {
            access_token,
            api_base,
        })
    }

    pub fn get_missing_config(&self) -> Vec<String> {
        let mut missing = Vec::new();

        if self.access_token.is_empty() {
            missing.push("SPOTIFY_ACCESS_TOKEN".to_string());
        }

        missing
    }

    pub fn validate(&self) -> bool {
        !self.access_token.is_empty()
    }
}
