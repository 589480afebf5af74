use crate::error::{CollabStreamError, Result};

#[derive(Debug, Clone)]
pub struct Settings {
    pub api: ApiConfig,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub access_token: String,
    pub request_timeout_secs: u64,
}

pub fn load_settings() -> Result<Settings> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let api = ApiConfig {
        base_url: std::env::var("COLLAB_API_URL")
            .map_err(|_| CollabStreamError::Config("COLLAB_API_URL not set".to_string()))?,
        access_token: std::env::var("COLLAB_ACCESS_TOKEN")
            .map_err(|_| CollabStreamError::Config("COLLAB_ACCESS_TOKEN not set".to_string()))?,
        request_timeout_secs: std::env::var("COLLAB_REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .map_err(|_| {
                CollabStreamError::Config("Invalid COLLAB_REQUEST_TIMEOUT_SECS".to_string())
            })?,
    };

    Ok(Settings { api })
}
