use crate::{Error, Result};
use std::num::NonZeroUsize;

const DEFAULT_LAYER_URL: &str = "https://services.arcgis.com/LG9Yn2oFqZi5PnO5/arcgis/rest/services/Armed_Conflict_Location_Event_Data_ACLED/FeatureServer/0";
const DEFAULT_PORTAL_URL: &str = "https://www.arcgis.com/sharing/rest";
const DEFAULT_API_BASE: &str = "https://api.acleddata.com";
const DEFAULT_REGION_URL: &str = "http://acleddata.com/download/22846/";

/// Feature-store service account. `Debug` never prints the password.
#[derive(Clone)]
pub struct StoreCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for StoreCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Runtime configuration, resolved once at startup from the process
/// environment.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub credentials: StoreCredentials,
    /// ACLED API key.
    pub api_key: String,
    /// ACLED account email.
    pub api_email: String,
    pub api_base: String,
    pub region_artifact_url: String,
    pub layer_url: String,
    pub portal_url: String,
    pub lookback_days: u32,
    pub batch_size: NonZeroUsize,
}

impl SyncConfig {
    pub fn from_env() -> Result<Self> {
        let username = require_env("ACLED_SYNC_SERVICE_USER")?;
        let password = require_env("ACLED_SYNC_SERVICE_PASS")?;
        let api_key = require_env("ACLED_SYNC_API_KEY")?;
        let api_email = require_env("ACLED_SYNC_API_EMAIL")?;

        let api_base =
            std::env::var("ACLED_SYNC_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        let region_artifact_url = std::env::var("ACLED_SYNC_REGION_URL")
            .unwrap_or_else(|_| DEFAULT_REGION_URL.to_string());
        let layer_url =
            std::env::var("ACLED_SYNC_LAYER_URL").unwrap_or_else(|_| DEFAULT_LAYER_URL.to_string());
        let portal_url = std::env::var("ACLED_SYNC_PORTAL_URL")
            .unwrap_or_else(|_| DEFAULT_PORTAL_URL.to_string());

        let lookback_days = std::env::var("ACLED_SYNC_LOOKBACK_DAYS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(14);
        let batch_size = std::env::var("ACLED_SYNC_BATCH_SIZE")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .and_then(NonZeroUsize::new)
            .unwrap_or_else(|| NonZeroUsize::new(500).unwrap());

        Ok(Self {
            credentials: StoreCredentials { username, password },
            api_key,
            api_email,
            api_base,
            region_artifact_url,
            layer_url,
            portal_url,
            lookback_days,
            batch_size,
        })
    }

    /// Configuration view safe to print: secrets masked, everything else as
    /// resolved.
    pub fn redacted(&self) -> serde_json::Value {
        serde_json::json!({
            "service_user": self.credentials.username,
            "service_pass": "<redacted>",
            "api_key": "<redacted>",
            "api_email": self.api_email,
            "api_base": self.api_base,
            "region_artifact_url": self.region_artifact_url,
            "layer_url": self.layer_url,
            "portal_url": self.portal_url,
            "lookback_days": self.lookback_days,
            "batch_size": self.batch_size.get(),
        })
    }
}

fn require_env(name: &str) -> Result<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| Error::InvalidInput(format!("{name} is required")))
}
