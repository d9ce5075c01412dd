//! Client configuration model.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::chat::DEFAULT_CHAT_BASE_URL;

/// Default remote entity API.
pub const DEFAULT_API_BASE_URL: &str = "https://multi-tenant-cli-boilerplate-api.vercel.app";
/// Tenant sent with OTP requests and created entities.
pub const DEFAULT_TENANT_ID: &str = "default";

/// Deployment environment; `Production` turns on the cookie `Secure` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Environment {
    #[default]
    Development,
    Test,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

/// Settings shared by the BFF server and the terminal client.
///
/// Every field has a default, so a partial `config.toml` is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Remote entity API base URL.
    pub api_base_url: String,
    /// External chat service base URL.
    pub chat_base_url: String,
    /// Public origin of this app, used to absolutize loader links.
    pub public_url: Option<String>,
    pub tenant_id: String,
    pub environment: Environment,
    /// Per-request timeout towards the remote API, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            chat_base_url: DEFAULT_CHAT_BASE_URL.to_string(),
            public_url: None,
            tenant_id: DEFAULT_TENANT_ID.to_string(),
            environment: Environment::default(),
            request_timeout_secs: 30,
        }
    }
}

impl ClientConfig {
    /// Joins `path` onto `public_url`, or returns `path` unchanged.
    pub fn public_link(&self, path: &str) -> String {
        match &self.public_url {
            Some(origin) => format!("{}{}", origin.trim_end_matches('/'), path),
            None => path.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: ClientConfig = toml::from_str(r#"environment = "production""#).unwrap();
        assert!(config.environment.is_production());
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.tenant_id, "default");
    }

    #[test]
    fn test_public_link() {
        let mut config = ClientConfig::default();
        assert_eq!(config.public_link("/x"), "/x");
        config.public_url = Some("https://app.example/".into());
        assert_eq!(config.public_link("/x"), "https://app.example/x");
    }
}
