use rand::{Rng, distributions::Alphanumeric};
use serde::{Deserialize, Serialize};

pub const CURRENT_CONFIG_VERSION: &str = "v1";

const DEFAULT_ACCESS_TOKEN_EXPIRY_SECS: u64 = 24 * 60 * 60;
const DEFAULT_REFRESH_TOKEN_EXPIRY_SECS: u64 = 10 * 24 * 60 * 60;
const DEFAULT_RATE_LIMIT_REQUESTS: u32 = 100;
const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 15 * 60;
const GENERATED_SECRET_LEN: usize = 64;

pub const ACCESS_TOKEN_SECRET_ENV: &str = "ACCESS_TOKEN_SECRET";
pub const ACCESS_TOKEN_EXPIRY_ENV: &str = "ACCESS_TOKEN_EXPIRY";
pub const REFRESH_TOKEN_SECRET_ENV: &str = "REFRESH_TOKEN_SECRET";
pub const REFRESH_TOKEN_EXPIRY_ENV: &str = "REFRESH_TOKEN_EXPIRY";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AuthConfig {
    #[serde(alias = "accessTokenSecret")]
    pub access_token_secret: Option<String>,
    #[serde(alias = "accessTokenExpirySecs")]
    pub access_token_expiry_secs: u64,
    #[serde(alias = "refreshTokenSecret")]
    pub refresh_token_secret: Option<String>,
    #[serde(alias = "refreshTokenExpirySecs")]
    pub refresh_token_expiry_secs: u64,
    /// Lets `register` honour a client-supplied role. Off unless bootstrapping an admin.
    #[serde(alias = "allowRoleOnRegister")]
    pub allow_role_on_register: bool,
    #[serde(alias = "secureCookies")]
    pub secure_cookies: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_token_secret: None,
            access_token_expiry_secs: DEFAULT_ACCESS_TOKEN_EXPIRY_SECS,
            refresh_token_secret: None,
            refresh_token_expiry_secs: DEFAULT_REFRESH_TOKEN_EXPIRY_SECS,
            allow_role_on_register: false,
            secure_cookies: true,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub requests: u32,
    #[serde(alias = "windowSecs")]
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests: DEFAULT_RATE_LIMIT_REQUESTS,
            window_secs: DEFAULT_RATE_LIMIT_WINDOW_SECS,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    #[serde(alias = "configVersion")]
    pub config_version: String,
    pub auth: AuthConfig,
    #[serde(alias = "rateLimit")]
    pub rate_limit: RateLimitConfig,
}

/// Signing secrets in effect for this process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenSecrets {
    pub access: String,
    pub refresh: String,
}

impl Config {
    pub fn from_raw(raw_config: &str) -> Self {
        match serde_json::from_str::<Config>(raw_config) {
            Ok(config) => config.normalized(),
            Err(e) => {
                tracing::warn!(
                    "Failed to parse config (line {}, column {}): {}, using default",
                    e.line(),
                    e.column(),
                    e
                );
                Self::default()
            }
        }
    }

    pub fn normalized(mut self) -> Self {
        self.config_version = CURRENT_CONFIG_VERSION.to_string();

        for secret in [
            &mut self.auth.access_token_secret,
            &mut self.auth.refresh_token_secret,
        ] {
            if matches!(secret.as_deref(), Some(value) if value.trim().is_empty()) {
                *secret = None;
            }
        }

        if self.auth.access_token_expiry_secs == 0 {
            tracing::warn!("access_token_expiry_secs must be positive, resetting to default");
            self.auth.access_token_expiry_secs = DEFAULT_ACCESS_TOKEN_EXPIRY_SECS;
        }
        if self.auth.refresh_token_expiry_secs == 0 {
            tracing::warn!("refresh_token_expiry_secs must be positive, resetting to default");
            self.auth.refresh_token_expiry_secs = DEFAULT_REFRESH_TOKEN_EXPIRY_SECS;
        }
        if self.rate_limit.requests == 0 || self.rate_limit.window_secs == 0 {
            tracing::warn!("Invalid rate limit window, resetting to default");
            self.rate_limit.requests = DEFAULT_RATE_LIMIT_REQUESTS;
            self.rate_limit.window_secs = DEFAULT_RATE_LIMIT_WINDOW_SECS;
        }

        self
    }

    /// Applies `ACCESS_TOKEN_*` / `REFRESH_TOKEN_*` overrides. Expiries are seconds.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let seconds = |key: &str| {
            let raw = non_empty(key)?;
            match raw.trim().parse::<u64>() {
                Ok(value) if value > 0 => Some(value),
                _ => {
                    tracing::warn!("Ignoring invalid {key}={raw}, expected seconds");
                    None
                }
            }
        };

        if let Some(secret) = non_empty(ACCESS_TOKEN_SECRET_ENV) {
            self.auth.access_token_secret = Some(secret);
        }
        if let Some(secret) = non_empty(REFRESH_TOKEN_SECRET_ENV) {
            self.auth.refresh_token_secret = Some(secret);
        }
        if let Some(expiry) = seconds(ACCESS_TOKEN_EXPIRY_ENV) {
            self.auth.access_token_expiry_secs = expiry;
        }
        if let Some(expiry) = seconds(REFRESH_TOKEN_EXPIRY_ENV) {
            self.auth.refresh_token_expiry_secs = expiry;
        }
        self
    }

    /// Configured secrets, with random ones generated for whichever is missing.
    pub fn token_secrets(&self) -> TokenSecrets {
        let resolve = |configured: &Option<String>, name: &str| match configured {
            Some(secret) => secret.clone(),
            None => {
                tracing::warn!(
                    "No {name} configured, generated a random one; issued tokens will not survive a restart"
                );
                generate_secret()
            }
        };
        TokenSecrets {
            access: resolve(&self.auth.access_token_secret, "access token secret"),
            refresh: resolve(&self.auth.refresh_token_secret, "refresh token secret"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_version: CURRENT_CONFIG_VERSION.to_string(),
            auth: AuthConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

fn generate_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_SECRET_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults_apply_for_empty_config() {
        let config = Config::from_raw("{}");

        assert_eq!(config.config_version, CURRENT_CONFIG_VERSION);
        assert_eq!(config.auth.access_token_expiry_secs, 86_400);
        assert_eq!(config.auth.refresh_token_expiry_secs, 864_000);
        assert!(!config.auth.allow_role_on_register);
        assert_eq!(config.rate_limit, RateLimitConfig::default());
        assert_eq!(config.rate_limit.requests, 100);
        assert_eq!(config.rate_limit.window_secs, 900);
    }

    #[test]
    fn invalid_json_falls_back_to_default() {
        let config = Config::from_raw("{invalid json");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn aliases_and_normalization_are_applied() {
        let raw = r#"{
            "configVersion": "v0",
            "auth": { "accessTokenSecret": "  ", "refreshTokenExpirySecs": 0 },
            "rateLimit": { "requests": 0 }
        }"#;

        let config = Config::from_raw(raw);

        assert_eq!(config.config_version, CURRENT_CONFIG_VERSION);
        assert_eq!(config.auth.access_token_secret, None);
        assert_eq!(config.auth.refresh_token_expiry_secs, 864_000);
        assert_eq!(config.rate_limit.requests, 100);
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ACCESS_TOKEN_SECRET_ENV, "from-env"),
            (ACCESS_TOKEN_EXPIRY_ENV, "60"),
            (REFRESH_TOKEN_EXPIRY_ENV, "soon"),
        ]);

        let config = Config::default()
            .with_env_overrides(|key| env.get(key).map(|value| value.to_string()));

        assert_eq!(config.auth.access_token_secret.as_deref(), Some("from-env"));
        assert_eq!(config.auth.access_token_expiry_secs, 60);
        assert_eq!(config.auth.refresh_token_expiry_secs, 864_000);
    }

    #[test]
    fn missing_secrets_are_generated_per_call() {
        let mut config = Config::default();
        config.auth.refresh_token_secret = Some("fixed".to_string());

        let first = config.token_secrets();
        let second = config.token_secrets();

        assert_eq!(first.refresh, "fixed");
        assert_eq!(first.access.len(), 64);
        assert_ne!(first.access, second.access);
    }
}
