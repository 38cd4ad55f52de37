use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use db::DBService;
use deployment::{Deployment, DeploymentError};
use services::services::{
    config::{Config, load_config_from_file, save_config_to_file},
    rate_limit::RateLimiter,
};
use tokio::sync::RwLock;
use utils::assets::config_path;
use utils_jwt::TokenService;

#[derive(Clone)]
pub struct LocalDeployment {
    config: Arc<RwLock<Config>>,
    db: DBService,
    tokens: Arc<TokenService>,
    rate_limiter: Arc<RateLimiter>,
}

#[async_trait]
impl Deployment for LocalDeployment {
    async fn new() -> Result<Self, DeploymentError> {
        let config = Self::load_runtime_config().await?;
        let db = DBService::new().await?;
        Ok(Self::from_parts(config, db))
    }

    fn config(&self) -> &Arc<RwLock<Config>> {
        &self.config
    }

    fn db(&self) -> &DBService {
        &self.db
    }

    fn tokens(&self) -> &Arc<TokenService> {
        &self.tokens
    }

    fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }
}

impl LocalDeployment {
    /// Wires token signing and the rate limiter from an already resolved config.
    pub fn from_parts(config: Config, db: DBService) -> Self {
        let secrets = config.token_secrets();
        let tokens = TokenService::new(
            &secrets.access,
            config.auth.access_token_expiry_secs,
            &secrets.refresh,
            config.auth.refresh_token_expiry_secs,
        );
        let rate_limiter = RateLimiter::new(
            config.rate_limit.requests,
            Duration::from_secs(config.rate_limit.window_secs),
        );

        tracing::debug!(
            rate_limit_enabled = config.rate_limit.enabled,
            requests = config.rate_limit.requests,
            window_secs = config.rate_limit.window_secs,
            "Deployment services ready"
        );

        Self {
            config: Arc::new(RwLock::new(config)),
            db,
            tokens: Arc::new(tokens),
            rate_limiter: Arc::new(rate_limiter),
        }
    }

    /// Loads and rewrites `config.json`, then layers environment overrides on top.
    ///
    /// Overrides are applied after saving so secrets passed through the
    /// environment never end up on disk.
    async fn load_runtime_config() -> Result<Config, DeploymentError> {
        let path = config_path();
        let file_config = load_config_from_file(&path).await;
        save_config_to_file(&file_config, &path).await?;
        Ok(file_config.with_env_overrides(|key| std::env::var(key).ok()))
    }
}

#[cfg(test)]
mod tests {
    use db::DBService;
    use services::services::config::Config;

    use super::*;

    #[tokio::test]
    async fn from_parts_uses_configured_secrets_and_limits() {
        let db = DBService::connect("sqlite::memory:").await.unwrap();
        let mut config = Config::default();
        config.auth.access_token_secret = Some("access".to_string());
        config.auth.refresh_token_secret = Some("refresh".to_string());
        config.rate_limit.requests = 2;

        let deployment = LocalDeployment::from_parts(config, db);

        let other = TokenService::new("access", 60, "refresh", 60);
        let token = other.issue_refresh(uuid::Uuid::new_v4()).unwrap();
        assert!(deployment.tokens().verify_refresh(&token).is_ok());

        assert_eq!(deployment.rate_limiter().limit(), 2);
        assert_eq!(deployment.config().read().await.rate_limit.requests, 2);
    }
}
