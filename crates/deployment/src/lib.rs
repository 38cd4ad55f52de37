use std::sync::Arc;

use async_trait::async_trait;
use db::{DBService, DbErr};
use services::services::{
    config::{Config, ConfigError},
    rate_limit::RateLimiter,
};
use thiserror::Error;
use tokio::sync::RwLock;
use utils_jwt::TokenService;

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Everything a request handler needs, shared across the router.
#[async_trait]
pub trait Deployment: Clone + Send + Sync + 'static {
    async fn new() -> Result<Self, DeploymentError>;

    fn config(&self) -> &Arc<RwLock<Config>>;

    fn db(&self) -> &DBService;

    fn tokens(&self) -> &Arc<TokenService>;

    fn rate_limiter(&self) -> &Arc<RateLimiter>;
}
