//! Address and credential collaborators consulted once per connect attempt.

use crate::types::{ResilienceError, Result};
use async_trait::async_trait;

/// Resolves the backend host for the next connect attempt.
#[async_trait]
pub trait AddressResolver: Send + Sync + 'static {
    async fn resolve_host(&self) -> Result<String>;
}

/// Supplies the auth token presented on connect.
#[async_trait]
pub trait TokenProvider: Send + Sync + 'static {
    async fn get_token(&self, force_refresh: bool) -> Result<String>;
}

/// Always resolves to the same host.
#[derive(Debug, Clone)]
pub struct StaticAddressResolver {
    host: String,
}

impl StaticAddressResolver {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }
}

#[async_trait]
impl AddressResolver for StaticAddressResolver {
    async fn resolve_host(&self) -> Result<String> {
        if self.host.is_empty() {
            return Err(ResilienceError::Address("no host configured".to_string()));
        }
        Ok(self.host.clone())
    }
}

/// Hands out a fixed token; refresh requests return the same value.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn get_token(&self, _force_refresh: bool) -> Result<String> {
        if self.token.is_empty() {
            return Err(ResilienceError::Auth("token is empty".to_string()));
        }
        Ok(self.token.clone())
    }
}
