//! GCP Authentication
//!
//! Handles authentication using Application Default Credentials (ADC),
//! service account keys, or gcloud CLI credentials. A static-token source
//! is available for tests and for schedulers that manage their own session.

use anyhow::{Context, Result};
use gcp_auth::TokenProvider;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Default scopes for GCP API access
pub const DEFAULT_SCOPES: &[&str] = &["https://www.googleapis.com/auth/cloud-platform"];

/// Token expiry buffer - refresh tokens this much before they actually expire
const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// Default token TTL if we can't determine expiry (conservative: 30 minutes)
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

/// GCP credentials holder with token caching
#[derive(Clone)]
pub struct GcpCredentials {
    source: CredentialSource,
}

#[derive(Clone)]
enum CredentialSource {
    /// Application Default Credentials, refreshed and cached on demand.
    Provider {
        provider: Arc<dyn TokenProvider>,
        token_cache: Arc<RwLock<Option<CachedToken>>>,
    },
    /// A fixed token supplied by the caller; never refreshed.
    Static(String),
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    /// When this token expires (with buffer applied)
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

impl GcpCredentials {
    /// Create new GCP credentials using Application Default Credentials
    pub async fn new() -> Result<Self> {
        let provider = gcp_auth::provider().await.context(
            "Failed to initialize GCP authentication. Run 'gcloud auth application-default login'",
        )?;

        Ok(Self {
            source: CredentialSource::Provider {
                provider,
                token_cache: Arc::new(RwLock::new(None)),
            },
        })
    }

    /// Create credentials around a fixed token (tests, embedded sessions)
    pub fn from_static_token(token: &str) -> Self {
        Self {
            source: CredentialSource::Static(token.to_string()),
        }
    }

    /// Get an access token for API calls
    pub async fn get_token(&self) -> Result<String> {
        let (provider, token_cache) = match &self.source {
            CredentialSource::Static(token) => return Ok(token.clone()),
            CredentialSource::Provider {
                provider,
                token_cache,
            } => (provider, token_cache),
        };

        // Check cache first - but only return if token is still valid
        {
            let cache = token_cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_valid() {
                    return Ok(cached.token.clone());
                }
                tracing::debug!("Cached token expired, fetching new token");
            }
        }

        let token = provider
            .token(DEFAULT_SCOPES)
            .await
            .context("Failed to get access token")?;

        let token_str = token.as_str().to_string();

        // gcp_auth does not always report expiry; use a conservative TTL
        let expires_at = Instant::now() + DEFAULT_TOKEN_TTL - TOKEN_EXPIRY_BUFFER;

        {
            let mut cache = token_cache.write().await;
            *cache = Some(CachedToken {
                token: token_str.clone(),
                expires_at,
            });
        }

        tracing::debug!(
            "New token cached, expires in ~{} minutes",
            (DEFAULT_TOKEN_TTL - TOKEN_EXPIRY_BUFFER).as_secs() / 60
        );

        Ok(token_str)
    }

    /// Force refresh the token
    pub async fn refresh_token(&self) -> Result<String> {
        if let CredentialSource::Provider { token_cache, .. } = &self.source {
            let mut cache = token_cache.write().await;
            *cache = None;
        }
        self.get_token().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_token_is_returned_verbatim() {
        let creds = GcpCredentials::from_static_token("test-token");
        assert_eq!(creds.get_token().await.unwrap(), "test-token");
        assert_eq!(creds.refresh_token().await.unwrap(), "test-token");
    }
}
