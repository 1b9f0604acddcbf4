//! Token credential resolution for the remote stores
//!
//! Mirrors an ambient "default credential" flow: service principal settings
//! come from the environment, tokens are acquired with the OAuth2
//! client-credentials grant and cached per scope until shortly before expiry.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

/// Environment variables holding the service principal identity
pub const TENANT_ID_ENV: &str = "AZURE_TENANT_ID";
pub const CLIENT_ID_ENV: &str = "AZURE_CLIENT_ID";
pub const CLIENT_SECRET_ENV: &str = "AZURE_CLIENT_SECRET";

/// Tokens are refreshed this long before their reported expiry
const EXPIRY_LEEWAY: Duration = Duration::from_secs(120);

/// Errors that can occur during credential resolution
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Missing environment variable {0}")]
    MissingEnv(&'static str),

    #[error("Token endpoint returned {status}: {message}")]
    Exchange { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// A bearer token scoped to one resource
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: Instant,
}

impl AccessToken {
    /// Whether the token is expired (or close enough to warrant a refresh)
    pub fn is_expired(&self) -> bool {
        Instant::now() + EXPIRY_LEEWAY >= self.expires_at
    }
}

/// Supplies bearer tokens for remote store calls
#[async_trait]
pub trait TokenCredential: Send + Sync {
    /// Get a token for the given scope (e.g. `https://vault.azure.net/.default`)
    async fn token(&self, scope: &str) -> Result<AccessToken, CredentialError>;
}

/// Environment-based service principal credential
///
/// The token endpoint and caching are internal; callers only see
/// [`TokenCredential::token`].
pub struct EnvCredential {
    tenant_id: String,
    client_id: String,
    client_secret: String,
    authority: String,
    http: Client,
    cache: Mutex<HashMap<String, AccessToken>>,
}

impl std::fmt::Debug for EnvCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the client secret
        f.debug_struct("EnvCredential")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("authority", &self.authority)
            .finish_non_exhaustive()
    }
}

impl EnvCredential {
    /// Resolve the credential from the ambient environment
    ///
    /// Fails fast if any identity variable is absent; this is a fatal
    /// startup error for the daemon.
    pub fn from_env() -> Result<Self, CredentialError> {
        let tenant_id = std::env::var(TENANT_ID_ENV).map_err(|_| CredentialError::MissingEnv(TENANT_ID_ENV))?;
        let client_id = std::env::var(CLIENT_ID_ENV).map_err(|_| CredentialError::MissingEnv(CLIENT_ID_ENV))?;
        let client_secret =
            std::env::var(CLIENT_SECRET_ENV).map_err(|_| CredentialError::MissingEnv(CLIENT_SECRET_ENV))?;

        debug!(%tenant_id, %client_id, "EnvCredential::from_env: resolved identity");

        Ok(Self {
            tenant_id,
            client_id,
            client_secret,
            authority: "https://login.microsoftonline.com".to_string(),
            http: Client::new(),
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// Override the authority base URL (for tests)
    #[cfg(test)]
    fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = authority.into();
        self
    }

    /// The token endpoint for this tenant
    fn token_url(&self) -> String {
        format!("{}/{}/oauth2/v2.0/token", self.authority, self.tenant_id)
    }

    /// Perform one client-credentials exchange
    async fn exchange(&self, scope: &str) -> Result<AccessToken, CredentialError> {
        debug!(%scope, "EnvCredential::exchange: requesting token");

        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", scope),
        ];

        let response = self.http.post(self.token_url()).form(&params).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CredentialError::Exchange {
                status: status.as_u16(),
                message,
            });
        }

        let body: TokenResponse = response.json().await?;

        Ok(AccessToken {
            token: body.access_token,
            expires_at: Instant::now() + Duration::from_secs(body.expires_in),
        })
    }
}

#[async_trait]
impl TokenCredential for EnvCredential {
    async fn token(&self, scope: &str) -> Result<AccessToken, CredentialError> {
        let mut cache = self.cache.lock().await;

        if let Some(cached) = cache.get(scope)
            && !cached.is_expired()
        {
            debug!(%scope, "EnvCredential::token: cache hit");
            return Ok(cached.clone());
        }

        let fresh = self.exchange(scope).await?;
        cache.insert(scope.to_string(), fresh.clone());
        debug!(%scope, "EnvCredential::token: cached fresh token");

        Ok(fresh)
    }
}

/// Token endpoint response body
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn set_identity_env() {
        // SAFETY: tests touching process env are serialized via #[serial]
        unsafe {
            std::env::set_var(TENANT_ID_ENV, "test-tenant");
            std::env::set_var(CLIENT_ID_ENV, "test-client");
            std::env::set_var(CLIENT_SECRET_ENV, "test-secret");
        }
    }

    fn clear_identity_env() {
        unsafe {
            std::env::remove_var(TENANT_ID_ENV);
            std::env::remove_var(CLIENT_ID_ENV);
            std::env::remove_var(CLIENT_SECRET_ENV);
        }
    }

    #[test]
    #[serial]
    fn test_from_env_missing_tenant() {
        clear_identity_env();

        let err = EnvCredential::from_env().unwrap_err();
        assert!(matches!(err, CredentialError::MissingEnv(TENANT_ID_ENV)));
    }

    #[test]
    #[serial]
    fn test_from_env_missing_secret() {
        set_identity_env();
        unsafe {
            std::env::remove_var(CLIENT_SECRET_ENV);
        }

        let err = EnvCredential::from_env().unwrap_err();
        assert!(matches!(err, CredentialError::MissingEnv(CLIENT_SECRET_ENV)));

        clear_identity_env();
    }

    #[test]
    #[serial]
    fn test_token_url_includes_tenant() {
        set_identity_env();

        let cred = EnvCredential::from_env()
            .unwrap()
            .with_authority("https://login.example.com");
        assert_eq!(
            cred.token_url(),
            "https://login.example.com/test-tenant/oauth2/v2.0/token"
        );

        clear_identity_env();
    }

    #[test]
    #[serial]
    fn test_debug_output_redacts_client_secret() {
        set_identity_env();

        let cred = EnvCredential::from_env().unwrap();
        let rendered = format!("{:?}", cred);

        assert!(rendered.contains("test-tenant"));
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("test-secret"));

        clear_identity_env();
    }

    #[test]
    fn test_access_token_expiry_leeway() {
        let live = AccessToken {
            token: "t".to_string(),
            expires_at: Instant::now() + Duration::from_secs(3600),
        };
        assert!(!live.is_expired());

        // Inside the leeway window counts as expired
        let closing = AccessToken {
            token: "t".to_string(),
            expires_at: Instant::now() + Duration::from_secs(30),
        };
        assert!(closing.is_expired());
    }

    #[test]
    fn test_token_response_parse() {
        let json = r#"{"token_type":"Bearer","expires_in":3599,"access_token":"abc123"}"#;
        let parsed: TokenResponse = serde_json::from_str(json).unwrap();

        assert_eq!(parsed.access_token, "abc123");
        assert_eq!(parsed.expires_in, 3599);
    }
}
