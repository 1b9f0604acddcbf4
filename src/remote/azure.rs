//! Key Vault / App Configuration REST client

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{APP_CONFIG_NAME, ConfigSource, FetchError, KEY_VAULT_NAME};
use crate::credential::TokenCredential;
use crate::snapshot::{FIELDS, Snapshot, SourceKind};

/// Token scope for Key Vault data-plane calls
const VAULT_SCOPE: &str = "https://vault.azure.net/.default";

/// Token scope for App Configuration data-plane calls
const APP_CONFIG_SCOPE: &str = "https://azconfig.io/.default";

const VAULT_API_VERSION: &str = "7.4";
const APP_CONFIG_API_VERSION: &str = "1.0";

/// Snapshot source backed by a Key Vault and an App Configuration store
///
/// The store names are compiled in ([`KEY_VAULT_NAME`], [`APP_CONFIG_NAME`]);
/// only the credential is supplied at runtime.
pub struct AzureSource {
    key_vault: String,
    app_config: String,
    credential: Arc<dyn TokenCredential>,
    http: Client,
}

impl AzureSource {
    /// Create a source for the compiled-in stores
    pub fn new(credential: Arc<dyn TokenCredential>) -> Self {
        Self {
            key_vault: KEY_VAULT_NAME.to_string(),
            app_config: APP_CONFIG_NAME.to_string(),
            credential,
            http: Client::new(),
        }
    }

    fn secret_url(&self, name: &str) -> String {
        format!(
            "https://{}.vault.azure.net/secrets/{}?api-version={}",
            self.key_vault, name, VAULT_API_VERSION
        )
    }

    fn setting_url(&self, key: &str) -> String {
        format!(
            "https://{}.azconfig.io/kv/{}?api-version={}",
            self.app_config, key, APP_CONFIG_API_VERSION
        )
    }

    /// GET one resource and extract its string value
    async fn get_value(&self, url: &str, scope: &str, resource: &str) -> Result<String, FetchError> {
        let token = self.credential.token(scope).await?;

        debug!(%resource, "AzureSource::get_value: requesting");
        let response = self.http.get(url).bearer_auth(&token.token).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                resource: resource.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        let body: ValueResponse = response.json().await?;
        body.value.ok_or_else(|| FetchError::MissingValue {
            resource: resource.to_string(),
        })
    }

    async fn get_secret(&self, name: &str) -> Result<String, FetchError> {
        self.get_value(&self.secret_url(name), VAULT_SCOPE, &format!("secret {}", name))
            .await
    }

    async fn get_setting(&self, key: &str) -> Result<String, FetchError> {
        self.get_value(&self.setting_url(key), APP_CONFIG_SCOPE, &format!("setting {}", key))
            .await
    }
}

#[async_trait]
impl ConfigSource for AzureSource {
    async fn fetch(&self) -> Result<Snapshot, FetchError> {
        debug!(key_vault = %self.key_vault, app_config = %self.app_config, "AzureSource::fetch: called");

        // Resolve every field in declared order; any failure aborts the
        // whole fetch so no partial snapshot is ever produced.
        let mut values: [String; FIELDS.len()] = [const { String::new() }; FIELDS.len()];
        for (slot, spec) in values.iter_mut().zip(&FIELDS) {
            *slot = match spec.kind {
                SourceKind::Secret => self.get_secret(spec.key).await?,
                SourceKind::Setting => self.get_setting(spec.key).await?,
            };
        }

        Ok(Snapshot::from_values(values))
    }
}

/// Both stores return the value under a `value` key
///
/// Key Vault: `{"value": "...", "id": "...", ...}`; App Configuration:
/// `{"key": "...", "value": "...", ...}`.
#[derive(Debug, Deserialize)]
struct ValueResponse {
    value: Option<String>,
}
