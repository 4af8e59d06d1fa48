//! Multi-provider relying-party client.
//!
//! [`MultiRpClient`] resolves an issuer to a registered client: a stored
//! registration is returned as is, otherwise the client registers itself with
//! the provider and stores the result. Stored registrations are trusted
//! indefinitely; nothing here re-validates them against the provider.
//!
//! Concurrent lookups for the same unregistered issuer are not coordinated.
//! Each one registers with the provider and the last write to the store wins.

use std::sync::Arc;

use crate::client_store::{ClientStore, encode_key};
use crate::config::LocalConfig;
use crate::errors::{MultiRpError, Result};
use crate::oidc::registration::ClientRegistrar;
use crate::oidc::types::{
    AuthorizationParams, AuthorizationUrl, DEFAULT_GRANT_TYPES, DEFAULT_RESPONSE_TYPES,
    DEFAULT_SCOPE, RegisteredClient, RegistrationConfig, RegistrationOverrides, Workflow,
    generate_token,
};

/// Issuer-keyed client lifecycle manager
pub struct MultiRpClient {
    store: ClientStore,
    registrar: Arc<dyn ClientRegistrar>,
    local_config: LocalConfig,
}

impl MultiRpClient {
    pub fn new(
        store: ClientStore,
        registrar: Arc<dyn ClientRegistrar>,
        local_config: LocalConfig,
    ) -> Self {
        Self {
            store,
            registrar,
            local_config,
        }
    }

    pub fn store(&self) -> &ClientStore {
        &self.store
    }

    pub fn local_config(&self) -> &LocalConfig {
        &self.local_config
    }

    /// This service's own issuer, when it also acts as a provider
    pub fn local_issuer(&self) -> Option<&str> {
        self.local_config.issuer.as_deref()
    }

    /// Return the client registered with `issuer`, registering one if needed
    pub async fn client_for_issuer(&self, issuer: &str) -> Result<RegisteredClient> {
        if let Some(client) = self.load_client(issuer).await? {
            tracing::debug!(%issuer, client_id = %client.client_id(), "client fetched from store");
            return Ok(client);
        }

        tracing::debug!(%issuer, "client not present, registering new client");

        let config = self.registration_config_for(issuer, RegistrationOverrides::default())?;
        let client = self.register_client(&config).await.inspect_err(|error| {
            tracing::error!(%issuer, ?error, "error registering a new client");
        })?;

        self.persist_client(client).await.inspect_err(|error| {
            tracing::error!(%issuer, ?error, "error persisting registered client");
        })
    }

    /// Look up a stored client without registering
    pub async fn load_client(&self, issuer: &str) -> Result<Option<RegisteredClient>> {
        self.store.get(issuer).await
    }

    /// Register a new client with the provider named by `config.issuer`
    pub async fn register_client(&self, config: &RegistrationConfig) -> Result<RegisteredClient> {
        tracing::info!(issuer = %config.issuer, "registering new client");
        let client = self.registrar.register(&config.issuer, config).await?;
        Ok(client)
    }

    /// Store a freshly registered client.
    ///
    /// Storage failures are reported as [`MultiRpError::Persistence`]: the
    /// provider already knows the client, but the next lookup will register again.
    pub async fn persist_client(&self, client: RegisteredClient) -> Result<RegisteredClient> {
        match self.store.put(&client).await {
            Ok(_) => Ok(client),
            Err(MultiRpError::Storage(error)) => Err(MultiRpError::Persistence(error)),
            Err(error) => Err(error),
        }
    }

    /// Callback URL dedicated to `issuer`: `{base}/{percent-encoded issuer}`.
    ///
    /// `base_uri` defaults to the locally configured redirect URI.
    pub fn redirect_uri_for_issuer(&self, issuer: &str, base_uri: Option<&str>) -> Result<String> {
        let base_uri = base_uri
            .or(self.local_config.redirect_uri.as_deref())
            .ok_or_else(|| {
                MultiRpError::Configuration(
                    "cannot form redirect uri, base uri is missing".to_string(),
                )
            })?;

        Ok(format!(
            "{}/{}",
            base_uri.trim_end_matches('/'),
            encode_key(issuer)
        ))
    }

    /// Build the dynamic registration request for `issuer`.
    ///
    /// Fields set in `overrides` are used as given; the rest are defaulted.
    pub fn registration_config_for(
        &self,
        issuer: &str,
        overrides: RegistrationOverrides,
    ) -> Result<RegistrationConfig> {
        let redirect_uris = match (overrides.redirect_uris, overrides.redirect_uri) {
            (Some(redirect_uris), _) => redirect_uris,
            (None, Some(redirect_uri)) => vec![redirect_uri],
            (None, None) => vec![self.redirect_uri_for_issuer(issuer, None)?],
        };

        let client_name = overrides.client_name.unwrap_or_else(|| {
            format!("{} OIDC RP for {}", self.local_config.service_name, issuer)
        });

        Ok(RegistrationConfig {
            issuer: issuer.to_string(),
            redirect_uris,
            client_name,
            default_max_age: overrides
                .default_max_age
                .unwrap_or(self.local_config.default_max_age),
            grant_types: overrides
                .grant_types
                .unwrap_or_else(|| DEFAULT_GRANT_TYPES.iter().map(|s| s.to_string()).collect()),
            response_types: overrides.response_types.unwrap_or_else(|| {
                DEFAULT_RESPONSE_TYPES
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            }),
            post_logout_redirect_uris: overrides
                .post_logout_redirect_uris
                .unwrap_or_else(|| self.local_config.post_logout_redirect_uris.clone()),
            scope: overrides.scope.unwrap_or_else(|| DEFAULT_SCOPE.to_string()),
            metadata: overrides.metadata,
        })
    }

    /// Authorization URL that starts `workflow` with `client`'s provider
    pub fn auth_url(
        &self,
        client: &RegisteredClient,
        workflow: Workflow,
    ) -> Result<AuthorizationUrl> {
        let redirect_uri = client.redirect_uri().ok_or_else(|| {
            MultiRpError::InvalidArgument(format!(
                "client for {} has no registered redirect uri",
                client.issuer
            ))
        })?;

        let state = generate_token();
        let nonce = generate_token();
        let params = AuthorizationParams {
            redirect_uri: redirect_uri.to_string(),
            response_type: Some(workflow.response_type().to_string()),
            scope: None,
            state: Some(state.clone()),
            nonce: Some(nonce.clone()),
        };

        let url = client.authorization_uri(&params)?;
        Ok(AuthorizationUrl { url, state, nonce })
    }

    /// Resolve the client for `issuer` and build its authorization URL
    pub async fn auth_url_for_issuer(
        &self,
        issuer: &str,
        workflow: Workflow,
    ) -> Result<AuthorizationUrl> {
        let result = match self.client_for_issuer(issuer).await {
            Ok(client) => self.auth_url(&client, workflow),
            Err(error) => Err(error),
        };

        result.inspect_err(|error| {
            tracing::error!(%issuer, %workflow, ?error, "error in auth_url_for_issuer");
        })
    }
}
