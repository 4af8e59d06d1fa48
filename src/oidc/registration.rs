//! OpenID Connect Dynamic Client Registration (RFC 7591).
//!
//! [`ClientRegistrar`] is the capability the multi-RP client uses to register
//! itself with a provider it has no stored client for. [`HttpClientRegistrar`]
//! performs discovery and registration over HTTP.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

use crate::errors::RegistrationError;
use crate::oidc::discovery::discover_provider;
use crate::oidc::types::{ClientRegistration, RegisteredClient, RegistrationConfig};

/// Registers a relying party with an OIDC provider
#[async_trait]
pub trait ClientRegistrar: Send + Sync {
    /// Register a new client with `issuer` using `config`
    async fn register(
        &self,
        issuer: &str,
        config: &RegistrationConfig,
    ) -> Result<RegisteredClient, RegistrationError>;
}

/// Error body returned by a registration endpoint (RFC 7591 section 3.2.2)
#[derive(Debug, Deserialize)]
struct RegistrationErrorResponse {
    error: String,
    error_description: Option<String>,
}

/// Discovery plus dynamic registration over HTTP
#[derive(Clone)]
pub struct HttpClientRegistrar {
    http_client: reqwest::Client,
    /// Bearer token for providers with protected registration endpoints
    initial_access_token: Option<String>,
}

impl HttpClientRegistrar {
    pub fn new(http_client: reqwest::Client) -> Self {
        Self {
            http_client,
            initial_access_token: None,
        }
    }

    /// Send `token` as the initial access token on registration requests
    pub fn with_initial_access_token(mut self, token: impl Into<String>) -> Self {
        self.initial_access_token = Some(token.into());
        self
    }

    pub fn http_client(&self) -> &reqwest::Client {
        &self.http_client
    }
}

#[async_trait]
impl ClientRegistrar for HttpClientRegistrar {
    async fn register(
        &self,
        issuer: &str,
        config: &RegistrationConfig,
    ) -> Result<RegisteredClient, RegistrationError> {
        let provider = discover_provider(&self.http_client, issuer).await?;

        let registration_endpoint = provider
            .registration_endpoint
            .clone()
            .ok_or_else(|| RegistrationError::RegistrationNotSupported(issuer.to_string()))?;

        tracing::debug!(%issuer, %registration_endpoint, "sending registration request");

        let mut request = self.http_client.post(&registration_endpoint).json(config);
        if let Some(token) = &self.initial_access_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RegistrationError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RegistrationError::RequestFailed(e.to_string()))?;

        if !status.is_success() {
            let message = match serde_json::from_str::<RegistrationErrorResponse>(&body) {
                Ok(error) => match error.error_description {
                    Some(description) => format!("{}: {}", error.error, description),
                    None => error.error,
                },
                Err(_) => body,
            };
            return Err(RegistrationError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let registration: ClientRegistration = serde_json::from_str(&body)
            .map_err(|e| RegistrationError::InvalidResponse(e.to_string()))?;

        tracing::info!(
            %issuer,
            client_id = %registration.client_id,
            "client registered with provider"
        );

        Ok(RegisteredClient {
            issuer: issuer.to_string(),
            provider,
            registration,
            registered_at: Utc::now(),
        })
    }
}
