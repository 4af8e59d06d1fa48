//! OIDC provider discovery.
//!
//! Fetches provider metadata from `/.well-known/openid-configuration`.

use crate::errors::RegistrationError;
use crate::oidc::types::ProviderMetadata;

/// Discovery document path relative to the issuer
pub const DISCOVERY_PATH: &str = "/.well-known/openid-configuration";

/// Discovery URL for an issuer
pub fn discovery_url(issuer: &str) -> String {
    format!("{}{}", issuer.trim_end_matches('/'), DISCOVERY_PATH)
}

/// Two issuer identifiers name the same provider when they differ at most by a
/// trailing slash
pub fn same_issuer(left: &str, right: &str) -> bool {
    left.trim_end_matches('/') == right.trim_end_matches('/')
}

/// Fetch and validate the provider metadata for `issuer`
pub async fn discover_provider(
    http_client: &reqwest::Client,
    issuer: &str,
) -> Result<ProviderMetadata, RegistrationError> {
    let url = discovery_url(issuer);
    tracing::debug!(%issuer, %url, "fetching provider configuration");

    let response = http_client
        .get(&url)
        .send()
        .await
        .map_err(|e| RegistrationError::DiscoveryFailed(issuer.to_string(), e.to_string()))?;

    if !response.status().is_success() {
        return Err(RegistrationError::DiscoveryFailed(
            issuer.to_string(),
            format!("discovery request returned status {}", response.status()),
        ));
    }

    let metadata: ProviderMetadata = response.json().await.map_err(|e| {
        RegistrationError::DiscoveryFailed(
            issuer.to_string(),
            format!("invalid provider configuration: {}", e),
        )
    })?;

    if !same_issuer(&metadata.issuer, issuer) {
        return Err(RegistrationError::IssuerMismatch {
            expected: issuer.to_string(),
            discovered: metadata.issuer,
        });
    }

    Ok(metadata)
}
