//! OpenID Connect relying-party types and data structures.
//!
//! Defines the persisted client registration record, the dynamic registration
//! request, and the parameters used to start an authorization workflow.

use base64::prelude::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::errors::{MultiRpError, StorageError};

/// Grant types requested when registering a new client
pub const DEFAULT_GRANT_TYPES: [&str; 4] = [
    "authorization_code",
    "implicit",
    "refresh_token",
    "client_credentials",
];

/// Response types requested when registering a new client
pub const DEFAULT_RESPONSE_TYPES: [&str; 3] = ["code", "id_token token", "code id_token token"];

/// Scope requested when registering a new client
pub const DEFAULT_SCOPE: &str = "openid profile";

/// Default `default_max_age` registration value, in seconds
pub const DEFAULT_MAX_AGE: u64 = 86400;

/// Provider metadata from `/.well-known/openid-configuration`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderMetadata {
    /// Issuer identifier of the provider
    pub issuer: String,
    /// Authorization endpoint
    pub authorization_endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_endpoint: Option<String>,
    /// Dynamic client registration endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub userinfo_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwks_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_session_endpoint: Option<String>,
    /// Remaining discovery fields, kept verbatim
    #[serde(flatten)]
    pub additional: HashMap<String, serde_json::Value>,
}

/// Client registration response returned by the provider (RFC 7591 section 3.2.1)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientRegistration {
    pub client_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
    #[serde(default)]
    pub grant_types: Vec<String>,
    #[serde(default)]
    pub response_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_max_age: Option<u64>,
    #[serde(default)]
    pub post_logout_redirect_uris: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_client_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id_issued_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret_expires_at: Option<i64>,
    /// Remaining registration fields, kept verbatim
    #[serde(flatten)]
    pub additional: HashMap<String, serde_json::Value>,
}

/// A client registered with one OIDC provider.
///
/// This is the record persisted per issuer. Its serialized form is produced by
/// [`RegisteredClient::serialize`] and is opaque to the storage layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredClient {
    /// Issuer this client is registered with. Primary key in the client store.
    pub issuer: String,
    pub provider: ProviderMetadata,
    pub registration: ClientRegistration,
    /// When this relying party registered the client
    pub registered_at: DateTime<Utc>,
}

impl RegisteredClient {
    /// Serialize the client for storage
    pub fn serialize(&self) -> Result<String, StorageError> {
        serde_json::to_string(self).map_err(|e| StorageError::SerializationFailed(e.to_string()))
    }

    /// Rebuild a client from its serialized form
    pub fn from_serialized(data: &str) -> Result<Self, StorageError> {
        serde_json::from_str(data).map_err(|e| StorageError::SerializationFailed(e.to_string()))
    }

    pub fn client_id(&self) -> &str {
        &self.registration.client_id
    }

    /// First registered redirect URI
    pub fn redirect_uri(&self) -> Option<&str> {
        self.registration.redirect_uris.first().map(String::as_str)
    }

    /// Build the provider authorization URL for this client
    pub fn authorization_uri(&self, params: &AuthorizationParams) -> Result<String, MultiRpError> {
        let mut url = Url::parse(&self.provider.authorization_endpoint).map_err(|e| {
            MultiRpError::AuthorizationUrl(format!(
                "invalid authorization endpoint '{}': {}",
                self.provider.authorization_endpoint, e
            ))
        })?;

        let scope = params
            .scope
            .as_deref()
            .or(self.registration.scope.as_deref())
            .unwrap_or("openid");

        {
            let mut query = url.query_pairs_mut();
            if let Some(response_type) = &params.response_type {
                query.append_pair("response_type", response_type);
            }
            query.append_pair("client_id", &self.registration.client_id);
            query.append_pair("redirect_uri", &params.redirect_uri);
            query.append_pair("scope", scope);
            if let Some(state) = &params.state {
                query.append_pair("state", state);
            }
            if let Some(nonce) = &params.nonce {
                query.append_pair("nonce", nonce);
            }
        }

        Ok(url.to_string())
    }
}

/// Caller-supplied registration metadata. Every field that is set wins over the
/// computed default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistrationOverrides {
    /// Single redirect URI used when `redirect_uris` is not set
    pub redirect_uri: Option<String>,
    pub redirect_uris: Option<Vec<String>>,
    pub client_name: Option<String>,
    pub default_max_age: Option<u64>,
    pub grant_types: Option<Vec<String>>,
    pub response_types: Option<Vec<String>>,
    pub post_logout_redirect_uris: Option<Vec<String>>,
    pub scope: Option<String>,
    /// Extra client metadata such as `logo_uri` or `client_uri`
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Dynamic client registration request sent to a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationConfig {
    pub issuer: String,
    pub redirect_uris: Vec<String>,
    pub client_name: String,
    pub default_max_age: u64,
    pub grant_types: Vec<String>,
    pub response_types: Vec<String>,
    pub post_logout_redirect_uris: Vec<String>,
    pub scope: String,
    #[serde(flatten)]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Authorization workflow used to start a login
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Workflow {
    /// Authorization Code flow
    #[default]
    Code,
    /// Implicit flow
    Implicit,
}

impl Workflow {
    /// `response_type` value for this workflow
    pub fn response_type(&self) -> &'static str {
        match self {
            Workflow::Code => "code",
            Workflow::Implicit => "id_token token",
        }
    }
}

impl FromStr for Workflow {
    type Err = MultiRpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "code" => Ok(Workflow::Code),
            "implicit" => Ok(Workflow::Implicit),
            other => Err(MultiRpError::InvalidArgument(format!(
                "unknown authorization workflow '{}', expected 'code' or 'implicit'",
                other
            ))),
        }
    }
}

impl fmt::Display for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Workflow::Code => write!(f, "code"),
            Workflow::Implicit => write!(f, "implicit"),
        }
    }
}

/// Parameters for an authorization request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthorizationParams {
    pub redirect_uri: String,
    pub response_type: Option<String>,
    pub scope: Option<String>,
    pub state: Option<String>,
    pub nonce: Option<String>,
}

/// Authorization URL together with the values the callback must echo back
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorizationUrl {
    pub url: String,
    pub state: String,
    pub nonce: String,
}

/// Generate a random URL-safe token for `state` and `nonce` values
pub fn generate_token() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.r#gen();
    BASE64_URL_SAFE_NO_PAD.encode(bytes)
}
