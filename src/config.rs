//! Environment-based configuration for the multi-RP client and its CLI.

use anyhow::Result;
use std::time::Duration;
use url::Url;

use crate::client_store::COLLECTION_NAME;
use crate::errors::ConfigError;
use crate::oidc::types::DEFAULT_MAX_AGE;

/// Service name used in generated client names when none is configured
pub const DEFAULT_SERVICE_NAME: &str = "multi-rp";

/// Certificate bundles for HTTPS connections
#[derive(Clone, Debug, Default)]
pub struct CertificateBundles(Vec<String>);

/// HTTP client timeout configuration
#[derive(Clone, Debug)]
pub struct HttpClientTimeout(Duration);

/// Base URL that per-issuer redirect URIs are derived from
#[derive(Clone, Debug, PartialEq)]
pub struct RedirectUri(Option<String>);

/// URIs registered for post-logout redirects
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PostLogoutRedirectUris(Vec<String>);

/// `default_max_age` sent with registration requests
#[derive(Clone, Debug, PartialEq)]
pub struct DefaultMaxAge(Duration);

/// Settings describing this relying party, shared by every issuer it registers with
#[derive(Clone, Debug, PartialEq)]
pub struct LocalConfig {
    /// This service's own issuer, when it is also a provider
    pub issuer: Option<String>,
    /// Base for per-issuer redirect URIs
    pub redirect_uri: Option<String>,
    pub post_logout_redirect_uris: Vec<String>,
    /// Used in the default `client_name`
    pub service_name: String,
    /// Seconds
    pub default_max_age: u64,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            issuer: None,
            redirect_uri: None,
            post_logout_redirect_uris: Vec::new(),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            default_max_age: DEFAULT_MAX_AGE,
        }
    }
}

/// Main application configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub version: String,
    pub storage_backend: String,
    pub storage_path: String,
    pub database_url: Option<String>,
    pub client_collection: String,
    pub local_issuer: Option<String>,
    pub redirect_uri: RedirectUri,
    pub post_logout_redirect_uris: PostLogoutRedirectUris,
    pub service_name: String,
    pub default_max_age: DefaultMaxAge,
    pub http_client_timeout: HttpClientTimeout,
    pub user_agent: String,
    pub certificate_bundles: CertificateBundles,
    pub registration_access_token: Option<String>,
}

impl Config {
    /// Create a new configuration from environment variables
    pub fn new() -> Result<Self> {
        let certificate_bundles: CertificateBundles =
            optional_env("CERTIFICATE_BUNDLES").try_into()?;
        let client_collection = default_env("CLIENT_COLLECTION", COLLECTION_NAME);
        let default_max_age: DefaultMaxAge = default_env("DEFAULT_MAX_AGE", "1d").try_into()?;
        let default_user_agent = format!("multi-rp/{}", version()?);
        let http_client_timeout: HttpClientTimeout =
            default_env("HTTP_CLIENT_TIMEOUT", "10s").try_into()?;
        let local_issuer = optional_env("LOCAL_ISSUER").filter(|value| !value.is_empty());
        let post_logout_redirect_uris: PostLogoutRedirectUris =
            optional_env("POST_LOGOUT_REDIRECT_URIS").try_into()?;
        let redirect_uri: RedirectUri = optional_env("REDIRECT_URI").try_into()?;
        let registration_access_token =
            optional_env("REGISTRATION_ACCESS_TOKEN").filter(|value| !value.is_empty());
        let service_name = default_env("SERVICE_NAME", DEFAULT_SERVICE_NAME);
        let storage_backend = default_env("STORAGE_BACKEND", "file");
        let database_url = if storage_backend == "postgres" {
            Some(require_env("DATABASE_URL")?)
        } else {
            optional_env("DATABASE_URL")
        };
        let storage_path = default_env("STORAGE_PATH", "./data");
        let user_agent = default_env("USER_AGENT", &default_user_agent);

        Ok(Self {
            version: version()?,
            storage_backend,
            storage_path,
            database_url,
            client_collection,
            local_issuer,
            redirect_uri,
            post_logout_redirect_uris,
            service_name,
            default_max_age,
            http_client_timeout,
            user_agent,
            certificate_bundles,
            registration_access_token,
        })
    }

    /// Relying-party settings handed to the multi-RP client
    pub fn local_config(&self) -> LocalConfig {
        LocalConfig {
            issuer: self.local_issuer.clone(),
            redirect_uri: self.redirect_uri.as_ref().clone(),
            post_logout_redirect_uris: self.post_logout_redirect_uris.as_ref().clone(),
            service_name: self.service_name.clone(),
            default_max_age: self.default_max_age.as_secs(),
        }
    }
}

/// Get application version from build environment
pub fn version() -> Result<String> {
    option_env!("GIT_HASH")
        .or(option_env!("CARGO_PKG_VERSION"))
        .map(|val| val.to_string())
        .ok_or(ConfigError::VersionNotSet.into())
}

fn require_env(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| ConfigError::EnvVarRequired(name.to_string()).into())
}

pub(crate) fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn default_env(name: &str, default_value: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default_value.to_string())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(';')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

impl TryFrom<Option<String>> for CertificateBundles {
    type Error = anyhow::Error;

    fn try_from(value: Option<String>) -> Result<Self, Self::Error> {
        Ok(Self(split_list(&value.unwrap_or_default())))
    }
}

impl AsRef<Vec<String>> for CertificateBundles {
    fn as_ref(&self) -> &Vec<String> {
        &self.0
    }
}

impl TryFrom<String> for HttpClientTimeout {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Ok(Self(Duration::from_secs(10)));
        }

        if let Some(seconds) = value.strip_suffix('s') {
            let seconds = seconds
                .parse::<u64>()
                .map_err(ConfigError::TimeoutParsingFailed)?;
            Ok(Self(Duration::from_secs(seconds)))
        } else if let Some(minutes) = value.strip_suffix('m') {
            let minutes = minutes
                .parse::<u64>()
                .map_err(ConfigError::TimeoutParsingFailed)?;
            Ok(Self(Duration::from_secs(minutes * 60)))
        } else {
            // Bare numbers are seconds
            let seconds = value
                .parse::<u64>()
                .map_err(ConfigError::TimeoutParsingFailed)?;
            Ok(Self(Duration::from_secs(seconds)))
        }
    }
}

impl AsRef<Duration> for HttpClientTimeout {
    fn as_ref(&self) -> &Duration {
        &self.0
    }
}

impl TryFrom<Option<String>> for RedirectUri {
    type Error = ConfigError;

    fn try_from(value: Option<String>) -> Result<Self, Self::Error> {
        match value.filter(|s| !s.is_empty()) {
            None => Ok(Self(None)),
            Some(value) => {
                Url::parse(&value).map_err(|e| ConfigError::InvalidUrl(value.clone(), e))?;
                Ok(Self(Some(value)))
            }
        }
    }
}

impl TryFrom<String> for RedirectUri {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(Some(value))
    }
}

impl AsRef<Option<String>> for RedirectUri {
    fn as_ref(&self) -> &Option<String> {
        &self.0
    }
}

impl TryFrom<Option<String>> for PostLogoutRedirectUris {
    type Error = ConfigError;

    fn try_from(value: Option<String>) -> Result<Self, Self::Error> {
        let uris = split_list(&value.unwrap_or_default());
        for uri in &uris {
            Url::parse(uri).map_err(|e| ConfigError::InvalidUrl(uri.clone(), e))?;
        }
        Ok(Self(uris))
    }
}

impl AsRef<Vec<String>> for PostLogoutRedirectUris {
    fn as_ref(&self) -> &Vec<String> {
        &self.0
    }
}

impl TryFrom<String> for DefaultMaxAge {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let duration = duration_str::parse(&value)
            .map_err(|e| ConfigError::DurationParsingFailed(value, e.to_string()))?;
        Ok(Self(duration))
    }
}

impl DefaultMaxAge {
    pub fn as_secs(&self) -> u64 {
        self.0.as_secs()
    }
}

impl AsRef<Duration> for DefaultMaxAge {
    fn as_ref(&self) -> &Duration {
        &self.0
    }
}
