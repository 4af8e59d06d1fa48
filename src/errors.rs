//! Standardized error types following the `error-multirp-<domain>-<number>` format.

use thiserror::Error;

/// Configuration errors that occur during application startup
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Error when a required environment variable is not set
    #[error("error-multirp-config-1 {0} must be set")]
    EnvVarRequired(String),

    /// Error when HTTP client timeout cannot be parsed
    #[error("error-multirp-config-2 Failed to parse HTTP client timeout: {0}")]
    TimeoutParsingFailed(std::num::ParseIntError),

    /// Error when duration string cannot be parsed
    #[error("error-multirp-config-3 Failed to parse duration '{0}': {1}")]
    DurationParsingFailed(String, String),

    /// Error when version information is not available
    #[error("error-multirp-config-4 One of GIT_HASH or CARGO_PKG_VERSION must be set")]
    VersionNotSet,

    /// Error when a configured URL cannot be parsed
    #[error("error-multirp-config-5 Invalid URL '{0}': {1}")]
    InvalidUrl(String, url::ParseError),
}

/// Storage backend errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Error when database connection fails
    #[error("error-multirp-storage-1 Database connection failed: {0}")]
    ConnectionFailed(String),

    /// Error when query execution fails
    #[error("error-multirp-storage-2 Query execution failed: {0}")]
    QueryFailed(String),

    /// Error when data serialization fails
    #[error("error-multirp-storage-3 Data serialization failed: {0}")]
    SerializationFailed(String),

    /// Error when database operation fails
    #[error("error-multirp-storage-4 Database error: {0}")]
    DatabaseError(String),

    /// Error when data validation fails
    #[error("error-multirp-storage-5 Invalid data: {0}")]
    InvalidData(String),

    /// Error when a filesystem operation fails
    #[error("error-multirp-storage-6 I/O error: {0}")]
    Io(String),
}

/// Discovery and dynamic client registration errors
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// Provider configuration document could not be fetched or parsed
    #[error("error-multirp-registration-1 Discovery failed for {0}: {1}")]
    DiscoveryFailed(String, String),

    /// Discovered issuer does not match the requested issuer
    #[error("error-multirp-registration-2 Issuer mismatch: expected {expected}, discovered {discovered}")]
    IssuerMismatch { expected: String, discovered: String },

    /// Provider does not advertise a registration endpoint
    #[error("error-multirp-registration-3 Dynamic registration not supported by {0}")]
    RegistrationNotSupported(String),

    /// Registration request could not be sent
    #[error("error-multirp-registration-4 Registration request failed: {0}")]
    RequestFailed(String),

    /// Provider rejected the registration request
    #[error("error-multirp-registration-5 Registration rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// Provider answered with a body that is not a registration response
    #[error("error-multirp-registration-6 Invalid registration response: {0}")]
    InvalidResponse(String),
}

/// Errors surfaced by the client store and the multi-RP client
#[derive(Debug, Error)]
pub enum MultiRpError {
    /// Missing or malformed argument, detected before any I/O
    #[error("error-multirp-1 Invalid argument: {0}")]
    InvalidArgument(String),

    /// Local configuration cannot satisfy the request
    #[error("error-multirp-2 Configuration error: {0}")]
    Configuration(String),

    /// Backend failure while reading or writing the client store
    #[error("error-multirp-3 Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Dynamic registration with the provider failed
    #[error("error-multirp-4 Registration error: {0}")]
    Registration(#[from] RegistrationError),

    /// Client was registered with the provider but could not be stored
    #[error("error-multirp-5 Persistence error: {0}")]
    Persistence(StorageError),

    /// Authorization URL could not be built from the provider metadata
    #[error("error-multirp-6 Authorization URL error: {0}")]
    AuthorizationUrl(String),
}

pub type Result<T> = std::result::Result<T, MultiRpError>;
