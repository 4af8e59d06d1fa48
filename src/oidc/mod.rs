//! OpenID Connect relying-party capability: provider discovery, dynamic client
//! registration, and authorization URL construction.

pub mod discovery;
pub mod registration;
pub mod types;

// Re-export frequently used items from each module
pub use discovery::discover_provider;
pub use registration::{ClientRegistrar, HttpClientRegistrar};
pub use types::{
    AuthorizationParams, AuthorizationUrl, ClientRegistration, DEFAULT_GRANT_TYPES,
    DEFAULT_MAX_AGE, DEFAULT_RESPONSE_TYPES, DEFAULT_SCOPE, ProviderMetadata, RegisteredClient,
    RegistrationConfig, RegistrationOverrides, Workflow, generate_token,
};
