//! Multi-provider OpenID Connect relying-party client registry.
//!
//! Keeps one dynamically registered client per identity-provider issuer.
//! [`multi_rp::MultiRpClient`] returns the stored registration for an issuer or
//! registers with the issuer and stores the result through
//! [`client_store::ClientStore`], which sits on a pluggable key-value backend.

pub mod client_store;
pub mod config;
pub mod errors;
pub mod multi_rp;
pub mod oidc;
pub mod storage;

pub use client_store::ClientStore;
pub use multi_rp::MultiRpClient;
