//! Multi-RP Integration Tests
//!
//! These tests drive the full resolve flow: store lookup, discovery and dynamic
//! registration against a local fake provider, persistence, and authorization
//! URL construction.

use async_trait::async_trait;
use axum::{
    Json, Router,
    routing::{get, post},
};
use chrono::Utc;
use multi_rp::config::LocalConfig;
use multi_rp::errors::{MultiRpError, RegistrationError};
use multi_rp::oidc::{
    ClientRegistrar, HttpClientRegistrar, RegisteredClient, RegistrationConfig, Workflow,
};
use multi_rp::storage::{FileKeyValueStore, MemoryKeyValueStore};
use multi_rp::{ClientStore, MultiRpClient};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::net::TcpListener;
use tokio::sync::Barrier;
use url::Url;

fn local_config() -> LocalConfig {
    LocalConfig {
        redirect_uri: Some("https://rp.example/rp".to_string()),
        ..Default::default()
    }
}

/// Serve a fake provider on a random local port; returns the issuer URL and a
/// counter of registration requests
async fn spawn_provider() -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let issuer = format!("http://{}", listener.local_addr().unwrap());
    let registrations = Arc::new(AtomicUsize::new(0));

    let discovery_issuer = issuer.clone();
    let discovery = move || {
        let issuer = discovery_issuer.clone();
        async move {
            Json(json!({
                "issuer": issuer,
                "authorization_endpoint": format!("{}/authorize", issuer),
                "token_endpoint": format!("{}/token", issuer),
                "registration_endpoint": format!("{}/register", issuer),
            }))
        }
    };

    let counter = registrations.clone();
    let register = move |Json(body): Json<Value>| {
        let counter = counter.clone();
        async move {
            let count = counter.fetch_add(1, Ordering::SeqCst) + 1;
            Json(json!({
                "client_id": format!("client-{}", count),
                "client_secret": "secret",
                "redirect_uris": body["redirect_uris"],
                "grant_types": body["grant_types"],
                "response_types": body["response_types"],
                "client_name": body["client_name"],
            }))
        }
    };

    let app = Router::new()
        .route("/.well-known/openid-configuration", get(discovery))
        .route("/register", post(register));

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (issuer, registrations)
}

fn query_value(url: &str, name: &str) -> Option<String> {
    Url::parse(url)
        .unwrap()
        .query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.to_string())
}

#[tokio::test]
async fn test_resolve_registers_and_persists() {
    let (issuer, registrations) = spawn_provider().await;
    let dir = tempfile::tempdir().unwrap();

    let client = MultiRpClient::new(
        ClientStore::from_path(dir.path()),
        Arc::new(HttpClientRegistrar::new(reqwest::Client::new())),
        local_config(),
    );

    let registered = client.client_for_issuer(&issuer).await.unwrap();
    assert_eq!(registered.issuer, issuer);
    assert_eq!(registered.client_id(), "client-1");
    assert_eq!(
        registered.redirect_uri().map(|s| s.to_string()),
        Some(format!(
            "https://rp.example/rp/{}",
            urlencoding::encode(&issuer)
        ))
    );
    assert_eq!(
        registered.registration.client_name.as_deref(),
        Some(format!("multi-rp OIDC RP for {}", issuer).as_str())
    );

    // A second client over the same directory finds the stored registration
    let reopened = MultiRpClient::new(
        ClientStore::new(Arc::new(FileKeyValueStore::new(dir.path()))),
        Arc::new(HttpClientRegistrar::new(reqwest::Client::new())),
        local_config(),
    );
    let resolved = reopened.client_for_issuer(&issuer).await.unwrap();
    assert_eq!(resolved, registered);
    assert_eq!(registrations.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_auth_url_for_issuer_end_to_end() {
    let (issuer, registrations) = spawn_provider().await;

    let client = MultiRpClient::new(
        ClientStore::new(Arc::new(MemoryKeyValueStore::new())),
        Arc::new(HttpClientRegistrar::new(reqwest::Client::new())),
        local_config(),
    );

    let code = client
        .auth_url_for_issuer(&issuer, Workflow::Code)
        .await
        .unwrap();
    assert!(code.url.starts_with(&format!("{}/authorize?", issuer)));
    assert_eq!(query_value(&code.url, "client_id").as_deref(), Some("client-1"));
    assert_eq!(query_value(&code.url, "response_type").as_deref(), Some("code"));
    assert_eq!(query_value(&code.url, "state"), Some(code.state.clone()));

    let implicit = client
        .auth_url_for_issuer(&issuer, Workflow::Implicit)
        .await
        .unwrap();
    assert_eq!(
        query_value(&implicit.url, "response_type").as_deref(),
        Some("id_token token")
    );
    assert_eq!(registrations.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unreachable_provider_is_registration_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let issuer = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let client = MultiRpClient::new(
        ClientStore::new(Arc::new(MemoryKeyValueStore::new())),
        Arc::new(HttpClientRegistrar::new(reqwest::Client::new())),
        local_config(),
    );

    let result = client.client_for_issuer(&issuer).await;
    assert!(matches!(
        result,
        Err(MultiRpError::Registration(RegistrationError::DiscoveryFailed(_, _)))
    ));
    assert!(client.load_client(&issuer).await.unwrap().is_none());
}

/// Registrar that holds every caller until all expected registrations are in flight
struct RendezvousRegistrar {
    barrier: Barrier,
    calls: AtomicUsize,
}

#[async_trait]
impl ClientRegistrar for RendezvousRegistrar {
    async fn register(
        &self,
        issuer: &str,
        config: &RegistrationConfig,
    ) -> Result<RegisteredClient, RegistrationError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.barrier.wait().await;

        Ok(RegisteredClient {
            issuer: issuer.to_string(),
            provider: serde_json::from_value(json!({
                "issuer": issuer,
                "authorization_endpoint": format!("{}/authorize", issuer),
            }))
            .unwrap(),
            registration: serde_json::from_value(json!({
                "client_id": format!("client-{}", call),
                "redirect_uris": config.redirect_uris,
            }))
            .unwrap(),
            registered_at: Utc::now(),
        })
    }
}

#[tokio::test]
async fn test_concurrent_resolution_last_write_wins() {
    let registrar = Arc::new(RendezvousRegistrar {
        barrier: Barrier::new(2),
        calls: AtomicUsize::new(0),
    });
    let client = MultiRpClient::new(
        ClientStore::new(Arc::new(MemoryKeyValueStore::new())),
        registrar.clone(),
        local_config(),
    );

    let (first, second) = tokio::join!(
        client.client_for_issuer("https://issuer.example"),
        client.client_for_issuer("https://issuer.example")
    );
    let first = first.unwrap();
    let second = second.unwrap();

    // Both lookups missed, so both registered
    assert_eq!(registrar.calls.load(Ordering::SeqCst), 2);
    assert_ne!(first.client_id(), second.client_id());

    let stored = client
        .load_client("https://issuer.example")
        .await
        .unwrap()
        .unwrap();
    assert!(stored == first || stored == second);
}
