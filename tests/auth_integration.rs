//! Refresh-token exchange against a mocked token endpoint.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use stravadw::auth::{
    CredentialStore, EnvFileCredentialStore, MemoryCredentialStore, RefreshTokenProvider,
};
use stravadw::{Error, Result, StravaConfig, TokenProvider};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> StravaConfig {
    StravaConfig {
        client_id: Some("12345".into()),
        client_secret: Some(SecretString::from("shh".to_string())),
        token_url: format!("{}/oauth/token", server.uri()),
        ..StravaConfig::default()
    }
}

/// Lets the test keep a handle on the store it hands to the provider.
struct Shared(Arc<MemoryCredentialStore>);

impl CredentialStore for Shared {
    fn load(&self) -> Result<Option<SecretString>> {
        self.0.load()
    }

    fn save(&self, refresh_token: &SecretString) -> Result<()> {
        self.0.save(refresh_token)
    }
}

#[tokio::test]
async fn test_refresh_returns_access_token_and_rotates_refresh_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("client_id=12345"))
        .and(body_string_contains("refresh_token=old-refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "access_token": "fresh-access",
            "refresh_token": "new-refresh",
            "expires_at": 1_714_608_000,
            "expires_in": 21600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryCredentialStore::new(Some(SecretString::from(
        "old-refresh".to_string(),
    ))));
    let provider =
        RefreshTokenProvider::new(config(&server), Box::new(Shared(store.clone()))).unwrap();

    let token = provider.access_token().await.unwrap().unwrap();
    assert_eq!(token.expose_secret(), "fresh-access");
    assert_eq!(
        store.load().unwrap().unwrap().expose_secret(),
        "new-refresh"
    );
}

#[tokio::test]
async fn test_refresh_persists_to_env_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh-access",
            "refresh_token": "rotated"
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let env_path = dir.path().join(".env");
    std::fs::write(&env_path, "STRAVA_CLIENT_ID=12345\nSTRAVA_REFRESH_TOKEN=old\n").unwrap();

    // The env-file store prefers the process environment, so only run the
    // file round trip when the variable is not exported.
    if std::env::var("STRAVA_REFRESH_TOKEN").is_ok() {
        return;
    }

    let provider = RefreshTokenProvider::new(
        config(&server),
        Box::new(EnvFileCredentialStore::new(&env_path)),
    )
    .unwrap();
    provider.access_token().await.unwrap().unwrap();

    assert_eq!(
        std::fs::read_to_string(&env_path).unwrap(),
        "STRAVA_CLIENT_ID=12345\nSTRAVA_REFRESH_TOKEN=rotated\n"
    );
}

#[tokio::test]
async fn test_rejected_refresh_is_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "message": "Bad Request",
            "errors": [{"resource": "RefreshToken", "code": "invalid"}]
        })))
        .mount(&server)
        .await;

    let provider = RefreshTokenProvider::new(
        config(&server),
        Box::new(MemoryCredentialStore::new(Some(SecretString::from(
            "revoked".to_string(),
        )))),
    )
    .unwrap();

    let err = provider.access_token().await.unwrap_err();
    assert!(matches!(err, Error::Auth(ref m) if m.contains("400")));
    assert_eq!(err.exit_code(), 2);
}

#[tokio::test]
async fn test_missing_refresh_token_yields_none() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let provider = RefreshTokenProvider::new(
        config(&server),
        Box::new(MemoryCredentialStore::new(None)),
    )
    .unwrap();
    assert!(provider.access_token().await.unwrap().is_none());
}
