use std::collections::HashMap;
use std::sync::OnceLock;

use epic_auth::{
    AssertionBuilder, AuthError, BackendServicesClient, ClientAssertionClaims, EpicAuthConfig,
    PrivateKeySource, SigningKey, TokenClient,
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use rand::rngs::OsRng;
use rsa::RsaPrivateKey;
use rsa::pkcs8::{EncodePrivateKey, LineEnding};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CLIENT_ID: &str = "abc123";

fn private_key_pem() -> &'static str {
    static PEM: OnceLock<String> = OnceLock::new();
    PEM.get_or_init(|| {
        RsaPrivateKey::new(&mut OsRng, 2048)
            .expect("generate key")
            .to_pkcs8_pem(LineEnding::LF)
            .expect("encode key")
            .to_string()
    })
}

fn builder_for(endpoint: &str) -> AssertionBuilder {
    let key = SigningKey::from_pem(private_key_pem(), "epic-fhir-key-1").expect("load key");
    AssertionBuilder::new(CLIENT_ID, endpoint, key)
}

async fn exchange_against(server: &MockServer) -> Result<epic_auth::TokenResponse, AuthError> {
    let endpoint = format!("{}/token", server.uri());
    let builder = builder_for(&endpoint);
    let assertion = builder.build().expect("sign assertion");
    TokenClient::new(&endpoint)
        .exchange(&assertion, CLIENT_ID)
        .await
}

#[tokio::test]
async fn exchange_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains(
            "client_assertion_type=urn%3Aietf%3Aparams%3Aoauth%3Aclient-assertion-type%3Ajwt-bearer",
        ))
        .and(body_string_contains("client_assertion="))
        .and(body_string_contains("client_id=abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok1",
            "expires_in": 3600,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let token = exchange_against(&server).await.expect("token");
    assert_eq!(token.access_token, "tok1");
    assert_eq!(token.expires_in, Some(3600));
    assert_eq!(token.token_type.as_deref(), Some("Bearer"));
}

#[tokio::test]
async fn exchange_structured_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_client",
            "error_description": "bad"
        })))
        .mount(&server)
        .await;

    let err = exchange_against(&server).await.unwrap_err();
    match err {
        AuthError::TokenRejected { status, error } => {
            assert_eq!(status, 400);
            assert_eq!(error.error, "invalid_client");
            assert_eq!(error.error_description.as_deref(), Some("bad"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn exchange_ok_without_access_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"token_type":"Bearer"}"#))
        .mount(&server)
        .await;

    let err = exchange_against(&server).await.unwrap_err();
    match err {
        AuthError::UnexpectedResponse { status, body } => {
            assert_eq!(status, 200);
            assert_eq!(body, r#"{"token_type":"Bearer"}"#);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn exchange_unstructured_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(500).set_body_string("<html>Internal Error</html>"))
        .mount(&server)
        .await;

    let err = exchange_against(&server).await.unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert!(err.to_string().contains("<html>Internal Error</html>"));
}

#[tokio::test]
async fn exchange_transport_error() {
    // Nothing listens on port 1.
    let endpoint = "http://127.0.0.1:1/token";
    let assertion = builder_for(endpoint).build().expect("sign assertion");
    let err = TokenClient::new(endpoint)
        .exchange(&assertion, CLIENT_ID)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::Transport(_)));
}

#[tokio::test]
async fn backend_client_posts_verifiable_assertion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok2",
            "expires_in": 3600,
            "token_type": "Bearer",
            "scope": "system/Patient.read"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = EpicAuthConfig::default();
    config.client_id = CLIENT_ID.to_string();
    config.token_endpoint = format!("{}/oauth2/token", server.uri());
    config.keys.private_key = Some(private_key_pem().to_string());

    let client = BackendServicesClient::from_config(&config).expect("client");
    let token = client.fetch_token().await.expect("token");
    assert_eq!(token.access_token, "tok2");
    assert_eq!(token.scope.as_deref(), Some("system/Patient.read"));

    let requests = server.received_requests().await.expect("recorded requests");
    assert_eq!(requests.len(), 1);
    let form: HashMap<String, String> = url::form_urlencoded::parse(&requests[0].body)
        .into_owned()
        .collect();
    assert_eq!(form["grant_type"], "client_credentials");
    assert_eq!(form["client_id"], CLIENT_ID);

    let jwk = client.assertions().signing_key().to_jwk();
    let decoding_key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e).expect("decoding key");
    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_audience(&[&config.token_endpoint]);
    validation.set_issuer(&[CLIENT_ID]);
    let decoded =
        decode::<ClientAssertionClaims>(&form["client_assertion"], &decoding_key, &validation)
            .expect("valid assertion");
    assert_eq!(decoded.claims.sub, CLIENT_ID);
    assert_eq!(decoded.claims.exp - decoded.claims.iat, 300);
}

#[tokio::test]
async fn backend_client_requires_client_id() {
    let mut config = EpicAuthConfig::default();
    config.keys.private_key = Some(private_key_pem().to_string());
    let err = BackendServicesClient::from_config(&config).unwrap_err();
    assert!(matches!(err, AuthError::Configuration(_)));
}

#[tokio::test]
async fn backend_client_missing_key_file() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let mut config = EpicAuthConfig::default();
    config.client_id = CLIENT_ID.to_string();
    config.keys.private_key_path = dir.path().join("private_key.pem");
    let err = BackendServicesClient::from_config(&config).unwrap_err();
    assert!(matches!(err, AuthError::KeyFileNotFound { .. }));
}

#[tokio::test]
async fn exchange_accepts_string_lifetime() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok1",
            "expires_in": "3600",
            "token_type": "Bearer"
        })))
        .mount(&server)
        .await;

    let token = exchange_against(&server).await.expect("token");
    assert_eq!(token.access_token, "tok1");
    assert_eq!(token.expires_in, Some(3600));
}

#[tokio::test]
async fn backend_client_with_key_override() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok3",
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tmp dir");
    let key_path = dir.path().join("override.pem");
    std::fs::write(&key_path, private_key_pem()).expect("write key");

    let mut config = EpicAuthConfig::default();
    config.client_id = CLIENT_ID.to_string();
    config.token_endpoint = format!("{}/token", server.uri());
    config.keys.private_key_path = dir.path().join("absent.pem");

    let client = BackendServicesClient::from_config_with_key(
        &config,
        &PrivateKeySource::File(key_path),
        "override-kid",
    )
    .expect("client");
    assert_eq!(client.assertions().signing_key().kid(), "override-kid");
    assert_eq!(client.tokens().token_endpoint(), config.token_endpoint);

    let token = client.fetch_token().await.expect("token");
    assert_eq!(token.access_token, "tok3");

    let requests = server.received_requests().await.expect("recorded requests");
    let form: HashMap<String, String> = url::form_urlencoded::parse(&requests[0].body)
        .into_owned()
        .collect();
    let header = decode_header(&form["client_assertion"]).expect("header");
    assert_eq!(header.kid.as_deref(), Some("override-kid"));
}

#[tokio::test]
async fn backend_client_rejects_blank_kid() {
    let mut config = EpicAuthConfig::default();
    config.client_id = CLIENT_ID.to_string();
    let source = PrivateKeySource::Inline(private_key_pem().to_string());
    let err = BackendServicesClient::from_config_with_key(&config, &source, " ").unwrap_err();
    assert!(matches!(err, AuthError::InvalidKey { .. }));
}
