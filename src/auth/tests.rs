//! Tests for the auth module

use super::*;
use base64::Engine;
use crate::types::StringMap;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn oauth(token_url: String) -> OAuth2Config {
    OAuth2Config {
        token_url,
        client_id: "my-client".to_string(),
        client_secret: "my-secret".to_string(),
        ..Default::default()
    }
}

async fn authorization_header(auth: &Authenticator) -> String {
    let client = reqwest::Client::new();
    let req = auth.apply(client.get("https://example.com/api")).await.unwrap();
    let built = req.build().unwrap();
    built
        .headers()
        .get("Authorization")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_no_auth() {
    let auth = Authenticator::new(AuthConfig::None);
    let client = reqwest::Client::new();
    let req = auth.apply(client.get("https://example.com/api")).await.unwrap();

    let built = req.build().unwrap();
    assert!(built.headers().get("Authorization").is_none());
    assert!(!auth.can_refresh());
}

#[tokio::test]
async fn test_api_key_header() {
    let auth = Authenticator::new(AuthConfig::ApiKey {
        name: "X-API-Key".to_string(),
        value: "test-key-123".to_string(),
        location: Location::Header,
    });

    let client = reqwest::Client::new();
    let req = auth.apply(client.get("https://example.com/api")).await.unwrap();

    let built = req.build().unwrap();
    assert_eq!(built.headers().get("X-API-Key").unwrap(), "test-key-123");
}

#[tokio::test]
async fn test_api_key_param() {
    let auth = Authenticator::new(AuthConfig::ApiKey {
        name: "apikey".to_string(),
        value: "secret123".to_string(),
        location: Location::Param,
    });

    let client = reqwest::Client::new();
    let req = client.get("https://example.com/api?page=2");
    let req = auth.apply(req).await.unwrap();

    let built = req.build().unwrap();
    let query = built.url().query().unwrap();
    assert!(query.contains("apikey=secret123"));
    assert!(query.contains("page=2"));
}

#[tokio::test]
async fn test_basic_auth() {
    let auth = Authenticator::new(AuthConfig::Basic {
        username: "user".to_string(),
        password: "pass".to_string(),
    });

    let header = authorization_header(&auth).await;
    let encoded = header.strip_prefix("Basic ").unwrap();
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .unwrap();
    assert_eq!(String::from_utf8(decoded).unwrap(), "user:pass");
}

#[tokio::test]
async fn test_bearer_auth() {
    let auth = Authenticator::new(AuthConfig::Bearer {
        token: "my-bearer-token".to_string(),
    });

    assert_eq!(authorization_header(&auth).await, "Bearer my-bearer-token");
}

#[tokio::test]
async fn test_oauth2_client_credentials() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("client_id=my-client"))
        .and(body_string_contains("client_secret=my-secret"))
        .and(body_string_contains("scope=read"))
        .and(body_string_contains("audience=api"))
        .and(body_string_contains("resource=reports"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "oauth-token-123",
            "expires_in": 3600,
            "token_type": "Bearer"
        })))
        .mount(&mock_server)
        .await;

    let mut extra_params = StringMap::new();
    extra_params.insert("resource".to_string(), "reports".to_string());
    let auth = Authenticator::new(AuthConfig::OAuth2(OAuth2Config {
        scope: Some("read".to_string()),
        audience: Some("api".to_string()),
        extra_params,
        ..oauth(format!("{}/oauth/token", mock_server.uri()))
    }));

    assert!(auth.can_refresh());
    assert_eq!(authorization_header(&auth).await, "Bearer oauth-token-123");
}

#[tokio::test]
async fn test_oauth2_token_caching() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "cached-token",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let auth = Authenticator::new(AuthConfig::OAuth2(oauth(format!(
        "{}/oauth/token",
        mock_server.uri()
    ))));

    for _ in 0..3 {
        assert_eq!(authorization_header(&auth).await, "Bearer cached-token");
    }
}

#[tokio::test]
async fn test_oauth2_short_lived_token_is_refetched() {
    let mock_server = MockServer::start().await;

    // Anything inside the refresh margin counts as already expired
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "brief",
            "expires_in": 30
        })))
        .expect(2)
        .mount(&mock_server)
        .await;

    let auth = Authenticator::new(AuthConfig::OAuth2(oauth(format!(
        "{}/oauth/token",
        mock_server.uri()
    ))));

    authorization_header(&auth).await;
    authorization_header(&auth).await;
}

#[tokio::test]
async fn test_oauth2_refresh_token_rotation() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=first-refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "access-1",
            "expires_in": 3600,
            "refresh_token": "second-refresh"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("refresh_token=second-refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "access-2",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let auth = Authenticator::new(AuthConfig::OAuth2(OAuth2Config {
        grant_type: GrantType::RefreshToken,
        refresh_token: Some("first-refresh".to_string()),
        ..oauth(format!("{}/oauth/token", mock_server.uri()))
    }));

    assert_eq!(authorization_header(&auth).await, "Bearer access-1");
    assert_eq!(
        auth.current_refresh_token().await.as_deref(),
        Some("second-refresh")
    );

    auth.force_refresh().await;
    assert_eq!(authorization_header(&auth).await, "Bearer access-2");
}

#[tokio::test]
async fn test_oauth2_refresh_grant_requires_token() {
    let auth = Authenticator::new(AuthConfig::OAuth2(OAuth2Config {
        grant_type: GrantType::RefreshToken,
        ..oauth("http://127.0.0.1:9/token".to_string())
    }));

    let client = reqwest::Client::new();
    let err = auth
        .apply(client.get("https://example.com/api"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("oauth2_refresh_token"));
}

#[tokio::test]
async fn test_force_refresh_refetches() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "token",
            "expires_in": 3600
        })))
        .expect(2)
        .mount(&mock_server)
        .await;

    let auth = Authenticator::new(AuthConfig::OAuth2(oauth(format!(
        "{}/oauth/token",
        mock_server.uri()
    ))));

    authorization_header(&auth).await;
    auth.force_refresh().await;
    authorization_header(&auth).await;
}

#[tokio::test]
async fn test_oauth2_error_handling() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": "invalid_client",
            "error_description": "Client authentication failed"
        })))
        .mount(&mock_server)
        .await;

    let auth = Authenticator::new(AuthConfig::OAuth2(oauth(format!(
        "{}/oauth/token",
        mock_server.uri()
    ))));

    let client = reqwest::Client::new();
    let err = auth
        .apply(client.get("https://example.com/api"))
        .await
        .unwrap_err();

    assert!(matches!(err, crate::error::Error::OAuth2 { .. }));
    assert!(err.to_string().contains("401"));
}
