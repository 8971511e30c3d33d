//! Contract tests for `CacheClient::load` against the cache lookup endpoint.
//!
//! | Method | Path | Test |
//! |--------|------|------|
//! | GET    | `/_apis/artifactcache/cache?keys=..&version=..` | `load_*` |

use artcache_client::{cache_version, CacheClient, CacheConfig, CacheError, CancellationToken};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LOOKUP_PATH: &str = "/_apis/artifactcache/cache";

fn test_token() -> String {
    let claims = serde_json::json!({
        "ac": r#"[{"Scope":"refs/heads/main","Permission":3}]"#,
    });
    format!(
        "{}.{}.sig",
        URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#),
        URL_SAFE_NO_PAD.encode(claims.to_string())
    )
}

/// Build a CacheClient pointed at a wiremock server.
fn test_client(mock_server: &MockServer) -> CacheClient {
    let config = CacheConfig::new(&mock_server.uri(), test_token()).unwrap();
    CacheClient::new(config).unwrap()
}

#[tokio::test]
async fn load_sends_keys_version_and_auth_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(LOOKUP_PATH))
        .and(query_param("keys", "linux-deps-abc,linux-deps-"))
        .and(query_param("version", cache_version("linux-deps-abc")))
        .and(header("authorization", format!("Bearer {}", test_token()).as_str()))
        .and(header("accept", "application/json;api-version=6.0-preview.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "cacheKey": "linux-deps-",
            "scope": "refs/heads/main",
            "archiveLocation": "https://blob.example.com/archive?sig=abc",
            "creationTime": "2026-01-15T12:00:00Z"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let entry = client
        .load(&["linux-deps-abc", "linux-deps-"], &CancellationToken::new())
        .await
        .unwrap()
        .expect("entry should be found");

    assert_eq!(entry.key, "linux-deps-");
    assert_eq!(entry.scope, "refs/heads/main");
    assert_eq!(entry.archive_url, "https://blob.example.com/archive?sig=abc");
}

#[tokio::test]
async fn load_empty_body_is_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(LOOKUP_PATH))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let entry = client
        .load(&["missing"], &CancellationToken::new())
        .await
        .unwrap();
    assert!(entry.is_none());
}

#[tokio::test]
async fn load_entry_with_empty_key_is_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(LOOKUP_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "cacheKey": "",
            "scope": "refs/heads/main",
            "archiveLocation": ""
        })))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let entry = client
        .load(&["missing"], &CancellationToken::new())
        .await
        .unwrap();
    assert!(entry.is_none());
}

#[tokio::test]
async fn load_hit_with_null_scope_is_an_entry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(LOOKUP_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "cacheKey": "linux-deps-",
            "scope": null,
            "archiveLocation": "https://blob.example.com/archive?sig=abc"
        })))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let entry = client
        .load(&["linux-deps-"], &CancellationToken::new())
        .await
        .unwrap()
        .expect("entry should be found");
    assert_eq!(entry.key, "linux-deps-");
    assert!(entry.scope.is_empty());
}

#[tokio::test]
async fn load_uses_the_same_version_for_every_key() {
    let mock_server = MockServer::start().await;
    let version = cache_version("");

    Mock::given(method("GET"))
        .and(path(LOOKUP_PATH))
        .and(query_param("version", version.as_str()))
        .respond_with(ResponseTemplate::new(204))
        .expect(2)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let cancel = CancellationToken::new();
    client.load(&["alpha"], &cancel).await.unwrap();
    client.load(&["beta-completely-different"], &cancel).await.unwrap();
}

#[tokio::test]
async fn load_without_keys_is_rejected_locally() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let err = client.load(&[], &CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, CacheError::NoKeys));
}

#[tokio::test]
async fn load_structured_error_surfaces_remote_message() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(LOOKUP_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "message": "Token does not grant read access.",
            "typeName": "Microsoft.Azure.DevOps.AccessDeniedException",
            "typeKey": "AccessDeniedException",
            "errorCode": 0
        })))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let err = client
        .load(&["k"], &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Token does not grant read access.");
    let remote = err.remote().expect("structured remote error");
    assert_eq!(remote.status, 403);
    assert_eq!(remote.type_key, "AccessDeniedException");
}

#[tokio::test]
async fn load_error_with_null_fields_keeps_remote_message() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(LOOKUP_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "message": "Key list too long.",
            "typeName": null,
            "typeKey": null,
            "errorCode": null
        })))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let err = client
        .load(&["k"], &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Key list too long.");
    assert_eq!(err.remote().expect("structured remote error").status, 400);
}

#[tokio::test]
async fn load_unstructured_error_reports_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(LOOKUP_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let err = client
        .load(&["k"], &CancellationToken::new())
        .await
        .unwrap_err();

    match &err {
        CacheError::Protocol { status, body, .. } => {
            assert_eq!(*status, 503);
            assert_eq!(body, "upstream unavailable");
        }
        other => panic!("expected Protocol, got: {other:?}"),
    }
    assert!(err.to_string().contains("503"));
}

#[tokio::test]
async fn load_error_body_is_truncated_at_cap() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(LOOKUP_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("x".repeat(100 * 1024)))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let err = client
        .load(&["k"], &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        CacheError::Protocol { body, .. } => {
            assert_eq!(body.len(), artcache_client::response::MAX_CONTROL_BODY);
        }
        other => panic!("expected Protocol, got: {other:?}"),
    }
}

#[tokio::test]
async fn load_with_cancelled_token_returns_cancelled() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = client.load(&["k"], &cancel).await.unwrap_err();
    assert!(matches!(err, CacheError::Cancelled));
}

#[tokio::test]
async fn load_transport_failure_is_http_error() {
    let config = CacheConfig::new("http://127.0.0.1:1/", test_token()).unwrap();
    let client = CacheClient::new(config).unwrap();

    let err = client
        .load(&["k"], &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, CacheError::Http { .. }), "got: {err:?}");
}
