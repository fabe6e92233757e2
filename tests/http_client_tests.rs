//! Integration tests for the HTTP command layer.
//!
//! These tests run the resource layer end to end through [`HttpClient`]
//! against a local `wiremock` server.

use std::time::Duration;

use restmap::clients::{HttpClient, HttpMethod, HttpRequest, Transport};
use restmap::rest::{field, FieldKind, ResourceError, ResourceRegistry, ResourceType};
use restmap::{BasicAuth, ClientConfig, HttpError, RestClient, RootUrl};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> ClientConfig {
    ClientConfig::builder()
        .root_url(RootUrl::new(server.uri()).unwrap())
        .client_agent("jukebox/1.0")
        .auth(BasicAuth::new("user", "secret").unwrap())
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

fn registry() -> ResourceRegistry {
    let mut registry = ResourceRegistry::new();
    registry
        .register(
            ResourceType::builder("playlist", "/v1/playlists/{id}")
                .field("name", FieldKind::String)
                .field("tags", FieldKind::List)
                .field("created_at", FieldKind::DateTime)
                .relation("songs", "song")
                .build()
                .unwrap(),
        )
        .unwrap();
    registry
        .register(
            ResourceType::builder("song", "/v1/songs/{id}")
                .nested_under("playlist")
                .field("name", FieldKind::String)
                .field("length", FieldKind::Integer)
                .build()
                .unwrap(),
        )
        .unwrap();
    registry
}

// ============================================================================
// Queries
// ============================================================================

#[tokio::test]
async fn test_query_end_to_end() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/playlists"))
        .and(query_param("tags.contains", "nuti"))
        .and(query_param("sort", "-created_at"))
        .and(header("Authorization", "Basic dXNlcjpzZWNyZXQ="))
        .and(header("User-Agent", "jukebox/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {"_type": "playlist", "uri": "/v1/playlists/p1", "id": "p1", "created_at": "2024-05-01T10:00:00Z"},
                {"_type": "playlist", "uri": "/v1/playlists/p2", "id": "p2", "created_at": "2024-04-01T10:00:00Z"}
            ],
            "next_cursor": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = RestClient::new(&config(&server), registry()).unwrap();
    let playlists = client
        .query("playlist")
        .unwrap()
        .filter(field("tags").contains("nuti"))
        .unwrap()
        .sort(field("created_at").desc())
        .unwrap()
        .all()
        .await
        .unwrap();

    assert_eq!(playlists.len(), 2);
    assert_eq!(playlists[0].uri(), Some("/v1/playlists/p1"));
}

#[tokio::test]
async fn test_paging_follows_cursor() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/playlists"))
        .and(query_param("cursor", "c2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"_type": "playlist", "id": "p2"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/playlists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"_type": "playlist", "id": "p1"}],
            "next_cursor": "c2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = RestClient::new(&config(&server), registry()).unwrap();
    let ids: Vec<Option<String>> = client
        .query("playlist")
        .unwrap()
        .all()
        .await
        .unwrap()
        .iter()
        .map(|p| p.id())
        .collect();

    assert_eq!(ids, vec![Some("p1".to_string()), Some("p2".to_string())]);
}

// ============================================================================
// Persistence
// ============================================================================

#[tokio::test]
async fn test_create_update_delete_end_to_end() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/playlists/p1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_type": "playlist", "uri": "/v1/playlists/p1", "id": "p1", "name": "Road trip"
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/playlists/p1/songs"))
        .and(body_json(json!({"name": "Flutes", "length": 1234})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "_type": "song", "id": "s9", "name": "Flutes", "length": 1234
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/v1/playlists/p1/songs/s9"))
        .and(body_json(json!({"length": 1235})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "s9", "length": 1235})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/v1/playlists/p1/songs/s9"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = RestClient::new(&config(&server), registry()).unwrap();
    let playlist = client.find("playlist", "p1", None).await.unwrap();

    let mut song = client.new_resource("song").unwrap().with_parent(&playlist).unwrap();
    song.set("name", "Flutes");
    song.set("length", 1234);
    song.save(&client).await.unwrap();
    assert_eq!(song.uri(), Some("/v1/playlists/p1/songs/s9"));
    assert!(!song.is_dirty());

    song.set("length", 1235);
    song.save(&client).await.unwrap();

    song.delete(&client).await.unwrap();
}

#[tokio::test]
async fn test_validation_errors_are_parsed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/playlists"))
        .respond_with(
            ResponseTemplate::new(422)
                .insert_header("X-Request-Id", "req-42")
                .set_body_json(json!({"errors": {"name": ["can't be blank"]}})),
        )
        .mount(&server)
        .await;

    let client = RestClient::new(&config(&server), registry()).unwrap();
    let mut playlist = client.new_resource("playlist").unwrap();
    playlist.set("name", "");

    let error = playlist.save(&client).await.unwrap_err();
    assert_eq!(error.request_id(), Some("req-42"));
    assert!(matches!(error, ResourceError::ValidationFailed { .. }));
    assert!(playlist.is_dirty());
}

// ============================================================================
// Retries
// ============================================================================

#[tokio::test]
async fn test_reads_are_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/playlists/p1"))
        .respond_with(ResponseTemplate::new(503).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/playlists/p1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_type": "playlist", "id": "p1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig::builder()
        .root_url(RootUrl::new(server.uri()).unwrap())
        .max_tries(2)
        .build()
        .unwrap();
    let client = RestClient::new(&config, registry()).unwrap();

    let playlist = client.find("playlist", "p1", None).await.unwrap();
    assert_eq!(playlist.uri(), Some("/v1/playlists/p1"));
}

#[tokio::test]
async fn test_retry_exhaustion() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/playlists"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("Retry-After", "0")
                .set_body_json(json!({"errors": "slow down"})),
        )
        .expect(3)
        .mount(&server)
        .await;

    let http = HttpClient::new(&config(&server)).unwrap();
    let request = HttpRequest::builder(HttpMethod::Get, "/v1/playlists")
        .tries(3)
        .build()
        .unwrap();

    match http.request(request).await {
        Err(HttpError::MaxRetries(e)) => {
            assert_eq!(e.code, 429);
            assert_eq!(e.tries, 3);
        }
        other => panic!("Expected MaxRetries, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_writes_are_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/playlists"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({"error": "busy"})))
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig::builder()
        .root_url(RootUrl::new(server.uri()).unwrap())
        .max_tries(5)
        .build()
        .unwrap();
    let client = RestClient::new(&config, registry()).unwrap();
    let mut playlist = client.new_resource("playlist").unwrap();
    playlist.set("name", "Morning");

    let error = playlist.save(&client).await.unwrap_err();
    assert!(error.is_transport());
}

#[tokio::test]
async fn test_non_json_error_page_is_kept_raw() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/playlists"))
        .respond_with(
            ResponseTemplate::new(502)
                .insert_header("Content-Type", "text/html")
                .set_body_string("<html>Bad Gateway</html>"),
        )
        .mount(&server)
        .await;

    let http = HttpClient::new(&config(&server)).unwrap();
    let request = HttpRequest::builder(HttpMethod::Get, "/v1/playlists").build().unwrap();
    let response = http.request(request).await.unwrap();

    assert_eq!(response.code, 502);
    assert_eq!(response.body["raw_body"], "<html>Bad Gateway</html>");
}

// ============================================================================
// Hooks
// ============================================================================

#[tokio::test]
async fn test_request_hooks_wrap_every_attempt() {
    use std::sync::{Arc, Mutex};

    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/playlists/p1"))
        .and(header("X-Trace", "GET /v1/playlists/p1"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({"error": "busy"})))
        .expect(1)
        .mount(&server)
        .await;

    let root = server.uri();
    let statuses = Arc::new(Mutex::new(Vec::new()));
    let observed = Arc::clone(&statuses);
    let config = ClientConfig::builder()
        .root_url(RootUrl::new(server.uri()).unwrap())
        .before_request(move |method, url, headers| {
            let path = url.strip_prefix(root.as_str()).unwrap_or(url);
            headers.insert("X-Trace".to_string(), format!("{method} {path}"));
        })
        .after_request(move |response| {
            observed.lock().unwrap().push(response.code);
        })
        .build()
        .unwrap();
    let client = RestClient::new(&config, registry()).unwrap();

    let error = client.find("playlist", "p1", None).await.unwrap_err();
    assert!(error.is_transport());
    assert_eq!(*statuses.lock().unwrap(), vec![503]);
}
