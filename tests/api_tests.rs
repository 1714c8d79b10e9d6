//! Integration tests for the HTTP endpoints.
//!
//! Every upstream (MusixMatch, lyrics.ovh, DeepSeek) is replaced by a stub
//! axum server on an ephemeral local port, so the real HTTP clients run end
//! to end.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderMap, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use lyriclens::{AppState, api::routes::create_router, config::Config};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower::util::ServiceExt; // for `oneshot` method

#[derive(Clone, Default)]
struct Upstream {
    llm_calls: Arc<AtomicUsize>,
}

async fn matcher_lyrics(Query(params): Query<HashMap<String, String>>) -> Response {
    if params.get("apikey").map(String::as_str) != Some("test-key") {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let body = match params.get("q_track").map(String::as_str) {
        Some("Imagine") => json!({
            "lyrics": "Imagine there's no heaven\nIt's easy if you try",
            "copyright": "Lyrics (c) Lenono Music"
        }),
        Some("Peace Song") => json!({
            "message": {
                "header": {"status_code": 200},
                "body": {"lyrics": {
                    "lyrics_body": "From Tokyo to Lima we sing",
                    "lyrics_copyright": "Lyrics powered by www.musixmatch.com."
                }}
            }
        }),
        Some("Missing") => json!({"message": {"header": {"status_code": 404}, "body": []}}),
        _ => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    };

    Json(body).into_response()
}

async fn track_search(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    assert_eq!(params.get("f_has_lyrics").map(String::as_str), Some("1"));
    Json(json!({
        "message": {
            "header": {"status_code": 200, "available": 1234},
            "body": {"track_list": [
                {"track": {
                    "track_id": 1,
                    "track_name": "Imagine",
                    "artist_name": "John Lennon",
                    "album_name": "Imagine"
                }},
                {"track": {
                    "track_id": 2,
                    "track_name": "Imagine",
                    "artist_name": "A Perfect Circle",
                    "album_name": "eMOTIVe"
                }}
            ]}
        }
    }))
}

async fn ovh_lyrics(Path((artist, title)): Path<(String, String)>) -> Response {
    if artist == "Daft Punk" && title == "One More Time" {
        Json(json!({"lyrics": "One more time, we're gonna celebrate"})).into_response()
    } else {
        (StatusCode::NOT_FOUND, Json(json!({"error": "No lyrics found"}))).into_response()
    }
}

async fn ovh_suggest(Path(query): Path<String>) -> Json<Value> {
    Json(json!({
        "data": [{
            "id": 3135556,
            "title": query,
            "artist": {"name": "Daft Punk"},
            "album": {"title": "Discovery"}
        }],
        "total": 1
    }))
}

async fn chat_completions(
    State(upstream): State<Upstream>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("Bearer test-deepseek") {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    upstream.llm_calls.fetch_add(1, Ordering::SeqCst);

    let prompt = body["messages"][1]["content"].as_str().unwrap_or_default();
    let content = if prompt.contains("Tokyo") {
        json!({"summary": "A song about travelling.", "countries_mentioned": ["Japan", "Peru"]})
    } else {
        json!({"summary": "A hopeful song about peace.", "countries_mentioned": null})
    };

    Json(json!({
        "choices": [{"message": {"role": "assistant", "content": content.to_string()}}]
    }))
    .into_response()
}

async fn spawn_upstream(upstream: Upstream) -> String {
    let router = Router::new()
        .route("/ws/1.1/matcher.lyrics.get", get(matcher_lyrics))
        .route("/ws/1.1/track.search", get(track_search))
        .route("/v1/:artist/:title", get(ovh_lyrics))
        .route("/suggest/:query", get(ovh_suggest))
        .route("/chat/completions", post(chat_completions))
        .with_state(upstream);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://{}", addr)
}

struct TestApp {
    router: Router,
    llm_calls: Arc<AtomicUsize>,
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Should read body");
        let body = serde_json::from_slice(&bytes).expect("Should parse JSON");
        (status, body)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    fn llm_calls(&self) -> usize {
        self.llm_calls.load(Ordering::SeqCst)
    }
}

/// Test helper: app wired to the stub upstream, with `overrides` applied on
/// top of the default test environment.
async fn setup_app(overrides: &[(&str, &str)]) -> TestApp {
    let upstream = Upstream::default();
    let llm_calls = upstream.llm_calls.clone();
    let base = spawn_upstream(upstream).await;

    let mut vars: HashMap<String, String> = HashMap::from([
        ("MUSIXMATCH_BASE_URL".to_string(), format!("{}/ws/1.1", base)),
        ("MUSIXMATCH_API_KEY".to_string(), "test-key".to_string()),
        ("LYRICS_OVH_BASE_URL".to_string(), base.clone()),
        ("DEEPSEEK_API_URL".to_string(), format!("{}/chat/completions", base)),
        ("DEEPSEEK_API_KEY".to_string(), "test-deepseek".to_string()),
        ("CACHE_BACKEND".to_string(), "memory".to_string()),
        ("HTTP_TIMEOUT_SECS".to_string(), "5".to_string()),
    ]);
    for (name, value) in overrides {
        vars.insert(name.to_string(), value.to_string());
    }

    let config = Config::from_lookup(|name| vars.get(name).cloned()).expect("valid test config");
    let state = AppState::from_config(config).await.expect("app state");

    TestApp {
        router: create_router(state),
        llm_calls,
    }
}

// =============================================================================
// Lyrics
// =============================================================================

#[tokio::test]
async fn test_lyrics_returns_provider_fields_unchanged() {
    let app = setup_app(&[]).await;

    let (status, body) = app
        .get("/song/lyrics?track_name=Imagine&artist_name=John+Lennon")
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "lyrics": "Imagine there's no heaven\nIt's easy if you try",
            "copyright": "Lyrics (c) Lenono Music"
        })
    );
}

#[tokio::test]
async fn test_lyrics_reads_musixmatch_envelope() {
    let app = setup_app(&[]).await;

    let (status, body) = app.get("/song/lyrics?track_name=Peace%20Song").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["lyrics"], "From Tokyo to Lima we sing");
    assert_eq!(body["copyright"], "Lyrics powered by www.musixmatch.com.");
}

#[tokio::test]
async fn test_lyrics_requires_track_name() {
    let app = setup_app(&[]).await;

    let (status, body) = app.get("/song/lyrics?artist_name=John+Lennon").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "track_name parameter is required");
}

#[tokio::test]
async fn test_malformed_query_string_gets_json_error() {
    let app = setup_app(&[]).await;

    let (status, body) = app.get("/song/lyrics?track_name=a&track_name=b").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("track_name"));
}

#[tokio::test]
async fn test_lyrics_provider_not_found_maps_to_404() {
    let app = setup_app(&[]).await;

    let (status, body) = app.get("/song/lyrics?track_name=Missing&artist_name=Nobody").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("404"));
}

#[tokio::test]
async fn test_lyrics_provider_error_status_maps_to_404() {
    let app = setup_app(&[]).await;

    let (status, body) = app.get("/song/lyrics?track_name=Explodes&artist_name=Nobody").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("HTTP 500"));
}

#[tokio::test]
async fn test_lyrics_unreachable_provider_maps_to_404() {
    let app = setup_app(&[("MUSIXMATCH_BASE_URL", "http://127.0.0.1:1/ws/1.1")]).await;

    let (status, body) = app.get("/song/lyrics?track_name=Imagine&artist_name=John+Lennon").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
    assert!(!body["error"].as_str().unwrap().contains("test-key"));
}

#[tokio::test]
async fn test_lyrics_from_lyrics_ovh() {
    let app = setup_app(&[("LYRICS_PROVIDER", "lyricsovh")]).await;

    let (status, body) = app
        .get("/song/lyrics?track_name=One+More+Time&artist_name=Daft+Punk")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["lyrics"], "One more time, we're gonna celebrate");
    assert_eq!(body["copyright"], "");

    let (status, _) = app
        .get("/song/lyrics?track_name=Around+the+World&artist_name=Daft+Punk")
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Search and suggestions
// =============================================================================

#[tokio::test]
async fn test_search_reshapes_tracks_and_clamps_page_size() {
    let app = setup_app(&[]).await;

    let (status, body) = app.get("/song/search?query=imagine&page=0&page_size=500").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["songs"].as_array().unwrap().len(), 2);
    assert_eq!(
        body["songs"][0],
        json!({
            "track_id": 1,
            "track_name": "Imagine",
            "artist_name": "John Lennon",
            "album_name": "Imagine"
        })
    );
    assert_eq!(
        body["pagination"],
        json!({"current_page": 1, "page_size": 50, "total_results": 1234})
    );
    assert_eq!(body["status_code"], 200);
}

#[tokio::test]
async fn test_search_validates_parameters() {
    let app = setup_app(&[]).await;

    let (status, body) = app.get("/song/search").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "query parameter is required");

    let (status, body) = app.get("/song/search?query=imagine&page=first").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "page and page_size must be valid integers");
}

#[tokio::test]
async fn test_suggest_uses_lyrics_ovh() {
    let app = setup_app(&[]).await;

    let (status, body) = app.get("/song/suggest?query=Digital+Love").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["songs"][0]["track_name"], "Digital Love");
    assert_eq!(body["songs"][0]["album_name"], "Discovery");
}

// =============================================================================
// Analysis
// =============================================================================

#[tokio::test]
async fn test_analyze_with_supplied_lyrics_then_cache_hit() {
    let app = setup_app(&[]).await;
    let uri = "/song/analyze?track_name=Imagine&artist_name=John+Lennon&lyrics=Imagine+all+the+people";

    let (status, body) = app.get(uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["track_name"], "Imagine");
    assert_eq!(body["artist_name"], "John Lennon");
    assert_eq!(body["summary"], "A hopeful song about peace.");
    assert_eq!(body["countries_mentioned"], json!([]));
    assert_eq!(body["countries_message"], "No countries mentioned in the lyrics");

    let (status, cached) = app
        .get("/song/analyze?track_name=imagine&artist_name=john%20lennon")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cached["summary"], body["summary"]);
    assert_eq!(app.llm_calls(), 1);
}

#[tokio::test]
async fn test_analyze_fetches_lyrics_when_not_supplied() {
    let app = setup_app(&[]).await;

    let (status, body) = app
        .get("/song/analyze?track_name=Peace+Song&artist_name=The+Travellers")
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["countries_mentioned"], json!(["Japan", "Peru"]));
    assert_eq!(body["countries_message"], "Countries mentioned: Japan, Peru");
}

#[tokio::test]
async fn test_analyze_post_accepts_json_body() {
    let app = setup_app(&[]).await;

    let request = Request::builder()
        .method("POST")
        .uri("/song/analyze?track_name=ignored")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "track_name": "Postcard",
                "artist_name": "Someone",
                "lyrics": "Greetings from Tokyo"
            })
            .to_string(),
        ))
        .unwrap();

    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["track_name"], "Postcard");
    assert_eq!(body["countries_mentioned"], json!(["Japan", "Peru"]));
}

#[tokio::test]
async fn test_analyze_post_rejects_malformed_json_body() {
    let app = setup_app(&[]).await;

    let request = Request::builder()
        .method("POST")
        .uri("/song/analyze?track_name=Imagine&artist_name=John+Lennon")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"track_name": "Postcard", "#))
        .unwrap();

    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid JSON body"));
    assert_eq!(app.llm_calls(), 0);
}

#[tokio::test]
async fn test_analyze_post_without_body_uses_query() {
    let app = setup_app(&[]).await;

    let request = Request::builder()
        .method("POST")
        .uri("/song/analyze?track_name=Imagine&artist_name=John+Lennon&lyrics=words")
        .body(Body::empty())
        .unwrap();

    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["track_name"], "Imagine");
}

#[tokio::test]
async fn test_analyze_requires_track_and_artist() {
    let app = setup_app(&[]).await;

    let (status, body) = app.get("/song/analyze?track_name=Imagine").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "artist_name parameter is required");

    let (status, body) = app.get("/song/analyze?artist_name=John+Lennon").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "track_name parameter is required");

    assert_eq!(app.llm_calls(), 0);
}

#[tokio::test]
async fn test_analyze_without_lyrics_available_is_404() {
    let app = setup_app(&[]).await;

    let (status, body) = app
        .get("/song/analyze?track_name=Missing&artist_name=Nobody")
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
    assert_eq!(app.llm_calls(), 0);
}

#[tokio::test]
async fn test_analyze_without_llm_key_is_500() {
    let app = setup_app(&[("DEEPSEEK_API_KEY", "")]).await;

    let (status, body) = app
        .get("/song/analyze?track_name=Imagine&artist_name=John+Lennon&lyrics=words")
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("DEEPSEEK_API_KEY"));
}

#[tokio::test]
async fn test_analyze_works_with_cache_disabled() {
    let app = setup_app(&[("CACHE_BACKEND", "none")]).await;
    let uri = "/song/analyze?track_name=Imagine&artist_name=John+Lennon&lyrics=words";

    assert_eq!(app.get(uri).await.0, StatusCode::OK);
    assert_eq!(app.get(uri).await.0, StatusCode::OK);
    assert_eq!(app.llm_calls(), 2);
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_reports_cache_state() {
    let app = setup_app(&[]).await;

    let (status, body) = app.get("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["lyrics_provider"], "musixmatch");
    assert_eq!(body["cache"]["available"], true);
    assert!(body["cache"]["checked_at"].is_string());
}
