use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use watchbot_core::client::{GeminiClient, TextGenerator};
use watchbot_core::config::WatchbotConfig;
use watchbot_server::coordinator::Coordinator;
use watchbot_server::http_server::{router, AppState};
use watchbot_server::preview_client::{FirecrawlClient, PreviewFetcher};
use watchbot_server::search_client::{SearchApiProvider, WebSearchClient};

const SPECS_URL: &str = "https://www.apple.com/apple-watch-series-10/specs/";
const SUPPORT_URL: &str = "https://support.apple.com/en-us/108067";
const FORUM_URL: &str = "https://forums.example/series-10-battery";

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

#[derive(Clone)]
struct Fixture {
    /// Status returned for answer-generation calls (query rewrites always succeed).
    answer_status: StatusCode,
}

fn gemini_text(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": { "parts": [{ "text": text }], "role": "model" },
            "finishReason": "STOP"
        }]
    })
}

async fn generate(State(fixture): State<Fixture>, Json(body): Json<Value>) -> impl IntoResponse {
    let prompt = body["contents"][0]["parts"][0]["text"]
        .as_str()
        .unwrap_or_default()
        .to_string();

    if body["generationConfig"]["maxOutputTokens"] == 100 {
        return (StatusCode::OK, Json(gemini_text("apple watch series 10 battery life"))).into_response();
    }

    if fixture.answer_status != StatusCode::OK {
        return (
            fixture.answer_status,
            r#"{"error":{"code":429,"message":"Resource has been exhausted (e.g. check quota).","status":"RESOURCE_EXHAUSTED"}}"#,
        )
            .into_response();
    }

    assert!(prompt.contains("=== WEB SEARCH RESULTS ==="));
    assert!(prompt.ends_with("User: How's the battery on Series 10?\n\nYou:"));

    let reply = json!({
        "message": "Series 10 gets up to 18 hours, or 36 in Low Power Mode.",
        "citations": [
            { "title": "Tech Specs", "url": SPECS_URL, "description": "18-hour battery" },
            { "title": "Battery tips", "url": SUPPORT_URL, "description": "Maximize battery" },
            { "title": "Invented", "url": "https://invented.example", "description": "not offered" }
        ]
    });
    let text = format!("```json\n{}\n```", serde_json::to_string_pretty(&reply).unwrap());
    (StatusCode::OK, Json(gemini_text(&text))).into_response()
}

async fn search(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    assert_eq!(params["q"], "apple watch series 10 battery life");
    Json(json!({
        "ai_overview": { "text_blocks": [
            { "type": "paragraph", "answer": "Up to 18 hours of battery life." },
            { "type": "list", "items": [{ "type": "paragraph", "answer": "Up to 36 hours in Low Power Mode." }] }
        ]},
        "organic_results": [
            { "position": 1, "title": "Tech Specs", "link": SPECS_URL, "snippet": "18-hour battery" },
            { "position": 2, "title": "Battery tips", "link": SUPPORT_URL, "snippet": "Maximize battery", "date": "Sep 9, 2026" },
            { "position": 3, "title": "Forum", "link": FORUM_URL, "snippet": "User reports" }
        ]
    }))
}

async fn scrape(Json(body): Json<Value>) -> impl IntoResponse {
    let url = body["url"].as_str().unwrap_or_default();
    if url == SUPPORT_URL {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "success": false })));
    }
    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "data": { "metadata": { "ogImage": format!("{url}og.png") } }
        })),
    )
}

async fn start(answer_status: StatusCode) -> SocketAddr {
    let providers = Router::new()
        .route("/v1beta/models/:model", post(generate))
        .route("/api/v1/search", get(search))
        .route("/v2/scrape", post(scrape))
        .with_state(Fixture { answer_status });
    let provider_addr = serve(providers).await;

    let lookup = move |key: &str| match key {
        "GEMINI_API_KEY" => Some("g-key".to_string()),
        "SEARCH_API_KEY" => Some("s-key".to_string()),
        "FIRECRAWL_API_KEY" => Some("f-key".to_string()),
        "SEARCH_RESULTS_COUNT" => Some("5".to_string()),
        _ => None,
    };
    let mut config = WatchbotConfig::from_lookup(lookup);
    config.gemini.base_url = Some(format!("http://{provider_addr}/v1beta"));
    config.search.endpoint = Some(format!("http://{provider_addr}/api/v1/search"));
    config.preview.endpoint = Some(format!("http://{provider_addr}/v2/scrape"));

    let gemini = GeminiClient::new(
        &config.gemini,
        config.server.http_client(config.gemini.timeout()).unwrap(),
    )
    .unwrap();
    let search = SearchApiProvider::new(
        &config.search,
        config.server.http_client(config.search.timeout()).unwrap(),
    )
    .unwrap();
    let firecrawl = FirecrawlClient::new(
        &config.preview,
        config.server.http_client(config.preview.timeout()).unwrap(),
    )
    .unwrap();

    let generator: Arc<dyn TextGenerator> = Arc::new(gemini);
    let coordinator = Coordinator::new(
        Some(generator),
        WebSearchClient::new(Arc::new(search), config.search.results_count()),
        PreviewFetcher::new(Arc::new(firecrawl)),
    );
    serve(router(AppState::new(coordinator))).await
}

#[tokio::test]
async fn chat_returns_grounded_citations_with_previews() {
    let addr = start(StatusCode::OK).await;

    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/chat"))
        .json(&json!({ "message": "How's the battery on Series 10?", "conversationHistory": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body["response"],
        "Series 10 gets up to 18 hours, or 36 in Low Power Mode."
    );

    let citations = body["citations"].as_array().unwrap();
    let urls: Vec<&str> = citations.iter().map(|c| c["url"].as_str().unwrap()).collect();
    assert_eq!(urls, vec![SPECS_URL, SUPPORT_URL]);

    assert_eq!(citations[0]["imageUrl"], format!("{SPECS_URL}og.png"));
    assert!(citations[1].get("imageUrl").is_none());
}

#[tokio::test]
async fn upstream_quota_error_maps_to_429() {
    let addr = start(StatusCode::TOO_MANY_REQUESTS).await;

    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/api/chat"))
        .json(&json!({ "message": "How's the battery on Series 10?" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::TOO_MANY_REQUESTS);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "API quota exceeded");
}

#[tokio::test]
async fn invalid_body_is_rejected() {
    let addr = start(StatusCode::OK).await;

    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/chat"))
        .json(&json!({ "conversationHistory": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
}
