use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use chatgate::config::{AppConfig, ServerConfig};
use chatgate::routing::dispatch::dispatch_request;
use chatgate::state::AppState;
use chatgate::transport::HttpTransport;
use serde_json::{json, Value};

const ANTHROPIC_SSE: &str = concat!(
    "event: message_start\n",
    "data: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_mock\",\"usage\":{\"input_tokens\":7,\"output_tokens\":1}}}\n\n",
    "event: content_block_delta\n",
    "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hel\"}}\n\n",
    "event: content_block_delta\n",
    "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"lo\"}}\n\n",
    "event: message_delta\n",
    "data: {\"type\":\"message_delta\",\"delta\":{\"stop_reason\":\"end_turn\"},\"usage\":{\"output_tokens\":2}}\n\n",
    "event: message_stop\n",
    "data: {\"type\":\"message_stop\"}\n\n",
);

async fn openai_upstream(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) != Some("Bearer sk-oai") {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}})),
        )
            .into_response();
    }
    assert_eq!(body["model"], "gpt-4o-mini");
    Json(json!({
        "id": "chatcmpl_mock",
        "object": "chat.completion",
        "created": 1_727_000_000_u64,
        "model": "gpt-4o-mini-2024-07-18",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": "pong"},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 5, "completion_tokens": 2, "total_tokens": 7}
    }))
    .into_response()
}

async fn anthropic_upstream(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    assert_eq!(headers["x-api-key"], "sk-ant");
    assert_eq!(headers["anthropic-version"], "2023-06-01");
    assert_eq!(body["model"], "claude-3-haiku");
    assert_eq!(body["stream"], true);
    ([(header::CONTENT_TYPE, "text/event-stream")], ANTHROPIC_SSE).into_response()
}

async fn gemini_upstream(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    assert_eq!(headers["x-goog-api-key"], "g-key");
    assert_eq!(body["systemInstruction"]["parts"][0]["text"], "Be brief");
    Json(json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": "Bonjour"}]},
            "finishReason": "STOP"
        }],
        "usageMetadata": {"promptTokenCount": 4, "candidatesTokenCount": 1, "totalTokenCount": 5}
    }))
    .into_response()
}

async fn spawn_upstream() -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let app = Router::new()
        .route("/v1/chat/completions", post(openai_upstream))
        .route("/v1/messages", post(anthropic_upstream))
        .route(
            "/v1beta/models/gemini-1.5-flash:generateContent",
            post(gemini_upstream),
        );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock upstream");
    let addr = listener.local_addr().expect("local addr");
    let server = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (addr, server)
}

fn build_state(addr: SocketAddr, openai_key: &str) -> Arc<AppState> {
    let mut config = AppConfig::default();
    config.providers.openai.api_key = Some(openai_key.to_string());
    config.providers.openai.base_url = Some(format!("http://{addr}/v1"));
    config.providers.anthropic.api_key = Some("sk-ant".to_string());
    config.providers.anthropic.base_url = Some(format!("http://{addr}/v1"));
    config.providers.google.api_key = Some("g-key".to_string());
    config.providers.google.base_url = Some(format!("http://{addr}/v1beta"));
    let transport = HttpTransport::new(&ServerConfig::default()).expect("build transport");
    Arc::new(AppState::new(config, transport))
}

fn chat_request(body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/v1/chat/completions")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).expect("serialize request")))
        .expect("build request")
}

async fn read_json(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&body).expect("json payload")
}

#[tokio::test]
async fn test_openai_non_stream_completion() {
    let (addr, server) = spawn_upstream().await;
    let state = build_state(addr, "sk-oai");

    let request = chat_request(&json!({
        "model": "gpt-4o-mini",
        "messages": [{"role": "user", "content": "ping"}]
    }));
    let response = dispatch_request(state, Arc::<str>::from(""), request)
        .await
        .expect("dispatch");
    assert_eq!(response.status(), StatusCode::OK);

    let payload = read_json(response).await;
    assert_eq!(payload["object"], "chat.completion");
    assert_eq!(payload["choices"][0]["message"]["role"], "assistant");
    assert_eq!(payload["choices"][0]["message"]["content"], "pong");
    assert_eq!(payload["choices"][0]["finish_reason"], "stop");
    assert_eq!(payload["usage"]["total_tokens"], 7);

    server.abort();
}

#[tokio::test]
async fn test_anthropic_stream_is_reframed_as_openai_sse() {
    let (addr, server) = spawn_upstream().await;
    let state = build_state(addr, "sk-oai");

    let request = chat_request(&json!({
        "model": "anthropic/claude-3-haiku",
        "messages": [{"role": "user", "content": "Say hello"}],
        "stream": true
    }));
    let response = dispatch_request(state, Arc::<str>::from(""), request)
        .await
        .expect("dispatch");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/event-stream");
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read stream body");
    let text = String::from_utf8(body.to_vec()).expect("utf8 body");
    let frames: Vec<&str> = text.split_terminator("\n\n").collect();
    assert_eq!(frames.last().copied(), Some("data: [DONE]"));

    let chunks: Vec<Value> = frames[..frames.len() - 1]
        .iter()
        .map(|frame| {
            serde_json::from_str(frame.strip_prefix("data: ").expect("data frame"))
                .expect("chunk json")
        })
        .collect();
    assert_eq!(chunks.len(), 3);
    let content: String = chunks
        .iter()
        .filter_map(|chunk| chunk["choices"][0]["delta"]["content"].as_str())
        .collect();
    assert_eq!(content, "Hello");
    for chunk in &chunks {
        assert_eq!(chunk["object"], "chat.completion.chunk");
        assert_eq!(chunk["id"], "msg_mock");
        assert_eq!(chunk["model"], "anthropic/claude-3-haiku");
    }
    let terminal = &chunks[2];
    assert_eq!(terminal["choices"][0]["finish_reason"], "stop");
    assert_eq!(terminal["usage"]["prompt_tokens"], 7);
    assert_eq!(terminal["usage"]["completion_tokens"], 2);

    server.abort();
}

#[tokio::test]
async fn test_google_non_stream_with_system_instruction() {
    let (addr, server) = spawn_upstream().await;
    let state = build_state(addr, "sk-oai");

    let request = chat_request(&json!({
        "model": "google/gemini-1.5-flash",
        "messages": [
            {"role": "system", "content": "Be brief"},
            {"role": "user", "content": "Say hello in French"}
        ]
    }));
    let response = dispatch_request(state, Arc::<str>::from(""), request)
        .await
        .expect("dispatch");
    assert_eq!(response.status(), StatusCode::OK);

    let payload = read_json(response).await;
    assert_eq!(payload["model"], "google/gemini-1.5-flash");
    assert_eq!(payload["choices"][0]["message"]["content"], "Bonjour");
    assert_eq!(payload["choices"][0]["finish_reason"], "stop");
    assert_eq!(payload["usage"]["total_tokens"], 5);

    server.abort();
}

#[tokio::test]
async fn test_upstream_rejection_is_api_error() {
    let (addr, server) = spawn_upstream().await;
    let state = build_state(addr, "sk-wrong");

    let request = chat_request(&json!({
        "model": "gpt-4o-mini",
        "messages": [{"role": "user", "content": "ping"}]
    }));
    let response = dispatch_request(state, Arc::<str>::from(""), request)
        .await
        .expect("dispatch");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let payload = read_json(response).await;
    assert_eq!(payload["error"]["type"], "api_error");
    let message = payload["error"]["message"].as_str().expect("message");
    assert!(message.starts_with("OpenAI API error: "), "{message}");
    assert!(message.contains("Incorrect API key provided"));

    server.abort();
}

#[tokio::test]
async fn test_client_errors() {
    let (addr, server) = spawn_upstream().await;
    let mut config = AppConfig::default();
    config.providers.openai.base_url = Some(format!("http://{addr}/v1"));
    let transport = HttpTransport::new(&ServerConfig::default()).expect("build transport");
    let state = Arc::new(AppState::new(config, transport));

    let missing_key = chat_request(&json!({
        "model": "gpt-4o-mini",
        "messages": [{"role": "user", "content": "ping"}]
    }));
    let response = dispatch_request(Arc::clone(&state), Arc::<str>::from(""), missing_key)
        .await
        .expect("dispatch");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let payload = read_json(response).await;
    assert_eq!(payload["error"]["type"], "authentication_error");
    assert_eq!(payload["error"]["message"], "OpenAI API key not configured");

    let empty_messages = chat_request(&json!({"model": "gpt-4o-mini", "messages": []}));
    let response = dispatch_request(Arc::clone(&state), Arc::<str>::from(""), empty_messages)
        .await
        .expect("dispatch");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let payload = read_json(response).await;
    assert_eq!(payload["error"]["type"], "invalid_request_error");

    let garbage = Request::builder()
        .method("POST")
        .uri("/v1/chat/completions")
        .body(Body::from("not json"))
        .expect("build request");
    let response = dispatch_request(Arc::clone(&state), Arc::<str>::from(""), garbage)
        .await
        .expect("dispatch");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    server.abort();
}

#[tokio::test]
async fn test_health_and_unknown_routes() {
    let mut config = AppConfig::default();
    config.providers.google.api_key = Some("g-key".to_string());
    config.server.max_body_bytes = 64;
    let transport = HttpTransport::new(&ServerConfig::default()).expect("build transport");
    let state = Arc::new(AppState::new(config, transport));
    let base_path = Arc::<str>::from("/gw");

    let health = Request::builder()
        .method("GET")
        .uri("/gw/")
        .body(Body::empty())
        .expect("build request");
    let response = dispatch_request(Arc::clone(&state), Arc::clone(&base_path), health)
        .await
        .expect("dispatch");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json(response).await;
    assert_eq!(payload["providers"]["google"]["configured"], true);
    assert_eq!(payload["providers"]["openai"]["configured"], false);

    let unknown = Request::builder()
        .method("POST")
        .uri("/gw/v1/embeddings")
        .body(Body::empty())
        .expect("build request");
    let response = dispatch_request(Arc::clone(&state), Arc::clone(&base_path), unknown)
        .await
        .expect("dispatch");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let oversized = Request::builder()
        .method("POST")
        .uri("/gw/v1/chat/completions")
        .body(Body::from(vec![b' '; 1024]))
        .expect("build request");
    let response = dispatch_request(Arc::clone(&state), Arc::clone(&base_path), oversized)
        .await
        .expect("dispatch");
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}
