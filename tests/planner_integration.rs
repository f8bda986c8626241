//! Care planner provider-chain integration tests.
//!
//! Exercises the remote provider clients against a local canned HTTP responder:
//! - Successful `OpenAI` and Gemini completions become care plans
//! - Error statuses and unreachable endpoints fall through to the next provider
//! - The heuristic answers when every provider fails
//!
//! No API keys or network access are needed.

// Integration tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use carebridge::config::GenAiConfig;
use carebridge::planner::{
    GeminiClient, OpenAiClient, ProviderFamily, RemoteProvider, build_http_client, heuristic,
};
use carebridge::{GenerativeCarePlanner, IntakeRequest, TriageLevel, VitalSigns};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// A captured request: request line, lower-cased headers, body.
#[derive(Debug, Clone)]
struct CapturedRequest {
    request_line: String,
    headers: Vec<(String, String)>,
    body: String,
}

impl CapturedRequest {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Serves the same canned response to every connection and records requests.
struct CannedServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl CannedServer {
    async fn start(status: u16, body: serde_json::Value) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&requests);
        let body = body.to_string();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let captured = Arc::clone(&captured);
                let body = body.clone();
                tokio::spawn(async move {
                    let mut stream = stream;
                    if let Some(request) = read_request(&mut stream).await {
                        // Recorded before responding so callers see it once their call returns.
                        captured.lock().unwrap().push(request);
                        respond(&mut stream, status, &body).await;
                    }
                });
            }
        });

        Self { addr, requests }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

async fn read_request(stream: &mut TcpStream) -> Option<CapturedRequest> {
    let mut buffer = Vec::new();
    let mut chunk = [0_u8; 4096];

    let header_end = loop {
        let read = stream.read(&mut chunk).await.ok()?;
        if read == 0 {
            return None;
        }
        buffer.extend_from_slice(&chunk[..read]);
        if let Some(pos) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buffer[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or_default().to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_lowercase(), v.trim().to_string()))
        .collect();
    let content_length = headers
        .iter()
        .find(|(k, _)| k == "content-length")
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    while buffer.len() < header_end + content_length {
        let read = stream.read(&mut chunk).await.ok()?;
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..read]);
    }
    let request_body = String::from_utf8_lossy(&buffer[header_end..]).to_string();

    Some(CapturedRequest {
        request_line,
        headers,
        body: request_body,
    })
}

async fn respond(stream: &mut TcpStream, status: u16, body: &str) {
    let reason = if status == 200 { "OK" } else { "Error" };
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    if stream.write_all(response.as_bytes()).await.is_ok() {
        let _ = stream.shutdown().await;
    }
}

fn openai_completion(text: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-test",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": text}}]
    })
}

fn gemini_completion(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}]
    })
}

fn genai(provider: &str, endpoint: String) -> GenAiConfig {
    GenAiConfig {
        provider: provider.to_string(),
        model: "test-model".to_string(),
        api_key: Some("test-key".to_string()),
        endpoint: Some(endpoint),
        timeout_ms: 2_000,
        connect_timeout_ms: 500,
    }
}

fn fever_request() -> IntakeRequest {
    IntakeRequest::new(
        vec!["cough".into(), "high fever".into()],
        VitalSigns::new(39.2, 104, 118, 76).unwrap(),
    )
    .unwrap()
}

/// Returns an address nothing is listening on.
async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

#[tokio::test]
async fn test_openai_completion_becomes_plan() {
    let text = "Triage: urgent\n- Chest X-ray\n- CBC\nMonitor fever closely.";
    let server = CannedServer::start(200, openai_completion(text)).await;
    let planner = GenerativeCarePlanner::new(&genai("openai", server.url("/v1")));
    assert_eq!(planner.provider_families(), [ProviderFamily::OpenAi]);

    let plan = planner.generate(&fever_request()).await;
    assert_eq!(plan.triage_level(), TriageLevel::Urgent);
    assert_eq!(plan.suggested_tests(), ["Chest X-ray", "CBC"]);
    assert_eq!(plan.summary(), text);

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert!(request.request_line.starts_with("POST /v1/chat/completions"));
    assert_eq!(request.header("authorization"), Some("Bearer test-key"));

    let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(body["model"], "test-model");
    assert_eq!(body["max_tokens"], 300);
    assert_eq!(body["messages"][0]["role"], "system");
    let prompt = body["messages"][1]["content"].as_str().unwrap();
    assert!(prompt.contains("cough, high fever"));
    assert!(prompt.contains("104 bpm"));
}

#[tokio::test]
async fn test_gemini_completion_becomes_plan() {
    let text = "This is an EMERGENCY presentation.";
    let server = CannedServer::start(200, gemini_completion(text)).await;
    let planner = GenerativeCarePlanner::new(&genai("google", server.url("/models")));

    let request = fever_request();
    let plan = planner.generate(&request).await;
    assert_eq!(plan.triage_level(), TriageLevel::Emergency);
    // No bullets in the completion, so the heuristic tests are used.
    assert_eq!(
        plan.suggested_tests(),
        heuristic::suggested_tests(request.symptoms())
    );

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert!(
        requests[0]
            .request_line
            .starts_with("POST /models/test-model:generateContent")
    );
    assert_eq!(requests[0].header("x-goog-api-key"), Some("test-key"));
}

#[tokio::test]
async fn test_error_status_falls_back_to_heuristic() {
    let server = CannedServer::start(500, json!({"error": "overloaded"})).await;
    let planner = GenerativeCarePlanner::new(&genai("openai", server.url("/v1")));

    let request = fever_request();
    let plan = planner.generate(&request).await;
    assert_eq!(plan, heuristic::plan(&request));
    assert_eq!(server.requests().len(), 1);
}

#[tokio::test]
async fn test_malformed_response_falls_back_to_heuristic() {
    let server = CannedServer::start(200, json!({"unexpected": true})).await;
    let planner = GenerativeCarePlanner::new(&genai("openai", server.url("/v1")));

    let request = fever_request();
    assert_eq!(planner.generate(&request).await, heuristic::plan(&request));
}

#[tokio::test]
async fn test_blank_completion_falls_back_to_heuristic() {
    let server = CannedServer::start(200, openai_completion("   ")).await;
    let planner = GenerativeCarePlanner::new(&genai("openai", server.url("/v1")));

    let request = fever_request();
    assert_eq!(planner.generate(&request).await, heuristic::plan(&request));
}

#[tokio::test]
async fn test_unreachable_endpoint_falls_back_to_heuristic() {
    let addr = closed_addr().await;
    let planner = GenerativeCarePlanner::new(&genai("openai", format!("http://{addr}/v1")));

    let request = fever_request();
    assert_eq!(planner.generate(&request).await, heuristic::plan(&request));
}

#[tokio::test]
async fn test_chain_moves_to_next_family_once() {
    let failing = CannedServer::start(503, json!({"error": "unavailable"})).await;
    let working = CannedServer::start(200, gemini_completion("Urgent review\n- Spirometry")).await;

    let config = genai("openai", String::new());
    let client = build_http_client(&config);
    let planner = GenerativeCarePlanner::with_providers(vec![
        RemoteProvider::OpenAi(
            OpenAiClient::new(client.clone(), "test-key").with_endpoint(failing.url("/v1")),
        ),
        RemoteProvider::Gemini(
            GeminiClient::new(client.clone(), "test-key").with_endpoint(working.url("/models")),
        ),
        // Same family again: skipped.
        RemoteProvider::OpenAi(
            OpenAiClient::new(client, "test-key").with_endpoint(failing.url("/v1")),
        ),
    ]);

    let plan = planner.generate(&fever_request()).await;
    assert_eq!(plan.triage_level(), TriageLevel::Urgent);
    assert_eq!(plan.suggested_tests(), ["Spirometry"]);
    assert_eq!(failing.requests().len(), 1);
    assert_eq!(working.requests().len(), 1);
}

#[tokio::test]
async fn test_missing_key_never_calls_provider() {
    let server = CannedServer::start(200, openai_completion("Triage: urgent")).await;
    let config = GenAiConfig {
        api_key: None,
        ..genai("openai", server.url("/v1"))
    };
    let planner = GenerativeCarePlanner::new(&config);

    let request = fever_request();
    assert_eq!(planner.generate(&request).await, heuristic::plan(&request));
    assert!(server.requests().is_empty());
}
