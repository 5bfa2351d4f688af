use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::routing::post;
use axum::Router;
use azul_chat::chat::{ChatService, EMPTY_MESSAGE, MISSING_MESSAGE};
use azul_chat::exchange_log::ExchangeLog;
use azul_chat::llm_wrapper::{GenerationClient, LLMClient};
use azul_chat::responder::{RetryPolicy, RetryingResponder, Sleeper, FALLBACK_REPLY};
use azul_chat::schemas::chat::{ChatResponse, ErrorBody, StatusBody};
use azul_chat::schemas::generation::{GenerationOutcome, GenerationRequest};
use azul_chat::server::{create_app, HEALTH_STATUS};
use azul_chat::settings::GenerationSettings;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::{tempdir, TempDir};
use tokio::io::AsyncWriteExt;
use tower::ServiceExt;

struct FixedClient {
    outcome: GenerationOutcome,
    calls: AtomicUsize,
}

impl GenerationClient for FixedClient {
    fn send<'a>(&'a self, _request: &'a GenerationRequest) -> BoxFuture<'a, GenerationOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        futures::future::ready(self.outcome.clone()).boxed()
    }
}

struct NoSleep;

impl Sleeper for NoSleep {
    fn sleep(&self, _duration: Duration) -> BoxFuture<'static, ()> {
        futures::future::ready(()).boxed()
    }
}

struct Harness {
    app: Router,
    client: Arc<FixedClient>,
    log_path: std::path::PathBuf,
    _dir: TempDir,
}

fn harness(outcome: GenerationOutcome) -> Harness {
    let dir = tempdir().unwrap();
    let log_path = dir.path().join("data").join("exchanges.csv");
    let client = Arc::new(FixedClient {
        outcome,
        calls: AtomicUsize::new(0),
    });
    let responder = RetryingResponder::new(
        client.clone(),
        Arc::new(NoSleep),
        RetryPolicy::default(),
        200,
    );
    let service = ChatService::new(responder, ExchangeLog::new(&log_path));
    let app = create_app(service, dir.path());

    Harness {
        app,
        client,
        log_path,
        _dir: dir,
    }
}

fn chat_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/chatbot")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body<T: DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn data_rows(path: &Path) -> Vec<csv::StringRecord> {
    if !path.exists() {
        return Vec::new();
    }
    let mut reader = csv::Reader::from_path(path).unwrap();
    reader.records().map(Result::unwrap).collect()
}

#[tokio::test]
async fn chat_returns_generated_text() {
    let h = harness(GenerationOutcome::Success("Faça seus exames.".into()));

    let response = h
        .app
        .clone()
        .oneshot(chat_request(r#"{"message": "  devo fazer exame?  "}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: ChatResponse = json_body(response).await;
    assert_eq!(body.response, "Faça seus exames.");

    let rows = data_rows(&h.log_path);
    assert_eq!(rows.len(), 1);
    assert_eq!(&rows[0][1], "devo fazer exame?");
    assert_eq!(&rows[0][2], "Faça seus exames.");
}

#[tokio::test]
async fn upstream_outage_still_answers_200_with_fallback() {
    let h = harness(GenerationOutcome::TransportError("refused".into()));

    let response = h
        .app
        .clone()
        .oneshot(chat_request(r#"{"message": "sintomas"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: ChatResponse = json_body(response).await;
    assert_eq!(body.response, FALLBACK_REPLY);
    assert_eq!(h.client.calls.load(Ordering::SeqCst), 3);
    assert_eq!(data_rows(&h.log_path).len(), 1);
}

#[tokio::test]
async fn empty_or_missing_message_is_rejected() {
    let cases = [
        (r#"{"message": ""}"#, EMPTY_MESSAGE),
        (r#"{"message": "   "}"#, EMPTY_MESSAGE),
        (r#"{}"#, MISSING_MESSAGE),
        (r#"{"message": 7}"#, MISSING_MESSAGE),
        ("not json", MISSING_MESSAGE),
    ];

    for (body, expected) in cases {
        let h = harness(GenerationOutcome::Success("x".into()));
        let response = h.app.clone().oneshot(chat_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {}", body);
        let error: ErrorBody = json_body(response).await;
        assert_eq!(error.error, expected, "body: {}", body);
        assert_eq!(h.client.calls.load(Ordering::SeqCst), 0);
        assert!(data_rows(&h.log_path).is_empty());
    }
}

#[tokio::test]
async fn missing_content_type_is_rejected() {
    let h = harness(GenerationOutcome::Success("x".into()));
    let request = Request::builder()
        .method("POST")
        .uri("/chatbot")
        .body(Body::from(r#"{"message": "oi"}"#))
        .unwrap();

    let response = h.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(data_rows(&h.log_path).is_empty());
}

#[tokio::test]
async fn health_check() {
    let h = harness(GenerationOutcome::EmptyResult);
    let request = Request::builder().uri("/teste").body(Body::empty()).unwrap();

    let response = h.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: StatusBody = json_body(response).await;
    assert_eq!(body.status, HEALTH_STATUS);
}

#[tokio::test]
async fn cors_headers_are_present() {
    let h = harness(GenerationOutcome::Success("x".into()));
    let request = Request::builder()
        .method("POST")
        .uri("/chatbot")
        .header(header::ORIGIN, "http://example.com")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"message": "oi"}"#))
        .unwrap();

    let response = h.app.clone().oneshot(request).await.unwrap();

    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
}

#[tokio::test]
async fn static_files_are_served() {
    let h = harness(GenerationOutcome::EmptyResult);
    std::fs::write(h._dir.path().join("index.html"), "<h1>Novembro Azul</h1>").unwrap();
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();

    let response = h.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"<h1>Novembro Azul</h1>");
}

async fn fake_gemini() -> &'static str {
    r#"{"candidates":[{"content":{"parts":[{"text":" Consulte um urologista. "}]}}]}"#
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_through_real_client_log_every_exchange() {
    let upstream = Router::new().route("/models/{call}", post(fake_gemini));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, upstream).await.unwrap();
    });

    let client = LLMClient::new(&GenerationSettings {
        api_key: "test-key".to_string(),
        base_url: format!("http://{}/models", addr),
        model: "gemini-test".to_string(),
        max_output_tokens: 200,
        request_timeout_secs: 5,
    })
    .unwrap();

    let dir = tempdir().unwrap();
    let log_path = dir.path().join("exchanges.csv");
    let responder = RetryingResponder::new(
        Arc::new(client),
        Arc::new(NoSleep),
        RetryPolicy::default(),
        200,
    );
    let app = create_app(
        ChatService::new(responder, ExchangeLog::new(&log_path)),
        dir.path(),
    );

    let n = 20;
    let requests = (0..n).map(|i| {
        let app = app.clone();
        tokio::spawn(async move {
            let body = format!(r#"{{"message": "pergunta {}"}}"#, i);
            let response = app.oneshot(chat_request(&body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            json_body::<ChatResponse>(response).await
        })
    });

    for result in futures::future::join_all(requests).await {
        assert_eq!(result.unwrap().response, "Consulte um urologista.");
    }

    let contents = std::fs::read_to_string(&log_path).unwrap();
    assert_eq!(
        contents
            .lines()
            .filter(|l| *l == "Timestamp,User Message,Bot Response")
            .count(),
        1
    );
    let rows = data_rows(&log_path);
    assert_eq!(rows.len(), n);
    let mut questions: Vec<String> = rows.iter().map(|r| r[1].to_string()).collect();
    questions.sort();
    let mut expected: Vec<String> = (0..n).map(|i| format!("pergunta {}", i)).collect();
    expected.sort();
    assert_eq!(questions, expected);
}

struct SlowClient {
    delay: Duration,
}

impl GenerationClient for SlowClient {
    fn send<'a>(&'a self, _request: &'a GenerationRequest) -> BoxFuture<'a, GenerationOutcome> {
        let delay = self.delay;
        async move {
            tokio::time::sleep(delay).await;
            GenerationOutcome::Success("Procure um urologista.".to_string())
        }
        .boxed()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn exchange_is_logged_when_client_disconnects_mid_request() {
    let dir = tempdir().unwrap();
    let log_path = dir.path().join("exchanges.csv");
    let responder = RetryingResponder::new(
        Arc::new(SlowClient {
            delay: Duration::from_millis(500),
        }),
        Arc::new(NoSleep),
        RetryPolicy::default(),
        200,
    );
    let app = create_app(
        ChatService::new(responder, ExchangeLog::new(&log_path)),
        dir.path(),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let body = r#"{"message":"oi"}"#;
    let raw = format!(
        "POST /chatbot HTTP/1.1\r\nHost: {}\r\nContent-Type: application/json\r\n\
Content-Length: {}\r\nConnection: close\r\n\r\n{}",
        addr,
        body.len(),
        body
    );
    let mut socket = tokio::net::TcpStream::connect(addr).await.unwrap();
    socket.write_all(raw.as_bytes()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    drop(socket);

    tokio::time::sleep(Duration::from_millis(1500)).await;

    let rows = data_rows(&log_path);
    assert_eq!(rows.len(), 1);
    assert_eq!(&rows[0][1], "oi");
    assert_eq!(&rows[0][2], "Procure um urologista.");
}
