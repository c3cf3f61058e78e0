//! HTTP backend against a one-shot mock server on localhost.

use std::time::{Duration, Instant};

use mockcat::config::BackendConfig;
use mockcat::dispatch::http::HttpBackend;
use mockcat::dispatch::{ApiFormat, ModelRequest, TextBackend};
use mockcat::error::MockcatError;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Helper: bind a TCP listener on localhost and return (listener, port).
async fn mock_listener() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

/// Read one HTTP request (headers plus Content-Length body).
async fn read_request(socket: &mut TcpStream) -> String {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = socket.read(&mut buf).await.unwrap();
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buf[..n]);
        let text = String::from_utf8_lossy(&data);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|l| {
                    let (k, v) = l.split_once(':')?;
                    k.eq_ignore_ascii_case("content-length")
                        .then(|| v.trim().parse::<usize>().ok())?
                })
                .unwrap_or(0);
            if data.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&data).to_string()
}

/// Serve a single response and hand back the raw request text.
fn serve_once(listener: TcpListener, status: &'static str, body: String) -> JoinHandle<String> {
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        request
    })
}

fn backend(format: ApiFormat, port: u16) -> HttpBackend {
    let base_url = match format {
        ApiFormat::Gemini => format!("http://127.0.0.1:{port}/v1beta"),
        ApiFormat::OpenAi => format!("http://127.0.0.1:{port}/v1/chat/completions"),
    };
    HttpBackend::new(BackendConfig {
        model: "test-model".to_string(),
        provider: format.provider().to_string(),
        api_format: format,
        base_url,
        api_key: "fake-key".to_string(),
        temperature: 0.2,
        max_output_tokens: 8192,
    })
    .unwrap()
}

fn make_req(deadline_secs: u64) -> ModelRequest {
    ModelRequest {
        prompt: "Generate exactly 2 records".to_string(),
        model: "test-model".to_string(),
        temperature: 0.2,
        max_output_tokens: 8192,
        deadline: Instant::now() + Duration::from_secs(deadline_secs),
        cancellation_token: None,
    }
}

// ---------------------------------------------------------------------------
// Gemini generateContent
// ---------------------------------------------------------------------------

#[tokio::test]
async fn gemini_response_text_is_extracted() {
    let (listener, port) = mock_listener().await;
    let body = serde_json::json!({
        "candidates": [{
            "content": {"parts": [{"text": "[{\"id\": 1},"}, {"text": " {\"id\": 2}]"}]}
        }]
    })
    .to_string();
    let server = serve_once(listener, "200 OK", body);

    let result = backend(ApiFormat::Gemini, port)
        .complete(&make_req(30))
        .await
        .unwrap();
    assert_eq!(result.text, "[{\"id\": 1}, {\"id\": 2}]");
    assert_eq!(result.provider, "gemini");
    assert_eq!(result.model, "test-model");

    let request = server.await.unwrap();
    assert!(
        request.starts_with("POST /v1beta/models/test-model:generateContent"),
        "request line: {}",
        request.lines().next().unwrap_or_default()
    );
    assert!(request.to_lowercase().contains("x-goog-api-key: fake-key"));
    assert!(request.contains("\"maxOutputTokens\":8192"));
    assert!(request.contains("Generate exactly 2 records"));
}

#[tokio::test]
async fn gemini_empty_candidates_is_upstream_error() {
    let (listener, port) = mock_listener().await;
    let server = serve_once(listener, "200 OK", r#"{"candidates": []}"#.to_string());

    let err = backend(ApiFormat::Gemini, port)
        .complete(&make_req(30))
        .await
        .unwrap_err();
    assert!(matches!(err, MockcatError::Upstream { status: None, .. }), "got {err:?}");
    server.await.unwrap();
}

// ---------------------------------------------------------------------------
// OpenAI-compatible chat completions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn openai_response_text_is_extracted() {
    let (listener, port) = mock_listener().await;
    let body = r#"{"choices": [{"message": {"content": "[{\"id\": 1}]"}}]}"#.to_string();
    let server = serve_once(listener, "200 OK", body);

    let result = backend(ApiFormat::OpenAi, port)
        .complete(&make_req(30))
        .await
        .unwrap();
    assert_eq!(result.text, "[{\"id\": 1}]");

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /v1/chat/completions"));
    assert!(request.to_lowercase().contains("authorization: bearer fake-key"));
    assert!(request.contains("\"max_tokens\":8192"));
}

#[tokio::test]
async fn undecodable_envelope_is_schema_parse_error() {
    let (listener, port) = mock_listener().await;
    let server = serve_once(listener, "200 OK", "not json".to_string());

    let err = backend(ApiFormat::OpenAi, port)
        .complete(&make_req(30))
        .await
        .unwrap_err();
    assert!(matches!(err, MockcatError::SchemaParse(_)), "got {err:?}");
    server.await.unwrap();
}

#[tokio::test]
async fn oversized_body_is_rejected_without_reading_it_all() {
    let (listener, port) = mock_listener().await;
    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let _ = read_request(&mut socket).await;
        let body = format!(
            r#"{{"choices": [{{"message": {{"content": "{}"}}}}]}}"#,
            "x".repeat(3 * 1024 * 1024)
        );
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        );
        // The client hangs up once it has seen enough.
        let _ = socket.write_all(response.as_bytes()).await;
    });

    let err = backend(ApiFormat::OpenAi, port)
        .complete(&make_req(30))
        .await
        .unwrap_err();
    match err {
        MockcatError::Upstream { message, status, .. } => {
            assert!(message.contains("response too large"), "message: {message}");
            assert_eq!(status, None);
        }
        other => panic!("expected Upstream, got {other:?}"),
    }

    server.abort();
}

// ---------------------------------------------------------------------------
// Status mapping
// ---------------------------------------------------------------------------

#[tokio::test]
async fn status_codes_map_to_error_variants() {
    let cases: [(&'static str, fn(&MockcatError) -> bool); 4] = [
        ("429 Too Many Requests", |e| {
            matches!(e, MockcatError::RateLimited { .. })
        }),
        ("401 Unauthorized", |e| {
            matches!(e, MockcatError::AuthFailed { .. })
        }),
        ("403 Forbidden", |e| matches!(e, MockcatError::AuthFailed { .. })),
        ("500 Internal Server Error", |e| {
            matches!(e, MockcatError::Upstream { status: Some(500), .. })
        }),
    ];

    for (status, check) in cases {
        let (listener, port) = mock_listener().await;
        let server = serve_once(listener, status, r#"{"error": "nope"}"#.to_string());

        let err = backend(ApiFormat::Gemini, port)
            .complete(&make_req(30))
            .await
            .unwrap_err();
        assert!(check(&err), "{status}: got {err:?}");
        server.await.unwrap();
    }
}

// ---------------------------------------------------------------------------
// Deadline and cancellation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn expired_deadline_fails_without_request() {
    let mut req = make_req(0);
    req.deadline = Instant::now();

    // Port 9 (discard) is never contacted: the deadline check comes first.
    let err = backend(ApiFormat::Gemini, 9).complete(&req).await.unwrap_err();
    assert!(matches!(err, MockcatError::Timeout(0)));
}

#[tokio::test]
async fn cancellation_aborts_in_flight_call() {
    let (listener, port) = mock_listener().await;
    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let _ = read_request(&mut socket).await;
        // Never answer.
        tokio::time::sleep(Duration::from_secs(30)).await;
    });

    let token = CancellationToken::new();
    let mut req = make_req(30);
    req.cancellation_token = Some(token.clone());

    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let start = Instant::now();
    let err = backend(ApiFormat::Gemini, port).complete(&req).await.unwrap_err();
    assert!(matches!(err, MockcatError::Cancelled));
    assert!(start.elapsed() < Duration::from_secs(5));

    server.abort();
}

#[tokio::test]
async fn slow_backend_times_out_at_deadline() {
    let (listener, port) = mock_listener().await;
    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let _ = read_request(&mut socket).await;
        tokio::time::sleep(Duration::from_secs(30)).await;
    });

    let start = Instant::now();
    let err = backend(ApiFormat::Gemini, port)
        .complete(&make_req(1))
        .await
        .unwrap_err();
    assert!(matches!(err, MockcatError::Timeout(_)), "got {err:?}");
    assert!(err.is_retryable());
    assert!(start.elapsed() < Duration::from_secs(5));

    server.abort();
}
