use std::time::{Duration, Instant};

use reqwest::Client;
use serde::Deserialize;

use crate::config::BackendConfig;
use crate::dispatch::{ApiFormat, ModelRequest, ModelResponse, TextBackend};
use crate::error::MockcatError;

const MAX_RESPONSE_BYTES: usize = 2 * 1024 * 1024; // 2MB

/// HTTP generative backend (Gemini or OpenAI-compatible).
pub struct HttpBackend {
    client: Client,
    config: BackendConfig,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    content: Option<String>,
}

impl HttpBackend {
    pub fn new(config: BackendConfig) -> Result<Self, MockcatError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(4)
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Endpoint URL and JSON body for the configured wire format.
    pub fn build_request(&self, req: &ModelRequest) -> (String, serde_json::Value) {
        let base = self.config.base_url.trim_end_matches('/');
        match self.config.api_format {
            ApiFormat::Gemini => (
                format!("{base}/models/{}:generateContent", req.model),
                serde_json::json!({
                    "contents": [{"role": "user", "parts": [{"text": req.prompt}]}],
                    "generationConfig": {
                        "temperature": req.temperature,
                        "maxOutputTokens": req.max_output_tokens,
                    }
                }),
            ),
            ApiFormat::OpenAi => (
                base.to_string(),
                serde_json::json!({
                    "model": req.model,
                    "messages": [{"role": "user", "content": req.prompt}],
                    "temperature": req.temperature,
                    "max_tokens": req.max_output_tokens,
                }),
            ),
        }
    }

    /// Pull the generated text out of a successful response body.
    pub fn extract_text(&self, bytes: &[u8]) -> Result<String, MockcatError> {
        let text = match self.config.api_format {
            ApiFormat::Gemini => {
                let resp: GenerateContentResponse =
                    serde_json::from_slice(bytes).map_err(|e| {
                        MockcatError::SchemaParse(format!("failed to parse response: {e}"))
                    })?;
                resp.candidates
                    .into_iter()
                    .next()
                    .and_then(|c| c.content)
                    .map(|c| {
                        c.parts
                            .into_iter()
                            .filter_map(|p| p.text)
                            .collect::<String>()
                    })
            }
            ApiFormat::OpenAi => {
                let completion: ChatCompletion =
                    serde_json::from_slice(bytes).map_err(|e| {
                        MockcatError::SchemaParse(format!("failed to parse response: {e}"))
                    })?;
                completion
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|c| c.message.content)
            }
        };

        text.filter(|t| !t.trim().is_empty())
            .ok_or_else(|| MockcatError::Upstream {
                provider: self.config.provider.clone(),
                message: "empty candidates or null content".to_string(),
                status: None,
            })
    }

    async fn send(&self, req: &ModelRequest, timeout: Duration) -> Result<String, MockcatError> {
        let start = Instant::now();
        let provider = self.config.provider.as_str();
        let (url, body) = self.build_request(req);

        let builder = self.client.post(url).timeout(timeout).json(&body);
        let builder = match self.config.api_format {
            ApiFormat::Gemini => builder.header("x-goog-api-key", &self.config.api_key),
            ApiFormat::OpenAi => builder.bearer_auth(&self.config.api_key),
        };

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                MockcatError::Timeout(start.elapsed().as_millis() as u64)
            } else {
                MockcatError::Request(e)
            }
        })?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(MockcatError::RateLimited {
                provider: provider.to_string(),
            });
        }

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(MockcatError::AuthFailed {
                provider: provider.to_string(),
                message: format!("{status}"),
            });
        }

        // Catch-all for any non-success status. The body is only context.
        if !status.is_success() {
            let (error_bytes, _) = read_capped(response, MAX_RESPONSE_BYTES)
                .await
                .unwrap_or_default();
            let text = String::from_utf8_lossy(&error_bytes);
            return Err(MockcatError::Upstream {
                provider: provider.to_string(),
                message: format!("{status}: {text}"),
                status: Some(status.as_u16()),
            });
        }

        let (bytes, overflowed) = read_capped(response, MAX_RESPONSE_BYTES)
            .await
            .map_err(|e| MockcatError::Upstream {
                provider: provider.to_string(),
                message: format!("failed to read response body: {e}"),
                status: None,
            })?;

        if overflowed {
            return Err(MockcatError::Upstream {
                provider: provider.to_string(),
                message: format!("response too large (max {MAX_RESPONSE_BYTES} bytes)"),
                status: None,
            });
        }

        self.extract_text(&bytes)
    }
}

/// Read the body chunk by chunk, keeping at most `limit` bytes. The flag is
/// set when the body was longer; reading stops at that point.
async fn read_capped(
    mut response: reqwest::Response,
    limit: usize,
) -> Result<(Vec<u8>, bool), reqwest::Error> {
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let room = limit - body.len();
        if chunk.len() > room {
            body.extend_from_slice(&chunk[..room]);
            return Ok((body, true));
        }
        body.extend_from_slice(&chunk);
    }
    Ok((body, false))
}

impl TextBackend for HttpBackend {
    fn model(&self) -> &str {
        &self.config.model
    }

    fn provider(&self) -> &str {
        &self.config.provider
    }

    async fn complete(&self, req: &ModelRequest) -> Result<ModelResponse, MockcatError> {
        let start = Instant::now();

        // Check for expired deadline before making the request
        let timeout = req
            .deadline
            .checked_duration_since(Instant::now())
            .filter(|d| *d > Duration::from_millis(100))
            .ok_or(MockcatError::Timeout(0))?;

        let text = match &req.cancellation_token {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => return Err(MockcatError::Cancelled),
                    result = self.send(req, timeout) => result?,
                }
            }
            None => self.send(req, timeout).await?,
        };

        Ok(ModelResponse {
            text,
            model: req.model.clone(),
            provider: self.config.provider.clone(),
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}
