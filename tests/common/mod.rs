//! Scripted text backend shared by the integration tests.
#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use mockcat::dispatch::{ModelRequest, ModelResponse, TextBackend};
use mockcat::error::MockcatError;

type Script = dyn Fn(usize, usize) -> Result<String, MockcatError> + Send + Sync;

/// Backend whose reply is computed from (call index, requested chunk size).
/// Call indices start at 0 and count every attempt, retries included.
pub struct ScriptedBackend {
    script: Box<Script>,
    calls: AtomicUsize,
    sizes: Mutex<Vec<usize>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new(
        script: impl Fn(usize, usize) -> Result<String, MockcatError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            script: Box::new(script),
            calls: AtomicUsize::new(0),
            sizes: Mutex::new(Vec::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Always answers with exactly the requested number of records.
    pub fn exact() -> Self {
        Self::new(|call, size| Ok(records_json(size, call * 1000)))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Chunk size requested by each attempt, in order.
    pub fn sizes(&self) -> Vec<usize> {
        self.sizes.lock().unwrap().clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl TextBackend for ScriptedBackend {
    fn model(&self) -> &str {
        "scripted-model"
    }

    fn provider(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, req: &ModelRequest) -> Result<ModelResponse, MockcatError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let size = requested_size(&req.prompt);
        self.sizes.lock().unwrap().push(size);
        self.prompts.lock().unwrap().push(req.prompt.clone());

        let text = (self.script)(call, size)?;
        Ok(ModelResponse {
            text,
            model: req.model.clone(),
            provider: "scripted".to_string(),
            latency_ms: 1,
        })
    }
}

/// Read N back out of "Generate exactly N records".
pub fn requested_size(prompt: &str) -> usize {
    prompt
        .split("exactly ")
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|n| n.parse().ok())
        .expect("prompt should state the chunk size")
}

/// JSON array of `n` records with ids starting at `first_id`.
pub fn records_json(n: usize, first_id: usize) -> String {
    let items: Vec<String> = (0..n)
        .map(|i| {
            let id = first_id + i;
            format!(r#"{{"id": {id}, "name": "user {id}"}}"#)
        })
        .collect();
    format!("[{}]", items.join(", "))
}

pub fn upstream_error() -> MockcatError {
    MockcatError::Upstream {
        provider: "scripted".to_string(),
        message: "503: unavailable".to_string(),
        status: Some(503),
    }
}
