// Scripted in-memory transport for exercising the engine without a network.
// Compiled for unit tests and, behind the `testing` feature, for the
// integration tests under `tests/`.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use encoding_rs::EUC_JP;
use url::Url;

use crate::api::{ApiClient, RawResponse, Transport};
use crate::config::SyncConfig;
use crate::error::{Result, SyncError};

/// One scripted reply, consumed in order.
#[derive(Debug, Clone)]
pub enum Step {
    Respond { status: u16, body: Vec<u8> },
    ConnectionRefused,
}

impl Step {
    pub fn status(status: u16) -> Self {
        Step::Respond { status, body: Vec::new() }
    }

    /// A page served the way the admin serves it: EUC-JP encoded.
    pub fn page(status: u16, html: &str) -> Self {
        let (bytes, _, _) = EUC_JP.encode(html);
        Step::Respond {
            status,
            body: bytes.into_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub url: String,
    pub body: String,
    pub content_type: Option<String>,
}

#[derive(Default)]
struct Script {
    steps: VecDeque<Step>,
    requests: Vec<RecordedRequest>,
}

/// Cloning shares the script, so a test can keep a handle after giving a
/// clone to an [`ApiClient`].
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    inner: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub fn new(steps: Vec<Step>) -> Self {
        let transport = ScriptedTransport::default();
        transport.push(steps);
        transport
    }

    pub fn push(&self, steps: Vec<Step>) {
        self.lock().steps.extend(steps);
    }

    pub fn client(&self) -> ApiClient {
        self.client_with(&SyncConfig::default())
    }

    pub fn client_with(&self, config: &SyncConfig) -> ApiClient {
        ApiClient::with_transport(Box::new(self.clone()), config)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    pub fn remaining(&self) -> usize {
        self.lock().steps.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        // a panicking test thread poisons the lock; the data is still usable
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn answer(&self, request: RecordedRequest) -> Result<RawResponse> {
        let url = request.url.clone();
        let mut script = self.lock();
        script.requests.push(request);
        match script.steps.pop_front() {
            Some(Step::Respond { status, body }) => Ok(RawResponse { status, body }),
            Some(Step::ConnectionRefused) => Err(SyncError::Transport {
                url,
                reason: "connection refused".into(),
            }),
            None => Err(SyncError::Transport {
                url,
                reason: "no scripted response left".into(),
            }),
        }
    }
}

impl Transport for ScriptedTransport {
    fn get(&self, url: &Url) -> Result<RawResponse> {
        self.answer(RecordedRequest {
            method: "GET",
            url: url.to_string(),
            body: String::new(),
            content_type: None,
        })
    }

    fn post(&self, url: &Url, body: Vec<u8>, content_type: &str) -> Result<RawResponse> {
        self.answer(RecordedRequest {
            method: "POST",
            url: url.to_string(),
            body: String::from_utf8_lossy(&body).into_owned(),
            content_type: Some(content_type.to_string()),
        })
    }
}
