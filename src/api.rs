// HTTP session client: one blocking reqwest client per run, carrying the
// cookie jar, never following redirects, and decoding every body from
// EUC-JP before callers see it.
//
// The reqwest client sits behind the `Transport` trait so tests can script
// responses without a network.

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::redirect::Policy;
use tracing::debug;
use url::Url;

use crate::config::{Endpoints, SyncConfig};
use crate::encoding::{self, UnmappablePolicy};
use crate::error::{Result, SyncError};

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
pub const LEGACY_FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=EUC-JP";

/// Status and undecoded body as they came off the wire.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Status and decoded body.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

impl Response {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }
}

/// Issues raw requests. Implementations must keep cookies between calls and
/// hand back 3xx responses untouched.
pub trait Transport: Send {
    fn get(&self, url: &Url) -> Result<RawResponse>;
    fn post(&self, url: &Url, body: Vec<u8>, content_type: &str) -> Result<RawResponse>;
}

/// The production transport.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(config: &SyncConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        let client = Client::builder()
            .cookie_store(true)
            .redirect(Policy::none())
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| SyncError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(ReqwestTransport { client })
    }

    fn finish(url: &Url, res: reqwest::Result<reqwest::blocking::Response>) -> Result<RawResponse> {
        let res = res.map_err(|e| transport_error(url, e))?;
        let status = res.status().as_u16();
        let body = res.bytes().map_err(|e| transport_error(url, e))?.to_vec();
        Ok(RawResponse { status, body })
    }
}

fn transport_error(url: &Url, e: reqwest::Error) -> SyncError {
    let reason = if e.is_timeout() {
        format!("request timed out ({})", e)
    } else {
        e.to_string()
    };
    SyncError::Transport {
        url: url.to_string(),
        reason,
    }
}

impl Transport for ReqwestTransport {
    fn get(&self, url: &Url) -> Result<RawResponse> {
        Self::finish(url, self.client.get(url.clone()).send())
    }

    fn post(&self, url: &Url, body: Vec<u8>, content_type: &str) -> Result<RawResponse> {
        let req = self
            .client
            .post(url.clone())
            .header(CONTENT_TYPE, content_type)
            .body(body);
        Self::finish(url, req.send())
    }
}

/// Session client. Not yet authenticated until passed through
/// [`crate::auth::login`].
pub struct ApiClient {
    transport: Box<dyn Transport>,
    endpoints: Endpoints,
    unmappable: UnmappablePolicy,
}

impl ApiClient {
    /// Client backed by reqwest, configured from `config`.
    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(config)?;
        Ok(Self::with_transport(Box::new(transport), config))
    }

    pub fn with_transport(transport: Box<dyn Transport>, config: &SyncConfig) -> Self {
        ApiClient {
            transport,
            endpoints: config.endpoints.clone(),
            unmappable: config.unmappable,
        }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn unmappable(&self) -> UnmappablePolicy {
        self.unmappable
    }

    pub fn get(&self, url: &Url) -> Result<Response> {
        debug!("GET {}", url);
        let raw = self.transport.get(url)?;
        debug!("GET {} -> {}", url, raw.status);
        Ok(decode(raw))
    }

    pub fn post(&self, url: &Url, body: String, content_type: &str) -> Result<Response> {
        debug!("POST {} ({} bytes)", url, body.len());
        let raw = self.transport.post(url, body.into_bytes(), content_type)?;
        debug!("POST {} -> {}", url, raw.status);
        Ok(decode(raw))
    }
}

fn decode(raw: RawResponse) -> Response {
    Response {
        status: raw.status,
        body: encoding::to_local(&raw.body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::time::Duration;

    #[test]
    fn status_classification() {
        let redirect = Response { status: 302, body: String::new() };
        assert!(redirect.is_redirect());
        assert!(!redirect.is_ok());
        let ok = Response { status: 200, body: String::new() };
        assert!(ok.is_ok());
        assert!(!ok.is_redirect());
    }

    #[test]
    fn refused_connection_is_a_transport_error() {
        // bind then drop to get a port nothing listens on
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let mut config = SyncConfig::default();
        config.endpoints = Endpoints::new(&format!("http://127.0.0.1:{}/", port)).unwrap();
        let client = ApiClient::from_config(&config).unwrap();
        let err = client.get(&client.endpoints().template_list()).unwrap_err();
        assert!(matches!(err, SyncError::Transport { .. }), "got {err:?}");
        assert!(err.is_fatal());
    }

    #[test]
    fn silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = std::thread::spawn(move || {
            // accept and hold the connection without ever answering
            let (stream, _) = listener.accept().unwrap();
            std::thread::sleep(Duration::from_secs(2));
            drop(stream);
        });

        let mut config = SyncConfig::default();
        config.endpoints = Endpoints::new(&format!("http://127.0.0.1:{}/", port)).unwrap();
        config.timeout = Duration::from_millis(200);
        let client = ApiClient::from_config(&config).unwrap();

        let started = std::time::Instant::now();
        let err = client.get(&client.endpoints().template_list()).unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(2));
        match &err {
            SyncError::Transport { reason, .. } => assert!(reason.contains("timed out"), "reason: {reason}"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.is_fatal());
        server.join().unwrap();
    }
}
