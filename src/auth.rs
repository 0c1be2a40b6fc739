// Login handshake.
//
// The admin answers a good login with a redirect and a bad one with a 200
// page carrying an error banner. A 3xx is therefore the only success
// signal, and redirects must never be followed by the transport.

use std::fmt;

use tracing::{info, warn};

use crate::api::{ApiClient, FORM_CONTENT_TYPE};
use crate::encoding;
use crate::error::{Result, SyncError};
use crate::scrape::LOGIN_ERROR_BANNER;

/// Login id and password. Held only for the call that establishes a session.
#[derive(Clone)]
pub struct Credentials {
    pub login_id: String,
    pub password: String,
}

impl Credentials {
    pub fn new(login_id: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials {
            login_id: login_id.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login_id", &self.login_id)
            .field("password", &"********")
            .finish()
    }
}

/// An authenticated client. The cookie jar inside is the session.
pub struct Session {
    client: ApiClient,
}

impl Session {
    pub fn client(&self) -> &ApiClient {
        &self.client
    }
}

pub enum LoginOutcome {
    SessionEstablished(Session),
    Rejected { reason: String },
}

impl fmt::Debug for LoginOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoginOutcome::SessionEstablished(_) => f.write_str("SessionEstablished"),
            LoginOutcome::Rejected { reason } => f.debug_struct("Rejected").field("reason", reason).finish(),
        }
    }
}

/// POST the credentials and classify the answer. Transport failures are
/// returned as errors; a refused login is an `Ok(Rejected)`.
pub fn login(client: ApiClient, credentials: &Credentials) -> Result<LoginOutcome> {
    let policy = client.unmappable();
    let body = format!(
        "login_id={}&password={}",
        encoding::encode_form_value(&credentials.login_id, policy, "login id")?,
        encoding::encode_form_value(&credentials.password, policy, "password")?,
    );
    let url = client.endpoints().login();
    info!("Logging in as {}", credentials.login_id);
    let res = client.post(&url, body, FORM_CONTENT_TYPE)?;

    if res.is_redirect() {
        info!("Login successful (status {})", res.status);
        return Ok(LoginOutcome::SessionEstablished(Session { client }));
    }

    let reason = if res.status == 200 {
        match LOGIN_ERROR_BANNER.extract_from(&res.body) {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            _ => "login page returned without an error message".to_string(),
        }
    } else {
        format!("unexpected status {} from login endpoint", res.status)
    };
    warn!("Login failed: {}", reason);
    Ok(LoginOutcome::Rejected { reason })
}

/// `login`, with a rejection turned into [`SyncError::Authentication`].
pub fn establish(client: ApiClient, credentials: &Credentials) -> Result<Session> {
    match login(client, credentials)? {
        LoginOutcome::SessionEstablished(session) => Ok(session),
        LoginOutcome::Rejected { reason } => Err(SyncError::Authentication(reason)),
    }
}
