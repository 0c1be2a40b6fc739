// Library root
// -----------
// Keeps design templates of a shop-pro storefront in sync with local files.
// The admin has no API, only server-rendered forms, so everything here is
// scrape-and-resubmit over an authenticated cookie session.
//
// Module responsibilities:
// - `encoding`: EUC-JP <-> UTF-8 and legacy-byte percent-encoding.
// - `api`: the session client (cookies, no redirects, decoded bodies).
// - `auth`: login handshake and the `Session` it yields.
// - `catalog`: the fixed table of template resources and local filenames.
// - `scrape`: named extraction rules and the edit-form state scraper.
// - `fetch` / `upload` / `resolver`: the three remote operations.
// - `report`: per-resource outcomes of a run.
// - `watch`: re-upload on local changes.
// - `ui`: terminal prompts and summaries used by the binary.
//
// The binary (`main.rs`) only parses flags and calls the entry points below.

pub mod api;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod encoding;
pub mod error;
pub mod fetch;
pub mod report;
pub mod resolver;
pub mod scrape;
#[cfg(any(test, feature = "testing"))]
#[doc(hidden)]
pub mod testing;
pub mod ui;
pub mod upload;
pub mod watch;

use std::fmt;
use std::str::FromStr;

pub use api::ApiClient;
pub use auth::{Credentials, LoginOutcome, Session};
pub use config::{Endpoints, SyncConfig};
pub use error::{Result, SyncError};
pub use report::{RunReport, OutcomeStatus};

/// Identifies the design template being edited (`tmpl_uid`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TemplateId(String);

impl TemplateId {
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(SyncError::Config("template id must not be empty".into()));
        }
        if !trimmed.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            return Err(SyncError::Config(format!("template id '{}' contains unexpected characters", trimmed)));
        }
        Ok(TemplateId(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for TemplateId {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        TemplateId::new(s)
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Log in and download every template resource into the working directory.
pub fn fetch_templates(config: &SyncConfig, credentials: &Credentials, template_id: &TemplateId) -> Result<RunReport> {
    fetch_templates_with_client(ApiClient::from_config(config)?, config, credentials, template_id)
}

pub fn fetch_templates_with_client(
    client: ApiClient,
    config: &SyncConfig,
    credentials: &Credentials,
    template_id: &TemplateId,
) -> Result<RunReport> {
    let session = auth::establish(client, credentials)?;
    fetch::fetch_all(&session, template_id, &config.layout())
}

/// Log in and resubmit every resource that has local files.
pub fn upload_templates(config: &SyncConfig, credentials: &Credentials, template_id: &TemplateId) -> Result<RunReport> {
    upload_templates_with_client(ApiClient::from_config(config)?, config, credentials, template_id)
}

pub fn upload_templates_with_client(
    client: ApiClient,
    config: &SyncConfig,
    credentials: &Credentials,
    template_id: &TemplateId,
) -> Result<RunReport> {
    let mut session = auth::establish(client, credentials)?;
    upload::upload_all(&mut session, template_id, &config.layout())
}

/// Log in and find the shop's active template.
pub fn resolve_default_template_id(config: &SyncConfig, credentials: &Credentials) -> Result<TemplateId> {
    resolve_default_template_id_with_client(ApiClient::from_config(config)?, credentials)
}

pub fn resolve_default_template_id_with_client(client: ApiClient, credentials: &Credentials) -> Result<TemplateId> {
    let session = auth::establish(client, credentials)?;
    resolver::resolve_default(&session)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_id_is_trimmed_and_validated() {
        assert_eq!(TemplateId::new(" 4821 ").unwrap().as_str(), "4821");
        assert!(TemplateId::new("").is_err());
        assert!(TemplateId::new("48&21").is_err());
        assert_eq!("77".parse::<TemplateId>().unwrap().to_string(), "77");
    }
}
