// Runtime configuration: where the admin lives, where local files go and how
// strict the encoder is. Built from the environment, then overridden by CLI
// flags in `main.rs`.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::catalog::{FileNaming, LocalLayout};
use crate::encoding::UnmappablePolicy;
use crate::error::{Result, SyncError};

pub const DEFAULT_ADMIN_URL: &str = "https://admin.shop-pro.jp/";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_WATCH_INTERVAL: Duration = Duration::from_secs(10);

/// Every URL the engine talks to, derived from one admin base URL.
#[derive(Debug, Clone)]
pub struct Endpoints {
    base: Url,
}

impl Endpoints {
    pub fn new(base: &str) -> Result<Self> {
        let base = Url::parse(base).map_err(|e| SyncError::Config(format!("invalid admin url '{}': {}", base, e)))?;
        if base.cannot_be_a_base() {
            return Err(SyncError::Config(format!("admin url '{}' cannot be a base", base)));
        }
        Ok(Endpoints { base })
    }

    fn with_query(&self, pairs: &[(&str, &str)]) -> Url {
        let mut url = self.base.clone();
        url.set_query(None);
        {
            let mut query = url.query_pairs_mut();
            for (k, v) in pairs {
                query.append_pair(k, v);
            }
        }
        url
    }

    pub fn login(&self) -> Url {
        self.with_query(&[("mode", "login"), ("exec", "1")])
    }

    /// Edit page for a paired HTML+CSS resource.
    pub fn paired_edit(&self, tmpl_uid: &str, tmpl_type: u32) -> Url {
        let tmpl_type = tmpl_type.to_string();
        self.with_query(&[
            ("mode", "design_tmpl_edt"),
            ("smode", "HTCS"),
            ("tmpl_uid", tmpl_uid),
            ("tmpl_type", &tmpl_type),
        ])
    }

    /// Edit page for a CSS-only resource.
    pub fn css_edit(&self, tmpl_uid: &str, tmpl_type: u32) -> Url {
        let tmpl_type = tmpl_type.to_string();
        self.with_query(&[
            ("mode", "design_tmpl_edt"),
            ("smode", "CSS"),
            ("tmpl_uid", tmpl_uid),
            ("tmpl_type", &tmpl_type),
        ])
    }

    /// The update endpoint both resource kinds post to.
    pub fn update(&self) -> Url {
        self.with_query(&[("mode", "design_tmpl_edt"), ("smode", "HTCS"), ("type", "TBLUPD")])
    }

    pub fn template_list(&self) -> Url {
        self.with_query(&[("mode", "design_tmpl_lst")])
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Endpoints {
            base: Url::parse(DEFAULT_ADMIN_URL).expect("default admin url is valid"),
        }
    }
}

/// Everything a fetch, upload or watch run needs besides credentials.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub endpoints: Endpoints,
    pub workdir: PathBuf,
    pub naming: FileNaming,
    pub timeout: Duration,
    pub unmappable: UnmappablePolicy,
    pub watch_interval: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            endpoints: Endpoints::default(),
            workdir: PathBuf::from("."),
            naming: FileNaming::SlugQualified,
            timeout: DEFAULT_TIMEOUT,
            unmappable: UnmappablePolicy::Reject,
            watch_interval: DEFAULT_WATCH_INTERVAL,
        }
    }
}

impl SyncConfig {
    /// Read `SHOPPRO_ADMIN_URL` and `SHOPPRO_TIMEOUT_SECS`, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = SyncConfig::default();
        if let Ok(base) = std::env::var("SHOPPRO_ADMIN_URL") {
            config.endpoints = Endpoints::new(&base)?;
        }
        if let Ok(secs) = std::env::var("SHOPPRO_TIMEOUT_SECS") {
            let secs: u64 = secs
                .trim()
                .parse()
                .map_err(|_| SyncError::Config(format!("SHOPPRO_TIMEOUT_SECS must be a number of seconds, got '{}'", secs)))?;
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    pub fn layout(&self) -> LocalLayout {
        LocalLayout::new(self.workdir.clone(), self.naming)
    }
}
