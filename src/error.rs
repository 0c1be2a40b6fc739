// Error taxonomy shared by every part of the sync engine.
//
// Fatal errors (transport, authentication, configuration) abort a run.
// Everything else is attached to the descriptor it happened on and the
// catalog loop moves on.

use std::path::PathBuf;

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors raised while talking to the template editor or touching local files.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Connection refused, DNS failure, timeout and friends.
    #[error("transport error on {url}: {reason}")]
    Transport { url: String, reason: String },

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("fetching {url} returned status {status}")]
    ResourceFetch { url: String, status: u16 },

    #[error("update POST to {url} returned status {status}")]
    ResourceUpload { url: String, status: u16 },

    /// An extraction rule found nothing on a page.
    #[error("scrape rule '{rule}' failed: {detail}")]
    Scrape { rule: String, detail: String },

    #[error("{origin}: character {character:?} (U+{code:04X}) at line {line}, column {column} has no EUC-JP mapping")]
    Encoding {
        origin: String,
        character: char,
        code: u32,
        line: usize,
        column: usize,
    },

    #[error("could not resolve default template id: {0}")]
    Resolution(String),

    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("file watcher error: {0}")]
    Watch(#[from] notify::Error),
}

impl SyncError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SyncError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn scrape(rule: impl Into<String>, detail: impl Into<String>) -> Self {
        SyncError::Scrape {
            rule: rule.into(),
            detail: detail.into(),
        }
    }

    /// Whether this error leaves the whole run unable to continue.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SyncError::Transport { .. }
                | SyncError::Authentication(_)
                | SyncError::Config(_)
                | SyncError::Watch(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_resource_errors_are_not_fatal() {
        let fetch = SyncError::ResourceFetch {
            url: "https://example.test/".into(),
            status: 500,
        };
        assert!(!fetch.is_fatal());
        assert!(!SyncError::scrape("html textarea", "missing").is_fatal());
    }

    #[test]
    fn transport_and_auth_errors_are_fatal() {
        let transport = SyncError::Transport {
            url: "https://example.test/".into(),
            reason: "connection refused".into(),
        };
        assert!(transport.is_fatal());
        assert!(SyncError::Authentication("bad password".into()).is_fatal());
    }

    #[test]
    fn encoding_error_names_the_character() {
        let err = SyncError::Encoding {
            origin: "0_common.html".into(),
            character: '😀',
            code: '😀' as u32,
            line: 3,
            column: 7,
        };
        let msg = err.to_string();
        assert!(msg.contains("0_common.html"));
        assert!(msg.contains("U+1F600"));
        assert!(msg.contains("line 3, column 7"));
    }
}
