//! Artifact text fetching.
//!
//! [`TextFetcher`] is the "fetch text by URL" seam. Implementations are
//! blocking; the artifact cache runs them on tokio's blocking pool.
//!
//! - [`HttpFetcher`]: ureq agent with native-tls, a global timeout and a body
//!   size limit, plus `file://` URLs and bare local paths read from disk
//! - [`StaticFetcher`]: in-memory artifacts for hosts that already hold their
//!   bundles, and for tests

use crate::error::FetchError;
use error_overlay_config::FetchConfig;
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use ureq::Agent;
use ureq::tls::{RootCerts, TlsConfig, TlsProvider};

/// Fetches the text behind a URL.
pub trait TextFetcher: Send + Sync {
    fn fetch_text(&self, url: &str) -> Result<String, FetchError>;
}

/// Where a URL points after scheme policy is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchTarget {
    Http(String),
    File(PathBuf),
}

/// Create a new HTTP agent configured with native-tls and a global timeout.
pub fn agent(timeout: Duration) -> Agent {
    let tls_config = TlsConfig::builder()
        .provider(TlsProvider::NativeTls)
        .root_certs(RootCerts::PlatformVerifier)
        .build();

    Agent::config_builder()
        .tls_config(tls_config)
        .timeout_global(Some(timeout))
        .build()
        .into()
}

/// Network and filesystem fetcher driven by [`FetchConfig`].
pub struct HttpFetcher {
    agent: Agent,
    config: FetchConfig,
}

impl HttpFetcher {
    pub fn new(config: FetchConfig) -> Self {
        Self {
            agent: agent(Duration::from_secs(config.timeout_secs)),
            config,
        }
    }

    /// Apply the scheme policy to `url`.
    ///
    /// Strings that do not parse as absolute URLs are treated as local paths
    /// (native panics and server-side stacks report those).
    pub fn classify(&self, url: &str) -> Result<FetchTarget, FetchError> {
        match url::Url::parse(url) {
            Ok(parsed) => match parsed.scheme() {
                "https" => Ok(FetchTarget::Http(url.to_string())),
                "http" if self.config.allow_http => Ok(FetchTarget::Http(url.to_string())),
                "file" if self.config.allow_file => parsed
                    .to_file_path()
                    .map(FetchTarget::File)
                    .map_err(|_| FetchError::InvalidUrl {
                        url: url.to_string(),
                        reason: "file URL has no local path".to_string(),
                    }),
                scheme => Err(FetchError::UnsupportedScheme {
                    scheme: scheme.to_string(),
                    url: url.to_string(),
                }),
            },
            Err(url::ParseError::RelativeUrlWithoutBase) if self.config.allow_file => {
                Ok(FetchTarget::File(PathBuf::from(url)))
            }
            Err(e) => Err(FetchError::InvalidUrl {
                url: url.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    fn fetch_http(&self, url: &str) -> Result<String, FetchError> {
        let mut response = self
            .agent
            .get(url)
            .header("User-Agent", self.config.user_agent.as_str())
            .call()
            .map_err(|e| match e {
                ureq::Error::StatusCode(status) => FetchError::Status {
                    url: url.to_string(),
                    status,
                },
                source => FetchError::Request {
                    url: url.to_string(),
                    source,
                },
            })?;

        response
            .body_mut()
            .with_config()
            .limit(self.config.max_body_bytes)
            .read_to_string()
            .map_err(|e| FetchError::Body {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }

    fn fetch_file(&self, path: &PathBuf) -> Result<String, FetchError> {
        let display = path.display().to_string();
        let metadata = std::fs::metadata(path).map_err(|source| FetchError::Io {
            path: display.clone(),
            source,
        })?;
        if metadata.len() > self.config.max_body_bytes {
            return Err(FetchError::Body {
                url: display,
                reason: format!(
                    "file is {} bytes, limit is {}",
                    metadata.len(),
                    self.config.max_body_bytes
                ),
            });
        }
        std::fs::read_to_string(path).map_err(|source| FetchError::Io {
            path: display,
            source,
        })
    }
}

impl TextFetcher for HttpFetcher {
    fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        match self.classify(url)? {
            FetchTarget::Http(url) => {
                log::debug!(target: "fetch", "GET {}", url);
                self.fetch_http(&url)
            }
            FetchTarget::File(path) => {
                log::debug!(target: "fetch", "read {:?}", path);
                self.fetch_file(&path)
            }
        }
    }
}

struct Gate {
    open: Mutex<bool>,
    cond: Condvar,
}

/// Holds fetches of one URL in flight until released or dropped.
pub struct GateHandle(Arc<Gate>);

impl GateHandle {
    pub fn release(&self) {
        let mut open = self.0.open.lock();
        *open = true;
        self.0.cond.notify_all();
    }
}

impl Drop for GateHandle {
    fn drop(&mut self) {
        self.release();
    }
}

/// In-memory fetcher keyed by exact URL string.
#[derive(Default)]
pub struct StaticFetcher {
    entries: Mutex<HashMap<String, String>>,
    counts: Mutex<HashMap<String, usize>>,
    gates: Mutex<HashMap<String, Arc<Gate>>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the text served for `url`.
    pub fn insert(&self, url: impl Into<String>, text: impl Into<String>) {
        self.entries.lock().insert(url.into(), text.into());
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(self, url: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(url, text);
        self
    }

    /// Number of fetches issued for `url`, including failed ones.
    pub fn fetch_count(&self, url: &str) -> usize {
        self.counts.lock().get(url).copied().unwrap_or(0)
    }

    pub fn total_fetches(&self) -> usize {
        self.counts.lock().values().sum()
    }

    /// Block fetches of `url` until the returned handle is released.
    pub fn hold(&self, url: impl Into<String>) -> GateHandle {
        let gate = Arc::new(Gate {
            open: Mutex::new(false),
            cond: Condvar::new(),
        });
        self.gates.lock().insert(url.into(), Arc::clone(&gate));
        GateHandle(gate)
    }
}

impl TextFetcher for StaticFetcher {
    fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        *self.counts.lock().entry(url.to_string()).or_insert(0) += 1;

        let gate = self.gates.lock().get(url).cloned();
        if let Some(gate) = gate {
            let mut open = gate.open.lock();
            while !*open {
                gate.cond.wait(&mut open);
            }
        }

        self.entries
            .lock()
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(url.to_string()))
    }
}
