//! Serde default helpers for `OverlayConfig`.

/// Version string baked into the default user agent.
pub const CRATE_VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn bool_true() -> bool {
    true
}

pub fn bool_false() -> bool {
    false
}

pub fn fetch_timeout_secs() -> u64 {
    10
}

/// 10 MB. Bundles with inline source maps routinely exceed 1 MB.
pub fn max_body_bytes() -> u64 {
    10 * 1024 * 1024
}

pub fn user_agent() -> String {
    format!("error-overlay/{CRATE_VERSION}")
}

pub fn excerpt_context_before() -> usize {
    4
}

pub fn excerpt_context_after() -> usize {
    4
}
