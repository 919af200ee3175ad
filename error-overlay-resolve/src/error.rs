//! Typed error types for error-overlay-resolve.
//!
//! None of these reach overlay state: the artifact cache absorbs every
//! variant into "nothing obtained" and the resolver falls back to the
//! next-best display. They exist so fetchers and tests can tell failure
//! modes apart and so log lines carry a precise reason.

use thiserror::Error;

/// Errors produced while fetching artifact text.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The URL could not be parsed or could not be mapped to a file path.
    #[error("Invalid artifact URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The URL scheme is not allowed by the fetch configuration.
    #[error("URL scheme '{scheme}' is not allowed for artifact fetches: {url}")]
    UnsupportedScheme { scheme: String, url: String },

    /// The HTTP request failed before a response was received.
    #[error("HTTP request failed for {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: ureq::Error,
    },

    /// The server answered with a non-success status.
    #[error("HTTP status {status} for {url}")]
    Status { url: String, status: u16 },

    /// The response body could not be read or exceeded the size limit.
    #[error("Failed to read response body from {url}: {reason}")]
    Body { url: String, reason: String },

    /// Reading a local file failed.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The in-memory fetcher has no entry for the URL.
    #[error("No artifact registered for {0}")]
    NotFound(String),
}

/// Errors produced while locating or parsing a position-mapping artifact.
#[derive(Debug, Error)]
pub enum PositionMapError {
    /// The map is not valid JSON or does not have the expected shape.
    #[error("Source map JSON is invalid: {0}")]
    Json(#[from] serde_json::Error),

    /// Only version 3 source maps are understood.
    #[error("Unsupported source map version {0}")]
    UnsupportedVersion(u32),

    /// Indexed (sectioned) source maps are not supported.
    #[error("Indexed source maps with sections are not supported")]
    IndexedMap,

    /// The `mappings` string is malformed.
    #[error("Invalid mappings at segment {segment}: {reason}")]
    InvalidMappings { segment: usize, reason: String },

    /// An inline `data:` URI could not be decoded.
    #[error("Invalid inline source map: {0}")]
    InlineData(String),

    /// The directive could not be resolved against the script URL.
    #[error("Cannot resolve source map URL '{reference}' against '{base}'")]
    Unresolvable { reference: String, base: String },
}
