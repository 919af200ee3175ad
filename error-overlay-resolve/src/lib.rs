//! Stack frame source resolution for the error overlay.
//!
//! Provides:
//! - `frame`: raw and resolved stack frame types
//! - `http`: the `TextFetcher` seam, a ureq-backed fetcher, and an in-memory fetcher
//! - `position_map`: source map (v3) parsing, VLQ decoding, and directive discovery
//! - `cache`: `ArtifactCache`, a coalescing per-URL text and position-map cache
//! - `resolver`: the resolution algorithm and `FrameResolver`, which runs it on
//!   a tokio runtime and suppresses stale results by generation

pub mod cache;
pub mod error;
pub mod frame;
pub mod http;
pub mod position_map;
pub mod resolver;

pub use cache::{ArtifactCache, CacheStats};
pub use error::{FetchError, PositionMapError};
pub use frame::{RawFrame, Resolution, ResolvedFrameState};
pub use http::{HttpFetcher, StaticFetcher, TextFetcher};
pub use position_map::{OriginalPosition, PositionMap};
pub use resolver::{FrameKey, FrameResolver, resolve_frame};
