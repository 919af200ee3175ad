//! Source map (v3) position mapping.
//!
//! A [`PositionMap`] translates generated `(line, column)` positions back to
//! original `(source, line, column, name)` tuples and serves the original
//! source text embedded in `sourcesContent`.
//!
//! Conventions: lines are 1-based and columns 0-based on both sides of the
//! lookup, matching what browsers report and what `source-map` consumers use.
//! Reported columns are passed through as-is; no off-by-one correction.

pub mod discovery;
pub mod vlq;

use crate::error::PositionMapError;
use serde::Deserialize;
use std::sync::Arc;
use vlq::Mapping;

pub use discovery::{MapLocation, find_source_mapping_url, locate, resolve_relative};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSourceMap {
    version: u32,
    #[serde(default)]
    source_root: Option<String>,
    #[serde(default)]
    sources: Vec<Option<String>>,
    #[serde(default)]
    sources_content: Vec<Option<String>>,
    #[serde(default)]
    names: Vec<String>,
    #[serde(default)]
    mappings: String,
    #[serde(default)]
    sections: Option<serde_json::Value>,
}

/// Original location for a generated position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginalPosition {
    pub source: String,
    /// 1-based
    pub line: u32,
    /// 0-based
    pub column: u32,
    pub name: Option<String>,
}

/// A parsed source map.
#[derive(Debug)]
pub struct PositionMap {
    sources: Vec<String>,
    contents: Vec<Option<Arc<str>>>,
    names: Vec<String>,
    lines: Vec<Vec<Mapping>>,
    map_url: Option<String>,
}

fn apply_source_root(root: Option<&str>, source: &str) -> String {
    match root {
        Some(root) if !root.is_empty() && url::Url::parse(source).is_err() && !source.starts_with('/') => {
            format!("{}/{}", root.trim_end_matches('/'), source)
        }
        _ => source.to_string(),
    }
}

impl PositionMap {
    /// Parse source map JSON.
    pub fn from_json(text: &str) -> Result<Self, PositionMapError> {
        let raw: RawSourceMap = serde_json::from_str(text)?;
        if raw.sections.is_some() {
            return Err(PositionMapError::IndexedMap);
        }
        if raw.version != 3 {
            return Err(PositionMapError::UnsupportedVersion(raw.version));
        }

        let lines = vlq::decode_mappings(&raw.mappings)?;
        let root = raw.source_root.as_deref();
        let sources = raw
            .sources
            .iter()
            .map(|s| apply_source_root(root, s.as_deref().unwrap_or_default()))
            .collect::<Vec<_>>();
        let mut contents = raw
            .sources_content
            .into_iter()
            .map(|c| c.map(Arc::from))
            .collect::<Vec<Option<Arc<str>>>>();
        contents.resize(sources.len(), None);

        Ok(Self {
            sources,
            contents,
            names: raw.names,
            lines,
            map_url: None,
        })
    }

    /// Record the URL the map was loaded from; relative `sources` resolve
    /// against it.
    pub fn with_map_url(mut self, url: impl Into<String>) -> Self {
        self.map_url = Some(url.into());
        self
    }

    pub fn map_url(&self) -> Option<&str> {
        self.map_url.as_deref()
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Look up the original position for a generated one.
    ///
    /// Picks the closest segment at or before `column` on `line`. Returns
    /// `None` when the line has no such segment or the segment carries no
    /// source.
    pub fn original_position_for(&self, line: u32, column: u32) -> Option<OriginalPosition> {
        let segments = self.lines.get(line.checked_sub(1)? as usize)?;
        let idx = segments.partition_point(|m| m.generated_column <= column);
        let mapping = segments.get(idx.checked_sub(1)?)?;
        let source = self.sources.get(mapping.source? as usize)?;

        Some(OriginalPosition {
            source: source.clone(),
            line: mapping.original_line + 1,
            column: mapping.original_column,
            name: mapping.name.and_then(|n| self.names.get(n as usize).cloned()),
        })
    }

    /// Embedded original text for `source`, if the map carries it.
    pub fn source_content_for(&self, source: &str) -> Option<Arc<str>> {
        let idx = self.sources.iter().position(|s| s == source)?;
        self.contents.get(idx).cloned().flatten()
    }

    /// URL to fetch `source` from when it has no embedded content.
    pub fn resolve_source_url(&self, source: &str) -> Option<String> {
        match &self.map_url {
            Some(base) => resolve_relative(base, source).ok(),
            None => Some(source.to_string()),
        }
    }
}
