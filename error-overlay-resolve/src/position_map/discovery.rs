//! Locating the source map that belongs to a delivered script.

use crate::error::PositionMapError;
use base64::Engine as _;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// Regex for `//# sourceMappingURL=...` directives, including the legacy `//@`
/// form and the `/*# ... */` form emitted for stylesheets.
fn directive_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?m)(?://|/\*)[#@][ \t]*sourceMappingURL=([^\s'"*]+)"#)
            .expect("source map directive regex is valid")
    })
}

/// Where the map text comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapLocation {
    /// Decoded text of an inline `data:` map.
    Inline(String),
    /// Absolute URL (or path) of an external map.
    External(String),
}

/// The reference named by the last directive in `text`, if any.
pub fn find_source_mapping_url(text: &str) -> Option<&str> {
    directive_regex()
        .captures_iter(text)
        .last()
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Turn a directive reference into a [`MapLocation`], resolving external
/// references against `script_url`.
pub fn locate(script_url: &str, reference: &str) -> Result<MapLocation, PositionMapError> {
    if let Some(data) = reference.strip_prefix("data:") {
        return decode_data_uri(data).map(MapLocation::Inline);
    }
    resolve_relative(script_url, reference).map(MapLocation::External)
}

fn decode_data_uri(data: &str) -> Result<String, PositionMapError> {
    let (header, payload) = data
        .split_once(',')
        .ok_or_else(|| PositionMapError::InlineData("missing ',' in data URI".to_string()))?;

    if !header.split(';').any(|part| part.eq_ignore_ascii_case("base64")) {
        return Ok(payload.to_string());
    }

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| PositionMapError::InlineData(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| PositionMapError::InlineData(e.to_string()))
}

/// Resolve `reference` against `base`.
///
/// URL bases use standard URL joining. Plain filesystem paths (native stack
/// traces) are joined against the base's parent directory.
pub fn resolve_relative(base: &str, reference: &str) -> Result<String, PositionMapError> {
    if url::Url::parse(reference).is_ok() {
        return Ok(reference.to_string());
    }

    match url::Url::parse(base) {
        Ok(base_url) => base_url
            .join(reference)
            .map(|u| u.to_string())
            .map_err(|_| PositionMapError::Unresolvable {
                reference: reference.to_string(),
                base: base.to_string(),
            }),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let joined = match Path::new(base).parent() {
                Some(parent) => parent.join(reference),
                None => Path::new(reference).to_path_buf(),
            };
            Ok(joined.to_string_lossy().into_owned())
        }
        Err(_) => Err(PositionMapError::Unresolvable {
            reference: reference.to_string(),
            base: base.to_string(),
        }),
    }
}
