//! Source excerpts around a frame's line, and the language hint handed to
//! the host's syntax highlighter.

use error_overlay_config::ExcerptConfig;
use error_overlay_resolve::ResolvedFrameState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcerptLine {
    /// 1-based
    pub number: usize,
    pub text: String,
    pub highlighted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeExcerpt {
    pub lines: Vec<ExcerptLine>,
    pub language: Option<String>,
}

impl CodeExcerpt {
    /// Lines `line - before ..= line + after` of `content`, clamped to the
    /// text. `None` when `line` is 0 or past the end.
    pub fn around(content: &str, line: usize, config: &ExcerptConfig) -> Option<Self> {
        let all: Vec<&str> = content.lines().collect();
        if line == 0 || line > all.len() {
            return None;
        }
        let first = line.saturating_sub(config.context_before).max(1);
        let last = line.saturating_add(config.context_after).min(all.len());

        let lines = (first..=last)
            .map(|number| ExcerptLine {
                number,
                text: all[number - 1].to_string(),
                highlighted: number == line,
            })
            .collect();
        Some(Self {
            lines,
            language: None,
        })
    }

    /// Excerpt for a resolved frame, if it has content and a line.
    pub fn for_frame(state: &ResolvedFrameState, config: &ExcerptConfig) -> Option<Self> {
        let content = state.content.as_deref()?;
        let line = state.line_number? as usize;
        let mut excerpt = Self::around(content, line, config)?;
        excerpt.language = state.file_name.as_deref().and_then(language_hint);
        Some(excerpt)
    }
}

/// File extension of `file_name` with any query or fragment removed.
pub fn language_hint(file_name: &str) -> Option<String> {
    let path = file_name
        .split(['?', '#'])
        .next()
        .unwrap_or(file_name);
    let base = path.rsplit(['/', '\\']).next().unwrap_or(path);
    let (stem, ext) = base.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}
