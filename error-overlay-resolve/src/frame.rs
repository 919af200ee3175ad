//! Raw and resolved stack frame types.

use std::sync::Arc;

/// One stack line as reported by the failing runtime.
///
/// Produced by the stack parser; never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RawFrame {
    pub function_name: Option<String>,
    pub file_name: Option<String>,
    pub line_number: Option<u32>,
    pub column_number: Option<u32>,
    pub is_constructor: bool,
    pub is_eval: bool,
    pub is_native: bool,
    pub is_top_level: bool,
}

impl RawFrame {
    /// Frame with a location and no other detail.
    pub fn at(file_name: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file_name: Some(file_name.into()),
            line_number: Some(line),
            column_number: Some(column),
            ..Self::default()
        }
    }

    /// Builder-style function name setter.
    pub fn with_function(mut self, name: impl Into<String>) -> Self {
        self.function_name = Some(name.into());
        self
    }
}

/// How far resolution got for a frame.
///
/// Presentation uses this to choose between the compiled and original
/// frame views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resolution {
    /// Nothing beyond the raw frame: resolution pending, no file name, or
    /// no text could be obtained.
    #[default]
    Raw,
    /// Location is the as-delivered one; `content` is the delivered text.
    Compiled,
    /// Location was mapped back to the original source.
    Original,
}

/// Display state for one frame under one compiled-mode setting.
///
/// Replaced wholesale whenever the frame or the mode changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFrameState {
    pub file_name: Option<String>,
    pub function_name: Option<String>,
    pub line_number: Option<u32>,
    pub column_number: Option<u32>,
    pub content: Option<Arc<str>>,
    pub is_constructor: bool,
    pub is_eval: bool,
    pub is_native: bool,
    pub is_top_level: bool,
    pub resolution: Resolution,
}

impl ResolvedFrameState {
    /// The frame's own fields with no content.
    pub fn from_raw(frame: &RawFrame) -> Self {
        Self {
            file_name: frame.file_name.clone(),
            function_name: frame.function_name.clone(),
            line_number: frame.line_number,
            column_number: frame.column_number,
            content: None,
            is_constructor: frame.is_constructor,
            is_eval: frame.is_eval,
            is_native: frame.is_native,
            is_top_level: frame.is_top_level,
            resolution: Resolution::Raw,
        }
    }

    /// The frame's own location with the delivered text attached.
    pub fn compiled(frame: &RawFrame, content: Arc<str>) -> Self {
        Self {
            content: Some(content),
            resolution: Resolution::Compiled,
            ..Self::from_raw(frame)
        }
    }

    /// `file:line:column`, omitting absent parts. `None` without a file name.
    pub fn location(&self) -> Option<String> {
        let file = self.file_name.as_deref()?;
        let mut out = file.to_string();
        if let Some(line) = self.line_number {
            out.push_str(&format!(":{line}"));
            if let Some(column) = self.column_number {
                out.push_str(&format!(":{column}"));
            }
        }
        Some(out)
    }
}
