//! Presentation contract.
//!
//! The host supplies an [`OverlayView`]; the controller drives it with
//! [`RenderProps`] and one call per stack frame. Frames that have not been
//! resolved yet, and every frame in compiled mode, go to
//! [`OverlayView::compiled_frame`]; the rest go to
//! [`OverlayView::original_frame`].
//!
//! [`TextView`] is a plain-text implementation used by the CLI.

use crate::excerpt::CodeExcerpt;
use crate::failure::CapturedFailure;
use error_overlay_resolve::{RawFrame, ResolvedFrameState};
use std::io::{self, Write};

/// Overlay state handed to the view.
#[derive(Debug, Clone, Copy)]
pub struct RenderProps<'a> {
    pub error: &'a CapturedFailure,
    /// 1-based position of `error` in the queue
    pub current_count: usize,
    pub max_count: usize,
    pub is_compiled: bool,
    /// The overlay stands in for a subtree that failed to render
    pub fallback: bool,
}

/// User intents a view can report back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayAction {
    GoPrev,
    GoNext,
    ToggleCompiled,
    ResetError,
}

/// One frame as presented.
#[derive(Debug, Clone)]
pub struct FrameView<'a> {
    pub index: usize,
    pub raw: &'a RawFrame,
    pub state: &'a ResolvedFrameState,
    pub excerpt: Option<CodeExcerpt>,
    /// Resolution for the current inputs has not landed yet
    pub pending: bool,
}

pub trait OverlayView {
    /// Render the overlay chrome. Returns the action the user took, if any.
    fn overlay(&mut self, props: &RenderProps<'_>) -> Option<OverlayAction>;

    fn compiled_frame(&mut self, frame: &FrameView<'_>);

    fn original_frame(&mut self, frame: &FrameView<'_>);
}

/// Writes the overlay as text. Never reports an action.
pub struct TextView<W: Write> {
    out: W,
    error: Option<io::Error>,
}

impl<W: Write> TextView<W> {
    pub fn new(out: W) -> Self {
        Self { out, error: None }
    }

    /// The writer, or the first write error.
    pub fn finish(mut self) -> io::Result<W> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        self.out.flush()?;
        Ok(self.out)
    }

    fn emit(&mut self, text: std::fmt::Arguments<'_>) {
        if self.error.is_none()
            && let Err(e) = self.out.write_fmt(text)
        {
            self.error = Some(e);
        }
    }

    fn frame(&mut self, frame: &FrameView<'_>, tag: &str) {
        let state = frame.state;
        let function = state.function_name.as_deref().unwrap_or("<anonymous>");
        let prefix = if state.is_constructor { "new " } else { "" };
        let location = match state.location() {
            Some(location) => location,
            None if state.is_native => "native".to_string(),
            None => "<unknown>".to_string(),
        };
        let pending = if frame.pending { " (resolving)" } else { "" };
        self.emit(format_args!(
            "  {}. {prefix}{function} ({location}) [{tag}]{pending}\n",
            frame.index + 1
        ));

        if let Some(excerpt) = &frame.excerpt {
            let width = excerpt
                .lines
                .last()
                .map_or(1, |l| l.number.to_string().len());
            for line in &excerpt.lines {
                let marker = if line.highlighted { ">" } else { " " };
                self.emit(format_args!(
                    "     {marker} {:>width$} | {}\n",
                    line.number, line.text
                ));
            }
        }
    }
}

impl<W: Write> OverlayView for TextView<W> {
    fn overlay(&mut self, props: &RenderProps<'_>) -> Option<OverlayAction> {
        let mode = if props.is_compiled { "compiled" } else { "original" };
        self.emit(format_args!(
            "Error {} of {} [{mode}]{}\n{}\n",
            props.current_count,
            props.max_count,
            if props.fallback { " (render failed)" } else { "" },
            props.error.value
        ));
        None
    }

    fn compiled_frame(&mut self, frame: &FrameView<'_>) {
        self.frame(frame, "compiled");
    }

    fn original_frame(&mut self, frame: &FrameView<'_>) {
        self.frame(frame, "original");
    }
}
