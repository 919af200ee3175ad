//! The overlay's public surface.
//!
//! [`OverlayController`] owns the capture coordinator (and through it the
//! queue), the compiled-mode flag and the frame resolver. Every method runs on
//! the control thread; resolution happens on the tokio runtime and lands via
//! [`OverlayController::poll`] / [`OverlayController::pump`].
//!
//! Resolved state is kept only for the failure being viewed. Queue mutations
//! drop the slots of failures that are no longer current; a mode toggle
//! re-requests every kept slot.

use crate::capture::{AmbientFailureHub, CaptureCoordinator, ErrorCallback, Protected};
use crate::contract;
use crate::excerpt::CodeExcerpt;
use crate::failure::{CapturedFailure, FailureId, FailureOrigin, FailurePayload};
use crate::stack_parser;
use crate::view::{FrameView, OverlayAction, OverlayView, RenderProps};
use error_overlay_config::{ExcerptConfig, OverlayConfig};
use error_overlay_resolve::{
    ArtifactCache, FrameKey, FrameResolver, RawFrame, Resolution, ResolvedFrameState,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

/// A frame of the current failure with its latest resolved state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSnapshot {
    pub raw: RawFrame,
    pub state: ResolvedFrameState,
    pub pending: bool,
}

pub struct OverlayController {
    capture: CaptureCoordinator,
    resolver: FrameResolver,
    compiled: bool,
    excerpt: ExcerptConfig,
    capture_panics: bool,
    mounted: bool,
    observed: Option<FailureId>,
}

impl OverlayController {
    pub fn new(
        config: &OverlayConfig,
        runtime: Handle,
        cache: Arc<ArtifactCache>,
        hub: AmbientFailureHub,
    ) -> Self {
        Self {
            capture: CaptureCoordinator::new(hub),
            resolver: FrameResolver::new(runtime, cache),
            compiled: config.start_compiled,
            excerpt: config.excerpt,
            capture_panics: config.capture_panics,
            mounted: false,
            observed: None,
        }
    }

    /// Builder-style [`set_on_error`](Self::set_on_error).
    pub fn with_on_error(mut self, callback: impl FnMut(&CapturedFailure) + 'static) -> Self {
        let callback: ErrorCallback = Box::new(callback);
        self.set_on_error(Some(callback));
        self
    }

    pub fn set_on_error(&mut self, callback: Option<ErrorCallback>) {
        self.capture.set_on_error(callback);
    }

    /// Start listening for ambient failures.
    pub fn mount(&mut self) {
        if self.mounted {
            return;
        }
        self.capture.mount(self.capture_panics);
        self.mounted = true;
        log::info!(target: "overlay", "mounted (compiled={})", self.compiled);
    }

    /// Stop listening and discard the overlay's state.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.capture.unmount();
        self.capture.reset();
        self.resolver.clear();
        self.observed = None;
        self.mounted = false;
        log::info!(target: "overlay", "unmounted");
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    // --- navigation and mode -------------------------------------------------

    pub fn go_prev(&mut self) {
        self.capture.queue_mut().go_prev();
        self.sync_observed();
    }

    pub fn go_next(&mut self) {
        self.capture.queue_mut().go_next();
        self.sync_observed();
    }

    /// Flip compiled mode and re-resolve every displayed frame.
    pub fn toggle_compiled_mode(&mut self) {
        self.compiled = !self.compiled;
        self.resolver.invalidate_all(self.compiled);
        log::debug!(target: "overlay", "compiled mode {}", self.compiled);
    }

    /// Clear all failures, leave the fallback and retry the protected subtree.
    pub fn reset_error(&mut self) {
        self.capture.reset();
        self.sync_observed();
    }

    pub fn dispatch(&mut self, action: OverlayAction) {
        match action {
            OverlayAction::GoPrev => self.go_prev(),
            OverlayAction::GoNext => self.go_next(),
            OverlayAction::ToggleCompiled => self.toggle_compiled_mode(),
            OverlayAction::ResetError => self.reset_error(),
        }
    }

    // --- read-only projections ----------------------------------------------

    pub fn current_failure(&self) -> Option<&CapturedFailure> {
        self.capture.queue().current()
    }

    /// 1-based cursor, `None` while no failure is queued.
    pub fn current_index(&self) -> Option<usize> {
        self.capture.queue().cursor()
    }

    pub fn total_count(&self) -> usize {
        self.capture.queue().len()
    }

    pub fn is_compiled(&self) -> bool {
        self.compiled
    }

    pub fn fallback_active(&self) -> bool {
        self.capture.fallback_active()
    }

    /// The overlay shows when a render failed or any failure is queued.
    pub fn is_visible(&self) -> bool {
        self.capture.fallback_active() || !self.capture.queue().is_empty()
    }

    pub fn resolver(&self) -> &FrameResolver {
        &self.resolver
    }

    // --- capture -------------------------------------------------------------

    /// Capture a failure reported directly by the host.
    pub fn push_failure(&mut self, value: FailurePayload, origin: FailureOrigin) -> FailureId {
        let id = self.capture.push_error(value, origin);
        self.sync_observed();
        id
    }

    /// Render the protected subtree; see [`CaptureCoordinator::render_protected`].
    pub fn render_protected<T>(&mut self, render: impl FnOnce() -> T) -> Protected<T> {
        let outcome = self.capture.render_protected(render);
        self.sync_observed();
        outcome
    }

    /// Queue pending ambient failures and apply finished resolutions.
    /// Returns the number of state changes.
    pub fn pump(&mut self) -> usize {
        let captured = self.capture.pump_ambient();
        if captured > 0 {
            self.sync_observed();
        }
        captured + self.resolver.poll()
    }

    /// Apply finished resolutions.
    pub fn poll(&mut self) -> usize {
        self.resolver.poll()
    }

    /// Block until every displayed frame is resolved or `timeout` passes.
    pub fn wait_settled(&mut self, timeout: Duration) -> bool {
        self.resolver.wait_settled(timeout)
    }

    // --- frames ----------------------------------------------------------------

    /// Raw frames of a failure's stack. Non-error payloads have none.
    pub fn frames_for(&self, failure: &CapturedFailure) -> Vec<RawFrame> {
        stack_parser::parse(&failure.value)
    }

    /// Resolved state of frame `index` of `failure`, requesting resolution
    /// under the current mode if needed.
    ///
    /// Slots are kept for the current failure and `failure` only; asking about
    /// another failure drops the previous one's.
    pub fn frame_state(&mut self, failure: &CapturedFailure, index: usize) -> Option<ResolvedFrameState> {
        let raw = self.frames_for(failure).into_iter().nth(index)?;
        let current = self.observed.map(|id| id.0);
        let asked = failure.id.0;
        self.resolver
            .retain(|key| key.failure == asked || Some(key.failure) == current);

        let key = FrameKey::new(asked, index);
        self.resolver.request(key, &raw, self.compiled);
        self.resolver.state(&key).cloned()
    }

    /// Every frame of the current failure with its latest state.
    pub fn current_frames(&mut self) -> Vec<FrameSnapshot> {
        if !self.mounted {
            contract::violation("StackFrames");
        }
        let Some(failure) = self.capture.queue().current() else {
            return Vec::new();
        };
        let id = failure.id;
        let frames = stack_parser::parse(&failure.value);

        frames
            .into_iter()
            .enumerate()
            .map(|(index, raw)| {
                let key = FrameKey::new(id.0, index);
                self.resolver.request(key, &raw, self.compiled);
                let state = self
                    .resolver
                    .state(&key)
                    .cloned()
                    .unwrap_or_else(|| ResolvedFrameState::from_raw(&raw));
                let pending = self.resolver.is_pending(&key);
                FrameSnapshot {
                    raw,
                    state,
                    pending,
                }
            })
            .collect()
    }

    // --- presentation ------------------------------------------------------

    /// Overlay state for presentation components. `None` while nothing is
    /// queued.
    pub fn render_props(&self) -> Option<RenderProps<'_>> {
        if !self.mounted {
            contract::violation("RenderProps");
        }
        let queue = self.capture.queue();
        Some(RenderProps {
            error: queue.current()?,
            current_count: queue.cursor()?,
            max_count: queue.len(),
            is_compiled: self.compiled,
            fallback: self.capture.fallback_active(),
        })
    }

    /// Drive `view` with the current failure and its frames. The action the
    /// view returns is dispatched before returning it.
    pub fn render(&mut self, view: &mut dyn OverlayView) -> Option<OverlayAction> {
        if !self.mounted {
            contract::violation("ErrorOverlay view");
        }
        if !self.is_visible() {
            return None;
        }

        let frames = self.current_frames();
        let action = {
            let props = self.render_props()?;
            view.overlay(&props)
        };

        for (index, frame) in frames.iter().enumerate() {
            let excerpt = CodeExcerpt::for_frame(&frame.state, &self.excerpt);
            let entry = FrameView {
                index,
                raw: &frame.raw,
                state: &frame.state,
                excerpt,
                pending: frame.pending,
            };
            if frame.state.resolution == Resolution::Raw || self.compiled {
                view.compiled_frame(&entry);
            } else {
                view.original_frame(&entry);
            }
        }

        if let Some(action) = action {
            self.dispatch(action);
        }
        action
    }

    fn sync_observed(&mut self) {
        let current = self.capture.queue().current().map(|f| f.id);
        if current == self.observed {
            return;
        }
        self.observed = current;
        match current {
            Some(id) => self.resolver.retain(|key| key.failure == id.0),
            None => self.resolver.clear(),
        }
    }
}
