//! Failure capture.
//!
//! [`CaptureCoordinator`] bridges the two failure sources into the
//! [`ErrorQueue`]:
//! - ambient failures, received through an [`AmbientFailureHub`] subscription
//!   (and optionally the panic hook) while the overlay is mounted
//! - render-time failures, caught by the [`FailureBoundary`] around the
//!   protected subtree
//!
//! Both go through [`CaptureCoordinator::push_error`], so the `on_error`
//! callback sees every failure once, in arrival order, before it is queued.

pub mod ambient;
pub mod boundary;

pub use ambient::{AmbientFailureHub, AmbientSubscription, PanicHookGuard};
pub use boundary::FailureBoundary;

use crate::failure::{CapturedFailure, FailureId, FailureOrigin, FailurePayload};
use crate::queue::ErrorQueue;

/// Host callback run for every captured failure before it is queued.
/// Panics inside it propagate to the caller.
pub type ErrorCallback = Box<dyn FnMut(&CapturedFailure)>;

/// Outcome of rendering the protected subtree.
#[derive(Debug, PartialEq, Eq)]
pub enum Protected<T> {
    /// The subtree rendered normally.
    Content(T),
    /// The subtree failed (now or earlier); show the fallback overlay instead.
    Fallback,
}

pub struct CaptureCoordinator {
    queue: ErrorQueue,
    boundary: FailureBoundary,
    on_error: Option<ErrorCallback>,
    next_id: u64,
    hub: AmbientFailureHub,
    subscription: Option<AmbientSubscription>,
    panic_hook: Option<PanicHookGuard>,
}

impl CaptureCoordinator {
    pub fn new(hub: AmbientFailureHub) -> Self {
        Self {
            queue: ErrorQueue::new(),
            boundary: FailureBoundary::new(),
            on_error: None,
            next_id: 1,
            hub,
            subscription: None,
            panic_hook: None,
        }
    }

    pub fn set_on_error(&mut self, callback: Option<ErrorCallback>) {
        self.on_error = callback;
    }

    /// Subscribe to ambient failures; with `capture_panics`, also install the
    /// panic hook. Idempotent.
    pub fn mount(&mut self, capture_panics: bool) {
        if self.subscription.is_none() {
            self.subscription = Some(self.hub.subscribe());
            log::info!(target: "capture", "subscribed to ambient failures");
        }
        if capture_panics && self.panic_hook.is_none() {
            self.panic_hook = Some(PanicHookGuard::install(self.hub.clone()));
        }
    }

    /// Release both ambient sources. Failures reported but not yet pumped are
    /// dropped with the subscription.
    pub fn unmount(&mut self) {
        // Hook first so panics can't land in a dropped subscription's buffer.
        self.panic_hook = None;
        if self.subscription.take().is_some() {
            log::info!(target: "capture", "unsubscribed from ambient failures");
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn hub(&self) -> &AmbientFailureHub {
        &self.hub
    }

    /// Record one failure: notify `on_error`, then enqueue.
    pub fn push_error(&mut self, value: FailurePayload, origin: FailureOrigin) -> FailureId {
        let failure = CapturedFailure {
            id: FailureId(self.next_id),
            value,
            origin,
        };
        self.next_id += 1;

        log::info!(
            target: "capture",
            "captured {} failure {}: {}",
            match origin {
                FailureOrigin::Ambient => "ambient",
                FailureOrigin::RenderTime => "render-time",
            },
            failure.id,
            failure.value
        );

        if let Some(callback) = self.on_error.as_mut() {
            callback(&failure);
        }

        let id = failure.id;
        self.queue.push(failure);
        id
    }

    /// Move ambient failures reported since the last pump into the queue, in
    /// arrival order. Returns how many were queued.
    pub fn pump_ambient(&mut self) -> usize {
        let pending = match &self.subscription {
            Some(subscription) => subscription.drain(),
            None => return 0,
        };
        let count = pending.len();
        for payload in pending {
            self.push_error(payload, FailureOrigin::Ambient);
        }
        count
    }

    /// Render the protected subtree through the boundary.
    ///
    /// While the boundary is tripped the subtree is not run at all. A failure
    /// escaping `render` trips it and is queued.
    pub fn render_protected<T>(&mut self, render: impl FnOnce() -> T) -> Protected<T> {
        if self.boundary.is_tripped() {
            return Protected::Fallback;
        }
        match self.boundary.run(render) {
            Ok(content) => Protected::Content(content),
            Err(payload) => {
                self.push_error(payload, FailureOrigin::RenderTime);
                Protected::Fallback
            }
        }
    }

    /// Clear the queue, leave the fallback, and let the boundary retry, as
    /// one update.
    pub fn reset(&mut self) {
        self.queue.reset();
        self.boundary.retry();
        log::info!(target: "capture", "reset");
    }

    pub fn queue(&self) -> &ErrorQueue {
        &self.queue
    }

    pub(crate) fn queue_mut(&mut self) -> &mut ErrorQueue {
        &mut self.queue
    }

    /// The fallback stands in for the protected subtree until [`reset`](Self::reset).
    pub fn fallback_active(&self) -> bool {
        self.boundary.is_tripped()
    }

    pub fn boundary(&self) -> &FailureBoundary {
        &self.boundary
    }
}

impl Drop for CaptureCoordinator {
    fn drop(&mut self) {
        self.unmount();
    }
}
