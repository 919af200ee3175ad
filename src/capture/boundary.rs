//! Render-time failure boundary.
//!
//! Runs a render closure under `catch_unwind`. A panic that escapes it trips
//! the boundary, which then stays tripped until [`FailureBoundary::retry`].
//!
//! The overlay's panic hook consults [`inside_boundary`] so a panic the
//! boundary is about to catch is not also reported as an ambient failure; it
//! hands the located payload to the boundary through [`record_caught`]
//! instead.

use crate::failure::FailurePayload;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};

thread_local! {
    static BOUNDARY_DEPTH: Cell<usize> = const { Cell::new(0) };
    static CAUGHT: RefCell<Option<FailurePayload>> = const { RefCell::new(None) };
}

/// Whether the current thread is running inside a boundary.
pub fn inside_boundary() -> bool {
    BOUNDARY_DEPTH.with(|depth| depth.get() > 0)
}

/// Stash the hook's view of a panic for the innermost boundary on this thread.
pub fn record_caught(payload: FailurePayload) {
    CAUGHT.with(|caught| *caught.borrow_mut() = Some(payload));
}

struct DepthGuard;

impl DepthGuard {
    fn enter() -> Self {
        BOUNDARY_DEPTH.with(|depth| depth.set(depth.get() + 1));
        DepthGuard
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        BOUNDARY_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

#[derive(Debug, Default)]
pub struct FailureBoundary {
    tripped: bool,
    retries: u64,
}

impl FailureBoundary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `render`, converting an escaping panic into its payload.
    pub fn run<T>(&mut self, render: impl FnOnce() -> T) -> Result<T, FailurePayload> {
        CAUGHT.with(|caught| caught.borrow_mut().take());

        let result = {
            let _depth = DepthGuard::enter();
            panic::catch_unwind(AssertUnwindSafe(render))
        };

        result.map_err(|payload| {
            self.tripped = true;
            CAUGHT
                .with(|caught| caught.borrow_mut().take())
                .unwrap_or_else(|| FailurePayload::from_panic_payload(payload.as_ref()))
        })
    }

    pub fn is_tripped(&self) -> bool {
        self.tripped
    }

    /// Allow the protected subtree to render again.
    pub fn retry(&mut self) {
        self.tripped = false;
        self.retries += 1;
    }

    pub fn retries(&self) -> u64 {
        self.retries
    }
}
