// Library exports for testing and host integration
//
// # Threading model
//
// The overlay itself (`OverlayController`, `CaptureCoordinator`, `ErrorQueue`)
// lives on one control thread and is mutated only from there. Work that may
// happen elsewhere is funnelled through two points:
//
//   - `AmbientFailureHub`: any thread reports failures; the control thread
//     drains them with `OverlayController::pump`.
//
//   - `FrameResolver`: artifact fetches run on the tokio runtime; results come
//     back over a channel and are applied by `OverlayController::poll` / `pump`.
//
// Shared buffers use `parking_lot::Mutex`; nothing here holds a lock across
// an `.await`.

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod debug;

pub mod capture;
pub mod cli;
pub mod contract;
pub mod controller;
pub mod excerpt;
pub mod failure;
pub mod queue;
pub mod stack_parser;
pub mod view;

pub use error_overlay_config as config;
pub use error_overlay_resolve as resolve;

pub use capture::{AmbientFailureHub, CaptureCoordinator, ErrorCallback, PanicHookGuard, Protected};
pub use contract::ContractViolation;
pub use controller::{FrameSnapshot, OverlayController};
pub use excerpt::{CodeExcerpt, ExcerptLine};
pub use failure::{CapturedFailure, ErrorValue, FailureId, FailureOrigin, FailurePayload};
pub use queue::ErrorQueue;
pub use view::{FrameView, OverlayAction, OverlayView, RenderProps, TextView};
