//! Integration tests for the OverlayController surface: pagination, frame
//! resolution wiring, mode toggling, and view dispatch.

mod common;

use common::{APP_JS_URL, TestOverlay, app_error, app_fetcher, app_js, error, test_config};
use error_overlay::resolve::{RawFrame, Resolution, ResolvedFrameState, StaticFetcher};
use error_overlay::{
    CapturedFailure, FailureId, FailureOrigin, FailurePayload, FrameView, OverlayAction,
    OverlayView, RenderProps,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

const SETTLE: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Overlay {
        current: usize,
        max: usize,
        compiled: bool,
        fallback: bool,
    },
    Compiled(usize, Option<String>),
    Original(usize, Option<String>),
}

/// Records every call and replies with a queued action once.
#[derive(Default)]
struct RecordingView {
    calls: Vec<Call>,
    reply: Option<OverlayAction>,
}

impl OverlayView for RecordingView {
    fn overlay(&mut self, props: &RenderProps<'_>) -> Option<OverlayAction> {
        self.calls.push(Call::Overlay {
            current: props.current_count,
            max: props.max_count,
            compiled: props.is_compiled,
            fallback: props.fallback,
        });
        self.reply.take()
    }

    fn compiled_frame(&mut self, frame: &FrameView<'_>) {
        self.calls
            .push(Call::Compiled(frame.index, frame.state.file_name.clone()));
    }

    fn original_frame(&mut self, frame: &FrameView<'_>) {
        self.calls
            .push(Call::Original(frame.index, frame.state.file_name.clone()));
    }
}

fn message(controller: &error_overlay::OverlayController) -> Option<String> {
    controller.current_failure().map(|f| f.value.to_string())
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

#[test]
fn test_pagination_over_pushed_failures() {
    let overlay = TestOverlay::new();
    let mut controller = overlay.controller(&app_fetcher());
    controller.mount();

    assert_eq!(controller.current_index(), None);
    assert!(!controller.is_visible());

    controller.push_failure(error("a"), FailureOrigin::Ambient);
    controller.push_failure(error("b"), FailureOrigin::Ambient);
    controller.push_failure(error("c"), FailureOrigin::Ambient);

    assert!(controller.is_visible());
    assert_eq!(controller.total_count(), 3);
    assert_eq!(controller.current_index(), Some(3));
    assert_eq!(message(&controller).as_deref(), Some("Error: a"));

    controller.go_next();
    assert_eq!(controller.current_index(), Some(1));
    assert_eq!(message(&controller).as_deref(), Some("Error: c"));

    controller.go_prev();
    assert_eq!(message(&controller).as_deref(), Some("Error: a"));

    controller.dispatch(OverlayAction::GoPrev);
    assert_eq!(message(&controller).as_deref(), Some("Error: b"));
}

#[test]
fn test_pump_queues_ambient_reports() {
    let overlay = TestOverlay::new();
    let mut controller = overlay.controller(&app_fetcher());
    controller.mount();

    overlay.hub.report(error("from a worker"));
    assert_eq!(controller.total_count(), 0);
    assert!(controller.pump() >= 1);
    assert_eq!(message(&controller).as_deref(), Some("Error: from a worker"));
}

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

#[test]
fn test_frames_for_non_error_payload_is_empty() {
    let overlay = TestOverlay::new();
    let mut controller = overlay.controller(&app_fetcher());
    controller.mount();

    controller.push_failure(
        FailurePayload::from_json(serde_json::json!({"code": 7})),
        FailureOrigin::Ambient,
    );
    let failure = controller.current_failure().unwrap().clone();
    assert!(controller.frames_for(&failure).is_empty());
    assert!(controller.current_frames().is_empty());
    assert!(controller.frame_state(&failure, 0).is_none());
}

#[test]
fn test_original_mode_resolves_through_map() {
    let overlay = TestOverlay::new();
    let mut controller = overlay.controller(&app_fetcher());
    controller.mount();
    controller.push_failure(app_error("x is undefined"), FailureOrigin::Ambient);

    let frames = controller.current_frames();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].raw, RawFrame::at(APP_JS_URL, 10, 4).with_function("t"));
    assert!(controller.wait_settled(SETTLE));

    let frames = controller.current_frames();
    let state = &frames[0].state;
    assert!(!frames[0].pending);
    assert_eq!(state.resolution, Resolution::Original);
    assert_eq!(state.file_name.as_deref(), Some("app.ts"));
    assert_eq!(state.line_number, Some(5));
    assert_eq!(state.column_number, Some(2));
    assert_eq!(state.function_name.as_deref(), Some("run"));
    assert!(state.content.as_deref().unwrap().contains("export function start()"));
}

#[test]
fn test_mode_toggle_switches_between_original_and_compiled() {
    let overlay = TestOverlay::new();
    let mut controller = overlay.controller(&app_fetcher());
    controller.mount();
    controller.push_failure(app_error("x is undefined"), FailureOrigin::Ambient);
    controller.current_frames();
    assert!(controller.wait_settled(SETTLE));

    let original = controller.current_frames().remove(0);
    assert_eq!(original.state.line_number, Some(5));

    controller.toggle_compiled_mode();
    assert!(controller.is_compiled());
    // The previous state stays visible while the new one is resolving.
    let during = controller.current_frames().remove(0);
    assert_eq!(during.state, original.state);

    assert!(controller.wait_settled(SETTLE));
    let compiled = controller.current_frames().remove(0);
    assert_eq!(compiled.state.resolution, Resolution::Compiled);
    assert_eq!(compiled.state.file_name.as_deref(), Some(APP_JS_URL));
    assert_eq!(compiled.state.line_number, Some(10));
    assert_eq!(compiled.state.column_number, Some(4));
    assert_eq!(compiled.state.content.as_deref(), Some(app_js().as_str()));
    assert_eq!(compiled.raw, original.raw);

    controller.dispatch(OverlayAction::ToggleCompiled);
    assert!(controller.wait_settled(SETTLE));
    assert_eq!(controller.current_frames().remove(0).state, original.state);
}

#[test]
fn test_toggle_while_resolving_keeps_newer_mode() {
    let overlay = TestOverlay::new();
    let fetcher = app_fetcher();
    let gate = fetcher.hold(APP_JS_URL);
    let mut controller = overlay.controller(&fetcher);
    controller.mount();
    controller.push_failure(app_error("x is undefined"), FailureOrigin::Ambient);

    controller.current_frames();
    controller.toggle_compiled_mode();
    gate.release();

    assert!(controller.wait_settled(SETTLE));
    let deadline = Instant::now() + SETTLE;
    while controller.resolver().discarded_count() == 0 && Instant::now() < deadline {
        controller.poll();
        std::thread::sleep(Duration::from_millis(5));
    }

    assert_eq!(controller.resolver().discarded_count(), 1);
    let state = controller.current_frames().remove(0).state;
    assert_eq!(state.resolution, Resolution::Compiled);
    assert_eq!(state.file_name.as_deref(), Some(APP_JS_URL));
    assert_eq!(state.line_number, Some(10));
}

#[test]
fn test_start_compiled_from_config() {
    let overlay = TestOverlay::new();
    let mut config = test_config();
    config.start_compiled = true;
    let mut controller = overlay.controller_with(&config, &app_fetcher());
    controller.mount();
    controller.push_failure(app_error("boom"), FailureOrigin::Ambient);

    controller.current_frames();
    assert!(controller.wait_settled(SETTLE));
    let state = controller.current_frames().remove(0).state;
    assert_eq!(state.file_name.as_deref(), Some(APP_JS_URL));
    assert_eq!(state.line_number, Some(10));
}

#[test]
fn test_failed_fetch_degrades_to_raw_frame() {
    let overlay = TestOverlay::new();
    let mut controller = overlay.controller(&Arc::new(StaticFetcher::new()));
    controller.mount();
    controller.push_failure(app_error("offline"), FailureOrigin::Ambient);

    controller.current_frames();
    assert!(controller.wait_settled(SETTLE));
    let frame = controller.current_frames().remove(0);
    assert_eq!(frame.state, ResolvedFrameState::from_raw(&frame.raw));
    assert!(frame.state.content.is_none());
}

#[test]
fn test_frame_state_requests_resolution() {
    let overlay = TestOverlay::new();
    let mut controller = overlay.controller(&app_fetcher());
    controller.mount();
    controller.push_failure(app_error("x"), FailureOrigin::Ambient);
    let failure = controller.current_failure().unwrap().clone();

    let first = controller.frame_state(&failure, 0).unwrap();
    assert_eq!(first.file_name.as_deref(), Some(APP_JS_URL));
    assert!(controller.wait_settled(SETTLE));
    let settled = controller.frame_state(&failure, 0).unwrap();
    assert_eq!(settled.line_number, Some(5));
    assert!(controller.frame_state(&failure, 1).is_none());
}

#[test]
fn test_frame_state_for_other_failures_does_not_accumulate() {
    let overlay = TestOverlay::new();
    let mut controller = overlay.controller(&app_fetcher());
    controller.mount();

    let ids: Vec<FailureId> = ["a", "b", "c"]
        .into_iter()
        .map(|m| controller.push_failure(app_error(m), FailureOrigin::Ambient))
        .collect();
    controller.current_frames();
    assert_eq!(controller.resolver().tracked_count(), 1);

    for (id, message) in ids.iter().zip(["a", "b", "c"]).skip(1) {
        let failure = CapturedFailure {
            id: *id,
            value: app_error(message),
            origin: FailureOrigin::Ambient,
        };
        assert!(controller.frame_state(&failure, 0).is_some());
        // The current failure's slot plus the one just asked about.
        assert_eq!(controller.resolver().tracked_count(), 2);
    }
    assert!(controller.wait_settled(SETTLE));
}

#[test]
fn test_navigation_drops_other_failures_frames() {
    let overlay = TestOverlay::new();
    let mut controller = overlay.controller(&app_fetcher());
    controller.mount();
    controller.push_failure(app_error("first"), FailureOrigin::Ambient);
    controller.current_frames();
    assert_eq!(controller.resolver().tracked_count(), 1);

    controller.push_failure(app_error("second"), FailureOrigin::Ambient);
    controller.go_prev();
    assert_eq!(controller.resolver().tracked_count(), 0);

    controller.current_frames();
    assert!(controller.wait_settled(SETTLE));
    assert_eq!(controller.resolver().tracked_count(), 1);
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

#[test]
fn test_render_drives_view_and_dispatches_action() {
    let overlay = TestOverlay::new();
    let mut controller = overlay.controller(&app_fetcher());
    controller.mount();

    let mut view = RecordingView::default();
    assert_eq!(controller.render(&mut view), None);
    assert!(view.calls.is_empty());

    controller.push_failure(app_error("one"), FailureOrigin::Ambient);
    controller.push_failure(error("two"), FailureOrigin::Ambient);

    // Unresolved frames go through the compiled view.
    controller.render(&mut view);
    assert_eq!(
        view.calls,
        [
            Call::Overlay {
                current: 2,
                max: 2,
                compiled: false,
                fallback: false,
            },
            Call::Compiled(0, Some(APP_JS_URL.to_string())),
        ]
    );

    assert!(controller.wait_settled(SETTLE));
    view.calls.clear();
    view.reply = Some(OverlayAction::GoNext);
    assert_eq!(controller.render(&mut view), Some(OverlayAction::GoNext));
    assert_eq!(
        view.calls[1],
        Call::Original(0, Some("app.ts".to_string()))
    );
    assert_eq!(controller.current_index(), Some(1));
    assert_eq!(message(&controller).as_deref(), Some("Error: two"));
}

#[test]
fn test_render_reports_fallback() {
    let overlay = TestOverlay::new();
    let mut controller = overlay.controller(&app_fetcher());
    controller.mount();
    let _ = controller.render_protected(|| -> u8 { panic!("render") });

    let props = controller.render_props().unwrap();
    assert!(props.fallback);
    assert_eq!((props.current_count, props.max_count), (1, 1));

    let mut view = RecordingView {
        reply: Some(OverlayAction::ResetError),
        ..RecordingView::default()
    };
    controller.render(&mut view);
    assert!(!controller.is_visible());
    assert!(!controller.fallback_active());
}

#[test]
fn test_unmount_discards_state() {
    let overlay = TestOverlay::new();
    let mut controller = overlay.controller(&app_fetcher());
    controller.mount();
    controller.push_failure(app_error("x"), FailureOrigin::Ambient);
    controller.current_frames();

    controller.unmount();
    assert!(!controller.is_mounted());
    assert_eq!(controller.total_count(), 0);
    assert_eq!(controller.resolver().tracked_count(), 0);
    assert_eq!(overlay.hub.subscriber_count(), 0);
}

// ---------------------------------------------------------------------------
// Usage contract
// ---------------------------------------------------------------------------

#[test]
#[should_panic(expected = "RenderProps must be used within an active ErrorOverlay")]
fn test_render_props_requires_mount() {
    let overlay = TestOverlay::new();
    let controller = overlay.controller(&app_fetcher());
    let _ = controller.render_props();
}

#[test]
#[should_panic(expected = "StackFrames must be used within an active ErrorOverlay")]
fn test_current_frames_requires_mount() {
    let overlay = TestOverlay::new();
    let mut controller = overlay.controller(&app_fetcher());
    controller.current_frames();
}

#[test]
#[should_panic(expected = "ErrorOverlay view must be used within an active ErrorOverlay")]
fn test_render_requires_mount() {
    let overlay = TestOverlay::new();
    let mut controller = overlay.controller(&app_fetcher());
    controller.render(&mut RecordingView::default());
}
