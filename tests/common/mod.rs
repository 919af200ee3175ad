//! Shared integration test helpers for error-overlay.
//!
//! Include with `mod common;` at the top of a test file. The
//! `#[allow(dead_code)]` attribute keeps per-file subsets warning-free.

#![allow(dead_code)]

use error_overlay::config::OverlayConfig;
use error_overlay::resolve::{ArtifactCache, StaticFetcher};
use error_overlay::{AmbientFailureHub, FailurePayload, OverlayController};
use std::sync::Arc;
use tokio::runtime::Runtime;

pub const APP_JS_URL: &str = "http://localhost:3000/app.js";
pub const APP_MAP_URL: &str = "http://localhost:3000/app.js.map";

/// Generated line 10, column 4 maps to `app.ts` line 5, column 2.
pub const APP_MAP: &str = r#"{"version":3,"file":"app.js","sources":["app.ts"],"names":["run"],"mappings":";;;;;;;;;IAIEA","sourcesContent":["import { log } from './log';\n\nexport function start() {\n  // boot\n  run();\n}\n"]}"#;

pub fn app_js() -> String {
    let mut text = String::new();
    for n in 1..=9 {
        text.push_str(&format!("var line{n} = {n};\n"));
    }
    text.push_str("    run();\n");
    text.push_str("//# sourceMappingURL=app.js.map\n");
    text
}

pub fn app_fetcher() -> Arc<StaticFetcher> {
    Arc::new(
        StaticFetcher::new()
            .with(APP_JS_URL, app_js())
            .with(APP_MAP_URL, APP_MAP),
    )
}

/// Error whose single frame is `app.js:10:4`.
pub fn app_error(message: &str) -> FailurePayload {
    FailurePayload::error("TypeError", message).with_stack(format!(
        "TypeError: {message}\n    at t ({APP_JS_URL}:10:4)"
    ))
}

pub fn error(message: &str) -> FailurePayload {
    FailurePayload::error("Error", message)
}

/// Config for tests: never touches the process panic hook.
pub fn test_config() -> OverlayConfig {
    OverlayConfig {
        capture_panics: false,
        ..OverlayConfig::default()
    }
}

/// A runtime plus a controller over `fetcher`.
///
/// Declare the runtime binding first so the controller drops before it.
pub struct TestOverlay {
    pub runtime: Runtime,
    pub hub: AmbientFailureHub,
}

impl TestOverlay {
    pub fn new() -> Self {
        Self {
            runtime: Runtime::new().expect("tokio runtime"),
            hub: AmbientFailureHub::new(),
        }
    }

    pub fn controller(&self, fetcher: &Arc<StaticFetcher>) -> OverlayController {
        self.controller_with(&test_config(), fetcher)
    }

    pub fn controller_with(
        &self,
        config: &OverlayConfig,
        fetcher: &Arc<StaticFetcher>,
    ) -> OverlayController {
        let cache = Arc::new(ArtifactCache::new(Arc::clone(fetcher) as _));
        OverlayController::new(config, self.runtime.handle().clone(), cache, self.hub.clone())
    }
}
