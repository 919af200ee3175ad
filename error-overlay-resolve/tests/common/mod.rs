//! Shared fixtures for resolution tests.
#![allow(dead_code)]

use error_overlay_resolve::{ArtifactCache, RawFrame, StaticFetcher};
use std::sync::Arc;

pub const APP_JS_URL: &str = "http://localhost:3000/app.js";
pub const APP_MAP_URL: &str = "http://localhost:3000/app.js.map";

pub const APP_TS: &str = "import { log } from './log';\n\
                          \n\
                          export function start() {\n\
                          \x20 // boot\n\
                          \x20 run();\n\
                          }\n";

/// Generated line 10, column 4 maps to `app.ts` line 5, column 2, name `run`.
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

/// Fetcher serving `app.js` and its external map.
pub fn app_fetcher() -> Arc<StaticFetcher> {
    Arc::new(
        StaticFetcher::new()
            .with(APP_JS_URL, app_js())
            .with(APP_MAP_URL, APP_MAP),
    )
}

pub fn cache_over(fetcher: &Arc<StaticFetcher>) -> Arc<ArtifactCache> {
    Arc::new(ArtifactCache::new(Arc::clone(fetcher) as _))
}

/// The frame from the `app.js:10:4` scenario.
pub fn app_frame() -> RawFrame {
    RawFrame::at(APP_JS_URL, 10, 4).with_function("t")
}

pub fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Runtime::new().expect("tokio runtime")
}
