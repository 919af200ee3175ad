//! Stack trace text to [`RawFrame`]s.
//!
//! Understands the two grammars browsers and JS runtimes emit:
//! - V8 (`    at fn (file:line:col)`, `at new Foo (...)`, `at async fn (...)`,
//!   `at eval (eval at fn (file:line:col), <anonymous>:1:1)`, `at native`)
//! - SpiderMonkey / JavaScriptCore (`fn@file:line:col`, `global code@...`,
//!   `[native code]`)
//!
//! Lines matching neither (the message header, blank lines) are skipped.

use crate::failure::FailurePayload;
use error_overlay_resolve::RawFrame;
use regex::Regex;
use std::sync::OnceLock;

fn v8_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*at\s+(.+?)\s*$").expect("v8 frame regex is valid"))
}

fn v8_call() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(.*?)\s+\((.*)\)$").expect("v8 call regex is valid"))
}

fn location() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(.*?):(\d+)(?::(\d+))?$").expect("location regex is valid"))
}

fn eval_origin() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([^\s()]+):(\d+):(\d+)").expect("eval origin regex is valid"))
}

fn v8_stack() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^\s*at .*(\S+:\d+|\(native\))").expect("v8 stack regex is valid")
    })
}

fn gecko_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?:([^@]*)@)?(.+?):(\d+):(\d+)\s*$").expect("gecko frame regex is valid")
    })
}

fn gecko_native() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(?:([^@]*)@)?\[native code\]\s*$").expect("gecko native regex is valid")
    })
}

/// Frames for a failure payload. Payloads without a stack yield none.
pub fn parse(payload: &FailurePayload) -> Vec<RawFrame> {
    payload.stack().map(parse_stack).unwrap_or_default()
}

/// Frames for a stack trace string, outermost call last.
///
/// The grammar is chosen once per stack: any V8 frame line makes it a V8
/// stack, and only `at` lines are read. A message header that happens to end
/// in `file:line:col` is then never mistaken for a frame.
pub fn parse_stack(stack: &str) -> Vec<RawFrame> {
    let parse_line: fn(&str) -> Option<RawFrame> = if v8_stack().is_match(stack) {
        parse_v8
    } else {
        parse_gecko
    };
    stack.lines().filter_map(parse_line).collect()
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

fn apply_location(frame: &mut RawFrame, loc: &str) {
    match location().captures(loc) {
        Some(caps) => {
            frame.file_name = non_empty(&caps[1]);
            frame.line_number = caps[2].parse().ok();
            frame.column_number = caps.get(3).and_then(|m| m.as_str().parse().ok());
        }
        None => frame.file_name = non_empty(loc),
    }
    if frame.file_name.as_deref() == Some("<anonymous>") {
        frame.file_name = None;
    }
}

fn parse_v8(line: &str) -> Option<RawFrame> {
    let rest = v8_line().captures(line)?.get(1)?.as_str();
    let mut frame = RawFrame::default();

    let (function, loc) = match v8_call().captures(rest) {
        Some(caps) => (caps.get(1).map(|m| m.as_str()), caps.get(2).map_or("", |m| m.as_str())),
        None => (None, rest),
    };

    if let Some(mut name) = function {
        if let Some(stripped) = name.strip_prefix("async ") {
            name = stripped;
        }
        if let Some(stripped) = name.strip_prefix("new ") {
            frame.is_constructor = true;
            name = stripped;
        }
        frame.function_name = non_empty(name);
    }

    if loc == "native" {
        frame.is_native = true;
    } else if loc.starts_with("eval at ") {
        frame.is_eval = true;
        if let Some(caps) = eval_origin().captures(loc) {
            frame.file_name = non_empty(&caps[1]);
            frame.line_number = caps[2].parse().ok();
            frame.column_number = caps[3].parse().ok();
        }
    } else {
        apply_location(&mut frame, loc);
    }

    frame.is_top_level = frame.function_name.is_none() && !frame.is_native;
    Some(frame)
}

fn parse_gecko(line: &str) -> Option<RawFrame> {
    let mut frame = RawFrame::default();

    if let Some(caps) = gecko_native().captures(line) {
        frame.function_name = caps.get(1).and_then(|m| non_empty(m.as_str()));
        frame.is_native = true;
        return Some(frame);
    }

    let caps = gecko_line().captures(line)?;
    let function = caps.get(1).map_or("", |m| m.as_str()).trim();
    if function == "global code" {
        frame.is_top_level = true;
    } else {
        frame.function_name = non_empty(function);
        frame.is_top_level = frame.function_name.is_none();
    }

    let mut file = &caps[2];
    if let Some(idx) = file.find(" > eval") {
        frame.is_eval = true;
        file = &file[..idx];
        // `app.js line 3 > eval` names the evaluating script
        if let Some(idx) = file.find(" line ") {
            file = &file[..idx];
        }
    }
    frame.file_name = non_empty(file);
    frame.line_number = caps[3].parse().ok();
    frame.column_number = caps[4].parse().ok();
    Some(frame)
}
