/*
 * forms.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Lowering of form directives into calls on the host's `form` object.
//!
//! Arguments are passed through untouched apart from raw-mode interpolation,
//! so `@input('email', 'email', {value: {{ $email }}})` becomes
//! `form.input('email', 'email', {value: escapeHtml($email)})`.

use regex::Regex;

use super::interpolation::{EchoMode, interpolate};
use super::patterns::{BUTTON, FORM_BLOCK, INPUT, LABEL, SELECT, SUBMIT, TEXTAREA};

/// Host object the form calls are made on.
pub const FORM_OBJECT: &str = "form";

fn form_calls() -> [(&'static Regex, &'static str); 6] {
    [
        (&*INPUT, "input"),
        (&*TEXTAREA, "textarea"),
        (&*SUBMIT, "submit"),
        (&*BUTTON, "button"),
        (&*LABEL, "label"),
        (&*SELECT, "select"),
    ]
}

fn call(method: &str, args: &str) -> String {
    format!(
        "<% {FORM_OBJECT}.{method}({}); %>",
        interpolate(args.trim(), EchoMode::Raw)
    )
}

/// Lower `@form ... @endform` blocks and the single-line form directives.
///
/// A form block lowers its own body with this same function (not the full
/// compiler), wraps it in `start`/`end` calls and then flushes the
/// accumulated markup with an output statement after the closing tag.
pub fn lower_forms(text: &str) -> String {
    let text = FORM_BLOCK.replace_all(text, |caps: &regex::Captures<'_>| {
        let mut lowered = call("start", &caps[1]);
        lowered.push_str(&lower_forms(caps[2].trim()));
        lowered.push_str(&format!("<% {FORM_OBJECT}.end(); %>"));
        lowered.push('\n');
        lowered.push_str(&format!("<%- {FORM_OBJECT}.output() %>"));
        lowered
    });

    form_calls()
        .into_iter()
        .fold(text.into_owned(), |text, (pattern, method)| {
            pattern
                .replace_all(&text, |caps: &regex::Captures<'_>| call(method, &caps[1]))
                .into_owned()
        })
}
