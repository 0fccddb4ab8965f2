/*
 * interpolation.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Variable interpolation: `{!! expr !!}` and `{{ expr }}`.

use super::patterns::{ESCAPED_ECHO, RAW_ECHO};

/// Name of the host function that HTML-escapes a value (quotes included).
pub const ESCAPE_FN: &str = "escapeHtml";

/// How interpolated expressions are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoMode {
    /// Wrap each expression in an output statement: `<%- expr %>`.
    Output,
    /// Emit the bare expression, for embedding inside generated call
    /// arguments.
    Raw,
}

/// Rewrite every `{!! expr !!}` (unescaped) and then every `{{ expr }}`
/// (escaped) in `text`.
pub fn interpolate(text: &str, mode: EchoMode) -> String {
    let text = RAW_ECHO.replace_all(text, |caps: &regex::Captures<'_>| {
        let expr = caps[1].trim();
        match mode {
            EchoMode::Output => format!("<%- {expr} %>"),
            EchoMode::Raw => expr.to_string(),
        }
    });
    ESCAPED_ECHO
        .replace_all(&text, |caps: &regex::Captures<'_>| {
            let expr = caps[1].trim();
            match mode {
                EchoMode::Output => format!("<%- {ESCAPE_FN}({expr}) %>"),
                EchoMode::Raw => format!("{ESCAPE_FN}({expr})"),
            }
        })
        .into_owned()
}
