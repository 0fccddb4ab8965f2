/*
 * mod.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! The directive compiler.
//!
//! Compilation is an ordered list of rewrite passes over the view text. Each
//! pass replaces every non-overlapping match of one directive; a few of them
//! (`@extends`, `@include`, block `@section`, `@switch`) run the whole
//! pipeline again on a captured span before substituting it. The order is
//! observable: includes are inlined before later passes see their content,
//! form arguments are lowered before interpolation touches them, and
//! sections are stored before `@yield` looks them up.
//!
//! The output is a scriptlet template for a JavaScript host:
//!
//! ```text
//! @if($user) Hi {{ $user.name }} @endif
//! ```
//!
//! compiles to
//!
//! ```text
//! <% if ($user) { %> Hi <%- escapeHtml($user.name) %> <% } %>
//! ```

pub mod forms;
pub mod interpolation;
pub(crate) mod patterns;

use regex::{Captures, NoExpand, Regex};
use tracing::debug;

use crate::diagnostics::{
    CODE_NESTED_NOT_FOUND, CODE_NESTED_UNREADABLE, CODE_NESTING_TOO_DEEP, DiagnosticCollector,
};
use crate::directives::DirectiveRegistry;
use crate::error::ViewError;
use crate::loader::TemplateLoader;
use crate::sections::SectionStore;

use self::forms::lower_forms;
use self::interpolation::{EchoMode, interpolate};
use self::patterns::*;

/// Default maximum include/extends nesting depth.
pub const DEFAULT_MAX_DEPTH: usize = 50;

/// State shared by every compile that belongs to one render.
///
/// Sections stored while compiling a child view are visible to `@yield` in
/// the views it includes or extends, and vice versa. Create one context per
/// top-level render.
#[derive(Debug, Default)]
pub struct CompileContext {
    pub sections: SectionStore,
    pub diagnostics: DiagnosticCollector,
    depth: usize,
}

impl CompileContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current include/extends nesting depth.
    pub fn depth(&self) -> usize {
        self.depth
    }
}

/// One rewrite step of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    Extends,
    InlineSection,
    BlockSection,
    Include,
    Forms,
    Environment,
    Loops,
    FlowControl,
    Conditionals,
    Switch,
    CaseLabels,
    ExistenceGuards,
    RawCode,
    Yield,
    Method,
    CustomDirectives,
    Comments,
    Interpolation,
}

/// Passes in the order they run.
pub const PASSES: [Pass; 18] = [
    Pass::Extends,
    Pass::InlineSection,
    Pass::BlockSection,
    Pass::Include,
    Pass::Forms,
    Pass::Environment,
    Pass::Loops,
    Pass::FlowControl,
    Pass::Conditionals,
    Pass::Switch,
    Pass::CaseLabels,
    Pass::ExistenceGuards,
    Pass::RawCode,
    Pass::Yield,
    Pass::Method,
    Pass::CustomDirectives,
    Pass::Comments,
    Pass::Interpolation,
];

/// Compiles view source text into scriptlet code.
///
/// The compiler itself holds no per-render state; everything that must be
/// shared across nested compiles lives in the [`CompileContext`].
pub struct Compiler<'a> {
    directives: &'a DirectiveRegistry,
    loader: &'a dyn TemplateLoader,
    max_depth: usize,
}

impl<'a> Compiler<'a> {
    pub fn new(directives: &'a DirectiveRegistry, loader: &'a dyn TemplateLoader) -> Self {
        Self {
            directives,
            loader,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Run every pass over `source` and return the trimmed result.
    pub fn compile(&self, source: &str, ctx: &mut CompileContext) -> String {
        let compiled = PASSES
            .iter()
            .fold(source.to_string(), |text, pass| self.apply(*pass, &text, ctx));
        compiled.trim().to_string()
    }

    /// Apply a single pass.
    pub fn apply(&self, pass: Pass, text: &str, ctx: &mut CompileContext) -> String {
        match pass {
            Pass::Extends => EXTENDS
                .replace_all(text, |caps: &Captures<'_>| {
                    self.compile_nested(unquote(&caps[1]), ctx)
                })
                .into_owned(),

            Pass::InlineSection => INLINE_SECTION
                .replace_all(text, |caps: &Captures<'_>| {
                    let key = unquote(&caps[1]);
                    debug!(section = key, "storing inline section");
                    ctx.sections.insert(key, unquote(&caps[2]));
                    String::new()
                })
                .into_owned(),

            Pass::BlockSection => BLOCK_SECTION
                .replace_all(text, |caps: &Captures<'_>| {
                    let key = unquote(&caps[1]).to_string();
                    let body = self.compile(&caps[2], ctx);
                    debug!(section = key.as_str(), "storing block section");
                    ctx.sections.insert(key, body);
                    String::new()
                })
                .into_owned(),

            Pass::Include => INCLUDE
                .replace_all(text, |caps: &Captures<'_>| {
                    self.compile_nested(unquote(&caps[1]), ctx)
                })
                .into_owned(),

            Pass::Forms => lower_forms(text),

            Pass::Environment => {
                let text = ENV.replace_all(text, |caps: &Captures<'_>| {
                    format!(
                        "<% if (env.ENVIRONMENT === {}) {{ %>",
                        js_string(unquote(&caps[1]))
                    )
                });
                replace_literal(&END_ENV, &text, "<% } %>")
            }

            Pass::Loops => {
                let text = wrap_argument(&FOREACH, text, "<% for (", ") { %>");
                let text = replace_literal(&END_FOREACH, &text, "<% } %>");
                let text = wrap_argument(&FOR, &text, "<% for (", ") { %>");
                let text = replace_literal(&END_FOR, &text, "<% } %>");
                let text = wrap_argument(&WHILE, &text, "<% while (", ") { %>");
                replace_literal(&END_WHILE, &text, "<% } %>")
            }

            Pass::FlowControl => {
                let text = wrap_argument(&CONTINUE_IF, text, "<% if (", ") { continue; } %>");
                let text = wrap_argument(&BREAK_IF, &text, "<% if (", ") { break; } %>");
                let text = replace_literal(&CONTINUE, &text, "<% continue; %>");
                replace_literal(&BREAK, &text, "<% break; %>")
            }

            Pass::Conditionals => {
                let text = wrap_argument(&IF, text, "<% if (", ") { %>");
                let text = wrap_argument(&ELSE_IF, &text, "<% } else if (", ") { %>");
                let text = replace_literal(&ELSE, &text, "<% } else { %>");
                replace_literal(&END_IF, &text, "<% } %>")
            }

            Pass::Switch => SWITCH
                .replace_all(text, |caps: &Captures<'_>| {
                    let mut lowered = format!("<% switch ({}) {{ %>", caps[1].trim());
                    lowered.push_str(&self.compile(caps[2].trim(), ctx));
                    lowered.push_str("<% } %>");
                    lowered
                })
                .into_owned(),

            Pass::CaseLabels => {
                let text = wrap_argument(&CASE, text, "<% case ", ": %>");
                replace_literal(&DEFAULT, &text, "<% default: %>")
            }

            Pass::ExistenceGuards => {
                let text = ISSET.replace_all(text, |caps: &Captures<'_>| {
                    let expr = caps[1].trim();
                    format!("<% if (typeof ({expr}) !== \"undefined\" && ({expr}) !== null) {{ %>")
                });
                let text = replace_literal(&END_ISSET, &text, "<% } %>");
                let text = wrap_argument(&EMPTY, &text, "<% if (empty(", ")) { %>");
                replace_literal(&END_EMPTY, &text, "<% } %>")
            }

            Pass::RawCode => {
                let text = replace_literal(&CODE_OPEN, text, "<% ");
                replace_literal(&CODE_CLOSE, &text, " %>")
            }

            Pass::Yield => YIELD
                .replace_all(text, |caps: &Captures<'_>| {
                    let key = unquote(&caps[1]);
                    match ctx.sections.get(key) {
                        Some(content) => content.to_string(),
                        // Left for an enclosing compile to resolve, e.g. once
                        // an @extends has inlined the view defining it.
                        None => caps[0].to_string(),
                    }
                })
                .into_owned(),

            Pass::Method => METHOD
                .replace_all(text, |caps: &Captures<'_>| {
                    format!(
                        "<input type=\"hidden\" name=\"_method\" value=\"{}\" />",
                        unquote(&caps[1])
                    )
                })
                .into_owned(),

            Pass::CustomDirectives => self
                .directives
                .iter()
                .fold(text.to_string(), |text, directive| directive.apply(&text)),

            Pass::Comments => replace_literal(&COMMENT, text, ""),

            Pass::Interpolation => interpolate(text, EchoMode::Output),
        }
    }

    /// Load and compile a view referenced by `@include` or `@extends`.
    ///
    /// Failures are recorded as diagnostics and substitute empty text.
    fn compile_nested(&self, name: &str, ctx: &mut CompileContext) -> String {
        if ctx.depth >= self.max_depth {
            ctx.diagnostics.warn_with_code(
                CODE_NESTING_TOO_DEEP,
                format!(
                    "Replaced \"{name}\" with empty text: views nested more than {} levels deep",
                    self.max_depth
                ),
                name,
            );
            return String::new();
        }

        let source = match self.loader.load(name) {
            Ok(source) => source,
            Err(ViewError::NotFound { path, .. }) => {
                ctx.diagnostics.warn_with_code(
                    CODE_NESTED_NOT_FOUND,
                    format!(
                        "Replaced \"{name}\" with empty text: {} could not be found",
                        path.display()
                    ),
                    name,
                );
                return String::new();
            }
            Err(err) => {
                ctx.diagnostics.warn_with_code(
                    CODE_NESTED_UNREADABLE,
                    format!("Replaced \"{name}\" with empty text: {err}"),
                    name,
                );
                return String::new();
            }
        };

        debug!(view = name, depth = ctx.depth + 1, "compiling nested view");
        ctx.depth += 1;
        let compiled = self.compile(&source, ctx);
        ctx.depth -= 1;
        compiled
    }
}

/// Replace every match with fixed text (no `$group` expansion).
fn replace_literal(pattern: &Regex, text: &str, replacement: &str) -> String {
    pattern.replace_all(text, NoExpand(replacement)).into_owned()
}

/// Replace every match with `open + trimmed argument + close`.
fn wrap_argument(pattern: &Regex, text: &str, open: &str, close: &str) -> String {
    pattern
        .replace_all(text, |caps: &Captures<'_>| {
            format!("{open}{}{close}", caps[1].trim())
        })
        .into_owned()
}

/// Quote `value` as a JavaScript string literal.
fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{value}\""))
}
