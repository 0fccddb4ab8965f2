/*
 * diagnostics.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Non-fatal diagnostics collected while compiling and rendering views.
//!
//! A missing include never aborts a compile: the directive is replaced with
//! empty text and a [`Diagnostic`] is pushed onto the collector threaded
//! through the compilation. Hosts inspect the result after rendering.

use std::fmt;

/// Nested view referenced by `@include`/`@extends` was not found.
pub const CODE_NESTED_NOT_FOUND: &str = "V-1-1";
/// Nested view exists but could not be read.
pub const CODE_NESTED_UNREADABLE: &str = "V-1-2";
/// Include/extends nesting went deeper than the configured maximum.
pub const CODE_NESTING_TOO_DEEP: &str = "V-1-3";
/// A compiled artifact could not be written to the cache.
pub const CODE_CACHE_WRITE_FAILED: &str = "V-2-1";
/// A cached artifact was considered valid but could not be read back.
pub const CODE_CACHE_READ_FAILED: &str = "V-2-2";

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    Warning,
    Error,
}

/// A single recorded issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub code: Option<String>,
    pub message: String,
    /// Logical name of the view the issue relates to, if any.
    pub view: Option<String>,
}

impl Diagnostic {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::Warning,
            code: None,
            message: message.into(),
            view: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::Error,
            ..Self::warning(message)
        }
    }

    pub fn with_code(mut self, code: &str) -> Self {
        self.code = Some(code.to_string());
        self
    }

    pub fn with_view(mut self, view: impl Into<String>) -> Self {
        self.view = Some(view.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.kind {
            DiagnosticKind::Warning => "warning",
            DiagnosticKind::Error => "error",
        };
        match &self.code {
            Some(code) => write!(f, "{label}[{code}]: {}", self.message),
            None => write!(f, "{label}: {}", self.message),
        }
    }
}

/// Collector for diagnostic messages.
#[derive(Debug, Default, Clone)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    /// Create a new empty diagnostic collector.
    pub fn new() -> Self {
        Self {
            diagnostics: Vec::new(),
        }
    }

    /// Add a diagnostic message.
    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Add a warning with error code, attributed to a view.
    pub fn warn_with_code(&mut self, code: &str, message: impl Into<String>, view: &str) {
        self.add(Diagnostic::warning(message).with_code(code).with_view(view));
    }

    /// Check if any errors were collected (warnings don't count).
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::Error)
    }

    /// Get a reference to the collected diagnostics.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Move every diagnostic from `other` into this collector.
    pub fn extend(&mut self, other: DiagnosticCollector) {
        self.diagnostics.extend(other.diagnostics);
    }

    /// Consume the collector and return the diagnostics in recording order.
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    /// Drain the collected diagnostics, leaving the collector empty.
    pub fn take(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    /// Check if the collector is empty.
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }
}
