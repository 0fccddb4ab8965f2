/*
 * directives.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Registry of user-defined directives.
//!
//! Built-in directives (`@if`, `@foreach`, `@section`, ...) are fixed passes
//! of the compiler and never appear here. A custom directive is a name plus a
//! handler; every `@name` or `@name(args)` left in the text when the custom
//! directive pass runs is replaced with whatever the handler returns.
//!
//! ```ignore
//! let mut registry = DirectiveRegistry::new();
//! registry.register("year", |_| "2025".to_string())?;
//! registry.register("upper", |arg| arg.unwrap_or_default().to_uppercase())?;
//! ```

use regex::Regex;
use std::fmt;

use crate::error::{ViewError, ViewResult};

/// Handler invoked with the raw text between the parentheses, if any.
pub type DirectiveHandler = Box<dyn Fn(Option<&str>) -> String + Send + Sync>;

/// A registered custom directive.
pub struct Directive {
    name: String,
    pattern: Regex,
    handler: DirectiveHandler,
}

impl Directive {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replace every occurrence of this directive in `text`.
    pub(crate) fn apply(&self, text: &str) -> String {
        self.pattern
            .replace_all(text, |caps: &regex::Captures<'_>| {
                (self.handler)(caps.get(1).map(|m| m.as_str()))
            })
            .into_owned()
    }
}

impl fmt::Debug for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Directive")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Ordered collection of custom directives.
///
/// Directives are applied in registration order. Registering a name twice
/// replaces the earlier handler but keeps its position.
#[derive(Debug, Default)]
pub struct DirectiveRegistry {
    directives: Vec<Directive>,
}

impl DirectiveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a directive.
    ///
    /// Surrounding whitespace and a leading `@` are stripped from `name`.
    /// What remains must be non-empty and purely alphanumeric.
    pub fn register<F>(&mut self, name: &str, handler: F) -> ViewResult<()>
    where
        F: Fn(Option<&str>) -> String + Send + Sync + 'static,
    {
        let name = normalize_name(name)?;
        let pattern = Regex::new(&format!(r"(?is)@{}(?:\((.*?)\))?", regex::escape(&name)))
            .map_err(|_| ViewError::Validation { name: name.clone() })?;
        let directive = Directive {
            name,
            pattern,
            handler: Box::new(handler),
        };

        match self
            .directives
            .iter_mut()
            .find(|d| d.name == directive.name)
        {
            Some(existing) => *existing = directive,
            None => self.directives.push(directive),
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Directive> {
        self.directives.iter().find(|d| d.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Directive> {
        self.directives.iter()
    }

    pub fn len(&self) -> usize {
        self.directives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }
}

fn normalize_name(raw: &str) -> ViewResult<String> {
    let name = raw.trim().trim_start_matches('@');
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ViewError::Validation {
            name: raw.to_string(),
        });
    }
    Ok(name.to_string())
}
