/*
 * executor.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Execution of compiled artifacts.
//!
//! Compiled views are JavaScript scriptlet templates, and running JavaScript
//! is the host's business, not this crate's. The engine hands every
//! artifact to an [`Executor`] together with a [`RenderScope`] that carries
//! everything the compiled code may reference besides the data context:
//!
//! - `escapeHtml(value)` and `empty(value)` helpers (provided by the host)
//! - `env.ENVIRONMENT`, taken from [`RenderScope::environment`]
//! - `form`, backed by [`RenderScope::form`] (see [`Form::dispatch`])
//!
//! [`Form::dispatch`]: crate::form::Form::dispatch

use serde_json::Value;

use crate::cache::Artifact;
use crate::error::ViewResult;
use crate::form::Form;

/// Name of the process environment variable read by `@env` guards.
pub const ENVIRONMENT_VAR: &str = "ENVIRONMENT";

/// Per-render bindings passed to an executor.
#[derive(Debug)]
pub struct RenderScope<'a> {
    /// The data context the view was rendered with.
    pub data: &'a Value,
    /// Fresh form builder for this render.
    pub form: Form,
    /// Current runtime environment name, if any.
    pub environment: Option<String>,
}

impl<'a> RenderScope<'a> {
    pub fn new(data: &'a Value, form: Form, environment: Option<String>) -> Self {
        Self {
            data,
            form,
            environment,
        }
    }
}

/// Runs compiled artifacts against a data context.
pub trait Executor {
    /// Execute `artifact` and return the rendered text.
    fn execute(&self, artifact: &Artifact, scope: &mut RenderScope<'_>) -> ViewResult<String>;
}

impl<E: Executor + ?Sized> Executor for Box<E> {
    fn execute(&self, artifact: &Artifact, scope: &mut RenderScope<'_>) -> ViewResult<String> {
        (**self).execute(artifact, scope)
    }
}

/// Dry-run executor: returns the compiled code unchanged.
///
/// Lets tooling render through the cache without a JavaScript runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceExecutor;

impl Executor for SourceExecutor {
    fn execute(&self, artifact: &Artifact, _scope: &mut RenderScope<'_>) -> ViewResult<String> {
        Ok(artifact.code.clone())
    }
}
