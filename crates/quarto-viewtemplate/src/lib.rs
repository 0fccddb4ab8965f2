/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Directive-based view template compiler with an on-disk artifact cache.
//!
//! Views are plain text files with embedded directives:
//!
//! - Interpolation: `{{ $expr }}` (escaped) and `{!! $expr !!}` (raw)
//! - Control flow: `@if`/`@elseif`/`@else`/`@endif`, `@foreach`, `@for`,
//!   `@while`, `@switch`/`@case`/`@default`, `@continue`, `@break`
//! - Guards: `@isset`, `@empty`, `@env`
//! - Composition: `@extends`, `@include`, `@section`, `@yield`
//! - Forms: `@form`...`@endform`, `@input`, `@textarea`, `@select`, ...
//! - Raw code: `@php`...`@endphp`, and comments `{{-- ... --}}`
//! - Custom directives registered by the host
//!
//! # Architecture
//!
//! The [`Compiler`] rewrites a view into scriptlet code for a JavaScript
//! host, one directive per pass. The [`ViewEngine`] caches that code on disk,
//! keyed by source path, and hands it to an [`Executor`] provided by the
//! host. Nothing here evaluates the code itself; [`SourceExecutor`] simply
//! returns it.
//!
//! # Example
//!
//! ```ignore
//! use quarto_viewtemplate::{EngineConfig, ViewEngine};
//! use serde_json::json;
//!
//! let mut engine = ViewEngine::dry_run(EngineConfig::new("views", "cache"))?;
//! engine.directive("year", |_| "2025".to_string())?;
//!
//! let code = engine.render("home", &json!({"name": "World"}))?;
//! ```

pub mod cache;
pub mod compiler;
pub mod config;
pub mod diagnostics;
pub mod directives;
pub mod engine;
pub mod error;
pub mod executor;
pub mod form;
pub mod loader;
pub mod sections;

// Re-export main types at crate root
pub use cache::{Artifact, ArtifactCache, CachePolicy, cache_key};
pub use compiler::{CompileContext, Compiler, PASSES, Pass};
pub use config::EngineConfig;
pub use diagnostics::{Diagnostic, DiagnosticCollector, DiagnosticKind};
pub use directives::{Directive, DirectiveRegistry};
pub use engine::{ViewEngine, view_cache_key};
pub use error::{ViewError, ViewResult};
pub use executor::{Executor, RenderScope, SourceExecutor};
pub use form::{Attribute, Form};
pub use loader::{FileSystemLoader, MemoryLoader, TemplateLoader};
pub use sections::SectionStore;
