/*
 * engine.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Render orchestration.
//!
//! [`ViewEngine`] ties the pieces together: it resolves a view name to a
//! source file, reuses the cached artifact when the [`CachePolicy`] allows
//! it, otherwise compiles and stores a fresh one, and finally hands the
//! artifact to the [`Executor`].

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::{Artifact, ArtifactCache, CachePolicy, cache_key};
use crate::compiler::patterns::WHITESPACE_RUN;
use crate::compiler::{CompileContext, Compiler};
use crate::config::EngineConfig;
use crate::diagnostics::{
    CODE_CACHE_READ_FAILED, CODE_CACHE_WRITE_FAILED, Diagnostic, DiagnosticCollector,
};
use crate::directives::DirectiveRegistry;
use crate::error::{ViewError, ViewResult};
use crate::executor::{ENVIRONMENT_VAR, Executor, RenderScope, SourceExecutor};
use crate::form::Form;
use crate::loader::{FileSystemLoader, TemplateLoader};

/// Renders views from a views directory through the artifact cache.
pub struct ViewEngine<E: Executor = SourceExecutor> {
    config: EngineConfig,
    loader: FileSystemLoader,
    directives: DirectiveRegistry,
    cache: ArtifactCache,
    executor: E,
    diagnostics: DiagnosticCollector,
}

impl ViewEngine<SourceExecutor> {
    /// An engine that returns compiled code instead of running it.
    pub fn dry_run(config: EngineConfig) -> ViewResult<Self> {
        Self::new(config, SourceExecutor)
    }
}

impl<E: Executor> ViewEngine<E> {
    /// Create an engine.
    ///
    /// Fails with [`ViewError::Configuration`] unless `config.cache_dir` is
    /// an existing directory.
    pub fn new(config: EngineConfig, executor: E) -> ViewResult<Self> {
        let cache = ArtifactCache::new(&config.cache_dir)?;
        let loader = FileSystemLoader::new(&config.views_dir).with_suffix(&config.suffix);
        Ok(Self {
            config,
            loader,
            directives: DirectiveRegistry::new(),
            cache,
            executor,
            diagnostics: DiagnosticCollector::new(),
        })
    }

    /// Register a custom directive.
    pub fn directive<F>(&mut self, name: &str, handler: F) -> ViewResult<&mut Self>
    where
        F: Fn(Option<&str>) -> String + Send + Sync + 'static,
    {
        self.directives.register(name, handler)?;
        Ok(self)
    }

    pub fn suffix(&mut self, suffix: impl Into<String>) -> &mut Self {
        let suffix = suffix.into();
        self.loader.set_suffix(suffix.clone());
        self.config.suffix = suffix;
        self
    }

    /// Set the artifact TTL in seconds; `None` selects the exact-mtime policy.
    pub fn ttl(&mut self, ttl: Option<i64>) -> &mut Self {
        self.config.ttl = ttl.map(|secs| secs.max(0));
        self
    }

    pub fn compress(&mut self, compress: bool) -> &mut Self {
        self.config.compress = compress;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &ArtifactCache {
        &self.cache
    }

    pub fn directives(&self) -> &DirectiveRegistry {
        &self.directives
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn cache_policy(&self) -> CachePolicy {
        self.config.cache_policy()
    }

    /// Diagnostics accumulated by every render so far.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.diagnostics.diagnostics()
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.diagnostics.take()
    }

    /// Render `name` against `data`.
    ///
    /// Fails with [`ViewError::NotFound`] when the view file is missing and
    /// [`ViewError::Read`] when it cannot be read. Problems with nested views
    /// or with the cache are recorded as diagnostics instead.
    pub fn render(&mut self, name: &str, data: &Value) -> ViewResult<String> {
        let path = self.loader.view_path(name);
        if !path.is_file() {
            return Err(ViewError::NotFound {
                name: name.to_string(),
                path,
            });
        }
        let source_path = absolute_path(path);
        let key = cache_key(&source_path);
        let source_modified = fs::metadata(&source_path)?.modified()?;

        let artifact = match self.cached_artifact(name, &key, source_modified)? {
            Some(artifact) => artifact,
            None => self.compile_and_store(name, key, source_modified)?,
        };

        let environment = self
            .config
            .environment
            .clone()
            .or_else(|| std::env::var(ENVIRONMENT_VAR).ok());
        let mut scope = RenderScope::new(data, Form::new(), environment);
        self.executor.execute(&artifact, &mut scope)
    }

    /// Compile `name` without consulting or updating the cache.
    ///
    /// Returns the compiled code and the diagnostics of this compile only.
    pub fn compile_view(&self, name: &str) -> ViewResult<(String, Vec<Diagnostic>)> {
        let source = self.loader.load(name)?;
        let mut ctx = CompileContext::new();
        let code = self.compile_source(&source, &mut ctx);
        Ok((code, ctx.diagnostics.into_diagnostics()))
    }

    fn compile_source(&self, source: &str, ctx: &mut CompileContext) -> String {
        let compiler =
            Compiler::new(&self.directives, &self.loader).with_max_depth(self.config.max_depth);
        let code = compiler.compile(source, ctx);
        if self.config.compress {
            WHITESPACE_RUN.replace_all(&code, " ").into_owned()
        } else {
            code
        }
    }

    /// The stored artifact for `key` if the policy still accepts it.
    ///
    /// Rejected artifacts are deleted.
    fn cached_artifact(
        &mut self,
        name: &str,
        key: &str,
        source_modified: SystemTime,
    ) -> ViewResult<Option<Artifact>> {
        let Some(written_at) = self.cache.last_write_time(key)? else {
            debug!(view = name, "no cached artifact");
            return Ok(None);
        };

        let policy = self.cache_policy();
        if !policy.is_valid(written_at, source_modified, SystemTime::now()) {
            debug!(view = name, ?policy, "cached artifact expired");
            self.cache.delete(key)?;
            return Ok(None);
        }

        match self.cache.read(key) {
            Ok(code) => {
                debug!(view = name, key, "using cached artifact");
                Ok(Some(Artifact::new(key, code)))
            }
            Err(err) => {
                warn!(view = name, error = %err, "cached artifact unreadable, recompiling");
                self.diagnostics.warn_with_code(
                    CODE_CACHE_READ_FAILED,
                    format!("Recompiled \"{name}\": cached artifact could not be read: {err}"),
                    name,
                );
                Ok(None)
            }
        }
    }

    fn compile_and_store(
        &mut self,
        name: &str,
        key: String,
        source_modified: SystemTime,
    ) -> ViewResult<Artifact> {
        let source = self.loader.load(name)?;
        let mut ctx = CompileContext::new();
        let code = self.compile_source(&source, &mut ctx);
        info!(view = name, diagnostics = ctx.diagnostics.len(), "compiled view");
        self.diagnostics.extend(ctx.diagnostics);

        if self.cache.write(&key, &code)? {
            if self.cache_policy() == CachePolicy::ExactMtime
                && let Err(err) = self.cache.stamp(&key, source_modified)
            {
                warn!(view = name, error = %err, "could not stamp cached artifact");
            }
        } else {
            let path = self.cache.artifact_path(&key)?;
            warn!(view = name, path = %path.display(), "could not write cached artifact");
            self.diagnostics.warn_with_code(
                CODE_CACHE_WRITE_FAILED,
                format!(
                    "Rendered \"{name}\" without caching: {} could not be written",
                    path.display()
                ),
                name,
            );
        }

        Ok(Artifact::new(key, code))
    }
}

fn absolute_path(path: PathBuf) -> PathBuf {
    match path.canonicalize() {
        Ok(canonical) => canonical,
        Err(_) => std::path::absolute(&path).unwrap_or(path),
    }
}

/// Cache key the engine uses for the view file at `path`.
pub fn view_cache_key(path: &Path) -> String {
    cache_key(&absolute_path(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::cell::RefCell;
    use tempfile::TempDir;

    struct Fixture {
        _root: TempDir,
        views: PathBuf,
        cache: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let root = tempfile::tempdir().unwrap();
            let views = root.path().join("views");
            let cache = root.path().join("cache");
            fs::create_dir(&views).unwrap();
            fs::create_dir(&cache).unwrap();
            Self {
                _root: root,
                views,
                cache,
            }
        }

        fn view(&self, name: &str, source: &str) -> PathBuf {
            let path = self.views.join(format!("{name}.view.html"));
            fs::write(&path, source).unwrap();
            path
        }

        fn config(&self) -> EngineConfig {
            EngineConfig::new(&self.views, &self.cache)
        }
    }

    /// Records the environment each render saw.
    #[derive(Default)]
    struct RecordingExecutor {
        environments: RefCell<Vec<Option<String>>>,
    }

    impl Executor for RecordingExecutor {
        fn execute(&self, artifact: &Artifact, scope: &mut RenderScope<'_>) -> ViewResult<String> {
            self.environments
                .borrow_mut()
                .push(scope.environment.clone());
            Ok(artifact.code.clone())
        }
    }

    #[test]
    fn test_missing_cache_dir_is_configuration_error() {
        let fixture = Fixture::new();
        let config = EngineConfig::new(&fixture.views, fixture.cache.join("missing"));
        assert!(matches!(
            ViewEngine::dry_run(config),
            Err(ViewError::Configuration { .. })
        ));
    }

    #[test]
    fn test_render_compiles_and_caches() {
        let fixture = Fixture::new();
        let path = fixture.view("home", "Hello {{ $name }}");
        let mut engine = ViewEngine::dry_run(fixture.config()).unwrap();

        let out = engine.render("home", &json!({"name": "x"})).unwrap();
        assert_eq!(out, "Hello <%- escapeHtml($name) %>");

        let key = view_cache_key(&path);
        assert!(engine.cache().has(&key).unwrap());
        assert_eq!(engine.cache().read(&key).unwrap(), out);
    }

    #[test]
    fn test_missing_view_is_not_found() {
        let fixture = Fixture::new();
        let mut engine = ViewEngine::dry_run(fixture.config()).unwrap();
        assert!(matches!(
            engine.render("nope", &json!({})),
            Err(ViewError::NotFound { .. })
        ));
    }

    #[test]
    fn test_valid_artifact_is_reused() {
        let fixture = Fixture::new();
        let path = fixture.view("home", "fresh");
        let mut engine = ViewEngine::dry_run(fixture.config()).unwrap();
        engine.render("home", &json!({})).unwrap();

        let key = view_cache_key(&path);
        fs::write(engine.cache().artifact_path(&key).unwrap(), "from cache").unwrap();

        assert_eq!(engine.render("home", &json!({})).unwrap(), "from cache");
    }

    #[test]
    fn test_zero_ttl_always_recompiles() {
        let fixture = Fixture::new();
        let path = fixture.view("home", "fresh");
        let mut engine = ViewEngine::dry_run(fixture.config()).unwrap();
        engine.ttl(Some(-30));
        engine.render("home", &json!({})).unwrap();

        let key = view_cache_key(&path);
        fs::write(engine.cache().artifact_path(&key).unwrap(), "stale").unwrap();

        assert_eq!(engine.render("home", &json!({})).unwrap(), "fresh");
    }

    #[test]
    fn test_compress_collapses_whitespace() {
        let fixture = Fixture::new();
        fixture.view("home", "<p>\n    {{ $a }}\n\n</p>   <b>x</b>");
        let mut engine = ViewEngine::dry_run(fixture.config()).unwrap();
        engine.compress(true);

        let out = engine.render("home", &json!({})).unwrap();
        assert_eq!(out, "<p> <%- escapeHtml($a) %> </p> <b>x</b>");
    }

    #[test]
    fn test_custom_suffix() {
        let fixture = Fixture::new();
        fs::write(fixture.views.join("page.tpl"), "tpl").unwrap();
        let mut engine = ViewEngine::dry_run(fixture.config()).unwrap();
        engine.suffix(".tpl");

        assert_eq!(engine.render("page", &json!({})).unwrap(), "tpl");
        assert_eq!(engine.config().suffix, ".tpl");
    }

    #[test]
    fn test_custom_directive_registration() {
        let fixture = Fixture::new();
        fixture.view("home", "@year");
        let mut engine = ViewEngine::dry_run(fixture.config()).unwrap();
        engine.directive("year", |_| "2025".to_string()).unwrap();

        assert_eq!(engine.render("home", &json!({})).unwrap(), "2025");
        assert!(matches!(
            engine.directive("bad name", |_| String::new()),
            Err(ViewError::Validation { .. })
        ));
    }

    #[test]
    fn test_missing_include_records_diagnostic() {
        let fixture = Fixture::new();
        fixture.view("home", "a@include('missing')b");
        let mut engine = ViewEngine::dry_run(fixture.config()).unwrap();

        assert_eq!(engine.render("home", &json!({})).unwrap(), "ab");
        assert_eq!(engine.diagnostics().len(), 1);
        assert_eq!(engine.diagnostics()[0].code.as_deref(), Some("V-1-1"));

        let taken = engine.take_diagnostics();
        assert_eq!(taken.len(), 1);
        assert!(engine.diagnostics().is_empty());
    }

    #[test]
    fn test_compile_view_bypasses_cache() {
        let fixture = Fixture::new();
        let path = fixture.view("home", "@include('gone'){{ $x }}");
        let engine = ViewEngine::dry_run(fixture.config()).unwrap();

        let (code, diagnostics) = engine.compile_view("home").unwrap();
        assert_eq!(code, "<%- escapeHtml($x) %>");
        assert_eq!(diagnostics.len(), 1);
        assert!(!engine.cache().has(&view_cache_key(&path)).unwrap());
        assert!(engine.diagnostics().is_empty());
    }

    #[test]
    fn test_unreadable_view_is_read_error() {
        let fixture = Fixture::new();
        fs::write(fixture.views.join("binary.view.html"), [0xff, 0xfe, 0x00, 0xc3]).unwrap();
        let mut engine = ViewEngine::dry_run(fixture.config()).unwrap();

        match engine.render("binary", &json!({})) {
            Err(ViewError::Read { name, .. }) => assert_eq!(name, "binary"),
            other => panic!("expected Read error, got {other:?}"),
        }
    }

    #[test]
    fn test_unreadable_include_records_diagnostic() {
        let fixture = Fixture::new();
        fs::write(fixture.views.join("blob.view.html"), [0xff, 0xfe]).unwrap();
        fixture.view("home", "a@include('blob')b");
        let mut engine = ViewEngine::dry_run(fixture.config()).unwrap();

        assert_eq!(engine.render("home", &json!({})).unwrap(), "ab");
        let diagnostics = engine.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code.as_deref(), Some("V-1-2"));
        assert_eq!(diagnostics[0].view.as_deref(), Some("blob"));
    }

    #[test]
    fn test_unreadable_cached_artifact_recompiles() {
        let fixture = Fixture::new();
        let path = fixture.view("home", "fresh {{ $x }}");
        let mut engine = ViewEngine::dry_run(fixture.config()).unwrap();
        engine.render("home", &json!({})).unwrap();

        let key = view_cache_key(&path);
        fs::write(engine.cache().artifact_path(&key).unwrap(), [0xff, 0xfe]).unwrap();

        let out = engine.render("home", &json!({})).unwrap();
        assert_eq!(out, "fresh <%- escapeHtml($x) %>");
        let codes: Vec<_> = engine
            .diagnostics()
            .iter()
            .map(|d| d.code.as_deref())
            .collect();
        assert_eq!(codes, vec![Some("V-2-2")]);
        assert_eq!(engine.cache().read(&key).unwrap(), out);
    }

    #[test]
    fn test_environment_override_reaches_executor() {
        let fixture = Fixture::new();
        fixture.view("home", "@env('local')dev@endenv");
        let mut config = fixture.config();
        config.environment = Some("local".to_string());
        let mut engine = ViewEngine::new(config, RecordingExecutor::default()).unwrap();

        let out = engine.render("home", &json!({})).unwrap();
        assert_eq!(
            out,
            "<% if (env.ENVIRONMENT === \"local\") { %>dev<% } %>"
        );
        assert_eq!(
            *engine.executor().environments.borrow(),
            vec![Some("local".to_string())]
        );
    }
}
