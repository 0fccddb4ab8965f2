/*
 * cache_tests.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Cache validity through the render path: exact-mtime and TTL policies.
 */

use pretty_assertions::assert_eq;
use quarto_viewtemplate::{EngineConfig, ViewEngine, view_cache_key};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

struct Workspace {
    _root: TempDir,
    views: PathBuf,
    cache: PathBuf,
}

impl Workspace {
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

    fn write_view(&self, name: &str, source: &str) -> PathBuf {
        let path = self.views.join(format!("{name}.view.html"));
        fs::write(&path, source).unwrap();
        path
    }

    fn engine(&self, ttl: Option<i64>) -> ViewEngine {
        let mut engine =
            ViewEngine::dry_run(EngineConfig::new(&self.views, &self.cache)).unwrap();
        engine.ttl(ttl);
        engine
    }
}

fn set_mtime(path: &Path, time: SystemTime) {
    fs::File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(time)
        .unwrap();
}

fn mtime(path: &Path) -> SystemTime {
    fs::metadata(path).unwrap().modified().unwrap()
}

fn secs(time: SystemTime) -> u64 {
    time.duration_since(SystemTime::UNIX_EPOCH).unwrap().as_secs()
}

#[test]
fn test_exact_mtime_artifact_carries_source_mtime() {
    let ws = Workspace::new();
    let source = ws.write_view("home", "{{ $a }}");
    set_mtime(&source, SystemTime::now() - Duration::from_secs(7200));
    let mut engine = ws.engine(None);

    engine.render("home", &json!({})).unwrap();

    let key = view_cache_key(&source);
    let artifact = engine.cache().artifact_path(&key).unwrap();
    assert_eq!(secs(mtime(&artifact)), secs(mtime(&source)));
}

#[test]
fn test_exact_mtime_reuses_until_source_is_touched() {
    let ws = Workspace::new();
    let source = ws.write_view("home", "fresh");
    let source_time = SystemTime::now() - Duration::from_secs(7200);
    set_mtime(&source, source_time);
    let mut engine = ws.engine(None);
    engine.render("home", &json!({})).unwrap();

    // Swap the stored code but keep the stamp: still a hit, however old.
    let key = view_cache_key(&source);
    fs::write(engine.cache().artifact_path(&key).unwrap(), "cached").unwrap();
    engine.cache().stamp(&key, source_time).unwrap();
    assert_eq!(engine.render("home", &json!({})).unwrap(), "cached");

    // Touching the source invalidates immediately.
    set_mtime(&source, source_time + Duration::from_secs(10));
    assert_eq!(engine.render("home", &json!({})).unwrap(), "fresh");
}

#[test]
fn test_ttl_keeps_serving_artifact_after_source_edit() {
    let ws = Workspace::new();
    let source = ws.write_view("home", "version one");
    let mut engine = ws.engine(Some(3600));
    assert_eq!(engine.render("home", &json!({})).unwrap(), "version one");

    ws.write_view("home", "version two");
    set_mtime(&source, SystemTime::now() + Duration::from_secs(60));
    assert_eq!(engine.render("home", &json!({})).unwrap(), "version one");
}

#[test]
fn test_ttl_expiry_recompiles() {
    let ws = Workspace::new();
    let source = ws.write_view("home", "version one");
    let mut engine = ws.engine(Some(3600));
    engine.render("home", &json!({})).unwrap();

    ws.write_view("home", "version two");
    let key = view_cache_key(&source);
    engine
        .cache()
        .stamp(&key, SystemTime::now() - Duration::from_secs(3601))
        .unwrap();

    assert_eq!(engine.render("home", &json!({})).unwrap(), "version two");
    assert_eq!(engine.cache().read(&key).unwrap(), "version two");
}

#[test]
fn test_distinct_views_get_distinct_artifacts() {
    let ws = Workspace::new();
    let a = ws.write_view("a", "A");
    let b = ws.write_view("b", "B");
    let mut engine = ws.engine(Some(3600));

    engine.render("a", &json!({})).unwrap();
    engine.render("b", &json!({})).unwrap();

    assert_ne!(view_cache_key(&a), view_cache_key(&b));
    assert_eq!(engine.cache().read(&view_cache_key(&a)).unwrap(), "A");
    assert_eq!(engine.cache().read(&view_cache_key(&b)).unwrap(), "B");
    assert_eq!(engine.cache().clear().unwrap(), 2);
}

#[test]
fn test_failed_cache_write_still_renders() {
    let ws = Workspace::new();
    let source = ws.write_view("home", "hi {{ $x }}");
    let mut engine = ws.engine(Some(3600));

    // A directory where the artifact file belongs: reading and writing fail.
    let key = view_cache_key(&source);
    fs::create_dir(engine.cache().artifact_path(&key).unwrap()).unwrap();

    let out = engine.render("home", &json!({})).unwrap();
    assert_eq!(out, "hi <%- escapeHtml($x) %>");

    let codes: Vec<_> = engine
        .diagnostics()
        .iter()
        .map(|d| d.code.as_deref())
        .collect();
    assert_eq!(codes, vec![Some("V-2-2"), Some("V-2-1")]);
    assert!(!engine.cache().has(&key).unwrap());
}
