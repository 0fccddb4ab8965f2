/*
 * loader.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! View source loading.
//!
//! The compiler reads nested views (`@include`, `@extends`) through a
//! [`TemplateLoader`], so it can be pointed at the filesystem in production
//! and at an in-memory map in tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{ViewError, ViewResult};

/// Default filename suffix for views.
pub const DEFAULT_SUFFIX: &str = ".view.html";

/// Trait for loading view sources by logical name.
pub trait TemplateLoader {
    /// Resolve a logical view name to the path it would be loaded from.
    fn view_path(&self, name: &str) -> PathBuf;

    /// Load a view's source text.
    ///
    /// # Errors
    /// [`ViewError::NotFound`] when no such view exists, [`ViewError::Read`]
    /// when it exists but cannot be read as UTF-8 text.
    fn load(&self, name: &str) -> ViewResult<String>;
}

/// Loader that reads views from a directory on disk.
#[derive(Debug, Clone)]
pub struct FileSystemLoader {
    views_dir: PathBuf,
    suffix: String,
}

impl FileSystemLoader {
    pub fn new(views_dir: impl Into<PathBuf>) -> Self {
        Self {
            views_dir: views_dir.into(),
            suffix: DEFAULT_SUFFIX.to_string(),
        }
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    pub fn set_suffix(&mut self, suffix: impl Into<String>) {
        self.suffix = suffix.into();
    }

    pub fn views_dir(&self) -> &Path {
        &self.views_dir
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }
}

impl TemplateLoader for FileSystemLoader {
    fn view_path(&self, name: &str) -> PathBuf {
        resolve_view_path(&self.views_dir, name, &self.suffix)
    }

    fn load(&self, name: &str) -> ViewResult<String> {
        let path = self.view_path(name);
        if !path.is_file() {
            return Err(ViewError::NotFound {
                name: name.to_string(),
                path,
            });
        }
        std::fs::read_to_string(&path).map_err(|source| ViewError::Read {
            name: name.to_string(),
            source,
        })
    }
}

/// Loader that serves views from an in-memory map.
///
/// Useful for testing and for views bundled into the application. Names are
/// looked up exactly as written, without suffix handling.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    views: HashMap<String, String>,
}

impl MemoryLoader {
    /// Create a new empty memory loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a view to the loader.
    pub fn add(&mut self, name: impl Into<String>, source: impl Into<String>) -> &mut Self {
        self.views.insert(name.into(), source.into());
        self
    }

    /// Create a loader with the given views.
    pub fn with_views(
        views: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
    ) -> Self {
        let mut loader = Self::new();
        for (name, source) in views {
            loader.add(name, source);
        }
        loader
    }
}

impl TemplateLoader for MemoryLoader {
    fn view_path(&self, name: &str) -> PathBuf {
        PathBuf::from(name)
    }

    fn load(&self, name: &str) -> ViewResult<String> {
        self.views
            .get(name)
            .cloned()
            .ok_or_else(|| ViewError::NotFound {
                name: name.to_string(),
                path: PathBuf::from(name),
            })
    }
}

/// Resolve the path to a view file.
///
/// A leading `/` is ignored and `suffix` is appended unless the name already
/// ends with it.
///
/// # Examples
///
/// ```ignore
/// // views: /app/views, suffix: .view.html
/// // "home"            → /app/views/home.view.html
/// // "/admin/users"    → /app/views/admin/users.view.html
/// // "home.view.html"  → /app/views/home.view.html
/// ```
pub fn resolve_view_path(views_dir: &Path, name: &str, suffix: &str) -> PathBuf {
    let name = name.trim_start_matches('/');
    if name.ends_with(suffix) {
        views_dir.join(name)
    } else {
        views_dir.join(format!("{name}{suffix}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_view_path_appends_suffix() {
        let result = resolve_view_path(Path::new("/views"), "home", ".view.html");
        assert_eq!(result, PathBuf::from("/views/home.view.html"));
    }

    #[test]
    fn test_resolve_view_path_keeps_existing_suffix() {
        let result = resolve_view_path(Path::new("/views"), "home.view.html", ".view.html");
        assert_eq!(result, PathBuf::from("/views/home.view.html"));
    }

    #[test]
    fn test_resolve_view_path_strips_leading_slash() {
        let result = resolve_view_path(Path::new("/views"), "/admin/users", ".tpl");
        assert_eq!(result, PathBuf::from("/views/admin/users.tpl"));
    }

    #[test]
    fn test_memory_loader() {
        let mut loader = MemoryLoader::new();
        loader.add("header", "<h1>Title</h1>");

        assert_eq!(loader.load("header").unwrap(), "<h1>Title</h1>");
        assert!(matches!(
            loader.load("missing"),
            Err(ViewError::NotFound { .. })
        ));
    }

    #[test]
    fn test_memory_loader_with_views() {
        let loader = MemoryLoader::with_views([("a", "content a"), ("b", "content b")]);
        assert_eq!(loader.load("a").unwrap(), "content a");
        assert_eq!(loader.load("b").unwrap(), "content b");
    }

    #[test]
    fn test_file_system_loader() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("page.tpl"), "hello").unwrap();
        let loader = FileSystemLoader::new(dir.path()).with_suffix(".tpl");

        assert_eq!(loader.load("page").unwrap(), "hello");
        assert!(matches!(
            loader.load("other"),
            Err(ViewError::NotFound { .. })
        ));
    }

    #[test]
    fn test_file_system_loader_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bin.tpl"), [0xff, 0xfe, 0x00]).unwrap();
        let loader = FileSystemLoader::new(dir.path()).with_suffix(".tpl");

        assert!(matches!(loader.load("bin"), Err(ViewError::Read { .. })));
    }
}
