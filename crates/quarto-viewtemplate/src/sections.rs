/*
 * sections.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Section/yield storage.
//!
//! `@section` writes into the store and `@yield` reads from it. One store
//! lives inside each [`CompileContext`](crate::compiler::CompileContext), so
//! every view compiled for the same render (the top-level view plus all of
//! its includes and parents) sees the same sections, while separate renders
//! never observe each other's entries.

use std::collections::HashMap;

/// Mapping from section key to content. Later writes win.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionStore {
    entries: HashMap<String, String>,
}

impl SectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `content` under `key`, replacing any earlier value.
    pub fn insert(&mut self, key: impl Into<String>, content: impl Into<String>) {
        self.entries.insert(key.into(), content.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}
