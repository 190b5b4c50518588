//! Render result cache
//!
//! Keyed by (content digest, level), so an unchanged file re-rendered at
//! the same level across rounds or runs costs nothing. An explicit object
//! handed to the aggregator; no module-level state.

use std::collections::HashMap;
use std::sync::RwLock;

use sha2::{Digest, Sha256};

use crate::domain::CompressionLevel;

/// In-memory cache of rendered content
#[derive(Default)]
pub struct RenderCache {
    entries: RwLock<HashMap<(String, CompressionLevel), String>>,
}

impl RenderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached rendering of `content` at `level`, if present
    pub fn get(&self, content: &str, level: CompressionLevel) -> Option<String> {
        let key = (Self::digest(content), level);
        self.entries.read().unwrap().get(&key).cloned()
    }

    /// Store a rendering of `content` at `level`
    pub fn put(&self, content: &str, level: CompressionLevel, rendered: String) {
        let key = (Self::digest(content), level);
        self.entries.write().unwrap().insert(key, rendered);
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().unwrap().is_empty()
    }

    fn digest(content: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}
