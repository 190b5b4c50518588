//! Per-file records flowing through the pipeline

use crate::domain::level::CompressionLevel;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A discovered file with its raw content and baseline token count.
///
/// The baseline is computed once, from the unmodified content, and is the
/// quantity the planner re-weights.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path relative to the scan root (the unique key everywhere)
    pub path: PathBuf,
    /// Unmodified file content
    pub content: String,
    /// Token count of the unmodified content
    pub baseline_tokens: usize,
}

/// Planning state for one file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    /// Path relative to the scan root
    pub path: PathBuf,
    /// Token count of the unmodified content, set once
    pub baseline_tokens: usize,
    /// Currently assigned level
    pub level: CompressionLevel,
    /// True when an override rule fixed the level; forced records are
    /// never revisited by the optimization loop
    pub forced: bool,
    /// Actual rendered token count, filled after rendering
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rendered_tokens: Option<usize>,
}

impl FileRecord {
    /// A free record, plannable at the default level
    pub fn free(path: PathBuf, baseline_tokens: usize) -> Self {
        Self {
            path,
            baseline_tokens,
            level: CompressionLevel::None,
            forced: false,
            rendered_tokens: None,
        }
    }

    /// A record pinned to `level` by an override rule
    pub fn forced(path: PathBuf, baseline_tokens: usize, level: CompressionLevel) -> Self {
        Self {
            path,
            baseline_tokens,
            level,
            forced: true,
            rendered_tokens: None,
        }
    }

    /// Estimated rendered size at the current level, or the actual
    /// rendered count once one exists
    pub fn working_tokens(&self) -> usize {
        self.rendered_tokens
            .unwrap_or_else(|| self.level.estimate(self.baseline_tokens))
    }
}
