//! Plans and run reports

use crate::domain::file::FileRecord;
use crate::domain::level::CompressionLevel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A level assignment for every file, forced and free
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// All records, keyed by path. BTreeMap keeps iteration (and every
    /// serialized form) deterministic.
    pub files: BTreeMap<PathBuf, FileRecord>,
    /// Sum of per-file estimates at the assigned levels
    pub estimated_total: usize,
    /// Whether the estimate fits the requested budget (true when no
    /// budget was requested)
    pub feasible: bool,
}

impl Plan {
    /// Build a plan from records, recomputing the estimate from scratch
    pub fn from_records(records: Vec<FileRecord>, budget: Option<usize>) -> Self {
        let estimated_total = records.iter().map(|r| r.working_tokens()).sum();
        let files: BTreeMap<PathBuf, FileRecord> =
            records.into_iter().map(|r| (r.path.clone(), r)).collect();
        let feasible = budget.map_or(true, |b| estimated_total <= b);
        Self {
            files,
            estimated_total,
            feasible,
        }
    }

    /// Level assigned to `path`, if the plan knows the file
    pub fn level_of(&self, path: &Path) -> Option<CompressionLevel> {
        self.files.get(path).map(|r| r.level)
    }

    /// Records in deterministic path order
    pub fn records(&self) -> impl Iterator<Item = &FileRecord> {
        self.files.values()
    }

    /// Count of files per assigned level, for summaries
    pub fn level_distribution(&self) -> BTreeMap<CompressionLevel, usize> {
        let mut counts = BTreeMap::new();
        for record in self.files.values() {
            *counts.entry(record.level).or_insert(0) += 1;
        }
        counts
    }
}

/// One file's outcome after rendering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    /// Path relative to the scan root
    pub path: PathBuf,
    /// Level the file was rendered at
    pub level: CompressionLevel,
    /// Token count of the unmodified content
    pub baseline_tokens: usize,
    /// Token count of the rendered content
    pub rendered_tokens: usize,
    /// Rendered content (baseline content when rendering failed)
    #[serde(skip)]
    pub content: String,
    /// Render failure recorded against this file, if any. The content
    /// then holds the unmodified baseline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub render_failure: Option<String>,
}

/// Final result of a budget run: the sole externally visible output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Per-file outcomes in deterministic path order
    pub files: Vec<FileReport>,
    /// Sum of rendered tokens across all files
    pub total_rendered_tokens: usize,
    /// The requested budget, if one was given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<usize>,
    /// Whether the total fits the budget (true when no budget)
    pub feasible: bool,
    /// Planning/render rounds used
    pub rounds_used: usize,
}

impl RunReport {
    /// Count of files whose render failed and fell back to baseline
    pub fn failure_count(&self) -> usize {
        self.files.iter().filter(|f| f.render_failure.is_some()).count()
    }
}
