//! Advisory service interface
//!
//! The advisory service proposes a level assignment to meet a budget. It is
//! external, non-deterministic, and untrusted: every proposal is validated
//! against the exact problem it was asked, and any deviation is treated as
//! a failure, never repaired. Planning falls back to a deterministic
//! strategy on any failure, so an advisor is strictly optional.

pub mod llm;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use crate::domain::CompressionLevel;
use crate::error::{AdvisoryError, AdvisoryResult};

pub use llm::{LlmAdvisor, LlmAdvisorConfig};

/// One plannable file as presented to the advisor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemFile {
    /// Path relative to the scan root
    pub path: PathBuf,
    /// Token count of the unmodified content
    pub baseline_tokens: usize,
    /// When true the file must stay at the no-compression level; a
    /// proposal assigning anything else is invalid
    #[serde(default)]
    pub keep: bool,
}

/// Compact description of a planning round for the advisor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanningProblem {
    /// Free files, in deterministic path order
    pub files: Vec<ProblemFile>,
    /// Tokens available for the free files (budget minus forced cost)
    pub headroom: usize,
    /// Sum of baseline tokens over the free files
    pub total_tokens: usize,
}

impl PlanningProblem {
    pub fn new(mut files: Vec<ProblemFile>, headroom: usize) -> Self {
        files.sort_by(|a, b| a.path.cmp(&b.path));
        let total_tokens = files.iter().map(|f| f.baseline_tokens).sum();
        Self {
            files,
            headroom,
            total_tokens,
        }
    }
}

/// A proposed level per file, as returned by an advisor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LevelProposal {
    pub assignments: BTreeMap<PathBuf, CompressionLevel>,
}

/// An external planner proposing level assignments.
///
/// Implementations must be safe to call once per planning round; the
/// caller enforces its own timeout on top of any the implementation has.
#[async_trait]
pub trait Advisor: Send + Sync {
    /// Implementation name, for logs
    fn name(&self) -> &str;

    /// Propose a level per file in `problem`
    async fn propose(&self, problem: &PlanningProblem) -> AdvisoryResult<LevelProposal>;
}

/// Validate a proposal against the problem it answers.
///
/// A valid proposal covers every problem file exactly once, names no other
/// path, and leaves keep-marked files uncompressed. Anything else fails
/// wholesale; partial repair would launder an untrusted response into the
/// plan.
pub fn validate_proposal(
    problem: &PlanningProblem,
    proposal: &LevelProposal,
) -> AdvisoryResult<()> {
    let expected: BTreeSet<&PathBuf> = problem.files.iter().map(|f| &f.path).collect();

    for path in proposal.assignments.keys() {
        if !expected.contains(path) {
            return Err(AdvisoryError::Invalid(format!(
                "proposal names unknown path {}",
                path.display()
            )));
        }
    }

    for file in &problem.files {
        let level = proposal.assignments.get(&file.path).ok_or_else(|| {
            AdvisoryError::Invalid(format!("proposal omits {}", file.path.display()))
        })?;
        if file.keep && *level != CompressionLevel::None {
            return Err(AdvisoryError::Invalid(format!(
                "proposal compresses keep-marked file {}",
                file.path.display()
            )));
        }
    }

    Ok(())
}
