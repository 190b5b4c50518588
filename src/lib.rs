//! # fitcode
//!
//! fitcode compresses a codebase into an LLM-ready document that fits a
//! fixed token budget. Each file gets one of six compression levels; a
//! budget planner picks levels so the rendered total meets the budget with
//! as little information loss as it can manage.
//!
//! ## How a run works
//!
//! 1. **Discover**: walk the scan root (gitignore-aware), apply
//!    include/exclude globs, skip binary and empty files.
//! 2. **Count**: baseline token counts via tiktoken encodings.
//! 3. **Override**: caller-supplied pattern rules pin levels; first
//!    matching rule wins and pinned files are never replanned.
//! 4. **Plan**: if everything fits, nothing is compressed. Otherwise an
//!    LLM advisor proposes an assignment (strictly validated); on any
//!    advisory failure a deterministic greedy escalation takes over.
//! 5. **Render**: files are rewritten at their levels in parallel, with
//!    per-file failure recovery and a content-hash render cache.
//! 6. **Refine**: when actual totals still exceed the budget, levels
//!    escalate and rendering repeats, for a bounded number of rounds.
//!
//! An infeasible budget is a normal result (`feasible = false`), not an
//! error; cancellation and deadlines are reported distinctly.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use fitcode::config::Settings;
//!
//! # fn main() -> anyhow::Result<()> {
//! let settings = Settings::load(std::path::Path::new("fitcode.toml"))?;
//! assert_eq!(settings.planner.max_rounds, 3);
//! # Ok(())
//! # }
//! ```

pub mod advisory;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod domain;
pub mod error;
pub mod output;
pub mod overrides;
pub mod pipeline;
pub mod planner;
pub mod render;
pub mod token;

pub use domain::{CompressionLevel, FileRecord, Plan, RunReport, SourceFile};
pub use error::{FitError, FitResult};
pub use overrides::{OverrideResolver, OverrideRule};
pub use pipeline::{Aggregator, Pipeline};
pub use planner::{BudgetPlanner, PlannerConfig};
