//! Shared doubles and fixtures for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use fitcode::advisory::{Advisor, LevelProposal, PlanningProblem};
use fitcode::domain::{CompressionLevel, SourceFile};
use fitcode::error::{AdvisoryError, AdvisoryResult, RenderError, RenderResult};
use fitcode::pipeline::Aggregator;
use fitcode::render::{RenderCache, Renderer};
use fitcode::token::TokenCounter;
use fitcode::{BudgetPlanner, Pipeline, PlannerConfig};

/// Renderer that honors the nominal retain fraction of each level by
/// truncating tokens, so estimates and actuals agree.
pub struct FractionRenderer {
    counter: TokenCounter,
    pub calls: AtomicUsize,
    /// Paths containing this needle fail with a render error
    pub fail_needle: Option<&'static str>,
}

impl FractionRenderer {
    pub fn new() -> Self {
        Self {
            counter: TokenCounter::new(fitcode::token::DEFAULT_ENCODING),
            calls: AtomicUsize::new(0),
            fail_needle: None,
        }
    }

    pub fn failing_on(needle: &'static str) -> Self {
        Self {
            fail_needle: Some(needle),
            ..Self::new()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Renderer for FractionRenderer {
    fn name(&self) -> &str {
        "fraction"
    }

    async fn render(
        &self,
        path: &Path,
        content: &str,
        level: CompressionLevel,
    ) -> RenderResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(needle) = self.fail_needle {
            if path.to_string_lossy().contains(needle) {
                return Err(RenderError::Api {
                    status: 503,
                    message: "synthetic failure".to_string(),
                });
            }
        }
        let baseline = self.counter.count(content);
        let target = level.estimate(baseline);
        Ok(self.counter.truncate_to_tokens(content, target))
    }
}

/// Advisor double with a scripted reply and a call counter
pub struct ScriptedAdvisor {
    pub calls: AtomicUsize,
    reply: Box<dyn Fn(&PlanningProblem) -> AdvisoryResult<LevelProposal> + Send + Sync>,
}

impl ScriptedAdvisor {
    pub fn unavailable() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            reply: Box::new(|_| Err(AdvisoryError::Service("unreachable".to_string()))),
        }
    }

    pub fn uniform(level: CompressionLevel) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            reply: Box::new(move |problem| {
                Ok(LevelProposal {
                    assignments: problem
                        .files
                        .iter()
                        .map(|f| (f.path.clone(), level))
                        .collect(),
                })
            }),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Advisor for ScriptedAdvisor {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn propose(&self, problem: &PlanningProblem) -> AdvisoryResult<LevelProposal> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.reply)(problem)
    }
}

/// Build a source file whose baseline count is real
pub fn source(path: &str, words: usize) -> SourceFile {
    let content = "word ".repeat(words);
    let counter = TokenCounter::new(fitcode::token::DEFAULT_ENCODING);
    SourceFile {
        path: PathBuf::from(path),
        baseline_tokens: counter.count(&content),
        content,
    }
}

/// Standard pipeline wiring over the given doubles
pub fn pipeline(renderer: Arc<dyn Renderer>, advisor: Option<Arc<dyn Advisor>>) -> Pipeline {
    let mut planner = BudgetPlanner::new(PlannerConfig::default());
    if let Some(advisor) = advisor {
        planner = planner.with_advisor(advisor);
    }
    let aggregator = Aggregator::new(
        renderer,
        Arc::new(RenderCache::new()),
        Arc::new(TokenCounter::new(fitcode::token::DEFAULT_ENCODING)),
        4,
    );
    // Buffer at zero keeps arithmetic exact for assertions
    Pipeline::new(planner, aggregator, 0)
}
