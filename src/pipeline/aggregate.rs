//! Plan rendering and totaling
//!
//! The aggregator renders every file in a plan at its assigned level with
//! bounded parallelism, substitutes baseline content for files whose
//! render fails, and sums the result only after all tasks have joined.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::domain::{FileReport, Plan, SourceFile, MIN_COMPRESSED_TOKENS};
use crate::error::{FitError, FitResult};
use crate::render::{RenderCache, Renderer};
use crate::token::TokenCounter;

/// Renders plans and reports actual token totals
pub struct Aggregator {
    renderer: Arc<dyn Renderer>,
    cache: Arc<RenderCache>,
    counter: Arc<TokenCounter>,
    concurrency: usize,
}

impl Aggregator {
    /// The cache is an explicit collaborator so callers can share it
    /// across rounds and runs, or hand in a fresh one per test.
    pub fn new(
        renderer: Arc<dyn Renderer>,
        cache: Arc<RenderCache>,
        counter: Arc<TokenCounter>,
        concurrency: usize,
    ) -> Self {
        Self {
            renderer,
            cache,
            counter,
            concurrency: concurrency.max(1),
        }
    }

    /// Render every file in `plan` and return per-file reports in path
    /// order plus the recomputed total.
    ///
    /// A render failure downgrades that one file to its baseline content
    /// and records the failure; it never aborts the run. Cancellation
    /// aborts outstanding work and discards partial results.
    pub async fn render_plan(
        &self,
        plan: &Plan,
        sources: &BTreeMap<PathBuf, SourceFile>,
        cancel: &CancellationToken,
    ) -> FitResult<(Vec<FileReport>, usize)> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for record in plan.records() {
            let source = sources.get(&record.path).ok_or_else(|| {
                FitError::Configuration(format!(
                    "plan references unknown file {}",
                    record.path.display()
                ))
            })?;

            let renderer = Arc::clone(&self.renderer);
            let cache = Arc::clone(&self.cache);
            let counter = Arc::clone(&self.counter);
            let semaphore = Arc::clone(&semaphore);
            let path = record.path.clone();
            let content = source.content.clone();
            let baseline_tokens = record.baseline_tokens;
            let level = record.level;

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore open");
                render_one(
                    renderer.as_ref(),
                    &cache,
                    &counter,
                    path,
                    content,
                    baseline_tokens,
                    level,
                )
                .await
            });
        }

        let mut reports = Vec::with_capacity(plan.files.len());
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tasks.abort_all();
                    return Err(FitError::Cancelled);
                }
                joined = tasks.join_next() => match joined {
                    None => break,
                    Some(Ok(report)) => reports.push(report),
                    Some(Err(e)) if e.is_cancelled() => return Err(FitError::Cancelled),
                    Some(Err(e)) => {
                        return Err(FitError::Configuration(format!("render task failed: {e}")))
                    }
                },
            }
        }

        reports.sort_by(|a, b| a.path.cmp(&b.path));
        let total = reports.iter().map(|r| r.rendered_tokens).sum();
        Ok((reports, total))
    }
}

async fn render_one(
    renderer: &dyn Renderer,
    cache: &RenderCache,
    counter: &TokenCounter,
    path: PathBuf,
    content: String,
    baseline_tokens: usize,
    level: crate::domain::CompressionLevel,
) -> FileReport {
    use crate::domain::CompressionLevel;

    // Uncompressed files and files already at the floor need no call
    if level == CompressionLevel::None || baseline_tokens <= MIN_COMPRESSED_TOKENS {
        return FileReport {
            path,
            level,
            baseline_tokens,
            rendered_tokens: baseline_tokens,
            content,
            render_failure: None,
        };
    }

    if let Some(rendered) = cache.get(&content, level) {
        let rendered_tokens = counter.count(&rendered);
        return FileReport {
            path,
            level,
            baseline_tokens,
            rendered_tokens,
            content: rendered,
            render_failure: None,
        };
    }

    match renderer.render(&path, &content, level).await {
        Ok(rendered) => {
            cache.put(&content, level, rendered.clone());
            let rendered_tokens = counter.count(&rendered);
            FileReport {
                path,
                level,
                baseline_tokens,
                rendered_tokens,
                content: rendered,
                render_failure: None,
            }
        }
        Err(e) => {
            // Keep the file: fall back to the unmodified content and
            // record the failure against it
            warn!(path = %path.display(), error = %e, "render failed, using baseline content");
            FileReport {
                path,
                level,
                baseline_tokens,
                rendered_tokens: baseline_tokens,
                content,
                render_failure: Some(e.to_string()),
            }
        }
    }
}
