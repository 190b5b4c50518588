mod common;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use fitcode::advisory::Advisor;
use fitcode::domain::CompressionLevel;
use fitcode::error::FitError;
use fitcode::{OverrideResolver, OverrideRule};

use common::{pipeline, source, FractionRenderer, ScriptedAdvisor};

#[tokio::test]
async fn no_budget_runs_one_round_at_default_level() -> anyhow::Result<()> {
    let advisor = Arc::new(ScriptedAdvisor::uniform(CompressionLevel::Max));
    let pipeline = pipeline(
        Arc::new(FractionRenderer::new()),
        Some(advisor.clone() as Arc<dyn Advisor>),
    );

    let report = pipeline
        .execute(
            vec![source("a.rs", 600), source("b.rs", 400)],
            &OverrideResolver::empty(),
            None,
            &CancellationToken::new(),
        )
        .await?;

    assert!(report.feasible);
    assert_eq!(report.rounds_used, 1);
    assert_eq!(advisor.calls(), 0, "budget absent: the advisor is never consulted");
    for file in &report.files {
        assert_eq!(file.level, CompressionLevel::Trim);
    }
    Ok(())
}

#[tokio::test]
async fn generous_budget_preserves_everything() -> anyhow::Result<()> {
    let renderer = Arc::new(FractionRenderer::new());
    let pipeline = pipeline(renderer.clone(), None);

    let report = pipeline
        .execute(
            vec![source("a.rs", 600), source("b.rs", 400)],
            &OverrideResolver::empty(),
            Some(100_000),
            &CancellationToken::new(),
        )
        .await?;

    assert!(report.feasible);
    assert_eq!(renderer.calls(), 0, "uncompressed files never hit the renderer");
    for file in &report.files {
        assert_eq!(file.level, CompressionLevel::None);
        assert_eq!(file.rendered_tokens, file.baseline_tokens);
    }
    Ok(())
}

#[tokio::test]
async fn render_failure_keeps_the_file_at_baseline() -> anyhow::Result<()> {
    let renderer = Arc::new(FractionRenderer::failing_on("b.rs"));
    let pipeline = pipeline(renderer, None);

    let total_baseline: usize = [600, 500, 400].iter().sum();
    let report = pipeline
        .execute(
            vec![source("a.rs", 600), source("b.rs", 500), source("c.rs", 400)],
            &OverrideResolver::empty(),
            // Forces real compression on every file
            Some(total_baseline / 2),
            &CancellationToken::new(),
        )
        .await?;

    assert_eq!(report.files.len(), 3, "no file is ever dropped");
    assert_eq!(report.failure_count(), 1);

    let b = report.files.iter().find(|f| f.path.ends_with("b.rs")).unwrap();
    assert!(b.render_failure.is_some());
    assert_eq!(b.rendered_tokens, b.baseline_tokens, "baseline substituted");
    assert!(b.content.starts_with("word word") || b.content.starts_with("word "));

    for name in ["a.rs", "c.rs"] {
        let f = report.files.iter().find(|f| f.path.ends_with(name)).unwrap();
        assert!(f.render_failure.is_none());
        assert!(f.rendered_tokens < f.baseline_tokens);
    }
    Ok(())
}

#[tokio::test]
async fn impossible_budget_reports_infeasible_within_round_limit() -> anyhow::Result<()> {
    let pipeline = pipeline(Arc::new(FractionRenderer::new()), None);

    // Even a max-level summary of each file exceeds this budget
    let report = pipeline
        .execute(
            vec![source("a.rs", 5000), source("b.rs", 4000)],
            &OverrideResolver::empty(),
            Some(20),
            &CancellationToken::new(),
        )
        .await?;

    assert!(!report.feasible);
    assert!(report.rounds_used <= 3);
    assert_eq!(report.files.len(), 2);
    Ok(())
}

#[tokio::test]
async fn overrides_pin_levels_through_the_whole_run() -> anyhow::Result<()> {
    let rules = [
        OverrideRule::new("docs/*.md", CompressionLevel::Max),
        OverrideRule::new("core.rs", CompressionLevel::None),
    ];
    let resolver = OverrideResolver::new(&rules)?;
    let pipeline = pipeline(Arc::new(FractionRenderer::new()), None);

    let report = pipeline
        .execute(
            vec![
                source("core.rs", 800),
                source("docs/guide.md", 900),
                source("helper.rs", 700),
            ],
            &resolver,
            Some(1200),
            &CancellationToken::new(),
        )
        .await?;

    let core = report.files.iter().find(|f| f.path.ends_with("core.rs")).unwrap();
    assert_eq!(core.level, CompressionLevel::None);
    assert_eq!(core.rendered_tokens, core.baseline_tokens);

    let guide = report
        .files
        .iter()
        .find(|f| f.path.ends_with("guide.md"))
        .unwrap();
    assert_eq!(guide.level, CompressionLevel::Max);
    Ok(())
}

#[tokio::test]
async fn cancellation_is_distinct_from_infeasibility() {
    let pipeline = pipeline(Arc::new(FractionRenderer::new()), None);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = pipeline
        .execute(
            vec![source("a.rs", 600)],
            &OverrideResolver::empty(),
            Some(10),
            &cancel,
        )
        .await;

    assert!(matches!(result, Err(FitError::Cancelled)));
}

#[tokio::test]
async fn malformed_override_pattern_fails_resolution_wholesale() {
    let rules = [
        OverrideRule::new("*.rs", CompressionLevel::None),
        OverrideRule::new("[oops", CompressionLevel::Max),
    ];
    let error = OverrideResolver::new(&rules).unwrap_err();
    assert_eq!(error.rule, 1);
    assert!(error.to_string().contains("[oops"));
}
