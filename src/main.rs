use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use fitcode::advisory::{LlmAdvisor, LlmAdvisorConfig};
use fitcode::cli::Cli;
use fitcode::config::Settings;
use fitcode::discovery::{DiscoveryOptions, FileDiscovery};
use fitcode::domain::SourceFile;
use fitcode::error::FitError;
use fitcode::output::{OutputOptions, OutputWriter};
use fitcode::render::{LlmRenderer, LlmRendererConfig, RenderCache};
use fitcode::token::TokenCounter;
use fitcode::{Aggregator, BudgetPlanner, OverrideResolver, Pipeline, PlannerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut settings = Settings::load(&cli.config)?;
    cli.apply_to(&mut settings);

    let started = Instant::now();
    let counter = Arc::new(TokenCounter::new(&settings.tokenizer.encoding));

    let options = DiscoveryOptions {
        include: cli.include_patterns(),
        exclude: cli.exclude_patterns(),
        respect_gitignore: !cli.no_ignore,
        strict_glob: cli.strict_glob,
    };
    let (discovery, pattern_warnings) = FileDiscovery::new(&options);
    for warning in &pattern_warnings {
        warn!("{warning}");
    }

    let (files, walk_warnings) = discovery.discover(&cli.path)?;
    for warning in &walk_warnings {
        warn!("{warning}");
    }
    if files.is_empty() {
        return Err(FitError::NoFiles(cli.path.display().to_string()).into());
    }
    info!("Found {} files to process", files.len());

    let sources: Vec<SourceFile> = files
        .into_iter()
        .map(|f| {
            let baseline_tokens = counter.count(&f.content);
            SourceFile {
                path: f.path,
                content: f.content,
                baseline_tokens,
            }
        })
        .collect();

    let budget = cli.budget_tokens().map_err(FitError::Configuration)?;

    if cli.count_only {
        let mut total = 0;
        for source in &sources {
            info!("{}: {} tokens", source.path.display(), source.baseline_tokens);
            total += source.baseline_tokens;
        }
        info!("Total files: {}", sources.len());
        info!("Total tokens: {}", total);
        if let Some(budget) = budget {
            info!(
                "Budget: {} tokens ({:.1}% used)",
                budget,
                total as f64 / budget as f64 * 100.0
            );
        }
        return Ok(());
    }

    let resolver = OverrideResolver::new(&cli.override_rules()).map_err(FitError::from)?;

    let renderer = LlmRenderer::new(LlmRendererConfig {
        model: settings.render.model.clone(),
        base_url: settings.api.base_url.clone(),
        api_key_env: settings.api.api_key_env.clone(),
        timeout_secs: settings.render.timeout_secs,
        retry_window_secs: settings.render.retry_window_secs,
    })
    .map_err(|e| FitError::Configuration(format!("renderer unavailable: {e}")))?;

    let mut planner = BudgetPlanner::new(PlannerConfig {
        default_level: settings.planner.default_level,
        max_rounds: settings.planner.max_rounds,
    });
    if budget.is_some() {
        match LlmAdvisor::new(LlmAdvisorConfig {
            model: settings.planner.model.clone(),
            base_url: settings.api.base_url.clone(),
            api_key_env: settings.api.api_key_env.clone(),
            timeout_secs: settings.planner.timeout_secs,
        }) {
            Ok(advisor) => planner = planner.with_advisor(Arc::new(advisor)),
            Err(e) => {
                warn!("advisor unavailable, planning falls back to greedy escalation: {e}")
            }
        }
    }

    let aggregator = Aggregator::new(
        Arc::new(renderer),
        Arc::new(RenderCache::new()),
        Arc::clone(&counter),
        settings.render.concurrency,
    );
    let pipeline = Pipeline::new(planner, aggregator, settings.planner.buffer_percent);

    let cancel = CancellationToken::new();
    let interrupt_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling");
            interrupt_token.cancel();
        }
    });

    let report = match cli.timeout_secs {
        Some(secs) => {
            tokio::select! {
                result = pipeline.execute(sources, &resolver, budget, &cancel) => result,
                _ = tokio::time::sleep(Duration::from_secs(secs)) => {
                    cancel.cancel();
                    Err(FitError::DeadlineExceeded(secs))
                }
            }
        }
        None => pipeline.execute(sources, &resolver, budget, &cancel).await,
    }?;

    let writer = OutputWriter::new(OutputOptions {
        output_dir: settings.output.dir.clone(),
        clipboard: settings.output.clipboard,
    });
    writer.write(&report, started.elapsed())?;

    if !report.feasible {
        warn!(
            "budget not met: {} tokens against {} after {} rounds",
            report.total_rendered_tokens,
            report.budget.unwrap_or(0),
            report.rounds_used
        );
    }

    Ok(())
}
