//! End-to-end compression pipeline
//!
//! Wires the planner and the aggregator into the bounded plan/render/check
//! loop: plan levels, render them, compare actual totals against the
//! budget, escalate and re-render while rounds remain. Rounds are strictly
//! sequential; rendering inside a round is parallel.

pub mod aggregate;

use std::collections::BTreeMap;
use std::path::PathBuf;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::domain::{FileRecord, Plan, RunReport, SourceFile};
use crate::error::FitResult;
use crate::overrides::OverrideResolver;
use crate::planner::BudgetPlanner;

pub use aggregate::Aggregator;

/// Orchestrates planning, rendering, and refinement
pub struct Pipeline {
    planner: BudgetPlanner,
    aggregator: Aggregator,
    /// Percentage shaved off the budget as the planning target, so
    /// estimate drift has margin before the hard limit
    buffer_percent: u8,
}

impl Pipeline {
    pub fn new(planner: BudgetPlanner, aggregator: Aggregator, buffer_percent: u8) -> Self {
        Self {
            planner,
            aggregator,
            buffer_percent: buffer_percent.min(99),
        }
    }

    /// Run the whole pipeline over `sources`.
    ///
    /// Forced levels come from `resolver`; the remaining files are planned
    /// against `budget`. Returns the final report, `feasible = false` when
    /// the budget is out of reach within the round limit. Cancellation via
    /// `cancel` aborts with an error and discards partial renders.
    pub async fn execute(
        &self,
        sources: Vec<SourceFile>,
        resolver: &OverrideResolver,
        budget: Option<usize>,
        cancel: &CancellationToken,
    ) -> FitResult<RunReport> {
        let source_map: BTreeMap<PathBuf, SourceFile> = sources
            .into_iter()
            .map(|s| (s.path.clone(), s))
            .collect();

        let mut forced = Vec::new();
        let mut free = Vec::new();
        for source in source_map.values() {
            match resolver.resolve(&source.path) {
                Some(level) => forced.push(FileRecord::forced(
                    source.path.clone(),
                    source.baseline_tokens,
                    level,
                )),
                None => free.push(FileRecord::free(
                    source.path.clone(),
                    source.baseline_tokens,
                )),
            }
        }
        info!(
            files = source_map.len(),
            forced = forced.len(),
            budget = ?budget,
            "planning compression"
        );

        let target = budget.map(|b| b.saturating_sub(b * self.buffer_percent as usize / 100));
        let round_limit = self.planner.config().max_rounds.max(1);

        let mut plan = self.planner.plan(free, forced, target).await;
        let mut rounds = 0;
        loop {
            rounds += 1;
            debug!(round = rounds, estimate = plan.estimated_total, "rendering plan");

            let (reports, total) = self
                .aggregator
                .render_plan(&plan, &source_map, cancel)
                .await?;

            let feasible = budget.map_or(true, |b| total <= b);
            if feasible {
                info!(total, rounds, "plan rendered within budget");
                return Ok(RunReport {
                    files: reports,
                    total_rendered_tokens: total,
                    budget,
                    feasible: true,
                    rounds_used: rounds,
                });
            }

            if rounds >= round_limit {
                info!(total, rounds, "round limit reached, returning best plan");
                return Ok(RunReport {
                    files: reports,
                    total_rendered_tokens: total,
                    budget,
                    feasible: false,
                    rounds_used: rounds,
                });
            }

            // Seed the next round with the actual rendered sizes, then
            // escalate toward the planning target
            let with_actuals = apply_actuals(&plan, &reports);
            match self
                .planner
                .refine(&with_actuals, target.expect("budget present when infeasible"))
            {
                Some(next) => plan = next,
                None => {
                    info!(total, rounds, "nothing left to escalate, returning best plan");
                    return Ok(RunReport {
                        files: reports,
                        total_rendered_tokens: total,
                        budget,
                        feasible: false,
                        rounds_used: rounds,
                    });
                }
            }
        }
    }
}

/// Copy actual rendered token counts into a plan's records
fn apply_actuals(plan: &Plan, reports: &[crate::domain::FileReport]) -> Plan {
    let mut records: Vec<FileRecord> = plan.records().cloned().collect();
    let actuals: BTreeMap<&PathBuf, usize> = reports
        .iter()
        .map(|r| (&r.path, r.rendered_tokens))
        .collect();
    for record in &mut records {
        if let Some(actual) = actuals.get(&record.path) {
            record.rendered_tokens = Some(*actual);
        }
    }
    let mut next = Plan::from_records(records, None);
    next.feasible = plan.feasible;
    next
}
