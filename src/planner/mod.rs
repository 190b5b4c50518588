//! Budget planning
//!
//! Given per-file baseline token counts, forced-level overrides, and a
//! token budget, the planner assigns a compression level to every free
//! file. Strategy, in order:
//!
//! 1. Cheap path: everything already fits, assign no compression.
//! 2. Advisory path: ask the external advisor for an assignment, validated
//!    strictly.
//! 3. Deterministic fallback: greedy step-wise escalation, largest files
//!    first, no external calls.
//!
//! The fallback also runs after a validated proposal that does not fit,
//! so the planner's output always fits the budget when that is reachable
//! at all.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::advisory::{validate_proposal, Advisor, PlanningProblem, ProblemFile};
use crate::domain::{CompressionLevel, FileRecord, Plan};

/// Planner knobs
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Level for free files when no budget is given
    pub default_level: CompressionLevel,
    /// Upper bound on plan/render rounds per run
    pub max_rounds: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            default_level: CompressionLevel::Trim,
            max_rounds: 3,
        }
    }
}

/// Assigns compression levels so the estimated total meets the budget
pub struct BudgetPlanner {
    advisor: Option<Arc<dyn Advisor>>,
    config: PlannerConfig,
}

impl BudgetPlanner {
    pub fn new(config: PlannerConfig) -> Self {
        Self {
            advisor: None,
            config,
        }
    }

    /// Attach an advisory service. Without one the planner goes straight
    /// to the deterministic fallback.
    pub fn with_advisor(mut self, advisor: Arc<dyn Advisor>) -> Self {
        self.advisor = Some(advisor);
        self
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Produce a level assignment for every file.
    ///
    /// `free` excludes forced records; those come back in the output plan
    /// unchanged. Never fails: advisory trouble degrades to the fallback.
    pub async fn plan(
        &self,
        mut free: Vec<FileRecord>,
        forced: Vec<FileRecord>,
        budget: Option<usize>,
    ) -> Plan {
        let forced_cost: usize = forced.iter().map(|r| r.working_tokens()).sum();

        let Some(budget) = budget else {
            // No budget: default level everywhere, no optimization pass
            for record in &mut free {
                record.level = self.config.default_level;
            }
            return Plan::from_records(merge(forced, free), None);
        };

        if free.is_empty() {
            return Plan::from_records(forced, Some(budget));
        }

        if forced_cost > budget {
            // Forced files alone blow the budget; the best the free files
            // can do is get out of the way
            warn!(
                forced_cost,
                budget, "forced files alone exceed the budget; plan is infeasible"
            );
            for record in &mut free {
                record.level = CompressionLevel::Max;
                record.rendered_tokens = None;
            }
            return Plan::from_records(merge(forced, free), Some(budget));
        }

        let baseline_total: usize = free.iter().map(|r| r.baseline_tokens).sum();
        if baseline_total + forced_cost <= budget {
            // Cheap path: maximal fidelity, no advisory call
            debug!(baseline_total, forced_cost, budget, "cheap path: everything fits");
            for record in &mut free {
                record.level = CompressionLevel::None;
            }
            return Plan::from_records(merge(forced, free), Some(budget));
        }

        if let Some(advisor) = &self.advisor {
            let headroom = budget - forced_cost;
            let problem = PlanningProblem::new(
                free.iter()
                    .map(|r| ProblemFile {
                        path: r.path.clone(),
                        baseline_tokens: r.baseline_tokens,
                        keep: false,
                    })
                    .collect(),
                headroom,
            );

            match advisor.propose(&problem).await {
                Ok(proposal) => match validate_proposal(&problem, &proposal) {
                    Ok(()) => {
                        info!(advisor = advisor.name(), "applying advisory proposal");
                        for record in &mut free {
                            // Validation guarantees presence
                            if let Some(level) = proposal.assignments.get(&record.path) {
                                record.level = *level;
                            }
                        }
                    }
                    Err(e) => {
                        warn!(advisor = advisor.name(), error = %e, "advisory proposal rejected, using fallback");
                    }
                },
                Err(e) => {
                    warn!(advisor = advisor.name(), error = %e, "advisory call failed, using fallback");
                }
            }
        }

        // Escalate until the estimate fits. With no (accepted) proposal
        // this is the pure deterministic fallback from level None; after a
        // proposal it only tops up an under-compressed assignment.
        let mut records = merge(forced, free);
        let steps = escalate_to_fit(&mut records, budget);
        debug!(steps, "greedy escalation finished");
        Plan::from_records(records, Some(budget))
    }

    /// One refinement round: escalate a rendered plan whose actual total
    /// came in over budget. Returns the escalated plan, or `None` when
    /// nothing can be escalated further (every free file at max).
    ///
    /// Working sizes seed from actual rendered counts, so estimate drift
    /// from earlier rounds self-corrects. Levels only ever go up.
    pub fn refine(&self, plan: &Plan, budget: usize) -> Option<Plan> {
        let mut records: Vec<FileRecord> = plan.records().cloned().collect();
        let steps = escalate_to_fit(&mut records, budget);
        if steps == 0 {
            return None;
        }
        Some(Plan::from_records(records, Some(budget)))
    }
}

fn merge(forced: Vec<FileRecord>, free: Vec<FileRecord>) -> Vec<FileRecord> {
    let mut all = forced;
    all.extend(free);
    all
}

/// Greedy deterministic escalation.
///
/// Free files, ordered by baseline descending (ties by path ascending),
/// are stepped one level at a time: always the first file, in that order,
/// among those at the currently lowest level. After every single step the
/// estimated total is re-checked. Stops when the estimate fits the budget
/// or nothing is left to escalate. Forced files are never touched.
///
/// The estimated total is non-increasing across steps, and the step count
/// is bounded by files x (levels - 1).
pub fn escalate_to_fit(records: &mut [FileRecord], budget: usize) -> usize {
    let mut order: Vec<usize> = (0..records.len()).filter(|&i| !records[i].forced).collect();
    order.sort_by(|&a, &b| {
        records[b]
            .baseline_tokens
            .cmp(&records[a].baseline_tokens)
            .then_with(|| records[a].path.cmp(&records[b].path))
    });

    let mut sizes: Vec<usize> = records.iter().map(|r| r.working_tokens()).collect();
    let mut total: usize = sizes.iter().sum();
    let mut steps = 0;

    while total > budget {
        let lowest = order
            .iter()
            .filter(|&&i| records[i].level < CompressionLevel::Max)
            .map(|&i| records[i].level)
            .min();
        let Some(lowest) = lowest else {
            break; // everything escalatable is already at max
        };

        let index = *order
            .iter()
            .find(|&&i| records[i].level == lowest)
            .expect("a record at the lowest level exists");

        let next = records[index]
            .level
            .escalate()
            .expect("lowest level is below max");
        records[index].level = next;
        records[index].rendered_tokens = None;

        // A step never grows a file: cap the new estimate by the size the
        // file already reached
        let new_size = next.estimate(records[index].baseline_tokens).min(sizes[index]);
        total = total - sizes[index] + new_size;
        sizes[index] = new_size;
        steps += 1;
    }

    steps
}
