use std::sync::Arc;

use rand::Rng;
use serde_json::json;

use crate::error::HeuristicResult;
use crate::heuristic::settings::{ConfigStatement, HeuristicSettings};
use crate::heuristic::{Heuristic, HeuristicBase, SeekOutcome};
use crate::model::problem::{is_finite_bound, Problem};
use crate::model::{NodeState, SearchModel};
use crate::{FEAS_TOL, INT_FEAS_TOL};

/// Scale of the random term added to greedy scores
pub const DEFAULT_JITTER: f64 = 1e-6;

/// Picks up solutions the relaxation solver found on its own,
/// otherwise builds one by greedy covering.
#[derive(Clone)]
pub struct SerendipityHeuristic {
    base: HeuristicBase,
    jitter: f64,
}

impl Default for SerendipityHeuristic {
    fn default() -> Self {
        Self::new()
    }
}

/// Every row reads `sum a x >= b` with `a >= 0` and every column is binary
fn is_covering(problem: &Problem) -> bool {
    let rows_ok = (0..problem.num_rows()).all(|r| {
        !is_finite_bound(problem.row_upper()[r]) && problem.matrix().row(r).all(|(_, a)| a > 0.0)
    });
    rows_ok && (0..problem.num_cols()).all(|c| problem.is_binary(c))
}

impl SerendipityHeuristic {
    pub fn new() -> Self {
        SerendipityHeuristic {
            base: HeuristicBase::named("Serendipity"),
            jitter: DEFAULT_JITTER,
        }
    }

    pub fn with_model(model: Arc<SearchModel>) -> Self {
        let mut heuristic = Self::new();
        heuristic.set_model(model);
        heuristic
    }

    pub fn with_settings(settings: HeuristicSettings) -> HeuristicResult<Self> {
        Ok(SerendipityHeuristic {
            base: HeuristicBase::new(settings)?,
            ..Self::new()
        })
    }

    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    pub fn set_jitter(&mut self, value: f64) {
        self.jitter = value.abs();
    }

    /// Solution the relaxation solver already holds, if it is usable
    fn capture(problem: &Problem, node: &NodeState) -> Option<(f64, Vec<f64>)> {
        let (_, found) = node.solver_solution.as_ref()?;
        if !problem.is_feasible(found, &node.lower, &node.upper) {
            return None;
        }
        Some((problem.objective_value(found), found.clone()))
    }

    /// Greedy covering: cheapest column per newly covered row first.
    /// `None` unless every row ends up covered.
    fn greedy_cover(&mut self, problem: &Problem, node: &NodeState) -> Option<Vec<f64>> {
        if !is_covering(problem) {
            return None;
        }

        let n = problem.num_cols();
        let mut x: Vec<f64> = (0..n)
            .map(|c| {
                let at_one = node.solution[c] >= 1.0 - INT_FEAS_TOL || node.lower[c] >= 1.0 - INT_FEAS_TOL;
                if at_one && node.upper[c] >= 1.0 - INT_FEAS_TOL { 1.0 } else { 0.0 }
            })
            .collect();
        let mut activities = problem.matrix().activities(&x);
        let uncovered = |activities: &[f64], r: usize| activities[r] < problem.row_lower()[r] - FEAS_TOL;

        while (0..problem.num_rows()).any(|r| uncovered(&activities, r)) {
            let mut best: Option<(usize, f64)> = None;
            for c in 0..n {
                if x[c] > 0.5 || node.upper[c] < 1.0 - INT_FEAS_TOL {
                    continue;
                }
                let helps = problem
                    .matrix()
                    .column(c)
                    .filter(|&(r, _)| uncovered(&activities, r))
                    .count();
                if helps == 0 {
                    continue;
                }

                let score = problem.objective()[c] / helps as f64 + self.jitter * self.base.rng_mut().gen::<f64>();
                if best.map_or(true, |(_, s)| score < s) {
                    best = Some((c, score));
                }
            }

            let (c, _) = best?;
            x[c] = 1.0;
            for (r, a) in problem.matrix().column(c) {
                activities[r] += a;
            }
        }

        Some(x)
    }
}

impl Heuristic for SerendipityHeuristic {
    fn base(&self) -> &HeuristicBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut HeuristicBase {
        &mut self.base
    }

    fn default_settings(&self) -> HeuristicSettings {
        HeuristicBase::named("Serendipity").settings().clone()
    }

    fn reset_model(&mut self, model: Arc<SearchModel>) {
        self.base.set_model_only(model);
    }

    fn validate(&mut self) {
        let can_deal = self.can_deal_with_odd();
        self.base.disable_if_odd(can_deal);
    }

    fn seek_solution(&mut self, best_objective: f64, solution: &mut [f64]) -> HeuristicResult<SeekOutcome> {
        let (problem, node) = self.base.snapshot()?;
        HeuristicBase::check_buffer(&problem, solution)?;
        if problem.num_integers() == 0 {
            return Ok(SeekOutcome::NoSolution);
        }

        if let Some((objective, found)) = Self::capture(&problem, &node) {
            if objective < best_objective {
                solution.copy_from_slice(&found);
                return Ok(SeekOutcome::Improved { objective });
            }
        }

        let Some(x) = self.greedy_cover(&problem, &node) else {
            return Ok(SeekOutcome::NoSolution);
        };
        if !problem.is_feasible(&x, &node.lower, &node.upper) {
            return Ok(SeekOutcome::NoSolution);
        }
        let objective = problem.objective_value(&x);
        if objective >= best_objective {
            return Ok(SeekOutcome::NoSolution);
        }

        solution.copy_from_slice(&x);
        Ok(SeekOutcome::Improved { objective })
    }

    fn replay_statements(&self) -> Vec<ConfigStatement> {
        let mut statements = self.base.settings().replay_statements(&self.default_settings());
        if self.jitter != DEFAULT_JITTER {
            statements.push(ConfigStatement {
                field: "jitter".to_string(),
                value: json!(self.jitter),
            });
        }
        statements
    }
}
