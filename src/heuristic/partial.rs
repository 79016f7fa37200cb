use std::sync::Arc;

use serde_json::json;

use crate::error::{HeuristicError, HeuristicResult};
use crate::heuristic::settings::{ConfigStatement, HeuristicSettings};
use crate::heuristic::sub_solve::SubProblem;
use crate::heuristic::{Heuristic, HeuristicBase, SeekOutcome};
use crate::model::problem::Problem;
use crate::model::SearchModel;
use crate::INT_FEAS_TOL;

/// Columns with a priority at or below this are fixed unless configured otherwise
pub const DEFAULT_FIX_PRIORITY: i32 = 10_000;

/// Fixes high priority integer columns (numerically low priority value)
/// to their rounded relaxation or hot start value and solves the rest
/// with a small branch and bound.
#[derive(Clone)]
pub struct PartialFixHeuristic {
    base: HeuristicBase,
    fix_priority: i32,
    fix_set: Vec<usize>,
    /// column count the fix set was derived for
    fix_set_columns: usize,
}

impl Default for PartialFixHeuristic {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialFixHeuristic {
    pub fn new() -> Self {
        PartialFixHeuristic {
            base: HeuristicBase::named("Partial"),
            fix_priority: DEFAULT_FIX_PRIORITY,
            fix_set: Vec::new(),
            fix_set_columns: 0,
        }
    }

    pub fn with_model(model: Arc<SearchModel>, fix_priority: i32) -> HeuristicResult<Self> {
        let mut heuristic = Self::new();
        heuristic.set_fix_priority(fix_priority)?;
        heuristic.set_model(model);
        Ok(heuristic)
    }

    pub fn with_settings(settings: HeuristicSettings) -> HeuristicResult<Self> {
        Ok(PartialFixHeuristic {
            base: HeuristicBase::new(settings)?,
            ..Self::new()
        })
    }

    pub fn fix_priority(&self) -> i32 {
        self.fix_priority
    }

    pub fn set_fix_priority(&mut self, value: i32) -> HeuristicResult<()> {
        if value < 0 {
            return Err(HeuristicError::InvalidConfig {
                field: "fix_priority",
                reason: format!("{value} is negative"),
            });
        }
        self.fix_priority = value;
        let problem = self.base.model().ok().map(|model| model.problem());
        if let Some(problem) = problem {
            self.derive_fix_set(&problem);
        }
        Ok(())
    }

    pub fn fix_set(&self) -> &[usize] {
        &self.fix_set
    }

    fn derive_fix_set(&mut self, problem: &Problem) {
        self.fix_set = problem
            .integer_columns()
            .filter(|&c| problem.priority(c) <= self.fix_priority)
            .collect();
        self.fix_set_columns = problem.num_cols();
    }
}

impl Heuristic for PartialFixHeuristic {
    fn base(&self) -> &HeuristicBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut HeuristicBase {
        &mut self.base
    }

    fn default_settings(&self) -> HeuristicSettings {
        HeuristicBase::named("Partial").settings().clone()
    }

    fn reset_model(&mut self, model: Arc<SearchModel>) {
        let problem = model.problem();
        self.base.set_model_only(model);
        self.derive_fix_set(&problem);
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
        if self.fix_set_columns != problem.num_cols() {
            return Err(HeuristicError::StaleModel {
                cached: self.fix_set_columns,
                current: problem.num_cols(),
            });
        }

        if problem.empty_integer_domain(&node.lower, &node.upper).is_some() {
            return Ok(SeekOutcome::NoSolution);
        }

        let source = match &node.hotstart {
            Some(hotstart) if hotstart.len() == problem.num_cols() => hotstart,
            _ => &node.solution,
        };

        let mut values: Vec<f64> = (0..problem.num_cols())
            .map(|c| source[c].clamp(node.lower[c], node.upper[c]))
            .collect();
        let mut free = vec![true; problem.num_cols()];

        for &c in &self.fix_set {
            let value = source[c];
            if (value - value.round()).abs() > INT_FEAS_TOL {
                return Ok(SeekOutcome::NoSolution);
            }
            values[c] = value.round().clamp(node.lower[c].ceil(), node.upper[c].floor());
            free[c] = false;
        }

        if !self.base.sub_solver().supports_continuous() {
            for c in (0..problem.num_cols()).filter(|&c| !problem.is_integer(c)) {
                free[c] = false;
            }
        }

        let Some(sub) = SubProblem::restrict(&problem, &values, &free, &node.lower, &node.upper)? else {
            return Ok(SeekOutcome::NoSolution);
        };
        if !sub.admitted(self.base.fraction_small()) {
            return Ok(SeekOutcome::NoSolution);
        }

        let number_nodes = self.base.number_nodes();
        let result = self.base.small_branch_and_bound(&sub, number_nodes, best_objective, "partial")?;
        let Some(sub_solution) = result.solution else {
            return Ok(SeekOutcome::NoSolution);
        };

        let full = sub.expand(&values, &sub_solution);
        if !problem.is_feasible(&full, &node.lower, &node.upper) {
            return Ok(SeekOutcome::NoSolution);
        }
        let objective = problem.objective_value(&full);
        if objective >= best_objective {
            return Ok(SeekOutcome::NoSolution);
        }

        solution.copy_from_slice(&full);
        Ok(SeekOutcome::Improved { objective })
    }

    fn replay_statements(&self) -> Vec<ConfigStatement> {
        let mut statements = self.base.settings().replay_statements(&self.default_settings());
        if self.fix_priority != DEFAULT_FIX_PRIORITY {
            statements.push(ConfigStatement {
                field: "fix_priority".to_string(),
                value: json!(self.fix_priority),
            });
        }
        statements
    }
}
