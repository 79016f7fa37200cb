use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{HeuristicError, HeuristicResult};
use crate::heuristic::settings::{diff_fields, ConfigStatement, HeuristicSettings};
use crate::heuristic::sub_solve::SubProblem;
use crate::heuristic::{Heuristic, HeuristicBase, SeekOutcome};
use crate::model::problem::{is_finite_bound, row_violation, Problem};
use crate::model::SearchModel;
use crate::ui::UIUserMessage;
use crate::{FEAS_TOL, INT_FEAS_TOL};

/// Upper limit of sweeps over the violated rows during repair
const MAX_REPAIR_PASSES: usize = 20;

/// Per column constraint locks
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoundingLocks {
    down: Vec<u16>,
    up: Vec<u16>,
    equal: Vec<u16>,
}

/// Which directions of a column a row with these bounds blocks, as (down, up)
fn row_locks(coefficient: f64, row_lower: f64, row_upper: f64) -> (bool, bool) {
    match (is_finite_bound(row_lower), is_finite_bound(row_upper)) {
        (true, true) => (true, true),
        (false, true) => (coefficient < 0.0, coefficient > 0.0),
        (true, false) => (coefficient > 0.0, coefficient < 0.0),
        (false, false) => (false, false),
    }
}

impl RoundingLocks {
    /// Walk the matrix by column. Counts saturate.
    pub fn compute(problem: &Problem) -> Self {
        let n = problem.num_cols();
        let mut locks = RoundingLocks {
            down: vec![0; n],
            up: vec![0; n],
            equal: vec![0; n],
        };

        for c in 0..n {
            for (r, a) in problem.matrix().column(c) {
                let (lo, hi) = (problem.row_lower()[r], problem.row_upper()[r]);
                let (down, up) = row_locks(a, lo, hi);
                if down {
                    locks.down[c] = locks.down[c].saturating_add(1);
                }
                if up {
                    locks.up[c] = locks.up[c].saturating_add(1);
                }
                if lo == hi {
                    locks.equal[c] = locks.equal[c].saturating_add(1);
                }
            }
        }

        #[cfg(feature = "validity_assertions")]
        assert_eq!(locks, Self::compute_by_row(problem));

        locks
    }

    /// Same counts, walking the matrix by row
    pub fn compute_by_row(problem: &Problem) -> Self {
        let n = problem.num_cols();
        let mut locks = RoundingLocks {
            down: vec![0; n],
            up: vec![0; n],
            equal: vec![0; n],
        };

        for r in 0..problem.num_rows() {
            let (lo, hi) = (problem.row_lower()[r], problem.row_upper()[r]);
            for (c, a) in problem.matrix().row(r) {
                let (down, up) = row_locks(a, lo, hi);
                locks.down[c] = locks.down[c].saturating_add(u16::from(down));
                locks.up[c] = locks.up[c].saturating_add(u16::from(up));
                locks.equal[c] = locks.equal[c].saturating_add(u16::from(lo == hi));
            }
        }
        locks
    }

    pub fn num_cols(&self) -> usize {
        self.down.len()
    }

    pub fn down(&self, col: usize) -> u16 {
        self.down[col]
    }

    pub fn up(&self, col: usize) -> u16 {
        self.up[col]
    }

    pub fn equal(&self, col: usize) -> u16 {
        self.equal[col]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundingPhase {
    Idle,
    LocksComputed,
    SolutionAttempted,
    Repaired,
    Abandoned,
}

/// Scoring constants of the rounding direction
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundingWeights {
    /// scale of the random term added to the lock count
    pub lock_jitter: f64,
    /// how much the objective sign favours a direction
    pub objective_weight: f64,
}

impl Default for RoundingWeights {
    fn default() -> Self {
        RoundingWeights {
            lock_jitter: 0.5,
            objective_weight: 0.5,
        }
    }
}

impl RoundingWeights {
    /// Desirability of one direction: fewer locks and a cheaper objective score higher
    fn score(&self, locks: u16, objective_change: f64, random: f64) -> f64 {
        let weight = if objective_change < 0.0 {
            1.0 + self.objective_weight
        } else if objective_change > 0.0 {
            1.0 - self.objective_weight
        } else {
            1.0
        };
        weight / (1.0 + f64::from(locks) + self.lock_jitter * random)
    }
}

/// Lock driven rounding of the relaxation solution followed by repair
#[derive(Clone)]
pub struct RoundingHeuristic {
    base: HeuristicBase,
    weights: RoundingWeights,
    locks: Option<RoundingLocks>,
    phase: RoundingPhase,
}

impl Default for RoundingHeuristic {
    fn default() -> Self {
        Self::new()
    }
}

impl RoundingHeuristic {
    pub fn new() -> Self {
        RoundingHeuristic {
            base: HeuristicBase::named("Rounding"),
            weights: RoundingWeights::default(),
            locks: None,
            phase: RoundingPhase::Idle,
        }
    }

    pub fn with_model(model: Arc<SearchModel>) -> Self {
        let mut heuristic = Self::new();
        heuristic.set_model(model);
        heuristic
    }

    pub fn with_settings(settings: HeuristicSettings) -> HeuristicResult<Self> {
        Ok(RoundingHeuristic {
            base: HeuristicBase::new(settings)?,
            ..Self::new()
        })
    }

    pub fn weights(&self) -> RoundingWeights {
        self.weights
    }

    pub fn set_weights(&mut self, weights: RoundingWeights) {
        self.weights = weights;
    }

    /// `None` until computed after the last reset
    pub fn locks(&self) -> Option<&RoundingLocks> {
        self.locks.as_ref()
    }

    pub fn phase(&self) -> RoundingPhase {
        self.phase
    }

    /// Lock tables stay valid until the next `reset_model`
    fn ensure_locks(&mut self, problem: &Problem) -> HeuristicResult<()> {
        if let Some(locks) = &self.locks {
            if locks.num_cols() != problem.num_cols() {
                return Err(HeuristicError::StaleModel {
                    cached: locks.num_cols(),
                    current: problem.num_cols(),
                });
            }
            return Ok(());
        }
        self.locks = Some(RoundingLocks::compute(problem));
        self.phase = RoundingPhase::LocksComputed;
        Ok(())
    }

    fn abandon(&mut self) -> SeekOutcome {
        self.phase = RoundingPhase::Abandoned;
        SeekOutcome::NoSolution
    }
}

/// Try to bring row `row` back into its bounds by moving its columns,
/// never making another row worse. Returns true if anything moved.
fn shift_row(problem: &Problem, row: usize, x: &mut [f64], activities: &mut [f64], lower: &[f64], upper: &[f64], move_integers: bool) -> bool {
    let (rl, ru) = (problem.row_lower()[row], problem.row_upper()[row]);
    let mut moved = false;

    for (c, a) in problem.matrix().row(row) {
        let integer = problem.is_integer(c);
        if integer != move_integers {
            continue;
        }

        let need = if activities[row] < rl - FEAS_TOL {
            rl - activities[row]
        } else if activities[row] > ru + FEAS_TOL {
            ru - activities[row]
        } else {
            break;
        };

        let (lo, hi) = if integer { (lower[c].ceil(), upper[c].floor()) } else { (lower[c], upper[c]) };
        if lo > hi {
            continue;
        }
        let mut step = need / a;
        if integer {
            step = step.signum() * (step.abs() - INT_FEAS_TOL).ceil();
        }
        let delta = (x[c] + step).clamp(lo, hi) - x[c];
        if delta.abs() <= FEAS_TOL {
            continue;
        }

        let acceptable = problem.matrix().column(c).all(|(r, v)| {
            let (l, u) = (problem.row_lower()[r], problem.row_upper()[r]);
            let before = row_violation(activities[r], l, u);
            let after = row_violation(activities[r] + v * delta, l, u);
            if r == row { after < before - FEAS_TOL } else { after <= before + FEAS_TOL }
        });
        if !acceptable {
            continue;
        }

        x[c] += delta;
        for (r, v) in problem.matrix().column(c) {
            activities[r] += v * delta;
        }
        moved = true;
    }

    moved
}

/// Sweeps over violated rows, first moving continuous columns then integer steps.
/// Returns the rows still violated.
fn repair_by_shifting(problem: &Problem, x: &mut [f64], lower: &[f64], upper: &[f64]) -> Vec<usize> {
    let mut activities = problem.matrix().activities(x);

    for move_integers in [false, true] {
        for _ in 0..MAX_REPAIR_PASSES {
            let violated = problem.violated_rows(&activities);
            if violated.is_empty() {
                return violated;
            }
            let mut progress = false;
            for row in violated {
                progress |= shift_row(problem, row, x, &mut activities, lower, upper, move_integers);
            }
            if !progress {
                break;
            }
        }
    }

    problem.violated_rows(&activities)
}

impl Heuristic for RoundingHeuristic {
    fn base(&self) -> &HeuristicBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut HeuristicBase {
        &mut self.base
    }

    fn default_settings(&self) -> HeuristicSettings {
        HeuristicBase::named("Rounding").settings().clone()
    }

    fn reset_model(&mut self, model: Arc<SearchModel>) {
        self.base.set_model_only(model);
        self.locks = None;
        self.phase = RoundingPhase::Idle;
    }

    fn validate(&mut self) {
        let Ok(problem) = self.base.model().map(|model| model.problem()) else { return };
        if problem.num_rows() == 0 {
            self.base.disable("model has no rows");
            return;
        }
        let can_deal = self.can_deal_with_odd();
        self.base.disable_if_odd(can_deal);
    }

    fn seek_solution(&mut self, best_objective: f64, solution: &mut [f64]) -> HeuristicResult<SeekOutcome> {
        let (problem, node) = self.base.snapshot()?;
        HeuristicBase::check_buffer(&problem, solution)?;
        if problem.num_integers() == 0 {
            return Ok(SeekOutcome::NoSolution);
        }

        self.ensure_locks(&problem)?;
        if problem.empty_integer_domain(&node.lower, &node.upper).is_some() {
            return Ok(self.abandon());
        }
        let Some(locks) = self.locks.as_ref() else {
            return Ok(self.abandon());
        };

        let mut stream = self.base.node_stream(&node);
        let mut x: Vec<f64> = (0..problem.num_cols())
            .map(|c| node.solution[c].clamp(node.lower[c], node.upper[c]))
            .collect();

        for c in problem.integer_columns() {
            let value = x[c];
            let (floor, ceil) = (value.floor(), value.ceil());
            if (value - value.round()).abs() <= INT_FEAS_TOL {
                x[c] = value.round();
                continue;
            }

            let cost = problem.objective()[c];
            let down = self.weights.score(locks.down(c), cost * (floor - value), stream.gen::<f64>());
            let up = self.weights.score(locks.up(c), cost * (ceil - value), stream.gen::<f64>());

            x[c] = if up > down {
                ceil
            } else if down > up {
                floor
            } else if locks.equal(c) > 0 {
                value.round()
            } else {
                floor
            };
            x[c] = x[c].clamp(node.lower[c].ceil(), node.upper[c].floor());
        }
        self.phase = RoundingPhase::SolutionAttempted;

        let violated = repair_by_shifting(&problem, &mut x, &node.lower, &node.upper);

        if !violated.is_empty() {
            // hand the integer columns of the remaining violated rows to a sub-solve
            let mut free = vec![false; problem.num_cols()];
            for &r in &violated {
                for (c, _) in problem.matrix().row(r) {
                    free[c] = problem.is_integer(c) || self.base.sub_solver().supports_continuous();
                }
            }

            let Some(sub) = SubProblem::restrict(&problem, &x, &free, &node.lower, &node.upper)? else {
                return Ok(self.abandon());
            };
            if !sub.admitted(self.base.fraction_small()) {
                self.base.log(format!(
                    "{}: repair sub-problem of size {} above fraction {}",
                    self.base.name(),
                    sub.size(),
                    self.base.fraction_small()
                ));
                return Ok(self.abandon());
            }

            let number_nodes = self.base.number_nodes();
            let result = self.base.small_branch_and_bound(&sub, number_nodes, best_objective, "repair")?;
            let Some(sub_solution) = result.solution else {
                return Ok(self.abandon());
            };
            x = sub.expand(&x, &sub_solution);
        }

        if !problem.is_feasible(&x, &node.lower, &node.upper) {
            return Ok(self.abandon());
        }
        let objective = problem.objective_value(&x);
        if objective >= best_objective {
            return Ok(self.abandon());
        }

        solution.copy_from_slice(&x);
        self.phase = RoundingPhase::Repaired;
        Ok(SeekOutcome::Improved { objective })
    }

    fn replay_statements(&self) -> Vec<ConfigStatement> {
        let mut statements = self.base.settings().replay_statements(&self.default_settings());
        statements.extend(diff_fields(&self.weights, &RoundingWeights::default()));
        statements
    }
}
