use crate::error::{HeuristicError, HeuristicResult};
use crate::model::matrix::PackedMatrix;
use crate::{FEAS_TOL, INT_FEAS_TOL};

/// Bound magnitude treated as infinite
pub const INFINITE_BOUND: f64 = 1.0e20;

/// Default branching priority of a column
pub const DEFAULT_PRIORITY: i32 = 1000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VarType {
    Continuous,
    Integer,
}

/// Static description of the mixed integer program:
/// min c x  s.t.  row_lower <= A x <= row_upper,  col_lower <= x <= col_upper
#[derive(Clone, Debug, Default)]
pub struct Problem {
    objective: Vec<f64>,
    col_lower: Vec<f64>,
    col_upper: Vec<f64>,
    var_types: Vec<VarType>,
    priorities: Vec<i32>,
    row_lower: Vec<f64>,
    row_upper: Vec<f64>,
    matrix: PackedMatrix,
    sos_sets: Vec<Vec<usize>>,
}

impl Problem {
    pub fn num_cols(&self) -> usize {
        self.objective.len()
    }

    pub fn num_rows(&self) -> usize {
        self.row_lower.len()
    }

    pub fn objective(&self) -> &[f64] {
        &self.objective
    }

    pub fn col_lower(&self) -> &[f64] {
        &self.col_lower
    }

    pub fn col_upper(&self) -> &[f64] {
        &self.col_upper
    }

    pub fn row_lower(&self) -> &[f64] {
        &self.row_lower
    }

    pub fn row_upper(&self) -> &[f64] {
        &self.row_upper
    }

    pub fn matrix(&self) -> &PackedMatrix {
        &self.matrix
    }

    pub fn var_type(&self, col: usize) -> VarType {
        self.var_types[col]
    }

    pub fn is_integer(&self, col: usize) -> bool {
        self.var_types[col] == VarType::Integer
    }

    pub fn priority(&self, col: usize) -> i32 {
        self.priorities[col]
    }

    pub fn integer_columns(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.num_cols()).filter(|&c| self.is_integer(c))
    }

    pub fn num_integers(&self) -> usize {
        self.integer_columns().count()
    }

    pub fn is_binary(&self, col: usize) -> bool {
        self.is_integer(col) && self.col_lower[col] >= 0.0 && self.col_upper[col] <= 1.0
    }

    /// Special ordered sets are the "odd" objects heuristics may refuse
    pub fn num_sos(&self) -> usize {
        self.sos_sets.len()
    }

    pub fn sos_sets(&self) -> &[Vec<usize>] {
        &self.sos_sets
    }

    pub fn objective_value(&self, x: &[f64]) -> f64 {
        self.objective.iter().zip(x).map(|(c, v)| c * v).sum()
    }

    /// Rows whose activity lies outside their bounds
    pub fn violated_rows(&self, activities: &[f64]) -> Vec<usize> {
        (0..self.num_rows())
            .filter(|&r| row_violation(activities[r], self.row_lower[r], self.row_upper[r]) > FEAS_TOL)
            .collect()
    }

    /// An integer column whose bounds contain no integer value
    pub fn empty_integer_domain(&self, lower: &[f64], upper: &[f64]) -> Option<usize> {
        self.integer_columns()
            .find(|&c| lower[c].ceil() > upper[c].floor() + INT_FEAS_TOL)
    }

    /// Full check of bounds, integrality and rows.
    /// `lower` / `upper` are the bounds that apply (usually node bounds).
    pub fn is_feasible(&self, x: &[f64], lower: &[f64], upper: &[f64]) -> bool {
        if x.len() != self.num_cols() {
            return false;
        }

        let columns_ok = (0..self.num_cols()).all(|c| {
            x[c] >= lower[c] - FEAS_TOL
                && x[c] <= upper[c] + FEAS_TOL
                && (!self.is_integer(c) || (x[c] - x[c].round()).abs() <= INT_FEAS_TOL)
        });

        columns_ok && self.violated_rows(&self.matrix.activities(x)).is_empty()
    }
}

/// Amount by which an activity lies outside `[lower, upper]`, zero if inside
pub fn row_violation(activity: f64, lower: f64, upper: f64) -> f64 {
    if activity < lower {
        lower - activity
    } else if activity > upper {
        activity - upper
    } else {
        0.0
    }
}

pub fn is_finite_bound(value: f64) -> bool {
    value.abs() < INFINITE_BOUND
}

/// Incremental construction of a [`Problem`]
#[derive(Default)]
pub struct ProblemBuilder {
    objective: Vec<f64>,
    col_lower: Vec<f64>,
    col_upper: Vec<f64>,
    var_types: Vec<VarType>,
    priorities: Vec<i32>,
    row_lower: Vec<f64>,
    row_upper: Vec<f64>,
    triplets: Vec<(usize, usize, f64)>,
    sos_sets: Vec<Vec<usize>>,
}

impl ProblemBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a column and returns its index
    pub fn add_column(&mut self, objective: f64, lower: f64, upper: f64, var_type: VarType) -> usize {
        self.objective.push(objective);
        self.col_lower.push(lower);
        self.col_upper.push(upper);
        self.var_types.push(var_type);
        self.priorities.push(DEFAULT_PRIORITY);
        self.objective.len() - 1
    }

    pub fn add_binary(&mut self, objective: f64) -> usize {
        self.add_column(objective, 0.0, 1.0, VarType::Integer)
    }

    pub fn set_priority(&mut self, col: usize, priority: i32) -> HeuristicResult<()> {
        match self.priorities.get_mut(col) {
            Some(p) => {
                *p = priority;
                Ok(())
            }
            None => Err(HeuristicError::MatrixIndex { row: 0, col }),
        }
    }

    /// Adds a row `lower <= sum entries <= upper` and returns its index
    pub fn add_row(&mut self, lower: f64, upper: f64, entries: &[(usize, f64)]) -> HeuristicResult<usize> {
        let row = self.row_lower.len();
        if let Some(&(col, _)) = entries.iter().find(|(c, _)| *c >= self.objective.len()) {
            return Err(HeuristicError::MatrixIndex { row, col });
        }
        self.row_lower.push(lower);
        self.row_upper.push(upper);
        self.triplets.extend(entries.iter().map(|&(c, v)| (row, c, v)));
        Ok(row)
    }

    pub fn add_sos(&mut self, members: Vec<usize>) {
        self.sos_sets.push(members);
    }

    pub fn build(self) -> HeuristicResult<Problem> {
        let matrix = PackedMatrix::from_triplets(self.row_lower.len(), self.objective.len(), &self.triplets)?;

        Ok(Problem {
            objective: self.objective,
            col_lower: self.col_lower,
            col_upper: self.col_upper,
            var_types: self.var_types,
            priorities: self.priorities,
            row_lower: self.row_lower,
            row_upper: self.row_upper,
            matrix,
            sos_sets: self.sos_sets,
        })
    }
}
