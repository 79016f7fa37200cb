use std::cmp::Ordering;

use compare::Compare;
use serde::{Deserialize, Serialize};

use crate::error::{HeuristicError, HeuristicResult};
use crate::misc::node_queue::NodeQueue;
use crate::misc::HashMap;
use crate::model::matrix::PackedMatrix;
use crate::model::problem::{is_finite_bound, row_violation, Problem};
use crate::{FEAS_TOL, INT_FEAS_TOL};

/// Nodes whose bound is within this distance of the incumbent are pruned
pub const OBJ_TOL: f64 = 1e-7;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Relaxation used to bound nodes of a sub-solve
pub enum SubSolverBackend {
    /// bound propagation and cost minimal point, pure integer sub-problems only
    #[default]
    ActivityBounds,
    /// LP relaxation of every node through gurobi
    #[cfg(feature = "gurobi")]
    Gurobi,
}

impl SubSolverBackend {
    pub fn supports_continuous(&self) -> bool {
        match self {
            SubSolverBackend::ActivityBounds => false,
            #[cfg(feature = "gurobi")]
            SubSolverBackend::Gurobi => true,
        }
    }

    /// Instantiate the relaxation for one sub-solve
    pub fn relaxation(&self, sub: &SubProblem, seed: u64) -> HeuristicResult<Box<dyn NodeRelaxation>> {
        if !self.supports_continuous() {
            if let Some(col) = sub.free_continuous_column() {
                return Err(HeuristicError::ContinuousInSubProblem(sub.original_column(col)));
            }
        }

        match self {
            SubSolverBackend::ActivityBounds => Ok(Box::new(ActivityRelaxation::default())),
            #[cfg(feature = "gurobi")]
            SubSolverBackend::Gurobi => Ok(Box::new(crate::solvers::gurobi::GurobiRelaxation::new(sub, seed)?)),
        }
    }
}

/// Restriction of a problem to a subset of free columns.
/// All other columns are fixed, their row contributions moved to the row bounds.
#[derive(Clone, Debug)]
pub struct SubProblem {
    columns: Vec<usize>,
    rows: Vec<usize>,
    objective: Vec<f64>,
    offset: f64,
    lower: Vec<f64>,
    upper: Vec<f64>,
    integer: Vec<bool>,
    row_lower: Vec<f64>,
    row_upper: Vec<f64>,
    matrix: PackedMatrix,
    original_size: usize,
}

impl SubProblem {
    /// Keep the columns flagged in `free` within `lower` / `upper`,
    /// fix every other column at `values`.
    ///
    /// Returns `None` if the fixed columns alone already violate a row
    /// that has no free column left.
    pub fn restrict(problem: &Problem, values: &[f64], free: &[bool], lower: &[f64], upper: &[f64]) -> HeuristicResult<Option<Self>> {
        let n = problem.num_cols();
        for (what, len) in [("values", values.len()), ("free flags", free.len()), ("lower bounds", lower.len()), ("upper bounds", upper.len())] {
            if len != n {
                return Err(HeuristicError::RelaxationLength { what, expected: n, got: len });
            }
        }

        let columns: Vec<usize> = (0..n).filter(|&c| free[c]).collect();
        let sub_index: HashMap<usize, usize> = columns.iter().enumerate().map(|(i, c)| (*c, i)).collect();

        let offset: f64 = (0..n)
            .filter(|&c| !free[c])
            .map(|c| problem.objective()[c] * values[c])
            .sum();

        let mut rows = Vec::new();
        let mut row_lower = Vec::new();
        let mut row_upper = Vec::new();
        let mut triplets = Vec::new();

        for r in 0..problem.num_rows() {
            let mut fixed_activity = 0.0;
            let mut entries = Vec::new();
            for (c, v) in problem.matrix().row(r) {
                match sub_index.get(&c) {
                    Some(&j) => entries.push((j, v)),
                    None => fixed_activity += v * values[c],
                }
            }

            let (lo, up) = (problem.row_lower()[r], problem.row_upper()[r]);
            if entries.is_empty() {
                if row_violation(fixed_activity, lo, up) > FEAS_TOL {
                    return Ok(None);
                }
                continue;
            }

            let sub_row = rows.len();
            rows.push(r);
            row_lower.push(if is_finite_bound(lo) { lo - fixed_activity } else { lo });
            row_upper.push(if is_finite_bound(up) { up - fixed_activity } else { up });
            triplets.extend(entries.into_iter().map(|(j, v)| (sub_row, j, v)));
        }

        let matrix = PackedMatrix::from_triplets(rows.len(), columns.len(), &triplets)?;

        Ok(Some(SubProblem {
            objective: columns.iter().map(|&c| problem.objective()[c]).collect(),
            lower: columns.iter().map(|&c| lower[c]).collect(),
            upper: columns.iter().map(|&c| upper[c]).collect(),
            integer: columns.iter().map(|&c| problem.is_integer(c)).collect(),
            columns,
            rows,
            offset,
            row_lower,
            row_upper,
            matrix,
            original_size: problem.num_cols() + problem.num_rows(),
        }))
    }

    pub fn num_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// rows + columns, compared against `fraction_small` of the original size
    pub fn size(&self) -> usize {
        self.num_cols() + self.num_rows()
    }

    pub fn original_size(&self) -> usize {
        self.original_size
    }

    pub fn admitted(&self, fraction_small: f64) -> bool {
        self.size() as f64 <= fraction_small * self.original_size as f64
    }

    pub fn original_column(&self, col: usize) -> usize {
        self.columns[col]
    }

    pub fn original_row(&self, row: usize) -> usize {
        self.rows[row]
    }

    pub fn objective(&self) -> &[f64] {
        &self.objective
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    pub fn upper(&self) -> &[f64] {
        &self.upper
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

    pub fn is_integer(&self, col: usize) -> bool {
        self.integer[col]
    }

    fn free_continuous_column(&self) -> Option<usize> {
        (0..self.num_cols()).find(|&j| !self.integer[j] && self.lower[j] < self.upper[j])
    }

    /// Objective in terms of the full problem
    pub fn objective_value(&self, x: &[f64]) -> f64 {
        self.offset + self.objective.iter().zip(x).map(|(c, v)| c * v).sum::<f64>()
    }

    pub fn is_feasible(&self, x: &[f64], lower: &[f64], upper: &[f64]) -> bool {
        let columns_ok = (0..self.num_cols()).all(|j| {
            x[j] >= lower[j] - FEAS_TOL
                && x[j] <= upper[j] + FEAS_TOL
                && (!self.integer[j] || (x[j] - x[j].round()).abs() <= INT_FEAS_TOL)
        });

        columns_ok
            && self
                .matrix
                .activities(x)
                .iter()
                .enumerate()
                .all(|(r, a)| row_violation(*a, self.row_lower[r], self.row_upper[r]) <= FEAS_TOL)
    }

    /// Cost minimal corner of the box `lower` / `upper`.
    /// The objective is minus infinity if the cost decreases without limit.
    pub fn cheapest_corner(&self, lower: &[f64], upper: &[f64]) -> NodeBound {
        let mut bounded = true;
        let solution: Vec<f64> = (0..self.num_cols())
            .map(|j| {
                let preferred = if self.objective[j] >= 0.0 { lower[j] } else { upper[j] };
                if is_finite_bound(preferred) {
                    preferred
                } else {
                    if self.objective[j] != 0.0 {
                        bounded = false;
                    }
                    let other = if self.objective[j] >= 0.0 { upper[j] } else { lower[j] };
                    if is_finite_bound(other) { other } else { 0.0 }
                }
            })
            .collect();

        let objective = if bounded { self.objective_value(&solution) } else { f64::NEG_INFINITY };
        NodeBound::Bounded { objective, solution }
    }

    /// Full solution: fixed columns from `values`, free columns from `sub_solution`
    pub fn expand(&self, values: &[f64], sub_solution: &[f64]) -> Vec<f64> {
        let mut full = values.to_vec();
        for (j, &c) in self.columns.iter().enumerate() {
            full[c] = sub_solution[j];
        }
        full
    }
}

/// Outcome of bounding one node
#[derive(Clone, Debug, PartialEq)]
pub enum NodeBound {
    Infeasible,
    /// `objective` includes the offset of the fixed columns
    Bounded { objective: f64, solution: Vec<f64> },
}

/// Relaxation that bounds the nodes of a sub-solve
pub trait NodeRelaxation {
    /// Bound the node given by `lower` / `upper`.
    /// Implementations may tighten the bounds in place, children inherit them.
    fn solve_node(&mut self, sub: &SubProblem, lower: &mut [f64], upper: &mut [f64]) -> HeuristicResult<NodeBound>;
}

/// Built-in relaxation: propagate row activities onto the column bounds,
/// then take the cost minimal point of the remaining box.
pub struct ActivityRelaxation {
    pub max_passes: usize,
}

impl Default for ActivityRelaxation {
    fn default() -> Self {
        ActivityRelaxation { max_passes: 8 }
    }
}

/// Activity range of a row, infinite contributions counted apart
#[derive(Default)]
struct ActivityRange {
    min_finite: f64,
    min_infinite: usize,
    max_finite: f64,
    max_infinite: usize,
}

impl ActivityRange {
    fn of_row(sub: &SubProblem, row: usize, lower: &[f64], upper: &[f64]) -> Self {
        let mut range = ActivityRange::default();
        for (c, a) in sub.matrix.row(row) {
            let (lo, hi) = if a > 0.0 { (a * lower[c], a * upper[c]) } else { (a * upper[c], a * lower[c]) };
            if lo.is_finite() && lo.abs() < crate::model::problem::INFINITE_BOUND { range.min_finite += lo } else { range.min_infinite += 1 }
            if hi.is_finite() && hi.abs() < crate::model::problem::INFINITE_BOUND { range.max_finite += hi } else { range.max_infinite += 1 }
        }
        range
    }

    fn min(&self) -> f64 {
        if self.min_infinite > 0 { f64::NEG_INFINITY } else { self.min_finite }
    }

    fn max(&self) -> f64 {
        if self.max_infinite > 0 { f64::INFINITY } else { self.max_finite }
    }

    /// Minimum activity of all entries but one whose own minimum contribution is `own`
    fn min_without(&self, own: f64) -> f64 {
        if own.is_finite() && own.abs() < crate::model::problem::INFINITE_BOUND {
            if self.min_infinite > 0 { f64::NEG_INFINITY } else { self.min_finite - own }
        } else if self.min_infinite == 1 {
            self.min_finite
        } else {
            f64::NEG_INFINITY
        }
    }

    fn max_without(&self, own: f64) -> f64 {
        if own.is_finite() && own.abs() < crate::model::problem::INFINITE_BOUND {
            if self.max_infinite > 0 { f64::INFINITY } else { self.max_finite - own }
        } else if self.max_infinite == 1 {
            self.max_finite
        } else {
            f64::INFINITY
        }
    }
}

impl ActivityRelaxation {
    /// One propagation sweep over all rows. `Err(())` if a row cannot be satisfied.
    fn propagate(&self, sub: &SubProblem, lower: &mut [f64], upper: &mut [f64]) -> Result<bool, ()> {
        let mut changed = false;

        for r in 0..sub.num_rows() {
            let (rl, ru) = (sub.row_lower[r], sub.row_upper[r]);
            let range = ActivityRange::of_row(sub, r, lower, upper);
            if range.min() > ru + FEAS_TOL || range.max() < rl - FEAS_TOL {
                return Err(());
            }

            for (c, a) in sub.matrix.row(r) {
                let (own_min, own_max) = if a > 0.0 { (a * lower[c], a * upper[c]) } else { (a * upper[c], a * lower[c]) };
                let rest_min = range.min_without(own_min);
                let rest_max = range.max_without(own_max);

                // a x_c <= ru - rest_min  and  a x_c >= rl - rest_max
                let mut new_lower = lower[c];
                let mut new_upper = upper[c];
                if is_finite_bound(ru) && rest_min.is_finite() {
                    let limit = (ru - rest_min) / a;
                    if a > 0.0 { new_upper = new_upper.min(limit) } else { new_lower = new_lower.max(limit) }
                }
                if is_finite_bound(rl) && rest_max.is_finite() {
                    let limit = (rl - rest_max) / a;
                    if a > 0.0 { new_lower = new_lower.max(limit) } else { new_upper = new_upper.min(limit) }
                }

                if sub.integer[c] {
                    new_lower = (new_lower - INT_FEAS_TOL).ceil();
                    new_upper = (new_upper + INT_FEAS_TOL).floor();
                }
                if new_lower > new_upper + FEAS_TOL {
                    return Err(());
                }
                if new_lower > lower[c] + FEAS_TOL {
                    lower[c] = new_lower;
                    changed = true;
                }
                if new_upper < upper[c] - FEAS_TOL {
                    upper[c] = new_upper;
                    changed = true;
                }
            }
        }

        Ok(changed)
    }
}

impl NodeRelaxation for ActivityRelaxation {
    fn solve_node(&mut self, sub: &SubProblem, lower: &mut [f64], upper: &mut [f64]) -> HeuristicResult<NodeBound> {
        for _ in 0..self.max_passes {
            match self.propagate(sub, lower, upper) {
                Err(()) => return Ok(NodeBound::Infeasible),
                Ok(false) => break,
                Ok(true) => {}
            }
        }

        Ok(sub.cheapest_corner(lower, upper))
    }
}

/// Result codes of a bounded sub-solve
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubSolveStatus {
    NoSolutionUnfinished,
    SolutionUnfinished,
    NoSolutionFinished,
    SolutionFinished,
}

impl SubSolveStatus {
    fn from_parts(finished: bool, has_solution: bool) -> Self {
        match (finished, has_solution) {
            (false, false) => SubSolveStatus::NoSolutionUnfinished,
            (false, true) => SubSolveStatus::SolutionUnfinished,
            (true, false) => SubSolveStatus::NoSolutionFinished,
            (true, true) => SubSolveStatus::SolutionFinished,
        }
    }

    /// Classic numeric code, 0 to 3
    pub fn code(self) -> i32 {
        match self {
            SubSolveStatus::NoSolutionUnfinished => 0,
            SubSolveStatus::SolutionUnfinished => 1,
            SubSolveStatus::NoSolutionFinished => 2,
            SubSolveStatus::SolutionFinished => 3,
        }
    }

    pub fn is_finished(self) -> bool {
        matches!(self, SubSolveStatus::NoSolutionFinished | SubSolveStatus::SolutionFinished)
    }

    pub fn has_solution(self) -> bool {
        matches!(self, SubSolveStatus::SolutionUnfinished | SubSolveStatus::SolutionFinished)
    }
}

#[derive(Clone, Debug)]
pub struct SubSolveResult {
    pub status: SubSolveStatus,
    /// best solution in sub-problem space, set when the status has a solution
    pub solution: Option<Vec<f64>>,
    /// objective of `solution` in full problem terms, `cutoff` otherwise
    pub objective: f64,
    pub nodes: usize,
}

/// Open node of a sub-solve
#[derive(Clone, Debug)]
pub struct SubNode {
    pub id: usize,
    pub depth: usize,
    /// bound inherited from the parent
    pub bound: f64,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

#[derive(Clone)]
pub struct SubNodeComparator {
    has_bound: bool,
}

impl SubNodeComparator {
    pub fn with_bound() -> Self {
        SubNodeComparator { has_bound: true }
    }

    pub fn without_bound() -> Self {
        SubNodeComparator { has_bound: false }
    }
}

impl Compare<SubNode> for SubNodeComparator {
    // greater -> earlier out of the queue
    fn compare(&self, l: &SubNode, r: &SubNode) -> Ordering {
        if self.has_bound {
            r.bound.total_cmp(&l.bound).then(l.depth.cmp(&r.depth)).then(l.id.cmp(&r.id))
        } else {
            // dive: deepest first, latest child first
            l.depth.cmp(&r.depth).then(l.id.cmp(&r.id))
        }
    }
}

/// Branching choice: (column, upper bound of down child, lower bound of up child, up child first)
type BranchChoice = (usize, f64, f64, bool);

fn choose_branch(sub: &SubProblem, x: &[f64], lower: &[f64], upper: &[f64]) -> Option<BranchChoice> {
    // most fractional integer column
    let fractional = (0..sub.num_cols())
        .filter(|&j| sub.integer[j] && lower[j] < upper[j])
        .map(|j| (j, x[j] - x[j].floor()))
        .filter(|(_, f)| *f > INT_FEAS_TOL && *f < 1.0 - INT_FEAS_TOL)
        .min_by(|a, b| (a.1 - 0.5).abs().total_cmp(&(b.1 - 0.5).abs()));

    if let Some((j, frac)) = fractional {
        return Some((j, x[j].floor(), x[j].ceil(), frac >= 0.5));
    }

    // integral but violating: move a column of the first violated row
    let activities = sub.matrix.activities(x);
    let row = (0..sub.num_rows()).find(|&r| row_violation(activities[r], sub.row_lower[r], sub.row_upper[r]) > FEAS_TOL)?;
    let increase = activities[row] < sub.row_lower[row];

    let (j, a) = sub
        .matrix
        .row(row)
        .filter(|&(j, a)| {
            sub.integer[j] && {
                let up = (a > 0.0) == increase;
                if up { x[j] < upper[j] - INT_FEAS_TOL } else { x[j] > lower[j] + INT_FEAS_TOL }
            }
        })
        .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))?;

    let v = x[j].round();
    if (a > 0.0) == increase {
        Some((j, v, v + 1.0, true))
    } else {
        Some((j, v - 1.0, v, false))
    }
}

/// Branch and bound over `sub`, processing at most `node_cap` nodes
/// and accepting only solutions strictly below `cutoff`.
pub fn bounded_search(sub: &SubProblem, relaxation: &mut dyn NodeRelaxation, node_cap: usize, cutoff: f64) -> HeuristicResult<SubSolveResult> {
    if sub.num_cols() == 0 {
        // every row was checked while restricting
        let objective = sub.offset;
        let found = objective < cutoff;
        return Ok(SubSolveResult {
            status: SubSolveStatus::from_parts(true, found),
            solution: if found { Some(Vec::new()) } else { None },
            objective: if found { objective } else { cutoff },
            nodes: 0,
        });
    }

    let mut queue = NodeQueue::new(SubNodeComparator::with_bound(), SubNodeComparator::without_bound());
    queue.push(SubNode {
        id: 0,
        depth: 0,
        bound: f64::NEG_INFINITY,
        lower: sub.lower.clone(),
        upper: sub.upper.clone(),
    });

    let mut incumbent: Option<Vec<f64>> = None;
    let mut incumbent_value = cutoff;
    let mut nodes = 0;
    let mut next_id = 1;

    while let Some(mut node) = queue.pop() {
        if nodes >= node_cap {
            queue.push(node);
            break;
        }
        nodes += 1;

        if node.bound >= incumbent_value - OBJ_TOL {
            continue;
        }

        let (objective, solution) = match relaxation.solve_node(sub, &mut node.lower, &mut node.upper)? {
            NodeBound::Infeasible => continue,
            NodeBound::Bounded { objective, solution } => (objective, solution),
        };
        if objective >= incumbent_value - OBJ_TOL {
            continue;
        }

        if sub.is_feasible(&solution, &node.lower, &node.upper) {
            incumbent_value = sub.objective_value(&solution);
            incumbent = Some(solution);
            queue.now_has_bound();
            continue;
        }

        let Some((col, down_upper, up_lower, up_first)) = choose_branch(sub, &solution, &node.lower, &node.upper) else {
            continue;
        };

        let mut down = SubNode {
            id: 0,
            depth: node.depth + 1,
            bound: objective,
            lower: node.lower.clone(),
            upper: node.upper.clone(),
        };
        down.upper[col] = down_upper;
        let mut up = SubNode {
            id: 0,
            depth: node.depth + 1,
            bound: objective,
            lower: node.lower,
            upper: node.upper,
        };
        up.lower[col] = up_lower;

        // preferred child gets the later id and is dived into first
        let (first, second) = if up_first { (down, up) } else { (up, down) };
        for mut child in [first, second] {
            if child.lower[col] > child.upper[col] + FEAS_TOL {
                continue;
            }
            child.id = next_id;
            next_id += 1;
            queue.push(child);
        }
    }

    let finished = queue
        .lowest_by(|n| n.bound)
        .map_or(true, |lowest| lowest >= incumbent_value - OBJ_TOL);

    Ok(SubSolveResult {
        status: SubSolveStatus::from_parts(finished, incumbent.is_some()),
        solution: incumbent,
        objective: incumbent_value,
        nodes,
    })
}
