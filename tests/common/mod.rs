#![allow(dead_code)]

use std::sync::Arc;

use generic_heuristics::model::problem::{Problem, ProblemBuilder, VarType, INFINITE_BOUND};
use generic_heuristics::{NodeState, SearchModel, UI};

pub fn attach(problem: Problem) -> Arc<SearchModel> {
    let ui = UI::new();
    Arc::new(SearchModel::new(problem, &ui))
}

/// min x1 + x2 + 2 x3  s.t.  x1 + x2 >= 1,  x2 + x3 >= 1,  x binary
pub fn covering() -> Problem {
    let mut builder = ProblemBuilder::new();
    let x1 = builder.add_binary(1.0);
    let x2 = builder.add_binary(1.0);
    let x3 = builder.add_binary(2.0);
    builder.add_row(1.0, INFINITE_BOUND, &[(x1, 1.0), (x2, 1.0)]).unwrap();
    builder.add_row(1.0, INFINITE_BOUND, &[(x2, 1.0), (x3, 1.0)]).unwrap();
    builder.build().unwrap()
}

/// Two continuous columns, one row
pub fn continuous_only() -> Problem {
    let mut builder = ProblemBuilder::new();
    let x = builder.add_column(1.0, 0.0, 10.0, VarType::Continuous);
    let y = builder.add_column(2.0, 0.0, 10.0, VarType::Continuous);
    builder.add_row(1.0, INFINITE_BOUND, &[(x, 1.0), (y, 1.0)]).unwrap();
    builder.build().unwrap()
}

/// `n` binaries with unit cost, row i reads x_i + x_{i+1} >= 1
pub fn chain(n: usize) -> Problem {
    let mut builder = ProblemBuilder::new();
    let cols: Vec<usize> = (0..n).map(|_| builder.add_binary(1.0)).collect();
    for pair in cols.windows(2) {
        builder.add_row(1.0, INFINITE_BOUND, &[(pair[0], 1.0), (pair[1], 1.0)]).unwrap();
    }
    builder.build().unwrap()
}

/// Move the model to its root node with the given relaxation solution
pub fn set_root(model: &SearchModel, solution: Vec<f64>) {
    let problem = model.problem();
    let objective = problem.objective_value(&solution);
    model.set_node(NodeState::root(&problem, solution, objective));
}
