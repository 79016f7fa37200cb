use gurobi::{attr, param, ConstrSense, LinExpr, Minimize, Status, Var, VarType};

use crate::error::{HeuristicError, HeuristicResult};
use crate::heuristic::sub_solve::{NodeBound, NodeRelaxation, SubProblem};
use crate::model::problem::is_finite_bound;

impl From<gurobi::Error> for HeuristicError {
    fn from(e: gurobi::Error) -> Self {
        HeuristicError::Backend(format!("{e:?}"))
    }
}

/// LP relaxation of a sub-problem. The model is built once,
/// every node only rewrites the column bounds.
pub struct GurobiRelaxation {
    model: gurobi::Model,
    vars: Vec<Var>,
}

impl GurobiRelaxation {
    pub fn new(sub: &SubProblem, seed: u64) -> HeuristicResult<Self> {
        let mut env = gurobi::Env::new("")?;
        env.set(param::Threads, 1)?;
        env.set(param::Seed, (seed % i32::MAX as u64) as i32)?;
        env.set(param::OutputFlag, 0)?;

        let mut model = gurobi::Model::new("sub_solve", &env)?;

        let vars: Vec<Var> = (0..sub.num_cols())
            .map(|j| {
                model.add_var(
                    &format!("x[{}]", sub.original_column(j)),
                    VarType::Continuous,
                    0.0,
                    sub.lower()[j],
                    sub.upper()[j],
                    &[],
                    &[],
                )
            })
            .collect::<Result<_, _>>()?;
        model.update()?;

        for r in 0..sub.num_rows() {
            let expr = sub
                .matrix()
                .row(r)
                .fold(LinExpr::new(), |expr, (j, a)| expr.add_term(a, vars[j].clone()));
            let (lo, up) = (sub.row_lower()[r], sub.row_upper()[r]);
            let name = format!("row[{}]", sub.original_row(r));

            if lo == up {
                model.add_constr(&name, expr, ConstrSense::Equal, lo)?;
                continue;
            }
            if is_finite_bound(lo) {
                model.add_constr(&format!("{name}_lo"), expr.clone(), ConstrSense::Greater, lo)?;
            }
            if is_finite_bound(up) {
                model.add_constr(&format!("{name}_up"), expr, ConstrSense::Less, up)?;
            }
        }
        let objective = vars
            .iter()
            .zip(sub.objective())
            .fold(LinExpr::new(), |expr, (var, c)| expr.add_term(*c, var.clone()));
        model.set_objective(objective, Minimize)?;
        model.update()?;

        Ok(GurobiRelaxation { model, vars })
    }
}

impl NodeRelaxation for GurobiRelaxation {
    fn solve_node(&mut self, sub: &SubProblem, lower: &mut [f64], upper: &mut [f64]) -> HeuristicResult<NodeBound> {
        self.model.set_values(attr::LB, &self.vars, lower)?;
        self.model.set_values(attr::UB, &self.vars, upper)?;
        self.model.update()?;
        self.model.optimize()?;

        match self.model.status()? {
            Status::Optimal => {
                let solution = self.model.get_values(attr::X, &self.vars)?;
                Ok(NodeBound::Bounded {
                    objective: sub.objective_value(&solution),
                    solution,
                })
            }
            Status::Unbounded => match sub.cheapest_corner(lower, upper) {
                NodeBound::Bounded { solution, .. } => Ok(NodeBound::Bounded {
                    objective: f64::NEG_INFINITY,
                    solution,
                }),
                NodeBound::Infeasible => Ok(NodeBound::Infeasible),
            },
            Status::Infeasible | Status::InfOrUnbd => Ok(NodeBound::Infeasible),
            status => Err(HeuristicError::Backend(format!("unexpected lp status {status:?}"))),
        }
    }
}
