use std::sync::{Arc, RwLock};

use crate::ui::{UISender, UIUserMessage};
use crate::UI;

pub mod matrix;
pub mod problem;

use problem::Problem;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BranchWay {
    Down,
    Up,
}

/// One branching decision on the path from the root to a node:
/// `object` was restricted to `x <= bound` (down) or `x >= bound` (up)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BranchDecision {
    pub object: usize,
    pub way: BranchWay,
    pub bound: f64,
}

impl BranchDecision {
    pub fn down(object: usize, bound: f64) -> Self {
        BranchDecision { object, way: BranchWay::Down, bound }
    }

    pub fn up(object: usize, bound: f64) -> Self {
        BranchDecision { object, way: BranchWay::Up, bound }
    }

    /// Words identifying the decision, used for hashing node positions
    pub fn words(&self) -> [u64; 3] {
        [
            self.object as u64,
            matches!(self.way, BranchWay::Up) as u64,
            self.bound.to_bits(),
        ]
    }
}

/// Snapshot of the search tree node the engine is currently processing
#[derive(Clone, Debug, Default)]
pub struct NodeState {
    pub depth: u32,
    pub path: Vec<BranchDecision>,
    /// bounds valid at this node
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
    /// relaxation solution and its objective
    pub solution: Vec<f64>,
    pub objective: f64,
    /// integer feasible solution the relaxation solver stumbled upon
    pub solver_solution: Option<(f64, Vec<f64>)>,
    /// user supplied (partial) solution
    pub hotstart: Option<Vec<f64>>,
}

impl NodeState {
    /// Root node with the problem bounds
    pub fn root(problem: &Problem, solution: Vec<f64>, objective: f64) -> Self {
        NodeState {
            depth: 0,
            path: Vec::new(),
            lower: problem.col_lower().to_vec(),
            upper: problem.col_upper().to_vec(),
            solution,
            objective,
            solver_solution: None,
            hotstart: None,
        }
    }

    /// Child node created by applying `decision` to this node
    pub fn child(&self, decision: BranchDecision, solution: Vec<f64>, objective: f64) -> Self {
        let mut lower = self.lower.clone();
        let mut upper = self.upper.clone();
        match decision.way {
            BranchWay::Down => upper[decision.object] = upper[decision.object].min(decision.bound),
            BranchWay::Up => lower[decision.object] = lower[decision.object].max(decision.bound),
        }

        let mut path = self.path.clone();
        path.push(decision);

        NodeState {
            depth: self.depth + 1,
            path,
            lower,
            upper,
            solution,
            objective,
            solver_solution: None,
            hotstart: self.hotstart.clone(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.depth == 0
    }
}

/// State of the surrounding search that heuristics read.
///
/// Shared among all heuristics through an `Arc`. Heuristics only read it,
/// the only mutation they may trigger is `propose_solution`.
pub struct SearchModel {
    problem: RwLock<Arc<Problem>>,
    pub node: RwLock<NodeState>,
    pub best: RwLock<(f64, Vec<f64>)>,
    pub ui_sender: UISender,
}

impl SearchModel {
    pub fn new(problem: Problem, ui: &UI) -> Self {
        Self::with_sender(problem, ui.get_sender())
    }

    pub fn with_sender(problem: Problem, ui_sender: UISender) -> Self {
        let start = problem
            .col_lower()
            .iter()
            .zip(problem.col_upper())
            .map(|(l, u)| 0.0_f64.clamp(*l, *u))
            .collect();
        let node = NodeState::root(&problem, start, f64::NEG_INFINITY);

        SearchModel {
            problem: RwLock::new(Arc::new(problem)),
            node: RwLock::new(node),
            best: RwLock::new((f64::INFINITY, Vec::default())),
            ui_sender,
        }
    }

    /// Current problem. Cheap, the problem is behind an `Arc`
    pub fn problem(&self) -> Arc<Problem> {
        self.problem.read().unwrap().clone()
    }

    /// Swap in a structurally different problem.
    /// Node state falls back to the root of the new problem,
    /// heuristics must be reset afterwards.
    pub fn replace_problem(&self, problem: Problem) {
        let start = vec![0.0; problem.num_cols()];
        let root = NodeState::root(&problem, start, f64::NEG_INFINITY);
        *self.problem.write().unwrap() = Arc::new(problem);
        *self.node.write().unwrap() = root;
        *self.best.write().unwrap() = (f64::INFINITY, Vec::default());
    }

    pub fn set_node(&self, node: NodeState) {
        *self.node.write().unwrap() = node;
    }

    pub fn node_snapshot(&self) -> NodeState {
        self.node.read().unwrap().clone()
    }

    pub fn best_objective(&self) -> f64 {
        self.best.read().unwrap().0
    }

    /// Offer a solution as new incumbent.
    /// Accepted only if it is feasible for the global bounds and strictly improves.
    pub fn propose_solution(&self, objective: f64, solution: &[f64], source: &str) -> bool {
        let problem = self.problem();
        if !problem.is_feasible(solution, problem.col_lower(), problem.col_upper()) {
            self.ui_sender.send(UIUserMessage::Log(format!("rejected infeasible solution from {source}")));
            return false;
        }

        {
            let mut best = self.best.write().unwrap();
            if objective >= best.0 {
                return false;
            }
            *best = (objective, solution.to_vec());
        }

        self.ui_sender.send(UIUserMessage::NewBest {
            obj: objective,
            heuristic: source.to_string(),
        });
        true
    }
}
