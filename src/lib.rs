#![warn(warnings)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(non_upper_case_globals)]
#![allow(clippy::needless_return)]
#![allow(clippy::items_after_statements)]
#![allow(unused_variables, unused_imports, dead_code)]

pub mod error;
pub mod heuristic;
pub mod misc;
pub mod model;
pub mod solvers;
mod ui;

use std::sync::Arc;
use std::time::Instant;

pub use error::{HeuristicError, HeuristicResult};
pub use heuristic::partial::PartialFixHeuristic;
pub use heuristic::rounding::RoundingHeuristic;
pub use heuristic::serendipity::SerendipityHeuristic;
pub use heuristic::settings::{ConfigStatement, HeuristicSettings, When};
pub use heuristic::{CutOutcome, CutPool, Heuristic, HeuristicKind, SeekOutcome};
pub use model::{BranchDecision, NodeState, SearchModel};
pub use ui::*;

/// Distance to the nearest integer below which a value counts as integral
pub const INT_FEAS_TOL: f64 = 1e-5;

/// Allowed violation of bounds and rows
pub const FEAS_TOL: f64 = 1e-6;

/// Improvement accepted by the model during a collection run
#[derive(Clone, Debug, PartialEq)]
pub struct HeuristicFind {
    pub heuristic: String,
    pub objective: f64,
}

/// Registry of heuristic instances, invoked in insertion order
/// at every trigger point of the search.
#[derive(Default)]
pub struct HeuristicCollection {
    heuristics: Vec<HeuristicKind>,
    model: Option<Arc<SearchModel>>,
}

impl HeuristicCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a heuristic, attaching it to the current model if there is one
    pub fn add(&mut self, heuristic: impl Into<HeuristicKind>) {
        let mut heuristic = heuristic.into();
        if let Some(model) = &self.model {
            heuristic.set_model(model.clone());
        }
        self.heuristics.push(heuristic);
    }

    pub fn set_model(&mut self, model: Arc<SearchModel>) {
        #[cfg(feature = "validity_assertions")]
        model.ui_sender.send(UIUserMessage::LogS("Validity Assertions Active"));

        model.ui_sender.send(UIUserMessage::StartPhase("model attached"));
        for heuristic in &mut self.heuristics {
            heuristic.set_model(model.clone());
        }
        self.model = Some(model);
    }

    /// Broadcast after the model changed structurally
    pub fn reset_model(&mut self) -> HeuristicResult<()> {
        let model = self.model()?.clone();
        model.ui_sender.send(UIUserMessage::StartPhase("model reset"));
        for heuristic in &mut self.heuristics {
            heuristic.reset_model(model.clone());
        }
        Ok(())
    }

    pub fn validate_all(&mut self) {
        for heuristic in &mut self.heuristics {
            heuristic.validate();
        }
    }

    pub fn len(&self) -> usize {
        self.heuristics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heuristics.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&HeuristicKind> {
        self.heuristics.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut HeuristicKind> {
        self.heuristics.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &HeuristicKind> {
        self.heuristics.iter()
    }

    fn model(&self) -> HeuristicResult<&Arc<SearchModel>> {
        self.model
            .as_ref()
            .ok_or_else(|| HeuristicError::NoModel("collection".to_string()))
    }

    /// Run every heuristic that fires at the model's current node, after cuts are added.
    /// Each improvement is proposed to the model right away, so later heuristics see it.
    pub fn run_at_node(&mut self) -> HeuristicResult<Vec<HeuristicFind>> {
        let model = self.model()?.clone();
        let node = model.node_snapshot();
        let mut finds = Vec::new();

        for heuristic in &mut self.heuristics {
            if !heuristic.base_mut().should_run(&node) {
                continue;
            }
            let name = heuristic.name().to_string();
            let start = Instant::now();
            model.ui_sender.send(UIUserMessage::HeuristicStart { name: name.clone(), depth: node.depth });

            let best = model.best_objective();
            let mut buffer = vec![0.0; model.problem().num_cols()];
            let outcome = heuristic.seek_solution(best, &mut buffer)?;

            #[cfg(feature = "validity_assertions")]
            if let SeekOutcome::Improved { objective } = outcome {
                let problem = model.problem();
                assert!(problem.is_feasible(&buffer, problem.col_lower(), problem.col_upper()));
                assert!(objective < best);
            }

            let accepted = match outcome {
                SeekOutcome::Improved { objective } => model.propose_solution(objective, &buffer, &name).then_some(objective),
                SeekOutcome::NoSolution => None,
            };
            if let Some(objective) = accepted {
                finds.push(HeuristicFind { heuristic: name.clone(), objective });
            }
            heuristic.base_mut().record_run(&node, accepted.is_some(), start);

            model.ui_sender.send(UIUserMessage::HeuristicFinish(HeuristicUIState {
                name,
                depth: node.depth,
                outcome: if accepted.is_some() { "improved" } else { "none" },
                objective: accepted,
                best_obj: model.best_objective(),
                runtime: start.elapsed().as_secs_f64(),
            }));
        }

        Ok(finds)
    }

    /// Cut phase variant of [`Self::run_at_node`]
    pub fn run_with_cuts(&mut self, cuts: &mut CutPool) -> HeuristicResult<Vec<HeuristicFind>> {
        let model = self.model()?.clone();
        let node = model.node_snapshot();
        let mut finds = Vec::new();

        for heuristic in &mut self.heuristics {
            if !heuristic.base_mut().should_run(&node) {
                continue;
            }
            let name = heuristic.name().to_string();
            let start = Instant::now();

            let best = model.best_objective();
            let mut buffer = vec![0.0; model.problem().num_cols()];
            let (accepted, outcome) = match heuristic.seek_solution_with_cuts(best, &mut buffer, cuts)? {
                CutOutcome::Improved { objective } => (model.propose_solution(objective, &buffer, &name).then_some(objective), "improved"),
                CutOutcome::EstimateOnly { estimate } => {
                    model.ui_sender.send(UIUserMessage::Log(format!("{name} estimates {estimate}")));
                    (None, "estimate")
                }
                CutOutcome::NoSolution => (None, "none"),
            };
            if let Some(objective) = accepted {
                finds.push(HeuristicFind { heuristic: name.clone(), objective });
            }
            heuristic.base_mut().record_run(&node, accepted.is_some(), start);

            model.ui_sender.send(UIUserMessage::HeuristicFinish(HeuristicUIState {
                name,
                depth: node.depth,
                outcome,
                objective: accepted,
                best_obj: model.best_objective(),
                runtime: start.elapsed().as_secs_f64(),
            }));
        }

        Ok(finds)
    }

    /// Non default configuration of every member, by heuristic name
    pub fn replay_statements(&self) -> Vec<(String, Vec<ConfigStatement>)> {
        self.heuristics
            .iter()
            .map(|h| (h.name().to_string(), h.replay_statements()))
            .collect()
    }

    /// Per heuristic statistics, also handed to the UI which exits afterwards
    pub fn finish(&self) -> Vec<HeuristicStatsUIState> {
        let stats: Vec<HeuristicStatsUIState> = self
            .heuristics
            .iter()
            .map(|h| {
                let s = &h.base().stats;
                HeuristicStatsUIState {
                    name: h.name().to_string(),
                    runs: s.runs,
                    solutions: s.solutions,
                    sub_solve_nodes: s.sub_solve_nodes,
                    runtime: s.seconds,
                }
            })
            .collect();

        if let Some(model) = &self.model {
            model.ui_sender.send(UIUserMessage::ExitUi { stats: stats.clone() });
        }
        stats
    }
}
