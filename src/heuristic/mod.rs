use std::sync::Arc;
use std::time::Instant;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::error::{HeuristicError, HeuristicResult};
use crate::misc::digest_words;
use crate::model::problem::Problem;
use crate::model::{NodeState, SearchModel};
use crate::ui::{SubSolveUIState, UIUserMessage};

pub mod node;
pub mod partial;
pub mod rounding;
pub mod serendipity;
pub mod settings;
pub mod sub_solve;

use node::{HeuristicNode, HeuristicNodeHistory};
use partial::PartialFixHeuristic;
use rounding::RoundingHeuristic;
use serendipity::SerendipityHeuristic;
use settings::{check_decay_factor, check_far_threshold, check_fraction_small, check_how_often, ConfigStatement, HeuristicSettings, When};
use sub_solve::{bounded_search, SubProblem, SubSolveResult, SubSolverBackend};

/// Result of `seek_solution`
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SeekOutcome {
    NoSolution,
    /// solution buffer holds a full solution with this objective
    Improved { objective: f64 },
}

/// Result of `seek_solution_with_cuts`
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CutOutcome {
    NoSolution,
    Improved { objective: f64 },
    /// no solution, but an estimate of the best possible one.
    /// The solution buffer is left untouched.
    EstimateOnly { estimate: f64 },
}

/// Row cut `lower <= sum entries <= upper`
#[derive(Clone, Debug, PartialEq)]
pub struct Cut {
    pub entries: Vec<(usize, f64)>,
    pub lower: f64,
    pub upper: f64,
}

/// Cuts handed in during the cut generation phase
#[derive(Clone, Debug, Default)]
pub struct CutPool {
    cuts: Vec<Cut>,
}

impl CutPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, cut: Cut) {
        self.cuts.push(cut);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cut> {
        self.cuts.iter()
    }

    pub fn len(&self) -> usize {
        self.cuts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cuts.is_empty()
    }
}

#[derive(Clone, Debug, Default)]
pub struct HeuristicStats {
    pub runs: usize,
    pub solutions: usize,
    pub sub_solve_nodes: usize,
    pub seconds: f64,
}

/// State every heuristic carries: model handle, settings,
/// private random stream and the nodes it already ran at.
#[derive(Clone)]
pub struct HeuristicBase {
    model: Option<Arc<SearchModel>>,
    settings: HeuristicSettings,
    rng: ChaCha8Rng,
    run_nodes: HeuristicNodeHistory,
    eligible_nodes: u64,
    how_often: f64,
    pub stats: HeuristicStats,
}

impl HeuristicBase {
    pub fn new(settings: HeuristicSettings) -> HeuristicResult<Self> {
        settings.validate_settings()?;
        Ok(Self::build(settings))
    }

    /// Default settings under the given name
    pub fn named(name: &str) -> Self {
        Self::build(HeuristicSettings {
            name: name.to_string(),
            ..HeuristicSettings::default()
        })
    }

    fn build(settings: HeuristicSettings) -> Self {
        HeuristicBase {
            model: None,
            rng: ChaCha8Rng::seed_from_u64(settings.seed),
            run_nodes: HeuristicNodeHistory::new(),
            eligible_nodes: 0,
            how_often: f64::from(settings.how_often),
            settings,
            stats: HeuristicStats::default(),
        }
    }

    pub fn model(&self) -> HeuristicResult<&Arc<SearchModel>> {
        self.model
            .as_ref()
            .ok_or_else(|| HeuristicError::NoModel(self.settings.name.clone()))
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// Just set model, do not touch anything else
    pub fn set_model_only(&mut self, model: Arc<SearchModel>) {
        self.model = Some(model);
    }

    pub fn settings(&self) -> &HeuristicSettings {
        &self.settings
    }

    pub fn name(&self) -> &str {
        &self.settings.name
    }

    pub fn set_heuristic_name(&mut self, name: &str) {
        self.settings.name = name.to_string();
    }

    pub fn when(&self) -> When {
        self.settings.when
    }

    pub fn set_when(&mut self, when: When) {
        self.settings.when = when;
    }

    /// Classic integer code, see [`When::from_code`]
    pub fn set_when_code(&mut self, code: i32) -> HeuristicResult<()> {
        let (when, trust_odd) = When::from_code(code)?;
        self.settings.when = when;
        self.settings.trust_odd_problems = trust_odd;
        Ok(())
    }

    pub fn trust_odd_problems(&self) -> bool {
        self.settings.trust_odd_problems
    }

    pub fn set_trust_odd_problems(&mut self, value: bool) {
        self.settings.trust_odd_problems = value;
    }

    pub fn number_nodes(&self) -> usize {
        self.settings.number_nodes
    }

    pub fn set_number_nodes(&mut self, value: usize) {
        self.settings.number_nodes = value;
    }

    pub fn feasibility_pump_options(&self) -> i32 {
        self.settings.feasibility_pump_options
    }

    pub fn set_feasibility_pump_options(&mut self, value: i32) {
        self.settings.feasibility_pump_options = value;
    }

    pub fn fraction_small(&self) -> f64 {
        self.settings.fraction_small
    }

    pub fn set_fraction_small(&mut self, value: f64) -> HeuristicResult<()> {
        check_fraction_small(value)?;
        self.settings.fraction_small = value;
        Ok(())
    }

    pub fn how_often(&self) -> u32 {
        self.settings.how_often
    }

    pub fn set_how_often(&mut self, value: u32) -> HeuristicResult<()> {
        check_how_often(value)?;
        self.settings.how_often = value;
        self.how_often = f64::from(value);
        Ok(())
    }

    pub fn decay_factor(&self) -> f64 {
        self.settings.decay_factor
    }

    pub fn set_decay_factor(&mut self, value: f64) -> HeuristicResult<()> {
        check_decay_factor(value)?;
        self.settings.decay_factor = value;
        Ok(())
    }

    pub fn far_threshold(&self) -> f64 {
        self.settings.far_threshold
    }

    pub fn set_far_threshold(&mut self, value: f64) -> HeuristicResult<()> {
        check_far_threshold(value)?;
        self.settings.far_threshold = value;
        Ok(())
    }

    pub fn sub_solver(&self) -> SubSolverBackend {
        self.settings.sub_solver
    }

    pub fn set_sub_solver(&mut self, backend: SubSolverBackend) {
        self.settings.sub_solver = backend;
    }

    pub fn seed(&self) -> u64 {
        self.settings.seed
    }

    /// Reseeds the private random stream immediately
    pub fn set_seed(&mut self, value: u64) {
        self.settings.seed = value;
        self.rng = ChaCha8Rng::seed_from_u64(value);
    }

    /// Persistent random stream, advances with every use
    pub fn rng_mut(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    /// Fresh stream derived from the seed and the branching path of `node`.
    /// Same node and seed give the same stream, different nodes diverge.
    pub fn node_stream(&self, node: &NodeState) -> ChaCha8Rng {
        let key = digest_words(self.settings.seed, node.path.iter().flat_map(|d| d.words()));
        ChaCha8Rng::seed_from_u64(key)
    }

    pub fn run_nodes(&self) -> &HeuristicNodeHistory {
        &self.run_nodes
    }

    /// Problem and node snapshot, checked against each other
    pub fn snapshot(&self) -> HeuristicResult<(Arc<Problem>, NodeState)> {
        let model = self.model()?;
        let problem = model.problem();
        let node = model.node_snapshot();

        let n = problem.num_cols();
        for (what, len) in [("solution", node.solution.len()), ("lower bounds", node.lower.len()), ("upper bounds", node.upper.len())] {
            if len != n {
                return Err(HeuristicError::RelaxationLength { what, expected: n, got: len });
            }
        }
        Ok((problem, node))
    }

    pub fn check_buffer(problem: &Problem, solution: &[f64]) -> HeuristicResult<()> {
        if solution.len() != problem.num_cols() {
            return Err(HeuristicError::SolutionLength {
                expected: problem.num_cols(),
                got: solution.len(),
            });
        }
        Ok(())
    }

    pub fn log(&self, message: String) {
        if let Some(model) = &self.model {
            model.ui_sender.send(UIUserMessage::Log(message));
        }
    }

    /// Switch off if the model has odd objects (special ordered sets)
    /// the heuristic cannot handle, unless the user vouched for them
    pub fn disable_if_odd(&mut self, can_deal_with_odd: bool) -> bool {
        let Some(model) = &self.model else { return false };
        if model.problem().num_sos() == 0 || can_deal_with_odd || self.settings.trust_odd_problems {
            return false;
        }
        self.disable("model has special ordered sets");
        true
    }

    pub fn disable(&mut self, reason: &'static str) {
        self.settings.when = When::Off;
        if let Some(model) = &self.model {
            model.ui_sender.send(UIUserMessage::HeuristicDisabled {
                name: self.settings.name.clone(),
                reason,
            });
        }
    }

    /// Trigger point, frequency and history gate for the node about to be processed
    pub fn should_run(&mut self, node: &NodeState) -> bool {
        if !self.settings.when.fires_at(node.is_root()) {
            return false;
        }

        self.eligible_nodes += 1;
        let every = self.how_often.max(1.0).round() as u64;
        if (self.eligible_nodes - 1) % every != 0 {
            return false;
        }

        if node.is_root() {
            return true;
        }
        self.run_nodes
            .any_far(&HeuristicNode::new(&node.path), self.settings.far_threshold)
    }

    /// Book keeping after an invocation at `node`
    pub fn record_run(&mut self, node: &NodeState, found: bool, started: Instant) {
        self.stats.runs += 1;
        self.stats.seconds += started.elapsed().as_secs_f64();
        if found {
            self.stats.solutions += 1;
        } else {
            self.how_often *= 1.0 + self.settings.decay_factor;
        }
        if !node.is_root() {
            self.run_nodes.append(HeuristicNode::new(&node.path));
        }
    }

    /// Mini branch and bound on `sub`, at most `node_cap` nodes, solutions must beat `cutoff`.
    pub fn small_branch_and_bound(&mut self, sub: &SubProblem, node_cap: usize, cutoff: f64, label: &str) -> HeuristicResult<SubSolveResult> {
        let started = Instant::now();
        let mut relaxation = self.settings.sub_solver.relaxation(sub, self.settings.seed)?;
        let result = bounded_search(sub, relaxation.as_mut(), node_cap, cutoff)?;
        self.stats.sub_solve_nodes += result.nodes;

        if let Some(model) = &self.model {
            model.ui_sender.send(UIUserMessage::SubSolveFinish(SubSolveUIState {
                label: format!("{} {}", self.settings.name, label),
                columns: sub.num_cols(),
                rows: sub.num_rows(),
                nodes: result.nodes,
                status: result.status.code(),
                objective: result.solution.as_ref().map(|_| result.objective),
                runtime: started.elapsed().as_secs_f64(),
            }));
        }
        Ok(result)
    }
}

/// Capabilities shared by every heuristic
pub trait Heuristic {
    fn base(&self) -> &HeuristicBase;

    fn base_mut(&mut self) -> &mut HeuristicBase;

    /// Settings this variant starts from
    fn default_settings(&self) -> HeuristicSettings;

    fn name(&self) -> &str {
        self.base().name()
    }

    /// Attach to a model, same as a reset
    fn set_model(&mut self, model: Arc<SearchModel>) {
        self.reset_model(model);
    }

    /// Rebind to a (possibly structurally changed) model.
    /// Must drop every cached per column / per row table.
    fn reset_model(&mut self, model: Arc<SearchModel>);

    /// Switch off (`when = Off`) for models the heuristic cannot deal with
    fn validate(&mut self) {}

    /// Returns true if it can deal with "odd" problems e.g. sos type 2
    fn can_deal_with_odd(&self) -> bool {
        false
    }

    /// Called after cuts were added at a node, so can not add cuts.
    /// Writes `solution` only when returning `Improved`,
    /// and only with an objective strictly below `best_objective`.
    fn seek_solution(&mut self, best_objective: f64, solution: &mut [f64]) -> HeuristicResult<SeekOutcome>;

    /// Called while cuts are generated, so may add cuts. Default does nothing.
    fn seek_solution_with_cuts(&mut self, best_objective: f64, solution: &mut [f64], cuts: &mut CutPool) -> HeuristicResult<CutOutcome> {
        Ok(CutOutcome::NoSolution)
    }

    /// Non default configuration as replayable statements
    fn replay_statements(&self) -> Vec<ConfigStatement> {
        self.base().settings().replay_statements(&self.default_settings())
    }
}

/// The closed set of heuristics the search engine knows about
#[derive(Clone)]
pub enum HeuristicKind {
    Rounding(RoundingHeuristic),
    PartialFix(PartialFixHeuristic),
    Serendipity(SerendipityHeuristic),
}

macro_rules! dispatch {
    ($self:expr, $h:ident => $body:expr) => {
        match $self {
            HeuristicKind::Rounding($h) => $body,
            HeuristicKind::PartialFix($h) => $body,
            HeuristicKind::Serendipity($h) => $body,
        }
    };
}

impl Heuristic for HeuristicKind {
    fn base(&self) -> &HeuristicBase {
        dispatch!(self, h => h.base())
    }

    fn base_mut(&mut self) -> &mut HeuristicBase {
        dispatch!(self, h => h.base_mut())
    }

    fn default_settings(&self) -> HeuristicSettings {
        dispatch!(self, h => h.default_settings())
    }

    fn set_model(&mut self, model: Arc<SearchModel>) {
        dispatch!(self, h => h.set_model(model))
    }

    fn reset_model(&mut self, model: Arc<SearchModel>) {
        dispatch!(self, h => h.reset_model(model))
    }

    fn validate(&mut self) {
        dispatch!(self, h => h.validate())
    }

    fn can_deal_with_odd(&self) -> bool {
        dispatch!(self, h => h.can_deal_with_odd())
    }

    fn seek_solution(&mut self, best_objective: f64, solution: &mut [f64]) -> HeuristicResult<SeekOutcome> {
        dispatch!(self, h => h.seek_solution(best_objective, solution))
    }

    fn seek_solution_with_cuts(&mut self, best_objective: f64, solution: &mut [f64], cuts: &mut CutPool) -> HeuristicResult<CutOutcome> {
        dispatch!(self, h => h.seek_solution_with_cuts(best_objective, solution, cuts))
    }

    fn replay_statements(&self) -> Vec<ConfigStatement> {
        dispatch!(self, h => h.replay_statements())
    }
}

impl From<RoundingHeuristic> for HeuristicKind {
    fn from(h: RoundingHeuristic) -> Self {
        HeuristicKind::Rounding(h)
    }
}

impl From<PartialFixHeuristic> for HeuristicKind {
    fn from(h: PartialFixHeuristic) -> Self {
        HeuristicKind::PartialFix(h)
    }
}

impl From<SerendipityHeuristic> for HeuristicKind {
    fn from(h: SerendipityHeuristic) -> Self {
        HeuristicKind::Serendipity(h)
    }
}
