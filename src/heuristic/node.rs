use crate::model::BranchDecision;

/// Branching decisions that lead to the node a heuristic was invoked from
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HeuristicNode {
    decisions: Vec<BranchDecision>,
}

impl HeuristicNode {
    pub fn new(path: &[BranchDecision]) -> Self {
        HeuristicNode {
            decisions: path.to_vec(),
        }
    }

    pub fn decisions(&self) -> &[BranchDecision] {
        &self.decisions
    }

    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }

    /// Number of positions at which both paths made the same decision
    pub fn matching(&self, other: &HeuristicNode) -> usize {
        self.decisions
            .iter()
            .zip(&other.decisions)
            .filter(|(a, b)| a == b)
            .count()
    }

    /// True if less than `threshold` of the decisions agree.
    ///
    /// Positions beyond the shorter path count as disagreements,
    /// so the ratio is taken over the longer of the two paths.
    pub fn is_far_from(&self, other: &HeuristicNode, threshold: f64) -> bool {
        let longest = self.len().max(other.len());
        let matching = self.matching(other);

        // same path, never far
        if matching == longest {
            return false;
        }

        (matching as f64 / longest as f64) < threshold
    }
}

/// Handle of a node stored in a [`HeuristicNodeHistory`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeIndex(pub usize);

/// Nodes at which a heuristic already ran, in insertion order.
/// The history owns its nodes, cloning it deep copies them.
#[derive(Clone, Debug, Default)]
pub struct HeuristicNodeHistory {
    nodes: Vec<HeuristicNode>,
}

impl HeuristicNodeHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of `node`
    pub fn append(&mut self, node: HeuristicNode) -> NodeIndex {
        self.nodes.push(node);
        NodeIndex(self.nodes.len() - 1)
    }

    /// Move all nodes of `other` to the end of this history
    pub fn append_all(&mut self, other: &mut HeuristicNodeHistory) {
        self.nodes.append(&mut other.nodes);
    }

    /// True only if every stored node is far from `candidate`.
    /// An empty history is far from everything.
    pub fn any_far(&self, candidate: &HeuristicNode, threshold: f64) -> bool {
        self.nodes.iter().all(|n| n.is_far_from(candidate, threshold))
    }

    pub fn get(&self, index: NodeIndex) -> Option<&HeuristicNode> {
        self.nodes.get(index.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &HeuristicNode> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }
}
