#[cfg(test)]
mod tests {
    use generic_heuristics::heuristic::node::{HeuristicNode, HeuristicNodeHistory};
    use generic_heuristics::BranchDecision;

    fn path(decisions: &[(usize, bool, f64)]) -> HeuristicNode {
        let decisions: Vec<BranchDecision> = decisions
            .iter()
            .map(|&(object, up, bound)| if up { BranchDecision::up(object, bound) } else { BranchDecision::down(object, bound) })
            .collect();
        HeuristicNode::new(&decisions)
    }

    #[test]
    fn never_far_from_itself() {
        let nodes = [
            path(&[]),
            path(&[(0, true, 1.0)]),
            path(&[(0, true, 1.0), (3, false, 0.0), (7, true, 4.0)]),
        ];
        for node in &nodes {
            for threshold in [0.01, 0.5, 1.0] {
                assert!(!node.is_far_from(node, threshold));
                assert!(!node.is_far_from(&node.clone(), threshold));
            }
        }
    }

    #[test]
    fn far_is_symmetric() {
        let nodes = [
            path(&[]),
            path(&[(0, true, 1.0)]),
            path(&[(0, true, 1.0), (2, false, 0.0)]),
            path(&[(0, false, 0.0), (2, false, 0.0), (5, true, 1.0)]),
            path(&[(1, true, 1.0), (2, false, 0.0), (5, true, 1.0), (6, true, 1.0)]),
        ];
        for a in &nodes {
            for b in &nodes {
                for threshold in [0.25, 0.5, 0.75, 1.0] {
                    assert_eq!(a.is_far_from(b, threshold), b.is_far_from(a, threshold));
                }
            }
        }
    }

    #[test]
    fn length_difference_counts_as_mismatch() {
        let short = path(&[(0, true, 1.0)]);
        let long = path(&[(0, true, 1.0), (1, false, 0.0)]);

        assert_eq!(short.matching(&long), 1);
        // 1 of 2 agree
        assert!(!short.is_far_from(&long, 0.5));
        assert!(short.is_far_from(&long, 0.6));
    }

    #[test]
    fn bound_is_part_of_the_decision() {
        let a = path(&[(0, true, 1.0)]);
        let b = path(&[(0, true, 2.0)]);
        assert_eq!(a.matching(&b), 0);
        assert!(a.is_far_from(&b, 0.5));
    }

    #[test]
    fn any_far_needs_every_node_far() {
        let mut history = HeuristicNodeHistory::new();
        let candidate = path(&[(0, true, 1.0), (1, true, 1.0)]);
        assert!(history.any_far(&candidate, 0.5));

        history.append(path(&[(4, false, 0.0), (5, false, 0.0)]));
        assert!(history.any_far(&candidate, 0.5));

        let index = history.append(path(&[(0, true, 1.0), (1, true, 1.0)]));
        assert!(!history.any_far(&candidate, 0.5));
        assert_eq!(history.get(index), Some(&candidate));
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn clone_is_deep() {
        let mut history = HeuristicNodeHistory::new();
        history.append(path(&[(0, true, 1.0)]));

        let mut copy = history.clone();
        copy.append(path(&[(1, true, 1.0)]));
        copy.clear();
        copy.append(path(&[(2, true, 1.0)]));

        assert_eq!(history.len(), 1);
        assert_eq!(history.iter().next(), Some(&path(&[(0, true, 1.0)])));
        assert_eq!(copy.len(), 1);
    }

    #[test]
    fn append_all_moves_nodes() {
        let mut history = HeuristicNodeHistory::new();
        history.append(path(&[(0, true, 1.0)]));
        let mut other = HeuristicNodeHistory::new();
        other.append(path(&[(1, true, 1.0)]));
        other.append(path(&[(2, true, 1.0)]));

        history.append_all(&mut other);
        assert_eq!(history.len(), 3);
        assert!(other.is_empty());
    }
}
