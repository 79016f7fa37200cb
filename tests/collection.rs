mod common;

#[cfg(test)]
mod tests {
    use super::common::*;
    use generic_heuristics::model::problem::ProblemBuilder;
    use generic_heuristics::{
        BranchDecision, CutPool, Heuristic, HeuristicCollection, HeuristicKind, NodeState, PartialFixHeuristic,
        RoundingHeuristic, SerendipityHeuristic, When,
    };

    fn always<H: Heuristic>(mut heuristic: H) -> H {
        heuristic.base_mut().set_when(When::Always);
        heuristic
    }

    #[test]
    fn improvement_reaches_the_model() {
        let model = attach(covering());
        let mut collection = HeuristicCollection::new();
        collection.set_model(model.clone());
        collection.add(always(SerendipityHeuristic::new()));

        let finds = collection.run_at_node().unwrap();
        assert_eq!(finds.len(), 1);
        assert_eq!(finds[0].heuristic, "Serendipity");
        assert_eq!(finds[0].objective, 1.0);
        assert_eq!(model.best_objective(), 1.0);
        assert_eq!(model.best.read().unwrap().1, vec![0.0, 1.0, 0.0]);

        // same solution again is no improvement
        let finds = collection.run_at_node().unwrap();
        assert!(finds.is_empty());

        let stats = collection.finish();
        assert_eq!(stats[0].runs, 2);
        assert_eq!(stats[0].solutions, 1);
    }

    #[test]
    fn trigger_points_are_respected() {
        let model = attach(covering());
        set_root(&model, vec![0.5, 0.5, 0.5]);
        let mut collection = HeuristicCollection::new();
        collection.add(RoundingHeuristic::new());
        collection.set_model(model.clone());

        // rounding defaults to non root nodes
        assert!(collection.run_at_node().unwrap().is_empty());
        assert_eq!(collection.get(0).unwrap().base().stats.runs, 0);

        let root = model.node_snapshot();
        model.set_node(root.child(BranchDecision::up(1, 1.0), vec![0.5, 1.0, 0.5], 1.0));
        let finds = collection.run_at_node().unwrap();
        assert_eq!(collection.get(0).unwrap().base().stats.runs, 1);
        assert_eq!(finds.len(), 1);
    }

    #[test]
    fn history_skips_repeated_nodes() {
        let model = attach(covering());
        let root = NodeState::root(&model.problem(), vec![0.0; 3], 0.0);
        let mut collection = HeuristicCollection::new();
        collection.set_model(model.clone());
        collection.add(always(SerendipityHeuristic::new()));

        let near = root.child(BranchDecision::down(0, 0.0), vec![0.0; 3], 0.0);
        model.set_node(near.clone());
        collection.run_at_node().unwrap();
        collection.run_at_node().unwrap();
        assert_eq!(collection.get(0).unwrap().base().stats.runs, 1);
        assert_eq!(collection.get(0).unwrap().base().run_nodes().len(), 1);

        let far = root.child(BranchDecision::up(2, 1.0), vec![0.0; 3], 0.0);
        model.set_node(far);
        collection.run_at_node().unwrap();
        assert_eq!(collection.get(0).unwrap().base().stats.runs, 2);
    }

    #[test]
    fn how_often_thins_out_runs() {
        let model = attach(covering());
        let mut collection = HeuristicCollection::new();
        collection.set_model(model);
        let mut heuristic = always(SerendipityHeuristic::new());
        heuristic.base_mut().set_how_often(3).unwrap();
        collection.add(heuristic);

        for _ in 0..6 {
            collection.run_at_node().unwrap();
        }
        assert_eq!(collection.get(0).unwrap().base().stats.runs, 2);
    }

    #[test]
    fn validate_all_and_reset_broadcast() {
        let mut builder = ProblemBuilder::new();
        builder.add_binary(1.0);
        let model = attach(builder.build().unwrap());

        let mut collection = HeuristicCollection::new();
        collection.set_model(model.clone());
        collection.add(always(RoundingHeuristic::new()));
        collection.add(always(SerendipityHeuristic::new()));
        collection.validate_all();

        assert_eq!(collection.get(0).unwrap().base().when(), When::Off);
        assert_eq!(collection.get(1).unwrap().base().when(), When::Always);

        model.replace_problem(chain(4));
        collection.reset_model().unwrap();
        if let Some(HeuristicKind::Rounding(rounding)) = collection.get(0) {
            assert!(rounding.locks().is_none());
        } else {
            panic!("rounding heuristic expected first");
        }
    }

    #[test]
    fn cut_phase_default_finds_nothing() {
        let model = attach(covering());
        let mut collection = HeuristicCollection::new();
        collection.set_model(model.clone());
        collection.add(always(SerendipityHeuristic::new()));

        let mut cuts = CutPool::new();
        assert!(collection.run_with_cuts(&mut cuts).unwrap().is_empty());
        assert!(cuts.is_empty());
        assert_eq!(model.best_objective(), f64::INFINITY);
    }

    #[test]
    fn replay_by_name() {
        let mut collection = HeuristicCollection::new();
        collection.add(RoundingHeuristic::new());
        let mut partial = PartialFixHeuristic::new();
        partial.set_fix_priority(5).unwrap();
        collection.add(partial);

        let replay = collection.replay_statements();
        assert_eq!(replay.len(), 2);
        assert_eq!(replay[0].0, "Rounding");
        assert!(replay[0].1.is_empty());
        assert_eq!(replay[1].0, "Partial");
        assert_eq!(replay[1].1.len(), 1);
    }

    #[test]
    fn unattached_collection_is_an_error() {
        let mut collection = HeuristicCollection::new();
        collection.add(SerendipityHeuristic::new());
        assert!(collection.run_at_node().is_err());
    }
}
