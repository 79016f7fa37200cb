mod common;

#[cfg(test)]
mod tests {
    use super::common::*;
    use generic_heuristics::model::problem::{Problem, ProblemBuilder, VarType, INFINITE_BOUND};
    use generic_heuristics::{Heuristic, HeuristicError, NodeState, PartialFixHeuristic, SeekOutcome};

    /// x0, x1 carry priority 1, x2, x3 the default.
    /// min sum x  s.t.  x0 + x2 >= 1,  x1 + x3 >= 1
    fn prioritised() -> Problem {
        let mut builder = ProblemBuilder::new();
        let x: Vec<usize> = (0..4).map(|_| builder.add_binary(1.0)).collect();
        builder.set_priority(x[0], 1).unwrap();
        builder.set_priority(x[1], 1).unwrap();
        builder.add_row(1.0, INFINITE_BOUND, &[(x[0], 1.0), (x[2], 1.0)]).unwrap();
        builder.add_row(1.0, INFINITE_BOUND, &[(x[1], 1.0), (x[3], 1.0)]).unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn fixed_columns_keep_rounded_values() {
        let model = attach(prioritised());
        set_root(&model, vec![1.0, 0.0, 0.5, 0.5]);
        let mut heuristic = PartialFixHeuristic::with_model(model.clone(), 10).unwrap();
        assert_eq!(heuristic.fix_set(), &[0, 1]);

        let mut buffer = vec![0.0; 4];
        let outcome = heuristic.seek_solution(f64::INFINITY, &mut buffer).unwrap();

        assert_eq!(outcome, SeekOutcome::Improved { objective: 2.0 });
        assert_eq!(buffer, vec![1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn near_integral_values_are_rounded() {
        let model = attach(prioritised());
        set_root(&model, vec![1.0 - 1e-7, 1e-7, 0.5, 0.5]);
        let mut heuristic = PartialFixHeuristic::with_model(model, 10).unwrap();

        let mut buffer = vec![0.0; 4];
        heuristic.seek_solution(f64::INFINITY, &mut buffer).unwrap();
        assert_eq!(&buffer[..2], &[1.0, 0.0]);
    }

    #[test]
    fn fractional_fixed_value_abandons() {
        let model = attach(prioritised());
        set_root(&model, vec![0.5, 0.0, 0.5, 0.5]);
        let mut heuristic = PartialFixHeuristic::with_model(model, 10).unwrap();

        let mut buffer = vec![9.0; 4];
        let outcome = heuristic.seek_solution(f64::INFINITY, &mut buffer).unwrap();
        assert_eq!(outcome, SeekOutcome::NoSolution);
        assert_eq!(buffer, vec![9.0; 4]);
    }

    #[test]
    fn hotstart_wins_over_relaxation() {
        let model = attach(prioritised());
        let problem = model.problem();
        let mut node = NodeState::root(&problem, vec![1.0, 0.0, 0.5, 0.5], 1.0);
        node.hotstart = Some(vec![0.0, 1.0, 0.0, 0.0]);
        model.set_node(node);

        let mut heuristic = PartialFixHeuristic::with_model(model, 10).unwrap();
        let mut buffer = vec![0.0; 4];
        heuristic.seek_solution(f64::INFINITY, &mut buffer).unwrap();
        assert_eq!(buffer, vec![0.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn exhausted_node_cap_is_no_solution() {
        let model = attach(prioritised());
        set_root(&model, vec![1.0, 0.0, 0.5, 0.5]);
        let mut heuristic = PartialFixHeuristic::with_model(model, 10).unwrap();
        heuristic.base_mut().set_number_nodes(0);

        let mut buffer = vec![0.0; 4];
        assert_eq!(heuristic.seek_solution(f64::INFINITY, &mut buffer).unwrap(), SeekOutcome::NoSolution);
    }

    #[test]
    fn stale_fix_set_is_reported() {
        let model = attach(prioritised());
        let mut heuristic = PartialFixHeuristic::with_model(model.clone(), 10).unwrap();

        model.replace_problem(chain(6));
        let mut buffer = vec![0.0; 6];
        assert!(matches!(
            heuristic.seek_solution(f64::INFINITY, &mut buffer),
            Err(HeuristicError::StaleModel { cached: 4, current: 6 })
        ));

        heuristic.reset_model(model.clone());
        // chain columns all carry the default priority
        assert!(heuristic.fix_set().is_empty());
        assert!(heuristic.seek_solution(f64::INFINITY, &mut buffer).is_ok());
    }

    #[test]
    fn priority_threshold_is_inclusive() {
        let model = attach(prioritised());
        let mut heuristic = PartialFixHeuristic::with_model(model, 1).unwrap();
        assert_eq!(heuristic.fix_set(), &[0, 1]);

        heuristic.set_fix_priority(0).unwrap();
        assert!(heuristic.fix_set().is_empty());

        heuristic.set_fix_priority(1000).unwrap();
        assert_eq!(heuristic.fix_set(), &[0, 1, 2, 3]);
        assert!(heuristic.set_fix_priority(-1).is_err());
    }

    #[test]
    fn no_integers_no_write() {
        let model = attach(continuous_only());
        set_root(&model, vec![1.0, 0.0]);
        let mut heuristic = PartialFixHeuristic::with_model(model, 10).unwrap();

        let mut buffer = vec![3.0; 2];
        assert_eq!(heuristic.seek_solution(f64::INFINITY, &mut buffer).unwrap(), SeekOutcome::NoSolution);
        assert_eq!(buffer, vec![3.0; 2]);
    }

    #[test]
    fn replay_includes_fix_priority() {
        let mut heuristic = PartialFixHeuristic::new();
        assert!(heuristic.replay_statements().is_empty());
        heuristic.set_fix_priority(7).unwrap();
        let statements: Vec<String> = heuristic.replay_statements().iter().map(ToString::to_string).collect();
        assert_eq!(statements, vec!["set_fix_priority(7)".to_string()]);
    }

    #[test]
    fn integer_bounds_without_integer_give_nothing() {
        let mut builder = ProblemBuilder::new();
        let x = builder.add_column(1.0, 0.2, 0.8, VarType::Integer);
        let y = builder.add_binary(1.0);
        builder.set_priority(x, 1).unwrap();
        builder.add_row(1.0, INFINITE_BOUND, &[(x, 1.0), (y, 1.0)]).unwrap();
        let model = attach(builder.build().unwrap());
        set_root(&model, vec![1.0, 0.0]);
        let mut heuristic = PartialFixHeuristic::with_model(model, 10).unwrap();

        let mut buffer = vec![5.0; 2];
        let outcome = heuristic.seek_solution(f64::INFINITY, &mut buffer).unwrap();
        assert_eq!(outcome, SeekOutcome::NoSolution);
        assert_eq!(buffer, vec![5.0; 2]);
    }
}
