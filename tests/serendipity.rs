mod common;

#[cfg(test)]
mod tests {
    use super::common::*;
    use generic_heuristics::model::problem::{Problem, ProblemBuilder, INFINITE_BOUND};
    use generic_heuristics::{Heuristic, NodeState, SeekOutcome, SerendipityHeuristic};
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn greedy_picks_the_shared_column() {
        let model = attach(covering());
        let mut heuristic = SerendipityHeuristic::with_model(model);

        let mut buffer = vec![0.0; 3];
        let outcome = heuristic.seek_solution(f64::INFINITY, &mut buffer).unwrap();
        assert_eq!(outcome, SeekOutcome::Improved { objective: 1.0 });
        assert_eq!(buffer, vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn columns_at_one_stay_fixed() {
        let model = attach(covering());
        set_root(&model, vec![1.0, 0.0, 0.0]);
        let mut heuristic = SerendipityHeuristic::with_model(model);

        let mut buffer = vec![0.0; 3];
        let outcome = heuristic.seek_solution(f64::INFINITY, &mut buffer).unwrap();
        assert_eq!(outcome, SeekOutcome::Improved { objective: 2.0 });
        assert_eq!(buffer, vec![1.0, 1.0, 0.0]);
    }

    #[test]
    fn solver_solution_is_taken_first() {
        let model = attach(covering());
        let problem = model.problem();
        let mut node = NodeState::root(&problem, vec![0.0; 3], 0.0);
        node.solver_solution = Some((4.0, vec![1.0, 1.0, 1.0]));
        model.set_node(node);
        let mut heuristic = SerendipityHeuristic::with_model(model);

        let mut buffer = vec![0.0; 3];
        let outcome = heuristic.seek_solution(f64::INFINITY, &mut buffer).unwrap();
        assert_eq!(outcome, SeekOutcome::Improved { objective: 4.0 });
        assert_eq!(buffer, vec![1.0, 1.0, 1.0]);

        // not good enough, construction takes over
        let outcome = heuristic.seek_solution(3.0, &mut buffer).unwrap();
        assert_eq!(outcome, SeekOutcome::Improved { objective: 1.0 });
    }

    #[test]
    fn uncoverable_row_gives_nothing() {
        let model = attach(covering());
        let problem = model.problem();
        let mut node = NodeState::root(&problem, vec![0.0; 3], 0.0);
        // x1 and x2 are fixed to zero, first row cannot be covered
        node.upper[0] = 0.0;
        node.upper[1] = 0.0;
        model.set_node(node);
        let mut heuristic = SerendipityHeuristic::with_model(model);

        let mut buffer = vec![5.0; 3];
        let outcome = heuristic.seek_solution(f64::INFINITY, &mut buffer).unwrap();
        assert_eq!(outcome, SeekOutcome::NoSolution);
        assert_eq!(buffer, vec![5.0; 3]);
    }

    #[test]
    fn non_covering_models_are_skipped() {
        let mut builder = ProblemBuilder::new();
        let x = builder.add_binary(1.0);
        let y = builder.add_binary(1.0);
        builder.add_row(1.0, 1.0, &[(x, 1.0), (y, 1.0)]).unwrap();
        let model = attach(builder.build().unwrap());
        let mut heuristic = SerendipityHeuristic::with_model(model);

        let mut buffer = vec![0.0; 2];
        assert_eq!(heuristic.seek_solution(f64::INFINITY, &mut buffer).unwrap(), SeekOutcome::NoSolution);
    }

    #[test]
    fn no_integers_no_write() {
        let model = attach(continuous_only());
        let mut heuristic = SerendipityHeuristic::with_model(model);
        let mut buffer = vec![2.0; 2];
        assert_eq!(heuristic.seek_solution(f64::INFINITY, &mut buffer).unwrap(), SeekOutcome::NoSolution);
        assert_eq!(buffer, vec![2.0; 2]);
    }

    fn random_covering(rng: &mut ChaCha8Rng) -> Problem {
        let mut builder = ProblemBuilder::new();
        let cols: Vec<usize> = (0..12).map(|_| builder.add_binary(rng.gen_range(1.0..5.0))).collect();
        for _ in 0..8 {
            let entries: Vec<(usize, f64)> = cols.iter().filter(|_| rng.gen_bool(0.3)).map(|&c| (c, 1.0)).collect();
            builder.add_row(rng.gen_range(1..3) as f64, INFINITE_BOUND, &entries).unwrap();
        }
        builder.build().unwrap()
    }

    #[test]
    fn result_always_covers_every_row() {
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        for _ in 0..50 {
            let problem = random_covering(&mut rng);
            let model = attach(problem);
            let mut heuristic = SerendipityHeuristic::with_model(model.clone());

            let mut buffer = vec![0.0; 12];
            if let SeekOutcome::Improved { .. } = heuristic.seek_solution(f64::INFINITY, &mut buffer).unwrap() {
                let problem = model.problem();
                let activities = problem.matrix().activities(&buffer);
                assert!((0..problem.num_rows()).all(|r| activities[r] >= problem.row_lower()[r]));
            }
        }
    }
}
