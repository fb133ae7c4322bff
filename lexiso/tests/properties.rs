//! Properties that must hold for every tree pair, checked over generated
//! expressions drawn from a small vocabulary so that pairs overlap often.

use lexiso::{
    ConceptRef, Draft, ExpressionBuilder, ExpressionTree, MatchSolution, Merge, SolverConfig,
    Strategy, build_merge, cross_validate,
};
use proptest::prelude::*;
use proptest::strategy::Strategy as _;

// =============================================================================
// Generators
// =============================================================================

/// An operand below the top `And`, before it is numbered.
#[derive(Debug, Clone)]
enum Operand {
    Concept(u8),
    Role(u8, Box<Operand>),
    And(Vec<Operand>),
}

impl Operand {
    fn add(&self, b: &mut ExpressionBuilder) -> Draft {
        match self {
            Operand::Concept(concept) => b.concept(id(*concept)),
            Operand::Role(role, filler) => {
                let filler = filler.add(b);
                b.some_role(id(*role), filler).unwrap()
            }
            Operand::And(operands) => {
                let operands: Vec<Draft> = operands.iter().map(|o| o.add(b)).collect();
                b.and(operands).unwrap()
            }
        }
    }
}

fn id(n: u8) -> ConceptRef {
    ConceptRef::from_u128(u128::from(n))
}

/// Four concepts and three roles, nested at most two levels deep.
fn operand_strategy() -> impl proptest::strategy::Strategy<Value = Operand> {
    let leaf = (10u8..14).prop_map(Operand::Concept);
    leaf.prop_recursive(2, 16, 3, |inner| {
        prop_oneof![
            (1u8..4, inner.clone()).prop_map(|(role, filler)| Operand::Role(role, Box::new(filler))),
            prop::collection::vec(inner, 1..=3).prop_map(Operand::And),
        ]
    })
}

prop_compose! {
    /// `Root > Set > And[...]` with up to five operands.
    fn definition(necessary: bool)
        (operands in prop::collection::vec(operand_strategy(), 1..=5))
        -> ExpressionTree
    {
        let mut b = ExpressionBuilder::new();
        let operands: Vec<Draft> = operands.iter().map(|o| o.add(&mut b)).collect();
        let and = b.and(operands).unwrap();
        let set = if necessary {
            b.necessary_set(and).unwrap()
        } else {
            b.sufficient_set(and).unwrap()
        };
        let root = b.root(set).unwrap();
        b.build(root).unwrap()
    }
}

prop_compose! {
    /// A reference and a comparison, mostly with the same set kind so the
    /// frames can match.
    fn definition_pair()
        (same in prop::bool::weighted(0.75))
        (reference in definition(true), comparison in definition(same))
        -> (ExpressionTree, ExpressionTree)
    {
        (reference, comparison)
    }
}

// =============================================================================
// Checks
// =============================================================================

fn check_symmetric(solution: &MatchSolution) -> Result<(), TestCaseError> {
    for (r, c) in solution.reference_to_comparison().iter().enumerate() {
        if let Some(c) = *c {
            prop_assert_eq!(solution.reference_for(c), Some(r));
        }
    }
    for (c, r) in solution.comparison_to_reference().iter().enumerate() {
        if let Some(r) = *r {
            prop_assert_eq!(solution.comparison_for(r), Some(c));
        }
    }
    Ok(())
}

/// Every node is either paired or inside exactly one changed subtree, and
/// lands in the merged tree exactly once.
fn check_complete(
    reference: &ExpressionTree,
    comparison: &ExpressionTree,
    solution: &MatchSolution,
    merge: &Merge,
) -> Result<(), TestCaseError> {
    let mut deleted = vec![0; reference.len()];
    for subtree in &merge.deletions {
        for &r in &subtree.nodes {
            deleted[r] += 1;
        }
    }
    for r in 0..reference.len() {
        let matched = usize::from(solution.is_reference_matched(r));
        prop_assert_eq!(matched + deleted[r], 1, "reference node {}", r);
    }

    let mut added = vec![0; comparison.len()];
    for subtree in &merge.additions {
        for &c in &subtree.nodes {
            added[c] += 1;
        }
    }
    for c in 0..comparison.len() {
        let matched = usize::from(solution.is_comparison_matched(c));
        prop_assert_eq!(matched + added[c], 1, "comparison node {}", c);
        prop_assert!(merge.merged.find_comparison(c).is_some(), "comparison node {}", c);
    }

    // moved or not, a pair is emitted once
    for &(r, c) in solution.pairs() {
        prop_assert_eq!(merge.merged.find_reference(r), merge.merged.find_comparison(c));
    }
    Ok(())
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn identity(tree in definition(true)) {
        lexiso_testhelpers::setup();
        let config = SolverConfig::default();
        for strategy in Strategy::ALL {
            let solution = strategy.solver(config.clone()).solve(&tree, &tree);
            for i in 0..tree.len() {
                prop_assert_eq!(solution.comparison_for(i), Some(i), "{}", strategy);
            }
            let merge = build_merge(&tree, &tree, &solution).unwrap();
            prop_assert!(merge.is_unchanged());
            prop_assert!(merge.merged.to_expression_tree().unwrap().structurally_equal(&tree));
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn solvers_agree_and_merges_are_complete((reference, comparison) in definition_pair()) {
        lexiso_testhelpers::setup();
        let v = cross_validate(&reference, &comparison, &SolverConfig::default());
        prop_assert!(v.scores_agree());
        prop_assert!(v.leaf_pairs_agree(&reference));

        for solution in [&v.bottom_up, &v.path_hash] {
            prop_assert!(solution.is_consistent(&reference, &comparison));
            check_symmetric(solution)?;

            let merge = build_merge(&reference, &comparison, solution).unwrap();
            check_complete(&reference, &comparison, solution, &merge)?;
            prop_assert!(
                merge
                    .merged
                    .current_view()
                    .unwrap()
                    .structurally_equal(&comparison)
            );
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Folding a merge back into one tree and comparing it again finds the
    /// whole comparison inside it. Moved content leaves holes in the folded
    /// tree, so only merges without moves are folded.
    #[test]
    fn re_merging_adds_nothing((reference, comparison) in definition_pair()) {
        lexiso_testhelpers::setup();
        let config = SolverConfig::default();
        for strategy in Strategy::ALL {
            let solver = strategy.solver(config.clone());
            let solution = solver.solve(&reference, &comparison);
            if !solution.moved(&reference, &comparison).is_empty() {
                continue;
            }
            let merge = build_merge(&reference, &comparison, &solution).unwrap();

            let folded = merge.merged.to_expression_tree().unwrap();
            let again = solver.solve(&folded, &comparison);
            let remerge = build_merge(&folded, &comparison, &again).unwrap();
            prop_assert!(remerge.additions.is_empty(), "{}: {:?}", strategy, remerge);
            prop_assert_eq!(again.score(), comparison.len());
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(150))]

    #[test]
    fn greedy_assignment_keeps_solvers_in_step((reference, comparison) in definition_pair()) {
        lexiso_testhelpers::setup();
        let config = SolverConfig {
            exact_assignment_limit: 0,
            ..SolverConfig::default()
        };
        let v = cross_validate(&reference, &comparison, &config);
        prop_assert!(v.agrees(&reference));
        prop_assert!(v.bottom_up.is_consistent(&reference, &comparison));
    }
}
