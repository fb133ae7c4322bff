//! Solver and merge benchmarks on definitions with a growing number of role
//! groups, where the comparison renames every third filler.

use divan::{Bencher, black_box};
use lexiso::{
    BottomUpSolver, ConceptRef, ExpressionBuilder, ExpressionTree, PathHashSolver, Solver,
    SolverConfig, build_merge, cross_validate,
};

fn main() {
    divan::main();
}

/// `Root > NecessarySet > And[Some(role, And[filler, filler + 1])...]`
fn definition(groups: u128, shift: u128) -> ExpressionTree {
    let mut b = ExpressionBuilder::new();
    let mut operands = vec![b.concept(ConceptRef::from_u128(1))];
    for g in 0..groups {
        let renamed = if g % 3 == 0 { shift } else { 0 };
        let first = b.concept(ConceptRef::from_u128(1000 + g + renamed));
        let second = b.concept(ConceptRef::from_u128(2000 + g));
        let filler = b.and([first, second]).unwrap();
        operands.push(b.some_role(ConceptRef::from_u128(100 + g % 4), filler).unwrap());
    }
    let and = b.and(operands).unwrap();
    let set = b.necessary_set(and).unwrap();
    let root = b.root(set).unwrap();
    b.build(root).unwrap()
}

fn pair(groups: u128) -> (ExpressionTree, ExpressionTree) {
    (definition(groups, 0), definition(groups, 500))
}

#[divan::bench(args = [4, 8, 11, 24])]
fn bottom_up(bencher: Bencher, groups: u128) {
    let (reference, comparison) = pair(groups);
    let solver = BottomUpSolver::default();
    bencher.bench(|| solver.solve(black_box(&reference), black_box(&comparison)));
}

#[divan::bench(args = [4, 8, 11, 24])]
fn path_hash(bencher: Bencher, groups: u128) {
    let (reference, comparison) = pair(groups);
    let solver = PathHashSolver::default();
    bencher.bench(|| solver.solve(black_box(&reference), black_box(&comparison)));
}

#[divan::bench(args = [4, 8, 11, 24])]
fn cross_validated(bencher: Bencher, groups: u128) {
    let (reference, comparison) = pair(groups);
    let config = SolverConfig::default();
    bencher.bench(|| cross_validate(black_box(&reference), black_box(&comparison), &config));
}

#[divan::bench(args = [8, 24])]
fn merge(bencher: Bencher, groups: u128) {
    let (reference, comparison) = pair(groups);
    let solution = BottomUpSolver::default().solve(&reference, &comparison);
    bencher.bench(|| build_merge(black_box(&reference), black_box(&comparison), &solution));
}
