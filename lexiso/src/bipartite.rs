//! Sibling matching.
//!
//! Two problems show up whenever `And` operands are compared:
//! - equality needs a *perfect* matching between two operand lists under a
//!   yes/no relation ([`perfect_matching`], Kuhn's augmenting paths);
//! - alignment needs a *maximum weight* assignment where each candidate pair
//!   carries the size of its best alignment ([`assign`]).
//!
//! Both solvers call [`assign`] with the same grid for the same node pair,
//! which is what keeps their results in agreement. Every tie is broken by
//! position, never by hash or map order.

use core::cmp::Reverse;

/// Hard cap on the bitmask width of the exact assignment.
const MAX_EXACT_COLUMNS: usize = 16;

/// Find a perfect matching between `left` and `right` items under
/// `adjacent`. Returns, for each left item, the right item it is matched to.
pub(crate) fn perfect_matching(
    left: usize,
    right: usize,
    adjacent: impl Fn(usize, usize) -> bool,
) -> Option<Vec<usize>> {
    if left != right {
        return None;
    }
    let edges: Vec<Vec<usize>> = (0..left)
        .map(|i| (0..right).filter(|&j| adjacent(i, j)).collect())
        .collect();

    let mut owner: Vec<Option<usize>> = vec![None; right];
    for i in 0..left {
        let mut seen = vec![false; right];
        if !augment(i, &edges, &mut owner, &mut seen) {
            return None;
        }
    }

    let mut matched = vec![0; left];
    for (j, i) in owner.iter().enumerate() {
        if let Some(i) = *i {
            matched[i] = j;
        }
    }
    Some(matched)
}

fn augment(
    i: usize,
    edges: &[Vec<usize>],
    owner: &mut [Option<usize>],
    seen: &mut [bool],
) -> bool {
    for &j in &edges[i] {
        if seen[j] {
            continue;
        }
        seen[j] = true;
        let free = match owner[j] {
            None => true,
            Some(other) => augment(other, edges, owner, seen),
        };
        if free {
            owner[j] = Some(i);
            return true;
        }
    }
    false
}

/// Candidate weights between reference siblings (rows) and comparison
/// siblings (columns).
#[derive(Debug, Clone)]
pub(crate) struct WeightGrid {
    rows: usize,
    cols: usize,
    weights: Vec<u32>,
    identical: Vec<bool>,
}

impl WeightGrid {
    pub(crate) fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            weights: vec![0; rows * cols],
            identical: vec![false; rows * cols],
        }
    }

    /// Record the alignment weight of `(row, col)`, and whether the two
    /// subtrees are structurally identical.
    pub(crate) fn set(&mut self, row: usize, col: usize, weight: u32, identical: bool) {
        self.weights[row * self.cols + col] = weight;
        self.identical[row * self.cols + col] = identical;
    }

    pub(crate) fn weight(&self, row: usize, col: usize) -> u32 {
        self.weights[row * self.cols + col]
    }

    pub(crate) fn identical(&self, row: usize, col: usize) -> bool {
        self.identical[row * self.cols + col]
    }
}

/// The chosen sibling pairs and their total weight.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Assignment {
    /// `(row, col)` pairs, ascending by row.
    pub(crate) pairs: Vec<(usize, usize)>,
    pub(crate) weight: u32,
}

/// Assign rows to columns.
///
/// 1. Identical subtrees first: each row, in order, takes the first unused
///    column holding an identical subtree.
/// 2. The rest by maximum total weight: exactly when at most `exact_limit`
///    columns remain in play, greedily (heaviest pair first) otherwise.
///
/// Pairs of weight zero are never chosen.
pub(crate) fn assign(grid: &WeightGrid, exact_limit: usize) -> Assignment {
    let mut pairs = Vec::new();
    let mut weight = 0;
    let mut row_used = vec![false; grid.rows];
    let mut col_used = vec![false; grid.cols];

    for row in 0..grid.rows {
        let col = (0..grid.cols).find(|&col| !col_used[col] && grid.identical(row, col));
        if let Some(col) = col {
            pairs.push((row, col));
            weight += grid.weight(row, col);
            row_used[row] = true;
            col_used[col] = true;
        }
    }

    let cols: Vec<usize> = (0..grid.cols)
        .filter(|&col| !col_used[col])
        .filter(|&col| (0..grid.rows).any(|row| !row_used[row] && grid.weight(row, col) > 0))
        .collect();
    let rows: Vec<usize> = (0..grid.rows)
        .filter(|&row| !row_used[row])
        .filter(|&row| cols.iter().any(|&col| grid.weight(row, col) > 0))
        .collect();

    if !rows.is_empty() {
        let rest = if cols.len() <= exact_limit.min(MAX_EXACT_COLUMNS) {
            assign_exact(grid, &rows, &cols)
        } else {
            assign_greedy(grid, &rows, &cols)
        };
        weight += rest.iter().map(|&(r, c)| grid.weight(r, c)).sum::<u32>();
        pairs.extend(rest);
    }

    pairs.sort_unstable();
    Assignment { pairs, weight }
}

/// Maximum weight assignment by dynamic programming over the set of used
/// columns. Among optimal assignments, earlier rows take earlier columns.
fn assign_exact(grid: &WeightGrid, rows: &[usize], cols: &[usize]) -> Vec<(usize, usize)> {
    let width = 1usize << cols.len();
    // best[i * width + mask]: best weight for rows[i..] with `mask` columns taken
    let mut best = vec![0u32; (rows.len() + 1) * width];
    for i in (0..rows.len()).rev() {
        for mask in 0..width {
            let mut value = best[(i + 1) * width + mask];
            for (bit, &col) in cols.iter().enumerate() {
                let w = grid.weight(rows[i], col);
                if w > 0 && mask & (1 << bit) == 0 {
                    value = value.max(w + best[(i + 1) * width + (mask | (1 << bit))]);
                }
            }
            best[i * width + mask] = value;
        }
    }

    let mut pairs = Vec::new();
    let mut mask = 0usize;
    for (i, &row) in rows.iter().enumerate() {
        let target = best[i * width + mask];
        for (bit, &col) in cols.iter().enumerate() {
            let w = grid.weight(row, col);
            if w > 0
                && mask & (1 << bit) == 0
                && w + best[(i + 1) * width + (mask | (1 << bit))] == target
            {
                pairs.push((row, col));
                mask |= 1 << bit;
                break;
            }
        }
    }
    pairs
}

fn assign_greedy(grid: &WeightGrid, rows: &[usize], cols: &[usize]) -> Vec<(usize, usize)> {
    let mut candidates: Vec<(Reverse<u32>, usize, usize)> = rows
        .iter()
        .flat_map(|&row| cols.iter().map(move |&col| (row, col)))
        .filter_map(|(row, col)| {
            let w = grid.weight(row, col);
            (w > 0).then_some((Reverse(w), row, col))
        })
        .collect();
    candidates.sort_unstable();

    let mut row_used = vec![false; grid.rows];
    let mut col_used = vec![false; grid.cols];
    let mut pairs = Vec::new();
    for (_, row, col) in candidates {
        if !row_used[row] && !col_used[col] {
            row_used[row] = true;
            col_used[col] = true;
            pairs.push((row, col));
        }
    }
    pairs
}
