#![forbid(unsafe_code)]

//! Shortest-edit-script matching (Myers' greedy algorithm).
//!
//! Runs the forward O((N+M)·D) variant over the `are_items_the_same`
//! relation, snapshotting the furthest-reaching frontier per depth so the
//! edit path can be backtracked exactly. The output is the set of matched
//! `(old_index, new_index)` pairs along the path's diagonals, ascending in
//! both coordinates; everything outside it is a removal or an insertion.

use crate::DiffCallback;

/// Matched index pairs of a minimal edit script between the two lists.
pub(crate) fn shortest_edit_pairs<C: DiffCallback + ?Sized>(cb: &C) -> Vec<(usize, usize)> {
    let n = cb.old_size() as isize;
    let m = cb.new_size() as isize;
    let max = n + m;
    if max == 0 {
        return Vec::new();
    }

    // v[k + max] = furthest x reached on diagonal k at the current depth.
    let offset = max;
    let mut v = vec![0isize; (2 * max + 1) as usize];
    let mut trace: Vec<Vec<isize>> = Vec::new();

    'search: for d in 0..=max {
        // Frontier entering depth d, needed by the backtracker.
        trace.push(v.clone());
        let mut k = -d;
        while k <= d {
            let idx = (k + offset) as usize;
            let mut x = if k == -d || (k != d && v[idx - 1] < v[idx + 1]) {
                v[idx + 1]
            } else {
                v[idx - 1] + 1
            };
            let mut y = x - k;
            while x < n && y < m && cb.are_items_the_same(x as usize, y as usize) {
                x += 1;
                y += 1;
            }
            v[idx] = x;
            if x >= n && y >= m {
                break 'search;
            }
            k += 2;
        }
    }

    // Walk the path back from (n, m), collecting diagonal steps.
    let mut pairs = Vec::new();
    let mut x = n;
    let mut y = m;
    for (d, v) in trace.iter().enumerate().rev() {
        let d = d as isize;
        let k = x - y;
        let idx = (k + offset) as usize;
        let prev_k = if k == -d || (k != d && v[idx - 1] < v[idx + 1]) {
            k + 1
        } else {
            k - 1
        };
        let prev_x = v[(prev_k + offset) as usize];
        let prev_y = prev_x - prev_k;
        while x > prev_x && y > prev_y {
            pairs.push(((x - 1) as usize, (y - 1) as usize));
            x -= 1;
            y -= 1;
        }
        if d > 0 {
            x = prev_x;
            y = prev_y;
        }
    }
    pairs.reverse();
    pairs
}
