#![forbid(unsafe_code)]

//! Minimal-diff engine for flat lists, emitting incremental patch ops.
//!
//! [`calculate_diff`] compares two list snapshots through a [`DiffCallback`]
//! and produces a [`DiffResult`]: an ordered sequence of [`ListOp`]s that
//! transforms the old order into the new one. The engine is generic over the
//! callback and knows nothing about what the lists contain.
//!
//! # Incremental patch semantics
//!
//! Each op's positions are relative to the list as already transformed by
//! the ops before it, so a consumer can replay the sequence directly against
//! a mutable view (this is the contract positional UI adapters expect).
//! Adjacent inserts, removals, and compatible changes are batched into
//! single ops with a count.
//!
//! # Invariants
//!
//! 1. Replaying a result against the old order reconstructs the new order
//!    exactly, including the empty cases.
//! 2. Diffing a snapshot against itself yields no ops.
//! 3. With `detect_moves == false` no `Move` op is ever emitted; displaced
//!    items become a removal plus an insertion instead.
//! 4. Items matched by the shortest edit script never move; only items the
//!    script would otherwise remove and re-insert are pair-matched into
//!    `Move` ops (best-effort minimality).

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

mod myers;

/// Opaque per-item change payload, forwarded verbatim to the consumer.
///
/// Two hints are considered the same batch only when they are the same
/// allocation (`Arc::ptr_eq`); change runs with unrelated hints stay
/// separate ops.
pub type ChangeHint = Arc<dyn Any + Send + Sync>;

/// Item identity and content comparison over two list snapshots.
pub trait DiffCallback {
    fn old_size(&self) -> usize;
    fn new_size(&self) -> usize;

    /// Whether the two indices refer to the same logical item.
    fn are_items_the_same(&self, old_index: usize, new_index: usize) -> bool;

    /// Whether the item's visible content is unchanged. Only consulted for
    /// index pairs that already passed [`DiffCallback::are_items_the_same`].
    fn are_contents_the_same(&self, old_index: usize, new_index: usize) -> bool;

    /// Optional payload attached to the `Change` op for this pair.
    fn change_payload(&self, _old_index: usize, _new_index: usize) -> Option<ChangeHint> {
        None
    }
}

/// Consumer side of a replay; see [`DiffResult::dispatch_to`].
pub trait ListUpdateCallback {
    fn on_inserted(&mut self, position: usize, count: usize);
    fn on_removed(&mut self, position: usize, count: usize);
    fn on_moved(&mut self, from: usize, to: usize);
    fn on_changed(&mut self, position: usize, count: usize, hint: Option<&ChangeHint>);
}

/// One incremental patch operation.
#[derive(Clone)]
pub enum ListOp {
    Insert { position: usize, count: usize },
    Remove { position: usize, count: usize },
    /// `from` is a position in the current list; `to` is the item's position
    /// after it has been taken out and re-inserted.
    Move { from: usize, to: usize },
    Change { position: usize, count: usize, hint: Option<ChangeHint> },
}

fn hint_eq(a: &Option<ChangeHint>, b: &Option<ChangeHint>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        _ => false,
    }
}

impl PartialEq for ListOp {
    fn eq(&self, other: &Self) -> bool {
        use ListOp::*;
        match (self, other) {
            (Insert { position: p1, count: c1 }, Insert { position: p2, count: c2 }) => {
                p1 == p2 && c1 == c2
            }
            (Remove { position: p1, count: c1 }, Remove { position: p2, count: c2 }) => {
                p1 == p2 && c1 == c2
            }
            (Move { from: f1, to: t1 }, Move { from: f2, to: t2 }) => f1 == f2 && t1 == t2,
            (
                Change { position: p1, count: c1, hint: h1 },
                Change { position: p2, count: c2, hint: h2 },
            ) => p1 == p2 && c1 == c2 && hint_eq(h1, h2),
            _ => false,
        }
    }
}

impl fmt::Debug for ListOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert { position, count } => {
                write!(f, "Insert {{ position: {position}, count: {count} }}")
            }
            Self::Remove { position, count } => {
                write!(f, "Remove {{ position: {position}, count: {count} }}")
            }
            Self::Move { from, to } => write!(f, "Move {{ from: {from}, to: {to} }}"),
            Self::Change { position, count, hint } => write!(
                f,
                "Change {{ position: {position}, count: {count}, hint: {} }}",
                if hint.is_some() { "Some(..)" } else { "None" }
            ),
        }
    }
}

/// Outcome of [`calculate_diff`]: the op sequence plus the snapshot sizes it
/// was computed for.
#[derive(Debug, Clone)]
pub struct DiffResult {
    old_len: usize,
    new_len: usize,
    ops: SmallVec<[ListOp; 4]>,
}

impl DiffResult {
    /// Length of the old snapshot.
    pub fn old_len(&self) -> usize {
        self.old_len
    }

    /// Length of the new snapshot.
    pub fn new_len(&self) -> usize {
        self.new_len
    }

    /// The op sequence, in replay order.
    pub fn ops(&self) -> &[ListOp] {
        &self.ops
    }

    /// Consume the result, yielding the op sequence.
    pub fn into_ops(self) -> Vec<ListOp> {
        self.ops.into_vec()
    }

    /// Whether the snapshots were identical.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Replay the ops in order against a consumer.
    pub fn dispatch_to(&self, callback: &mut dyn ListUpdateCallback) {
        for op in &self.ops {
            match op {
                ListOp::Insert { position, count } => callback.on_inserted(*position, *count),
                ListOp::Remove { position, count } => callback.on_removed(*position, *count),
                ListOp::Move { from, to } => callback.on_moved(*from, *to),
                ListOp::Change { position, count, hint } => {
                    callback.on_changed(*position, *count, hint.as_ref());
                }
            }
        }
    }
}

#[derive(Clone, Copy)]
struct Matched {
    new_index: usize,
    mover: bool,
}

/// Compute the minimal patch turning the old snapshot into the new one.
///
/// With `detect_moves`, an item that left one position and reappeared at
/// another becomes a single `Move` op; otherwise it is a removal plus an
/// insertion. Move pairing is O(R·I) over the unmatched remainders, so
/// callers with large fully-replaced lists may prefer `detect_moves == false`.
pub fn calculate_diff<C: DiffCallback + ?Sized>(callback: &C, detect_moves: bool) -> DiffResult {
    let old_len = callback.old_size();
    let new_len = callback.new_size();

    // Anchors: pairs matched by the shortest edit script. They keep their
    // relative order and never move.
    let mut old_match: Vec<Option<Matched>> = vec![None; old_len];
    let mut new_match: Vec<Option<usize>> = vec![None; new_len];
    for (i, j) in myers::shortest_edit_pairs(callback) {
        old_match[i] = Some(Matched { new_index: j, mover: false });
        new_match[j] = Some(i);
    }

    // Pair leftover removals against leftover insertions; each pair becomes
    // a mover instead of a remove + insert.
    let mut mover_pairs: Vec<(usize, usize)> = Vec::new();
    if detect_moves {
        for i in (0..old_len).rev() {
            if old_match[i].is_some() {
                continue;
            }
            for j in 0..new_len {
                if new_match[j].is_none() && callback.are_items_the_same(i, j) {
                    old_match[i] = Some(Matched { new_index: j, mover: true });
                    new_match[j] = Some(i);
                    mover_pairs.push((i, j));
                    break;
                }
            }
        }
        // Final positions ascending, for move settling and trailing changes.
        mover_pairs.sort_unstable_by_key(|&(_, j)| j);
    }

    let mut ops: SmallVec<[ListOp; 4]> = SmallVec::new();

    // Removals and anchor changes, walking the old list tail-first so every
    // emitted position is below all positions already touched.
    let mut i = old_len;
    while i > 0 {
        i -= 1;
        match old_match[i] {
            None => {
                let end = i + 1;
                while i > 0 && old_match[i - 1].is_none() {
                    i -= 1;
                }
                ops.push(ListOp::Remove { position: i, count: end - i });
            }
            Some(m) if !m.mover => {
                if callback.are_contents_the_same(i, m.new_index) {
                    continue;
                }
                let hint = callback.change_payload(i, m.new_index);
                let end = i + 1;
                while i > 0 {
                    let Some(prev) = old_match[i - 1] else { break };
                    if prev.mover
                        || callback.are_contents_the_same(i - 1, prev.new_index)
                        || !hint_eq(&hint, &callback.change_payload(i - 1, prev.new_index))
                    {
                        break;
                    }
                    i -= 1;
                }
                ops.push(ListOp::Change { position: i, count: end - i, hint });
            }
            Some(_) => {}
        }
    }

    // Settle movers into place. The work list mirrors what survives the
    // removal pass: anchors (already in final relative order) plus movers.
    if !mover_pairs.is_empty() {
        struct Slot {
            new_index: usize,
            settled: bool,
        }
        let mut work: Vec<Slot> = old_match
            .iter()
            .flatten()
            .map(|m| Slot { new_index: m.new_index, settled: !m.mover })
            .collect();
        for &(_, target) in &mover_pairs {
            let Some(from) = work.iter().position(|s| !s.settled && s.new_index == target)
            else {
                continue;
            };
            work.remove(from);
            let to = work
                .iter()
                .rposition(|s| s.settled && s.new_index < target)
                .map_or(0, |p| p + 1);
            work.insert(to, Slot { new_index: target, settled: true });
            if from != to {
                ops.push(ListOp::Move { from, to });
            }
        }
    }

    // Insertions, walking the new list head-first: once everything before a
    // run is settled, the run's final position is also its current one.
    let mut t = 0;
    while t < new_len {
        if new_match[t].is_some() {
            t += 1;
            continue;
        }
        let start = t;
        while t < new_len && new_match[t].is_none() {
            t += 1;
        }
        ops.push(ListOp::Insert { position: start, count: t - start });
    }

    // Content changes for movers, emitted at their final positions.
    let mut idx = 0;
    while idx < mover_pairs.len() {
        let (oi, nj) = mover_pairs[idx];
        idx += 1;
        if callback.are_contents_the_same(oi, nj) {
            continue;
        }
        let hint = callback.change_payload(oi, nj);
        let mut count = 1;
        while idx < mover_pairs.len() {
            let (noi, nnj) = mover_pairs[idx];
            if nnj != nj + count
                || callback.are_contents_the_same(noi, nnj)
                || !hint_eq(&hint, &callback.change_payload(noi, nnj))
            {
                break;
            }
            count += 1;
            idx += 1;
        }
        ops.push(ListOp::Change { position: nj, count, hint });
    }

    DiffResult { old_len, new_len, ops }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// An item with stable identity and mutable content.
    #[derive(Clone, Copy, PartialEq, Debug)]
    struct Item {
        id: u32,
        version: u32,
    }

    fn item(id: u32) -> Item {
        Item { id, version: 0 }
    }

    struct Snapshots<'a> {
        old: &'a [Item],
        new: &'a [Item],
        hints: Option<&'a dyn Fn(usize, usize) -> Option<ChangeHint>>,
    }

    impl<'a> Snapshots<'a> {
        fn new(old: &'a [Item], new: &'a [Item]) -> Self {
            Self { old, new, hints: None }
        }
    }

    impl DiffCallback for Snapshots<'_> {
        fn old_size(&self) -> usize {
            self.old.len()
        }
        fn new_size(&self) -> usize {
            self.new.len()
        }
        fn are_items_the_same(&self, old_index: usize, new_index: usize) -> bool {
            self.old[old_index].id == self.new[new_index].id
        }
        fn are_contents_the_same(&self, old_index: usize, new_index: usize) -> bool {
            self.old[old_index].version == self.new[new_index].version
        }
        fn change_payload(&self, old_index: usize, new_index: usize) -> Option<ChangeHint> {
            self.hints.and_then(|f| f(old_index, new_index))
        }
    }

    /// Replays ops against the old id order. Inserted slots are filled from
    /// the new snapshot, which is exactly what a positional list consumer
    /// does.
    struct Replay<'a> {
        list: Vec<u32>,
        new: &'a [Item],
        changed: usize,
        moves: usize,
    }

    impl<'a> Replay<'a> {
        fn new(old: &[Item], new: &'a [Item]) -> Self {
            Self {
                list: old.iter().map(|it| it.id).collect(),
                new,
                changed: 0,
                moves: 0,
            }
        }
    }

    impl ListUpdateCallback for Replay<'_> {
        fn on_inserted(&mut self, position: usize, count: usize) {
            let ids = self.new[position..position + count].iter().map(|it| it.id);
            self.list.splice(position..position, ids);
        }
        fn on_removed(&mut self, position: usize, count: usize) {
            self.list.drain(position..position + count);
        }
        fn on_moved(&mut self, from: usize, to: usize) {
            let id = self.list.remove(from);
            self.list.insert(to, id);
            self.moves += 1;
        }
        fn on_changed(&mut self, _position: usize, count: usize, _hint: Option<&ChangeHint>) {
            self.changed += count;
        }
    }

    fn check_replay<'a>(old: &[Item], new: &'a [Item], detect_moves: bool) -> Replay<'a> {
        let result = calculate_diff(&Snapshots::new(old, new), detect_moves);
        let mut replay = Replay::new(old, new);
        result.dispatch_to(&mut replay);
        let want: Vec<u32> = new.iter().map(|it| it.id).collect();
        assert_eq!(replay.list, want, "ops: {:?}", result.ops());
        replay
    }

    #[test]
    fn identical_snapshots_yield_no_ops() {
        let items: Vec<Item> = [1, 2, 3].map(item).into();
        let result = calculate_diff(&Snapshots::new(&items, &items), true);
        assert!(result.is_empty());
    }

    #[test]
    fn empty_to_nonempty_is_one_insert() {
        let new: Vec<Item> = [1, 2, 3].map(item).into();
        let result = calculate_diff(&Snapshots::new(&[], &new), true);
        assert_eq!(result.ops(), [ListOp::Insert { position: 0, count: 3 }]);
        check_replay(&[], &new, true);
    }

    #[test]
    fn nonempty_to_empty_is_one_remove() {
        let old: Vec<Item> = [1, 2, 3].map(item).into();
        let result = calculate_diff(&Snapshots::new(&old, &[]), true);
        assert_eq!(result.ops(), [ListOp::Remove { position: 0, count: 3 }]);
        check_replay(&old, &[], true);
    }

    #[test]
    fn interior_replacement() {
        let old: Vec<Item> = [1, 2, 3].map(item).into();
        let new: Vec<Item> = [1, 4, 3].map(item).into();
        let result = calculate_diff(&Snapshots::new(&old, &new), true);
        assert_eq!(
            result.ops(),
            [
                ListOp::Remove { position: 1, count: 1 },
                ListOp::Insert { position: 1, count: 1 },
            ]
        );
        check_replay(&old, &new, true);
    }

    #[test]
    fn displaced_item_becomes_a_move() {
        let old: Vec<Item> = [1, 2, 3, 4].map(item).into();
        let new: Vec<Item> = [1, 3, 4, 2].map(item).into();
        let result = calculate_diff(&Snapshots::new(&old, &new), true);
        assert_eq!(result.ops(), [ListOp::Move { from: 1, to: 3 }]);
        check_replay(&old, &new, true);
    }

    #[test]
    fn moves_disabled_fall_back_to_remove_insert() {
        let old: Vec<Item> = [1, 2, 3, 4].map(item).into();
        let new: Vec<Item> = [1, 3, 4, 2].map(item).into();
        let result = calculate_diff(&Snapshots::new(&old, &new), false);
        assert_eq!(
            result.ops(),
            [
                ListOp::Remove { position: 1, count: 1 },
                ListOp::Insert { position: 3, count: 1 },
            ]
        );
        check_replay(&old, &new, false);
    }

    #[test]
    fn adjacent_swap() {
        let old: Vec<Item> = [1, 2].map(item).into();
        let new: Vec<Item> = [2, 1].map(item).into();
        let replay = check_replay(&old, &new, true);
        assert_eq!(replay.moves, 1, "a swap is a single move");
    }

    #[test]
    fn content_changes_batch_into_runs() {
        let old: Vec<Item> = [1, 2, 3, 4].map(item).into();
        let mut new = old.clone();
        new[1].version = 1;
        new[2].version = 1;
        let result = calculate_diff(&Snapshots::new(&old, &new), true);
        assert_eq!(
            result.ops(),
            [ListOp::Change { position: 1, count: 2, hint: None }]
        );
    }

    #[test]
    fn distinct_hints_split_change_runs() {
        let old: Vec<Item> = [1, 2].map(item).into();
        let mut new = old.clone();
        new[0].version = 1;
        new[1].version = 1;
        let a: ChangeHint = Arc::new("a");
        let b: ChangeHint = Arc::new("b");
        let hints = {
            let (a, b) = (Arc::clone(&a), Arc::clone(&b));
            move |_oi: usize, ni: usize| Some(Arc::clone(if ni == 0 { &a } else { &b }))
        };
        let mut cb = Snapshots::new(&old, &new);
        cb.hints = Some(&hints);
        let result = calculate_diff(&cb, true);
        assert_eq!(result.ops().len(), 2, "ops: {:?}", result.ops());
    }

    #[test]
    fn shared_hint_merges_change_runs() {
        let old: Vec<Item> = [1, 2].map(item).into();
        let mut new = old.clone();
        new[0].version = 1;
        new[1].version = 1;
        let shared: ChangeHint = Arc::new(7u8);
        let hints = {
            let shared = Arc::clone(&shared);
            move |_oi: usize, _ni: usize| Some(Arc::clone(&shared))
        };
        let mut cb = Snapshots::new(&old, &new);
        cb.hints = Some(&hints);
        let result = calculate_diff(&cb, true);
        assert_eq!(result.ops().len(), 1, "ops: {:?}", result.ops());
    }

    #[test]
    fn moved_item_content_change_lands_at_final_position() {
        let old: Vec<Item> = [1, 2, 3].map(item).into();
        let mut new: Vec<Item> = [2, 3, 1].map(item).into();
        new[2].version = 5;
        let result = calculate_diff(&Snapshots::new(&old, &new), true);
        assert_eq!(
            result.ops(),
            [
                ListOp::Move { from: 0, to: 2 },
                ListOp::Change { position: 2, count: 1, hint: None },
            ]
        );
        check_replay(&old, &new, true);
    }

    fn distinct_ids() -> impl Strategy<Value = Vec<Item>> {
        proptest::collection::vec(0u32..16, 0..12).prop_map(|ids| {
            let mut seen = std::collections::HashSet::new();
            ids.into_iter()
                .filter(|id| seen.insert(*id))
                .map(item)
                .collect()
        })
    }

    // Small id range on purpose: repeated identities are the norm here.
    fn repeating_ids() -> impl Strategy<Value = Vec<Item>> {
        proptest::collection::vec(0u32..6, 0..12)
            .prop_map(|ids| ids.into_iter().map(item).collect())
    }

    proptest! {
        #[test]
        fn replay_reconstructs_new_order(old in distinct_ids(), new in distinct_ids()) {
            check_replay(&old, &new, true);
        }

        #[test]
        fn replay_without_moves(old in distinct_ids(), new in distinct_ids()) {
            let replay = check_replay(&old, &new, false);
            prop_assert_eq!(replay.moves, 0, "Move emitted with detection off");
        }

        #[test]
        fn self_diff_is_empty(old in distinct_ids()) {
            let result = calculate_diff(&Snapshots::new(&old, &old), true);
            prop_assert!(result.is_empty());
        }

        /// Identity need not be unique: the matcher and the move pairing
        /// only ever consume one counterpart per index.
        #[test]
        fn replay_reconstructs_with_repeated_identities(
            old in repeating_ids(),
            new in repeating_ids(),
        ) {
            check_replay(&old, &new, true);
            check_replay(&old, &new, false);
        }
    }
}
