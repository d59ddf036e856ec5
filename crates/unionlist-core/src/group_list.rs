#![forbid(unsafe_code)]

//! Two-level ordered collection: integer-keyed groups of [`UnionItem`]s.
//!
//! Groups are iterated in ascending key order; the global linear position of
//! an item is the sum of the sizes of all lower-keyed groups plus its local
//! offset. Keys need not be contiguous. A present-but-empty group is distinct
//! from an absent one: clearing a group keeps its key, removing a group
//! deletes it.
//!
//! # Invariants
//!
//! 1. **Position arithmetic**: for every present `(g, local)`,
//!    `group_and_position(group_position_start(g) + local) == Some((g, local))`.
//! 2. **Not-applicable, not fatal**: out-of-range positions, empty inputs
//!    and absent groups yield `None`; the collection is left untouched.
//! 3. **Type-guarded moves**: [`GroupList::move_item`] never places an item
//!    at a position whose renderer slot expects a different union type — a
//!    failed move returns `None` with no mutation.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | Position out of range | `None`, no mutation |
//! | Insert into absent group at offset > 0 | `None` (group is not created) |
//! | Remove range overflowing the tail | Clamped to the available length |
//! | Move with incompatible union types | `None`, both groups unchanged |

use std::collections::BTreeMap;

use crate::item::UnionItem;

/// A contiguous range of global positions affected by a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListRange {
    /// First affected global position.
    pub start: usize,
    /// Number of affected positions.
    pub count: usize,
}

impl ListRange {
    /// Construct a range.
    pub fn new(start: usize, count: usize) -> Self {
        Self { start, count }
    }
}

/// Ordered mapping from integer group key to an ordered sequence of items.
///
/// Cloning produces a snapshot: per-group vectors are copied, payload
/// allocations are shared.
#[derive(Clone, Default)]
pub struct GroupList {
    groups: BTreeMap<i32, Vec<UnionItem>>,
}

impl GroupList {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------
    // Position arithmetic
    // -----------------------------------------------------------------

    /// Number of items in `group`; 0 when the group is absent.
    pub fn group_items_size(&self, group: i32) -> usize {
        self.groups.get(&group).map_or(0, Vec::len)
    }

    /// Global position of the first slot of `group`.
    ///
    /// Defined even for an absent group: the position it would occupy.
    pub fn group_position_start(&self, group: i32) -> usize {
        self.groups.range(..group).map(|(_, items)| items.len()).sum()
    }

    /// Translate a global position into `(group, position_in_group)`.
    pub fn group_and_position(&self, position: usize) -> Option<(i32, usize)> {
        let mut base = 0;
        for (&key, items) in &self.groups {
            if position < base + items.len() {
                return Some((key, position - base));
            }
            base += items.len();
        }
        None
    }

    /// Total number of items across all groups.
    pub fn item_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    /// Whether the collection holds no items (empty groups may remain).
    pub fn is_empty(&self) -> bool {
        self.groups.values().all(Vec::is_empty)
    }

    // -----------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------

    /// Item at a global position.
    pub fn item(&self, position: usize) -> Option<&UnionItem> {
        let (group, local) = self.group_and_position(position)?;
        self.group_item(group, local)
    }

    /// Item at a position within a group.
    pub fn group_item(&self, group: i32, position_in_group: usize) -> Option<&UnionItem> {
        self.groups.get(&group)?.get(position_in_group)
    }

    /// All items of a group, in order; `None` when the group is absent.
    pub fn group_items(&self, group: i32) -> Option<&[UnionItem]> {
        self.groups.get(&group).map(Vec::as_slice)
    }

    /// Present group keys in ascending order.
    pub fn group_keys(&self) -> impl Iterator<Item = i32> + '_ {
        self.groups.keys().copied()
    }

    /// All items in global order.
    pub fn iter(&self) -> impl Iterator<Item = &UnionItem> {
        self.groups.values().flatten()
    }

    /// Flatten the collection into a vector in global order.
    pub fn to_vec(&self) -> Vec<UnionItem> {
        self.iter().cloned().collect()
    }

    // -----------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------

    /// Insert items into `group` at a local position.
    ///
    /// An absent group is created only when `position_in_group == 0`;
    /// inserting at a non-zero offset into a nonexistent group fails. For a
    /// present group the offset is clamped into `[0, len]`. Returns the
    /// inserted global range, or `None` for empty input.
    pub fn insert_group_items(
        &mut self,
        group: i32,
        position_in_group: usize,
        items: Vec<UnionItem>,
    ) -> Option<ListRange> {
        if items.is_empty() {
            return None;
        }
        let count = items.len();
        let base = self.group_position_start(group);
        match self.groups.get_mut(&group) {
            None => {
                if position_in_group != 0 {
                    return None;
                }
                self.groups.insert(group, items);
                Some(ListRange::new(base, count))
            }
            Some(existing) => {
                let at = position_in_group.min(existing.len());
                existing.splice(at..at, items);
                Some(ListRange::new(base + at, count))
            }
        }
    }

    /// Append items to the end of `group`, creating it when absent.
    pub fn append_group_items(&mut self, group: i32, items: Vec<UnionItem>) -> Option<ListRange> {
        if items.is_empty() {
            return None;
        }
        let count = items.len();
        let start = self.group_position_start(group) + self.group_items_size(group);
        self.groups.entry(group).or_default().extend(items);
        Some(ListRange::new(start, count))
    }

    /// Replace the entire contents of `group`, creating it when absent.
    pub fn set_group_items(&mut self, group: i32, items: Vec<UnionItem>) {
        self.groups.insert(group, items);
    }

    /// Replace a single item in place; `None` when the slot does not exist.
    pub fn update_group_item(
        &mut self,
        group: i32,
        position_in_group: usize,
        item: UnionItem,
    ) -> Option<ListRange> {
        let start = self.group_position_start(group) + position_in_group;
        let slot = self.groups.get_mut(&group)?.get_mut(position_in_group)?;
        *slot = item;
        Some(ListRange::new(start, 1))
    }

    /// Remove one item from a group, returning it.
    pub fn remove_group_item(
        &mut self,
        group: i32,
        position_in_group: usize,
    ) -> Option<UnionItem> {
        let items = self.groups.get_mut(&group)?;
        if position_in_group >= items.len() {
            return None;
        }
        Some(items.remove(position_in_group))
    }

    /// Remove a range of items from a group.
    ///
    /// A range overflowing the group's tail is clamped to the available
    /// length. `None` when the start is out of bounds, the count is zero, or
    /// the group is absent.
    pub fn remove_group_items(
        &mut self,
        group: i32,
        position_in_group: usize,
        count: usize,
    ) -> Option<ListRange> {
        if count == 0 {
            return None;
        }
        let start = self.group_position_start(group) + position_in_group;
        let items = self.groups.get_mut(&group)?;
        if position_in_group >= items.len() {
            return None;
        }
        let count = count.min(items.len() - position_in_group);
        items.drain(position_in_group..position_in_group + count);
        Some(ListRange::new(start, count))
    }

    /// Remove the item at a global position, returning it.
    pub fn remove_item(&mut self, position: usize) -> Option<UnionItem> {
        let (group, local) = self.group_and_position(position)?;
        self.remove_group_item(group, local)
    }

    /// Remove a contiguous run of items around a global position.
    ///
    /// The run expands in both directions from `position` while `filter`
    /// holds on the neighboring items, never crossing the group boundary.
    /// `None` when the position is out of range or the filter rejects the
    /// item at `position` itself.
    pub fn remove_items<F>(&mut self, position: usize, filter: F) -> Option<ListRange>
    where
        F: Fn(&UnionItem) -> bool,
    {
        let (group, local) = self.group_and_position(position)?;
        let items = self.groups.get(&group)?;
        if !filter(&items[local]) {
            return None;
        }
        let mut start = local;
        while start > 0 && filter(&items[start - 1]) {
            start -= 1;
        }
        let mut end = local;
        while end + 1 < items.len() && filter(&items[end + 1]) {
            end += 1;
        }
        let count = end - start + 1;
        let global_start = self.group_position_start(group) + start;
        self.groups.get_mut(&group)?.drain(start..=end);
        Some(ListRange::new(global_start, count))
    }

    /// Move the item at `from` so its final global position is `to`.
    ///
    /// The move is allowed only when the union type of the moving item
    /// matches the type currently rendered at `to`, or failing that, the
    /// type at the slot adjacent to `to` in the direction away from `from`
    /// (`to + 1` when moving forward, `to - 1` when moving backward). The
    /// item is spliced into the matched slot's group so renderers never see
    /// a union type they cannot handle. Returns `(from, to)` on success;
    /// `None` leaves both groups untouched.
    pub fn move_item(&mut self, from: usize, to: usize) -> Option<(usize, usize)> {
        if from == to {
            return None;
        }
        let total = self.item_count();
        if from >= total || to >= total {
            return None;
        }
        let moving_type = self.item(from)?.union_type();
        let forward = to > from;

        // Direct type match at the destination, otherwise probe the slot
        // adjacent to `to` in the direction away from `from`.
        let (anchor, insert_after) = if self.item(to)?.union_type() == moving_type {
            (to, forward)
        } else {
            let neighbor = if forward { to + 1 } else { to.checked_sub(1)? };
            if neighbor >= total || self.item(neighbor)?.union_type() != moving_type {
                return None;
            }
            (neighbor, !forward)
        };

        let (src_group, src_local) = self.group_and_position(from)?;
        let (dst_group, mut dst_local) = self.group_and_position(anchor)?;
        let item = self.groups.get_mut(&src_group)?.remove(src_local);
        if dst_group == src_group && dst_local > src_local {
            dst_local -= 1;
        }
        let at = if insert_after { dst_local + 1 } else { dst_local };
        // The destination group still exists: the anchor item remains in it.
        self.groups.entry(dst_group).or_default().insert(at, item);
        Some((from, to))
    }

    /// Empty a group but retain its key.
    pub fn clear_group_items(&mut self, group: i32) -> Option<ListRange> {
        let start = self.group_position_start(group);
        let items = self.groups.get_mut(&group)?;
        if items.is_empty() {
            return None;
        }
        let count = items.len();
        items.clear();
        Some(ListRange::new(start, count))
    }

    /// Delete a group and its key entirely.
    ///
    /// `None` only when the group is absent. Deleting a present-but-empty
    /// group is still a mutation (the key disappears), so it succeeds with
    /// a zero-count range.
    pub fn remove_group(&mut self, group: i32) -> Option<ListRange> {
        let start = self.group_position_start(group);
        let items = self.groups.remove(&group)?;
        Some(ListRange::new(start, items.len()))
    }

    /// Empty every group, retaining all keys.
    pub fn clear_all_group_items(&mut self) {
        for items in self.groups.values_mut() {
            items.clear();
        }
    }

    /// Delete all groups and items.
    pub fn remove_all(&mut self) {
        self.groups.clear();
    }
}

impl std::fmt::Debug for GroupList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (key, items) in &self.groups {
            map.entry(key, &items.len());
        }
        map.finish()
    }
}
