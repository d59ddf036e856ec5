#![forbid(unsafe_code)]

//! Holder surface: the per-slot binding target the host renders into.

use unionlist_core::{UnionItem, UnionType};

/// Sentinel union type: "no renderable type". Out-of-range positions report
/// it, and holders that cannot judge their own type return it from
/// [`ViewHolder::best_union_type`].
pub const UNION_TYPE_NULL: UnionType = -1;

/// One bound slot. The host owns the visual side; the adapter only calls
/// [`ViewHolder::bind`] with the current position and item.
pub trait ViewHolder {
    fn bind(&mut self, position: usize, item: &UnionItem);

    /// The union type this holder would rather render, when it can tell.
    /// A non-null answer differing from the rendered type asks the adapter
    /// to re-render the position.
    fn best_union_type(&self) -> UnionType {
        UNION_TYPE_NULL
    }
}

/// No-op sentinel holder, bound wherever no mapping exists.
#[derive(Debug, Default)]
pub struct NullHolder;

impl ViewHolder for NullHolder {
    fn bind(&mut self, _position: usize, _item: &UnionItem) {}
}
