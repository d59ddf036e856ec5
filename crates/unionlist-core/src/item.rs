#![forbid(unsafe_code)]

//! Union-typed item records and the deep-comparison capability.
//!
//! # Invariants
//!
//! 1. **Stable tag**: an item's union type changes only through
//!    [`UnionItem::update`], which replaces tag and payload together.
//! 2. **Identity vs content**: [`UnionItem::is_same_item`] answers "is this
//!    the same logical entity", [`UnionItem::is_same_content`] answers "does
//!    it render identically". Content equality implies nothing about
//!    identity and vice versa.
//! 3. **Asymmetric fallback**: without a [`DeepCompare`] capability on the
//!    payload, identity falls back to reference equality of the payload
//!    allocation, while content comparison is **always `false`**. A payload
//!    that cannot prove itself unchanged is treated as changed, so such
//!    items re-render on every publish rather than risk stale content.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | Union types differ | Both comparisons return `false` |
//! | No `DeepCompare` on either payload | Identity = reference equality, content = `false` |
//! | `DeepCompare` on one side only | That side's capability decides |

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Integer tag selecting which renderer/view-kind an item uses.
pub type UnionType = i32;

/// Optional deep-comparison capability for item payloads.
///
/// Payload types implement this to take part in identity and content
/// comparison during diffing. The `other` argument is the raw payload of the
/// opposing item; implementations are expected to downcast and return
/// `false` on a type mismatch.
pub trait DeepCompare {
    /// Whether `other` is the same logical entity as `self`.
    fn is_same_item(&self, other: &dyn Any) -> bool;

    /// Whether `other` renders identically to `self`.
    fn is_same_content(&self, other: &dyn Any) -> bool;
}

/// Application data carried by a [`UnionItem`].
///
/// The payload is type-erased; [`ItemPayload::deep_compare`] is the
/// duck-typed hook through which a payload opts into deep comparison.
pub trait ItemPayload: Any + Send + Sync {
    /// The payload as `&dyn Any`, for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// The deep-comparison capability, when the payload supports it.
    fn deep_compare(&self) -> Option<&dyn DeepCompare> {
        None
    }
}

/// An immutable-by-convention record pairing a union type with a payload.
///
/// Cloning is cheap: the payload is shared behind an [`Arc`]. Snapshots of a
/// [`GroupList`](crate::GroupList) therefore share payload allocations.
#[derive(Clone)]
pub struct UnionItem {
    union_type: UnionType,
    payload: Arc<dyn ItemPayload>,
}

impl UnionItem {
    /// Create an item from an already-shared payload.
    pub fn new(union_type: UnionType, payload: Arc<dyn ItemPayload>) -> Self {
        Self {
            union_type,
            payload,
        }
    }

    /// Create an item, wrapping `payload` in an [`Arc`].
    pub fn of<T: ItemPayload>(union_type: UnionType, payload: T) -> Self {
        Self::new(union_type, Arc::new(payload))
    }

    /// The item's union type.
    pub fn union_type(&self) -> UnionType {
        self.union_type
    }

    /// The item's payload.
    pub fn payload(&self) -> &Arc<dyn ItemPayload> {
        &self.payload
    }

    /// Downcast the payload to a concrete type.
    pub fn payload_as<T: Any>(&self) -> Option<&T> {
        self.payload.as_any().downcast_ref::<T>()
    }

    /// Replace tag and payload together.
    ///
    /// This is the only sanctioned in-place mutation of an item.
    pub fn update(&mut self, union_type: UnionType, payload: Arc<dyn ItemPayload>) {
        self.union_type = union_type;
        self.payload = payload;
    }

    /// Identity comparison: same union type and same logical entity.
    ///
    /// Delegates to [`DeepCompare::is_same_item`] when either payload
    /// carries the capability (self first, then other); otherwise falls back
    /// to reference equality of the payload allocations.
    pub fn is_same_item(&self, other: &UnionItem) -> bool {
        if self.union_type != other.union_type {
            return false;
        }
        if let Some(deep) = self.payload.deep_compare() {
            return deep.is_same_item(other.payload.as_any());
        }
        if let Some(deep) = other.payload.deep_compare() {
            return deep.is_same_item(self.payload.as_any());
        }
        payload_ptr_eq(&self.payload, &other.payload)
    }

    /// Content comparison: same union type and identical rendered content.
    ///
    /// Delegates to [`DeepCompare::is_same_content`] when either payload
    /// carries the capability; otherwise returns `false` — a payload without
    /// the capability is always considered changed.
    pub fn is_same_content(&self, other: &UnionItem) -> bool {
        if self.union_type != other.union_type {
            return false;
        }
        if let Some(deep) = self.payload.deep_compare() {
            return deep.is_same_content(other.payload.as_any());
        }
        if let Some(deep) = other.payload.deep_compare() {
            return deep.is_same_content(self.payload.as_any());
        }
        false
    }
}

impl fmt::Debug for UnionItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnionItem")
            .field("union_type", &self.union_type)
            .finish_non_exhaustive()
    }
}

/// Reference equality of two payload allocations.
///
/// Compares data pointers only, so two `Arc`s to the same allocation compare
/// equal regardless of vtable identity.
fn payload_ptr_eq(a: &Arc<dyn ItemPayload>, b: &Arc<dyn ItemPayload>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
