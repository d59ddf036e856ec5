#![forbid(unsafe_code)]

//! Core data model for unionlist: union-typed item records and the
//! two-level grouped collection they live in.
//!
//! A [`UnionItem`] pairs a small integer *union type* (selecting which
//! renderer applies) with an opaque payload. A [`GroupList`] keeps items in
//! integer-keyed groups, iterated in ascending key order, and translates
//! between global list positions and `(group, position-in-group)` pairs.
//!
//! Mutations always happen on a private working copy; once a `GroupList` is
//! handed off as a snapshot it is treated as immutable (see
//! `unionlist-runtime`).

pub mod group_list;
pub mod item;

pub use group_list::{GroupList, ListRange};
pub use item::{DeepCompare, ItemPayload, UnionItem, UnionType};
