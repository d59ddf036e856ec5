#![forbid(unsafe_code)]

//! UI-side binding surface: holder traits, type-to-holder mapping, and the
//! snapshot-backed adapter with its self-notify and page-edge side channels.

pub mod adapter;
pub mod holder;
pub mod mapper;

pub use adapter::{DEFAULT_PAGE_EDGE_OFFSET, UnionAdapter};
pub use holder::{NullHolder, UNION_TYPE_NULL, ViewHolder};
pub use mapper::{ChainMapper, HolderMapper, RegistryMapper};
