#![forbid(unsafe_code)]

//! Facade over the unionlist crates: grouped union-typed list data, a
//! minimal-diff engine, an async publish pipeline, and the UI-side binding
//! adapter.
//!
//! Pull in everything at once through [`prelude`], or reach into the
//! re-exported member crates ([`core`], [`diff`], [`runtime`], [`adapter`])
//! for the full module paths.

pub use unionlist_adapter as adapter;
pub use unionlist_core as core;
pub use unionlist_diff as diff;
pub use unionlist_runtime as runtime;

pub use unionlist_adapter::{
    ChainMapper, HolderMapper, NullHolder, RegistryMapper, UNION_TYPE_NULL, UnionAdapter,
    ViewHolder,
};
pub use unionlist_core::{
    DeepCompare, GroupList, ItemPayload, ListRange, UnionItem, UnionType,
};
pub use unionlist_diff::{
    ChangeHint, DiffCallback, DiffResult, ListOp, ListUpdateCallback, calculate_diff,
};
pub use unionlist_runtime::{
    AsyncGroupList, AsyncListConfig, ChannelDispatcher, ListReader, Transaction, UiDispatcher,
    UiTask, UiTaskPump,
};

/// The working set most hosts need.
pub mod prelude {
    pub use unionlist_adapter::{
        HolderMapper, RegistryMapper, UNION_TYPE_NULL, UnionAdapter, ViewHolder,
    };
    pub use unionlist_core::{GroupList, ItemPayload, UnionItem, UnionType};
    pub use unionlist_diff::{ListOp, ListUpdateCallback};
    pub use unionlist_runtime::{
        AsyncGroupList, ChannelDispatcher, UiDispatcher, UiTaskPump,
    };
}
