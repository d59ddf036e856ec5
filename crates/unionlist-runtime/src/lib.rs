#![forbid(unsafe_code)]

//! Asynchronous pipeline between list mutations and a UI-side consumer.
//!
//! Couples a background drain worker (transaction queue, working-copy
//! mutation, diff) to a UI-context publisher (snapshot swap, op replay).
//! See [`AsyncGroupList`] for the pipeline and [`UiDispatcher`] for the
//! host-loop integration seam.

pub mod async_list;
pub mod dispatcher;

pub use async_list::{AsyncGroupList, AsyncListConfig, ListReader, Transaction};
pub use dispatcher::{ChannelDispatcher, UiDispatcher, UiTask, UiTaskPump};
