#![forbid(unsafe_code)]

//! Position-to-holder binding against a published snapshot.
//!
//! The adapter is the UI-side consumer of the pipeline: it renders whatever
//! snapshot was last handed to it and never reaches into unpublished state.
//! Two side channels ride along with binding:
//!
//! - **Self-notify**: a bound holder can report (via
//!   [`ViewHolder::best_union_type`]) that the rendered union type no longer
//!   fits its item; the adapter queues the position and the host drains the
//!   queue as batched `Change` notifications with
//!   [`UnionAdapter::flush_self_notify`]. Repeated reports for one position
//!   collapse into a single notification.
//! - **Page edges**: optional callbacks fired when binding happens within a
//!   configurable offset of either end of the list, the usual trigger for
//!   loading the previous/next page.

use std::sync::Arc;

use smallvec::SmallVec;
use unionlist_core::{GroupList, UnionItem, UnionType};
use unionlist_diff::ListUpdateCallback;

use crate::holder::{NullHolder, UNION_TYPE_NULL, ViewHolder};
use crate::mapper::HolderMapper;

/// Bind positions within this distance of either list end fire the page
/// callbacks.
pub const DEFAULT_PAGE_EDGE_OFFSET: usize = 5;

type PageListener = Box<dyn FnMut()>;

struct PageEdge {
    offset: usize,
    listener: PageListener,
}

/// Snapshot-backed binding surface.
///
/// `create_holder` panics when no mapper was installed; everything else
/// degrades to sentinels (`UNION_TYPE_NULL`, [`NullHolder`]) or no-ops.
#[derive(Default)]
pub struct UnionAdapter {
    mapper: Option<Box<dyn HolderMapper>>,
    snapshot: Arc<GroupList>,
    // Deduplicated positions awaiting a self-notify flush.
    self_notify: SmallVec<[usize; 4]>,
    load_prev: Option<PageEdge>,
    load_next: Option<PageEdge>,
}

impl UnionAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the holder mapper. Required before `create_holder`.
    pub fn set_mapper(&mut self, mapper: impl HolderMapper + 'static) {
        self.mapper = Some(Box::new(mapper));
    }

    /// Adopt a published snapshot as the rendered state.
    pub fn set_snapshot(&mut self, snapshot: Arc<GroupList>) {
        self.snapshot = snapshot;
    }

    /// The snapshot currently rendered.
    pub fn snapshot(&self) -> &Arc<GroupList> {
        &self.snapshot
    }

    pub fn item_count(&self) -> usize {
        self.snapshot.item_count()
    }

    /// Union type rendered at a position; [`UNION_TYPE_NULL`] out of range.
    pub fn view_type_at(&self, position: usize) -> UnionType {
        self.snapshot
            .item(position)
            .map_or(UNION_TYPE_NULL, UnionItem::union_type)
    }

    /// Create a holder for a view type, falling back to [`NullHolder`] for
    /// unmapped types (the null sentinel included).
    ///
    /// # Panics
    ///
    /// When no mapper was installed; registering the mapper is part of the
    /// adapter's construction contract.
    pub fn create_holder(&self, view_type: UnionType) -> Box<dyn ViewHolder> {
        let Some(mapper) = &self.mapper else {
            panic!("no holder mapper installed");
        };
        match mapper.map(view_type) {
            Some(holder) => holder,
            None => {
                if view_type != UNION_TYPE_NULL {
                    tracing::debug!(view_type, "no holder mapping; using null holder");
                }
                Box::new(NullHolder)
            }
        }
    }

    /// Bind a holder to a position, running the side channels.
    ///
    /// Out-of-range positions are a no-op; the host may race a stale
    /// position against a fresh snapshot.
    pub fn bind_holder(&mut self, holder: &mut dyn ViewHolder, position: usize) {
        let count = self.snapshot.item_count();
        let Some(item) = self.snapshot.item(position) else {
            return;
        };
        holder.bind(position, item);

        let best = holder.best_union_type();
        let rendered = item.union_type();
        if best != UNION_TYPE_NULL && rendered != UNION_TYPE_NULL && best != rendered {
            self.queue_self_notify(position, rendered, best);
        }

        if let Some(edge) = &mut self.load_prev
            && position < edge.offset
        {
            (edge.listener)();
        }
        if let Some(edge) = &mut self.load_next
            && position + edge.offset >= count
        {
            (edge.listener)();
        }
    }

    /// Fire `listener` when binding within [`DEFAULT_PAGE_EDGE_OFFSET`] of
    /// the list head.
    pub fn on_load_prev_page(&mut self, listener: impl FnMut() + 'static) {
        self.on_load_prev_page_with_offset(DEFAULT_PAGE_EDGE_OFFSET, listener);
    }

    pub fn on_load_prev_page_with_offset(
        &mut self,
        offset: usize,
        listener: impl FnMut() + 'static,
    ) {
        self.load_prev = Some(PageEdge { offset, listener: Box::new(listener) });
    }

    /// Fire `listener` when binding within [`DEFAULT_PAGE_EDGE_OFFSET`] of
    /// the list tail.
    pub fn on_load_next_page(&mut self, listener: impl FnMut() + 'static) {
        self.on_load_next_page_with_offset(DEFAULT_PAGE_EDGE_OFFSET, listener);
    }

    pub fn on_load_next_page_with_offset(
        &mut self,
        offset: usize,
        listener: impl FnMut() + 'static,
    ) {
        self.load_next = Some(PageEdge { offset, listener: Box::new(listener) });
    }

    fn queue_self_notify(&mut self, position: usize, rendered: UnionType, best: UnionType) {
        match self.self_notify.binary_search(&position) {
            Ok(_) => {}
            Err(at) => {
                tracing::debug!(position, rendered, best, "holder type mismatch; queueing re-render");
                self.self_notify.insert(at, position);
            }
        }
    }

    /// Whether any position awaits a self-notify flush.
    pub fn has_pending_self_notify(&self) -> bool {
        !self.self_notify.is_empty()
    }

    /// Drain queued self-notify positions as batched `Change` runs.
    pub fn flush_self_notify(&mut self, sink: &mut dyn ListUpdateCallback) {
        let pending = std::mem::take(&mut self.self_notify);
        let mut idx = 0;
        while idx < pending.len() {
            let start = pending[idx];
            let mut count = 1;
            while idx + 1 < pending.len() && pending[idx + 1] == start + count {
                count += 1;
                idx += 1;
            }
            sink.on_changed(start, count, None);
            idx += 1;
        }
    }
}
