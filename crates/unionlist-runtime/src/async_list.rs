#![forbid(unsafe_code)]

//! Async transaction queue and snapshot publisher over a [`GroupList`].
//!
//! Mutations are committed as [`Transaction`]s and applied on one background
//! drain worker. Each drain swaps out the whole pending queue, applies every
//! transaction to a working copy of the last-published snapshot, diffs the
//! two flattened orders, and posts a single publish task to the
//! [`UiDispatcher`]. Readers only ever see the published [`GroupList`]
//! through an `arc-swap` pointer, so [`AsyncGroupList::snapshot`] never
//! blocks and never observes a half-applied batch.
//!
//! # Invariants
//!
//! 1. **Single flight**: at most one diff is ever in progress; the worker
//!    blocks until the UI context confirms the previous snapshot swap.
//! 2. **Happens-before**: the snapshot pointer is swapped before any sink
//!    callback runs, so a sink reading [`ListReader::snapshot`] from inside
//!    a callback always sees the data the ops describe.
//! 3. **Net-result batching**: transactions queued while a publish is in
//!    flight are merged into one drain; the sink sees only the net diff.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | UI context never runs the publish task | Worker waits, logging every `stall_log_interval` |
//! | Commit while a publish is in flight | Queued; merged into the next drain |
//! | Owner dropped mid-wait | Worker observes the shutdown flag and exits |

use std::mem;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use unionlist_core::{GroupList, UnionItem};
use unionlist_diff::{DiffCallback, ListUpdateCallback, calculate_diff};

use crate::dispatcher::{UiDispatcher, UiTask};

/// Tuning knobs for [`AsyncGroupList`].
#[derive(Debug, Clone)]
pub struct AsyncListConfig {
    /// How often the worker logs while waiting for an unconfirmed publish.
    pub stall_log_interval: Duration,
}

impl Default for AsyncListConfig {
    fn default() -> Self {
        Self { stall_log_interval: Duration::from_secs(1) }
    }
}

type Action = Box<dyn FnOnce(&mut GroupList) + Send>;
type BatchHook = Box<dyn FnOnce() + Send>;
type SharedSink = Arc<Mutex<dyn ListUpdateCallback + Send>>;

struct TxPayload {
    actions: Vec<Action>,
    detect_moves: bool,
    forbid_moves: bool,
    batch_start: Vec<BatchHook>,
    batch_end: Vec<BatchHook>,
}

struct State {
    queue: Vec<TxPayload>,
    shutdown: bool,
}

struct Shared {
    published: ArcSwap<GroupList>,
    state: Mutex<State>,
    /// Signals the worker: new work or shutdown.
    work: Condvar,
    /// Signals the worker: the UI context stored the candidate snapshot.
    swapped: Condvar,
}

fn lock_state(shared: &Shared) -> std::sync::MutexGuard<'_, State> {
    shared.state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Cloneable non-blocking read handle onto the published snapshot.
#[derive(Clone)]
pub struct ListReader {
    shared: Arc<Shared>,
}

impl ListReader {
    /// The last-published snapshot. Never blocks.
    pub fn snapshot(&self) -> Arc<GroupList> {
        self.shared.published.load_full()
    }
}

/// Owner handle: commits transactions, publishes snapshots, joins the
/// worker on drop.
pub struct AsyncGroupList {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl AsyncGroupList {
    /// Spawn the drain worker with default configuration.
    pub fn new<S>(sink: S, dispatcher: Arc<dyn UiDispatcher>) -> Self
    where
        S: ListUpdateCallback + Send + 'static,
    {
        Self::with_config(sink, dispatcher, AsyncListConfig::default())
    }

    /// Spawn the drain worker.
    pub fn with_config<S>(
        sink: S,
        dispatcher: Arc<dyn UiDispatcher>,
        config: AsyncListConfig,
    ) -> Self
    where
        S: ListUpdateCallback + Send + 'static,
    {
        let shared = Arc::new(Shared {
            published: ArcSwap::from_pointee(GroupList::new()),
            state: Mutex::new(State { queue: Vec::new(), shutdown: false }),
            work: Condvar::new(),
            swapped: Condvar::new(),
        });
        let sink: SharedSink = Arc::new(Mutex::new(sink));
        let worker = {
            let shared = Arc::clone(&shared);
            std::thread::spawn(move || drain_loop(shared, sink, dispatcher, config))
        };
        Self { shared, worker: Some(worker) }
    }

    /// The last-published snapshot. Never blocks, never exposes an
    /// in-flight working copy.
    pub fn snapshot(&self) -> Arc<GroupList> {
        self.shared.published.load_full()
    }

    /// A cloneable read handle that outlives borrows of `self`.
    pub fn reader(&self) -> ListReader {
        ListReader { shared: Arc::clone(&self.shared) }
    }

    /// Start a transaction. Nothing is queued until
    /// [`Transaction::commit`].
    pub fn begin(&self) -> Transaction<'_> {
        Transaction {
            list: self,
            payload: TxPayload {
                actions: Vec::new(),
                detect_moves: false,
                forbid_moves: false,
                batch_start: Vec::new(),
                batch_end: Vec::new(),
            },
        }
    }
}

impl Drop for AsyncGroupList {
    fn drop(&mut self) {
        lock_state(&self.shared).shutdown = true;
        self.shared.work.notify_all();
        self.shared.swapped.notify_all();
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            tracing::error!("drain worker panicked");
        }
    }
}

/// A batch of mutations applied atomically in one drain.
///
/// Consuming builder: every method takes `self` by value and `commit`
/// finishes the transaction, so committing twice does not compile.
#[must_use = "a transaction does nothing until committed"]
pub struct Transaction<'a> {
    list: &'a AsyncGroupList,
    payload: TxPayload,
}

impl Transaction<'_> {
    /// Queue a mutation of the working copy.
    pub fn push(mut self, action: impl FnOnce(&mut GroupList) + Send + 'static) -> Self {
        self.payload.actions.push(Box::new(action));
        self
    }

    /// Request move detection for the diff of the drain this transaction
    /// lands in. Defaults to off.
    pub fn detect_moves(mut self, detect: bool) -> Self {
        self.payload.detect_moves = detect;
        self
    }

    /// Veto move detection for the whole drain, overriding any merged
    /// transaction that requested it.
    pub fn forbid_moves(mut self, forbid: bool) -> Self {
        self.payload.forbid_moves = forbid;
        self
    }

    /// Run in the UI context before the snapshot swap of this batch.
    pub fn on_batch_start(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.payload.batch_start.push(Box::new(hook));
        self
    }

    /// Run in the UI context after the ops have been replayed to the sink.
    pub fn on_batch_end(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.payload.batch_end.push(Box::new(hook));
        self
    }

    /// Queue the transaction for the drain worker. Never blocks.
    pub fn commit(self) {
        let shared = &self.list.shared;
        lock_state(shared).queue.push(self.payload);
        shared.work.notify_all();
    }
}

/// Identity/content comparison between two flattened snapshots.
struct SnapshotDiff<'a> {
    old: &'a [UnionItem],
    new: &'a [UnionItem],
}

impl DiffCallback for SnapshotDiff<'_> {
    fn old_size(&self) -> usize {
        self.old.len()
    }
    fn new_size(&self) -> usize {
        self.new.len()
    }
    fn are_items_the_same(&self, old_index: usize, new_index: usize) -> bool {
        self.old[old_index].is_same_item(&self.new[new_index])
    }
    fn are_contents_the_same(&self, old_index: usize, new_index: usize) -> bool {
        self.old[old_index].is_same_content(&self.new[new_index])
    }
}

fn drain_loop(
    shared: Arc<Shared>,
    sink: SharedSink,
    dispatcher: Arc<dyn UiDispatcher>,
    config: AsyncListConfig,
) {
    loop {
        // Swap out the whole queue; commits arriving after this point land
        // in the next drain.
        let batch = {
            let mut state = lock_state(&shared);
            loop {
                if !state.queue.is_empty() {
                    break mem::take(&mut state.queue);
                }
                if state.shutdown {
                    return;
                }
                state = shared
                    .work
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        };

        let old = shared.published.load_full();
        let mut working = (*old).clone();
        let mut detect = false;
        let mut forbid = false;
        let mut batch_start = Vec::new();
        let mut batch_end = Vec::new();
        for tx in batch {
            detect |= tx.detect_moves;
            forbid |= tx.forbid_moves;
            for action in tx.actions {
                action(&mut working);
            }
            batch_start.extend(tx.batch_start);
            batch_end.extend(tx.batch_end);
        }

        let old_flat = old.to_vec();
        let new_flat = working.to_vec();
        let result = calculate_diff(
            &SnapshotDiff { old: &old_flat, new: &new_flat },
            detect && !forbid,
        );
        tracing::debug!(
            old_len = old_flat.len(),
            new_len = new_flat.len(),
            ops = result.ops().len(),
            "drained transaction batch"
        );

        let candidate = Arc::new(working);
        let task: UiTask = Box::new({
            let shared = Arc::clone(&shared);
            let sink = Arc::clone(&sink);
            let candidate = Arc::clone(&candidate);
            move || {
                for hook in batch_start {
                    hook();
                }
                shared.published.store(Arc::clone(&candidate));
                // Empty critical section: a worker between its pointer check
                // and its wait holds this lock, so the notify cannot be lost.
                drop(lock_state(&shared));
                shared.swapped.notify_all();
                {
                    let mut sink = sink.lock().unwrap_or_else(PoisonError::into_inner);
                    result.dispatch_to(&mut *sink);
                }
                for hook in batch_end {
                    hook();
                }
            }
        });
        dispatcher.post(task);

        // Single flight: hold the next drain until the UI context confirms
        // the swap by storing our candidate.
        let posted_at = Instant::now();
        let mut state = lock_state(&shared);
        while !Arc::ptr_eq(&shared.published.load_full(), &candidate) {
            if state.shutdown {
                return;
            }
            let (guard, timeout) = shared
                .swapped
                .wait_timeout(state, config.stall_log_interval)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;
            if timeout.timed_out() {
                tracing::warn!(
                    waiting_ms = posted_at.elapsed().as_millis() as u64,
                    "publish swap not observed; ui dispatcher stalled?"
                );
            }
        }
    }
}
