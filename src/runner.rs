//! Bounded, order-preserving worker pool for batch operations
//!
//! Operations are I/O-bound API calls with no shared mutable state, so
//! a small fixed pool of threads pulling indices from a shared cursor
//! is enough. Results land in per-index slots, which keeps the output
//! ordered like the input regardless of completion order.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use tracing::debug;

use crate::sync::SyncOutcome;

/// Run `op` once per item on `min(pool_limit, items.len())` workers.
///
/// Blocks until every item has been processed. One item's failure or
/// panic never affects another item's slot; a panicking operation is
/// recorded as a `Failed` outcome. An empty work list returns an empty
/// result without spawning any threads.
pub fn run<T, F>(pool_limit: usize, op: F, items: &[T]) -> Vec<SyncOutcome>
where
    T: Sync,
    F: Fn(&T) -> SyncOutcome + Sync,
{
    if items.is_empty() {
        return Vec::new();
    }

    let workers = pool_limit.min(items.len()).max(1);
    debug!(workers, items = items.len(), "starting batch");

    let cursor = AtomicUsize::new(0);
    let slots: Vec<OnceLock<SyncOutcome>> = (0..items.len()).map(|_| OnceLock::new()).collect();

    thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| {
                loop {
                    let idx = cursor.fetch_add(1, Ordering::Relaxed);
                    let Some(item) = items.get(idx) else { break };
                    let outcome =
                        catch_unwind(AssertUnwindSafe(|| op(item))).unwrap_or_else(|_| {
                            SyncOutcome::Failed {
                                item: format!("work item #{idx}"),
                                error: "operation panicked".to_string(),
                            }
                        });
                    let _ = slots[idx].set(outcome);
                }
            });
        }
    });

    slots
        .into_iter()
        .enumerate()
        .map(|(idx, slot)| {
            slot.into_inner().unwrap_or_else(|| SyncOutcome::Failed {
                item: format!("work item #{idx}"),
                error: "worker produced no result".to_string(),
            })
        })
        .collect()
}
