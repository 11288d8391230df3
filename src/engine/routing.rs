//! Routing Context
//!
//! Ambient routing key selecting which internal store the current unit of
//! work targets. A unit of work is a scope opened by [`unit_of_work`],
//! [`routed`] or [`unit_of_work_blocking`]. Outside any scope, a plain thread
//! that is not running inside a tokio runtime is its own unit of work.
//!
//! Runtime worker threads are shared by many tasks, so a task that has not
//! opened a scope can read the default key but cannot bind one.
//!
//! Scoped units start unbound and lose their binding when the scope ends,
//! whether the work completes, fails or is dropped. A [`RoutingGuard`] clears
//! exactly the binding it created when dropped.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tracing::{trace, warn};

use crate::engine::error::{EngineError, EngineResult};

/// Key returned when nothing is bound.
pub const DEFAULT_ROUTING_KEY: &str = "master";

struct Binding {
    token: u64,
    key: String,
}

type Slot = Arc<Mutex<Option<Binding>>>;

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

tokio::task_local! {
    static TASK_ROUTE: Slot;
}

thread_local! {
    static THREAD_ROUTE: Slot = Arc::new(Mutex::new(None));
}

fn next_token() -> u64 {
    NEXT_TOKEN.fetch_add(1, Ordering::Relaxed)
}

fn new_slot(key: Option<String>) -> Slot {
    let binding = key.map(|key| Binding {
        token: next_token(),
        key,
    });
    Arc::new(Mutex::new(binding))
}

fn lock(slot: &Slot) -> MutexGuard<'_, Option<Binding>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

fn bound_key(slot: &Slot) -> Option<String> {
    let binding = lock(slot);
    binding.as_ref().map(|b| b.key.clone())
}

/// Slot of the calling unit of work; `None` for an unscoped runtime task.
fn active_slot() -> Option<Slot> {
    if let Ok(slot) = TASK_ROUTE.try_with(Arc::clone) {
        return Some(slot);
    }
    if Handle::try_current().is_ok() {
        return None;
    }
    Some(THREAD_ROUTE.with(Arc::clone))
}

/// Runs `work` as a unit of work with its own, initially unbound, routing key.
pub async fn unit_of_work<F: Future>(work: F) -> F::Output {
    TASK_ROUTE.scope(new_slot(None), work).await
}

/// Runs `work` as a unit of work bound to `key` for its whole duration.
pub async fn routed<F: Future>(key: impl Into<String>, work: F) -> F::Output {
    let key = key.into();
    trace!(routing_key = %key, "Entering routed unit of work");
    TASK_ROUTE.scope(new_slot(Some(key)), work).await
}

/// Synchronous counterpart of [`unit_of_work`].
pub fn unit_of_work_blocking<R>(work: impl FnOnce() -> R) -> R {
    TASK_ROUTE.sync_scope(new_slot(None), work)
}

/// Clears the binding it was created for when dropped.
///
/// The guard stays on the thread that created it, so it cannot be held
/// across an `.await` in a spawned task.
#[must_use = "the routing key is cleared as soon as the guard is dropped"]
pub struct RoutingGuard {
    slot: Slot,
    token: u64,
    _not_send: PhantomData<*const ()>,
}

impl Drop for RoutingGuard {
    fn drop(&mut self) {
        let mut binding = lock(&self.slot);
        // a later set_routing_key owns the slot now
        if binding.as_ref().is_some_and(|b| b.token == self.token) {
            if let Some(cleared) = binding.take() {
                trace!(routing_key = %cleared.key, "Routing guard released");
            }
        }
    }
}

impl std::fmt::Debug for RoutingGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutingGuard")
            .field("token", &self.token)
            .finish()
    }
}

/// Binds `key` to the calling unit of work, replacing any previous binding.
///
/// Fails with `NoRoutingScope` for a runtime task that has not opened a
/// scope, since binding would leak into other tasks on the same worker.
pub fn set_routing_key(key: impl Into<String>) -> EngineResult<RoutingGuard> {
    let slot = active_slot().ok_or(EngineError::NoRoutingScope)?;
    let key = key.into();
    let token = next_token();

    trace!(routing_key = %key, "Binding routing key");
    *lock(&slot) = Some(Binding { token, key });

    Ok(RoutingGuard {
        slot,
        token,
        _not_send: PhantomData,
    })
}

/// Returns the key bound to the calling unit of work, or [`DEFAULT_ROUTING_KEY`].
pub fn routing_key() -> String {
    active_slot()
        .and_then(|slot| bound_key(&slot))
        .unwrap_or_else(|| DEFAULT_ROUTING_KEY.to_string())
}

/// Unbinds the key of the calling unit of work. Does nothing when unbound.
pub fn clear_routing_key() {
    if let Some(slot) = active_slot() {
        if let Some(binding) = lock(&slot).take() {
            trace!(routing_key = %binding.key, "Cleared routing key");
        }
    }
}

/// Whether the calling unit of work has an explicit binding.
pub fn is_bound() -> bool {
    active_slot().is_some_and(|slot| bound_key(&slot).is_some())
}

/// Fails if a non-default key is still bound, which means an earlier unit
/// of work on this execution context never cleared its key.
pub fn ensure_unbound() -> EngineResult<()> {
    let leaked = active_slot()
        .and_then(|slot| bound_key(&slot))
        .filter(|key| key != DEFAULT_ROUTING_KEY);

    match leaked {
        Some(key) => {
            warn!(routing_key = %key, "Routing key leaked into a new unit of work");
            Err(EngineError::RoutingKeyLeak { key })
        }
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn unbound_key_defaults_to_master() {
        unit_of_work(async {
            assert!(!is_bound());
            assert_eq!(routing_key(), DEFAULT_ROUTING_KEY);
        })
        .await;
    }

    #[tokio::test]
    async fn clear_restores_the_default() {
        unit_of_work(async {
            let _guard = set_routing_key("reporting").expect("inside a scope");
            assert_eq!(routing_key(), "reporting");

            clear_routing_key();
            assert_eq!(routing_key(), "master");
            assert!(!is_bound());
        })
        .await;
    }

    #[tokio::test]
    async fn guard_clears_on_drop() {
        unit_of_work(async {
            {
                let _guard = set_routing_key("archive").expect("inside a scope");
                assert_eq!(routing_key(), "archive");
            }
            assert_eq!(routing_key(), "master");
        })
        .await;
    }

    #[tokio::test]
    async fn routed_scope_ends_even_on_failure() {
        let result: Result<(), &str> = routed("reporting", async {
            assert_eq!(routing_key(), "reporting");
            Err("boom")
        })
        .await;

        assert!(result.is_err());
        unit_of_work(async {
            assert_eq!(routing_key(), "master");
        })
        .await;
        assert!(!is_bound());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_units_of_work_are_isolated() {
        let mut handles = Vec::new();
        for key in ["reporting", "archive", "analytics", "master"] {
            handles.push(tokio::spawn(routed(key, async move {
                for _ in 0..50 {
                    assert_eq!(routing_key(), key);
                    tokio::time::sleep(Duration::from_millis(1)).await;
                }
                key
            })));
        }

        for handle in handles {
            let key = handle.await.expect("task panicked");
            assert!(!key.is_empty());
        }
    }

    #[tokio::test]
    async fn nested_tasks_start_unbound() {
        routed("reporting", async {
            let inner = tokio::spawn(unit_of_work(async { routing_key() }))
                .await
                .expect("task panicked");
            assert_eq!(inner, "master");
            assert_eq!(routing_key(), "reporting");
        })
        .await;
    }

    #[tokio::test]
    async fn unscoped_task_cannot_bind_the_worker_thread() {
        let err = set_routing_key("reporting").expect_err("no scope is open");
        assert!(matches!(err, EngineError::NoRoutingScope));
        assert!(!is_bound());

        let scoped = unit_of_work(async {
            let _guard = set_routing_key("reporting").expect("inside a scope");
            tokio::task::yield_now().await;
            routing_key()
        });
        let unscoped = async {
            tokio::task::yield_now().await;
            routing_key()
        };

        let (scoped, unscoped) = tokio::join!(scoped, unscoped);
        assert_eq!(scoped, "reporting");
        assert_eq!(unscoped, "master");
    }

    #[tokio::test]
    async fn guard_clears_the_scope_it_was_created_in() {
        unit_of_work(async {
            let guard = set_routing_key("archive").expect("inside a scope");

            let inner = routed("reporting", async move {
                drop(guard);
                routing_key()
            })
            .await;

            assert_eq!(inner, "reporting");
            assert_eq!(routing_key(), "master");
        })
        .await;
    }

    #[tokio::test]
    async fn stale_guard_keeps_the_newer_binding() {
        unit_of_work(async {
            let first = set_routing_key("archive").expect("inside a scope");
            let _second = set_routing_key("reporting").expect("inside a scope");

            drop(first);
            assert_eq!(routing_key(), "reporting");
        })
        .await;
    }

    #[test]
    fn threads_are_isolated() {
        let handles: Vec<_> = ["reporting", "archive"]
            .into_iter()
            .map(|key| {
                std::thread::spawn(move || {
                    assert_eq!(routing_key(), "master");
                    let _guard = set_routing_key(key).expect("plain thread");
                    for _ in 0..50 {
                        assert_eq!(routing_key(), key);
                        std::thread::yield_now();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("thread panicked");
        }
    }

    #[test]
    fn thread_guard_dropped_in_a_scope_clears_the_thread() {
        std::thread::spawn(|| {
            let guard = set_routing_key("archive").expect("plain thread");

            let inner = unit_of_work_blocking(move || {
                drop(guard);
                routing_key()
            });

            assert_eq!(inner, "master");
            assert_eq!(routing_key(), "master");
            assert!(!is_bound());
        })
        .join()
        .expect("thread panicked");
    }

    #[test]
    fn forgotten_guard_is_detected_as_a_leak() {
        std::thread::spawn(|| {
            assert!(ensure_unbound().is_ok());

            std::mem::forget(set_routing_key("reporting").expect("plain thread"));
            let err = ensure_unbound().expect_err("key was never cleared");
            assert!(matches!(err, EngineError::RoutingKeyLeak { ref key } if key == "reporting"));

            clear_routing_key();
            assert!(ensure_unbound().is_ok());
        })
        .join()
        .expect("thread panicked");
    }

    #[test]
    fn blocking_unit_of_work_does_not_touch_the_thread_binding() {
        std::thread::spawn(|| {
            let _guard = set_routing_key("archive").expect("plain thread");
            unit_of_work_blocking(|| {
                assert_eq!(routing_key(), "master");
                let _inner = set_routing_key("reporting").expect("inside a scope");
                assert_eq!(routing_key(), "reporting");
            });
            assert_eq!(routing_key(), "archive");
        })
        .join()
        .expect("thread panicked");
    }
}
