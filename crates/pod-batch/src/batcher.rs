use std::any::Any;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{BatchError, BatchResult};

/// Name accepted by [`RequestBatcher::is_loading`] meaning "anything at all".
pub const ANY_KEY: &str = "any";

/// Where a new call should attach instead of queueing its own action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeTarget {
    /// The entry currently executing.
    Running,
    /// The queued entry at this index (0 is the head).
    Queued(usize),
}

/// Read-only view of a queued or running call, handed to merge policies.
#[derive(Debug)]
pub struct PendingCall<'a, A> {
    pub name: &'a str,
    pub args: &'a A,
}

type Resolver<T> = oneshot::Sender<BatchResult<T>>;

struct Entry<A, T> {
    name: String,
    args: A,
    action: BoxFuture<'static, T>,
    resolvers: Vec<Resolver<T>>,
}

struct Running<A, T> {
    name: String,
    args: A,
    resolvers: Vec<Resolver<T>>,
}

struct State<A, T> {
    queue: VecDeque<Entry<A, T>>,
    running: Option<Running<A, T>>,
    last_dispatch: HashMap<String, Instant>,
    driver_active: bool,
}

/// A named FIFO of async actions with merging and per-name throttling.
///
/// At most one action runs at a time. Callers whose merge policy names an
/// existing entry share that entry's outcome instead of queueing another
/// action. Two dispatches of the same name are at least `batch_window`
/// apart. Every caller attached to an entry observes the same outcome,
/// including a panic in the action.
pub struct RequestBatcher<A, T> {
    state: Arc<Mutex<State<A, T>>>,
    batch_window: Duration,
}

impl<A, T> RequestBatcher<A, T>
where
    A: Send + 'static,
    T: Clone + Send + 'static,
{
    pub fn new(batch_window: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                queue: VecDeque::new(),
                running: None,
                last_dispatch: HashMap::new(),
                driver_active: false,
            })),
            batch_window,
        }
    }

    pub fn batch_window(&self) -> Duration {
        self.batch_window
    }

    /// Queue `action` under `name`, or attach to an existing entry if
    /// `merge` picks one, and wait for the outcome.
    ///
    /// `merge` sees the queued entries (head first), the running entry and
    /// the new arguments. A target that no longer exists is ignored and
    /// the call is queued normally.
    pub async fn enqueue<F, M>(&self, name: &str, args: A, action: F, merge: M) -> BatchResult<T>
    where
        F: Future<Output = T> + Send + 'static,
        M: FnOnce(&[PendingCall<'_, A>], Option<&PendingCall<'_, A>>, &A) -> Option<MergeTarget>,
    {
        let (tx, rx) = oneshot::channel();
        {
            let mut guard = self.state.lock().expect("lock poisoned");
            let state = &mut *guard;
            let target = {
                let queued: Vec<PendingCall<'_, A>> = state
                    .queue
                    .iter()
                    .map(|e| PendingCall { name: &e.name, args: &e.args })
                    .collect();
                let running = state
                    .running
                    .as_ref()
                    .map(|r| PendingCall { name: &r.name, args: &r.args });
                merge(&queued, running.as_ref(), &args)
            };

            let merged = match target {
                Some(MergeTarget::Running) => match state.running.as_mut() {
                    Some(running) => {
                        running.resolvers.push(tx);
                        None
                    }
                    None => Some(tx),
                },
                Some(MergeTarget::Queued(idx)) => match state.queue.get_mut(idx) {
                    Some(entry) => {
                        entry.resolvers.push(tx);
                        None
                    }
                    None => Some(tx),
                },
                None => Some(tx),
            };

            match merged {
                None => debug!(name, ?target, "merged into pending call"),
                Some(tx) => {
                    state.queue.push_back(Entry {
                        name: name.to_string(),
                        args,
                        action: action.boxed(),
                        resolvers: vec![tx],
                    });
                    debug!(name, queued = state.queue.len(), "enqueued call");
                    if !state.driver_active {
                        state.driver_active = true;
                        tokio::spawn(drive(Arc::clone(&self.state), self.batch_window));
                    }
                }
            }
        }
        rx.await.unwrap_or(Err(BatchError::DriverStopped))
    }

    /// Whether a call named `name` is queued or running. [`ANY_KEY`]
    /// matches every name.
    pub fn is_loading(&self, name: &str) -> bool {
        let state = self.state.lock().expect("lock poisoned");
        if name == ANY_KEY {
            return state.running.is_some() || !state.queue.is_empty();
        }
        state.running.as_ref().is_some_and(|r| r.name == name)
            || state.queue.iter().any(|e| e.name == name)
    }

    /// Number of queued (not yet running) entries.
    pub fn queue_len(&self) -> usize {
        self.state.lock().expect("lock poisoned").queue.len()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

async fn drive<A, T>(state: Arc<Mutex<State<A, T>>>, batch_window: Duration)
where
    A: Send + 'static,
    T: Clone + Send + 'static,
{
    loop {
        let (name, action, wait) = {
            let mut guard = state.lock().expect("lock poisoned");
            let Some(entry) = guard.queue.pop_front() else {
                guard.driver_active = false;
                return;
            };
            let wait = guard
                .last_dispatch
                .get(&entry.name)
                .map(|last| batch_window.saturating_sub(last.elapsed()))
                .unwrap_or(Duration::ZERO);
            guard.running = Some(Running {
                name: entry.name.clone(),
                args: entry.args,
                resolvers: entry.resolvers,
            });
            (entry.name, entry.action, wait)
        };

        if !wait.is_zero() {
            debug!(name = %name, wait_ms = wait.as_millis() as u64, "throttling call");
            tokio::time::sleep(wait).await;
        }
        state
            .lock()
            .expect("lock poisoned")
            .last_dispatch
            .insert(name.clone(), Instant::now());

        debug!(name = %name, "dispatching call");
        let outcome = AssertUnwindSafe(action).catch_unwind().await.map_err(|payload| {
            let message = panic_message(payload);
            warn!(name = %name, %message, "batched action panicked");
            BatchError::ActionPanicked { name: name.clone(), message }
        });

        let resolvers = state
            .lock()
            .expect("lock poisoned")
            .running
            .take()
            .map(|r| r.resolvers)
            .unwrap_or_default();
        for resolver in resolvers {
            // a caller that stopped waiting has nothing to observe
            let _ = resolver.send(outcome.clone());
        }
    }
}

impl<A, T> fmt::Debug for RequestBatcher<A, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock().expect("lock poisoned");
        f.debug_struct("RequestBatcher")
            .field("batch_window", &self.batch_window)
            .field("running", &state.running.as_ref().map(|r| r.name.as_str()))
            .field("queued", &state.queue.iter().map(|e| e.name.as_str()).collect::<Vec<_>>())
            .finish()
    }
}

/// Merge with the tail of the queue when it is a `name` call whose
/// arguments are `compatible`, or with the running call on the same terms
/// when nothing is queued.
pub fn merge_adjacent<A>(
    name: &str,
    queue: &[PendingCall<'_, A>],
    running: Option<&PendingCall<'_, A>>,
    args: &A,
    compatible: impl Fn(&A, &A) -> bool,
) -> Option<MergeTarget> {
    match queue.last() {
        Some(tail) => (tail.name == name && compatible(tail.args, args))
            .then_some(MergeTarget::Queued(queue.len() - 1)),
        None => running
            .filter(|r| r.name == name && compatible(r.args, args))
            .map(|_| MergeTarget::Running),
    }
}

/// Merge with the tail of the queue only, never with the running call.
pub fn merge_with_queued_tail<A>(
    name: &str,
    queue: &[PendingCall<'_, A>],
    args: &A,
    compatible: impl Fn(&A, &A) -> bool,
) -> Option<MergeTarget> {
    queue
        .last()
        .filter(|tail| tail.name == name && compatible(tail.args, args))
        .map(|_| MergeTarget::Queued(queue.len() - 1))
}

/// Policy that never merges.
pub fn never_merge<A>(
    _queue: &[PendingCall<'_, A>],
    _running: Option<&PendingCall<'_, A>>,
    _args: &A,
) -> Option<MergeTarget> {
    None
}
