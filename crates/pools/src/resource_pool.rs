//! Bounded pool of reusable resources
//!
//! The pool hands out at most `capacity` concurrently live resources,
//! creating them lazily through a factory callback. Returned resources are
//! reused in FIFO order. An optional sweeper replaces entries that sat idle
//! past a timeout, and an optional refresh hook drains and rebuilds the
//! whole pool when the backend it points at has changed.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Total time budget for pre-filling a new pool.
const PREFILL_TIMEOUT: Duration = Duration::from_secs(30);

/// A poolable resource. The pool calls `close` when it retires an entry
/// (idle expiry, capacity shrink, drain).
pub trait Resource: Send + 'static {
    /// Release any underlying OS or network resources.
    fn close(&mut self);
}

/// Factory creates one resource. Factories are invoked lazily on `get` and
/// on the reopen path of `put(None)`.
pub type Factory<R> =
    Arc<dyn Fn() -> Pin<Box<dyn Future<Output = anyhow::Result<R>> + Send>> + Send + Sync>;

/// RefreshCheck is consulted at `refresh_interval`; returning `Ok(true)`
/// drains and rebuilds the pool.
pub type RefreshCheck = Arc<dyn Fn() -> anyhow::Result<bool> + Send + Sync>;

/// LogWait is invoked when a `get` has to block waiting for a slot. It
/// receives the time the wait started.
pub type LogWait = Arc<dyn Fn(Instant) + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// The pool has been closed; no further gets are possible.
    #[error("resource pool is closed")]
    Closed,
    /// The caller's context expired while waiting for a slot. Maps to
    /// resource exhaustion: the pool was empty for the whole wait.
    #[error("resource pool timed out")]
    Timeout,
    /// The caller's context was already expired on entry.
    #[error("resource pool context already expired")]
    CtxTimeout,
    #[error("capacity {0} is out of range")]
    CapacityOutOfRange(usize),
    /// The factory failed; the slot was returned to the pool untouched.
    #[error(transparent)]
    Factory(#[from] anyhow::Error),
}

struct ResourceWrapper<R> {
    resource: Option<R>,
    time_used: Instant,
}

impl<R> ResourceWrapper<R> {
    fn empty() -> Self {
        ResourceWrapper {
            resource: None,
            time_used: Instant::now(),
        }
    }
}

enum TryPop<R> {
    Slot(ResourceWrapper<R>),
    Empty,
    Closed,
}

/// Bounded FIFO of slot tokens. Each token is either empty (the factory
/// will create a resource on use) or wraps a live resource with its
/// last-used time. Closing wakes every waiter; buffered tokens are still
/// drained before waiters observe the closed state.
struct SlotQueue<R> {
    state: Mutex<SlotQueueState<R>>,
    ready: Notify,
    max_cap: usize,
}

struct SlotQueueState<R> {
    queue: VecDeque<ResourceWrapper<R>>,
    closed: bool,
}

impl<R> SlotQueue<R> {
    fn new(max_cap: usize) -> Self {
        SlotQueue {
            state: Mutex::new(SlotQueueState {
                queue: VecDeque::with_capacity(max_cap),
                closed: false,
            }),
            ready: Notify::new(),
            max_cap,
        }
    }

    fn try_pop(&self) -> TryPop<R> {
        let mut state = self.state.lock();
        if let Some(wrapper) = state.queue.pop_front() {
            return TryPop::Slot(wrapper);
        }
        if state.closed {
            TryPop::Closed
        } else {
            TryPop::Empty
        }
    }

    async fn pop(&self) -> Result<ResourceWrapper<R>, PoolError> {
        loop {
            // Register interest before checking so a push between the check
            // and the await cannot be missed.
            let ready = self.ready.notified();
            match self.try_pop() {
                TryPop::Slot(wrapper) => return Ok(wrapper),
                TryPop::Closed => return Err(PoolError::Closed),
                TryPop::Empty => ready.await,
            }
        }
    }

    fn push(&self, wrapper: ResourceWrapper<R>) {
        {
            let mut state = self.state.lock();
            if state.closed || state.queue.len() >= self.max_cap {
                panic!("attempt to put into a full or closed resource pool");
            }
            state.queue.push_back(wrapper);
        }
        self.ready.notify_one();
    }

    fn close(&self) {
        self.state.lock().closed = true;
        self.ready.notify_waiters();
    }

    fn reopen(&self) {
        let mut state = self.state.lock();
        state.closed = false;
        state.queue.clear();
    }
}

/// Options for [`ResourcePool::new`] beyond the required factory and
/// capacities.
#[derive(Clone, Default)]
pub struct ResourcePoolOptions {
    /// Entries idle longer than this are closed and replaced. Zero
    /// disables the sweeper.
    pub idle_timeout: Duration,
    /// If non-zero, eagerly create up to `capacity` resources at
    /// construction using this many concurrent factory calls.
    pub prefill_parallelism: usize,
    /// Invoked when a `get` blocks waiting for a slot.
    pub log_wait: Option<LogWait>,
    /// Consulted every `refresh_interval` to decide whether to drain and
    /// rebuild the pool.
    pub refresh_check: Option<RefreshCheck>,
    pub refresh_interval: Duration,
}

struct Inner<R: Resource> {
    available: AtomicI64,
    active: AtomicI64,
    in_use: AtomicI64,
    wait_count: AtomicI64,
    wait_time_ns: AtomicU64,
    idle_closed: AtomicI64,
    exhausted: AtomicI64,

    capacity: AtomicUsize,
    idle_timeout_ns: AtomicU64,

    slots: SlotQueue<R>,
    factory: Factory<R>,
    log_wait: Option<LogWait>,
    refresh_check: Option<RefreshCheck>,
    refresh_interval: Duration,
    has_idle_sweeper: bool,

    // Serializes full drain/rebuild cycles against concurrent refresh
    // ticks.
    reopen_mutex: tokio::sync::Mutex<()>,
    tickers: Mutex<TickerState>,
}

struct TickerState {
    shutdown: CancellationToken,
}

/// A pool of reusable resources. Cheap to clone; all clones share the same
/// pool.
pub struct ResourcePool<R: Resource> {
    inner: Arc<Inner<R>>,
}

impl<R: Resource> Clone for ResourcePool<R> {
    fn clone(&self) -> Self {
        ResourcePool {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: Resource> ResourcePool<R> {
    /// Create a new pool with `capacity` initial slots, growable up to
    /// `max_cap` through [`set_capacity`](Self::set_capacity).
    ///
    /// Panics if `capacity` or `max_cap` is zero or `capacity > max_cap`;
    /// those are programmer errors.
    pub async fn new(
        factory: Factory<R>,
        capacity: usize,
        max_cap: usize,
        options: ResourcePoolOptions,
    ) -> Self {
        assert!(
            capacity > 0 && max_cap > 0 && capacity <= max_cap,
            "invalid/out of range capacity"
        );
        let inner = Arc::new(Inner {
            available: AtomicI64::new(capacity as i64),
            active: AtomicI64::new(0),
            in_use: AtomicI64::new(0),
            wait_count: AtomicI64::new(0),
            wait_time_ns: AtomicU64::new(0),
            idle_closed: AtomicI64::new(0),
            exhausted: AtomicI64::new(0),
            capacity: AtomicUsize::new(capacity),
            idle_timeout_ns: AtomicU64::new(options.idle_timeout.as_nanos() as u64),
            slots: SlotQueue::new(max_cap),
            factory,
            log_wait: options.log_wait,
            refresh_check: options.refresh_check,
            refresh_interval: options.refresh_interval,
            has_idle_sweeper: !options.idle_timeout.is_zero(),
            reopen_mutex: tokio::sync::Mutex::new(()),
            tickers: Mutex::new(TickerState {
                shutdown: CancellationToken::new(),
            }),
        });
        for _ in 0..capacity {
            inner.slots.push(ResourceWrapper::empty());
        }
        let pool = ResourcePool { inner };
        if options.prefill_parallelism > 0 {
            pool.prefill(capacity, options.prefill_parallelism).await;
        }
        pool.start_tickers();
        pool
    }

    async fn prefill(&self, capacity: usize, parallelism: usize) {
        let ctx = CancellationToken::new();
        let deadline = tokio::spawn({
            let ctx = ctx.clone();
            async move {
                tokio::time::sleep(PREFILL_TIMEOUT).await;
                ctx.cancel();
            }
        });
        let semaphore = Arc::new(tokio::sync::Semaphore::new(parallelism));
        let mut tasks = JoinSet::new();
        for _ in 0..capacity {
            let pool = self.clone();
            let ctx = ctx.clone();
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire().await else {
                    return;
                };
                if ctx.is_cancelled() {
                    return;
                }
                if let Ok(resource) = pool.get(&ctx).await {
                    pool.put(Some(resource)).await;
                }
            });
        }
        while tasks.join_next().await.is_some() {}
        deadline.abort();
    }

    /// Get the next available resource, creating one through the factory
    /// if the slot handed out is empty. Blocks until a slot is available
    /// or `ctx` is cancelled.
    ///
    /// A context that is already expired on entry fails with
    /// [`PoolError::CtxTimeout`] without touching the queue; one that
    /// expires while waiting fails with [`PoolError::Timeout`].
    pub async fn get(&self, ctx: &CancellationToken) -> Result<R, PoolError> {
        // Expired on entry: avoid racing with the slot queue.
        if ctx.is_cancelled() {
            return Err(PoolError::CtxTimeout);
        }

        let mut wrapper = match self.inner.slots.try_pop() {
            TryPop::Slot(wrapper) => wrapper,
            TryPop::Closed => return Err(PoolError::Closed),
            TryPop::Empty => {
                let start = Instant::now();
                self.record_wait(start);
                // A ready slot wins over a simultaneous cancellation so the
                // pool keeps making progress; the biased order also
                // guarantees a popped token is never dropped on cancel.
                let result = tokio::select! {
                    biased;
                    popped = self.inner.slots.pop() => popped,
                    _ = ctx.cancelled() => Err(PoolError::Timeout),
                };
                self.inner
                    .wait_time_ns
                    .fetch_add(start.elapsed().as_nanos() as u64, Ordering::SeqCst);
                result?
            }
        };

        let resource = match wrapper.resource.take() {
            Some(resource) => resource,
            None => match (self.inner.factory)().await {
                Ok(resource) => {
                    self.inner.active.fetch_add(1, Ordering::SeqCst);
                    resource
                }
                Err(err) => {
                    // Return the empty slot so capacity is preserved.
                    self.inner.slots.push(ResourceWrapper::empty());
                    return Err(PoolError::Factory(err));
                }
            },
        };
        if self.inner.available.fetch_sub(1, Ordering::SeqCst) - 1 <= 0 {
            self.inner.exhausted.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.in_use.fetch_add(1, Ordering::SeqCst);
        Ok(resource)
    }

    /// Return a resource to the pool. Every successful `get` requires
    /// exactly one `put`; passing `None` signals the resource was closed
    /// by the caller and a replacement should be opened in its place.
    ///
    /// Panics if called more often than `get`; that is a programmer error.
    pub async fn put(&self, resource: Option<R>) {
        let wrapper = match resource {
            Some(resource) => ResourceWrapper {
                resource: Some(resource),
                time_used: Instant::now(),
            },
            None => {
                let mut wrapper = ResourceWrapper::empty();
                self.reopen_resource(&mut wrapper).await;
                wrapper
            }
        };
        self.inner.slots.push(wrapper);
        self.inner.in_use.fetch_sub(1, Ordering::SeqCst);
        self.inner.available.fetch_add(1, Ordering::SeqCst);
    }

    async fn reopen_resource(&self, wrapper: &mut ResourceWrapper<R>) {
        match (self.inner.factory)().await {
            Ok(resource) => {
                wrapper.resource = Some(resource);
                wrapper.time_used = Instant::now();
            }
            Err(err) => {
                warn!(error = %err, "reopening pooled resource failed");
                wrapper.resource = None;
                self.inner.active.fetch_sub(1, Ordering::SeqCst);
            }
        }
    }

    /// Change the logical capacity of the pool, up to `max_cap`. Shrinking
    /// waits until enough resources have been returned, closing them as
    /// they come in. `set_capacity(0)` closes the pool.
    pub async fn set_capacity(&self, capacity: usize) -> Result<(), PoolError> {
        if capacity > self.inner.slots.max_cap {
            return Err(PoolError::CapacityOutOfRange(capacity));
        }

        // Atomically swap new capacity with old.
        let mut oldcap;
        loop {
            oldcap = self.inner.capacity.load(Ordering::SeqCst);
            if oldcap == 0 && capacity > 0 {
                // Closed before; reopen the queue.
                self.inner.slots.reopen();
            }
            if oldcap == capacity {
                return Ok(());
            }
            if self
                .inner
                .capacity
                .compare_exchange(oldcap, capacity, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                break;
            }
        }

        if capacity < oldcap {
            for _ in 0..(oldcap - capacity) {
                let mut wrapper = self.inner.slots.pop().await?;
                if let Some(mut resource) = wrapper.resource.take() {
                    resource.close();
                    self.inner.active.fetch_sub(1, Ordering::SeqCst);
                }
                self.inner.available.fetch_sub(1, Ordering::SeqCst);
            }
        } else {
            for _ in 0..(capacity - oldcap) {
                self.inner.slots.push(ResourceWrapper::empty());
                self.inner.available.fetch_add(1, Ordering::SeqCst);
            }
        }
        if capacity == 0 {
            self.inner.slots.close();
        }
        Ok(())
    }

    /// Close the pool: stop the sweeper and refresh tickers, then drain
    /// every slot. Waits for outstanding resources to be returned.
    pub async fn close(&self) {
        self.stop_tickers();
        let _ = self.set_capacity(0).await;
    }

    fn stop_tickers(&self) {
        self.inner.tickers.lock().shutdown.cancel();
    }

    /// Drain and rebuild the pool at its current capacity.
    async fn reopen(&self) {
        let _guard = self.inner.reopen_mutex.lock().await;
        let capacity = self.inner.capacity.load(Ordering::SeqCst);
        info!(capacity, "draining and reopening resource pool by request");
        self.close().await;
        if let Err(err) = self.set_capacity(capacity).await {
            warn!(error = %err, "restoring pool capacity after reopen failed");
        }
        self.start_tickers();
    }

    fn start_tickers(&self) {
        let shutdown = CancellationToken::new();
        self.inner.tickers.lock().shutdown = shutdown.clone();

        if self.inner.has_idle_sweeper {
            let pool = self.clone();
            let ctx = shutdown.clone();
            tokio::spawn(async move {
                loop {
                    let interval = pool.idle_timeout() / 10;
                    tokio::select! {
                        _ = ctx.cancelled() => return,
                        _ = tokio::time::sleep(interval) => pool.close_idle_resources().await,
                    }
                }
            });
        }

        if let Some(check) = self.inner.refresh_check.clone() {
            if !self.inner.refresh_interval.is_zero() {
                let pool = self.clone();
                tokio::spawn(async move {
                    loop {
                        tokio::select! {
                            _ = shutdown.cancelled() => return,
                            _ = tokio::time::sleep(pool.inner.refresh_interval) => {
                                match check() {
                                    Ok(true) => {
                                        // reopen restarts the tickers, this
                                        // task is replaced.
                                        pool.reopen().await;
                                        return;
                                    }
                                    Ok(false) => {}
                                    Err(err) => warn!(error = %err, "pool refresh check failed"),
                                }
                            }
                        }
                    }
                });
            }
        }
    }

    /// Scan queued entries and replace any that idled past the timeout.
    async fn close_idle_resources(&self) {
        let available = self.inner.available.load(Ordering::SeqCst).max(0) as usize;
        let idle_timeout = self.idle_timeout();
        if idle_timeout.is_zero() {
            return;
        }

        for _ in 0..available {
            let mut wrapper = match self.inner.slots.try_pop() {
                TryPop::Slot(wrapper) => wrapper,
                // Stop early if we don't get anything new from the pool.
                _ => return,
            };
            let expired =
                wrapper.resource.is_some() && wrapper.time_used.elapsed() > idle_timeout;
            if expired {
                if let Some(mut resource) = wrapper.resource.take() {
                    resource.close();
                }
                self.inner.idle_closed.fetch_add(1, Ordering::SeqCst);
                self.reopen_resource(&mut wrapper).await;
            }
            self.inner.slots.push(wrapper);
        }
    }

    /// Change the idle timeout. Only valid on pools constructed with one;
    /// calling this on a pool without a sweeper is a programmer error.
    pub fn set_idle_timeout(&self, idle_timeout: Duration) {
        if !self.inner.has_idle_sweeper {
            panic!("set_idle_timeout called on a pool built without an idle timeout");
        }
        self.inner
            .idle_timeout_ns
            .store(idle_timeout.as_nanos() as u64, Ordering::SeqCst);
    }

    fn record_wait(&self, start: Instant) {
        self.inner.wait_count.fetch_add(1, Ordering::SeqCst);
        if let Some(log_wait) = &self.inner.log_wait {
            log_wait(start);
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity.load(Ordering::SeqCst)
    }

    /// Number of currently unused and available slots.
    pub fn available(&self) -> i64 {
        self.inner.available.load(Ordering::SeqCst)
    }

    /// Number of live resources, in the pool or claimed.
    pub fn active(&self) -> i64 {
        self.inner.active.load(Ordering::SeqCst)
    }

    pub fn in_use(&self) -> i64 {
        self.inner.in_use.load(Ordering::SeqCst)
    }

    pub fn max_cap(&self) -> usize {
        self.inner.slots.max_cap
    }

    pub fn wait_count(&self) -> i64 {
        self.inner.wait_count.load(Ordering::SeqCst)
    }

    pub fn wait_time(&self) -> Duration {
        Duration::from_nanos(self.inner.wait_time_ns.load(Ordering::SeqCst))
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_nanos(self.inner.idle_timeout_ns.load(Ordering::SeqCst))
    }

    /// Count of resources closed because they idled past the timeout.
    pub fn idle_closed(&self) -> i64 {
        self.inner.idle_closed.load(Ordering::SeqCst)
    }

    /// Number of times `available` dropped below one during a get.
    pub fn exhausted(&self) -> i64 {
        self.inner.exhausted.load(Ordering::SeqCst)
    }

    pub fn stats_json(&self) -> String {
        format!(
            "{{\"Capacity\": {}, \"Available\": {}, \"Active\": {}, \"InUse\": {}, \"MaxCapacity\": {}, \"WaitCount\": {}, \"WaitTime\": {}, \"IdleTimeout\": {}, \"IdleClosed\": {}, \"Exhausted\": {}}}",
            self.capacity(),
            self.available(),
            self.active(),
            self.in_use(),
            self.max_cap(),
            self.wait_count(),
            self.wait_time().as_nanos(),
            self.idle_timeout().as_nanos(),
            self.idle_closed(),
            self.exhausted(),
        )
    }
}
