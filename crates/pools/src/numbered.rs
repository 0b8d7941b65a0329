//! Registry of stateful sessions tracked by integer id
//!
//! Transactions and reserved connections register here for their lifetime.
//! Entries are leased with [`Numbered::get`] / [`Numbered::put`] so only
//! one caller operates on a session at a time, and a bounded cache of
//! recently removed ids answers "why is this session gone" after the fact.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use lru::LruCache;
use parking_lot::{Condvar, Mutex};

/// How many recently-unregistered records to keep for diagnostics.
const RECENTLY_UNREGISTERED_CAPACITY: usize = 1000;

#[derive(Debug, Clone, thiserror::Error)]
pub enum NumberedError {
    #[error("already present")]
    AlreadyPresent,
    #[error("not found")]
    NotFound,
    /// The id was unregistered recently; the message carries the original
    /// reason and when it happened.
    #[error("ended at {} ({reason})", .time.format("%Y-%m-%d %H:%M:%S%.3f %Z"))]
    Ended { time: DateTime<Utc>, reason: String },
    #[error("in use: {purpose}")]
    InUse { purpose: String },
}

struct NumberedWrapper<T> {
    val: T,
    in_use: bool,
    purpose: String,
    time_created: Instant,
    time_used: Instant,
    enforce_timeout: bool,
}

struct Unregistered {
    reason: String,
    time_unregistered: DateTime<Utc>,
}

struct State<T> {
    resources: HashMap<i64, NumberedWrapper<T>>,
    recently_unregistered: LruCache<i64, Unregistered>,
}

/// Tracks values by integer id with explicit lease semantics. Scans hold
/// the registry lock throughout; membership is small so consistency wins
/// over throughput.
pub struct Numbered<T> {
    state: Mutex<State<T>>,
    // Broadcast when the registry becomes empty.
    empty: Condvar,
}

impl<T: Clone> Default for Numbered<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Numbered<T> {
    pub fn new() -> Self {
        Numbered {
            state: Mutex::new(State {
                resources: HashMap::new(),
                recently_unregistered: LruCache::new(
                    NonZeroUsize::new(RECENTLY_UNREGISTERED_CAPACITY)
                        .expect("capacity is non-zero"),
                ),
            }),
            empty: Condvar::new(),
        }
    }

    /// Start tracking `val` under `id`. The entry is not leased. Fails if
    /// the id is already present.
    pub fn register(&self, id: i64, val: T, enforce_timeout: bool) -> Result<(), NumberedError> {
        let now = Instant::now();
        let mut state = self.state.lock();
        if state.resources.contains_key(&id) {
            return Err(NumberedError::AlreadyPresent);
        }
        state.resources.insert(
            id,
            NumberedWrapper {
                val,
                in_use: false,
                purpose: String::new(),
                time_created: now,
                time_used: now,
                enforce_timeout,
            },
        );
        Ok(())
    }

    /// Forget `id`, remembering `reason` for later diagnosis. Unknown ids
    /// are ignored.
    pub fn unregister(&self, id: i64, reason: &str) {
        let mut state = self.state.lock();
        if state.resources.remove(&id).is_some() {
            state.recently_unregistered.put(
                id,
                Unregistered {
                    reason: reason.to_string(),
                    time_unregistered: Utc::now(),
                },
            );
            if state.resources.is_empty() {
                self.empty.notify_all();
            }
        }
    }

    /// Lease the value for `purpose`. Fails if the id is unknown (quoting
    /// the unregister reason when one is on record) or already leased.
    /// Does not update the last-used time.
    pub fn get(&self, id: i64, purpose: &str) -> Result<T, NumberedError> {
        let mut state = self.state.lock();
        let Some(wrapper) = state.resources.get_mut(&id) else {
            if let Some(unreg) = state.recently_unregistered.get(&id) {
                return Err(NumberedError::Ended {
                    time: unreg.time_unregistered,
                    reason: unreg.reason.clone(),
                });
            }
            return Err(NumberedError::NotFound);
        };
        if wrapper.in_use {
            return Err(NumberedError::InUse {
                purpose: wrapper.purpose.clone(),
            });
        }
        wrapper.in_use = true;
        wrapper.purpose = purpose.to_string();
        Ok(wrapper.val.clone())
    }

    /// Release the lease on `id` so someone else can use it.
    pub fn put(&self, id: i64, update_time: bool) {
        let mut state = self.state.lock();
        if let Some(wrapper) = state.resources.get_mut(&id) {
            wrapper.in_use = false;
            wrapper.purpose.clear();
            if update_time {
                wrapper.time_used = Instant::now();
            }
        }
    }

    /// All tracked values, leased or not.
    pub fn get_all(&self) -> Vec<T> {
        let state = self.state.lock();
        state.resources.values().map(|w| w.val.clone()).collect()
    }

    /// Lease and return every unleased, timeout-enforced entry matching
    /// the predicate.
    pub fn get_by_filter(&self, purpose: &str, matches: impl Fn(&T) -> bool) -> Vec<T> {
        let mut state = self.state.lock();
        let mut vals = Vec::new();
        for wrapper in state.resources.values_mut() {
            if wrapper.in_use || !wrapper.enforce_timeout {
                continue;
            }
            if matches(&wrapper.val) {
                wrapper.in_use = true;
                wrapper.purpose = purpose.to_string();
                vals.push(wrapper.val.clone());
            }
        }
        vals
    }

    /// Lease and return every unleased, timeout-enforced entry that has
    /// not been used for at least `age`.
    pub fn get_outdated(&self, age: Duration, purpose: &str) -> Vec<T> {
        let mut state = self.state.lock();
        let mut vals = Vec::new();
        for wrapper in state.resources.values_mut() {
            if wrapper.in_use || !wrapper.enforce_timeout {
                continue;
            }
            if wrapper.time_used.elapsed() >= age {
                wrapper.in_use = true;
                wrapper.purpose = purpose.to_string();
                vals.push(wrapper.val.clone());
            }
        }
        vals
    }

    /// Lease and return every unleased entry idle for at least `timeout`,
    /// regardless of whether it enforces timeouts.
    pub fn get_idle(&self, timeout: Duration, purpose: &str) -> Vec<T> {
        let mut state = self.state.lock();
        let mut vals = Vec::new();
        for wrapper in state.resources.values_mut() {
            if wrapper.in_use {
                continue;
            }
            if wrapper.time_used.elapsed() >= timeout {
                wrapper.in_use = true;
                wrapper.purpose = purpose.to_string();
                vals.push(wrapper.val.clone());
            }
        }
        vals
    }

    /// Block until the registry has no entries.
    pub fn wait_for_empty(&self) {
        let mut state = self.state.lock();
        while !state.resources.is_empty() {
            self.empty.wait(&mut state);
        }
    }

    pub fn size(&self) -> usize {
        self.state.lock().resources.len()
    }

    pub fn stats_json(&self) -> String {
        format!("{{\"Size\": {}}}", self.size())
    }

    /// Age of the entry since registration, mostly for logs.
    pub fn time_created(&self, id: i64) -> Option<Instant> {
        self.state.lock().resources.get(&id).map(|w| w.time_created)
    }
}
