use log::{debug, warn};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;

/// Separates the session id from the node path in an expand key. Neither
/// side ever contains it.
const KEY_SEPARATOR: char = '\u{1f}';

/// Result of registering interest in a pending completion.
pub struct Registration<T> {
    pub receiver: oneshot::Receiver<T>,
    /// True for the first waiter of a key. Only that caller sends the request.
    pub is_first: bool,
}

struct Parked<T> {
    value: T,
    at: Instant,
}

struct Inner<T> {
    waiters: HashMap<String, Vec<oneshot::Sender<T>>>,
    early: HashMap<String, Parked<T>>,
    /// Keys whose waiters gave up. A completion arriving later is dropped.
    abandoned: HashMap<String, Instant>,
}

/// Completions keyed by correlation id, resolved by the notification side.
pub struct PendingMap<T> {
    name: &'static str,
    /// How long an unclaimed completion stays parked. `None` never parks.
    park_for: Option<Duration>,
    inner: Mutex<Inner<T>>,
}

impl<T: Clone> PendingMap<T> {
    /// Map that drops completions nobody waits for.
    pub fn new(name: &'static str) -> Self {
        Self::build(name, None)
    }

    /// Map that parks a completion arriving before its waiter and hands it
    /// to the next registration for the key.
    ///
    /// Parked completions nobody claims within `park_for` are evicted.
    pub fn parking(name: &'static str, park_for: Duration) -> Self {
        Self::build(name, Some(park_for))
    }

    fn build(name: &'static str, park_for: Option<Duration>) -> Self {
        Self {
            name,
            park_for,
            inner: Mutex::new(Inner {
                waiters: HashMap::new(),
                early: HashMap::new(),
                abandoned: HashMap::new(),
            }),
        }
    }

    fn inner(&self) -> MutexGuard<'_, Inner<T>> {
        let mut guard = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poison_err) => {
                warn!("Pending {} map mutex poisoned, recovering...", self.name);
                poison_err.into_inner()
            }
        };
        self.evict_stale(&mut guard);
        guard
    }

    fn evict_stale(&self, inner: &mut Inner<T>) {
        let Some(park_for) = self.park_for else {
            return;
        };
        if inner.early.is_empty() && inner.abandoned.is_empty() {
            return;
        }

        let now = Instant::now();
        let before = inner.early.len();
        inner
            .early
            .retain(|_, parked| now.duration_since(parked.at) < park_for);
        inner
            .abandoned
            .retain(|_, at| now.duration_since(*at) < park_for);

        let evicted = before - inner.early.len();
        if evicted > 0 {
            debug!("Evicted {} stale parked {} completions", evicted, self.name);
        }
    }

    pub fn register(&self, key: &str) -> Registration<T> {
        let (tx, rx) = oneshot::channel();
        let mut inner = self.inner();

        if let Some(parked) = inner.early.remove(key) {
            debug!("Delivering parked {} completion for {}", self.name, key);
            let _ = tx.send(parked.value);
            return Registration {
                receiver: rx,
                is_first: false,
            };
        }

        inner.abandoned.remove(key);
        let waiters = inner.waiters.entry(key.to_string()).or_default();
        let is_first = waiters.is_empty();
        waiters.push(tx);

        Registration {
            receiver: rx,
            is_first,
        }
    }

    /// Wakes every waiter of `key`. Returns false when nobody was waiting.
    pub fn resolve(&self, key: &str, value: T) -> bool {
        let mut inner = self.inner();

        if let Some(waiters) = inner.waiters.remove(key).filter(|w| !w.is_empty()) {
            for tx in waiters {
                let _ = tx.send(value.clone());
            }
            return true;
        }

        if inner.abandoned.remove(key).is_some() {
            debug!("Dropping late {} completion {}", self.name, key);
        } else if self.park_for.is_some() {
            debug!("No waiter for {} completion {}, parking it", self.name, key);
            let parked = Parked {
                value,
                at: Instant::now(),
            };
            inner.early.insert(key.to_string(), parked);
        } else {
            debug!("Dropping unclaimed {} completion {}", self.name, key);
        }
        false
    }

    /// Drops the entry for `key`. Waiters observe a closed channel and a
    /// completion arriving afterwards is not parked.
    pub fn cancel(&self, key: &str) {
        let mut inner = self.inner();
        let had_waiters = inner.waiters.remove(key).is_some();
        let was_parked = inner.early.remove(key).is_some();

        if had_waiters && !was_parked && self.park_for.is_some() {
            inner.abandoned.insert(key.to_string(), Instant::now());
        }
    }

    pub fn cancel_where(&self, matches: impl Fn(&str) -> bool) {
        let mut inner = self.inner();
        let cancelled: Vec<String> = inner
            .waiters
            .keys()
            .filter(|key| matches(key))
            .cloned()
            .collect();

        for key in cancelled {
            inner.waiters.remove(&key);
            if self.park_for.is_some() {
                inner.abandoned.insert(key, Instant::now());
            }
        }
        inner.early.retain(|key, _| !matches(key));
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner().waiters.contains_key(key)
    }

    /// Number of keys with outstanding waiters or a parked completion.
    pub fn len(&self) -> usize {
        let inner = self.inner();
        inner.waiters.len() + inner.early.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut inner = self.inner();
        inner.waiters.clear();
        inner.early.clear();
        inner.abandoned.clear();
    }
}

pub(crate) fn expand_key(session_id: &str, node_path: &str) -> String {
    format!("{session_id}{KEY_SEPARATOR}{node_path}")
}

/// True when `key` was built by `expand_key` for exactly `session_id`.
pub(crate) fn is_session_key(key: &str, session_id: &str) -> bool {
    key.split_once(KEY_SEPARATOR)
        .is_some_and(|(session, _)| session == session_id)
}
