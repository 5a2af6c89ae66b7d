//! Connectivity tracking.
//!
//! A [`NetworkMonitor`] holds the last known online state and broadcasts
//! transitions to subscribers. It is fed either directly through
//! [`NetworkMonitor::set_online`] or by a [`ConnectivitySource`] attached with
//! [`NetworkMonitor::start`].

mod http;

pub use http::HttpConnectivity;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use dashmap::DashMap;
use futures::future::BoxFuture;
use futures::stream::{BoxStream, StreamExt};
use tokio::task::JoinHandle;

/// Callback invoked with the new online state on every transition.
pub type StatusCallback = Arc<dyn Fn(bool) + Send + Sync>;

/// Error raised when the connectivity source cannot be queried.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("Invalid probe configuration: {0}")]
    Config(String),

    #[error("Probe failed: {0}")]
    Failed(String),
}

/// Platform source of connectivity readings.
pub trait ConnectivitySource: Send + Sync {
    /// Query the current state once.
    fn is_connected(&self) -> BoxFuture<'static, Result<bool, ProbeError>>;

    /// Stream of readings. It may repeat values; the monitor only forwards
    /// transitions.
    fn changes(&self) -> BoxStream<'static, bool>;
}

struct Subscriber {
    callback: StatusCallback,
    active: Arc<AtomicBool>,
}

/// Tracks whether the remote API is reachable.
///
/// Thread-safe and can be shared across components via `Arc`.
pub struct NetworkMonitor {
    online: AtomicBool,
    subscribers: DashMap<u64, Subscriber>,
    next_id: AtomicU64,
    listener: Mutex<Option<JoinHandle<()>>>,
    /// Held from the state swap until every callback has run.
    transitions: Mutex<()>,
}

impl std::fmt::Debug for NetworkMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkMonitor")
            .field("online", &self.current_state())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl Default for NetworkMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkMonitor {
    /// Create a monitor that assumes it is online until told otherwise.
    pub fn new() -> Self {
        Self::with_state(true)
    }

    /// Create a monitor with a known initial state.
    pub fn with_state(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
            subscribers: DashMap::new(),
            next_id: AtomicU64::new(0),
            listener: Mutex::new(None),
            transitions: Mutex::new(()),
        }
    }

    /// Create a new monitor wrapped in Arc for sharing.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Last known state. Never blocks.
    pub fn current_state(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Register a callback for state transitions.
    ///
    /// The callback runs on whichever thread reports the transition and must
    /// not block.
    pub fn subscribe<F>(self: &Arc<Self>, callback: F) -> Subscription
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let active = Arc::new(AtomicBool::new(true));

        self.subscribers.insert(
            id,
            Subscriber {
                callback: Arc::new(callback),
                active: active.clone(),
            },
        );

        tracing::debug!(subscription = id, "network subscriber registered");

        Subscription {
            monitor: Arc::downgrade(self),
            id,
            active,
        }
    }

    /// Record a reading. Subscribers are notified only if the state changed.
    ///
    /// Concurrent readings are delivered one transition at a time, so
    /// subscribers see the same order as the stored state. Callbacks must not
    /// call `set_online` themselves.
    ///
    /// Returns `true` if this was a transition.
    pub fn set_online(&self, online: bool) -> bool {
        let _transition = self
            .transitions
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let previous = self.online.swap(online, Ordering::SeqCst);
        if previous == online {
            return false;
        }

        if online {
            tracing::info!("network online");
        } else {
            tracing::warn!("network offline");
        }

        // Callbacks run outside the map guard so they may (un)subscribe.
        let subscribers: Vec<(StatusCallback, Arc<AtomicBool>)> = self
            .subscribers
            .iter()
            .map(|entry| (entry.callback.clone(), entry.active.clone()))
            .collect();

        for (callback, active) in subscribers {
            if active.load(Ordering::SeqCst) {
                callback(online);
            }
        }

        true
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Attach a connectivity source.
    ///
    /// Spawns a task that probes once to seed the state, then follows the
    /// source's change stream. A failed probe keeps the current state. Any
    /// previously attached source is detached first.
    pub fn start(self: &Arc<Self>, source: Arc<dyn ConnectivitySource>) {
        let monitor = Arc::downgrade(self);

        let task = tokio::spawn(async move {
            match source.is_connected().await {
                Ok(online) => match monitor.upgrade() {
                    Some(monitor) => {
                        monitor.set_online(online);
                    }
                    None => return,
                },
                Err(e) => {
                    tracing::warn!(error = %e, "initial connectivity probe failed, keeping last state");
                }
            }

            let mut changes = source.changes();
            while let Some(online) = changes.next().await {
                let Some(monitor) = monitor.upgrade() else {
                    break;
                };
                monitor.set_online(online);
            }

            tracing::debug!("connectivity source ended");
        });

        if let Some(previous) = self.replace_listener(Some(task)) {
            previous.abort();
        }
    }

    /// Detach from the connectivity source. Subscriptions stay registered.
    pub fn stop(&self) {
        if let Some(task) = self.replace_listener(None) {
            task.abort();
            tracing::debug!("connectivity listener stopped");
        }
    }

    fn replace_listener(&self, task: Option<JoinHandle<()>>) -> Option<JoinHandle<()>> {
        match self.listener.lock() {
            Ok(mut guard) => std::mem::replace(&mut *guard, task),
            Err(poisoned) => std::mem::replace(&mut *poisoned.into_inner(), task),
        }
    }

    fn unsubscribe(&self, id: u64) {
        if self.subscribers.remove(&id).is_some() {
            tracing::debug!(subscription = id, "network subscriber removed");
        }
    }
}

impl Drop for NetworkMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Handle to a registered callback. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    monitor: Weak<NetworkMonitor>,
    id: u64,
    active: Arc<AtomicBool>,
}

impl Subscription {
    /// Stop receiving transitions. Safe to call more than once.
    pub fn unsubscribe(&self) {
        if self.active.swap(false, Ordering::SeqCst) {
            if let Some(monitor) = self.monitor.upgrade() {
                monitor.unsubscribe(self.id);
            }
        }
    }

    /// Whether the callback is still registered.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
