//! EventBus service: typed publish/subscribe with wildcard routing.
//!
//! Handlers are registered per event type, plus the wildcard `"*"` which
//! receives every event. Both delivery paths invoke exact-type handlers
//! first, then wildcard handlers, each in registration order and one at
//! a time:
//! - `publish` enqueues onto an unbounded FIFO drained by a single
//!   dispatch loop (`start` / `spawn`); per-handler failures are logged
//!   and counted in [`BusStats`].
//! - `publish_sync` bypasses the queue and returns every handler's result.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::{mpsc, Mutex, RwLock};
use uuid::Uuid;

use crate::domain::models::event_types::WILDCARD;
use crate::domain::models::rule::panic_message;
use crate::domain::models::{Event, EventBusConfig};

/// Trait for event handlers.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    async fn handle(&self, event: &Event) -> Result<Value, String>;
}

/// Adapts a synchronous closure into an [`EventHandler`].
pub struct FnEventHandler<F> {
    name: String,
    f: F,
}

impl<F> FnEventHandler<F>
where
    F: Fn(&Event) -> Result<Value, String> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self { name: name.into(), f }
    }
}

#[async_trait]
impl<F> EventHandler for FnEventHandler<F>
where
    F: Fn(&Event) -> Result<Value, String> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, event: &Event) -> Result<Value, String> {
        (self.f)(event)
    }
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of the dispatch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BusState {
    Created,
    Running,
    Stopped,
}

impl BusState {
    const fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Created,
            1 => Self::Running,
            _ => Self::Stopped,
        }
    }

    const fn as_u8(self) -> u8 {
        match self {
            Self::Created => 0,
            Self::Running => 1,
            Self::Stopped => 2,
        }
    }
}

/// Delivery counters for the fire-and-forget path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BusStats {
    /// Events accepted by `publish`.
    pub published: u64,
    /// Events taken off the queue and run through their handlers.
    pub dispatched: u64,
    /// Handler errors and panics seen by the dispatch loop.
    pub handler_failures: u64,
}

#[derive(Clone)]
struct Subscription {
    id: SubscriptionId,
    handler: Arc<dyn EventHandler>,
    /// Cleared on unsubscribe so in-flight snapshots skip the handler.
    active: Arc<AtomicBool>,
}

/// Central event bus for VasperaOS.
pub struct EventBus {
    config: EventBusConfig,
    handlers: RwLock<HashMap<String, Vec<Subscription>>>,
    sender: mpsc::UnboundedSender<Event>,
    receiver: Mutex<mpsc::UnboundedReceiver<Event>>,
    running: AtomicBool,
    state: AtomicU8,
    published: AtomicU64,
    dispatched: AtomicU64,
    handler_failures: AtomicU64,
}

impl EventBus {
    pub fn new(config: EventBusConfig) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            config,
            handlers: RwLock::new(HashMap::new()),
            sender,
            receiver: Mutex::new(receiver),
            running: AtomicBool::new(false),
            state: AtomicU8::new(BusState::Created.as_u8()),
            published: AtomicU64::new(0),
            dispatched: AtomicU64::new(0),
            handler_failures: AtomicU64::new(0),
        }
    }

    /// Subscribe a handler to an event type (`"*"` for every event).
    ///
    /// Safe while the bus is running; the next dispatch observes it.
    pub async fn subscribe(&self, event_type: impl Into<String>, handler: Arc<dyn EventHandler>) -> SubscriptionId {
        let event_type = event_type.into();
        let id = SubscriptionId::new();
        tracing::info!(event_type = %event_type, handler = handler.name(), "subscribed handler");

        self.handlers
            .write()
            .await
            .entry(event_type)
            .or_default()
            .push(Subscription {
                id,
                handler,
                active: Arc::new(AtomicBool::new(true)),
            });
        id
    }

    /// Remove a subscription. Once this returns, the handler receives no
    /// further events. Returns false if it was not subscribed.
    pub async fn unsubscribe(&self, event_type: &str, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.write().await;
        let Some(subs) = handlers.get_mut(event_type) else {
            return false;
        };
        let Some(pos) = subs.iter().position(|s| s.id == id) else {
            return false;
        };

        let sub = subs.remove(pos);
        sub.active.store(false, Ordering::SeqCst);
        if subs.is_empty() {
            handlers.remove(event_type);
        }
        tracing::info!(event_type = %event_type, handler = sub.handler.name(), "unsubscribed handler");
        true
    }

    pub async fn subscriber_count(&self, event_type: &str) -> usize {
        self.handlers.read().await.get(event_type).map_or(0, Vec::len)
    }

    /// Enqueue an event for the dispatch loop. Does not wait for delivery.
    pub fn publish(&self, event: Event) {
        let event_id = event.id();
        let event_type = event.event_type.clone();
        let source = event.source.clone();

        if self.sender.send(event).is_err() {
            tracing::warn!(event_id = %event_id, event_type = %event_type, "event queue closed, dropping event");
            return;
        }
        self.published.fetch_add(1, Ordering::Relaxed);
        tracing::info!(event_id = %event_id, event_type = %event_type, source = %source, "event published");
    }

    /// Build an event and deliver it to every matching handler right away,
    /// waiting for each in turn.
    ///
    /// A failing handler shows up as an `Err` entry; the remaining
    /// handlers still run.
    pub async fn publish_sync(
        &self,
        event_type: impl Into<String>,
        payload: Map<String, Value>,
        source: impl Into<String>,
        product_id: Option<String>,
    ) -> Vec<Result<Value, String>> {
        let mut event = Event::new(event_type, payload, source);
        event.product_id = product_id;
        self.deliver(&event).await
    }

    /// Run the dispatch loop on the current task until [`stop`](Self::stop).
    ///
    /// Only one loop consumes the queue; a second concurrent call logs a
    /// warning and returns.
    pub async fn start(&self) {
        self.running.store(true, Ordering::SeqCst);
        self.run_loop().await;
    }

    /// Run the dispatch loop on a tokio task.
    ///
    /// The running flag is set before the task starts, so a `stop()`
    /// issued right after `spawn` is never lost.
    pub fn spawn(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);
        tokio::spawn(async move { self.run_loop().await })
    }

    /// Ask the dispatch loop to exit after its current wait or event.
    /// Events still queued are dropped.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        let _ = self.state.compare_exchange(
            BusState::Created.as_u8(),
            BusState::Stopped.as_u8(),
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
        tracing::info!("event bus stop requested");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> BusState {
        BusState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn stats(&self) -> BusStats {
        BusStats {
            published: self.published.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            handler_failures: self.handler_failures.load(Ordering::Relaxed),
        }
    }

    async fn run_loop(&self) {
        let Ok(mut receiver) = self.receiver.try_lock() else {
            tracing::warn!("event bus dispatch loop already running, ignoring start");
            return;
        };

        self.state.store(BusState::Running.as_u8(), Ordering::SeqCst);
        tracing::info!("event bus started");

        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);
        while self.running.load(Ordering::SeqCst) {
            match tokio::time::timeout(poll_interval, receiver.recv()).await {
                Ok(Some(event)) => {
                    let results = self.deliver(&event).await;
                    let failures = results.iter().filter(|r| r.is_err()).count() as u64;
                    self.dispatched.fetch_add(1, Ordering::Relaxed);
                    self.handler_failures.fetch_add(failures, Ordering::Relaxed);
                }
                Ok(None) => break,
                Err(_) => continue,
            }
        }

        self.running.store(false, Ordering::SeqCst);
        self.state.store(BusState::Stopped.as_u8(), Ordering::SeqCst);
        tracing::info!("event bus stopped");
    }

    /// Exact-type handlers followed by wildcard handlers.
    async fn resolve(&self, event_type: &str) -> Vec<Subscription> {
        let handlers = self.handlers.read().await;
        let mut resolved: Vec<Subscription> = handlers.get(event_type).cloned().unwrap_or_default();
        if event_type != WILDCARD {
            if let Some(wildcard) = handlers.get(WILDCARD) {
                resolved.extend(wildcard.iter().cloned());
            }
        }
        resolved
    }

    async fn deliver(&self, event: &Event) -> Vec<Result<Value, String>> {
        let subscriptions = self.resolve(&event.event_type).await;
        tracing::debug!(
            event_id = %event.id(),
            event_type = %event.event_type,
            handler_count = subscriptions.len(),
            "processing event"
        );

        let mut results = Vec::with_capacity(subscriptions.len());
        for sub in subscriptions {
            if !sub.active.load(Ordering::SeqCst) {
                continue;
            }

            let result = match AssertUnwindSafe(sub.handler.handle(event)).catch_unwind().await {
                Ok(result) => result,
                Err(payload) => Err(panic_message(payload.as_ref())),
            };
            if let Err(ref e) = result {
                tracing::error!(
                    event_id = %event.id(),
                    event_type = %event.event_type,
                    handler = sub.handler.name(),
                    error = %e,
                    "handler error"
                );
            }
            results.push(result);
        }
        results
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EventBusConfig::default())
    }
}

/// Wire form of a `publish_sync` result: the handler's value, or `{error}`.
pub fn result_to_json(result: &Result<Value, String>) -> Value {
    match result {
        Ok(v) => v.clone(),
        Err(e) => serde_json::json!({ "error": e }),
    }
}
