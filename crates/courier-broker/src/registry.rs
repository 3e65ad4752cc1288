//! The pending-slot registry.

use crate::BrokerError;
use courier_types::CorrelationId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;

struct PendingSlot<T> {
    created_at: Instant,
    session: Option<String>,
    tx: oneshot::Sender<T>,
}

struct Registry<T> {
    slots: HashMap<CorrelationId, PendingSlot<T>>,
    /// Session key -> most recently registered correlation id.
    by_session: HashMap<String, CorrelationId>,
}

impl<T> Registry<T> {
    fn new() -> Self {
        Self {
            slots: HashMap::new(),
            by_session: HashMap::new(),
        }
    }

    /// Removes a slot and its session index entry, if the index still points at it.
    fn remove(&mut self, id: &CorrelationId) -> Option<PendingSlot<T>> {
        let entry = self.slots.remove(id)?;
        if let Some(session) = &entry.session {
            if self.by_session.get(session) == Some(id) {
                self.by_session.remove(session);
            }
        }
        Some(entry)
    }
}

/// In-memory correlation registry shared by request handlers and the bus.
///
/// Cloning is cheap; all clones share the same registry.
///
/// Uses `std::sync::Mutex` intentionally: every critical section is a short
/// map operation plus a non-blocking one-shot send, and no lock is ever held
/// across an `.await`.
pub struct Broker<T> {
    registry: Arc<Mutex<Registry<T>>>,
}

impl<T> Clone for Broker<T> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
        }
    }
}

impl<T: Send + 'static> Default for Broker<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Awaiting half of a registered slot. Held by the request that registered it.
///
/// Dropping a `Slot` deregisters it, so a cancelled request never leaves a
/// dangling entry behind.
pub struct Slot<T> {
    id: CorrelationId,
    created_at: Instant,
    rx: oneshot::Receiver<T>,
    registry: Weak<Mutex<Registry<T>>>,
}

impl<T> Slot<T> {
    pub fn id(&self) -> &CorrelationId {
        &self.id
    }

    /// Time since the slot was registered.
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

impl<T> Drop for Slot<T> {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            lock_registry(&registry).remove(&self.id);
        }
    }
}

fn lock_registry<T>(registry: &Mutex<Registry<T>>) -> MutexGuard<'_, Registry<T>> {
    match registry.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            // A panicking holder cannot leave the maps half-updated: every
            // mutation is a single insert or remove.
            tracing::error!("correlation registry lock poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

impl<T: Send + 'static> Broker<T> {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Registry<T>> {
        lock_registry(&self.registry)
    }

    /// Allocates a fresh correlation id and an empty slot for it.
    pub fn register(&self) -> Slot<T> {
        self.insert(None)
    }

    /// Like [`Broker::register`], additionally indexing the slot under
    /// `session` for replies that arrive without a correlation id.
    pub fn register_with_session(&self, session: impl Into<String>) -> Slot<T> {
        self.insert(Some(session.into()))
    }

    fn insert(&self, session: Option<String>) -> Slot<T> {
        let (tx, rx) = oneshot::channel();
        let created_at = Instant::now();
        let mut registry = self.lock();

        let mut id = CorrelationId::generate();
        while registry.slots.contains_key(&id) {
            id = CorrelationId::generate();
        }

        if let Some(session) = &session {
            if let Some(displaced) = registry.by_session.insert(session.clone(), id.clone()) {
                tracing::debug!(
                    session = %session,
                    displaced = %displaced,
                    correlation_id = %id,
                    "session fallback now points at newer request"
                );
            }
        }
        registry.slots.insert(
            id.clone(),
            PendingSlot {
                created_at,
                session,
                tx,
            },
        );

        Slot {
            id,
            created_at,
            rx,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Completes the slot registered under `id` with `value`.
    ///
    /// Returns `false` without side effects when the id is unknown, already
    /// fulfilled, or expired.
    pub fn fulfill(&self, id: &CorrelationId, value: T) -> bool {
        let mut registry = self.lock();
        match registry.remove(id) {
            // Sent under the lock so a concurrent timeout either sees the
            // entry or finds the value already in the channel.
            Some(entry) => entry.tx.send(value).is_ok(),
            None => {
                tracing::debug!(correlation_id = %id, "no pending request for reply, dropping");
                false
            }
        }
    }

    /// Completes the slot most recently registered under `session`.
    pub fn fulfill_by_session(&self, session: &str, value: T) -> bool {
        let mut registry = self.lock();
        let Some(id) = registry.by_session.remove(session) else {
            tracing::debug!(session = %session, "no pending request for session, dropping");
            return false;
        };
        match registry.remove(&id) {
            Some(entry) => entry.tx.send(value).is_ok(),
            None => false,
        }
    }

    /// Waits until `slot` is fulfilled or `duration` elapses.
    ///
    /// On timeout the slot is removed, so a late reply no-ops in
    /// [`Broker::fulfill`]. If a reply won the race between the timer firing
    /// and the removal, that reply is returned.
    pub async fn await_with_timeout(
        &self,
        mut slot: Slot<T>,
        duration: Duration,
    ) -> Result<T, BrokerError> {
        match tokio::time::timeout(duration, &mut slot.rx).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(BrokerError::Abandoned),
            Err(_) => {
                let removed = self.lock().remove(&slot.id).is_some();
                if !removed {
                    if let Ok(value) = slot.rx.try_recv() {
                        return Ok(value);
                    }
                }
                tracing::debug!(
                    correlation_id = %slot.id,
                    waited_secs = duration.as_secs(),
                    "pending request timed out"
                );
                Err(BrokerError::TimedOut { waited: duration })
            }
        }
    }

    /// Number of slots currently awaiting a reply.
    pub fn pending(&self) -> usize {
        self.lock().slots.len()
    }

    /// Drops every slot older than `age`. Their awaiting requests observe
    /// [`BrokerError::Abandoned`]. Returns how many were dropped.
    pub fn sweep_older_than(&self, age: Duration) -> usize {
        let mut registry = self.lock();
        let stale: Vec<CorrelationId> = registry
            .slots
            .iter()
            .filter(|(_, slot)| slot.created_at.elapsed() > age)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &stale {
            registry.remove(id);
        }
        stale.len()
    }
}
