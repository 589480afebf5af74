//! Resolved events and the subscriber fan-out registry.

use crate::error::{CollabStreamError, Result};
use crate::model::{Entity, EntityKind, Marker, Post, Repository, Stream, Team, User};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

/// One typed notification per (envelope, kind) pair that survived filtering
/// and resolution. Constructed, published, and discarded; never retained.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedEvent {
    Posts(Vec<Post>),
    Repositories(Vec<Repository>),
    Streams(Vec<Stream>),
    Users(Vec<User>),
    Teams(Vec<Team>),
    Markers(Vec<Marker>),
}

impl ResolvedEvent {
    pub fn kind(&self) -> EntityKind {
        match self {
            ResolvedEvent::Posts(_) => EntityKind::Posts,
            ResolvedEvent::Repositories(_) => EntityKind::Repositories,
            ResolvedEvent::Streams(_) => EntityKind::Streams,
            ResolvedEvent::Users(_) => EntityKind::Users,
            ResolvedEvent::Teams(_) => EntityKind::Teams,
            ResolvedEvent::Markers(_) => EntityKind::Markers,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ResolvedEvent::Posts(v) => v.len(),
            ResolvedEvent::Repositories(v) => v.len(),
            ResolvedEvent::Streams(v) => v.len(),
            ResolvedEvent::Users(v) => v.len(),
            ResolvedEvent::Teams(v) => v.len(),
            ResolvedEvent::Markers(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Build the typed event for a resolved kind group.
    ///
    /// Every entity must belong to `kind`; the cache upholds this, so a
    /// mismatch is an internal error.
    pub(crate) fn from_entities(kind: EntityKind, entities: Vec<Entity>) -> Result<Self> {
        if let Some(stray) = entities.iter().find(|e| e.kind() != kind) {
            return Err(CollabStreamError::Internal(format!(
                "{} entity {} in {} group",
                stray.kind(),
                stray.id(),
                kind
            )));
        }

        Ok(match kind {
            EntityKind::Posts => ResolvedEvent::Posts(
                entities
                    .into_iter()
                    .filter_map(|e| match e {
                        Entity::Post(p) => Some(p),
                        _ => None,
                    })
                    .collect(),
            ),
            EntityKind::Repositories => ResolvedEvent::Repositories(
                entities
                    .into_iter()
                    .filter_map(|e| match e {
                        Entity::Repository(r) => Some(r),
                        _ => None,
                    })
                    .collect(),
            ),
            EntityKind::Streams => ResolvedEvent::Streams(
                entities
                    .into_iter()
                    .filter_map(|e| match e {
                        Entity::Stream(s) => Some(s),
                        _ => None,
                    })
                    .collect(),
            ),
            EntityKind::Users => ResolvedEvent::Users(
                entities
                    .into_iter()
                    .filter_map(|e| match e {
                        Entity::User(u) => Some(u),
                        _ => None,
                    })
                    .collect(),
            ),
            EntityKind::Teams => ResolvedEvent::Teams(
                entities
                    .into_iter()
                    .filter_map(|e| match e {
                        Entity::Team(t) => Some(t),
                        _ => None,
                    })
                    .collect(),
            ),
            EntityKind::Markers => ResolvedEvent::Markers(
                entities
                    .into_iter()
                    .filter_map(|e| match e {
                        Entity::Marker(m) => Some(m),
                        _ => None,
                    })
                    .collect(),
            ),
        })
    }
}

/// Callback invoked synchronously for every published event.
pub type Listener = Box<dyn Fn(&ResolvedEvent) + Send + Sync>;

type ListenerList = Arc<Mutex<Vec<(u64, Arc<Listener>)>>>;

/// Fan-out registry: independent listeners observe resolved events without
/// coupling to the dispatcher's internals.
///
/// Listeners run synchronously in subscription order. A panicking listener is
/// isolated and logged; the rest still run.
#[derive(Default)]
pub struct SubscriberRegistry {
    listeners: ListenerList,
    next_id: AtomicU64,
}

/// Handle returned by `subscribe`; call `unsubscribe` to detach the listener.
pub struct Subscription {
    id: u64,
    listeners: Weak<Mutex<Vec<(u64, Arc<Listener>)>>>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|(id, _)| *id != self.id);
            tracing::debug!(subscriber_id = self.id, "Subscriber removed");
        }
    }
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: Listener) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));
        tracing::debug!(subscriber_id = id, "Subscriber added");

        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    /// Invoke every listener with the event, in subscription order.
    pub fn publish(&self, event: &ResolvedEvent) {
        let listeners: Vec<(u64, Arc<Listener>)> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        tracing::trace!(
            kind = %event.kind(),
            entities = event.len(),
            subscribers = listeners.len(),
            "Publishing resolved event"
        );

        for (id, listener) in listeners {
            if catch_unwind(AssertUnwindSafe(|| (*listener)(event))).is_err() {
                tracing::error!(
                    subscriber_id = id,
                    kind = %event.kind(),
                    "Subscriber panicked while handling event"
                );
            }
        }
    }

    /// Drop all registrations. Used on disposal.
    pub fn clear(&self) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::testing;

    fn teams_event() -> ResolvedEvent {
        ResolvedEvent::Teams(vec![testing::team("t1", "acme")])
    }

    #[test]
    fn test_listeners_invoked_in_subscription_order() {
        let registry = SubscriberRegistry::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let order = order.clone();
            let _sub = registry.subscribe(Box::new(move |_event| {
                order.lock().unwrap().push(tag);
            }));
        }

        registry.publish(&teams_event());
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_unsubscribe_detaches_listener() {
        let registry = SubscriberRegistry::new();
        let count = Arc::new(Mutex::new(0usize));

        let count_clone = count.clone();
        let sub = registry.subscribe(Box::new(move |_event| {
            *count_clone.lock().unwrap() += 1;
        }));

        registry.publish(&teams_event());
        sub.unsubscribe();
        registry.publish(&teams_event());

        assert_eq!(*count.lock().unwrap(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_panicking_listener_does_not_block_others() {
        let registry = SubscriberRegistry::new();
        let reached = Arc::new(Mutex::new(false));

        let _panicking = registry.subscribe(Box::new(|_event| {
            panic!("listener blew up");
        }));
        let reached_clone = reached.clone();
        let _observer = registry.subscribe(Box::new(move |_event| {
            *reached_clone.lock().unwrap() = true;
        }));

        registry.publish(&teams_event());
        assert!(*reached.lock().unwrap());

        // Registry stays usable after the panic
        registry.publish(&teams_event());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_clear_drops_all_registrations() {
        let registry = SubscriberRegistry::new();
        let _a = registry.subscribe(Box::new(|_| {}));
        let _b = registry.subscribe(Box::new(|_| {}));

        registry.clear();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_from_entities_rejects_mismatched_kind() {
        let entities = vec![Entity::Team(testing::team("t1", "acme"))];
        let err = ResolvedEvent::from_entities(EntityKind::Posts, entities).unwrap_err();
        assert!(matches!(err, CollabStreamError::Internal(_)));
    }

    #[test]
    fn test_from_entities_builds_typed_event() {
        let entities = vec![
            Entity::Post(testing::post("p1", "s1")),
            Entity::Post(testing::post("p2", "s1")),
        ];
        let event = ResolvedEvent::from_entities(EntityKind::Posts, entities).unwrap();

        assert_eq!(event.kind(), EntityKind::Posts);
        assert_eq!(event.len(), 2);
    }
}
