// listener.rs - Listener batches and subscriptions
//
// All subscribers sharing one canonical requirement set hang off a single
// ListenerBatch. Each subscriber remembers which entities it has been told
// about, and every delivery is checked against the entity's archetype at
// that moment. Nested transitions triggered from inside callbacks then
// collapse to the net effect for every subscriber, even those the outer
// event has not reached yet.

use crate::ecs::store::StoreShared;
use crate::ecs::{Entity, EntityId, RequirementSet};
use rustc_hash::FxHashSet;
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

new_key_type! {
    /// Identifies one subscriber within its batch.
    pub struct ListenerToken;
}

pub(crate) type Callback = Rc<dyn Fn(&Entity)>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Event {
    Added,
    Removed,
}

struct Subscriber {
    on_added: Callback,
    on_removed: Callback,
    /// Entities this subscriber has received `on_added` for and not yet
    /// `on_removed`.
    members: FxHashSet<EntityId>,
}

impl Subscriber {
    /// Update membership for an event; returns the callback to run if the
    /// event changes what this subscriber has seen.
    fn claim(&mut self, event: Event, id: EntityId, matching: bool) -> Option<Callback> {
        match event {
            Event::Added => {
                if matching && self.members.insert(id) {
                    return Some(self.on_added.clone());
                }
            }
            Event::Removed => {
                if !matching && self.members.remove(&id) {
                    return Some(self.on_removed.clone());
                }
            }
        }
        None
    }
}

pub(crate) struct ListenerBatch {
    requirements: RequirementSet,
    subscribers: RefCell<SlotMap<ListenerToken, Subscriber>>,
}

impl ListenerBatch {
    pub(crate) fn new(requirements: RequirementSet) -> Self {
        Self {
            requirements,
            subscribers: RefCell::new(SlotMap::with_key()),
        }
    }

    #[inline]
    pub(crate) fn requirements(&self) -> &RequirementSet {
        &self.requirements
    }

    pub(crate) fn subscribe(&self, on_added: Callback, on_removed: Callback) -> ListenerToken {
        self.subscribers.borrow_mut().insert(Subscriber {
            on_added,
            on_removed,
            members: FxHashSet::default(),
        })
    }

    pub(crate) fn unsubscribe(&self, token: ListenerToken) -> bool {
        // Callbacks are dropped after the borrow ends; their captures may
        // unsubscribe in turn.
        let removed = self.subscribers.borrow_mut().remove(token);
        removed.is_some()
    }

    pub(crate) fn has_subscriber(&self, token: ListenerToken) -> bool {
        self.subscribers.borrow().contains_key(token)
    }

    pub(crate) fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }

    /// Deliver an event to every subscriber registered when dispatch began.
    ///
    /// `matches` is asked again before each subscriber, so a callback that
    /// moves the entity turns the rest of this dispatch into no-ops.
    /// Subscribers removed mid-dispatch are skipped. No borrow is held while
    /// a callback runs. Returns the number of callbacks invoked.
    pub(crate) fn dispatch(
        &self,
        event: Event,
        entity: &Entity,
        matches: impl Fn(&Entity) -> bool,
    ) -> usize {
        let tokens: SmallVec<[ListenerToken; 4]> = self.subscribers.borrow().keys().collect();
        let mut delivered = 0;
        for token in tokens {
            if self.deliver(token, event, entity, &matches) {
                delivered += 1;
            }
        }
        delivered
    }

    /// Deliver the initial `added` calls to a fresh subscriber, in order.
    pub(crate) fn backfill(
        &self,
        token: ListenerToken,
        entities: &[Entity],
        matches: impl Fn(&Entity) -> bool,
    ) -> usize {
        let mut delivered = 0;
        for entity in entities {
            if !self.has_subscriber(token) {
                break;
            }
            if self.deliver(token, Event::Added, entity, &matches) {
                delivered += 1;
            }
        }
        delivered
    }

    fn deliver(
        &self,
        token: ListenerToken,
        event: Event,
        entity: &Entity,
        matches: &impl Fn(&Entity) -> bool,
    ) -> bool {
        let matching = matches(entity);
        let callback = {
            let mut subscribers = self.subscribers.borrow_mut();
            let Some(subscriber) = subscribers.get_mut(token) else {
                return false;
            };
            subscriber.claim(event, entity.id(), matching)
        };
        match callback {
            Some(callback) => {
                callback(entity);
                true
            }
            None => false,
        }
    }
}

/// Handle to one `listen` registration.
///
/// Dropping the handle does not unsubscribe; call [`Subscription::unsubscribe`].
#[must_use = "a listener can only be removed through its Subscription"]
pub struct Subscription {
    token: ListenerToken,
    batch: Weak<ListenerBatch>,
    store: Weak<StoreShared>,
}

impl Subscription {
    pub(crate) fn new(token: ListenerToken, batch: &Rc<ListenerBatch>, store: Weak<StoreShared>) -> Self {
        Self {
            token,
            batch: Rc::downgrade(batch),
            store,
        }
    }

    /// Stop receiving notifications. Calling this more than once is harmless.
    pub fn unsubscribe(&self) {
        let (Some(store), Some(batch)) = (self.store.upgrade(), self.batch.upgrade()) else {
            return;
        };
        store.unsubscribe(&batch, self.token);
    }

    pub fn is_active(&self) -> bool {
        self.batch
            .upgrade()
            .is_some_and(|batch| batch.has_subscriber(self.token))
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("token", &self.token)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::{EntityBuilder, EntityStore, Schema};
    use std::cell::Cell;

    struct Tag;
    crate::define_component!(Tag, 1, "tag");

    fn counting(counter: &Rc<Cell<u32>>) -> Callback {
        let counter = counter.clone();
        Rc::new(move |_: &Entity| counter.set(counter.get() + 1))
    }

    fn entity() -> (EntityStore, Entity) {
        let store = EntityStore::new(Schema::builder().with::<Tag>().build().unwrap());
        let entity = store.create(EntityBuilder::new());
        (store, entity)
    }

    #[test]
    fn each_subscriber_sees_an_entity_once() {
        let (_store, entity) = entity();
        let batch = ListenerBatch::new(RequirementSet::default());
        let added = Rc::new(Cell::new(0));
        let removed = Rc::new(Cell::new(0));
        batch.subscribe(counting(&added), counting(&removed));
        batch.subscribe(counting(&added), counting(&removed));

        assert_eq!(batch.dispatch(Event::Added, &entity, |_| true), 2);
        assert_eq!(batch.dispatch(Event::Added, &entity, |_| true), 0);
        assert_eq!(added.get(), 2);

        // A removal while the entity still matches is stale.
        assert_eq!(batch.dispatch(Event::Removed, &entity, |_| true), 0);
        assert_eq!(batch.dispatch(Event::Removed, &entity, |_| false), 2);
        assert_eq!(batch.dispatch(Event::Removed, &entity, |_| false), 0);
        assert_eq!(removed.get(), 2);
    }

    #[test]
    fn removal_without_prior_add_is_dropped() {
        let (_store, entity) = entity();
        let batch = ListenerBatch::new(RequirementSet::default());
        let removed = Rc::new(Cell::new(0));
        batch.subscribe(counting(&removed), counting(&removed));
        assert_eq!(batch.dispatch(Event::Removed, &entity, |_| false), 0);
        assert_eq!(removed.get(), 0);
    }

    #[test]
    fn backfill_skips_entities_already_delivered() {
        let (_store, entity) = entity();
        let batch = ListenerBatch::new(RequirementSet::default());
        let added = Rc::new(Cell::new(0));
        let token = batch.subscribe(counting(&added), counting(&added));

        batch.dispatch(Event::Added, &entity, |_| true);
        assert_eq!(batch.backfill(token, std::slice::from_ref(&entity), |_| true), 0);
        assert_eq!(added.get(), 1);
    }

    #[test]
    fn unsubscribed_tokens_are_skipped() {
        let (_store, entity) = entity();
        let batch = ListenerBatch::new(RequirementSet::default());
        let added = Rc::new(Cell::new(0));
        let token = batch.subscribe(counting(&added), counting(&added));

        assert!(batch.unsubscribe(token));
        assert!(!batch.unsubscribe(token));
        batch.dispatch(Event::Added, &entity, |_| true);
        assert_eq!(batch.backfill(token, std::slice::from_ref(&entity), |_| true), 0);
        assert_eq!(added.get(), 0);
        assert_eq!(batch.subscriber_count(), 0);
    }
}
