// change.rs - Poll-and-clear change tracking
//
// A tracker accumulates added and removed entities between polls. An add
// and a remove of the same entity inside one window cancel out, so a poll
// reports the net delta only.

use crate::ecs::listener::Callback;
use crate::ecs::store::StoreShared;
use crate::ecs::{Entity, EntityList, RequirementSet, Subscription};
use std::cell::RefCell;
use std::rc::Rc;

/// Entities that entered or left a requirement set since the last poll.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EntityChange {
    pub added: Vec<Entity>,
    pub removed: Vec<Entity>,
}

impl EntityChange {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

#[derive(Default)]
pub(crate) struct ChangeSet {
    added: EntityList,
    removed: EntityList,
}

impl ChangeSet {
    pub(crate) fn entity_added(&mut self, entity: &Entity) {
        if !self.removed.remove(entity) {
            self.added.push(entity.clone());
        }
    }

    pub(crate) fn entity_removed(&mut self, entity: &Entity) {
        if !self.added.remove(entity) {
            self.removed.push(entity.clone());
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    pub(crate) fn drain(&mut self) -> EntityChange {
        EntityChange {
            added: self.added.drain(),
            removed: self.removed.drain(),
        }
    }
}

/// Accumulates membership changes for one requirement set.
///
/// The first poll reports every entity that matched when the tracker was
/// created. Trackers are never shared; dropping one unsubscribes it.
pub struct ChangeTracker {
    changes: Rc<RefCell<ChangeSet>>,
    requirements: RequirementSet,
    subscription: Subscription,
}

impl ChangeTracker {
    pub(crate) fn open(store: &StoreShared, requirements: RequirementSet) -> Self {
        let changes = Rc::new(RefCell::new(ChangeSet::default()));
        let on_added: Callback = {
            let changes = changes.clone();
            Rc::new(move |entity: &Entity| changes.borrow_mut().entity_added(entity))
        };
        let on_removed: Callback = {
            let changes = changes.clone();
            Rc::new(move |entity: &Entity| changes.borrow_mut().entity_removed(entity))
        };
        let subscription = store.subscribe(requirements.clone(), on_added, on_removed);
        Self {
            changes,
            requirements,
            subscription,
        }
    }

    /// Return everything accumulated since the last poll and start over.
    pub fn poll(&self) -> EntityChange {
        self.changes.borrow_mut().drain()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.borrow().is_empty()
    }

    pub fn requirements(&self) -> &RequirementSet {
        &self.requirements
    }
}

impl Drop for ChangeTracker {
    fn drop(&mut self) {
        self.subscription.unsubscribe();
    }
}

impl std::fmt::Debug for ChangeTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeTracker")
            .field("requirements", &self.requirements)
            .field("pending", &!self.is_empty())
            .finish()
    }
}
