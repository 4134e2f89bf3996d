// views.rs - Live derived views over a requirement set
//
// A View is an EntityList kept current by a listener subscription. The
// store caches views weakly by requirement set, so equal requests share
// one list while someone holds it; the last handle to go unsubscribes.

use crate::ecs::listener::Callback;
use crate::ecs::store::StoreShared;
use crate::ecs::{Entity, EntityList, RequirementSet, StoreError, Subscription};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

pub(crate) struct ViewShared {
    requirements: RequirementSet,
    list: Rc<RefCell<EntityList>>,
    subscription: Subscription,
    store: Weak<StoreShared>,
}

impl Drop for ViewShared {
    fn drop(&mut self) {
        self.subscription.unsubscribe();
        if let Some(store) = self.store.upgrade() {
            store.forget_view(&self.requirements);
        }
    }
}

/// Live, read-only sequence of the entities matching a requirement set.
///
/// The sequence changes in place as entities gain or lose components.
/// Iterate a [`View::to_vec`] snapshot when the loop body removes entities.
#[derive(Clone)]
pub struct View {
    shared: Rc<ViewShared>,
}

impl View {
    pub(crate) fn open(store: &StoreShared, requirements: RequirementSet) -> Self {
        let list = Rc::new(RefCell::new(EntityList::new()));
        let on_added: Callback = {
            let list = list.clone();
            Rc::new(move |entity: &Entity| {
                list.borrow_mut().push(entity.clone());
            })
        };
        let on_removed: Callback = {
            let list = list.clone();
            Rc::new(move |entity: &Entity| {
                list.borrow_mut().remove(entity);
            })
        };
        let subscription = store.subscribe(requirements.clone(), on_added, on_removed);
        Self {
            shared: Rc::new(ViewShared {
                requirements,
                list,
                subscription,
                store: store.handle(),
            }),
        }
    }

    pub(crate) fn from_shared(shared: Rc<ViewShared>) -> Self {
        Self { shared }
    }

    pub(crate) fn downgrade(&self) -> Weak<ViewShared> {
        Rc::downgrade(&self.shared)
    }

    pub fn requirements(&self) -> &RequirementSet {
        &self.shared.requirements
    }

    pub fn len(&self) -> usize {
        self.shared.list.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.list.borrow().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Entity> {
        self.shared.list.borrow().get(index).cloned()
    }

    pub fn first(&self) -> Option<Entity> {
        self.get(0)
    }

    pub fn contains(&self, entity: &Entity) -> bool {
        self.shared.list.borrow().contains(entity)
    }

    /// Independent snapshot of the current members.
    pub fn to_vec(&self) -> Vec<Entity> {
        self.shared.list.borrow().to_vec()
    }

    /// Walk the live sequence by position.
    ///
    /// No borrow is held between items, so the loop body may mutate the
    /// store; entities moved by swap-removal can then be skipped.
    pub fn iter(&self) -> ViewIter {
        ViewIter {
            view: self.clone(),
            position: 0,
        }
    }

    /// Whether both handles refer to the same cached view.
    pub fn ptr_eq(a: &View, b: &View) -> bool {
        Rc::ptr_eq(&a.shared, &b.shared)
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<_> = match self.shared.list.try_borrow() {
            Ok(list) => list.iter().map(Entity::id).collect(),
            Err(_) => Vec::new(),
        };
        f.debug_struct("View")
            .field("requirements", &self.shared.requirements)
            .field("entities", &ids)
            .finish()
    }
}

pub struct ViewIter {
    view: View,
    position: usize,
}

impl Iterator for ViewIter {
    type Item = Entity;

    fn next(&mut self) -> Option<Entity> {
        let entity = self.view.get(self.position)?;
        self.position += 1;
        Some(entity)
    }
}

impl IntoIterator for &View {
    type Item = Entity;
    type IntoIter = ViewIter;

    fn into_iter(self) -> ViewIter {
        self.iter()
    }
}

pub(crate) struct SingleShared {
    view: View,
    description: String,
    store: Weak<StoreShared>,
}

impl Drop for SingleShared {
    fn drop(&mut self) {
        if let Some(store) = self.store.upgrade() {
            store.forget_single(self.view.requirements());
        }
    }
}

/// Accessor for a requirement set expected to match exactly one entity.
///
/// Cardinality is checked on every call, never at creation.
#[derive(Clone)]
pub struct Single {
    shared: Rc<SingleShared>,
}

impl Single {
    pub(crate) fn new(view: View, description: String, store: Weak<StoreShared>) -> Self {
        Self {
            shared: Rc::new(SingleShared {
                view,
                description,
                store,
            }),
        }
    }

    pub(crate) fn from_shared(shared: Rc<SingleShared>) -> Self {
        Self { shared }
    }

    pub(crate) fn downgrade(&self) -> Weak<SingleShared> {
        Rc::downgrade(&self.shared)
    }

    /// The one matching entity.
    pub fn get(&self) -> Result<Entity, StoreError> {
        let view = &self.shared.view;
        let found = view.len();
        match (found, view.first()) {
            (1, Some(entity)) => Ok(entity),
            _ => Err(StoreError::Cardinality {
                requirements: self.shared.description.clone(),
                found,
            }),
        }
    }

    /// The matching entity, if exactly one matches.
    pub fn try_get(&self) -> Option<Entity> {
        self.get().ok()
    }

    pub fn view(&self) -> &View {
        &self.shared.view
    }

    pub fn ptr_eq(a: &Single, b: &Single) -> bool {
        Rc::ptr_eq(&a.shared, &b.shared)
    }
}

impl fmt::Debug for Single {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Single")
            .field("requirements", &self.shared.description)
            .field("found", &self.shared.view.len())
            .finish()
    }
}
