// store.rs - Reactive entity store
//
// Entities are grouped by archetype (their exact component set). Listener
// batches attach to every archetype they match and are indexed there by
// requirement term, so adding or deleting one component only consults the
// batches filed under that component in the old and new archetype.
//
// The store is single-threaded and reentrant: callbacks run synchronously
// inside the mutating call and may mutate the store again. No RefCell
// borrow is held while a callback runs.

use crate::config::StoreConfig;
use crate::ecs::archetype::Archetype;
use crate::ecs::change::ChangeTracker;
use crate::ecs::entity::EntityRecord;
use crate::ecs::listener::{Callback, Event, ListenerBatch, ListenerToken};
use crate::ecs::views::{SingleShared, ViewShared};
use crate::ecs::{
    ArchetypeId, ArchetypeLayout, Entity, EntityBuilder, EntityId, Requirement, RequirementSet,
    Schema, Single, StoreError, Subscription, View,
};
use reflex_metrics::Counter;
use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::{debug, trace, warn};

struct StoreState {
    next_id: u64,
    entities: FxHashMap<EntityId, Entity>,
    archetypes: SlotMap<ArchetypeId, Archetype>,
    by_layout: FxHashMap<ArchetypeLayout, ArchetypeId>,
    batches: FxHashMap<RequirementSet, Rc<ListenerBatch>>,
    views: FxHashMap<RequirementSet, Weak<ViewShared>>,
    singles: FxHashMap<RequirementSet, Weak<SingleShared>>,
}

impl StoreState {
    fn with_capacity(entities: usize) -> Self {
        Self {
            next_id: 0,
            entities: FxHashMap::with_capacity_and_hasher(entities, Default::default()),
            archetypes: SlotMap::with_key(),
            by_layout: FxHashMap::default(),
            batches: FxHashMap::default(),
            views: FxHashMap::default(),
            singles: FxHashMap::default(),
        }
    }

    /// Entities of every archetype matching `requirements`, archetypes in
    /// creation order and each archetype in its own list order.
    fn matching<'a>(&'a self, requirements: &'a RequirementSet) -> impl Iterator<Item = &'a Entity> + 'a {
        self.archetypes
            .values()
            .filter(move |archetype| requirements.satisfied_by(&archetype.layout))
            .flat_map(|archetype| archetype.entities.iter())
    }
}

pub(crate) struct StoreShared {
    self_ref: Weak<StoreShared>,
    schema: Rc<Schema>,
    state: RefCell<StoreState>,
    config: StoreConfig,
    metrics: RefCell<Counter>,
}

impl StoreShared {
    pub(crate) fn handle(&self) -> Weak<StoreShared> {
        self.self_ref.clone()
    }

    fn count(&self, name: &'static str) {
        self.metrics.borrow_mut().increment(name, 1);
    }

    fn emplace_archetype(&self, state: &mut StoreState, layout: ArchetypeLayout) -> ArchetypeId {
        if let Some(&id) = state.by_layout.get(&layout) {
            return id;
        }
        let mut archetype = Archetype::new(layout.clone());
        for batch in state.batches.values() {
            if batch.requirements().satisfied_by(&layout) {
                archetype.attach(batch);
            }
        }
        debug!(
            components = ?layout.components(),
            batches = archetype.batches().len(),
            "archetype created"
        );
        let id = state.archetypes.insert(archetype);
        state.by_layout.insert(layout, id);
        self.count("archetypes.created");
        id
    }

    fn prune_if_idle(&self, state: &mut StoreState, id: ArchetypeId) {
        if !self.config.prune_empty_archetypes {
            return;
        }
        if !state.archetypes.get(id).is_some_and(Archetype::is_idle) {
            return;
        }
        if let Some(archetype) = state.archetypes.remove(id) {
            state.by_layout.remove(&archetype.layout);
            self.count("archetypes.pruned");
            debug!(components = ?archetype.layout.components(), "archetype pruned");
        }
    }

    fn create_batch(&self, state: &mut StoreState, requirements: RequirementSet) -> Rc<ListenerBatch> {
        if requirements.is_contradictory() {
            warn!(
                requirements = %requirements.describe(&self.schema),
                "requirement set both requires and excludes a component; it will never match"
            );
        }
        let batch = Rc::new(ListenerBatch::new(requirements.clone()));
        for archetype in state.archetypes.values_mut() {
            if requirements.satisfied_by(&archetype.layout) {
                archetype.attach(&batch);
            }
        }
        debug!(requirements = %requirements.describe(&self.schema), "listener batch created");
        state.batches.insert(requirements, batch.clone());
        self.count("batches.created");
        batch
    }

    fn retire_batch(&self, batch: &Rc<ListenerBatch>) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        let key = batch.requirements();
        if !state.batches.get(key).is_some_and(|b| Rc::ptr_eq(b, batch)) {
            return;
        }
        state.batches.remove(key);
        let mut idle = Vec::new();
        for (id, archetype) in state.archetypes.iter_mut() {
            if archetype.detach(batch) && archetype.is_idle() {
                idle.push(id);
            }
        }
        for id in idle {
            self.prune_if_idle(state, id);
        }
        self.count("batches.retired");
        debug!(requirements = %key.describe(&self.schema), "listener batch retired");
    }

    /// Register callbacks on the shared batch for `requirements` and
    /// back-fill them with every entity that currently matches.
    pub(crate) fn subscribe(
        &self,
        requirements: RequirementSet,
        on_added: Callback,
        on_removed: Callback,
    ) -> Subscription {
        let (batch, token, snapshot) = {
            let mut guard = self.state.borrow_mut();
            let state = &mut *guard;
            let batch = match state.batches.get(&requirements) {
                Some(batch) => batch.clone(),
                None => self.create_batch(state, requirements),
            };
            let snapshot: Vec<Entity> = state.matching(batch.requirements()).cloned().collect();
            let token = batch.subscribe(on_added, on_removed);
            (batch, token, snapshot)
        };
        batch.backfill(token, &snapshot, |entity| self.currently_matches(&batch, entity));
        Subscription::new(token, &batch, self.handle())
    }

    pub(crate) fn unsubscribe(&self, batch: &Rc<ListenerBatch>, token: ListenerToken) {
        if !batch.unsubscribe(token) {
            return;
        }
        if self.config.retire_idle_batches && batch.subscriber_count() == 0 {
            self.retire_batch(batch);
        }
    }

    /// Announce an event to every subscriber of a batch.
    ///
    /// The entity's current archetype is the source of truth and is checked
    /// per subscriber, so stale events from an outer transition are dropped
    /// once a nested callback has already moved the entity again.
    fn announce(&self, batch: &ListenerBatch, entity: &Entity, event: Event) {
        let delivered = batch.dispatch(event, entity, |entity| self.currently_matches(batch, entity));
        if delivered > 0 {
            self.metrics.borrow_mut().increment("notifications", delivered);
        }
    }

    fn currently_matches(&self, batch: &ListenerBatch, entity: &Entity) -> bool {
        let Some(archetype) = entity.record.archetype.get() else {
            return false;
        };
        let state = self.state.borrow();
        state
            .archetypes
            .get(archetype)
            .is_some_and(|home| batch.requirements().satisfied_by(&home.layout))
    }

    /// Move an entity after one component appeared or disappeared.
    ///
    /// `now` is the term that became true: `Require(c)` on gain,
    /// `Exclude(c)` on loss.
    pub(crate) fn presence_changed(&self, entity: &Entity, now: Requirement) {
        let Some(from) = entity.record.archetype.get() else {
            return;
        };
        let layout = entity.layout();
        let (removals, additions) = {
            let mut guard = self.state.borrow_mut();
            let state = &mut *guard;
            let to = self.emplace_archetype(state, layout);
            if to == from {
                return;
            }
            let removals = match state.archetypes.get_mut(from) {
                Some(old) => {
                    old.entities.remove(entity);
                    old.triggered_by(now.negated()).to_vec()
                }
                None => Vec::new(),
            };
            let additions = match state.archetypes.get_mut(to) {
                Some(new) => {
                    new.entities.push(entity.clone());
                    new.triggered_by(now).to_vec()
                }
                None => Vec::new(),
            };
            entity.record.archetype.set(Some(to));
            self.prune_if_idle(state, from);
            (removals, additions)
        };
        self.count("transitions");
        trace!(
            entity = %entity.id(),
            component = self.schema.name_of(now.component()).unwrap_or("?"),
            gained = !now.is_exclude(),
            "entity changed archetype"
        );
        for batch in &removals {
            self.announce(batch, entity, Event::Removed);
        }
        for batch in &additions {
            self.announce(batch, entity, Event::Added);
        }
    }

    fn cached_view(&self, requirements: &RequirementSet) -> Option<View> {
        let weak = self.state.borrow().views.get(requirements).cloned()?;
        weak.upgrade().map(View::from_shared)
    }

    fn cached_single(&self, requirements: &RequirementSet) -> Option<Single> {
        let weak = self.state.borrow().singles.get(requirements).cloned()?;
        weak.upgrade().map(Single::from_shared)
    }

    pub(crate) fn forget_view(&self, requirements: &RequirementSet) {
        if let Ok(mut state) = self.state.try_borrow_mut() {
            if state
                .views
                .get(requirements)
                .is_some_and(|weak| weak.strong_count() == 0)
            {
                state.views.remove(requirements);
                debug!(requirements = %requirements.describe(&self.schema), "view released");
            }
        }
    }

    pub(crate) fn forget_single(&self, requirements: &RequirementSet) {
        if let Ok(mut state) = self.state.try_borrow_mut() {
            if state
                .singles
                .get(requirements)
                .is_some_and(|weak| weak.strong_count() == 0)
            {
                state.singles.remove(requirements);
            }
        }
    }
}

/// Handle to a reactive entity store.
///
/// Cloning the handle is cheap and every clone refers to the same store.
///
/// # Example
/// ```ignore
/// let store = EntityStore::new(Schema::builder().with::<Position>().build()?);
/// let moving = store.multiple(&requirements![Position, !Frozen]);
/// let entity = store.create(EntityBuilder::new().with(Position::default()));
/// assert!(moving.contains(&entity));
/// ```
#[derive(Clone)]
pub struct EntityStore {
    shared: Rc<StoreShared>,
}

impl EntityStore {
    pub fn new(schema: Schema) -> Self {
        Self::with_config(schema, StoreConfig::default())
    }

    pub fn with_config(schema: Schema, config: StoreConfig) -> Self {
        let shared = Rc::new_cyclic(|self_ref| StoreShared {
            self_ref: self_ref.clone(),
            schema: Rc::new(schema),
            state: RefCell::new(StoreState::with_capacity(config.entity_capacity)),
            config,
            metrics: RefCell::new(Counter::new()),
        });
        debug!(
            components = shared.schema.len(),
            retire_idle_batches = shared.config.retire_idle_batches,
            prune_empty_archetypes = shared.config.prune_empty_archetypes,
            "entity store created"
        );
        Self { shared }
    }

    pub fn schema(&self) -> &Schema {
        &self.shared.schema
    }

    pub fn config(&self) -> &StoreConfig {
        &self.shared.config
    }

    /// Create an entity and announce it to every listener it matches.
    ///
    /// # Panics
    /// If the builder holds a component outside the schema.
    pub fn create(&self, builder: EntityBuilder) -> Entity {
        let shared = &self.shared;
        let slots = builder.into_slots(&shared.schema);
        let (entity, batches) = {
            let mut guard = shared.state.borrow_mut();
            let state = &mut *guard;
            let id = EntityId::from_raw(state.next_id);
            state.next_id += 1;

            let entity = Entity {
                record: Rc::new(EntityRecord::new(id, shared.schema.clone(), slots)),
                store: shared.handle(),
            };
            let archetype = shared.emplace_archetype(state, entity.layout());
            entity.record.archetype.set(Some(archetype));
            let batches = match state.archetypes.get_mut(archetype) {
                Some(home) => {
                    home.entities.push(entity.clone());
                    home.batches().to_vec()
                }
                None => Vec::new(),
            };
            state.entities.insert(id, entity.clone());
            (entity, batches)
        };
        shared.count("entities.created");
        trace!(entity = %entity.id(), "entity created");
        for batch in &batches {
            shared.announce(batch, &entity, Event::Added);
        }
        entity
    }

    /// Remove an entity and announce its removal.
    ///
    /// The handle stays valid as a plain value holder afterwards.
    pub fn remove(&self, entity: &Entity) -> Result<(), StoreError> {
        if !Weak::ptr_eq(&entity.store, &self.shared.self_ref) {
            return Err(StoreError::EntityNotFound { id: entity.id() });
        }
        self.remove_id(entity.id())
    }

    pub fn remove_id(&self, id: EntityId) -> Result<(), StoreError> {
        let shared = &self.shared;
        let (entity, batches) = {
            let mut guard = shared.state.borrow_mut();
            let state = &mut *guard;
            let entity = state
                .entities
                .remove(&id)
                .ok_or(StoreError::EntityNotFound { id })?;
            let mut batches = Vec::new();
            if let Some(archetype) = entity.record.archetype.take() {
                if let Some(home) = state.archetypes.get_mut(archetype) {
                    home.entities.remove(&entity);
                    batches = home.batches().to_vec();
                }
                shared.prune_if_idle(state, archetype);
            }
            (entity, batches)
        };
        shared.count("entities.removed");
        trace!(entity = %id, "entity removed");
        for batch in &batches {
            shared.announce(batch, &entity, Event::Removed);
        }
        Ok(())
    }

    /// Remove every entity present when the call starts.
    ///
    /// Entities created by callbacks during the sweep survive it.
    pub fn clear(&self) {
        let doomed: Vec<EntityId> = {
            let state = self.shared.state.borrow();
            state
                .archetypes
                .values()
                .flat_map(|archetype| archetype.entities.iter().map(Entity::id))
                .collect()
        };
        debug!(entities = doomed.len(), "clearing store");
        for id in doomed {
            // A callback may already have removed it.
            let _ = self.remove_id(id);
        }
    }

    pub fn entity(&self, id: EntityId) -> Option<Entity> {
        self.shared.state.borrow().entities.get(&id).cloned()
    }

    pub fn contains(&self, entity: &Entity) -> bool {
        Weak::ptr_eq(&entity.store, &self.shared.self_ref)
            && self.shared.state.borrow().entities.contains_key(&entity.id())
    }

    pub fn len(&self) -> usize {
        self.shared.state.borrow().entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.state.borrow().entities.is_empty()
    }

    pub fn archetype_count(&self) -> usize {
        self.shared.state.borrow().archetypes.len()
    }

    /// Number of live listener batches (distinct requirement sets listened to).
    pub fn batch_count(&self) -> usize {
        self.shared.state.borrow().batches.len()
    }

    /// Subscribe to entities entering and leaving a requirement set.
    ///
    /// `on_added` is called right away for every entity already matching.
    /// Callbacks may freely mutate the store. A callback that captures a
    /// store handle keeps the store alive until it is unsubscribed.
    pub fn listen<A, R>(&self, requirements: &[Requirement], on_added: A, on_removed: R) -> Subscription
    where
        A: Fn(&Entity) + 'static,
        R: Fn(&Entity) + 'static,
    {
        self.shared.subscribe(
            RequirementSet::new(requirements),
            Rc::new(on_added),
            Rc::new(on_removed),
        )
    }

    /// Live view of the matching entities, shared with every equal request
    /// while any handle to it is alive.
    pub fn multiple(&self, requirements: &[Requirement]) -> View {
        self.view_for(RequirementSet::new(requirements))
    }

    fn view_for(&self, requirements: RequirementSet) -> View {
        if let Some(view) = self.shared.cached_view(&requirements) {
            return view;
        }
        let view = View::open(&self.shared, requirements.clone());
        debug!(requirements = %requirements.describe(&self.shared.schema), "view created");
        self.shared
            .state
            .borrow_mut()
            .views
            .insert(requirements, view.downgrade());
        view
    }

    /// Snapshot of the matching entities, safe to iterate while removing.
    pub fn multiple_copy(&self, requirements: &[Requirement]) -> Vec<Entity> {
        let requirements = RequirementSet::new(requirements);
        if let Some(view) = self.shared.cached_view(&requirements) {
            return view.to_vec();
        }
        let state = self.shared.state.borrow();
        state.matching(&requirements).cloned().collect()
    }

    /// Accessor for a requirement set expected to match exactly one entity.
    pub fn single(&self, requirements: &[Requirement]) -> Single {
        let requirements = RequirementSet::new(requirements);
        if let Some(single) = self.shared.cached_single(&requirements) {
            return single;
        }
        let view = self.view_for(requirements.clone());
        let single = Single::new(
            view,
            requirements.describe(&self.shared.schema),
            self.shared.handle(),
        );
        self.shared
            .state
            .borrow_mut()
            .singles
            .insert(requirements, single.downgrade());
        single
    }

    /// Fresh tracker of entities entering and leaving a requirement set.
    pub fn changing(&self, requirements: &[Requirement]) -> ChangeTracker {
        ChangeTracker::open(&self.shared, RequirementSet::new(requirements))
    }

    /// Read one store counter. Always zero when metrics are compiled out.
    pub fn metric(&self, name: &str) -> usize {
        self.shared.metrics.borrow().get(name)
    }

    pub fn metrics(&self) -> Vec<(&'static str, usize)> {
        self.shared.metrics.borrow().iter().collect()
    }
}

impl fmt::Debug for EntityStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.shared.state.try_borrow() {
            Ok(state) => f
                .debug_struct("EntityStore")
                .field("entities", &state.entities.len())
                .field("archetypes", &state.archetypes.len())
                .field("batches", &state.batches.len())
                .finish(),
            Err(_) => f.debug_struct("EntityStore").finish_non_exhaustive(),
        }
    }
}
