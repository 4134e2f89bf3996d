//! Reactive entity/component store.
//!
//! Entities carry arbitrary component values from a fixed [`Schema`] and
//! are grouped by archetype (their exact component set). Consumers observe
//! the store through requirement sets: [`EntityStore::listen`] callbacks,
//! live [`View`]s, [`Single`] accessors and [`ChangeTracker`]s. Every
//! notification is delivered synchronously inside the call that caused it.

mod archetype;
mod builder;
mod change;
mod component;
mod entity;
mod entity_list;
mod error;
mod listener;
mod requirement;
mod store;
mod views;

pub use archetype::{ArchetypeId, ArchetypeLayout};
pub use builder::EntityBuilder;
pub use change::{ChangeTracker, EntityChange};
pub use component::{Component, ComponentId, ComponentMeta, Schema, SchemaBuilder};
pub use entity::{Entity, EntityId};
pub use entity_list::EntityList;
pub use error::{SchemaError, StoreError};
pub use listener::{ListenerToken, Subscription};
pub use requirement::{Requirement, RequirementSet};
pub use store::EntityStore;
pub use views::{Single, View, ViewIter};

/// Create an entity from a list of component values.
#[macro_export]
macro_rules! spawn {
    ($store:expr $(, $component:expr)* $(,)?) => {{
        let builder = {
            #[allow(unused_mut)]
            let mut builder = $crate::ecs::EntityBuilder::new();
            $(
                builder = builder.with($component);
            )*
            builder
        };
        $store.create(builder)
    }};
}

/// Build a requirement list from component types; `!T` excludes `T`.
///
/// # Example
/// ```ignore
/// let idle = store.multiple(&requirements![Position, !Velocity]);
/// ```
#[macro_export]
macro_rules! requirements {
    () => {
        ::std::vec::Vec::<$crate::ecs::Requirement>::new()
    };
    ($($terms:tt)+) => {{
        let mut list = ::std::vec::Vec::<$crate::ecs::Requirement>::new();
        $crate::__push_requirements!(list; $($terms)+);
        list
    }};
}

#[doc(hidden)]
#[macro_export]
macro_rules! __push_requirements {
    ($list:ident;) => {};
    ($list:ident; ! $ty:ty $(, $($rest:tt)*)?) => {
        $list.push($crate::ecs::Requirement::Exclude(
            <$ty as $crate::ecs::Component>::ID,
        ));
        $crate::__push_requirements!($list; $($($rest)*)?);
    };
    ($list:ident; $ty:ty $(, $($rest:tt)*)?) => {
        $list.push($crate::ecs::Requirement::Require(
            <$ty as $crate::ecs::Component>::ID,
        ));
        $crate::__push_requirements!($list; $($($rest)*)?);
    };
}
