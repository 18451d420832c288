//! Mapped entity contract and dirty tracking.
//!
//! Every persisted record type implements [`Entity`], declaring its table
//! name and the column/join-column metadata for its fields, and embeds an
//! [`EntityState`] that holds the prior-value snapshot used for change
//! detection.
//!
//! # Declaring an entity
//!
//! ```rust,ignore
//! use tablemap::entity::{Entity, EntityState};
//! use tablemap::metadata::{flag, Column};
//!
//! #[derive(Debug, Clone, Default)]
//! pub struct User {
//!     id: i64,
//!     name: String,
//!     email: Option<String>,
//!     state: EntityState,
//! }
//!
//! impl Entity for User {
//!     fn table_name() -> &'static str {
//!         "user"
//!     }
//!
//!     fn columns() -> Vec<Column<Self>> {
//!         vec![
//!             Column::new("id", flag::PRIMARY | flag::AUTO_GENERATE, |u: &User| u.id, |u, v| u.id = v),
//!             Column::new("name", flag::REQUIRED, |u: &User| u.name.clone(), |u, v| u.name = v),
//!             Column::new("email", 0, |u: &User| u.email.clone(), |u, v| u.email = v),
//!         ]
//!     }
//!
//!     fn state(&self) -> &EntityState {
//!         &self.state
//!     }
//!
//!     fn state_mut(&mut self) -> &mut EntityState {
//!         &mut self.state
//!     }
//! }
//! ```

use std::collections::BTreeMap;

use crate::common::{FieldValue, Value, ValueKind};
use crate::metadata::{Column, Index, JoinColumn};

/// Trait implemented by every mapped record type.
///
/// # Purpose
/// Provides the static declaration surface the metadata registry consumes:
/// table name, ordered column declarations, join columns, and informational
/// indexes. Field access goes through the accessor pairs carried by each
/// declaration, so no runtime introspection is needed.
///
/// # Characteristics
/// - `Default` produces the zero-valued template used for hydration
/// - `Clone` lets the registry clone a cached clean template per row
/// - Declaration order of `columns()` is the column order everywhere
pub trait Entity: Default + Clone + Send + Sync + 'static {
    /// The table this entity maps to.
    fn table_name() -> &'static str;

    /// Ordered column declarations for this entity.
    fn columns() -> Vec<Column<Self>>;

    /// Join-column declarations, if any.
    fn join_columns() -> Vec<JoinColumn<Self>> {
        Vec::new()
    }

    /// Declarative index list, informational only.
    fn indexes() -> Vec<Index> {
        Vec::new()
    }

    /// The embedded dirty-tracking state.
    fn state(&self) -> &EntityState;

    fn state_mut(&mut self) -> &mut EntityState;
}

/// Prior-value snapshot backing modified-column detection.
///
/// # Purpose
/// Holds one slot per flushed property: the value it had at the last flush
/// point (construction through a descriptor, hydration, or a successful
/// persist). A property is "modified" when its current value differs from
/// the snapshot by value comparison.
///
/// # Behavior
/// Properties that were never flushed have no snapshot entry and are never
/// reported as modified; entities are expected to be created through a
/// table descriptor (or repository) so the baseline exists.
#[derive(Debug, Clone, Default)]
pub struct EntityState {
    prior: BTreeMap<String, Value>,
}

impl EntityState {
    /// Records `value` as the clean baseline for `property`.
    pub fn record(&mut self, property: &str, value: Value) {
        self.prior.insert(property.to_string(), value);
    }

    /// Returns the baseline value for `property`, if one was recorded.
    pub fn prior(&self, property: &str) -> Option<&Value> {
        self.prior.get(property)
    }

    pub fn is_empty(&self) -> bool {
        self.prior.is_empty()
    }

    pub fn clear(&mut self) {
        self.prior.clear();
    }
}

/// Typed get/set closure pair for one entity field.
///
/// # Purpose
/// Replaces reflection-based property access: the pair is built once at
/// declaration time from plain `fn` pointers over the concrete field type,
/// and records the field's static [`ValueKind`] and nullability alongside.
///
/// # Behavior
/// - `get` converts the field into a [`Value`]
/// - `set` converts a [`Value`] back through [`FieldValue::from_value`];
///   a conversion that fails discards the write silently, matching the
///   lenient hydration policy
pub struct Accessor<E> {
    get: Box<dyn Fn(&E) -> Value + Send + Sync>,
    set: Box<dyn Fn(&mut E, Value) + Send + Sync>,
    kind: ValueKind,
    nullable: bool,
}

impl<E: 'static> Accessor<E> {
    /// Builds an accessor from a getter/setter pair over the field type.
    pub fn new<T>(get: fn(&E) -> T, set: fn(&mut E, T)) -> Self
    where
        T: FieldValue + 'static,
    {
        Accessor {
            get: Box::new(move |entity| get(entity).into_value()),
            set: Box::new(move |entity, value| {
                if let Some(typed) = T::from_value(value) {
                    set(entity, typed);
                }
            }),
            kind: T::KIND,
            nullable: T::NULLABLE,
        }
    }
}

impl<E> Accessor<E> {
    pub fn get(&self, entity: &E) -> Value {
        (self.get)(entity)
    }

    pub fn set(&self, entity: &mut E, value: Value) {
        (self.set)(entity, value)
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn nullable(&self) -> bool {
        self.nullable
    }
}

impl<E> std::fmt::Debug for Accessor<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Accessor")
            .field("kind", &self.kind)
            .field("nullable", &self.nullable)
            .finish()
    }
}
