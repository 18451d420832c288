use crate::common::{FieldValue, Value};
use crate::entity::Accessor;

/// Descriptor for a field populated from another table.
///
/// # Purpose
/// A join column does not live in the entity's own table. It names a target
/// table and column to read from, plus the pair of columns that connect the
/// two tables: `ref_target_column` on the target side and `ref_column` on
/// the local side, defaulting to the owning table's primary key (back-filled
/// at metadata discovery). The repository batch-loads join data in one query
/// per target table after the main result set arrives.
#[derive(Debug)]
pub struct JoinColumn<E> {
    property: &'static str,
    name: String,
    target_table: String,
    target_column: String,
    ref_target_column: String,
    ref_column: Option<String>,
    accessor: Accessor<E>,
}

impl<E: 'static> JoinColumn<E> {
    /// Declares a join column over the field reached by `get`/`set`.
    ///
    /// `target_column` is the column to read from `target_table`;
    /// `ref_target_column` is the target-side key the local reference
    /// value is matched against.
    pub fn new<T>(
        property: &'static str,
        target_table: &str,
        target_column: &str,
        ref_target_column: &str,
        get: fn(&E) -> T,
        set: fn(&mut E, T),
    ) -> Self
    where
        T: FieldValue + 'static,
    {
        JoinColumn {
            property,
            name: String::new(),
            target_table: target_table.to_string(),
            target_column: target_column.to_string(),
            ref_target_column: ref_target_column.to_string(),
            ref_column: None,
            accessor: Accessor::new(get, set),
        }
    }

    /// Overrides the local column holding the reference value. Without
    /// this the owning table's primary key is used.
    pub fn with_ref_column(mut self, ref_column: &str) -> Self {
        self.ref_column = Some(ref_column.to_string());
        self
    }
}

impl<E> JoinColumn<E> {
    pub fn property(&self) -> &'static str {
        self.property
    }

    /// The local name the fetched value is aliased to; empty until
    /// discovery back-fills it.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target_table(&self) -> &str {
        &self.target_table
    }

    pub fn target_column(&self) -> &str {
        &self.target_column
    }

    pub fn ref_target_column(&self) -> &str {
        &self.ref_target_column
    }

    /// The local column holding the reference value. `None` until declared
    /// explicitly or back-filled with the owning primary key at discovery.
    pub fn ref_column(&self) -> Option<&str> {
        self.ref_column.as_deref()
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    /// Fills in the reference column when the declaration left it unset.
    /// An explicit declaration always wins.
    pub(crate) fn backfill_ref_column(&mut self, name: &str) {
        if self.ref_column.is_none() {
            self.ref_column = Some(name.to_string());
        }
    }

    /// Writes a fetched value into the entity field. `Null` and values the
    /// field cannot represent are discarded silently.
    pub fn set_value(&self, entity: &mut E, value: Value) {
        if value.is_null() {
            return;
        }
        self.accessor.set(entity, value);
    }

    pub(crate) fn raw_value(&self, entity: &E) -> Value {
        self.accessor.get(entity)
    }
}
