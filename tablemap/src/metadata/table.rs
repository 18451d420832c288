use crate::common::{to_snake_case, Value};
use crate::connection::Row;
use crate::entity::Entity;
use crate::errors::OrmResult;
use crate::metadata::{Column, JoinColumn};

/// Declarative index over one or more columns. Informational: rendered
/// into DDL but never consulted at query time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    name: String,
    fields: Vec<String>,
    unique: bool,
}

impl Index {
    pub fn new(name: &str, fields: &[&str]) -> Self {
        Index {
            name: name.to_string(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
            unique: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }
}

/// Complete static description of one mapped table.
///
/// # Purpose
/// Built once per entity type by the registry: collects the entity's column
/// and join-column declarations, back-fills derived names and semantic
/// types, records the primary key, and keeps a clean template instance used
/// to hydrate rows. All repository operations go through the descriptor
/// rather than re-reading declarations.
///
/// # Characteristics
/// - column order is declaration order, everywhere
/// - when several columns carry the primary flag the last declared wins
/// - the template is flushed, so a freshly hydrated entity starts clean
#[derive(Debug)]
pub struct TableDescriptor<E: Entity> {
    name: &'static str,
    columns: Vec<Column<E>>,
    join_columns: Vec<JoinColumn<E>>,
    indexes: Vec<Index>,
    primary_key: Option<String>,
    template: E,
}

impl<E: Entity> TableDescriptor<E> {
    /// Discovers the metadata for `E` and builds the descriptor.
    pub fn build() -> Self {
        let mut columns = E::columns();
        let mut primary_key = None;

        for column in &mut columns {
            if column.name().is_empty() {
                column.set_name(to_snake_case(column.property()));
            }
            column.resolve_semantic_type();
            if column.is_primary() {
                primary_key = Some(column.name().to_string());
            }
        }

        let mut join_columns = E::join_columns();
        for join in &mut join_columns {
            if join.name().is_empty() {
                join.set_name(to_snake_case(join.property()));
            }
            if let Some(primary) = &primary_key {
                join.backfill_ref_column(primary);
            }
        }

        let mut template = E::default();
        for column in &columns {
            column.flush_value(&mut template);
        }

        TableDescriptor {
            name: E::table_name(),
            columns,
            join_columns,
            indexes: E::indexes(),
            primary_key,
            template,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn columns(&self) -> &[Column<E>] {
        &self.columns
    }

    pub fn join_columns(&self) -> &[JoinColumn<E>] {
        &self.join_columns
    }

    pub fn indexes(&self) -> &[Index] {
        &self.indexes
    }

    /// The primary-key column name, when one was declared.
    pub fn primary_key(&self) -> Option<&str> {
        self.primary_key.as_deref()
    }

    pub fn primary_column(&self) -> Option<&Column<E>> {
        let name = self.primary_key.as_deref()?;
        self.columns.iter().find(|c| c.name() == name)
    }

    /// Declared column names, in declaration order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name().to_string()).collect()
    }

    /// A clean clone of the cached template.
    pub fn fresh_entity(&self) -> E {
        self.template.clone()
    }

    /// Hydrates one result row into a new entity.
    ///
    /// # Behavior
    /// Clones the template, assigns every column and join column present in
    /// the row (absent keys hydrate as `Null`, which the accessors discard),
    /// then flushes so the instance reports no modified columns.
    pub fn new_entity_instance(&self, row: &Row) -> OrmResult<E> {
        let mut entity = self.template.clone();
        self.assign(&mut entity, row);
        for join in &self.join_columns {
            let value = row.get(join.name()).cloned().unwrap_or(Value::Null);
            join.set_value(&mut entity, value);
        }
        self.flush(&mut entity);
        Ok(entity)
    }

    /// Assigns row values to the entity's own columns without flushing, so
    /// the assigned values count as modifications.
    pub fn assign(&self, entity: &mut E, row: &Row) {
        for column in &self.columns {
            let value = row.get(column.name()).cloned().unwrap_or(Value::Null);
            column.set_value(entity, value);
        }
    }

    /// Snapshots every column's current value as the clean baseline.
    pub fn flush(&self, entity: &mut E) {
        for column in &self.columns {
            column.flush_value(entity);
        }
    }

    /// Column names whose current value differs from the flushed baseline.
    ///
    /// Only properties with a recorded baseline participate; an entity that
    /// was never flushed reports nothing modified.
    pub fn modified_columns(&self, entity: &E) -> Vec<&'static str> {
        let mut modified = Vec::new();
        for column in &self.columns {
            if let Some(prior) = entity.state().prior(column.property()) {
                if *prior != column.raw_value(entity) {
                    modified.push(column.property());
                }
            }
        }
        modified
    }

    /// The entity's current primary-key value, through column formatting.
    pub fn primary_value(&self, entity: &E) -> Option<Value> {
        self.primary_column().map(|c| c.value_of(entity))
    }
}
