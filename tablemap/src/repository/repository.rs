use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::collection::EntityCollection;
use crate::common::{derive_alias, Value};
use crate::connection::{Connection, PreparedQuery, Row};
use crate::entity::Entity;
use crate::errors::{ErrorKind, OrmError, OrmResult};
use crate::metadata::{Column, JoinColumn, MetadataRegistry, TableDescriptor};
use crate::query::QueryBuilder;
use crate::repository::{Criteria, Criterion, FindOptions};

/// Join data fetched for one target table, keyed by reference value.
struct JoinBatch {
    ref_column: String,
    data: HashMap<String, Row>,
}

/// Persistence gateway for one entity type over one connection.
///
/// # Purpose
/// Owns the query side (criteria rendering, aliasing, hydration, join-column
/// batch loading, an optional per-primary-key instance cache) and the write
/// side (insert with generated-key write-back, modified-columns-only update,
/// delete by primary key, and row-based upsert).
///
/// # Characteristics
/// - every fetch goes through a [`QueryBuilder`] and bound arguments
/// - criteria predicates are re-ordered to declared column order, so
///   equivalent criteria render identical SQL
/// - table aliases derive from the table name (first letter of each
///   underscore-separated word), optionally skipping a shared name prefix
pub struct Repository<E: Entity, C: Connection> {
    db: Arc<C>,
    table: Arc<TableDescriptor<E>>,
    alias_cell: OnceCell<String>,
    alias_skip: Option<String>,
    cache: Mutex<HashMap<String, E>>,
}

impl<E: Entity, C: Connection> Repository<E, C> {
    /// Creates a repository over `db`, resolving `E`'s metadata through
    /// the registry.
    pub fn new(db: Arc<C>, registry: &MetadataRegistry) -> Self {
        Repository {
            db,
            table: registry.table::<E>(),
            alias_cell: OnceCell::new(),
            alias_skip: None,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Like [`Repository::new`], but alias derivation skips `prefix` when
    /// it is the table name's first underscore-separated word. Useful when
    /// every table shares an application prefix.
    pub fn with_table_prefix(db: Arc<C>, registry: &MetadataRegistry, prefix: &str) -> Self {
        Repository {
            db,
            table: registry.table::<E>(),
            alias_cell: OnceCell::new(),
            alias_skip: Some(prefix.to_string()),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// The table descriptor this repository operates through.
    pub fn table(&self) -> &TableDescriptor<E> {
        &self.table
    }

    /// The alias used for this repository's table in rendered SQL.
    pub fn alias(&self) -> &str {
        self.alias_cell
            .get_or_init(|| derive_alias(self.table.name(), self.alias_skip.as_deref()))
    }

    fn alias_for(&self, table: &str) -> String {
        derive_alias(table, self.alias_skip.as_deref())
    }

    /// A builder pre-loaded with this table's SELECT, FROM, and primary-key
    /// GROUP BY clauses.
    pub fn get_query_builder(&self) -> QueryBuilder {
        let alias = self.alias();
        let mut builder = QueryBuilder::new();
        builder.add_select(&format!("{}.*", alias));
        builder.add_from(self.table.name(), alias);
        if let Some(primary) = self.table.primary_key() {
            builder.add_group_by(&format!("{}.{}", alias, primary));
        }
        builder
    }

    /// Renders and prepares the builder's statement.
    pub fn query(&self, builder: &QueryBuilder) -> OrmResult<Box<dyn PreparedQuery>> {
        let sql = builder.query_string();
        log::debug!("[{}] {}", self.table.name(), sql);
        self.db.prepare(&sql, builder.arguments())
    }

    /// Renders, prepares, and fetches the first result row.
    pub fn query_row(&self, builder: &QueryBuilder) -> OrmResult<Option<Row>> {
        self.query(builder)?.fetch()
    }

    /// Counts the rows the builder's criteria match, ignoring its select
    /// list, grouping, ordering, and limit window.
    pub fn query_total(&self, builder: &QueryBuilder) -> OrmResult<u64> {
        let mut count = builder.clone();
        count
            .remove_select()
            .remove_group_by()
            .remove_order_by()
            .remove_limit();
        let expression = match self.table.primary_key() {
            Some(primary) => format!("COUNT({}.{})", self.alias(), primary),
            None => "COUNT(*)".to_string(),
        };
        count.add_select(&expression);

        let mut query = self.query(&count)?;
        let value = query.fetch_one()?.unwrap_or(Value::I64(0));
        Ok(value.as_i64().unwrap_or(0).max(0) as u64)
    }

    /// Loads the entity with the given primary-key value.
    ///
    /// # Behavior
    /// With `use_cache` a previously loaded instance for the same key is
    /// cloned and returned without touching the database. A miss fetches,
    /// hydrates (join columns included), and populates the cache either way.
    ///
    /// # Errors
    /// `NotFound` when no row matches; `InvalidOperation` when the table
    /// declares no primary key.
    pub fn find(&self, primary: impl Into<Value>, use_cache: bool) -> OrmResult<E> {
        let key = primary.into();
        let cache_key = key.to_string();

        if use_cache {
            if let Some(hit) = self.cache.lock().get(&cache_key) {
                return Ok(hit.clone());
            }
        }

        let primary_name = self.table.primary_key().ok_or_else(|| {
            log::error!("find on '{}' which has no primary key", self.table.name());
            OrmError::new(
                format!("table '{}' has no primary key", self.table.name()),
                ErrorKind::InvalidOperation,
            )
        })?;

        let mut builder = self.get_query_builder();
        builder.add_where(&format!("{}.{} = ?", self.alias(), primary_name));
        builder.set_argument(key);

        let mut query = self.query(&builder)?;
        let row = query
            .fetch()?
            .ok_or_else(|| OrmError::new("No data found", ErrorKind::NotFound))?;

        let entity = self.prepare_item(row)?;
        self.cache.lock().insert(cache_key, entity.clone());
        Ok(entity)
    }

    /// Loads the first entity matching the criteria.
    ///
    /// # Errors
    /// `NotFound` when nothing matches.
    pub fn find_one_by(&self, criteria: &Criteria) -> OrmResult<E> {
        let mut builder = self.get_query_builder();
        self.apply_filter(&mut builder, criteria);
        builder.set_limit(1, 0);

        let mut query = self.query(&builder)?;
        let row = query
            .fetch()?
            .ok_or_else(|| OrmError::new("No data found", ErrorKind::NotFound))?;
        self.prepare_item(row)
    }

    /// Loads every entity matching the criteria, honoring the options'
    /// sorting and limit window.
    ///
    /// # Behavior
    /// When the options request a total, the criteria are counted before
    /// sorting and limiting, and the count lands in the collection's total.
    /// An empty result is an empty collection, not an error.
    pub fn find_all(&self, criteria: &Criteria, options: &FindOptions) -> OrmResult<EntityCollection<E>> {
        let mut builder = self.get_query_builder();
        self.apply_filter(&mut builder, criteria);

        let total = if options.wants_total() {
            Some(self.query_total(&builder)?)
        } else {
            None
        };

        self.apply_sorts(&mut builder, options);
        if let Some(limit) = options.get_limit() {
            builder.set_limit(limit, options.get_offset());
        }

        let rows = self.query(&builder)?.fetch_all()?;
        let mut collection = self.prepare_collection(rows)?;
        if let Some(total) = total {
            collection.set_total(total);
        }
        Ok(collection)
    }

    /// Inserts the entity as a new row.
    ///
    /// # Behavior
    /// Writes the columns that are modified or required, skipping null
    /// values. A generated key returned by the driver is written back into
    /// the auto-generated primary field. The entity is flushed afterwards,
    /// so it reports no modified columns.
    pub fn create(&self, entity: &mut E) -> OrmResult<()> {
        let modified = self.table.modified_columns(entity);

        let mut data = Row::new();
        for column in self.table.columns() {
            let value = column.value_of(entity);
            if value.is_null() {
                continue;
            }
            if modified.contains(&column.property()) || column.is_required() {
                data.insert(column.name().to_string(), value);
            }
        }

        let generated = self.db.insert(self.table.name(), &data)?;
        if let (Some(id), Some(primary)) = (generated, self.table.primary_column()) {
            if primary.is_auto_generate() {
                primary.set_value(entity, Value::I64(id));
            }
        }

        self.table.flush(entity);
        Ok(())
    }

    /// Writes the entity's modified columns back to its row.
    ///
    /// # Behavior
    /// A no-op when nothing is modified, and likewise when only the primary
    /// key changed (there is nothing to SET; the entity is left as-is).
    /// Otherwise modified non-primary columns form the SET data and the
    /// primary-key value forms the criteria; the entity is flushed on
    /// success and any cached instance for the key is dropped.
    ///
    /// # Errors
    /// `PreconditionError` when the table has no primary key or the
    /// entity's primary value is null. Nothing is sent to the driver in
    /// either case.
    pub fn update(&self, entity: &mut E) -> OrmResult<()> {
        let modified = self.table.modified_columns(entity);
        if modified.is_empty() {
            log::debug!("no modified columns on '{}', skipping update", self.table.name());
            return Ok(());
        }

        let primary = self.primary_or_precondition("update")?;
        let key = primary.value_of(entity);
        if key.is_null() {
            log::error!(
                "update on '{}' requires a primary key value",
                self.table.name()
            );
            return Err(OrmError::new(
                format!(
                    "cannot update '{}' without a primary key value",
                    self.table.name()
                ),
                ErrorKind::PreconditionError,
            ));
        }

        let mut data = Row::new();
        for column in self.table.columns() {
            if column.is_primary() {
                continue;
            }
            if modified.contains(&column.property()) {
                data.insert(column.name().to_string(), column.value_of(entity));
            }
        }

        if data.is_empty() {
            return Ok(());
        }

        let mut criteria = Row::new();
        criteria.insert(primary.name().to_string(), key.clone());
        self.db.update(self.table.name(), &data, &criteria)?;

        self.table.flush(entity);
        self.cache.lock().remove(&key.to_string());
        Ok(())
    }

    /// Deletes the entity's row by primary key.
    ///
    /// # Errors
    /// `PreconditionError` when the table has no primary key or the
    /// entity's primary value is null.
    pub fn delete(&self, entity: &E) -> OrmResult<()> {
        let primary = self.primary_or_precondition("delete")?;
        let key = primary.value_of(entity);
        if key.is_null() {
            log::error!(
                "delete on '{}' requires a primary key value",
                self.table.name()
            );
            return Err(OrmError::new(
                format!(
                    "cannot delete from '{}' without a primary key value",
                    self.table.name()
                ),
                ErrorKind::PreconditionError,
            ));
        }

        let mut criteria = Row::new();
        criteria.insert(primary.name().to_string(), key.clone());
        self.db.delete(self.table.name(), &criteria)?;
        self.cache.lock().remove(&key.to_string());
        Ok(())
    }

    /// Upserts from a raw row: updates the existing entity when the row
    /// carries a known primary-key value, inserts a new one otherwise.
    pub fn save_data(&self, row: &Row) -> OrmResult<E> {
        let existing = match self.primary_in(row) {
            Some(key) => match self.find(key, false) {
                Ok(entity) => Some(entity),
                Err(err) if err.kind() == ErrorKind::NotFound => None,
                Err(err) => return Err(err),
            },
            None => None,
        };

        match existing {
            Some(mut entity) => {
                self.table.assign(&mut entity, row);
                self.update(&mut entity)?;
                Ok(entity)
            }
            None => {
                let mut entity = self.table.fresh_entity();
                self.table.assign(&mut entity, row);
                self.create(&mut entity)?;
                Ok(entity)
            }
        }
    }

    fn primary_in(&self, row: &Row) -> Option<Value> {
        let primary = self.table.primary_key()?;
        match row.get(primary) {
            Some(value) if !value.is_null() => Some(value.clone()),
            _ => None,
        }
    }

    fn primary_or_precondition(&self, operation: &str) -> OrmResult<&Column<E>> {
        self.table.primary_column().ok_or_else(|| {
            log::error!("{} on '{}' which has no primary key", operation, self.table.name());
            OrmError::new(
                format!("table '{}' has no primary key", self.table.name()),
                ErrorKind::PreconditionError,
            )
        })
    }

    /// Renders the criteria into WHERE fragments and bound arguments.
    ///
    /// Predicates are applied in declared column order; criteria on
    /// columns the table does not declare are dropped with a warning.
    pub fn apply_filter(&self, builder: &mut QueryBuilder, criteria: &Criteria) {
        for (field, _) in criteria.iter() {
            if !self.table.columns().iter().any(|c| c.name() == field) {
                log::warn!(
                    "ignoring criterion on unknown column '{}.{}'",
                    self.table.name(),
                    field
                );
            }
        }

        for column in self.table.columns() {
            if let Some(criterion) = criteria.get(column.name()) {
                self.set_criterion(builder, column.name(), criterion.clone());
            }
        }
    }

    fn set_criterion(&self, builder: &mut QueryBuilder, field: &str, criterion: Criterion) {
        let qualified = format!("{}.{}", self.alias(), field);
        match criterion {
            Criterion::Eq(value) | Criterion::NotEq(value) if value.is_null() => {
                log::warn!("ignoring null criterion on '{}'", qualified);
            }
            Criterion::Eq(value) => {
                builder.add_where(&format!("{} = ?", qualified));
                builder.set_argument(value);
            }
            Criterion::NotEq(value) => {
                builder.add_where(&format!("{} != ?", qualified));
                builder.set_argument(value);
            }
            Criterion::In(values) | Criterion::NotIn(values)
                if Self::distinct(values.clone()).is_empty() =>
            {
                log::warn!("ignoring empty value list criterion on '{}'", qualified);
            }
            Criterion::In(values) => {
                let distinct = Self::distinct(values);
                builder.add_where(&format!("{} IN ({})", qualified, Self::placeholders(distinct.len())));
                for value in distinct {
                    builder.set_argument(value);
                }
            }
            Criterion::NotIn(values) => {
                let distinct = Self::distinct(values);
                builder.add_where(&format!(
                    "{} NOT IN ({})",
                    qualified,
                    Self::placeholders(distinct.len())
                ));
                for value in distinct {
                    builder.set_argument(value);
                }
            }
        }
    }

    // first occurrence wins, so argument order follows input order
    fn distinct(values: Vec<Value>) -> Vec<Value> {
        let mut distinct: Vec<Value> = Vec::new();
        for value in values {
            if !distinct.contains(&value) {
                distinct.push(value);
            }
        }
        distinct
    }

    fn placeholders(count: usize) -> String {
        vec!["?"; count].join(", ")
    }

    fn apply_sorts(&self, builder: &mut QueryBuilder, options: &FindOptions) {
        for (field, order) in options.order_by() {
            if self.table.columns().iter().any(|c| c.name() == field) {
                builder.add_order_by(&format!("{}.{}", self.alias(), field), *order);
            } else {
                log::warn!(
                    "ignoring sort on unknown column '{}.{}'",
                    self.table.name(),
                    field
                );
            }
        }
    }

    /// Batch-loads join-column data for the given main-table rows.
    ///
    /// # Behavior
    /// Join columns are grouped by target table and reference pair; each
    /// group costs exactly one parameterized query regardless of the row
    /// count. The query selects the target key aliased to the local
    /// reference column plus each join column aliased to its local name,
    /// filtered with `IN` over the distinct reference values.
    fn get_other_data(&self, rows: &[Row]) -> OrmResult<Vec<JoinBatch>> {
        let mut groups: IndexMap<(String, String, String), Vec<&JoinColumn<E>>> = IndexMap::new();
        for join in self.table.join_columns() {
            let ref_column = match join.ref_column() {
                Some(ref_column) => ref_column,
                None => {
                    log::warn!(
                        "join column '{}' on '{}' has no reference column, skipping",
                        join.name(),
                        self.table.name()
                    );
                    continue;
                }
            };
            let key = (
                join.target_table().to_string(),
                join.ref_target_column().to_string(),
                ref_column.to_string(),
            );
            groups.entry(key).or_default().push(join);
        }

        let mut batches = Vec::new();
        for ((target_table, ref_target, ref_column), joins) in groups {
            let mut ref_values: Vec<Value> = Vec::new();
            for row in rows {
                if let Some(value) = row.get(&ref_column) {
                    if !value.is_null() && !ref_values.contains(value) {
                        ref_values.push(value.clone());
                    }
                }
            }
            if ref_values.is_empty() {
                continue;
            }

            let target_alias = self.alias_for(&target_table);
            let mut builder = QueryBuilder::new();
            builder.add_select_as(&format!("{}.{}", target_alias, ref_target), &ref_column);
            for join in &joins {
                builder.add_select_as(
                    &format!("{}.{}", target_alias, join.target_column()),
                    join.name(),
                );
            }
            builder.add_from(&target_table, &target_alias);
            builder.add_where(&format!(
                "{}.{} IN ({})",
                target_alias,
                ref_target,
                Self::placeholders(ref_values.len())
            ));
            for value in &ref_values {
                builder.set_argument(value.clone());
            }

            let joined = self.query(&builder)?.fetch_all()?;
            let mut data = HashMap::new();
            for row in joined {
                if let Some(key) = row.get(&ref_column) {
                    data.insert(key.to_string(), row.clone());
                }
            }
            batches.push(JoinBatch { ref_column, data });
        }

        Ok(batches)
    }

    /// Hydrates rows into a collection, merging batched join data first.
    /// Rows that fail to hydrate are logged and skipped.
    fn prepare_collection(&self, rows: Vec<Row>) -> OrmResult<EntityCollection<E>> {
        let batches = self.get_other_data(&rows)?;

        let mut collection = EntityCollection::new();
        for mut row in rows {
            for batch in &batches {
                let reference = match row.get(&batch.ref_column) {
                    Some(value) if !value.is_null() => value.clone(),
                    _ => continue,
                };
                if let Some(joined) = batch.data.get(&reference.to_string()) {
                    for (key, value) in joined {
                        row.insert(key.clone(), value.clone());
                    }
                }
            }
            match self.table.new_entity_instance(&row) {
                Ok(entity) => collection.push(entity),
                Err(err) => log::warn!("skipping row of '{}': {}", self.table.name(), err),
            }
        }
        Ok(collection)
    }

    fn prepare_item(&self, row: Row) -> OrmResult<E> {
        let collection = self.prepare_collection(vec![row])?;
        collection.into_iter().next().ok_or_else(|| {
            OrmError::new(
                format!("row of '{}' could not be hydrated", self.table.name()),
                ErrorKind::MappingError,
            )
        })
    }
}
