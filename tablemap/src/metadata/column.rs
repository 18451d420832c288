use crate::common::{Value, ValueKind, DATETIME_FORMAT};
use crate::entity::{Accessor, Entity};
use crate::common::FieldValue;

/// Column flag bits, combined with `|` in declarations.
pub mod flag {
    /// The column is the table's primary key.
    pub const PRIMARY: u8 = 0b00001;
    /// The value is generated by the database (AUTO_INCREMENT).
    pub const AUTO_GENERATE: u8 = 0b00010;
    /// The column is NOT NULL and always written on insert.
    pub const REQUIRED: u8 = 0b00100;
    /// The column carries a UNIQUE constraint.
    pub const UNIQUE: u8 = 0b01000;
    /// The column is covered by an index (informational).
    pub const INDEXED: u8 = 0b10000;
}

/// Semantic type of a column, translated into a concrete SQL type by
/// [`Column::resolve_type`].
///
/// `Raw` carries a literal SQL type string (e.g. `"varchar"`,
/// `"bigint unsigned"`) for columns that need an explicit override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SemanticType {
    Str,
    Bool,
    Int,
    Float,
    DateTime,
    Raw(String),
}

impl From<ValueKind> for SemanticType {
    fn from(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Str => SemanticType::Str,
            ValueKind::Bool => SemanticType::Bool,
            ValueKind::Int => SemanticType::Int,
            ValueKind::Float => SemanticType::Float,
            ValueKind::DateTime => SemanticType::DateTime,
        }
    }
}

/// Reference to another entity's table, used only to render a foreign-key
/// constraint and its conventional name. It never drives a join.
pub struct ForeignRef {
    resolve: fn() -> (&'static str, Option<String>),
}

impl ForeignRef {
    /// Builds a reference to entity type `F`.
    pub fn to<F: Entity>() -> Self {
        fn info<F: Entity>() -> (&'static str, Option<String>) {
            let mut primary = None;
            for column in F::columns() {
                if column.is_primary() {
                    primary = Some(crate::common::to_snake_case(column.property()));
                }
            }
            (F::table_name(), primary)
        }
        ForeignRef { resolve: info::<F> }
    }

    /// Returns the referenced table name and its primary-key column.
    pub fn target(&self) -> (&'static str, Option<String>) {
        (self.resolve)()
    }
}

impl std::fmt::Debug for ForeignRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (table, primary) = self.target();
        f.debug_struct("ForeignRef")
            .field("table", &table)
            .field("primary", &primary)
            .finish()
    }
}

/// Descriptor for one scalar table column.
///
/// # Purpose
/// Declared once per mapped field inside [`Entity::columns`] and owned by
/// the table descriptor afterwards. Carries the semantic type, flags,
/// rendering inputs (length, default, comment), an optional foreign-entity
/// reference, and the typed accessor pair for the field.
///
/// # Lifecycle
/// Constructed at declaration time; the column `name` and an unset semantic
/// type are back-filled exactly once during metadata discovery. Immutable
/// afterwards.
#[derive(Debug)]
pub struct Column<E> {
    flags: u8,
    semantic_type: Option<SemanticType>,
    property: &'static str,
    name: String,
    length: Option<u32>,
    default: Option<Value>,
    comment: String,
    foreign: Option<ForeignRef>,
    accessor: Accessor<E>,
}

impl<E: 'static> Column<E> {
    /// Declares a column over the field reached by `get`/`set`.
    ///
    /// The column name is derived later (snake-cased property name) and the
    /// semantic type defaults to the field's static type unless overridden
    /// with [`Column::with_type`].
    pub fn new<T>(property: &'static str, flags: u8, get: fn(&E) -> T, set: fn(&mut E, T)) -> Self
    where
        T: FieldValue + 'static,
    {
        Column {
            flags,
            semantic_type: None,
            property,
            name: String::new(),
            length: None,
            default: None,
            comment: String::new(),
            foreign: None,
            accessor: Accessor::new(get, set),
        }
    }

    /// Overrides the semantic type derived from the field.
    pub fn with_type(mut self, semantic_type: SemanticType) -> Self {
        self.semantic_type = Some(semantic_type);
        self
    }

    /// Sets the rendered length, e.g. `varchar(n)` / `tinyint(n)`.
    pub fn with_length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    /// Sets the `DEFAULT` literal for the column definition.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_comment(mut self, comment: &str) -> Self {
        self.comment = comment.to_string();
        self
    }

    /// Marks this column as a foreign key into `F`'s table.
    pub fn references<F: Entity>(mut self) -> Self {
        self.foreign = Some(ForeignRef::to::<F>());
        self
    }
}

impl<E> Column<E> {
    pub fn is_primary(&self) -> bool {
        self.flags & flag::PRIMARY != 0
    }

    pub fn is_auto_generate(&self) -> bool {
        self.flags & flag::AUTO_GENERATE != 0
    }

    pub fn is_required(&self) -> bool {
        self.flags & flag::REQUIRED != 0
    }

    pub fn is_unique(&self) -> bool {
        self.flags & flag::UNIQUE != 0
    }

    pub fn is_indexed(&self) -> bool {
        self.flags & flag::INDEXED != 0
    }

    pub fn property(&self) -> &'static str {
        self.property
    }

    /// The snake_case column name; empty until discovery back-fills it.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    /// Back-fills the semantic type from the field's static type when the
    /// declaration did not set one. Called once during discovery.
    pub(crate) fn resolve_semantic_type(&mut self) {
        if self.semantic_type.is_none() {
            self.semantic_type = Some(SemanticType::from(self.accessor.kind()));
        }
    }

    fn effective_type(&self) -> SemanticType {
        self.semantic_type
            .clone()
            .unwrap_or_else(|| SemanticType::from(self.accessor.kind()))
    }

    /// Resolves the concrete SQL type for this column.
    ///
    /// # Behavior
    /// Pure function of semantic type, length, and the `unsigned` qualifier:
    /// - `Str` -> `varchar(n)` with a length, `text` otherwise
    /// - `Bool` -> `tinyint(1)`, `Int` -> `int unsigned`, `Float` -> `double`
    /// - `DateTime` -> `datetime`
    /// - `Raw`: an `unsigned` qualifier is stripped before translation and
    ///   re-appended after; `varchar`/`tinyint` keep their length suffix;
    ///   anything else passes through unchanged
    pub fn resolve_type(&self) -> String {
        match self.effective_type() {
            SemanticType::Str => self.sized_string_type(),
            SemanticType::Bool => "tinyint(1)".to_string(),
            SemanticType::Int => "int unsigned".to_string(),
            SemanticType::Float => "double".to_string(),
            SemanticType::DateTime => "datetime".to_string(),
            SemanticType::Raw(raw) => self.resolve_raw_type(&raw),
        }
    }

    fn sized_string_type(&self) -> String {
        match self.length {
            Some(length) => format!("varchar({})", length),
            None => "text".to_string(),
        }
    }

    fn resolve_raw_type(&self, raw: &str) -> String {
        let is_unsigned = raw.contains("unsigned");
        let base = if is_unsigned {
            raw.replace("unsigned", "").trim().to_string()
        } else {
            raw.to_string()
        };

        let mut resolved = match base.as_str() {
            "string" => self.sized_string_type(),
            "bool" => "tinyint(1)".to_string(),
            "int" => "int unsigned".to_string(),
            "float" => "double".to_string(),
            "varchar" | "tinyint" => match self.length {
                Some(length) => format!("{}({})", base, length),
                None => base,
            },
            _ => base,
        };

        if is_unsigned && !resolved.ends_with("unsigned") {
            resolved.push_str(" unsigned");
        }
        resolved
    }

    /// Renders the column-definition fragment for DDL.
    ///
    /// Order: name, type, `DEFAULT`, nullability, `UNIQUE`,
    /// `AUTO_INCREMENT`, `PRIMARY KEY`, `COMMENT`. Primary columns never
    /// render nullability or `UNIQUE` (primary implies not-null).
    pub fn render_definition(&self) -> String {
        let mut definition = format!("{} {}", self.name, self.resolve_type());

        if let Some(default) = &self.default {
            definition.push_str(&format!(" DEFAULT {}", default.render_literal()));
        }

        if !self.is_primary() {
            if self.is_required() {
                definition.push_str(" NOT");
            }
            definition.push_str(" NULL");
            if self.is_unique() {
                definition.push_str(" UNIQUE");
            }
        }

        if self.is_auto_generate() {
            definition.push_str(" AUTO_INCREMENT");
        }
        if self.is_primary() {
            definition.push_str(" PRIMARY KEY");
        }
        if !self.comment.is_empty() {
            definition.push_str(&format!(" COMMENT '{}'", self.comment));
        }

        definition
    }

    /// Renders the FOREIGN KEY constraint for this column, when it
    /// references another entity whose primary key is resolvable.
    pub fn constraint(&self, table_name: &str) -> Option<String> {
        let foreign = self.foreign.as_ref()?;
        let (foreign_table, foreign_primary) = foreign.target();
        let foreign_primary = foreign_primary?;

        Some(format!(
            "CONSTRAINT {}_{}_{}_fk FOREIGN KEY ({}) REFERENCES {} ({})",
            table_name, foreign_table, foreign_primary, self.name, foreign_table, foreign_primary
        ))
    }

    /// Returns the conventional `<table>_<foreign_table>_<foreign_pk>_fk`
    /// constraint name for this column's reference.
    pub fn foreign_key_name(&self, table_name: &str) -> Option<String> {
        let foreign = self.foreign.as_ref()?;
        let (foreign_table, foreign_primary) = foreign.target();
        let foreign_primary = foreign_primary?;

        Some(format!("{}_{}_{}_fk", table_name, foreign_table, foreign_primary))
    }

    /// Reads the column value from the entity without invoking accessors
    /// beyond the declared getter.
    ///
    /// # Behavior
    /// - empty strings on non-required columns become `Null`
    /// - datetime values are formatted into the canonical string form
    pub fn value_of(&self, entity: &E) -> Value {
        let mut value = self.accessor.get(entity);

        if !self.is_required() {
            if let Value::String(s) = &value {
                if s.is_empty() {
                    value = Value::Null;
                }
            }
        }

        if self.effective_type() == SemanticType::DateTime {
            if let Value::DateTime(dt) = value {
                value = Value::String(dt.format(DATETIME_FORMAT).to_string());
            }
        }

        value
    }

    /// The raw field value, unformatted. Dirty tracking compares these.
    pub(crate) fn raw_value(&self, entity: &E) -> Value {
        self.accessor.get(entity)
    }

    /// Writes a raw value into the entity field.
    ///
    /// `Null` and values the field cannot represent are discarded silently,
    /// leaving the field at its current (template) value.
    pub fn set_value(&self, entity: &mut E, value: Value) {
        if value.is_null() {
            return;
        }
        self.accessor.set(entity, value);
    }
}

impl<E: Entity> Column<E> {
    /// Snapshots the field's current value as its new clean baseline.
    /// Required after changes land in the database.
    pub fn flush_value(&self, entity: &mut E) {
        let value = self.accessor.get(entity);
        entity.state_mut().record(self.property, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityState;

    #[derive(Debug, Clone, Default)]
    struct Sample {
        id: i64,
        title: Option<String>,
        price: f64,
        state: EntityState,
    }

    impl Entity for Sample {
        fn table_name() -> &'static str {
            "sample"
        }

        fn columns() -> Vec<Column<Self>> {
            vec![
                Column::new("id", flag::PRIMARY | flag::AUTO_GENERATE, |s: &Sample| s.id, |s, v| s.id = v),
                Column::new("title", 0, |s: &Sample| s.title.clone(), |s, v| s.title = v),
                Column::new("price", 0, |s: &Sample| s.price, |s, v| s.price = v),
            ]
        }

        fn state(&self) -> &EntityState {
            &self.state
        }

        fn state_mut(&mut self) -> &mut EntityState {
            &mut self.state
        }
    }

    fn id_column() -> Column<Sample> {
        let mut column = Column::new("id", flag::PRIMARY | flag::AUTO_GENERATE, |s: &Sample| s.id, |s, v| s.id = v);
        column.set_name("id".to_string());
        column.resolve_semantic_type();
        column
    }

    #[test]
    fn flags_are_reported() {
        let column = id_column();
        assert!(column.is_primary());
        assert!(column.is_auto_generate());
        assert!(!column.is_required());
        assert!(!column.is_unique());
        assert!(!column.is_indexed());
    }

    #[test]
    fn resolve_type_is_pure_and_deterministic() {
        let column = id_column();
        assert_eq!(column.resolve_type(), column.resolve_type());
        assert_eq!(column.resolve_type(), "int unsigned");
    }

    #[test]
    fn resolve_type_for_strings_depends_on_length() {
        let mut with_length = Column::new("title", 0, |s: &Sample| s.title.clone(), |s, v| s.title = v)
            .with_length(255);
        with_length.set_name("title".to_string());
        assert_eq!(with_length.resolve_type(), "varchar(255)");

        let mut without = Column::new("title", 0, |s: &Sample| s.title.clone(), |s, v| s.title = v);
        without.set_name("title".to_string());
        assert_eq!(without.resolve_type(), "text");
    }

    #[test]
    fn resolve_type_translates_raw_with_unsigned() {
        let column = Column::new("price", 0, |s: &Sample| s.price, |s, v| s.price = v)
            .with_type(SemanticType::Raw("bigint unsigned".to_string()));
        assert_eq!(column.resolve_type(), "bigint unsigned");

        let column = Column::new("price", 0, |s: &Sample| s.price, |s, v| s.price = v)
            .with_type(SemanticType::Raw("tinyint".to_string()))
            .with_length(4);
        assert_eq!(column.resolve_type(), "tinyint(4)");
    }

    #[test]
    fn float_maps_to_double() {
        let column = Column::new("price", 0, |s: &Sample| s.price, |s, v| s.price = v);
        assert_eq!(column.resolve_type(), "double");
    }

    #[test]
    fn render_definition_orders_fragments() {
        let mut column = Column::new("title", flag::REQUIRED | flag::UNIQUE, |s: &Sample| s.title.clone(), |s, v| s.title = v)
            .with_length(100)
            .with_default("untitled")
            .with_comment("display name");
        column.set_name("title".to_string());

        assert_eq!(
            column.render_definition(),
            "title varchar(100) DEFAULT 'untitled' NOT NULL UNIQUE COMMENT 'display name'"
        );
    }

    #[test]
    fn primary_column_skips_nullability() {
        let column = id_column();
        assert_eq!(column.render_definition(), "id int unsigned AUTO_INCREMENT PRIMARY KEY");
    }

    #[test]
    fn nullable_column_renders_plain_null() {
        let mut column = Column::new("title", 0, |s: &Sample| s.title.clone(), |s, v| s.title = v);
        column.set_name("title".to_string());
        assert_eq!(column.render_definition(), "title text NULL");
    }

    #[test]
    fn empty_string_becomes_null_on_non_required() {
        let mut column = Column::new("title", 0, |s: &Sample| s.title.clone(), |s, v| s.title = v);
        column.set_name("title".to_string());

        let sample = Sample { title: Some(String::new()), ..Sample::default() };
        assert_eq!(column.value_of(&sample), Value::Null);

        let sample = Sample { title: Some("x".to_string()), ..Sample::default() };
        assert_eq!(column.value_of(&sample), Value::from("x"));
    }

    #[test]
    fn required_column_keeps_empty_string() {
        let mut column = Column::new("title", flag::REQUIRED, |s: &Sample| s.title.clone(), |s, v| s.title = v);
        column.set_name("title".to_string());

        let sample = Sample { title: Some(String::new()), ..Sample::default() };
        assert_eq!(column.value_of(&sample), Value::from(""));
    }

    #[test]
    fn set_value_discards_null() {
        let column = id_column();
        let mut sample = Sample { id: 9, ..Sample::default() };
        column.set_value(&mut sample, Value::Null);
        assert_eq!(sample.id, 9);
    }

    #[test]
    fn flush_value_records_baseline() {
        let column = id_column();
        let mut sample = Sample { id: 5, ..Sample::default() };
        column.flush_value(&mut sample);
        assert_eq!(sample.state().prior("id"), Some(&Value::I64(5)));
    }

    #[test]
    fn foreign_key_rendering() {
        let mut column = Column::new("sample_id", 0, |s: &Sample| s.id, |s, v| s.id = v)
            .references::<Sample>();
        column.set_name("sample_id".to_string());

        assert_eq!(
            column.foreign_key_name("order"),
            Some("order_sample_id_fk".to_string())
        );
        assert_eq!(
            column.constraint("order"),
            Some("CONSTRAINT order_sample_id_fk FOREIGN KEY (sample_id) REFERENCES sample (id)".to_string())
        );
    }
}
