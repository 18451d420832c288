use chrono::NaiveDateTime;
use std::fmt::{Display, Formatter};

/// Canonical wire format for datetime columns.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A scalar value flowing between entities, SQL arguments, and result rows.
///
/// # Purpose
/// `Value` is the single dynamic type used at the boundary between typed
/// entity fields and the untyped rows a connection adapter produces or
/// consumes. Equality is by value, which is what dirty tracking compares.
///
/// # Characteristics
/// - `Null` is the absence of a value (absent row keys hydrate as `Null`)
/// - `DateTime` keeps second precision; the canonical string form is
///   [`DATETIME_FORMAT`]
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    String(String),
    DateTime(NaiveDateTime),
}

/// The static type of a mapped entity field.
///
/// Recorded by the accessor at declaration time and used to resolve a
/// column's semantic type when none was declared explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Int,
    Float,
    Str,
    DateTime,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I64(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F64(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<&NaiveDateTime> {
        match self {
            Value::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    /// Renders the value as a SQL literal for DDL fragments.
    ///
    /// Strings and datetimes are single-quoted, booleans become `1`/`0`,
    /// `Null` renders as `NULL`. Only used for `DEFAULT` clauses; runtime
    /// query values always travel as bound arguments instead.
    pub fn render_literal(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            Value::I64(i) => i.to_string(),
            Value::F64(f) => f.to_string(),
            Value::String(s) => format!("'{}'", s),
            Value::DateTime(dt) => format!("'{}'", dt.format(DATETIME_FORMAT)),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", if *b { "1" } else { "0" }),
            Value::I64(i) => write!(f, "{}", i),
            Value::F64(v) => write!(f, "{}", v),
            Value::String(s) => write!(f, "{}", s),
            Value::DateTime(dt) => write!(f, "{}", dt.format(DATETIME_FORMAT)),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I64(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::I64(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Value::Null,
        }
    }
}

/// Parses a datetime from the canonical `"YYYY-MM-DD HH:MM:SS"` format.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT).ok()
}

/// Conversion between a typed entity field and [`Value`].
///
/// # Purpose
/// Implemented for the built-in field types a mapped column can have. The
/// declaration-time accessor pair is built on top of this trait, replacing
/// the runtime reflection of dynamic ORMs with conversions resolved at
/// registration.
///
/// # Behavior
/// `from_value` is lenient the way loosely-typed drivers are: integers
/// accept booleans and numeric strings, floats accept integers, datetimes
/// accept canonical strings. A conversion that cannot succeed returns
/// `None`, which callers treat as "discard the write".
pub trait FieldValue: Sized {
    const KIND: ValueKind;
    const NULLABLE: bool = false;

    fn into_value(self) -> Value;
    fn from_value(value: Value) -> Option<Self>;
}

impl FieldValue for i64 {
    const KIND: ValueKind = ValueKind::Int;

    fn into_value(self) -> Value {
        Value::I64(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::I64(i) => Some(i),
            Value::Bool(b) => Some(b as i64),
            Value::F64(f) => Some(f as i64),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl FieldValue for f64 {
    const KIND: ValueKind = ValueKind::Float;

    fn into_value(self) -> Value {
        Value::F64(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::F64(f) => Some(f),
            Value::I64(i) => Some(i as f64),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl FieldValue for bool {
    const KIND: ValueKind = ValueKind::Bool;

    fn into_value(self) -> Value {
        Value::Bool(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(b),
            Value::I64(i) => Some(i != 0),
            Value::String(s) => match s.as_str() {
                "" | "0" | "false" => Some(false),
                _ => Some(true),
            },
            _ => None,
        }
    }
}

impl FieldValue for String {
    const KIND: ValueKind = ValueKind::Str;

    fn into_value(self) -> Value {
        Value::String(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s),
            Value::I64(i) => Some(i.to_string()),
            Value::F64(f) => Some(f.to_string()),
            Value::Bool(b) => Some(if b { "1" } else { "0" }.to_string()),
            Value::DateTime(dt) => Some(dt.format(DATETIME_FORMAT).to_string()),
            Value::Null => None,
        }
    }
}

impl FieldValue for NaiveDateTime {
    const KIND: ValueKind = ValueKind::DateTime;

    fn into_value(self) -> Value {
        Value::DateTime(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::DateTime(dt) => Some(dt),
            Value::String(s) => parse_datetime(&s),
            _ => None,
        }
    }
}

impl<T> FieldValue for Option<T>
where
    T: FieldValue,
{
    const KIND: ValueKind = T::KIND;
    const NULLABLE: bool = true;

    fn into_value(self) -> Value {
        match self {
            Some(inner) => inner.into_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}
