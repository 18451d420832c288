/// Specifies the direction for sorting query results.
///
/// # Variants
/// - `Ascending`: smallest to largest (A to Z, 0 to 9, oldest to newest)
/// - `Descending`: largest to smallest (Z to A, 9 to 0, newest to oldest)
///
/// # Usage
/// Used with `FindOptions` and the query builder's `add_order_by`:
/// ```text
/// let options = FindOptions::new().sort_by("age", SortOrder::Descending);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Sort in ascending order.
    #[default]
    Ascending,
    /// Sort in descending order.
    Descending,
}

impl SortOrder {
    /// Returns the SQL keyword for this direction.
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        }
    }
}
