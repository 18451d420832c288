use crate::common::SortOrder;

/// Options controlling sorting, pagination, and total counting for
/// [`Repository::find_all`](crate::repository::Repository::find_all).
///
/// # Usage
/// ```text
/// let options = sort_by("created_at", SortOrder::Descending)
///     .limit(20)
///     .offset(40)
///     .with_total();
/// ```
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    order_by: Vec<(String, SortOrder)>,
    limit: Option<u64>,
    offset: u64,
    with_total: bool,
}

impl FindOptions {
    pub fn new() -> Self {
        FindOptions::default()
    }

    /// Adds a sort field. Repeated calls sort by multiple fields in order.
    pub fn sort_by(mut self, field: &str, order: SortOrder) -> Self {
        self.order_by.push((field.to_string(), order));
        self
    }

    /// Caps the result set at `limit` rows. Zero means unlimited.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = if limit > 0 { Some(limit) } else { None };
        self
    }

    /// Skips the first `offset` rows of the limited window.
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    /// Also counts the rows matching the criteria without the limit
    /// window, exposed through the collection's total.
    pub fn with_total(mut self) -> Self {
        self.with_total = true;
        self
    }

    pub fn order_by(&self) -> &[(String, SortOrder)] {
        &self.order_by
    }

    pub fn get_limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn get_offset(&self) -> u64 {
        self.offset
    }

    pub fn wants_total(&self) -> bool {
        self.with_total
    }
}

/// Creates a [`FindOptions`] sorting by `field`.
pub fn sort_by(field: &str, order: SortOrder) -> FindOptions {
    FindOptions::new().sort_by(field, order)
}

/// Creates a [`FindOptions`] with only a row limit.
pub fn limit(limit: u64) -> FindOptions {
    FindOptions::new().limit(limit)
}
