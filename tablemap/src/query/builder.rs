use crate::common::{SortOrder, Value};

/// Accumulates the parts of one SELECT statement and renders the final SQL.
///
/// # Purpose
/// Repositories assemble queries incrementally: select expressions, a
/// single aliased FROM table, WHERE fragments with `?` placeholders, group
/// and order clauses, an optional limit window, and the bound argument
/// list. Rendering is deterministic given the accumulated parts.
///
/// # Characteristics
/// - WHERE fragments are joined with `AND` in insertion order
/// - arguments are bound in insertion order, which must match the order
///   placeholders appear in the rendered SQL
/// - cloning yields a fully independent builder; derived queries (such as
///   a COUNT over the same criteria) clone and then diverge
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    select: Vec<(String, Option<String>)>,
    from: Option<(String, String)>,
    wheres: Vec<String>,
    group_by: Vec<String>,
    order_by: Vec<(String, SortOrder)>,
    limit: Option<(u64, u64)>,
    arguments: Vec<Value>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        QueryBuilder::default()
    }

    /// Adds a select expression.
    pub fn add_select(&mut self, expression: &str) -> &mut Self {
        self.select.push((expression.to_string(), None));
        self
    }

    /// Adds a select expression with an `AS` alias.
    pub fn add_select_as(&mut self, expression: &str, alias: &str) -> &mut Self {
        self.select
            .push((expression.to_string(), Some(alias.to_string())));
        self
    }

    /// Sets the FROM table and its alias. A second call replaces the first.
    pub fn add_from(&mut self, table: &str, alias: &str) -> &mut Self {
        self.from = Some((table.to_string(), alias.to_string()));
        self
    }

    /// Adds a WHERE fragment. Fragments are joined with `AND`.
    pub fn add_where(&mut self, condition: &str) -> &mut Self {
        self.wheres.push(condition.to_string());
        self
    }

    pub fn add_group_by(&mut self, expression: &str) -> &mut Self {
        self.group_by.push(expression.to_string());
        self
    }

    pub fn add_order_by(&mut self, expression: &str, order: SortOrder) -> &mut Self {
        self.order_by.push((expression.to_string(), order));
        self
    }

    /// Sets the limit window: row count plus starting offset.
    pub fn set_limit(&mut self, count: u64, offset: u64) -> &mut Self {
        self.limit = Some((count, offset));
        self
    }

    /// Appends one bound argument. Call in placeholder order.
    pub fn set_argument(&mut self, value: impl Into<Value>) -> &mut Self {
        self.arguments.push(value.into());
        self
    }

    pub fn remove_select(&mut self) -> &mut Self {
        self.select.clear();
        self
    }

    pub fn remove_group_by(&mut self) -> &mut Self {
        self.group_by.clear();
        self
    }

    pub fn remove_order_by(&mut self) -> &mut Self {
        self.order_by.clear();
        self
    }

    pub fn remove_limit(&mut self) -> &mut Self {
        self.limit = None;
        self
    }

    /// The bound arguments, in insertion order.
    pub fn arguments(&self) -> &[Value] {
        &self.arguments
    }

    /// Renders the accumulated parts into a SELECT statement.
    pub fn query_string(&self) -> String {
        let mut sql = String::from("SELECT ");

        if self.select.is_empty() {
            sql.push('*');
        } else {
            let columns: Vec<String> = self
                .select
                .iter()
                .map(|(expression, alias)| match alias {
                    Some(alias) => format!("{} AS {}", expression, alias),
                    None => expression.clone(),
                })
                .collect();
            sql.push_str(&columns.join(", "));
        }

        if let Some((table, alias)) = &self.from {
            sql.push_str(&format!(" FROM {} {}", table, alias));
        }

        if !self.wheres.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.wheres.join(" AND "));
        }

        if !self.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.group_by.join(", "));
        }

        if !self.order_by.is_empty() {
            let orders: Vec<String> = self
                .order_by
                .iter()
                .map(|(expression, order)| format!("{} {}", expression, order.as_sql()))
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&orders.join(", "));
        }

        if let Some((count, offset)) = self.limit {
            sql.push_str(&format!(" LIMIT {}", count));
            if offset > 0 {
                sql.push_str(&format!(" OFFSET {}", offset));
            }
        }

        sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_full_statement() {
        let mut builder = QueryBuilder::new();
        builder
            .add_select("o.*")
            .add_select_as("o.created_at", "placed_at")
            .add_from("orders", "o")
            .add_where("o.status = ?")
            .add_where("o.total > ?")
            .add_group_by("o.id")
            .add_order_by("o.created_at", SortOrder::Descending)
            .set_limit(10, 20)
            .set_argument("open")
            .set_argument(100);

        assert_eq!(
            builder.query_string(),
            "SELECT o.*, o.created_at AS placed_at FROM orders o \
             WHERE o.status = ? AND o.total > ? \
             GROUP BY o.id ORDER BY o.created_at DESC LIMIT 10 OFFSET 20"
        );
        assert_eq!(builder.arguments(), &[Value::from("open"), Value::from(100)]);
    }

    #[test]
    fn placeholder_and_argument_counts_match() {
        let mut builder = QueryBuilder::new();
        builder
            .add_from("t", "t")
            .add_where("t.a = ?")
            .add_where("t.b IN (?, ?, ?)")
            .set_argument(1)
            .set_argument(2)
            .set_argument(3)
            .set_argument(4);

        let placeholders = builder.query_string().matches('?').count();
        assert_eq!(placeholders, builder.arguments().len());
    }

    #[test]
    fn empty_select_renders_star() {
        let mut builder = QueryBuilder::new();
        builder.add_from("t", "t");
        assert_eq!(builder.query_string(), "SELECT * FROM t t");
    }

    #[test]
    fn offset_zero_is_omitted() {
        let mut builder = QueryBuilder::new();
        builder.add_from("t", "t").set_limit(5, 0);
        assert_eq!(builder.query_string(), "SELECT * FROM t t LIMIT 5");
    }

    #[test]
    fn removers_reset_clauses() {
        let mut builder = QueryBuilder::new();
        builder
            .add_select("t.*")
            .add_from("t", "t")
            .add_group_by("t.id")
            .add_order_by("t.id", SortOrder::Ascending)
            .set_limit(1, 0);

        builder
            .remove_select()
            .remove_group_by()
            .remove_order_by()
            .remove_limit()
            .add_select("COUNT(t.id)");

        assert_eq!(builder.query_string(), "SELECT COUNT(t.id) FROM t t");
    }

    #[test]
    fn clone_is_independent() {
        let mut original = QueryBuilder::new();
        original.add_from("t", "t").add_where("t.a = ?").set_argument(1);

        let mut derived = original.clone();
        derived.remove_select().add_select("COUNT(t.id)").remove_limit();
        derived.add_where("t.b = ?").set_argument(2);

        assert_eq!(original.query_string(), "SELECT * FROM t t WHERE t.a = ?");
        assert_eq!(original.arguments().len(), 1);
        assert_eq!(derived.arguments().len(), 2);
    }
}
