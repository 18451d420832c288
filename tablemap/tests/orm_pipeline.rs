#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDateTime;
    use tablemap::collection::EntityCollection;
    use tablemap::common::{parse_datetime, SortOrder, Value};
    use tablemap::connection::{MemoryConnection, Row, Statement};
    use tablemap::entity::{Entity, EntityState};
    use tablemap::errors::ErrorKind;
    use tablemap::metadata::{flag, Column, JoinColumn, MetadataRegistry};
    use tablemap::repository::{sort_by, Criteria, FindOptions, Repository};

    #[ctor::ctor]
    fn init() {
        colog::init();
    }

    #[derive(Debug, Clone, Default)]
    struct Customer {
        id: Option<i64>,
        name: String,
        email: Option<String>,
        active: bool,
        created_at: Option<NaiveDateTime>,
        state: EntityState,
    }

    impl Entity for Customer {
        fn table_name() -> &'static str {
            "customer"
        }

        fn columns() -> Vec<Column<Self>> {
            vec![
                Column::new("id", flag::PRIMARY | flag::AUTO_GENERATE, |c: &Customer| c.id, |c, v| c.id = v),
                Column::new("name", flag::REQUIRED, |c: &Customer| c.name.clone(), |c, v| c.name = v)
                    .with_length(100),
                Column::new("email", 0, |c: &Customer| c.email.clone(), |c, v| c.email = v),
                Column::new("active", 0, |c: &Customer| c.active, |c, v| c.active = v),
                Column::new("createdAt", 0, |c: &Customer| c.created_at, |c, v| c.created_at = v),
            ]
        }

        fn state(&self) -> &EntityState {
            &self.state
        }

        fn state_mut(&mut self) -> &mut EntityState {
            &mut self.state
        }
    }

    #[derive(Debug, Clone, Default)]
    struct Order {
        id: Option<i64>,
        customer_id: Option<i64>,
        total: f64,
        customer_name: Option<String>,
        state: EntityState,
    }

    impl Entity for Order {
        fn table_name() -> &'static str {
            "customer_order"
        }

        fn columns() -> Vec<Column<Self>> {
            vec![
                Column::new("id", flag::PRIMARY | flag::AUTO_GENERATE, |o: &Order| o.id, |o, v| o.id = v),
                Column::new("customerId", flag::INDEXED, |o: &Order| o.customer_id, |o, v| o.customer_id = v)
                    .references::<Customer>(),
                Column::new("total", flag::REQUIRED, |o: &Order| o.total, |o, v| o.total = v),
            ]
        }

        fn join_columns() -> Vec<JoinColumn<Self>> {
            vec![JoinColumn::new(
                "customerName",
                "customer",
                "name",
                "id",
                |o: &Order| o.customer_name.clone(),
                |o, v| o.customer_name = v,
            )
            .with_ref_column("customer_id")]
        }

        fn state(&self) -> &EntityState {
            &self.state
        }

        fn state_mut(&mut self) -> &mut EntityState {
            &mut self.state
        }
    }

    #[derive(Debug, Clone, Default)]
    struct Ticket {
        ticket_id: Option<i64>,
        seat: String,
        venue_name: Option<String>,
        state: EntityState,
    }

    impl Entity for Ticket {
        fn table_name() -> &'static str {
            "ticket"
        }

        fn columns() -> Vec<Column<Self>> {
            vec![
                Column::new("ticketId", flag::PRIMARY | flag::AUTO_GENERATE, |t: &Ticket| t.ticket_id, |t, v| t.ticket_id = v),
                Column::new("seat", flag::REQUIRED, |t: &Ticket| t.seat.clone(), |t, v| t.seat = v),
            ]
        }

        fn join_columns() -> Vec<JoinColumn<Self>> {
            // no explicit reference column: the owning primary key is used
            vec![JoinColumn::new(
                "venueName",
                "venue",
                "name",
                "id",
                |t: &Ticket| t.venue_name.clone(),
                |t, v| t.venue_name = v,
            )]
        }

        fn state(&self) -> &EntityState {
            &self.state
        }

        fn state_mut(&mut self) -> &mut EntityState {
            &mut self.state
        }
    }

    fn row(pairs: &[(&str, Value)]) -> Row {
        let mut row = Row::new();
        for (k, v) in pairs {
            row.insert(k.to_string(), v.clone());
        }
        row
    }

    fn customer_repo(db: &Arc<MemoryConnection>) -> Repository<Customer, MemoryConnection> {
        Repository::new(db.clone(), &MetadataRegistry::new())
    }

    fn order_repo(db: &Arc<MemoryConnection>) -> Repository<Order, MemoryConnection> {
        Repository::new(db.clone(), &MetadataRegistry::new())
    }

    #[test]
    fn create_skips_empty_optional_and_writes_back_generated_key() {
        let db = Arc::new(MemoryConnection::new());
        let repo = customer_repo(&db);

        let mut customer = repo.table().fresh_entity();
        customer.name = "Ada".to_string();
        customer.email = Some(String::new());
        customer.active = true;

        repo.create(&mut customer).unwrap();

        // generated key written back, entity clean afterwards
        assert_eq!(customer.id, Some(1));
        assert!(repo.table().modified_columns(&customer).is_empty());

        let statements = db.statements();
        assert_eq!(statements.len(), 1);
        match &statements[0] {
            Statement::Insert { table, data } => {
                assert_eq!(table, "customer");
                // empty optional email collapses to null and is not written
                assert!(data.contains_key("name"));
                assert!(data.contains_key("active"));
                assert!(!data.contains_key("email"));
                assert!(!data.contains_key("id"));
            }
            other => panic!("expected insert, got {:?}", other),
        }
    }

    #[test]
    fn create_then_find_round_trips_scalar_columns() {
        let db = Arc::new(MemoryConnection::new());
        let repo = customer_repo(&db);
        let created = parse_datetime("2024-05-01 10:15:30").unwrap();

        let mut customer = repo.table().fresh_entity();
        customer.name = "Ada".to_string();
        customer.email = Some("ada@example.com".to_string());
        customer.active = true;
        customer.created_at = Some(created);
        repo.create(&mut customer).unwrap();

        // datetime travels in the canonical second-precision form
        match &db.statements()[0] {
            Statement::Insert { data, .. } => {
                assert_eq!(data.get("created_at"), Some(&Value::from("2024-05-01 10:15:30")));
            }
            other => panic!("expected insert, got {:?}", other),
        }

        db.push_result(vec![row(&[
            ("id", Value::I64(1)),
            ("name", Value::from("Ada")),
            ("email", Value::from("ada@example.com")),
            ("active", Value::Bool(true)),
            ("created_at", Value::from("2024-05-01 10:15:30")),
        ])]);
        let found = repo.find(1, false).unwrap();

        assert_eq!(found.id, customer.id);
        assert_eq!(found.name, customer.name);
        assert_eq!(found.email, customer.email);
        assert_eq!(found.active, customer.active);
        assert_eq!(found.created_at, Some(created));
    }

    #[test]
    fn in_criteria_renders_deduplicated_placeholders_in_order() {
        let db = Arc::new(MemoryConnection::new());
        let repo = customer_repo(&db);

        let criteria = Criteria::new().within(
            "id",
            vec![Value::I64(3), Value::I64(1), Value::I64(3), Value::I64(2)],
        );
        let result = repo.find_all(&criteria, &FindOptions::new()).unwrap();
        assert!(result.is_empty());

        let statements = db.statements();
        assert_eq!(statements.len(), 1);
        match &statements[0] {
            Statement::Prepared { sql, args } => {
                assert!(sql.contains("c.id IN (?, ?, ?)"), "unexpected sql: {}", sql);
                // first occurrence wins, argument order matches placeholders
                assert_eq!(args, &vec![Value::I64(3), Value::I64(1), Value::I64(2)]);
            }
            other => panic!("expected prepared query, got {:?}", other),
        }
    }

    #[test]
    fn empty_in_list_is_skipped() {
        let db = Arc::new(MemoryConnection::new());
        let repo = customer_repo(&db);

        let criteria = Criteria::new().within("id", Vec::new()).eq("name", "Ada");
        repo.find_all(&criteria, &FindOptions::new()).unwrap();

        match &db.statements()[0] {
            Statement::Prepared { sql, args } => {
                assert!(!sql.contains("IN"), "unexpected sql: {}", sql);
                assert!(sql.contains("c.name = ?"));
                assert_eq!(args, &vec![Value::from("Ada")]);
            }
            other => panic!("expected prepared query, got {:?}", other),
        }
    }

    #[test]
    fn update_without_primary_key_fails_before_reaching_the_driver() {
        let db = Arc::new(MemoryConnection::new());
        let repo = customer_repo(&db);

        let mut customer = repo.table().fresh_entity();
        customer.name = "Grace".to_string();

        let err = repo.update(&mut customer).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PreconditionError);
        assert!(db.statements().is_empty());
    }

    #[test]
    fn update_with_no_changes_is_a_no_op() {
        let db = Arc::new(MemoryConnection::new());
        let repo = customer_repo(&db);

        let mut customer = repo.table().fresh_entity();
        customer.id = Some(7);
        customer.name = "Grace".to_string();
        repo.table().flush(&mut customer);

        repo.update(&mut customer).unwrap();
        assert!(db.statements().is_empty());
    }

    #[test]
    fn update_writes_only_modified_columns_keyed_by_primary() {
        let db = Arc::new(MemoryConnection::new());
        let repo = customer_repo(&db);

        let mut customer = repo.table().fresh_entity();
        customer.id = Some(7);
        customer.name = "Grace".to_string();
        customer.active = true;
        repo.table().flush(&mut customer);

        customer.name = "Grace Hopper".to_string();
        repo.update(&mut customer).unwrap();

        match &db.statements()[0] {
            Statement::Update { table, data, criteria } => {
                assert_eq!(table, "customer");
                assert_eq!(data.len(), 1);
                assert_eq!(data.get("name"), Some(&Value::from("Grace Hopper")));
                assert_eq!(criteria.get("id"), Some(&Value::I64(7)));
            }
            other => panic!("expected update, got {:?}", other),
        }
        assert!(repo.table().modified_columns(&customer).is_empty());
    }

    #[test]
    fn find_one_by_reports_not_found() {
        let db = Arc::new(MemoryConnection::new());
        let repo = customer_repo(&db);

        let err = repo
            .find_one_by(&Criteria::new().eq("name", "nobody"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.message(), "No data found");
    }

    #[test]
    fn find_caches_by_primary_key() {
        let db = Arc::new(MemoryConnection::new());
        let repo = customer_repo(&db);
        db.push_result(vec![row(&[
            ("id", Value::I64(5)),
            ("name", Value::from("Ada")),
        ])]);

        let first = repo.find(5, true).unwrap();
        assert_eq!(first.name, "Ada");
        assert_eq!(db.statements().len(), 1);

        // second lookup is served from the cache
        let second = repo.find(5, true).unwrap();
        assert_eq!(second.name, "Ada");
        assert_eq!(db.statements().len(), 1);

        // bypassing the cache queries again
        db.push_result(vec![row(&[
            ("id", Value::I64(5)),
            ("name", Value::from("Ada")),
        ])]);
        repo.find(5, false).unwrap();
        assert_eq!(db.statements().len(), 2);
    }

    #[test]
    fn find_all_with_total_counts_before_limiting() {
        let db = Arc::new(MemoryConnection::new());
        let repo = customer_repo(&db);

        // count query result, then the limited page
        db.push_result(vec![row(&[("total", Value::I64(120))])]);
        db.push_result(vec![
            row(&[("id", Value::I64(1)), ("name", Value::from("Ada"))]),
            row(&[("id", Value::I64(2)), ("name", Value::from("Grace"))]),
        ]);

        let options = sort_by("name", SortOrder::Ascending).limit(2).offset(4).with_total();
        let found = repo.find_all(&Criteria::new().eq("active", true), &options).unwrap();

        assert_eq!(found.len(), 2);
        assert_eq!(found.total(), Some(120));

        let statements = db.statements();
        assert_eq!(statements.len(), 2);
        match &statements[0] {
            Statement::Prepared { sql, .. } => {
                assert!(sql.starts_with("SELECT COUNT(c.id)"), "unexpected sql: {}", sql);
                assert!(!sql.contains("LIMIT"));
            }
            other => panic!("expected prepared count, got {:?}", other),
        }
        match &statements[1] {
            Statement::Prepared { sql, .. } => {
                assert!(sql.contains("ORDER BY c.name ASC"), "unexpected sql: {}", sql);
                assert!(sql.ends_with("LIMIT 2 OFFSET 4"), "unexpected sql: {}", sql);
            }
            other => panic!("expected prepared page, got {:?}", other),
        }
    }

    #[test]
    fn join_columns_load_in_one_query_per_target_table() {
        let db = Arc::new(MemoryConnection::new());
        let repo = order_repo(&db);

        // 50 orders spread over three customers
        let mut order_rows = Vec::new();
        for i in 0..50i64 {
            order_rows.push(row(&[
                ("id", Value::I64(i + 1)),
                ("customer_id", Value::I64(i % 3 + 1)),
                ("total", Value::F64(10.0 + i as f64)),
            ]));
        }
        db.push_result(order_rows);
        db.push_result(vec![
            row(&[("customer_id", Value::I64(1)), ("customer_name", Value::from("Ada"))]),
            row(&[("customer_id", Value::I64(2)), ("customer_name", Value::from("Grace"))]),
            row(&[("customer_id", Value::I64(3)), ("customer_name", Value::from("Edsger"))]),
        ]);

        let orders = repo.find_all(&Criteria::new(), &FindOptions::new()).unwrap();
        assert_eq!(orders.len(), 50);

        // one main query plus exactly one batch query, regardless of row count
        let statements = db.statements();
        assert_eq!(statements.len(), 2);
        match &statements[1] {
            Statement::Prepared { sql, args } => {
                assert!(sql.contains("FROM customer c"), "unexpected sql: {}", sql);
                assert!(sql.contains("c.id IN (?, ?, ?)"), "unexpected sql: {}", sql);
                assert!(sql.contains("c.name AS customer_name"), "unexpected sql: {}", sql);
                assert_eq!(args.len(), 3);
            }
            other => panic!("expected prepared join batch, got {:?}", other),
        }

        let first = orders.first().unwrap();
        assert_eq!(first.customer_name.as_deref(), Some("Ada"));
        let second = orders.get(1).unwrap();
        assert_eq!(second.customer_name.as_deref(), Some("Grace"));
    }

    #[test]
    fn join_reference_defaults_to_owning_primary_key() {
        let db = Arc::new(MemoryConnection::new());
        let repo: Repository<Ticket, _> = Repository::new(db.clone(), &MetadataRegistry::new());

        db.push_result(vec![
            row(&[("ticket_id", Value::I64(1)), ("seat", Value::from("A1"))]),
            row(&[("ticket_id", Value::I64(2)), ("seat", Value::from("B2"))]),
        ]);
        db.push_result(vec![
            row(&[("ticket_id", Value::I64(1)), ("venue_name", Value::from("Royal Albert Hall"))]),
            row(&[("ticket_id", Value::I64(2)), ("venue_name", Value::from("Blue Note"))]),
        ]);

        let tickets = repo.find_all(&Criteria::new(), &FindOptions::new()).unwrap();
        assert_eq!(tickets.len(), 2);

        // the batch query runs even though no reference column was declared
        let statements = db.statements();
        assert_eq!(statements.len(), 2);
        match &statements[1] {
            Statement::Prepared { sql, args } => {
                assert!(sql.contains("v.id AS ticket_id"), "unexpected sql: {}", sql);
                assert!(sql.contains("v.name AS venue_name"), "unexpected sql: {}", sql);
                assert!(sql.contains("FROM venue v"), "unexpected sql: {}", sql);
                assert!(sql.contains("v.id IN (?, ?)"), "unexpected sql: {}", sql);
                assert_eq!(args, &vec![Value::I64(1), Value::I64(2)]);
            }
            other => panic!("expected prepared join batch, got {:?}", other),
        }

        assert_eq!(tickets.first().unwrap().venue_name.as_deref(), Some("Royal Albert Hall"));
        assert_eq!(tickets.get(1).unwrap().venue_name.as_deref(), Some("Blue Note"));
    }

    #[test]
    fn negated_criteria_render_not_fragments() {
        let db = Arc::new(MemoryConnection::new());
        let repo = customer_repo(&db);

        let criteria = Criteria::new()
            .ne("name", "Ada")
            .without("id", vec![Value::I64(2), Value::I64(1), Value::I64(2), Value::I64(3)]);
        repo.find_all(&criteria, &FindOptions::new()).unwrap();

        match &db.statements()[0] {
            Statement::Prepared { sql, args } => {
                // declared column order puts the id predicate first
                assert!(sql.contains("c.id NOT IN (?, ?, ?) AND c.name != ?"), "unexpected sql: {}", sql);
                assert_eq!(
                    args,
                    &vec![Value::I64(2), Value::I64(1), Value::I64(3), Value::from("Ada")]
                );
            }
            other => panic!("expected prepared query, got {:?}", other),
        }
    }

    #[test]
    fn update_with_only_primary_modified_issues_no_sql() {
        let db = Arc::new(MemoryConnection::new());
        let repo = customer_repo(&db);

        let mut customer = repo.table().fresh_entity();
        customer.id = Some(7);
        customer.name = "Grace".to_string();
        repo.table().flush(&mut customer);

        customer.id = Some(8);
        repo.update(&mut customer).unwrap();

        // nothing to SET, nothing sent, and the change is not flushed away
        assert!(db.statements().is_empty());
        assert_eq!(repo.table().modified_columns(&customer), vec!["id"]);
    }

    #[test]
    fn save_data_inserts_when_primary_is_absent() {
        let db = Arc::new(MemoryConnection::new());
        let repo = customer_repo(&db);

        let saved = repo
            .save_data(&row(&[("name", Value::from("Ada")), ("active", Value::Bool(true))]))
            .unwrap();

        assert_eq!(saved.id, Some(1));
        assert_eq!(saved.name, "Ada");
        assert!(matches!(db.statements()[0], Statement::Insert { .. }));
    }

    #[test]
    fn save_data_updates_when_primary_matches_existing_row() {
        let db = Arc::new(MemoryConnection::new());
        let repo = customer_repo(&db);

        db.push_result(vec![row(&[
            ("id", Value::I64(9)),
            ("name", Value::from("Ada")),
        ])]);

        let saved = repo
            .save_data(&row(&[("id", Value::I64(9)), ("name", Value::from("Ada Lovelace"))]))
            .unwrap();
        assert_eq!(saved.name, "Ada Lovelace");

        let statements = db.statements();
        assert!(matches!(statements[0], Statement::Prepared { .. }));
        match &statements[1] {
            Statement::Update { data, criteria, .. } => {
                assert_eq!(data.get("name"), Some(&Value::from("Ada Lovelace")));
                assert_eq!(criteria.get("id"), Some(&Value::I64(9)));
            }
            other => panic!("expected update, got {:?}", other),
        }
    }

    #[test]
    fn save_data_inserts_when_primary_matches_nothing() {
        let db = Arc::new(MemoryConnection::new());
        let repo = customer_repo(&db);

        // lookup for id 9 returns no row
        let saved = repo
            .save_data(&row(&[("id", Value::I64(9)), ("name", Value::from("Ada"))]))
            .unwrap();
        assert_eq!(saved.name, "Ada");

        let statements = db.statements();
        assert!(matches!(statements[0], Statement::Prepared { .. }));
        assert!(matches!(statements[1], Statement::Insert { .. }));
    }

    #[test]
    fn delete_targets_the_primary_key() {
        let db = Arc::new(MemoryConnection::new());
        let repo = customer_repo(&db);

        let mut customer = repo.table().fresh_entity();
        customer.id = Some(4);

        repo.delete(&customer).unwrap();
        match &db.statements()[0] {
            Statement::Delete { table, criteria } => {
                assert_eq!(table, "customer");
                assert_eq!(criteria.get("id"), Some(&Value::I64(4)));
            }
            other => panic!("expected delete, got {:?}", other),
        }

        customer.id = None;
        let err = repo.delete(&customer).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PreconditionError);
    }

    #[test]
    fn driver_failures_surface_with_their_kind() {
        let db = Arc::new(MemoryConnection::new());
        let repo = customer_repo(&db);
        db.inject_failure(Some("connection lost"));

        let err = repo.find_all(&Criteria::new(), &FindOptions::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DriverError);
        assert_eq!(err.message(), "connection lost");
    }

    #[test]
    fn preload_fetches_related_entities_in_one_query() {
        let db = Arc::new(MemoryConnection::new());
        let orders = order_repo(&db);
        let customers = customer_repo(&db);

        let mut collection: EntityCollection<Order> = EntityCollection::new();
        for i in 0..10i64 {
            let mut order = orders.table().fresh_entity();
            order.id = Some(i + 1);
            order.customer_id = Some(i % 2 + 1);
            collection.push(order);
        }

        db.push_result(vec![
            row(&[("id", Value::I64(1)), ("name", Value::from("Ada"))]),
            row(&[("id", Value::I64(2)), ("name", Value::from("Grace"))]),
        ]);

        let mut names: Vec<Option<String>> = Vec::new();
        collection
            .preload_with(
                &customers,
                |order| Value::from(order.customer_id),
                |order, customer: Customer| order.customer_name = Some(customer.name.clone()),
            )
            .unwrap();

        for order in &collection {
            names.push(order.customer_name.clone());
        }
        assert_eq!(names[0].as_deref(), Some("Ada"));
        assert_eq!(names[1].as_deref(), Some("Grace"));
        assert_eq!(db.statements().len(), 1);
        match &db.statements()[0] {
            Statement::Prepared { sql, args } => {
                assert!(sql.contains("c.id IN (?, ?)"), "unexpected sql: {}", sql);
                assert_eq!(args, &vec![Value::I64(1), Value::I64(2)]);
            }
            other => panic!("expected prepared query, got {:?}", other),
        }
    }

    #[test]
    fn table_prefix_is_skipped_in_aliases() {
        let db = Arc::new(MemoryConnection::new());
        let registry = MetadataRegistry::new();
        let repo: Repository<Order, _> = Repository::with_table_prefix(db.clone(), &registry, "customer");

        // "customer_order" with the shared prefix skipped aliases to "o"
        assert_eq!(repo.alias(), "o");

        let plain: Repository<Order, _> = Repository::new(db, &registry);
        assert_eq!(plain.alias(), "co");
    }
}
