//! # Tablemap - Metadata-Driven Object-Relational Mapping
//!
//! Tablemap is a lightweight object-relational mapping core written in Rust.
//! It maps plain structs to database tables through declarative column
//! metadata, tracks which fields changed since the last database round
//! trip, and persists through driver-agnostic repositories.
//!
//! ## Key Features
//!
//! - **Declarative Metadata**: Columns, join columns, and indexes declared
//!   per entity type and discovered once through a registry
//! - **Dirty Tracking**: Entities snapshot their flushed values; writes
//!   touch only the columns that actually changed
//! - **Composable Queries**: A query builder accumulates SELECT parts and
//!   renders deterministic SQL with positional placeholders
//! - **Repositories**: Typed find/create/update/delete/upsert per entity,
//!   with criteria translation and stable table aliasing
//! - **Batched Relations**: Join columns and related entities load with
//!   one query per target table, never one per row
//! - **Driver Agnostic**: Repositories depend on a small connection
//!   contract; an in-memory implementation ships for tests
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tablemap::connection::MemoryConnection;
//! use tablemap::metadata::MetadataRegistry;
//! use tablemap::repository::{Criteria, FindOptions, Repository};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Arc::new(MemoryConnection::new());
//! let registry = MetadataRegistry::new();
//!
//! // User implements the Entity trait, declaring its columns
//! let users: Repository<User, _> = Repository::new(db, &registry);
//!
//! let mut user = users.table().fresh_entity();
//! user.name = "John Doe".to_string();
//! users.create(&mut user)?;
//!
//! let found = users.find_one_by(&Criteria::new().eq("name", "John Doe"))?;
//! let all = users.find_all(&Criteria::new(), &FindOptions::new())?;
//! # Ok(())
//! # }
//! ```

pub mod collection;
pub mod common;
pub mod connection;
pub mod entity;
pub mod errors;
pub mod metadata;
pub mod query;
pub mod repository;
