//! Per-entity persistence gateways.
//!
//! A [`Repository`] binds one entity type to one connection: it renders
//! criteria into parameterized SELECTs, hydrates result rows through the
//! table descriptor, batch-loads join columns, and issues structured
//! writes for create/update/delete.

mod criteria;
mod find_options;
mod repository;

pub use criteria::*;
pub use find_options::*;
pub use repository::*;
