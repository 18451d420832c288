//! Table, column, and join-column descriptors plus the registry that builds
//! and caches them per entity type.
//!
//! Descriptors are static metadata: they describe the shape of one mapped
//! table independent of any particular row. They are built once per entity
//! type on first access and cached for the process lifetime.

mod column;
mod join_column;
mod registry;
mod table;

pub use column::*;
pub use join_column::*;
pub use registry::*;
pub use table::*;
