use std::any::{Any, TypeId};
use std::sync::Arc;

use dashmap::DashMap;

use crate::entity::Entity;
use crate::metadata::TableDescriptor;

/// Process-wide cache of table descriptors, keyed by entity type.
///
/// # Purpose
/// Metadata discovery walks declarations and clones templates, so it runs
/// once per entity type. The registry owns the resulting descriptors and
/// hands out shared references; repositories are constructed against a
/// registry instead of consulting hidden global state.
///
/// # Characteristics
/// - thread safe, lock striping via `DashMap`
/// - a descriptor, once built, lives for the registry's lifetime
#[derive(Debug, Default)]
pub struct MetadataRegistry {
    tables: DashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        MetadataRegistry {
            tables: DashMap::new(),
        }
    }

    /// Returns the cached descriptor for `E`, building it on first access.
    pub fn table<E: Entity>(&self) -> Arc<TableDescriptor<E>> {
        let entry = self
            .tables
            .entry(TypeId::of::<E>())
            .or_insert_with(|| {
                log::debug!("building table metadata for '{}'", E::table_name());
                Arc::new(TableDescriptor::<E>::build()) as Arc<dyn Any + Send + Sync>
            })
            .clone();

        match entry.downcast::<TableDescriptor<E>>() {
            Ok(table) => table,
            Err(_) => {
                // TypeId keying makes this unreachable; rebuild rather than panic
                log::error!(
                    "metadata cache held a mismatched descriptor for '{}'",
                    E::table_name()
                );
                Arc::new(TableDescriptor::<E>::build())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
