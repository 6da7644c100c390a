//! Dataset metadata on top of an external catalog.
//!
//! [`CatalogClient`] is the narrow view of a metastore the provider needs:
//! versioned reads and optimistic writes of whole table records.
//! [`MetadataProvider`] combines a client with the codec and the evolution
//! engine into create / load / update / delete of dataset descriptors.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::catalog::codec::write_custom_properties;
use crate::catalog::evolve::compute_and_apply;
use crate::catalog::properties::COMPRESSION_TYPE;
use crate::catalog::{ColumnDiff, DescriptorCodec, TableRecord};
use crate::descriptor::DatasetDescriptor;
use crate::error::{CatalogError, Error, ProviderError, Result};
use crate::io::resolver::SchemaResolver;

/// A table record together with the catalog version it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedTable {
    pub version: u64,
    pub table: TableRecord,
}

/// Table-level access to an external metadata catalog.
pub trait CatalogClient {
    fn get_table(&self, namespace: &str, name: &str) -> Result<VersionedTable>;

    /// Store a new table. Returns its first version.
    fn create_table(&self, table: TableRecord) -> Result<u64>;

    /// Replace a table if it is still at `expected_version`. Returns the new version.
    fn alter_table(&self, table: TableRecord, expected_version: u64) -> Result<u64>;

    fn drop_table(&self, namespace: &str, name: &str) -> Result<TableRecord>;

    /// Table names in a namespace, sorted.
    fn list_tables(&self, namespace: &str) -> Result<Vec<String>>;

    fn table_exists(&self, namespace: &str, name: &str) -> Result<bool> {
        match self.get_table(namespace, name) {
            Ok(_) => Ok(true),
            Err(Error::Catalog(CatalogError::TableNotFound { .. })) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

type TableKey = (String, String);

/// Process-local catalog, for tests and the console.
///
/// Cheaply clonable; clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    tables: Arc<RwLock<BTreeMap<TableKey, VersionedTable>>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(namespace: &str, name: &str) -> TableKey {
        (namespace.to_string(), name.to_string())
    }

    fn not_found(namespace: &str, name: &str) -> Error {
        CatalogError::TableNotFound {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
        .into()
    }
}

impl CatalogClient for InMemoryCatalog {
    fn get_table(&self, namespace: &str, name: &str) -> Result<VersionedTable> {
        self.tables
            .read()
            .get(&Self::key(namespace, name))
            .cloned()
            .ok_or_else(|| Self::not_found(namespace, name))
    }

    fn create_table(&self, table: TableRecord) -> Result<u64> {
        let mut tables = self.tables.write();
        let key = Self::key(&table.namespace, &table.name);
        if tables.contains_key(&key) {
            return Err(CatalogError::TableAlreadyExists {
                namespace: table.namespace,
                name: table.name,
            }
            .into());
        }
        tables.insert(key, VersionedTable { version: 1, table });
        Ok(1)
    }

    fn alter_table(&self, table: TableRecord, expected_version: u64) -> Result<u64> {
        let mut tables = self.tables.write();
        let entry = tables
            .get_mut(&Self::key(&table.namespace, &table.name))
            .ok_or_else(|| Self::not_found(&table.namespace, &table.name))?;
        if entry.version != expected_version {
            return Err(CatalogError::VersionMismatch {
                expected: expected_version,
                actual: entry.version,
            }
            .into());
        }
        entry.version += 1;
        entry.table = table;
        Ok(entry.version)
    }

    fn drop_table(&self, namespace: &str, name: &str) -> Result<TableRecord> {
        self.tables
            .write()
            .remove(&Self::key(namespace, name))
            .map(|entry| entry.table)
            .ok_or_else(|| Self::not_found(namespace, name))
    }

    fn list_tables(&self, namespace: &str) -> Result<Vec<String>> {
        Ok(self
            .tables
            .read()
            .keys()
            .filter(|(ns, _)| ns == namespace)
            .map(|(_, name)| name.clone())
            .collect())
    }
}

/// Dataset descriptors stored as catalog tables.
pub struct MetadataProvider<C, R> {
    client: C,
    codec: DescriptorCodec<R>,
    external: bool,
}

impl<C: CatalogClient, R: SchemaResolver> MetadataProvider<C, R> {
    /// A provider that creates managed tables.
    pub fn new(client: C, resolver: R) -> Self {
        Self {
            client,
            codec: DescriptorCodec::new(resolver),
            external: false,
        }
    }

    /// Create external tables instead; they require a data location.
    pub fn with_external(mut self, external: bool) -> Self {
        self.external = external;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn codec(&self) -> &DescriptorCodec<R> {
        &self.codec
    }

    /// Create the table for a new dataset and return the stored record.
    pub fn create(
        &self,
        namespace: &str,
        name: &str,
        descriptor: &DatasetDescriptor,
    ) -> Result<TableRecord> {
        let table = self.codec.encode(namespace, name, descriptor, self.external)?;
        self.client.create_table(table.clone())?;
        info!(
            table = %table.qualified_name(),
            external = self.external,
            columns = table.columns.len(),
            "created dataset"
        );
        Ok(table)
    }

    pub fn load(&self, namespace: &str, name: &str) -> Result<DatasetDescriptor> {
        let VersionedTable { table, .. } = self.client.get_table(namespace, name)?;
        self.codec.decode(&table)
    }

    /// Bring an existing dataset in line with `descriptor`.
    ///
    /// Format, location and partitioning are fixed at creation. Columns are
    /// evolved, compression and custom properties are replaced, and the
    /// result is written back at the version that was read.
    pub fn update(
        &self,
        namespace: &str,
        name: &str,
        descriptor: &DatasetDescriptor,
    ) -> Result<ColumnDiff> {
        let VersionedTable { version, mut table } = self.client.get_table(namespace, name)?;
        let current = self.codec.decode(&table)?;
        check_immutable(namespace, name, &current, descriptor)?;

        let diff = compute_and_apply(&mut table, descriptor)?;
        table
            .properties
            .set(&COMPRESSION_TYPE.key, &descriptor.compression_type());
        write_custom_properties(&mut table.properties, descriptor)?;

        let new_version = self.client.alter_table(table, version)?;
        info!(
            namespace,
            name,
            version = new_version,
            changes = diff.len(),
            "updated dataset"
        );
        Ok(diff)
    }

    /// Drop a dataset's table. Returns false if there was none.
    pub fn delete(&self, namespace: &str, name: &str) -> Result<bool> {
        match self.client.drop_table(namespace, name) {
            Ok(table) => {
                info!(table = %table.qualified_name(), external = table.external, "deleted dataset");
                Ok(true)
            }
            Err(Error::Catalog(CatalogError::TableNotFound { .. })) => {
                debug!(namespace, name, "delete of missing dataset");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    pub fn exists(&self, namespace: &str, name: &str) -> Result<bool> {
        self.client.table_exists(namespace, name)
    }

    pub fn list(&self, namespace: &str) -> Result<Vec<String>> {
        self.client.list_tables(namespace)
    }
}

fn check_immutable(
    namespace: &str,
    name: &str,
    current: &DatasetDescriptor,
    updated: &DatasetDescriptor,
) -> Result<()> {
    let changed = |attribute: &'static str, old: String, new: String| -> Error {
        ProviderError::ImmutableChange {
            namespace: namespace.to_string(),
            name: name.to_string(),
            attribute,
            old,
            new,
        }
        .into()
    };

    if current.format() != updated.format() {
        return Err(changed(
            "format",
            current.format().to_string(),
            updated.format().to_string(),
        ));
    }
    if current.location() != updated.location() {
        let render = |d: &DatasetDescriptor| d.location().map_or("<none>".to_string(), |l| l.to_string());
        return Err(changed("location", render(current), render(updated)));
    }
    if current.partition_strategy() != updated.partition_strategy() {
        let render = |d: &DatasetDescriptor| {
            d.partition_strategy()
                .map_or("<none>".to_string(), |s| s.to_expression())
        };
        return Err(changed("partition strategy", render(current), render(updated)));
    }
    Ok(())
}
