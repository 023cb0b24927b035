//! Schema metadata: versioned snapshots, the cache that serves them, and a
//! DDL-driven builder

mod builder;
mod cache;
mod snapshot;

pub use builder::SnapshotBuilder;
pub use cache::{MetadataCache, SharedMetadataCache};
pub use snapshot::{
    ColumnMeta, ConnectionKey, IndexMeta, MetadataSnapshot, SchemaDraft, SchemaMeta, TableKind,
    TableMeta,
};
