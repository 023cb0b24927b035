//! Immutable schema snapshots

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

/// Identifies the database connection a snapshot describes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ConnectionKey(pub String);

impl ConnectionKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }
}

impl std::fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    Table,
    View,
}

/// Column as reported by the server (or declared in DDL)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub name: String,
    /// Data type as text, e.g. `VARCHAR(100)`
    pub data_type: String,
    /// `None` when the source did not say
    pub nullable: Option<bool>,
    pub primary_key: bool,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: None,
            primary_key: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMeta {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

/// Table or view definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMeta {
    pub name: String,
    pub kind: TableKind,
    /// Columns in declaration order
    pub columns: Vec<ColumnMeta>,
    #[serde(default)]
    pub indexes: Vec<IndexMeta>,
}

impl TableMeta {
    pub fn new(name: impl Into<String>, kind: TableKind) -> Self {
        Self {
            name: name.into(),
            kind,
            columns: Vec::new(),
            indexes: Vec::new(),
        }
    }

    /// Get a column by name (case-insensitive)
    pub fn column(&self, name: &str) -> Option<&ColumnMeta> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn column_exists(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// A database schema (namespace)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaMeta {
    pub name: String,
    pub tables: IndexMap<String, TableMeta>,
}

impl SchemaMeta {
    /// Look up a table or view by name (case-insensitive)
    pub fn table(&self, name: &str) -> Option<&TableMeta> {
        self.tables
            .values()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }
}

/// Schema contents before the cache assigns a version. Produced by
/// whatever refreshes metadata (DDL builder, live introspection).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDraft {
    pub default_schema: String,
    pub schemas: IndexMap<String, SchemaMeta>,
}

impl SchemaDraft {
    pub fn new(default_schema: impl Into<String>) -> Self {
        Self {
            default_schema: default_schema.into(),
            schemas: IndexMap::new(),
        }
    }

    /// Get or create a schema
    pub fn schema_mut(&mut self, name: &str) -> &mut SchemaMeta {
        self.schemas
            .entry(name.to_string())
            .or_insert_with(|| SchemaMeta {
                name: name.to_string(),
                tables: IndexMap::new(),
            })
    }

    /// Add a table to `schema`, or to the default schema
    pub fn add_table(&mut self, schema: Option<&str>, table: TableMeta) {
        let schema = schema
            .map(str::to_string)
            .unwrap_or_else(|| self.default_schema.clone());
        self.schema_mut(&schema)
            .tables
            .insert(table.name.clone(), table);
    }

    pub fn table_mut(&mut self, schema: Option<&str>, name: &str) -> Option<&mut TableMeta> {
        let schema = schema.unwrap_or(&self.default_schema).to_string();
        self.schemas
            .get_mut(&schema)?
            .tables
            .values_mut()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }
}

/// Immutable view of a connection's schema at one point in time.
///
/// Snapshots are shared behind `Arc` and never mutated; a refresh publishes
/// a new snapshot with a higher version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataSnapshot {
    pub connection: ConnectionKey,
    /// Strictly increasing across all snapshots of a cache, never reused
    pub version: u64,
    pub captured_at: SystemTime,
    pub default_schema: String,
    pub schemas: IndexMap<String, SchemaMeta>,
}

impl MetadataSnapshot {
    /// Version 0: nothing known yet
    pub fn empty(connection: ConnectionKey) -> Self {
        Self {
            connection,
            version: 0,
            captured_at: SystemTime::now(),
            default_schema: String::new(),
            schemas: IndexMap::new(),
        }
    }

    pub(crate) fn from_draft(connection: ConnectionKey, version: u64, draft: SchemaDraft) -> Self {
        Self {
            connection,
            version,
            captured_at: SystemTime::now(),
            default_schema: draft.default_schema,
            schemas: draft.schemas,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.values().all(|s| s.tables.is_empty())
    }

    pub fn age(&self) -> Duration {
        SystemTime::now()
            .duration_since(self.captured_at)
            .unwrap_or_default()
    }

    /// Look up a schema by name (case-insensitive)
    pub fn schema(&self, name: &str) -> Option<&SchemaMeta> {
        self.schemas
            .values()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }

    /// Look up a table or view. Without a schema, the default schema is
    /// searched first, then every other schema.
    pub fn table(&self, schema: Option<&str>, name: &str) -> Option<&TableMeta> {
        match schema {
            Some(schema) => self.schema(schema).and_then(|s| s.table(name)),
            None => self
                .schema(&self.default_schema)
                .and_then(|s| s.table(name))
                .or_else(|| self.schemas.values().find_map(|s| s.table(name))),
        }
    }

    pub fn table_exists(&self, schema: Option<&str>, name: &str) -> bool {
        self.table(schema, name).is_some()
    }

    /// All tables and views with the schema that holds them
    pub fn tables(&self) -> impl Iterator<Item = (&str, &TableMeta)> {
        self.schemas
            .values()
            .flat_map(|s| s.tables.values().map(move |t| (s.name.as_str(), t)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> MetadataSnapshot {
        let mut draft = SchemaDraft::new("public");
        let mut users = TableMeta::new("users", TableKind::Table);
        users.columns.push(ColumnMeta::new("id", "INTEGER"));
        draft.add_table(None, users);
        draft.add_table(Some("audit"), TableMeta::new("events", TableKind::Table));
        MetadataSnapshot::from_draft(ConnectionKey::new("local"), 1, draft)
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let snap = snapshot();
        assert!(snap.table(None, "USERS").is_some());
        assert!(snap.table(Some("PUBLIC"), "users").is_some());
        assert!(snap.table(None, "users").unwrap().column_exists("ID"));
    }

    #[test]
    fn test_unqualified_lookup_searches_all_schemas() {
        let snap = snapshot();
        assert!(snap.table(None, "events").is_some());
        assert!(snap.table(Some("public"), "events").is_none());
        assert_eq!(snap.tables().count(), 2);
    }

    #[test]
    fn test_empty_snapshot() {
        let snap = MetadataSnapshot::empty(ConnectionKey::default());
        assert_eq!(snap.version, 0);
        assert!(snap.is_empty());
    }
}
