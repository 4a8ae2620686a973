//! Read-only schema registry consumed by the optimizer

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// A declared index on one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDefinition {
    /// Name of the index
    pub name: String,
    /// Fields included in the index (in order)
    pub fields: Vec<String>,
}

impl IndexDefinition {
    /// Create an index definition
    pub fn new(name: impl Into<String>, fields: Vec<String>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Check if the index lists the given field at any position
    pub fn covers(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f.eq_ignore_ascii_case(field))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    name: String,
    fields: Vec<String>,
    #[serde(default)]
    indexes: Vec<IndexDefinition>,
}

impl TableSchema {
    /// Create a table schema with no indexes
    pub fn new(name: impl Into<String>, fields: Vec<String>) -> Self {
        Self {
            name: name.into(),
            fields,
            indexes: vec![],
        }
    }

    /// Declare an index on this table
    pub fn with_index(mut self, name: impl Into<String>, fields: &[&str]) -> Self {
        self.indexes.push(IndexDefinition::new(
            name,
            fields.iter().map(|f| f.to_string()).collect(),
        ));
        self
    }

    /// Get the table name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the field names in declaration order
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Get the declared indexes
    pub fn indexes(&self) -> &[IndexDefinition] {
        &self.indexes
    }

    /// Check if any declared index lists the field
    pub fn is_indexed(&self, field: &str) -> bool {
        self.indexes.iter().any(|idx| idx.covers(field))
    }
}

/// Source of table metadata. Implementations must not block.
pub trait SchemaRegistry: Send + Sync {
    /// Look up a table by name
    fn table_schema(&self, table: &str) -> Option<TableSchema>;
}

impl<R: SchemaRegistry + ?Sized> SchemaRegistry for std::sync::Arc<R> {
    fn table_schema(&self, table: &str) -> Option<TableSchema> {
        (**self).table_schema(table)
    }
}

/// Registry backed by a plain map, filled by the host
#[derive(Debug, Clone, Default)]
pub struct InMemorySchemaRegistry {
    tables: AHashMap<String, TableSchema>,
}

impl InMemorySchemaRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a table
    pub fn register(&mut self, schema: TableSchema) {
        self.tables.insert(schema.name().to_string(), schema);
    }

    /// Register a table, builder style
    pub fn with_table(mut self, schema: TableSchema) -> Self {
        self.register(schema);
        self
    }

    /// Number of registered tables
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl SchemaRegistry for InMemorySchemaRegistry {
    fn table_schema(&self, table: &str) -> Option<TableSchema> {
        // SQL identifiers are case-insensitive
        self.tables
            .get(table)
            .or_else(|| {
                self.tables
                    .values()
                    .find(|t| t.name().eq_ignore_ascii_case(table))
            })
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> TableSchema {
        TableSchema::new(
            "users",
            vec!["id".to_string(), "email".to_string(), "age".to_string()],
        )
        .with_index("idx_users_email", &["email"])
    }

    #[test]
    fn test_index_coverage() {
        let schema = users();
        assert!(schema.is_indexed("email"));
        assert!(schema.is_indexed("EMAIL"));
        assert!(!schema.is_indexed("age"));
        assert_eq!(schema.indexes().len(), 1);
    }

    #[test]
    fn test_registry_lookup() {
        let registry = InMemorySchemaRegistry::new().with_table(users());

        assert_eq!(registry.len(), 1);
        assert!(registry.table_schema("users").is_some());
        assert!(registry.table_schema("USERS").is_some());
        assert!(registry.table_schema("orders").is_none());
    }

    #[test]
    fn test_schema_from_json() {
        let json = r#"{"name":"orders","fields":["id","user_id"]}"#;
        let schema: TableSchema = serde_json::from_str(json).unwrap();
        assert_eq!(schema.fields(), &["id".to_string(), "user_id".to_string()]);
        assert!(schema.indexes().is_empty());
    }
}
