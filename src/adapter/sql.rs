//! In-memory `SqlFederator` reference implementation: a tiny set of
//! registered tables, queried with a minimal `SELECT * FROM table` subset
//! sufficient to exercise the orchestrator's catalog-lookup paths.

use super::error::AdapterError;
use super::traits::{SqlColumn, SqlFederator, SqlResult, TableSchema};
use async_trait::async_trait;
use dashmap::DashMap;

pub struct InMemorySqlFederator {
    tables: DashMap<String, (Vec<SqlColumn>, Vec<Vec<serde_json::Value>>)>,
}

impl InMemorySqlFederator {
    pub fn new() -> Self {
        Self { tables: DashMap::new() }
    }

    pub fn register_table(&self, name: impl Into<String>, columns: Vec<SqlColumn>, rows: Vec<Vec<serde_json::Value>>) {
        self.tables.insert(name.into(), (columns, rows));
    }
}

impl Default for InMemorySqlFederator {
    fn default() -> Self {
        Self::new()
    }
}

/// Infers a primary key / foreign keys by naming convention:
/// a column named `id` is the primary key; a column named `{table}_id`
/// referencing another registered table is a foreign key.
fn infer_keys(table: &str, columns: &[SqlColumn], known_tables: &[String]) -> (Vec<String>, Vec<(String, String)>) {
    let mut pk = Vec::new();
    let mut fks = Vec::new();
    for col in columns {
        if col.name == "id" {
            pk.push(col.name.clone());
        } else if let Some(stripped) = col.name.strip_suffix("_id") {
            let referenced = format!("{stripped}s");
            if known_tables.iter().any(|t| t == &referenced || t == stripped) && stripped != table {
                fks.push((col.name.clone(), referenced));
            }
        }
    }
    (pk, fks)
}

#[async_trait]
impl SqlFederator for InMemorySqlFederator {
    async fn execute_sql(&self, sql: &str, _catalog: Option<&str>, _schema: Option<&str>) -> Result<SqlResult, AdapterError> {
        let lowered = sql.to_lowercase();
        if !lowered.trim_start().starts_with("select") {
            return Err(AdapterError::InvalidInput("only SELECT statements are supported".into()));
        }
        let table_name = lowered
            .split("from")
            .nth(1)
            .and_then(|rest| rest.split_whitespace().next())
            .ok_or_else(|| AdapterError::InvalidInput("could not locate FROM clause".into()))?
            .trim_matches(|c: char| !c.is_alphanumeric() && c != '_');

        let entry = self.tables.get(table_name).ok_or_else(|| AdapterError::NotFound(format!("table {table_name}")))?;
        Ok(SqlResult { columns: entry.0.clone(), rows: entry.1.clone() })
    }

    async fn introspect_schema(&self, _catalog: &str, _schema: &str) -> Result<Vec<TableSchema>, AdapterError> {
        let known: Vec<String> = self.tables.iter().map(|e| e.key().clone()).collect();
        Ok(self
            .tables
            .iter()
            .map(|e| {
                let (pk, fks) = infer_keys(e.key(), &e.value().0, &known);
                TableSchema { name: e.key().clone(), columns: e.value().0.clone(), primary_key: pk, foreign_keys: fks }
            })
            .collect())
    }

    async fn check_connection(&self) -> Result<(), AdapterError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn introspect_infers_primary_and_foreign_keys() {
        let federator = InMemorySqlFederator::new();
        federator.register_table(
            "orders",
            vec![
                SqlColumn { name: "id".into(), data_type: "integer".into() },
                SqlColumn { name: "customer_id".into(), data_type: "integer".into() },
            ],
            vec![],
        );
        federator.register_table("customers", vec![SqlColumn { name: "id".into(), data_type: "integer".into() }], vec![]);

        let schemas = federator.introspect_schema("main", "public").await.unwrap();
        let orders = schemas.iter().find(|s| s.name == "orders").unwrap();
        assert_eq!(orders.primary_key, vec!["id".to_string()]);
        assert_eq!(orders.foreign_keys, vec![("customer_id".to_string(), "customers".to_string())]);
    }

    #[tokio::test]
    async fn rejects_non_select() {
        let federator = InMemorySqlFederator::new();
        let err = federator.execute_sql("DELETE FROM orders", None, None).await.unwrap_err();
        assert!(matches!(err, AdapterError::InvalidInput(_)));
    }
}
