//! INSERT statement builder.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::{OrmError, OrmResult};
use crate::executor::{AsyncExecutor, Executor};
use crate::mapper::map_rows;
use crate::query::Query;
use crate::schema::TableInfo;
use crate::selection::Selection;

/// Builds `INSERT INTO <table> (<cols>) VALUES (<placeholders>)`.
///
/// Rows are field-keyed maps; at render time each row passes through
/// [`TableInfo::value_map`], which applies column defaults and rejects rows
/// missing a defaultless column. Placeholders are named after the columns
/// themselves and the per-row bindings go in `many_params`, one map per row.
#[derive(Debug, Clone)]
pub struct InsertBuilder {
    table: TableInfo,
    rows: Vec<BTreeMap<String, Value>>,
    returning: bool,
}

impl InsertBuilder {
    pub(crate) fn new(table: &TableInfo) -> Self {
        Self {
            table: table.clone(),
            rows: Vec::new(),
            returning: false,
        }
    }

    /// Append one row, keyed by field name.
    pub fn values(mut self, row: BTreeMap<String, Value>) -> Self {
        self.rows.push(row);
        self
    }

    /// Append many rows at once.
    pub fn values_many(mut self, rows: impl IntoIterator<Item = BTreeMap<String, Value>>) -> Self {
        self.rows.extend(rows);
        self
    }

    /// Append `RETURNING *`; fetched rows map back through the table's full
    /// column shape.
    pub fn returning(mut self) -> Self {
        self.returning = true;
        self
    }

    pub fn render(&self) -> OrmResult<Query> {
        if self.rows.is_empty() {
            return Err(OrmError::builder_state("INSERT rendered with no rows"));
        }

        let columns: Vec<String> = self
            .table
            .columns()
            .map(|(_, c)| c.name().to_string())
            .collect();
        let quoted: Vec<String> = columns.iter().map(|c| format!("\"{c}\"")).collect();
        let placeholders: Vec<String> = columns.iter().map(|c| format!("%({c})s")).collect();

        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table.fqn(),
            quoted.join(", "),
            placeholders.join(", ")
        );
        if self.returning {
            sql.push_str(" RETURNING *");
        }

        let mut query = Query::new(sql);
        for row in &self.rows {
            query.many_params.push(self.table.value_map(row)?);
        }
        // Single-row inserts also expose their bindings as plain params so
        // they can run through a non-batched execute or fetch.
        if let [row] = query.many_params.as_slice() {
            query.params = row.clone();
        }

        debug!(sql = %query.sql, rows = query.many_params.len(), "rendered insert");
        Ok(query)
    }

    /// Render and run through a blocking executor, one execution per row.
    pub fn run<E: Executor>(&self, executor: &mut E) -> OrmResult<()> {
        let query = self.render()?;
        executor.execute_batch(&query)
    }

    /// Render and run through a suspending executor.
    pub async fn run_async<E: AsyncExecutor>(&self, executor: &mut E) -> OrmResult<()> {
        let query = self.render()?;
        executor.execute_batch(&query).await
    }

    /// Render with `RETURNING *`, fetch, and map the returned rows through
    /// the table's full-row shape.
    pub fn fetch_returned<T, E>(&self, executor: &mut E) -> OrmResult<Vec<T>>
    where
        T: DeserializeOwned,
        E: Executor,
    {
        let query = self.clone().returning().render()?;
        let rows = executor.fetch(&query)?;
        map_rows(&rows, &Selection::from_table(&self.table), executor.dialect())
    }

    /// Suspending counterpart of [`InsertBuilder::fetch_returned`].
    pub async fn fetch_returned_async<T, E>(&self, executor: &mut E) -> OrmResult<Vec<T>>
    where
        T: DeserializeOwned,
        E: AsyncExecutor,
    {
        let query = self.clone().returning().render()?;
        let rows = executor.fetch(&query).await?;
        map_rows(&rows, &Selection::from_table(&self.table), executor.dialect())
    }
}
