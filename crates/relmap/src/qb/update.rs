//! UPDATE statement builder.

use serde_json::Value;
use tracing::debug;

use crate::clause::{BindCounter, WhereClause};
use crate::error::{OrmError, OrmResult};
use crate::executor::{AsyncExecutor, Executor};
use crate::query::Query;
use crate::schema::TableInfo;

/// Builds `UPDATE <table> SET "<col>" = %(set_<field>_<i>)s, ... [WHERE ...]`.
///
/// SET assignments render first and consume the same bind counter as the
/// WHERE clause, so a column that is both assigned and filtered on still gets
/// disjoint parameter names.
#[derive(Debug, Clone)]
pub struct UpdateBuilder {
    table: TableInfo,
    assignments: Vec<(String, Value)>,
    where_clause: Option<WhereClause>,
}

impl UpdateBuilder {
    pub(crate) fn new(table: &TableInfo) -> Self {
        Self {
            table: table.clone(),
            assignments: Vec::new(),
            where_clause: None,
        }
    }

    /// Assign a new value to a field. Repeated calls accumulate.
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.assignments.push((field.into(), value.into()));
        self
    }

    /// Set the WHERE condition (last call wins).
    pub fn where_clause(mut self, clause: WhereClause) -> Self {
        self.where_clause = Some(clause);
        self
    }

    pub fn render(&self) -> OrmResult<Query> {
        if self.assignments.is_empty() {
            return Err(OrmError::builder_state("UPDATE rendered with no SET data"));
        }

        let mut counter = BindCounter::new();
        let mut query = Query::new(String::new());

        let mut sets = Vec::with_capacity(self.assignments.len());
        for (field, value) in &self.assignments {
            let column = self.table.column(field).ok_or_else(|| {
                OrmError::schema(format!(
                    "no column for field '{field}' on table '{}'",
                    self.table.name()
                ))
            })?;
            let name = format!("set_{field}_{}", counter.next());
            sets.push(format!("\"{}\" = %({name})s", column.name()));
            query.params.insert(name, value.clone());
        }

        let mut sql = format!("UPDATE {} SET {}", self.table.fqn(), sets.join(", "));
        if let Some(clause) = &self.where_clause {
            let frag = clause.render(&mut counter);
            sql.push_str(" WHERE ");
            sql.push_str(&frag.sql);
            query.params.extend(frag.params);
        }

        debug!(sql = %sql, params = query.params.len(), "rendered update");
        query.sql = sql;
        Ok(query)
    }

    /// Render and run through a blocking executor.
    pub fn run<E: Executor>(&self, executor: &mut E) -> OrmResult<()> {
        let query = self.render()?;
        executor.execute(&query)
    }

    /// Render and run through a suspending executor.
    pub async fn run_async<E: AsyncExecutor>(&self, executor: &mut E) -> OrmResult<()> {
        let query = self.render()?;
        executor.execute(&query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qb::update;
    use crate::schema::{ColumnDef, TableBuilder};
    use serde_json::json;

    fn user() -> TableInfo {
        TableBuilder::new("user")
            .column("id", ColumnDef::integer().primary())
            .column("email", ColumnDef::text().name("user_email"))
            .build()
    }

    #[test]
    fn set_and_where_have_disjoint_names() {
        let t = user();
        let q = update(&t)
            .set("email", "x")
            .where_clause(WhereClause::eq(t.column("id").unwrap(), 1))
            .render()
            .unwrap();
        assert_eq!(
            q.sql,
            r#"UPDATE "user" SET "user_email" = %(set_email_0)s WHERE "user"."id" = %(eq_id_1)s"#
        );
        assert_eq!(q.params.get("set_email_0"), Some(&json!("x")));
        assert_eq!(q.params.get("eq_id_1"), Some(&json!(1)));
    }

    #[test]
    fn update_without_where_touches_all_rows() {
        let t = user();
        let q = update(&t).set("email", "x").render().unwrap();
        assert_eq!(q.sql, r#"UPDATE "user" SET "user_email" = %(set_email_0)s"#);
    }

    #[test]
    fn multiple_sets_keep_declaration_order() {
        let t = user();
        let q = update(&t).set("id", 2).set("email", "y").render().unwrap();
        assert_eq!(
            q.sql,
            r#"UPDATE "user" SET "id" = %(set_id_0)s, "user_email" = %(set_email_1)s"#
        );
    }

    #[test]
    fn no_set_is_builder_state_error() {
        let t = user();
        let err = update(&t).render().unwrap_err();
        assert!(matches!(err, OrmError::BuilderState(_)));
    }

    #[test]
    fn unknown_field_is_schema_error() {
        let t = user();
        let err = update(&t).set("nope", 1).render().unwrap_err();
        assert!(matches!(err, OrmError::Schema(_)));
    }

    #[test]
    fn set_on_filtered_column_still_disjoint() {
        let t = user();
        let id = t.column("id").unwrap();
        let q = update(&t)
            .set("id", 9)
            .where_clause(WhereClause::eq(id, 1))
            .render()
            .unwrap();
        assert!(q.params.contains_key("set_id_0"));
        assert!(q.params.contains_key("eq_id_1"));
    }
}
