//! SELECT statement builder.

use tracing::debug;

use crate::clause::{BindCounter, WhereClause};
use crate::error::{OrmError, OrmResult};
use crate::join::JoinClause;
use crate::order::OrderByClause;
use crate::query::Query;
use crate::schema::{ColumnInfo, TableInfo};
use crate::selection::{Dialect, Selection};

/// Accretes FROM/JOIN/WHERE/GROUP BY/HAVING/ORDER BY/LIMIT/OFFSET and renders
/// a SELECT.
///
/// `where_clause` replaces any previous WHERE (last call wins); `order_by` and
/// `group_by` are additive. Clauses render in a fixed order and the bind
/// counter is threaded joins-first, then WHERE, then HAVING, so every bound
/// name is unique within the statement.
#[derive(Debug, Clone)]
pub struct SelectBuilder {
    selection: Selection,
    distinct: bool,
    table: Option<TableInfo>,
    joins: Vec<JoinClause>,
    where_clause: Option<WhereClause>,
    group_by: Vec<ColumnInfo>,
    having: Option<WhereClause>,
    order_by: Vec<OrderByClause>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl SelectBuilder {
    pub(crate) fn new(selection: Selection, distinct: bool) -> Self {
        Self {
            selection,
            distinct,
            table: None,
            joins: Vec::new(),
            where_clause: None,
            group_by: Vec::new(),
            having: None,
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Set the FROM table.
    pub fn from(mut self, table: &TableInfo) -> Self {
        self.table = Some(table.clone());
        self
    }

    pub fn left_join(mut self, table: &TableInfo, on: WhereClause) -> Self {
        self.joins.push(JoinClause::left(table, on));
        self
    }

    pub fn right_join(mut self, table: &TableInfo, on: WhereClause) -> Self {
        self.joins.push(JoinClause::right(table, on));
        self
    }

    pub fn inner_join(mut self, table: &TableInfo, on: WhereClause) -> Self {
        self.joins.push(JoinClause::inner(table, on));
        self
    }

    pub fn full_join(mut self, table: &TableInfo, on: WhereClause) -> Self {
        self.joins.push(JoinClause::full(table, on));
        self
    }

    pub fn cross_join(mut self, table: &TableInfo) -> Self {
        self.joins.push(JoinClause::cross(table));
        self
    }

    /// Set the WHERE condition. A second call replaces the first; combine
    /// conditions with [`WhereClause::and_with`] before passing them in.
    pub fn where_clause(mut self, clause: WhereClause) -> Self {
        self.where_clause = Some(clause);
        self
    }

    /// Append a GROUP BY column.
    pub fn group_by(mut self, column: &ColumnInfo) -> Self {
        self.group_by.push(column.clone());
        self
    }

    /// Set the HAVING condition (last call wins, like WHERE).
    pub fn having(mut self, clause: WhereClause) -> Self {
        self.having = Some(clause);
        self
    }

    /// Append an ORDER BY term. Repeated calls accumulate.
    pub fn order_by(mut self, clause: impl Into<OrderByClause>) -> Self {
        self.order_by.push(clause.into());
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn offset(mut self, n: u64) -> Self {
        self.offset = Some(n);
        self
    }

    /// Render the statement for `dialect`.
    pub fn render(&self, dialect: Dialect) -> OrmResult<Query> {
        let table = self
            .table
            .as_ref()
            .ok_or_else(|| OrmError::builder_state("SELECT rendered without a FROM table"))?;
        if self.selection.is_empty() {
            return Err(OrmError::builder_state(
                "SELECT rendered with an empty selection",
            ));
        }

        let mut counter = BindCounter::new();
        let mut query = Query::new(String::new());

        let keyword = if self.distinct {
            "SELECT DISTINCT"
        } else {
            "SELECT"
        };
        let mut sql = format!(
            "{keyword} {} FROM {}",
            self.selection.projection(dialect)?,
            table.fqn()
        );

        for join in &self.joins {
            let frag = join.render(&mut counter);
            sql.push(' ');
            sql.push_str(&frag.sql);
            query.params.extend(frag.params);
        }
        if let Some(clause) = &self.where_clause {
            let frag = clause.render(&mut counter);
            sql.push_str(" WHERE ");
            sql.push_str(&frag.sql);
            query.params.extend(frag.params);
        }
        if !self.group_by.is_empty() {
            let cols: Vec<String> = self.group_by.iter().map(|c| c.fqn()).collect();
            sql.push_str(" GROUP BY ");
            sql.push_str(&cols.join(", "));
        }
        if let Some(clause) = &self.having {
            let frag = clause.render(&mut counter);
            sql.push_str(" HAVING ");
            sql.push_str(&frag.sql);
            query.params.extend(frag.params);
        }
        if !self.order_by.is_empty() {
            let mut terms = Vec::with_capacity(self.order_by.len());
            for clause in &self.order_by {
                terms.push(clause.render()?);
            }
            sql.push_str(" ORDER BY ");
            sql.push_str(&terms.join(", "));
        }
        if let Some(n) = self.limit {
            sql.push_str(&format!(" LIMIT {n}"));
        }
        if let Some(n) = self.offset {
            sql.push_str(&format!(" OFFSET {n}"));
        }

        debug!(sql = %sql, params = query.params.len(), "rendered select");
        query.sql = sql;
        Ok(query)
    }

    /// The declared output shape, for row mapping after fetch.
    pub fn selection(&self) -> &Selection {
        &self.selection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qb::{select, select_all, select_distinct};
    use crate::schema::{ColumnDef, TableBuilder};
    use serde_json::json;

    fn schema() -> (TableInfo, TableInfo) {
        let user = TableBuilder::new("user")
            .column("id", ColumnDef::integer().primary())
            .column("email", ColumnDef::text())
            .build();
        let message = TableBuilder::new("message")
            .column("id", ColumnDef::integer().primary())
            .column("content", ColumnDef::text())
            .column("user_id", ColumnDef::integer().fk("user", "id"))
            .build();
        (user, message)
    }

    #[test]
    fn select_all_renders_from_and_projection() {
        let (user, _) = schema();
        let q = select_all(&user).render(Dialect::Postgres).unwrap();
        assert_eq!(
            q.sql,
            r#"SELECT "user"."id" AS "id", "user"."email" AS "email" FROM "user""#
        );
        assert!(q.params.is_empty());
    }

    #[test]
    fn render_without_from_is_builder_state_error() {
        let (user, _) = schema();
        let err = select(Selection::from_table(&user))
            .render(Dialect::Postgres)
            .unwrap_err();
        assert!(matches!(err, OrmError::BuilderState(_)));
    }

    #[test]
    fn clause_order_is_deterministic() {
        let (user, message) = schema();
        let user_id = user.column("id").unwrap();
        let q = select(
            Selection::new()
                .column("id", user_id)
                .many_table("messages", &message),
        )
        .from(&user)
        .left_join(
            &message,
            WhereClause::eq(message.column("user_id").unwrap(), user_id),
        )
        .where_clause(WhereClause::gt(user_id, 0))
        .group_by(user_id)
        .having(WhereClause::gt(user_id, 0))
        .order_by(user_id)
        .limit(10)
        .offset(5)
        .render(Dialect::Postgres)
        .unwrap();

        let positions: Vec<usize> = [
            "SELECT", "FROM", "LEFT JOIN", "WHERE", "GROUP BY", "HAVING", "ORDER BY", "LIMIT",
            "OFFSET",
        ]
        .iter()
        .map(|kw| q.sql.find(kw).unwrap())
        .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{}", q.sql);
    }

    #[test]
    fn where_and_having_share_the_counter() {
        let (user, _) = schema();
        let id = user.column("id").unwrap();
        let q = select(Selection::new().column("id", id))
            .from(&user)
            .where_clause(WhereClause::eq(id, 1))
            .group_by(id)
            .having(WhereClause::eq(id, 2))
            .render(Dialect::Postgres)
            .unwrap();
        assert!(q.sql.contains("WHERE \"user\".\"id\" = %(eq_id_0)s"));
        assert!(q.sql.contains("HAVING \"user\".\"id\" = %(eq_id_1)s"));
        assert_eq!(q.params.get("eq_id_0"), Some(&json!(1)));
        assert_eq!(q.params.get("eq_id_1"), Some(&json!(2)));
    }

    #[test]
    fn where_replaces_previous_where() {
        let (user, _) = schema();
        let id = user.column("id").unwrap();
        let q = select_all(&user)
            .where_clause(WhereClause::eq(id, 1))
            .where_clause(WhereClause::eq(id, 2))
            .render(Dialect::Postgres)
            .unwrap();
        assert_eq!(q.params.len(), 1);
        assert_eq!(q.params.get("eq_id_0"), Some(&json!(2)));
    }

    #[test]
    fn order_by_accumulates() {
        let (user, _) = schema();
        let q = select_all(&user)
            .order_by(user.column("email").unwrap())
            .order_by(crate::order::OrderByClause::desc(user.column("id").unwrap()))
            .render(Dialect::Postgres)
            .unwrap();
        assert!(
            q.sql
                .ends_with(r#"ORDER BY "user"."email", "user"."id" DESC"#)
        );
    }

    #[test]
    fn distinct_keyword() {
        let (user, _) = schema();
        let q = select_distinct(Selection::from_table(&user))
            .from(&user)
            .render(Dialect::Postgres)
            .unwrap();
        assert!(q.sql.starts_with("SELECT DISTINCT "));
    }
}
