//! JOIN clauses.

use crate::clause::{BindCounter, Fragment, WhereClause};
use crate::schema::TableInfo;

/// A JOIN against a target table with an ON condition (`Cross` has none).
///
/// Joins render in append order. An ON condition shares the statement-wide
/// [`BindCounter`], though it rarely binds anything since joins usually
/// compare columns.
#[derive(Debug, Clone)]
pub enum JoinClause {
    Left(TableInfo, WhereClause),
    Right(TableInfo, WhereClause),
    Inner(TableInfo, WhereClause),
    Full(TableInfo, WhereClause),
    Cross(TableInfo),
}

impl JoinClause {
    pub fn left(table: &TableInfo, on: WhereClause) -> Self {
        JoinClause::Left(table.clone(), on)
    }

    pub fn right(table: &TableInfo, on: WhereClause) -> Self {
        JoinClause::Right(table.clone(), on)
    }

    pub fn inner(table: &TableInfo, on: WhereClause) -> Self {
        JoinClause::Inner(table.clone(), on)
    }

    pub fn full(table: &TableInfo, on: WhereClause) -> Self {
        JoinClause::Full(table.clone(), on)
    }

    pub fn cross(table: &TableInfo) -> Self {
        JoinClause::Cross(table.clone())
    }

    /// The joined table.
    pub fn table(&self) -> &TableInfo {
        match self {
            JoinClause::Left(t, _)
            | JoinClause::Right(t, _)
            | JoinClause::Inner(t, _)
            | JoinClause::Full(t, _)
            | JoinClause::Cross(t) => t,
        }
    }

    pub fn render(&self, counter: &mut BindCounter) -> Fragment {
        let (kind, table, on) = match self {
            JoinClause::Left(t, on) => ("LEFT", t, Some(on)),
            JoinClause::Right(t, on) => ("RIGHT", t, Some(on)),
            JoinClause::Inner(t, on) => ("INNER", t, Some(on)),
            JoinClause::Full(t, on) => ("FULL OUTER", t, Some(on)),
            JoinClause::Cross(t) => ("CROSS", t, None),
        };
        match on {
            Some(on) => {
                let cond = on.render(counter);
                Fragment {
                    sql: format!("{kind} JOIN {} ON {}", table.fqn(), cond.sql),
                    params: cond.params,
                }
            }
            None => Fragment::new(format!("{kind} JOIN {}", table.fqn())),
        }
    }
}
