//! ORDER BY clauses.

use crate::error::OrmResult;
use crate::raw::RawSql;
use crate::schema::ColumnInfo;

/// NULLS placement for an explicit sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullsOrder {
    First,
    Last,
}

impl NullsOrder {
    fn to_sql(self) -> &'static str {
        match self {
            NullsOrder::First => "NULLS FIRST",
            NullsOrder::Last => "NULLS LAST",
        }
    }
}

/// One ORDER BY term: a bare column (implicit ascending), an explicit
/// direction with optional NULLS placement, or a raw expression.
#[derive(Debug, Clone)]
pub enum OrderByClause {
    Bare(ColumnInfo),
    Asc(ColumnInfo, Option<NullsOrder>),
    Desc(ColumnInfo, Option<NullsOrder>),
    Raw(RawSql),
}

impl OrderByClause {
    pub fn asc(column: &ColumnInfo) -> Self {
        OrderByClause::Asc(column.clone(), None)
    }

    pub fn desc(column: &ColumnInfo) -> Self {
        OrderByClause::Desc(column.clone(), None)
    }

    pub fn asc_nulls(column: &ColumnInfo, nulls: NullsOrder) -> Self {
        OrderByClause::Asc(column.clone(), Some(nulls))
    }

    pub fn desc_nulls(column: &ColumnInfo, nulls: NullsOrder) -> Self {
        OrderByClause::Desc(column.clone(), Some(nulls))
    }

    pub fn raw(raw: RawSql) -> Self {
        OrderByClause::Raw(raw)
    }

    pub fn render(&self) -> OrmResult<String> {
        Ok(match self {
            OrderByClause::Bare(c) => c.fqn(),
            OrderByClause::Asc(c, nulls) => directed(c, "ASC", *nulls),
            OrderByClause::Desc(c, nulls) => directed(c, "DESC", *nulls),
            OrderByClause::Raw(raw) => raw.render()?,
        })
    }
}

impl From<&ColumnInfo> for OrderByClause {
    fn from(column: &ColumnInfo) -> Self {
        OrderByClause::Bare(column.clone())
    }
}

fn directed(column: &ColumnInfo, dir: &str, nulls: Option<NullsOrder>) -> String {
    match nulls {
        Some(n) => format!("{} {dir} {}", column.fqn(), n.to_sql()),
        None => format!("{} {dir}", column.fqn()),
    }
}
