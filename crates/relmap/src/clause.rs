//! WHERE/HAVING clause expression trees.
//!
//! Every clause node renders to a SQL fragment plus named bind parameters in
//! the canonical `%(name)s` style. A [`BindCounter`] is threaded through the
//! whole render pass of a statement (joins, then where, then having) so each
//! parameter gets a globally unique name like `eq_id_2`, even when the same
//! column is compared more than once.
//!
//! # Example
//! ```
//! use relmap::clause::{BindCounter, WhereClause};
//! use relmap::schema::{ColumnDef, TableBuilder};
//!
//! let user = TableBuilder::new("user")
//!     .column("id", ColumnDef::integer().primary())
//!     .build();
//! let clause = WhereClause::eq(user.column("id").unwrap(), 1);
//! let frag = clause.render(&mut BindCounter::new());
//! assert_eq!(frag.sql, r#""user"."id" = %(eq_id_0)s"#);
//! ```

use std::collections::BTreeMap;

use serde_json::Value;

use crate::schema::ColumnInfo;

/// Monotonically increasing counter local to one render pass.
///
/// No counter state survives across queries, so unrelated queries can never
/// collide on parameter names.
#[derive(Debug, Default)]
pub struct BindCounter(usize);

impl BindCounter {
    pub fn new() -> Self {
        Self(0)
    }

    /// Return the next index, starting at 0.
    pub fn next(&mut self) -> usize {
        let n = self.0;
        self.0 += 1;
        n
    }
}

/// A rendered SQL fragment and its bind parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
    pub sql: String,
    pub params: BTreeMap<String, Value>,
}

impl Fragment {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: BTreeMap::new(),
        }
    }
}

/// Right-hand operand of a comparison: a literal value (bound as a parameter)
/// or another column (rendered as a bare column-to-column comparison).
#[derive(Debug, Clone)]
pub enum Operand {
    Value(Value),
    Column(ColumnInfo),
}

impl From<&ColumnInfo> for Operand {
    fn from(col: &ColumnInfo) -> Self {
        Operand::Column(col.clone())
    }
}

impl From<Value> for Operand {
    fn from(v: Value) -> Self {
        Operand::Value(v)
    }
}

macro_rules! operand_from_scalar {
    ($($t:ty),*) => {
        $(impl From<$t> for Operand {
            fn from(v: $t) -> Self {
                Operand::Value(Value::from(v))
            }
        })*
    };
}

operand_from_scalar!(i32, i64, u32, f64, bool, String, &str);

/// A WHERE clause expression tree.
///
/// Comparison nodes always have a column on the left; the right side is an
/// [`Operand`]. `And`/`Or` merge their children's parameter maps, which cannot
/// collide because indices come from one shared [`BindCounter`].
#[derive(Debug, Clone)]
pub enum WhereClause {
    Eq(ColumnInfo, Operand),
    Ne(ColumnInfo, Operand),
    Gt(ColumnInfo, Operand),
    Gte(ColumnInfo, Operand),
    Lt(ColumnInfo, Operand),
    Lte(ColumnInfo, Operand),
    Like(ColumnInfo, Operand),
    Ilike(ColumnInfo, Operand),
    NotLike(ColumnInfo, Operand),
    IsNull(ColumnInfo),
    IsNotNull(ColumnInfo),
    InArray(ColumnInfo, Vec<Value>),
    NotInArray(ColumnInfo, Vec<Value>),
    Between(ColumnInfo, Value, Value),
    NotBetween(ColumnInfo, Value, Value),
    Not(Box<WhereClause>),
    And(Box<WhereClause>, Box<WhereClause>),
    Or(Box<WhereClause>, Box<WhereClause>),
}

impl WhereClause {
    pub fn eq(left: &ColumnInfo, right: impl Into<Operand>) -> Self {
        WhereClause::Eq(left.clone(), right.into())
    }

    pub fn ne(left: &ColumnInfo, right: impl Into<Operand>) -> Self {
        WhereClause::Ne(left.clone(), right.into())
    }

    pub fn gt(left: &ColumnInfo, right: impl Into<Operand>) -> Self {
        WhereClause::Gt(left.clone(), right.into())
    }

    pub fn gte(left: &ColumnInfo, right: impl Into<Operand>) -> Self {
        WhereClause::Gte(left.clone(), right.into())
    }

    pub fn lt(left: &ColumnInfo, right: impl Into<Operand>) -> Self {
        WhereClause::Lt(left.clone(), right.into())
    }

    pub fn lte(left: &ColumnInfo, right: impl Into<Operand>) -> Self {
        WhereClause::Lte(left.clone(), right.into())
    }

    pub fn like(left: &ColumnInfo, pattern: impl Into<Operand>) -> Self {
        WhereClause::Like(left.clone(), pattern.into())
    }

    pub fn ilike(left: &ColumnInfo, pattern: impl Into<Operand>) -> Self {
        WhereClause::Ilike(left.clone(), pattern.into())
    }

    pub fn not_like(left: &ColumnInfo, pattern: impl Into<Operand>) -> Self {
        WhereClause::NotLike(left.clone(), pattern.into())
    }

    pub fn is_null(column: &ColumnInfo) -> Self {
        WhereClause::IsNull(column.clone())
    }

    pub fn is_not_null(column: &ColumnInfo) -> Self {
        WhereClause::IsNotNull(column.clone())
    }

    pub fn in_array(column: &ColumnInfo, values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        WhereClause::InArray(column.clone(), values.into_iter().map(Into::into).collect())
    }

    pub fn not_in_array(
        column: &ColumnInfo,
        values: impl IntoIterator<Item = impl Into<Value>>,
    ) -> Self {
        WhereClause::NotInArray(column.clone(), values.into_iter().map(Into::into).collect())
    }

    pub fn between(column: &ColumnInfo, lower: impl Into<Value>, upper: impl Into<Value>) -> Self {
        WhereClause::Between(column.clone(), lower.into(), upper.into())
    }

    pub fn not_between(
        column: &ColumnInfo,
        lower: impl Into<Value>,
        upper: impl Into<Value>,
    ) -> Self {
        WhereClause::NotBetween(column.clone(), lower.into(), upper.into())
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(clause: WhereClause) -> Self {
        WhereClause::Not(Box::new(clause))
    }

    pub fn and(left: WhereClause, right: WhereClause) -> Self {
        WhereClause::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: WhereClause, right: WhereClause) -> Self {
        WhereClause::Or(Box::new(left), Box::new(right))
    }

    /// Combine with another clause using AND.
    pub fn and_with(self, other: WhereClause) -> Self {
        WhereClause::and(self, other)
    }

    /// Combine with another clause using OR.
    pub fn or_with(self, other: WhereClause) -> Self {
        WhereClause::or(self, other)
    }

    fn is_compound(&self) -> bool {
        matches!(self, WhereClause::And(..) | WhereClause::Or(..))
    }

    /// Render to SQL and bind parameters, consuming indices from `counter`.
    pub fn render(&self, counter: &mut BindCounter) -> Fragment {
        match self {
            WhereClause::Eq(l, r) => cmp(counter, l, r, "=", "eq"),
            WhereClause::Ne(l, r) => cmp(counter, l, r, "!=", "ne"),
            WhereClause::Gt(l, r) => cmp(counter, l, r, ">", "gt"),
            WhereClause::Gte(l, r) => cmp(counter, l, r, ">=", "gte"),
            WhereClause::Lt(l, r) => cmp(counter, l, r, "<", "lt"),
            WhereClause::Lte(l, r) => cmp(counter, l, r, "<=", "lte"),
            WhereClause::Like(l, r) => cmp(counter, l, r, "LIKE", "like"),
            WhereClause::Ilike(l, r) => cmp(counter, l, r, "ILIKE", "ilike"),
            WhereClause::NotLike(l, r) => cmp(counter, l, r, "NOT LIKE", "notlike"),
            WhereClause::IsNull(c) => Fragment::new(format!("{} IS NULL", c.fqn())),
            WhereClause::IsNotNull(c) => Fragment::new(format!("{} IS NOT NULL", c.fqn())),
            WhereClause::InArray(c, values) => {
                let name = format!("in_{}_{}", c.name(), counter.next());
                let mut frag = Fragment::new(format!("{} = ANY(%({name})s)", c.fqn()));
                frag.params.insert(name, Value::Array(values.clone()));
                frag
            }
            WhereClause::NotInArray(c, values) => {
                let name = format!("notin_{}_{}", c.name(), counter.next());
                let mut frag = Fragment::new(format!("{} != ALL(%({name})s)", c.fqn()));
                frag.params.insert(name, Value::Array(values.clone()));
                frag
            }
            WhereClause::Between(c, lower, upper) => {
                between(counter, c, lower, upper, "BETWEEN", "between")
            }
            WhereClause::NotBetween(c, lower, upper) => {
                between(counter, c, lower, upper, "NOT BETWEEN", "notbetween")
            }
            WhereClause::Not(inner) => {
                let inner = inner.render(counter);
                Fragment {
                    sql: format!("NOT ({})", inner.sql),
                    params: inner.params,
                }
            }
            WhereClause::And(left, right) => boolean(counter, left, right, "AND"),
            WhereClause::Or(left, right) => boolean(counter, left, right, "OR"),
        }
    }
}

fn cmp(
    counter: &mut BindCounter,
    left: &ColumnInfo,
    right: &Operand,
    op: &str,
    prefix: &str,
) -> Fragment {
    // The index is consumed even for column-to-column comparisons, so
    // sibling clauses keep distinct indices either way.
    let count = counter.next();
    match right {
        Operand::Column(col) => Fragment::new(format!("{} {} {}", left.fqn(), op, col.fqn())),
        Operand::Value(v) => {
            let name = format!("{prefix}_{}_{count}", left.name());
            let mut frag = Fragment::new(format!("{} {} %({name})s", left.fqn(), op));
            frag.params.insert(name, v.clone());
            frag
        }
    }
}

fn between(
    counter: &mut BindCounter,
    column: &ColumnInfo,
    lower: &Value,
    upper: &Value,
    op: &str,
    prefix: &str,
) -> Fragment {
    let count = counter.next();
    let lower_name = format!("{prefix}_lower_{}_{count}", column.name());
    let upper_name = format!("{prefix}_upper_{}_{count}", column.name());
    let mut frag = Fragment::new(format!(
        "{} {op} %({lower_name})s AND %({upper_name})s",
        column.fqn()
    ));
    frag.params.insert(lower_name, lower.clone());
    frag.params.insert(upper_name, upper.clone());
    frag
}

fn boolean(counter: &mut BindCounter, left: &WhereClause, right: &WhereClause, op: &str) -> Fragment {
    // Left renders first and consumes the lower indices.
    let left_frag = left.render(counter);
    let right_frag = right.render(counter);
    let left_sql = parenthesize(left, left_frag.sql);
    let right_sql = parenthesize(right, right_frag.sql);
    let mut params = left_frag.params;
    params.extend(right_frag.params);
    Fragment {
        sql: format!("{left_sql} {op} {right_sql}"),
        params,
    }
}

fn parenthesize(clause: &WhereClause, sql: String) -> String {
    if clause.is_compound() {
        format!("({sql})")
    } else {
        sql
    }
}
