//! Raw SQL escape hatch.
//!
//! A [`RawSql`] is a template whose `{}` slots may only be filled by table or
//! column references, which render as fully qualified names. User values are
//! never interpolated through this path; they go through bind parameters.

use crate::error::{OrmError, OrmResult};
use crate::schema::{ColumnInfo, TableInfo};

/// A template argument: a table or column reference, nothing else.
#[derive(Debug, Clone)]
pub enum SqlArg {
    Table(TableInfo),
    Column(ColumnInfo),
}

impl SqlArg {
    fn fqn(&self) -> String {
        match self {
            SqlArg::Table(t) => t.fqn(),
            SqlArg::Column(c) => c.fqn(),
        }
    }
}

impl From<&TableInfo> for SqlArg {
    fn from(t: &TableInfo) -> Self {
        SqlArg::Table(t.clone())
    }
}

impl From<&ColumnInfo> for SqlArg {
    fn from(c: &ColumnInfo) -> Self {
        SqlArg::Column(c.clone())
    }
}

/// A raw SQL expression with `{}` interpolation slots.
///
/// ```
/// use relmap::raw::RawSql;
/// use relmap::schema::{ColumnDef, TableBuilder};
///
/// let user = TableBuilder::new("user")
///     .column("id", ColumnDef::integer().primary())
///     .build();
/// let raw = RawSql::template("count({})", [user.column("id").unwrap().into()]);
/// assert_eq!(raw.render().unwrap(), r#"count("user"."id")"#);
/// ```
#[derive(Debug, Clone)]
pub struct RawSql {
    template: String,
    args: Vec<SqlArg>,
}

impl RawSql {
    /// A raw expression with no interpolation slots.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            template: sql.into(),
            args: Vec::new(),
        }
    }

    /// A raw expression whose `{}` slots are filled, in order, from `args`.
    pub fn template(template: impl Into<String>, args: impl IntoIterator<Item = SqlArg>) -> Self {
        Self {
            template: template.into(),
            args: args.into_iter().collect(),
        }
    }

    /// Render the template, substituting each slot with a fully qualified
    /// name. A slot/argument count mismatch is an
    /// [`OrmError::UnsupportedInterpolation`].
    pub fn render(&self) -> OrmResult<String> {
        let slots = self.template.matches("{}").count();
        if slots != self.args.len() {
            return Err(OrmError::UnsupportedInterpolation(format!(
                "template {:?} has {} slot(s) but {} argument(s) were supplied; \
                 only table and column references may be interpolated",
                self.template,
                slots,
                self.args.len()
            )));
        }
        let mut out = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();
        for arg in &self.args {
            // Slot count was checked above, so the split always succeeds.
            if let Some((before, after)) = rest.split_once("{}") {
                out.push_str(before);
                out.push_str(&arg.fqn());
                rest = after;
            }
        }
        out.push_str(rest);
        Ok(out)
    }
}
