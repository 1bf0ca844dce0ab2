//! Selection shapes: what a query's output looks like.
//!
//! A [`Selection`] maps named output fields to source expressions. Flat
//! columns render as plain projections; nested one/many relations fold joined
//! rows into JSON/array aggregates whose spelling differs by [`Dialect`].
//! That aggregate-render boundary is the only place dialect dispatch happens.

use crate::error::OrmResult;
use crate::raw::RawSql;
use crate::schema::{ColumnInfo, TableInfo};

/// Target SQL engine variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    Sqlite,
}

/// How one output field is sourced.
///
/// Nested variants are flat, one level: a `OneTableObject` or `ManyTableAgg`
/// carries the referenced table's own full column set, never another nested
/// selection.
#[derive(Debug, Clone)]
pub enum SelectionField {
    /// A single column, projected as-is.
    ColumnRef(ColumnInfo),
    /// One column aggregated across joined rows into an array.
    ManyColumnAgg(ColumnInfo),
    /// An entire joined row nested as one structured object.
    OneTableObject(TableInfo),
    /// Many joined rows, one structured object per row, in an array.
    ManyTableAgg(TableInfo),
    /// A raw SQL expression (table/column interpolation only).
    Raw(RawSql),
}

impl SelectionField {
    /// Render the source expression for this field.
    pub fn source_expr(&self, dialect: Dialect) -> OrmResult<String> {
        Ok(match self {
            SelectionField::ColumnRef(c) => c.fqn(),
            SelectionField::ManyColumnAgg(c) => match dialect {
                Dialect::Postgres => format!("array_agg({})", c.fqn()),
                Dialect::Sqlite => format!("json_group_array({})", c.fqn()),
            },
            SelectionField::OneTableObject(t) => json_object(t, dialect),
            SelectionField::ManyTableAgg(t) => match dialect {
                Dialect::Postgres => format!("json_agg({})", json_object(t, dialect)),
                Dialect::Sqlite => format!("json_group_array({})", json_object(t, dialect)),
            },
            SelectionField::Raw(raw) => raw.render()?,
        })
    }

    /// True for the nested one/many variants that decode from JSON text.
    pub fn is_nested(&self) -> bool {
        matches!(
            self,
            SelectionField::OneTableObject(_) | SelectionField::ManyTableAgg(_)
        )
    }
}

/// Pair every field of `table` with its fully qualified column, in the
/// dialect's object-constructor spelling.
fn json_object(table: &TableInfo, dialect: Dialect) -> String {
    let func = match dialect {
        Dialect::Postgres => "json_build_object",
        Dialect::Sqlite => "json_object",
    };
    let pairs: Vec<String> = table
        .columns()
        .map(|(field, column)| format!("'{field}', {}", column.fqn()))
        .collect();
    format!("{func}({})", pairs.join(", "))
}

/// A declared output shape: ordered named fields, each with one source.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    fields: Vec<(String, SelectionField)>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select every column of `table`, one `ColumnRef` per declared field.
    ///
    /// Joined tables do not contribute fields; only the from-table's own
    /// columns appear.
    pub fn from_table(table: &TableInfo) -> Self {
        let fields = table
            .columns()
            .map(|(field, column)| {
                (field.to_string(), SelectionField::ColumnRef(column.clone()))
            })
            .collect();
        Self { fields }
    }

    pub fn column(mut self, field: impl Into<String>, column: &ColumnInfo) -> Self {
        self.fields
            .push((field.into(), SelectionField::ColumnRef(column.clone())));
        self
    }

    pub fn many_column(mut self, field: impl Into<String>, column: &ColumnInfo) -> Self {
        self.fields
            .push((field.into(), SelectionField::ManyColumnAgg(column.clone())));
        self
    }

    pub fn one_table(mut self, field: impl Into<String>, table: &TableInfo) -> Self {
        self.fields
            .push((field.into(), SelectionField::OneTableObject(table.clone())));
        self
    }

    pub fn many_table(mut self, field: impl Into<String>, table: &TableInfo) -> Self {
        self.fields
            .push((field.into(), SelectionField::ManyTableAgg(table.clone())));
        self
    }

    pub fn raw(mut self, field: impl Into<String>, raw: RawSql) -> Self {
        self.fields.push((field.into(), SelectionField::Raw(raw)));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate `(field name, source)` pairs in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &SelectionField)> {
        self.fields.iter().map(|(f, s)| (f.as_str(), s))
    }

    /// Render the full projection list: `<expr> AS "<field>", ...`.
    pub fn projection(&self, dialect: Dialect) -> OrmResult<String> {
        let mut parts = Vec::with_capacity(self.fields.len());
        for (field, source) in &self.fields {
            parts.push(format!("{} AS \"{field}\"", source.source_expr(dialect)?));
        }
        Ok(parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnDef, TableBuilder};

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
    fn from_table_expands_every_column() {
        let (user, _) = schema();
        let sel = Selection::from_table(&user);
        let projection = sel.projection(Dialect::Postgres).unwrap();
        assert_eq!(
            projection,
            r#""user"."id" AS "id", "user"."email" AS "email""#
        );
    }

    #[test]
    fn many_column_agg_per_dialect() {
        let (_, message) = schema();
        let sel = Selection::new().many_column("message_ids", message.column("id").unwrap());
        assert_eq!(
            sel.projection(Dialect::Postgres).unwrap(),
            r#"array_agg("message"."id") AS "message_ids""#
        );
        assert_eq!(
            sel.projection(Dialect::Sqlite).unwrap(),
            r#"json_group_array("message"."id") AS "message_ids""#
        );
    }

    #[test]
    fn one_table_object_lists_all_columns() {
        let (user, _) = schema();
        let sel = Selection::new().one_table("author", &user);
        assert_eq!(
            sel.projection(Dialect::Postgres).unwrap(),
            r#"json_build_object('id', "user"."id", 'email', "user"."email") AS "author""#
        );
        assert_eq!(
            sel.projection(Dialect::Sqlite).unwrap(),
            r#"json_object('id', "user"."id", 'email', "user"."email") AS "author""#
        );
    }

    #[test]
    fn many_table_agg_wraps_object_in_array_agg() {
        let (_, message) = schema();
        let sel = Selection::new().many_table("messages", &message);
        let pg = sel.projection(Dialect::Postgres).unwrap();
        assert!(pg.starts_with("json_agg(json_build_object("));
        let lite = sel.projection(Dialect::Sqlite).unwrap();
        assert!(lite.starts_with("json_group_array(json_object("));
    }

    #[test]
    fn raw_field_renders_template() {
        let (user, _) = schema();
        let sel = Selection::new().raw(
            "total",
            RawSql::template("count({})", [user.column("id").unwrap().into()]),
        );
        assert_eq!(
            sel.projection(Dialect::Postgres).unwrap(),
            r#"count("user"."id") AS "total""#
        );
    }

    #[test]
    fn mixed_selection_preserves_declaration_order() {
        let (user, message) = schema();
        let sel = Selection::new()
            .column("id", user.column("id").unwrap())
            .many_table("messages", &message);
        let projection = sel.projection(Dialect::Postgres).unwrap();
        let id_at = projection.find(r#"AS "id""#).unwrap();
        let msgs_at = projection.find(r#"AS "messages""#).unwrap();
        assert!(id_at < msgs_at);
    }
}
