//! Table and column metadata.
//!
//! Schemas are declared in two phases. Phase 1 builds [`ColumnDef`]s, which do
//! not yet know which table owns them (the table name may not be decided until
//! every column is attached). Phase 2 is [`TableBuilder::build`], which binds
//! the table name, resolves every column's database name, and back-fills the
//! owning-table reference into each [`ColumnInfo`].
//!
//! Foreign keys are stored as symbolic `table`/`column` name pairs rather than
//! direct references, so a column can point at a table that has not been built
//! yet (including its own table).
//!
//! # Example
//! ```
//! use relmap::schema::{ColumnDef, TableBuilder};
//!
//! let user = TableBuilder::new("user")
//!     .column("id", ColumnDef::integer().primary())
//!     .column("email", ColumnDef::text().not_null())
//!     .build();
//!
//! assert_eq!(user.fqn(), r#""user""#);
//! assert_eq!(user.column("id").unwrap().fqn(), r#""user"."id""#);
//! ```

use std::collections::BTreeMap;
use std::fmt::Write;

use heck::ToSnakeCase;
use serde_json::Value;

use crate::error::{OrmError, OrmResult};

/// SQL column type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Integer,
    Serial,
    Real,
    Boolean,
    Timestamp,
    Jsonb,
    Varchar(u32),
    /// A named enum type, created separately from the table.
    Enum(String),
}

impl SqlType {
    /// Render the type as it appears in DDL.
    pub fn to_sql(&self) -> String {
        match self {
            SqlType::Text => "TEXT".to_string(),
            SqlType::Integer => "INTEGER".to_string(),
            SqlType::Serial => "SERIAL".to_string(),
            SqlType::Real => "REAL".to_string(),
            SqlType::Boolean => "BOOLEAN".to_string(),
            SqlType::Timestamp => "TIMESTAMP".to_string(),
            SqlType::Jsonb => "JSONB".to_string(),
            SqlType::Varchar(n) => format!("VARCHAR({n})"),
            SqlType::Enum(name) => name.clone(),
        }
    }
}

/// ON DELETE referential action for a foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    NoAction,
    Restrict,
    SetNull,
    SetDefault,
    Cascade,
}

impl OnDelete {
    fn to_sql(self) -> &'static str {
        match self {
            OnDelete::NoAction => "NO ACTION",
            OnDelete::Restrict => "RESTRICT",
            OnDelete::SetNull => "SET NULL",
            OnDelete::SetDefault => "SET DEFAULT",
            OnDelete::Cascade => "CASCADE",
        }
    }
}

/// A foreign-key reference held symbolically by table and column name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub table: String,
    pub column: String,
    pub on_delete: Option<OnDelete>,
}

/// A column definition before it is attached to a table.
///
/// `name` is optional: when absent the column takes the field name it is
/// registered under, resolved at [`TableBuilder::build`] time.
#[derive(Debug, Clone)]
pub struct ColumnDef {
    sql_type: SqlType,
    name: Option<String>,
    default: Option<Value>,
    primary: bool,
    not_null: bool,
    reference: Option<ForeignKey>,
}

impl ColumnDef {
    /// Create a column definition of the given type.
    pub fn new(sql_type: SqlType) -> Self {
        Self {
            sql_type,
            name: None,
            default: None,
            primary: false,
            not_null: false,
            reference: None,
        }
    }

    pub fn text() -> Self {
        Self::new(SqlType::Text)
    }

    pub fn integer() -> Self {
        Self::new(SqlType::Integer)
    }

    pub fn serial() -> Self {
        Self::new(SqlType::Serial)
    }

    pub fn real() -> Self {
        Self::new(SqlType::Real)
    }

    pub fn boolean() -> Self {
        Self::new(SqlType::Boolean)
    }

    pub fn timestamp() -> Self {
        Self::new(SqlType::Timestamp)
    }

    pub fn jsonb() -> Self {
        Self::new(SqlType::Jsonb)
    }

    pub fn varchar(n: u32) -> Self {
        Self::new(SqlType::Varchar(n))
    }

    pub fn enumeration(type_name: impl Into<String>) -> Self {
        Self::new(SqlType::Enum(type_name.into()))
    }

    /// Set an explicit database column name (otherwise the field name is used).
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set a default value, rendered into the column DDL.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Mark this column PRIMARY KEY.
    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    /// Mark this column NOT NULL.
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Declare a foreign key by target table and column name.
    ///
    /// The target is resolved by name only, so it may refer to a table that
    /// has not been built yet, or to this column's own table.
    pub fn fk(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.reference = Some(ForeignKey {
            table: table.into(),
            column: column.into(),
            on_delete: None,
        });
        self
    }

    /// Set the ON DELETE action for a previously declared foreign key.
    pub fn on_delete(mut self, action: OnDelete) -> Self {
        if let Some(fk) = &mut self.reference {
            fk.on_delete = Some(action);
        }
        self
    }
}

/// A finalized column: definition plus its resolved name and owning table.
#[derive(Debug, Clone)]
pub struct ColumnInfo {
    table_name: String,
    name: String,
    sql_type: SqlType,
    primary: bool,
    not_null: bool,
    default: Option<Value>,
    reference: Option<ForeignKey>,
}

impl ColumnInfo {
    /// The database column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The owning table's database name.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// The column's declared default value, if any.
    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// The symbolic foreign-key reference, if any.
    pub fn reference(&self) -> Option<&ForeignKey> {
        self.reference.as_ref()
    }

    /// The fully qualified name: `"table"."column"`.
    pub fn fqn(&self) -> String {
        format!("\"{}\".\"{}\"", self.table_name, self.name)
    }

    /// Render the DDL fragment for this column.
    ///
    /// ```
    /// use relmap::schema::{ColumnDef, TableBuilder};
    ///
    /// let t = TableBuilder::new("user")
    ///     .column("id", ColumnDef::text().primary().not_null())
    ///     .build();
    /// let ddl = t.column("id").unwrap().ddl();
    /// assert!(ddl.contains(r#""id" TEXT"#));
    /// assert!(ddl.contains("NOT NULL"));
    /// assert!(ddl.contains("PRIMARY KEY"));
    /// ```
    pub fn ddl(&self) -> String {
        let mut out = format!("\"{}\" {}", self.name, self.sql_type.to_sql());
        if let Some(default) = &self.default {
            let rendered = match default {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            let _ = write!(out, " DEFAULT '{rendered}'");
        }
        if self.not_null {
            out.push_str(" NOT NULL");
        }
        if self.primary {
            out.push_str(" PRIMARY KEY");
        }
        if let Some(fk) = &self.reference {
            let _ = write!(out, " REFERENCES \"{}\"(\"{}\")", fk.table, fk.column);
            if let Some(action) = fk.on_delete {
                let _ = write!(out, " ON DELETE {}", action.to_sql());
            }
        }
        out
    }
}

/// A finalized table: resolved name plus its ordered columns.
///
/// `TableInfo` is constructed once at schema-declaration time and treated as
/// immutable for the remainder of the process; concurrent readers need no
/// synchronization.
#[derive(Debug, Clone)]
pub struct TableInfo {
    name: String,
    /// Field name → finalized column, in declaration order.
    columns: Vec<(String, ColumnInfo)>,
}

impl TableInfo {
    /// The table's database name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The fully qualified (quoted) table name.
    pub fn fqn(&self) -> String {
        format!("\"{}\"", self.name)
    }

    /// Iterate `(field name, column)` pairs in declaration order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &ColumnInfo)> {
        self.columns.iter().map(|(f, c)| (f.as_str(), c))
    }

    /// Look up a column by its field name.
    pub fn column(&self, field: &str) -> Option<&ColumnInfo> {
        self.columns
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, c)| c)
    }

    /// Ordered field-name → column-name mapping.
    pub fn column_names(&self) -> Vec<(String, String)> {
        self.columns
            .iter()
            .map(|(f, c)| (f.clone(), c.name.clone()))
            .collect()
    }

    /// Generate the full `CREATE TABLE IF NOT EXISTS` DDL.
    ///
    /// Idempotent: never drops or alters an existing table.
    pub fn ddl(&self) -> String {
        let columns: Vec<String> = self.columns.iter().map(|(_, c)| c.ddl()).collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({});",
            self.fqn(),
            columns.join(", ")
        )
    }

    /// Map a field-keyed row to its column-keyed representation for INSERT.
    ///
    /// A field missing from `row` falls back to the column default; a column
    /// with neither a value nor a default is a schema error.
    pub fn value_map(&self, row: &BTreeMap<String, Value>) -> OrmResult<BTreeMap<String, Value>> {
        let mut out = BTreeMap::new();
        for (field, column) in &self.columns {
            let value = match row.get(field) {
                Some(v) => v.clone(),
                None => match &column.default {
                    Some(d) => d.clone(),
                    None => {
                        return Err(OrmError::schema(format!(
                            "no value or default for column '{}' of table '{}'",
                            column.name, self.name
                        )));
                    }
                },
            };
            out.insert(column.name.clone(), value);
        }
        Ok(out)
    }
}

/// Phase-1 table builder: collects column definitions, then `build()` binds
/// names in one finalize step.
#[derive(Debug, Clone)]
pub struct TableBuilder {
    name: String,
    columns: Vec<(String, ColumnDef)>,
}

impl TableBuilder {
    /// Start a table with an explicit database name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Start a table whose name is derived by snake-casing a type name.
    ///
    /// ```
    /// use relmap::schema::TableBuilder;
    /// assert_eq!(TableBuilder::from_type_name("UserProfile").build().name(), "user_profile");
    /// ```
    pub fn from_type_name(type_name: &str) -> Self {
        Self::new(type_name.to_snake_case())
    }

    /// Register a column under a field name.
    pub fn column(mut self, field: impl Into<String>, def: ColumnDef) -> Self {
        self.columns.push((field.into(), def));
        self
    }

    /// Finalize the table: resolve column names and bind the owning table.
    pub fn build(self) -> TableInfo {
        let table_name = self.name;
        let columns = self
            .columns
            .into_iter()
            .map(|(field, def)| {
                let name = def.name.unwrap_or_else(|| field.clone());
                let info = ColumnInfo {
                    table_name: table_name.clone(),
                    name,
                    sql_type: def.sql_type,
                    primary: def.primary,
                    not_null: def.not_null,
                    default: def.default,
                    reference: def.reference,
                };
                (field, info)
            })
            .collect();
        TableInfo {
            name: table_name,
            columns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user_table() -> TableInfo {
        TableBuilder::new("user")
            .column("id", ColumnDef::integer().primary())
            .column(
                "email",
                ColumnDef::text().name("user_email").not_null().default_value("text"),
            )
            .build()
    }

    #[test]
    fn column_name_defaults_to_field_name() {
        let t = user_table();
        assert_eq!(t.column("id").unwrap().name(), "id");
        assert_eq!(t.column("email").unwrap().name(), "user_email");
    }

    #[test]
    fn fqn_quotes_table_and_column() {
        let t = user_table();
        assert_eq!(t.column("id").unwrap().fqn(), r#""user"."id""#);
    }

    #[test]
    fn primary_not_null_text_ddl() {
        let t = TableBuilder::new("user")
            .column("id", ColumnDef::text().primary().not_null())
            .build();
        let ddl = t.column("id").unwrap().ddl();
        assert!(ddl.contains(r#""id" TEXT"#));
        assert!(ddl.contains("NOT NULL"));
        assert!(ddl.contains("PRIMARY KEY"));
        assert!(!ddl.contains("REFERENCES"));
    }

    #[test]
    fn fk_ddl_renders_references_and_on_delete() {
        let t = TableBuilder::new("message")
            .column(
                "user_id",
                ColumnDef::integer().fk("user", "id").on_delete(OnDelete::Cascade),
            )
            .build();
        let ddl = t.column("user_id").unwrap().ddl();
        assert!(ddl.contains(r#"REFERENCES "user"("id")"#));
        assert!(ddl.contains("ON DELETE CASCADE"));
    }

    #[test]
    fn default_value_ddl() {
        let t = user_table();
        let ddl = t.column("email").unwrap().ddl();
        assert!(ddl.contains("DEFAULT 'text'"));
    }

    #[test]
    fn table_ddl_is_idempotent_create() {
        let t = user_table();
        let ddl = t.ddl();
        assert!(ddl.starts_with(r#"CREATE TABLE IF NOT EXISTS "user" ("#));
        assert!(ddl.ends_with(");"));
    }

    #[test]
    fn varchar_renders_length() {
        assert_eq!(SqlType::Varchar(32).to_sql(), "VARCHAR(32)");
    }

    #[test]
    fn value_map_keys_by_column_name() {
        let t = user_table();
        let mut row = BTreeMap::new();
        row.insert("id".to_string(), json!(1));
        row.insert("email".to_string(), json!("a@b.com"));
        let map = t.value_map(&row).unwrap();
        assert_eq!(map.get("id"), Some(&json!(1)));
        assert_eq!(map.get("user_email"), Some(&json!("a@b.com")));
    }

    #[test]
    fn value_map_falls_back_to_default() {
        let t = user_table();
        let mut row = BTreeMap::new();
        row.insert("id".to_string(), json!(1));
        let map = t.value_map(&row).unwrap();
        assert_eq!(map.get("user_email"), Some(&json!("text")));
    }

    #[test]
    fn value_map_errors_without_value_or_default() {
        let t = user_table();
        let row = BTreeMap::new();
        let err = t.value_map(&row).unwrap_err();
        assert!(matches!(err, OrmError::Schema(_)));
    }

    #[test]
    fn from_type_name_snake_cases() {
        assert_eq!(TableBuilder::from_type_name("ChatMessage").build().name(), "chat_message");
    }
}
