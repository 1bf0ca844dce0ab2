//! relmap: a schema-definition-first query builder and row mapper for
//! PostgreSQL and SQLite.
//!
//! Declare tables once with [`schema::TableBuilder`], sort them by
//! foreign-key dependency for migration ([`migrate::topological_sort`]),
//! compose WHERE/JOIN/ORDER clauses ([`clause::WhereClause`]), describe the
//! output shape with a [`selection::Selection`] (flat columns or nested
//! one/many JSON aggregates), and render SELECT/INSERT/UPDATE statements
//! with named bind parameters through the builders in [`qb`].
//!
//! The crate never talks to a database. Rendering produces an immutable
//! [`query::Query`] and execution goes through a caller-supplied
//! [`executor::Executor`] or [`executor::AsyncExecutor`]; fetched rows come
//! back through [`mapper::map_rows`] as any `serde`-deserializable type.
//!
//! ```
//! use relmap::prelude::*;
//!
//! let user = TableBuilder::new("user")
//!     .column("id", ColumnDef::integer().primary())
//!     .column("email", ColumnDef::text().not_null())
//!     .build();
//!
//! let query = select_all(&user)
//!     .where_clause(WhereClause::eq(user.column("id").unwrap(), 1))
//!     .render(Dialect::Postgres)
//!     .unwrap();
//! assert_eq!(
//!     query.sql,
//!     r#"SELECT "user"."id" AS "id", "user"."email" AS "email" FROM "user" WHERE "user"."id" = %(eq_id_0)s"#
//! );
//! ```

pub mod clause;
pub mod error;
pub mod executor;
pub mod join;
pub mod mapper;
pub mod migrate;
pub mod order;
pub mod qb;
pub mod query;
pub mod raw;
pub mod schema;
pub mod selection;

pub use error::{OrmError, OrmResult};

/// Common imports for declaring schemas and building queries.
pub mod prelude {
    pub use crate::clause::WhereClause;
    pub use crate::error::{OrmError, OrmResult};
    pub use crate::executor::{AsyncExecutor, Executor, Row};
    pub use crate::join::JoinClause;
    pub use crate::mapper::map_rows;
    pub use crate::order::{NullsOrder, OrderByClause};
    pub use crate::qb::{insert, select, select_all, select_distinct, update};
    pub use crate::query::Query;
    pub use crate::raw::{RawSql, SqlArg};
    pub use crate::schema::{ColumnDef, OnDelete, SqlType, TableBuilder, TableInfo};
    pub use crate::selection::{Dialect, Selection};
}
