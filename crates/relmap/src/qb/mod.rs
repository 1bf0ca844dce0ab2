//! Statement builders.
//!
//! Builders accrete clauses monotonically and are consumed by `render`, which
//! produces one immutable [`crate::query::Query`]. A builder instance is a
//! short-lived, single-owner object; nothing is shared across renders.

pub mod insert;
pub mod select;
pub mod update;

pub use insert::InsertBuilder;
pub use select::SelectBuilder;
pub use update::UpdateBuilder;

use crate::schema::TableInfo;
use crate::selection::Selection;

/// Start a SELECT with an explicit selection shape.
pub fn select(selection: Selection) -> SelectBuilder {
    SelectBuilder::new(selection, false)
}

/// Start a SELECT DISTINCT with an explicit selection shape.
pub fn select_distinct(selection: Selection) -> SelectBuilder {
    SelectBuilder::new(selection, true)
}

/// Start a SELECT of every column of `table`, with `table` as the FROM.
pub fn select_all(table: &TableInfo) -> SelectBuilder {
    SelectBuilder::new(Selection::from_table(table), false).from(table)
}

/// Start an INSERT into `table`.
pub fn insert(table: &TableInfo) -> InsertBuilder {
    InsertBuilder::new(table)
}

/// Start an UPDATE of `table`.
pub fn update(table: &TableInfo) -> UpdateBuilder {
    UpdateBuilder::new(table)
}
