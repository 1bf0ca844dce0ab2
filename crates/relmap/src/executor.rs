//! Execution collaborator contracts.
//!
//! The core only renders queries; running them is delegated to an executor
//! supplied by the caller. Blocking and suspending paths are two distinct
//! traits over the same rendered [`Query`] value, chosen at the call site,
//! never by runtime inspection of a connection.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::OrmResult;
use crate::query::Query;
use crate::selection::Dialect;

/// A fetched row: column name to value.
pub type Row = BTreeMap<String, Value>;

/// Blocking execution collaborator.
///
/// Retry, timeout, and transaction policy all live behind this trait; the
/// core raises nothing retryable.
pub trait Executor {
    /// The SQL dialect this executor's engine speaks.
    fn dialect(&self) -> Dialect;

    /// Run a statement expected to produce no rows.
    fn execute(&mut self, query: &Query) -> OrmResult<()>;

    /// Run a statement once per entry of `query.many_params`.
    fn execute_batch(&mut self, query: &Query) -> OrmResult<()>;

    /// Run a statement and return its raw rows.
    fn fetch(&mut self, query: &Query) -> OrmResult<Vec<Row>>;
}

/// Suspending execution collaborator; mirrors [`Executor`] operation for
/// operation.
pub trait AsyncExecutor {
    fn dialect(&self) -> Dialect;

    fn execute(&mut self, query: &Query) -> impl Future<Output = OrmResult<()>> + Send;

    fn execute_batch(&mut self, query: &Query) -> impl Future<Output = OrmResult<()>> + Send;

    fn fetch(&mut self, query: &Query) -> impl Future<Output = OrmResult<Vec<Row>>> + Send;
}
