//! Migration ordering and DDL application.
//!
//! Tables are sorted so every table comes after the tables it foreign-keys
//! into, then their `CREATE TABLE IF NOT EXISTS` statements run one by one.

use std::collections::VecDeque;

use tracing::debug;

use crate::error::{OrmError, OrmResult};
use crate::executor::{AsyncExecutor, Executor};
use crate::query::Query;
use crate::schema::TableInfo;

/// Order `tables` so that any table is listed after all tables it
/// foreign-keys into.
///
/// Kahn's algorithm with a FIFO queue, so tables of equal in-degree keep
/// their input order. Self-references do not count toward in-degree (a table
/// that only references itself is otherwise unreachable). References to
/// tables outside the given set are ignored. A cycle among the given tables
/// is a [`OrmError::CircularDependency`].
pub fn topological_sort(tables: &[TableInfo]) -> OrmResult<Vec<TableInfo>> {
    let index_of = |name: &str| tables.iter().position(|t| t.name() == name);

    let mut in_degree = vec![0usize; tables.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); tables.len()];
    for (i, table) in tables.iter().enumerate() {
        for (_, column) in table.columns() {
            let Some(fk) = column.reference() else {
                continue;
            };
            let Some(target) = index_of(&fk.table) else {
                continue;
            };
            if target == i {
                continue;
            }
            // `table` depends on `target`: target must be created first.
            in_degree[i] += 1;
            dependents[target].push(i);
        }
    }

    let mut queue: VecDeque<usize> = (0..tables.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut sorted = Vec::with_capacity(tables.len());
    while let Some(i) = queue.pop_front() {
        sorted.push(tables[i].clone());
        for &dep in &dependents[i] {
            in_degree[dep] -= 1;
            if in_degree[dep] == 0 {
                queue.push_back(dep);
            }
        }
    }

    if sorted.len() < tables.len() {
        let stuck: Vec<&str> = tables
            .iter()
            .filter(|t| !sorted.iter().any(|s| s.name() == t.name()))
            .map(|t| t.name())
            .collect();
        return Err(OrmError::CircularDependency(stuck.join(", ")));
    }
    Ok(sorted)
}

/// The `CREATE TABLE` statements for `tables`, in dependency order.
pub fn sorted_ddl(tables: &[TableInfo]) -> OrmResult<Vec<String>> {
    Ok(topological_sort(tables)?.iter().map(TableInfo::ddl).collect())
}

/// Create every table through a blocking executor.
pub fn run<E: Executor>(executor: &mut E, tables: &[TableInfo]) -> OrmResult<()> {
    for ddl in sorted_ddl(tables)? {
        debug!(sql = %ddl, "applying migration");
        executor.execute(&Query::new(ddl))?;
    }
    Ok(())
}

/// Create every table through a suspending executor.
pub async fn run_async<E: AsyncExecutor>(executor: &mut E, tables: &[TableInfo]) -> OrmResult<()> {
    for ddl in sorted_ddl(tables)? {
        debug!(sql = %ddl, "applying migration");
        executor.execute(&Query::new(ddl)).await?;
    }
    Ok(())
}
