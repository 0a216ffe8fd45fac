//! Generic persistence operations driven by per-entity SQL.
//!
//! Entities describe their own statements through the capability traits
//! below; the functions here run them and apply the shared error contract.
//! Write operations take the caller's [`Transaction`]: returning their error
//! out of [`Database::transaction`](super::Database::transaction) rolls the
//! whole request back.

use anyhow::Result;
use rusqlite::{Connection, Row, Transaction, params_from_iter, types::Value};

use super::{Database, Table};

/// An entity that knows how to insert itself.
///
/// The statement should end in `RETURNING <id>`; statements that return no
/// row yield id `0`.
pub trait Insertable {
    fn insert_sql(&self) -> &str;
    fn insert_args(&self) -> Vec<Value>;
}

/// An entity that knows how to write its current state back.
pub trait Updatable {
    fn update_sql(&self) -> &str;
    fn update_args(&self) -> Vec<Value>;
}

/// Something that knows how to delete rows.
pub trait Deletable {
    fn delete_sql(&self) -> &str;
    fn delete_args(&self) -> Vec<Value>;
}

/// A read query together with its row decoder.
pub trait Queryable {
    type Output;

    fn query_sql(&self) -> &str;
    fn query_args(&self) -> Vec<Value>;
    fn from_row(&self, row: &Row<'_>) -> rusqlite::Result<Self::Output>;
}

/// A ready-made [`Queryable`] built from SQL, arguments and a decoder.
///
/// # Examples
///
/// ```
/// use pathfork::db::{Query, query};
/// use pathfork::Database;
///
/// # fn main() -> anyhow::Result<()> {
/// let db = Database::in_memory()?;
/// let emails: Query<String> = Query::new(
///     "SELECT email FROM tbl_user WHERE verified = ?1",
///     vec![true.into()],
///     |row| row.get(0),
/// );
///
/// assert!(query(&db.connection(), &emails)?.is_empty());
/// # Ok(())
/// # }
/// ```
pub struct Query<T> {
    sql: String,
    args: Vec<Value>,
    decode: Box<dyn Fn(&Row<'_>) -> rusqlite::Result<T>>,
}

impl<T> Query<T> {
    pub fn new(
        sql: impl Into<String>,
        args: Vec<Value>,
        decode: impl Fn(&Row<'_>) -> rusqlite::Result<T> + 'static,
    ) -> Self {
        Self {
            sql: sql.into(),
            args,
            decode: Box::new(decode),
        }
    }

    /// Returns the SQL text, mostly useful in tests.
    pub fn sql(&self) -> &str {
        &self.sql
    }
}

impl<T> Queryable for Query<T> {
    type Output = T;

    fn query_sql(&self) -> &str {
        &self.sql
    }

    fn query_args(&self) -> Vec<Value> {
        self.args.clone()
    }

    fn from_row(&self, row: &Row<'_>) -> rusqlite::Result<T> {
        (self.decode)(row)
    }
}

/// Inserts an entity and returns the id produced by its `RETURNING` clause.
///
/// A statement that returns no row is not an error and yields `0`.
pub fn insert(tx: &Transaction<'_>, item: &impl Insertable) -> Result<i64> {
    let result = tx.query_row(
        item.insert_sql(),
        params_from_iter(item.insert_args()),
        |row| row.get::<_, i64>(0),
    );

    match result {
        Ok(id) => Ok(id),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(e) => {
            tracing::error!("Insertion error, rollback: {}", e);
            Err(e.into())
        }
    }
}

/// Runs an entity's update statement.
pub fn update(tx: &Transaction<'_>, item: &impl Updatable) -> Result<()> {
    tx.execute(item.update_sql(), params_from_iter(item.update_args()))
        .map_err(|e| {
            tracing::error!("Update error, rollback: {}", e);
            e
        })?;
    Ok(())
}

/// Runs a delete statement.
pub fn delete(tx: &Transaction<'_>, item: &impl Deletable) -> Result<()> {
    tx.execute(item.delete_sql(), params_from_iter(item.delete_args()))
        .map_err(|e| {
            tracing::error!("Delete error, rollback: {}", e);
            e
        })?;
    Ok(())
}

/// Runs a query and decodes every row.
///
/// A single row that fails to decode fails the whole query.
pub fn query<Q: Queryable>(conn: &Connection, q: &Q) -> Result<Vec<Q::Output>> {
    let mut stmt = conn.prepare(q.query_sql())?;
    let rows = stmt
        .query_map(params_from_iter(q.query_args()), |row| q.from_row(row))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| {
            tracing::error!("Query error: {}", e);
            e
        })?;

    Ok(rows)
}

/// Runs a query and returns its first row, if any.
pub fn query_one<Q: Queryable>(conn: &Connection, q: &Q) -> Result<Option<Q::Output>> {
    Ok(query(conn, q)?.into_iter().next())
}

/// Whether `e` was caused by a UNIQUE, PRIMARY KEY or other constraint
/// failure.
pub fn is_constraint_violation(e: &anyhow::Error) -> bool {
    e.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<rusqlite::Error>(),
            Some(err) if err.sqlite_error_code() == Some(rusqlite::ErrorCode::ConstraintViolation)
        )
    })
}

struct DeleteById {
    sql: String,
    id: i64,
}

impl Deletable for DeleteById {
    fn delete_sql(&self) -> &str {
        &self.sql
    }

    fn delete_args(&self) -> Vec<Value> {
        vec![Value::Integer(self.id)]
    }
}

/// Deletes one row of `table` by primary key in its own transaction.
///
/// Returns whether a row was removed. Dependent rows go with it through the
/// schema's cascades.
pub fn delete_by_id(db: &Database, table: Table, id: i64) -> Result<bool> {
    let target = DeleteById {
        sql: format!("DELETE FROM {} WHERE {} = ?1", table.name(), table.key()),
        id,
    };

    db.transaction(|tx| {
        delete(tx, &target)?;
        Ok(tx.changes() > 0)
    })
    .map_err(|e| {
        tracing::error!("{} delete database error: {:#}", table.name(), e);
        e
    })
}
