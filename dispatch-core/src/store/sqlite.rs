//! SQLite-backed store implementation for persisted dispatch state.
//!
//! Each entity is stored as a JSON document next to the columns used for
//! filtering and concurrency control. The `revision` column is
//! authoritative; the copy inside the document is ignored on read.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use rusqlite::{Connection, OptionalExtension, Transaction, params, params_from_iter, types::ToSql};
use thiserror::Error;

use super::{
    Change, ChangeSet, CourierFilter, DispatchStore, EntityRef, OrderFilter, StoreError,
    check_revision,
};
use crate::{Courier, CourierId, Order, OrderId};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS couriers (
    id INTEGER PRIMARY KEY,
    revision INTEGER NOT NULL,
    body TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS orders (
    id INTEGER PRIMARY KEY,
    status TEXT NOT NULL,
    rider_id INTEGER,
    revision INTEGER NOT NULL,
    body TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS orders_by_rider ON orders (rider_id);
";

/// Error raised when opening or reading the SQLite database.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Opening the SQLite database failed.
    #[error("failed to open SQLite database at {path}: {source}")]
    OpenDatabase {
        /// Location of the SQLite database on disk.
        path: PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// A stored JSON document could not be decoded.
    #[error("failed to parse stored {table} row {id}: {source}")]
    InvalidPayload {
        /// Table holding the row.
        table: &'static str,
        /// Row identifier.
        id: u64,
        /// JSON decoding failure.
        #[source]
        source: serde_json::Error,
    },
    /// An entity could not be encoded for storage.
    #[error("failed to encode {entity}: {source}")]
    Encode {
        /// Entity being written.
        entity: EntityRef,
        /// JSON encoding failure.
        #[source]
        source: serde_json::Error,
    },
    /// Generic SQLite error.
    #[error(transparent)]
    Database(#[from] rusqlite::Error),
}

impl From<SqliteStoreError> for StoreError {
    fn from(err: SqliteStoreError) -> Self {
        Self::Backend(Box::new(err))
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        SqliteStoreError::Database(err).into()
    }
}

/// [`DispatchStore`] persisted in SQLite, one transaction per commit.
#[derive(Debug)]
pub struct SqliteDispatchStore {
    connection: Mutex<Connection>,
}

impl SqliteDispatchStore {
    /// Open or create the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SqliteStoreError> {
        let path = path.as_ref();
        let connection =
            Connection::open(path).map_err(|source| SqliteStoreError::OpenDatabase {
                path: path.to_path_buf(),
                source,
            })?;
        Self::with_connection(connection)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, SqliteStoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(connection: Connection) -> Result<Self, SqliteStoreError> {
        connection.execute_batch(SCHEMA)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl DispatchStore for SqliteDispatchStore {
    fn order(&self, id: OrderId) -> Result<Order, StoreError> {
        let connection = self.lock();
        let row: Option<(u64, String)> = connection
            .query_row(
                "SELECT revision, body FROM orders WHERE id = ?1",
                params![id.0],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let (revision, body) = row.ok_or(StoreError::OrderNotFound(id))?;
        Ok(decode_order(id.0, revision, &body)?)
    }

    fn orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, StoreError> {
        let mut clauses = Vec::new();
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();
        if !filter.statuses().is_empty() {
            let placeholders = vec!["?"; filter.statuses().len()].join(", ");
            clauses.push(format!("status IN ({placeholders})"));
            values.extend(
                filter
                    .statuses()
                    .iter()
                    .map(|status| Box::new(status.to_string()) as Box<dyn ToSql>),
            );
        }
        if let Some(rider) = filter.rider_id() {
            clauses.push("rider_id = ?".to_owned());
            values.push(Box::new(rider.0));
        }
        let mut query = String::from("SELECT id, revision, body FROM orders");
        if !clauses.is_empty() {
            query.push_str(" WHERE ");
            query.push_str(&clauses.join(" AND "));
        }
        query.push_str(" ORDER BY id");

        let connection = self.lock();
        let mut statement = connection.prepare(&query)?;
        let mut rows = statement.query(params_from_iter(values.iter()))?;
        let mut orders = Vec::new();
        while let Some(row) = rows.next()? {
            let id: u64 = row.get(0)?;
            let revision: u64 = row.get(1)?;
            let body: String = row.get(2)?;
            orders.push(decode_order(id, revision, &body)?);
        }
        Ok(orders)
    }

    fn courier(&self, id: CourierId) -> Result<Courier, StoreError> {
        let connection = self.lock();
        let row: Option<(u64, String)> = connection
            .query_row(
                "SELECT revision, body FROM couriers WHERE id = ?1",
                params![id.0],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let (revision, body) = row.ok_or(StoreError::CourierNotFound(id))?;
        Ok(decode_courier(id.0, revision, &body)?)
    }

    fn couriers(&self, filter: &CourierFilter) -> Result<Vec<Courier>, StoreError> {
        let connection = self.lock();
        let mut statement =
            connection.prepare("SELECT id, revision, body FROM couriers ORDER BY id")?;
        let mut rows = statement.query([])?;
        let mut couriers = Vec::new();
        while let Some(row) = rows.next()? {
            let id: u64 = row.get(0)?;
            let revision: u64 = row.get(1)?;
            let body: String = row.get(2)?;
            let courier = decode_courier(id, revision, &body)?;
            if filter.matches(&courier) {
                couriers.push(courier);
            }
        }
        Ok(couriers)
    }

    fn commit(&self, changes: ChangeSet) -> Result<(), StoreError> {
        changes.check_invariants()?;
        let mut connection = self.lock();
        let tx = connection.transaction()?;
        for change in changes {
            apply_change(&tx, change)?;
        }
        check_riders_exist(&tx)?;
        tx.commit()?;
        Ok(())
    }
}

fn apply_change(tx: &Transaction<'_>, change: Change) -> Result<(), StoreError> {
    let entity = change.entity();
    let expected = change.expected_revision();
    match change {
        Change::PutOrder(order) => {
            let found = stored_revision(tx, "orders", order.id.0)?.unwrap_or(0);
            check_revision(entity, expected, found)?;
            let body = serde_json::to_string(&order)
                .map_err(|source| SqliteStoreError::Encode { entity, source })?;
            tx.execute(
                "INSERT INTO orders (id, status, rider_id, revision, body)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                    status = excluded.status,
                    rider_id = excluded.rider_id,
                    revision = excluded.revision,
                    body = excluded.body",
                params![
                    order.id.0,
                    order.status.to_string(),
                    order.rider_id.map(|rider| rider.0),
                    found + 1,
                    body
                ],
            )?;
        }
        Change::DeleteOrder { id, .. } => {
            let found =
                stored_revision(tx, "orders", id.0)?.ok_or(StoreError::OrderNotFound(id))?;
            check_revision(entity, expected, found)?;
            tx.execute("DELETE FROM orders WHERE id = ?1", params![id.0])?;
        }
        Change::PutCourier(courier) => {
            let found = stored_revision(tx, "couriers", courier.id.0)?.unwrap_or(0);
            check_revision(entity, expected, found)?;
            let body = serde_json::to_string(&courier)
                .map_err(|source| SqliteStoreError::Encode { entity, source })?;
            tx.execute(
                "INSERT INTO couriers (id, revision, body) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET
                    revision = excluded.revision,
                    body = excluded.body",
                params![courier.id.0, found + 1, body],
            )?;
        }
    }
    Ok(())
}

fn stored_revision(
    tx: &Transaction<'_>,
    table: &'static str,
    id: u64,
) -> Result<Option<u64>, rusqlite::Error> {
    tx.query_row(
        &format!("SELECT revision FROM {table} WHERE id = ?1"),
        params![id],
        |row| row.get(0),
    )
    .optional()
}

fn check_riders_exist(tx: &Transaction<'_>) -> Result<(), StoreError> {
    let orphan: Option<u64> = tx
        .query_row(
            "SELECT o.rider_id FROM orders o
             LEFT JOIN couriers c ON c.id = o.rider_id
             WHERE o.rider_id IS NOT NULL AND c.id IS NULL
             LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()?;
    orphan.map_or(Ok(()), |rider| {
        Err(StoreError::CourierNotFound(CourierId(rider)))
    })
}

fn decode_order(id: u64, revision: u64, body: &str) -> Result<Order, SqliteStoreError> {
    let mut order: Order =
        serde_json::from_str(body).map_err(|source| SqliteStoreError::InvalidPayload {
            table: "orders",
            id,
            source,
        })?;
    order.revision = revision;
    Ok(order)
}

fn decode_courier(id: u64, revision: u64, body: &str) -> Result<Courier, SqliteStoreError> {
    let mut courier: Courier =
        serde_json::from_str(body).map_err(|source| SqliteStoreError::InvalidPayload {
            table: "couriers",
            id,
            source,
        })?;
    courier.revision = revision;
    Ok(courier)
}
