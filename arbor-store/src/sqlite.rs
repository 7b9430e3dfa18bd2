// SPDX-License-Identifier: MIT OR Apache-2.0

use std::str::FromStr;
use std::sync::Arc;

use arbor_core::{AssigneeError, IdError, LevelError, ResourceError};
use sqlx::migrate::{MigrateDatabase, Migrator};
use sqlx::sqlite::{SqliteConnection, SqlitePoolOptions};
use sqlx::{Sqlite, migrate};
use thiserror::Error;
use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, trace};

use crate::traits::TransactionPermit;

/// Create SQLite database if it doesn't already exist.
pub async fn create_database(url: &str) -> Result<(), SqliteError> {
    if !Sqlite::database_exists(url).await? {
        Sqlite::create_database(url).await?
    }
    Ok(())
}

/// Drop SQLite database if it exists.
pub async fn drop_database(url: &str) -> Result<(), SqliteError> {
    if Sqlite::database_exists(url).await? {
        Sqlite::drop_database(url).await?
    }
    Ok(())
}

/// Get migrations from folder without running them.
pub fn migrations() -> Migrator {
    migrate!()
}

/// Run any pending database migrations from inside the application.
pub async fn run_pending_migrations(pool: &sqlx::SqlitePool) -> Result<(), SqliteError> {
    migrations().run(pool).await?;
    Ok(())
}

pub struct SqliteStoreBuilder {
    url: String,
    max_connections: u32,
    run_migrations: bool,
    create_database: bool,
}

impl Default for SqliteStoreBuilder {
    fn default() -> Self {
        Self {
            url: "sqlite::memory:".into(),
            max_connections: 16,
            create_database: true,
            run_migrations: true,
        }
    }
}

impl SqliteStoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(any(test, feature = "test_utils"))]
    pub fn random_memory_url(mut self) -> Self {
        // Combining Rust tests with in-memory databases can lead to unsound behaviour, this
        // "workaround" assigns every temporary database a different, random name and keeps them
        // isolated from other tests.
        //
        // See related issue: https://github.com/launchbadge/sqlx/issues/2510
        self.url = format!(
            "sqlite://dbmem{}?mode=memory&cache=private",
            rand::random::<u32>()
        );
        self
    }

    pub fn database_url(mut self, url: &str) -> Self {
        self.url = url.to_string();
        self
    }

    pub fn max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn create_database(mut self, create_database: bool) -> Self {
        self.create_database = create_database;
        self
    }

    pub fn run_default_migrations(mut self, run_migrations: bool) -> Self {
        self.run_migrations = run_migrations;
        self
    }

    pub async fn build<'a>(self) -> Result<SqliteStore<'a>, SqliteError> {
        if self.create_database {
            create_database(&self.url).await?;
        }

        let pool: sqlx::SqlitePool = SqlitePoolOptions::new()
            .max_connections(self.max_connections)
            .connect(&self.url)
            .await?;

        if self.run_migrations {
            run_pending_migrations(&pool).await?;
            debug!(url = %self.url, "ran pending migrations");
        }

        Ok(SqliteStore::new(pool))
    }
}

pub type Transaction<'a> = sqlx::Transaction<'a, Sqlite>;

/// SQLite database with connection pool and transaction provider.
///
/// This struct can be cloned and used in multiple places in the application. Every cloned instance
/// will re-use the same connection pool and have access to the same transaction instance if one
/// was started.
///
/// SQLite strictly serializes transactions with _writes_. Processes starting a transaction acquire
/// a `TransactionPermit` and keep it until the transaction was committed or rolled back, any
/// concurrent `begin` waits for that. All writes of the permission engine (page creation, moves,
/// grant edits and their propagation) happen inside such a transaction, which also serializes
/// mutations touching the same pages.
///
/// Only the handle returned by `transactional` writes into and reads from the open transaction.
/// All other handles read through their own pool connection and only ever see committed state.
#[derive(Clone, Debug)]
pub struct SqliteStore<'a> {
    tx: Arc<Mutex<Option<Transaction<'a>>>>,
    pool: sqlx::SqlitePool,
    semaphore: Arc<Semaphore>,
    transactional: bool,
}

impl<'a> SqliteStore<'a> {
    pub(crate) fn new(pool: sqlx::SqlitePool) -> Self {
        Self {
            tx: Arc::default(),
            pool,
            // SQLite only ever allows _one_ transaction at a time. This might be a repetition of
            // what sqlx and SQLite do under the hood, but we want to make this behaviour explicit
            // right from the beginning with this semaphore.
            semaphore: Arc::new(Semaphore::new(1)),
            transactional: false,
        }
    }

    /// Shortcut building an in-memory SQLite database with a randomised name for testing purposes.
    ///
    /// The database lives on a single connection. While a transaction holds it, reads of other
    /// handles wait until it was committed or rolled back.
    #[cfg(any(test, feature = "test_utils"))]
    pub async fn temporary() -> Self {
        SqliteStoreBuilder::new()
            .random_memory_url()
            .max_connections(1)
            .build()
            .await
            .expect("migrations succeeded")
    }

    /// Execute SQL query within transaction.
    ///
    /// This method will return an error when no transaction is currently given or this is not a
    /// transactional handle. Make sure to call `begin` before.
    ///
    /// If the query fails the user probably wants to roll back the transaction and free the
    /// permit. This is _not_ handled automatically.
    pub async fn tx<F, R>(&self, f: F) -> Result<R, SqliteError>
    where
        F: AsyncFnOnce(&mut Transaction) -> Result<R, SqliteError>,
    {
        if !self.transactional {
            return Err(SqliteError::TransactionMissing);
        }

        let mut tx_ref = self.tx.lock().await;
        let tx = tx_ref.as_mut().ok_or(SqliteError::TransactionMissing)?;

        f(tx).await
    }

    /// Execute SQL query directly.
    pub async fn execute<F, R>(&self, f: F) -> Result<R, SqliteError>
    where
        F: AsyncFnOnce(&sqlx::SqlitePool) -> Result<R, SqliteError>,
    {
        f(&self.pool).await
    }

    /// Execute a read query.
    ///
    /// Transactional handles read inside the open transaction if there is one, all other reads
    /// take a connection from the pool and see committed state.
    pub async fn read<F, R>(&self, f: F) -> Result<R, SqliteError>
    where
        F: AsyncFnOnce(&mut SqliteConnection) -> Result<R, SqliteError>,
    {
        if self.transactional {
            let mut tx_ref = self.tx.lock().await;
            if let Some(tx) = tx_ref.as_mut() {
                return f(&mut **tx).await;
            }
        }

        let mut conn = self.pool.acquire().await?;
        f(&mut *conn).await
    }
}

impl<'a> crate::traits::Transaction for SqliteStore<'a> {
    type Error = SqliteError;

    type Permit = TransactionPermit;

    /// Begins a transaction.
    ///
    /// Transactions are strictly serialized, this is expressed in form of a `TransactionPermit`
    /// processes need to hold when acquiring access to a new transaction. Any concurrent process
    /// calling it will await here if there's already another process holding a permit.
    async fn begin(&self) -> Result<TransactionPermit, SqliteError> {
        // Acquire a permit from the semaphore, it will await if currently another process has the
        // permit.
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("if semaphore is closed then the whole struct is gone as well");

        // Access the transaction object which we've placed behind a Mutex. This lock follows a
        // different logic and only makes sure that mutable access to it is exclusive _within_ a
        // process "holding" the transaction permit.
        let mut tx_ref = self.tx.lock().await;
        if tx_ref.is_some() {
            return Err(SqliteError::TransactionDangling);
        }

        let tx = self.pool.begin().await?;
        tx_ref.replace(tx);
        trace!("began sqlite transaction");

        Ok(TransactionPermit(permit))
    }

    /// Rolls back the transaction and with that all uncommitted changes.
    ///
    /// This takes the permit and frees it after the rollback has finished. Other processes can now
    /// begin new transactions.
    async fn rollback(&self, permit: TransactionPermit) -> Result<(), SqliteError> {
        let Some(tx) = self.tx.lock().await.take() else {
            return Err(SqliteError::TransactionMissing);
        };

        let result = tx.rollback().await.map_err(SqliteError::Sqlite);
        trace!("rolled back sqlite transaction");

        // Always drop the permit, both on successful rollback and error. This will allow other
        // processes now to begin a new transaction and acquire the permit.
        drop(permit);

        result
    }

    /// Commits the transaction.
    ///
    /// This takes the permit and frees it after the commit has finished. Other processes can now
    /// begin new transactions.
    async fn commit(&self, permit: TransactionPermit) -> Result<(), SqliteError> {
        let Some(tx) = self.tx.lock().await.take() else {
            return Err(SqliteError::TransactionMissing);
        };

        let result = tx.commit().await.map_err(SqliteError::Sqlite);
        trace!("committed sqlite transaction");

        drop(permit);

        result
    }

    fn transactional(&self) -> Self {
        Self {
            transactional: true,
            ..self.clone()
        }
    }
}

#[derive(Debug, Error)]
pub enum SqliteError {
    /// This is a critical error as it indicates that something is wrong with the usage of this
    /// API: Queries using transactions can only ever occur through a transactional handle, after a
    /// transaction was started.
    #[error("tried to interact with inexistant transaction")]
    TransactionMissing,

    /// A previous permit was dropped without committing or rolling back.
    #[error("previous transaction was neither committed nor rolled back")]
    TransactionDangling,

    /// SQLite database and connection error.
    #[error(transparent)]
    Sqlite(#[from] sqlx::Error),

    /// SQL table schema migration error.
    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// Invalid, corrupted data was found in the database. This is a critical error.
    #[error("could not decode corrupted '{0}' value from database: {1}")]
    Decode(String, DecodeError),
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error(transparent)]
    Id(#[from] IdError),

    #[error(transparent)]
    Assignee(#[from] AssigneeError),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Level(#[from] LevelError),
}

/// Parse a text column into its typed value.
pub(crate) fn decode<T>(value: &str, column: &str) -> Result<T, SqliteError>
where
    T: FromStr,
    T::Err: Into<DecodeError>,
{
    T::from_str(value).map_err(|err| SqliteError::Decode(column.into(), err.into()))
}

#[cfg(test)]
mod tests {
    use std::task::Poll;

    use futures_test::task::noop_context;
    use sqlx::{Executor, query, query_as};
    use tokio::pin;

    use crate::sqlite::{SqliteError, SqliteStore, SqliteStoreBuilder};
    use crate::traits::Transaction;

    #[tokio::test]
    async fn transaction_provider() {
        let store = SqliteStoreBuilder::new()
            .run_default_migrations(false)
            .random_memory_url()
            .build()
            .await
            .unwrap();
        let tx = store.transactional();

        // Executing with an in-existant transaction should throw error.
        assert!(matches!(
            tx.tx(async |_| Ok(())).await,
            Err(SqliteError::TransactionMissing)
        ));

        // Starting a new transaction should work.
        let permit = store.begin().await.expect("no error");

        // .. attempting to start a second one should make us wait.
        assert!(matches!(
            {
                let fut = store.begin();
                let mut cx = noop_context();
                pin!(fut);
                fut.poll(&mut cx)
            },
            Poll::Pending
        ));

        // Using the transaction should work without failure.
        assert!(tx.tx(async |_| Ok(())).await.is_ok());

        // .. but not through a handle outside of it.
        assert!(matches!(
            store.tx(async |_| Ok(())).await,
            Err(SqliteError::TransactionMissing)
        ));

        // Committing should work as well.
        assert!(store.commit(permit).await.is_ok());

        // .. and now running a transaction should fail.
        assert!(matches!(
            tx.tx(async |_| Ok(())).await,
            Err(SqliteError::TransactionMissing)
        ));
    }

    #[tokio::test]
    async fn uncommitted_writes_stay_inside_transaction() {
        let store = SqliteStoreBuilder::new()
            .run_default_migrations(false)
            .max_connections(1)
            .random_memory_url()
            .build()
            .await
            .unwrap();
        let tx = store.transactional();

        store
            .execute(async |pool| {
                pool.execute("CREATE TABLE test(x INTEGER)").await?;
                Ok(())
            })
            .await
            .unwrap();

        let count = async |store: &SqliteStore<'_>| {
            store
                .read(async |conn| {
                    let row: (i64,) = query_as("SELECT COUNT(*) FROM test")
                        .fetch_one(&mut *conn)
                        .await?;
                    Ok(row.0)
                })
                .await
                .unwrap()
        };

        let permit = store.begin().await.unwrap();

        tx.tx(async |tx| {
            query("INSERT INTO test (x) VALUES (5)")
                .execute(&mut **tx)
                .await?;
            Ok(())
        })
        .await
        .unwrap();

        // The transactional handle reads through the open transaction.
        assert_eq!(count(&tx).await, 1);

        // The only connection is taken by the transaction, reads of other handles wait for it.
        assert!(matches!(
            {
                let fut = count(&store);
                let mut cx = noop_context();
                pin!(fut);
                fut.poll(&mut cx)
            },
            Poll::Pending
        ));

        // .. and only see what was committed.
        let (outside, _) = tokio::join!(count(&store), async {
            store.rollback(permit).await.unwrap();
        });
        assert_eq!(outside, 0);
        assert_eq!(count(&tx).await, 0);
    }
}
