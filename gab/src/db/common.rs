use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::{Arc, RwLock};

use diesel::connection::SimpleConnection;
use diesel::migration::MigrationSource;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorInformation, DatabaseErrorKind, Error as DieselError};
use diesel::sqlite::Sqlite;
use diesel::{ConnectionError, SqliteConnection};
use diesel_migrations::MigrationHarness;
use lazy_static::lazy_static;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::utils::ensure_dir_exists;
use crate::Context;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub struct DBErrorInfo {
    pub message: String,
    pub details: Option<String>,
}

impl From<Box<dyn DatabaseErrorInformation + Send + Sync>> for DBErrorInfo {
    fn from(value: Box<dyn DatabaseErrorInformation + Send + Sync>) -> Self {
        Self {
            message: String::from(value.message()),
            details: value.details().map(|it| it.to_string()),
        }
    }
}

impl Display for DBErrorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(details) = self.details.as_ref() {
            write!(f, "\nDetails:\n{}", details)?;
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("connection error: {0}")]
    ConnectionError(ConnectionError),
    #[error("requested database entry not found")]
    NotFound,
    #[error("invalid query")]
    InvalidQuery,
    #[error("database error {0:?}: {1}")]
    DatabaseError(DatabaseErrorKind, DBErrorInfo),
    #[error("{0}")]
    UniqueViolation(DBErrorInfo),
    #[error("generic database error: {0}")]
    Generic(String),
    #[error("{0}")]
    Base(#[from] crate::Error),
}

impl From<DieselError> for Error {
    fn from(value: DieselError) -> Self {
        match value {
            DieselError::InvalidCString(_) => Self::InvalidQuery,
            DieselError::NotFound => Self::NotFound,
            DieselError::DatabaseError(kind, info) => match kind {
                DatabaseErrorKind::UniqueViolation => Self::UniqueViolation(info.into()),
                _ => Self::DatabaseError(kind, info.into()),
            },
            other => Self::Generic(format!("unexpected error {:?}", other)),
        }
    }
}

impl From<ConnectionError> for Error {
    fn from(value: ConnectionError) -> Self {
        Self::ConnectionError(value)
    }
}

// All access to a given database file goes through a dedicated single
// threaded pool with a thread-local connection living in that thread.
// The pools are kept in a global URL -> pool map so two handles to the
// same file share one connection.
lazy_static! {
    static ref DB_THREADS: RwLock<HashMap<String, Arc<ThreadPool>>> = RwLock::new(HashMap::new());
}

thread_local! {
    static CONNECTION: RefCell<Option<SqliteConnection>> = RefCell::new(None);
}

#[derive(Clone)]
pub(super) struct DBThread(Arc<ThreadPool>);

impl DBThread {
    pub(super) fn new(
        ctx: &dyn Context,
        file_name: &str,
        migrations: impl MigrationSource<Sqlite> + Send,
    ) -> Result<Self> {
        let mut path = ctx.get_sqlite_dir()?;
        ensure_dir_exists(&path).map_err(crate::Error::from)?;
        path.push(file_name);
        let url = format!("sqlite://{}", path.to_string_lossy());
        Self::new_from_url(&url, migrations)
    }

    pub(super) fn new_from_path<S: AsRef<str> + ?Sized>(
        path: &S,
        migrations: impl MigrationSource<Sqlite> + Send,
    ) -> Result<Self> {
        let url = format!("sqlite://{}", path.as_ref());
        Self::new_from_url(&url, migrations)
    }

    pub(super) fn new_from_url(
        url: &str,
        migrations: impl MigrationSource<Sqlite> + Send,
    ) -> Result<Self> {
        Ok(Self(get_database_threadpool(url, migrations)?))
    }

    pub(super) fn transaction<F, T, E>(&self, f: F) -> std::result::Result<T, E>
    where
        T: Send,
        E: From<diesel::result::Error> + Send,
        F: FnOnce(&mut SqliteConnection) -> std::result::Result<T, E> + Send,
    {
        self.0.install(|| {
            CONNECTION.with(|c| {
                let mut borrowed = c.borrow_mut();
                let conn = borrowed.as_mut().unwrap();
                conn.transaction(f)
            })
        })
    }

    pub(super) fn with_connection<F, R>(&self, f: F) -> R
    where
        R: Send,
        F: FnOnce(&mut SqliteConnection) -> R + Send,
    {
        self.0.install(|| {
            CONNECTION.with(|c| {
                let mut borrowed = c.borrow_mut();
                let conn = borrowed.as_mut().unwrap();
                f(conn)
            })
        })
    }
}

fn get_database_threadpool(
    url: &str,
    migrations: impl MigrationSource<Sqlite> + Send,
) -> Result<Arc<ThreadPool>> {
    {
        let map = DB_THREADS.read().unwrap();
        if let Some(v) = map.get(url) {
            return Ok(Arc::clone(v));
        }
    }
    let mut map = DB_THREADS.write().unwrap();
    // Check again after getting the write lock
    if let Some(v) = map.get(url) {
        return Ok(Arc::clone(v));
    }

    let tp = ThreadPoolBuilder::new()
        .num_threads(1)
        .build()
        .expect("failed to build sqlite threadpool");

    tp.install(|| {
        CONNECTION.with(|c| -> Result<()> {
            log::debug!("connecting to the database at {}", url);
            let mut conn = SqliteConnection::establish(url)?;
            conn.batch_execute("PRAGMA foreign_keys = ON;")
                .map_err(Error::from)?;
            conn.run_pending_migrations(migrations)
                .map_err(|e| Error::Generic(e.to_string()))?;
            *c.borrow_mut() = Some(conn);
            Ok(())
        })
    })?;

    let arc = Arc::new(tp);
    map.insert(url.into(), Arc::clone(&arc));
    Ok(arc)
}
