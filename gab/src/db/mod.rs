mod common;
pub use common::{Error, Result};

pub mod db;
pub mod models;
pub mod schema;

pub use db::{Database, RecordsSqliteDatabase};
pub use models::{Account, InsertAccount};

/// Get the default [Database] implementation for the given context
pub fn get_default_db(ctx: &dyn crate::Context) -> Result<RecordsSqliteDatabase> {
    RecordsSqliteDatabase::new(ctx)
}
