use diesel::prelude::*;
use diesel::{delete, insert_into, update};
use diesel_migrations::{embed_migrations, EmbeddedMigrations};

use crate::Context;

use super::common::*;
use super::models::*;
use super::schema::accounts;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/records_migrations/");

pub static RECORDS_DATABASE_FILE_NAME: &str = "records.db";

pub trait Database: Send + Sync {
    fn add_account(&self, account: InsertAccount) -> Result<Account>;
    fn get_accounts(&self) -> Result<Vec<Account>>;
    fn get_account_by_id(&self, id: i32) -> Result<Account>;
    /// `Ok(None)` when no record holds the given primary identifier
    fn find_account_by_account_id(&self, account_id: &str) -> Result<Option<Account>>;
    fn update_account(&self, account: &Account) -> Result<()>;
    fn delete_account_by_id(&self, id: i32) -> Result<()>;

    fn touch_last_played(&self, id: i32, ts: i64) -> Result<()>;

    /// Clears every record's marker, then sets it on `id`, atomically
    fn mark_last_restored(&self, id: i32) -> Result<()>;
}

pub struct RecordsSqliteDatabase {
    db_thread: DBThread,
}

impl RecordsSqliteDatabase {
    pub fn new(ctx: &dyn Context) -> Result<Self> {
        Ok(Self {
            db_thread: DBThread::new(ctx, RECORDS_DATABASE_FILE_NAME, MIGRATIONS)?,
        })
    }

    pub fn new_from_path<S: AsRef<str> + ?Sized>(path: &S) -> Result<Self> {
        Ok(Self {
            db_thread: DBThread::new_from_path(path, MIGRATIONS)?,
        })
    }

    #[inline]
    fn with_connection<F, R>(&self, f: F) -> R
    where
        R: Send,
        F: FnOnce(&mut SqliteConnection) -> R + Send,
    {
        self.db_thread.with_connection(f)
    }
}

impl Database for RecordsSqliteDatabase {
    fn add_account(&self, account: InsertAccount) -> Result<Account> {
        Ok(self.with_connection(|conn| {
            insert_into(accounts::table)
                .values(&account)
                .get_result::<Account>(conn)
        })?)
    }

    fn get_accounts(&self) -> Result<Vec<Account>> {
        Ok(self.with_connection(|conn| {
            accounts::table
                .order(accounts::created_at.asc())
                .load::<Account>(conn)
        })?)
    }

    fn get_account_by_id(&self, id: i32) -> Result<Account> {
        Ok(self.with_connection(|conn| {
            accounts::table
                .filter(accounts::id.eq(id))
                .first::<Account>(conn)
        })?)
    }

    fn find_account_by_account_id(&self, account_id: &str) -> Result<Option<Account>> {
        Ok(self.with_connection(|conn| {
            accounts::table
                .filter(accounts::account_id.eq(account_id))
                .first::<Account>(conn)
                .optional()
        })?)
    }

    fn update_account(&self, account: &Account) -> Result<()> {
        self.with_connection(|conn| {
            update(accounts::table.filter(accounts::id.eq(account.id)))
                .set(account)
                .execute(conn)
        })?;
        Ok(())
    }

    fn delete_account_by_id(&self, id: i32) -> Result<()> {
        self.with_connection(|conn| {
            delete(accounts::table.filter(accounts::id.eq(id))).execute(conn)
        })?;
        Ok(())
    }

    fn touch_last_played(&self, id: i32, ts: i64) -> Result<()> {
        self.with_connection(|conn| {
            update(accounts::table.filter(accounts::id.eq(id)))
                .set(accounts::last_played_at.eq(ts))
                .execute(conn)
        })?;
        Ok(())
    }

    fn mark_last_restored(&self, id: i32) -> Result<()> {
        self.db_thread.transaction(|conn| {
            update(accounts::table)
                .set(accounts::last_restored.eq(false))
                .execute(conn)?;
            update(accounts::table.filter(accounts::id.eq(id)))
                .set(accounts::last_restored.eq(true))
                .execute(conn)?;
            Ok::<_, Error>(())
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::{tmp_context, TestContext};
    use rstest::rstest;

    fn open(ctx: &TestContext) -> RecordsSqliteDatabase {
        let path = ctx.to_abs_string("records_test.db");
        RecordsSqliteDatabase::new_from_path(&path).unwrap()
    }

    fn insert(db: &RecordsSqliteDatabase, account_id: &str, label: &str) -> Account {
        db.add_account(InsertAccount::new(account_id, label, "/tmp/nowhere"))
            .unwrap()
    }

    #[rstest]
    fn test_add_and_find(tmp_context: TestContext) {
        let db = open(&tmp_context);
        let a = insert(&db, "111", "Alice");
        assert_eq!(a.label, "Alice");
        assert!(a.id > 0);

        let found = db.find_account_by_account_id("111").unwrap().unwrap();
        assert_eq!(found, a);
        assert!(db.find_account_by_account_id("222").unwrap().is_none());
    }

    #[rstest]
    fn test_unique_account_id(tmp_context: TestContext) {
        let db = open(&tmp_context);
        insert(&db, "111", "Alice");
        let dup = db.add_account(InsertAccount::new("111", "Alice2", "/x"));
        assert!(matches!(dup, Err(Error::UniqueViolation(_))));
    }

    #[rstest]
    fn test_get_by_id_missing(tmp_context: TestContext) {
        let db = open(&tmp_context);
        assert!(matches!(db.get_account_by_id(991), Err(Error::NotFound)));
    }

    #[rstest]
    fn test_mark_last_restored_is_exclusive(tmp_context: TestContext) {
        let db = open(&tmp_context);
        let a = insert(&db, "111", "Alice");
        let b = insert(&db, "222", "Bob");

        db.mark_last_restored(a.id).unwrap();
        db.mark_last_restored(b.id).unwrap();

        let marked: Vec<_> = db
            .get_accounts()
            .unwrap()
            .into_iter()
            .filter(|it| it.last_restored)
            .collect();
        assert_eq!(marked.len(), 1);
        assert_eq!(marked[0].id, b.id);
    }

    #[rstest]
    fn test_delete(tmp_context: TestContext) {
        let db = open(&tmp_context);
        let a = insert(&db, "111", "Alice");
        db.delete_account_by_id(a.id).unwrap();
        assert!(db.get_accounts().unwrap().is_empty());
    }

    #[rstest]
    fn test_touch_last_played(tmp_context: TestContext) {
        let db = open(&tmp_context);
        let a = insert(&db, "111", "Alice");
        db.touch_last_played(a.id, 1234).unwrap();
        assert_eq!(db.get_account_by_id(a.id).unwrap().last_played_at, 1234);
    }
}
