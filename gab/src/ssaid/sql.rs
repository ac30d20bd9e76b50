//! SQL-backed fallback store.
//!
//! Some OS builds keep the per-app identifier table in a small database at
//! a fixed sibling path instead of the xml file. The schema
//! (`ssaid(_id, name, value, package, defaultValue, defaultSysSet)`) was
//! observed on those builds and is not a stable contract, so everything
//! here is best-effort: a missing database or missing `sqlite3` client
//! just exhausts the fallback chain.

use crate::command::quote;
use crate::device::SSAID_SQL_STORE;
use crate::su::Su;

use super::{Error, Result};

/// True when both the database file and a usable `sqlite3` client exist
pub fn is_available(su: &dyn Su) -> bool {
    if !su.file_exists(SSAID_SQL_STORE) {
        return false;
    }
    su.execute("command -v sqlite3")
        .map(|out| out.ok())
        .unwrap_or(false)
}

fn run_sql(su: &dyn Su, sql: &str) -> Result<String> {
    let cmd = format!("sqlite3 {} {}", quote(SSAID_SQL_STORE), quote(sql));
    let out = su
        .execute_checked(&cmd)
        .map_err(|e| Error::SqlFailed(e.to_string()))?;
    Ok(out.stdout_utf8_lossy().trim().to_string())
}

/// Reads the stored value for `package`, `None` when no row matches
pub fn read_value(su: &dyn Su, package: &str) -> Result<Option<String>> {
    let sql = format!(
        "SELECT value FROM ssaid WHERE package='{}' LIMIT 1;",
        sql_escape(package)
    );
    let out = run_sql(su, &sql)?;
    if out.is_empty() {
        Ok(None)
    } else {
        Ok(Some(out))
    }
}

/// UPDATEs the row for `package`; INSERTs one with _id = max+1 when no row
/// was affected.
pub fn set_value(su: &dyn Su, package: &str, value: &str) -> Result<()> {
    let pkg = sql_escape(package);
    let val = sql_escape(value);

    let update = format!(
        "UPDATE ssaid SET value='{}', defaultValue='{}' WHERE package='{}'; SELECT changes();",
        val, val, pkg
    );
    let changed = run_sql(su, &update)?;

    if changed.trim() != "0" {
        return Ok(());
    }

    let insert = format!(
        "INSERT INTO ssaid (_id, name, value, package, defaultValue, defaultSysSet) \
         SELECT COALESCE(MAX(_id),0)+1, '{}', '{}', '{}', '{}', 'true' FROM ssaid;",
        pkg, val, pkg, val
    );
    run_sql(su, &insert)?;
    Ok(())
}

/// Doubles single quotes; the values we write are validated hex/package
/// names but the store should never be corruptible by a weird label
fn sql_escape(s: &str) -> String {
    s.replace('\'', "''")
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::FakeSu;

    #[test]
    fn test_not_available_without_db_file() {
        let su = FakeSu::new();
        assert!(!is_available(&su));
    }

    #[test]
    fn test_available_with_db_file() {
        let su = FakeSu::new().with_sql_store(&[]);
        assert!(is_available(&su));
    }

    #[test]
    fn test_set_then_read() {
        let su = FakeSu::new().with_sql_store(&[]);
        set_value(&su, "com.fun.lastwar.gp", "00c0ffee00c0ffee").unwrap();
        assert_eq!(
            read_value(&su, "com.fun.lastwar.gp").unwrap().as_deref(),
            Some("00c0ffee00c0ffee")
        );
    }

    #[test]
    fn test_set_updates_existing_row() {
        let su = FakeSu::new().with_sql_store(&[("com.fun.lastwar.gp", "1111111111111111")]);
        set_value(&su, "com.fun.lastwar.gp", "2222222222222222").unwrap();
        assert_eq!(
            read_value(&su, "com.fun.lastwar.gp").unwrap().as_deref(),
            Some("2222222222222222")
        );
    }

    #[test]
    fn test_read_missing_row() {
        let su = FakeSu::new().with_sql_store(&[]);
        assert_eq!(read_value(&su, "com.absent").unwrap(), None);
    }

    #[test]
    fn test_sql_escape() {
        assert_eq!(sql_escape("a'b"), "a''b");
    }
}
