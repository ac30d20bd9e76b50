use crate::db::Database;
use crate::su::Su;

use super::{get_record, Result};

/// Removes a record, cascading to its backup directory contents.
///
/// Directory removal is best-effort: a straggling directory is only
/// wasted space, while a record without files would be misleading.
pub fn delete(su: &dyn Su, db: &dyn Database, id: i32, keep_files: bool) -> Result<String> {
    let account = get_record(db, id)?;

    if !keep_files {
        if let Err(e) = su.remove_recursive(&account.backup_dir) {
            log::warn!(
                "failed to remove backup directory {}: {}",
                account.backup_dir,
                e
            );
        }
    }

    db.delete_account_by_id(account.id)?;
    Ok(account.label)
}
