use crate::db::{Account, Database};
use crate::device::{
    BACKUP_CACHE_NAME, BACKUP_PREFS_NAME, IDENTITY_FILE, TARGET_CACHE_DIR, TARGET_PACKAGE,
    TARGET_PREFS_DIR,
};
use crate::identifiers::{is_valid_android_id, IdentityPayload};
use crate::ssaid::SsaidStore;
use crate::su::Su;
use crate::utils::epoch_seconds;

use super::{get_record, Error, Event, EventMonitor, Result};

/// Puts a captured account back onto the device.
///
/// The backup is integrity-checked before anything on the device is
/// touched; a damaged backup aborts with no partial restore. SSAID
/// injection is best-effort (the account still works, tied to the wrong
/// device identity), but ownership restoration is fatal because the
/// target app cannot start under wrong ownership.
pub fn restore(
    su: &dyn Su,
    db: &dyn Database,
    id: i32,
    monitor: &dyn EventMonitor<Event>,
) -> Result<Account> {
    let account = get_record(db, id)?;

    let cache_src = format!("{}/{}", account.backup_dir, BACKUP_CACHE_NAME);
    let prefs_src = format!("{}/{}", account.backup_dir, BACKUP_PREFS_NAME);

    if !su.file_exists(&cache_src) {
        return Err(Error::DamagedBackup(
            account.label,
            BACKUP_CACHE_NAME.into(),
        ));
    }
    if !su.file_exists(&prefs_src) {
        return Err(Error::DamagedBackup(
            account.label,
            BACKUP_PREFS_NAME.into(),
        ));
    }

    monitor.on_event(Event::StoppingApp);
    su.force_stop(TARGET_PACKAGE)?;

    su.remove_recursive(TARGET_CACHE_DIR)?;
    su.remove_recursive(TARGET_PREFS_DIR)?;

    monitor.on_event(Event::Copying {
        src: cache_src.clone(),
        dst: TARGET_CACHE_DIR.into(),
    });
    su.copy_recursive(&cache_src, TARGET_CACHE_DIR)?;

    monitor.on_event(Event::Copying {
        src: prefs_src.clone(),
        dst: TARGET_PREFS_DIR.into(),
    });
    su.copy_recursive(&prefs_src, TARGET_PREFS_DIR)?;

    if account.has_ssaid() {
        if is_valid_android_id(&account.ssaid) {
            monitor.on_event(Event::ApplyingSsaid);
            let applied = match SsaidStore::new(su).set_android_id(TARGET_PACKAGE, &account.ssaid)
            {
                Ok(()) => true,
                Err(e) => {
                    log::warn!("failed to inject SSAID, continuing restore: {}", e);
                    false
                }
            };
            monitor.on_event(Event::SsaidApplied { ok: applied });
        } else {
            log::warn!(
                "record holds malformed SSAID `{}`, not injecting",
                account.ssaid
            );
        }
    }

    monitor.on_event(Event::RestoringOwnership);
    restore_ownership(su, &account)?;

    let now = epoch_seconds();
    db.touch_last_played(account.id, now)?;
    db.mark_last_restored(account.id)?;

    let payload = IdentityPayload::new(&account.app_set_id, &account.ssaid, &account.label, now);
    let written = write_identity_channel(su, &payload);
    monitor.on_event(Event::IdentityChannelWritten { ok: written });

    Ok(get_record(db, account.id)?)
}

fn restore_ownership(su: &dyn Su, account: &Account) -> Result<()> {
    let apply = |dir: &str, mode: &str| -> crate::Result<()> {
        su.chown(&account.owner, &account.group_name, dir, true)?;
        su.chmod(mode, dir, true)?;
        Ok(())
    };

    apply(TARGET_CACHE_DIR, &account.cache_mode)
        .map_err(|e| Error::Ownership(e.to_string()))?;
    apply(TARGET_PREFS_DIR, &account.prefs_mode)
        .map_err(|e| Error::Ownership(e.to_string()))?;
    Ok(())
}

/// Best effort; the interceptor just serves the real identifier when the
/// channel file is absent
fn write_identity_channel(su: &dyn Su, payload: &IdentityPayload) -> bool {
    let write = su
        .write_file_bytes(IDENTITY_FILE, format!("{}\n", payload).as_bytes())
        .and_then(|_| su.chmod("644", IDENTITY_FILE, false));
    match write {
        Ok(()) => true,
        Err(e) => {
            log::warn!("failed to write identity channel file: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod test {
    use super::super::backup::test::{test_db, FULL_PREFS, STORE_WITH_TARGET};
    use super::super::backup::{backup, BackupOptions, BackupOutcome};
    use super::*;
    use crate::device::{SSAID_STORE, TARGET_PREFS_FILE};
    use crate::extract::find_ssaid;
    use crate::tasks::NoopMonitor;
    use crate::testing::su::{APP_MODE, APP_OWNER};
    use crate::testing::{FakeSu, TestContext};

    fn captured_account(
        ctx: &TestContext,
        su: &FakeSu,
        db: &crate::db::RecordsSqliteDatabase,
    ) -> Account {
        let opts = BackupOptions {
            label: Some("Alice".into()),
            ..Default::default()
        };
        match backup(ctx, su, db, &opts, &NoopMonitor).unwrap() {
            BackupOutcome::Full { account } => account,
            _ => panic!("seed backup should be full"),
        }
    }

    #[test]
    fn test_restore_round_trip() {
        let ctx = TestContext::default();
        let su = FakeSu::new()
            .with_target_app(FULL_PREFS)
            .with_text_store(STORE_WITH_TARGET);
        let db = test_db(&ctx);
        let account = captured_account(&ctx, &su, &db);

        // Simulate the account being replaced by another: wipe app data
        // and point the store at a different SSAID
        su.remove_recursive(TARGET_CACHE_DIR).unwrap();
        su.remove_recursive(TARGET_PREFS_DIR).unwrap();
        crate::ssaid::SsaidStore::new(&su)
            .set_android_id(TARGET_PACKAGE, "1111111111111111")
            .unwrap();

        let restored = restore(&su, &db, account.id, &NoopMonitor).unwrap();

        // Data is back with the captured ownership
        assert_eq!(su.file_bytes(TARGET_PREFS_FILE).unwrap(), FULL_PREFS.as_bytes());
        let meta = su.node_meta(TARGET_CACHE_DIR).unwrap();
        assert_eq!(meta.owner, APP_OWNER);
        assert_eq!(meta.mode, APP_MODE);

        // SSAID injected back
        let raw = su.file_bytes(SSAID_STORE).unwrap();
        assert_eq!(find_ssaid(&raw, TARGET_PACKAGE), "deadbeefcafef00d");

        // Bookkeeping and the identity channel
        assert!(restored.last_restored);
        assert!(restored.last_played_at >= account.last_played_at);
        let channel = su.file_bytes(IDENTITY_FILE).unwrap();
        let line = String::from_utf8(channel).unwrap();
        let payload = IdentityPayload::parse(line.trim_end()).unwrap();
        assert_eq!(payload.app_set_id, account.app_set_id);
        assert_eq!(payload.ssaid, "deadbeefcafef00d");
        assert_eq!(payload.label, "Alice");
    }

    #[test]
    fn test_restore_marker_is_exclusive() {
        let ctx = TestContext::default();
        let su = FakeSu::new()
            .with_target_app(FULL_PREFS)
            .with_text_store(STORE_WITH_TARGET);
        let db = test_db(&ctx);
        let first = captured_account(&ctx, &su, &db);

        // Second account from different prefs
        let prefs2 = FULL_PREFS.replace("991827364", "555000111");
        let su2 = FakeSu::new()
            .with_target_app(&prefs2)
            .with_text_store(STORE_WITH_TARGET);
        let opts = BackupOptions {
            label: Some("Bob".into()),
            ..Default::default()
        };
        let second = match backup(&ctx, &su2, &db, &opts, &NoopMonitor).unwrap() {
            BackupOutcome::Full { account } => account,
            _ => panic!(),
        };

        restore(&su, &db, first.id, &NoopMonitor).unwrap();
        restore(&su2, &db, second.id, &NoopMonitor).unwrap();

        let marked: Vec<_> = db
            .get_accounts()
            .unwrap()
            .into_iter()
            .filter(|a| a.last_restored)
            .collect();
        assert_eq!(marked.len(), 1);
        assert_eq!(marked[0].id, second.id);
    }

    #[test]
    fn test_damaged_backup_aborts_before_touching_device() {
        let ctx = TestContext::default();
        let su = FakeSu::new()
            .with_target_app(FULL_PREFS)
            .with_text_store(STORE_WITH_TARGET);
        let db = test_db(&ctx);
        let account = captured_account(&ctx, &su, &db);
        let stops_before = su.force_stops();

        // Damage the backup: drop the cache subdirectory
        std::fs::remove_dir_all(
            std::path::Path::new(&account.backup_dir).join(BACKUP_CACHE_NAME),
        )
        .unwrap();

        let res = restore(&su, &db, account.id, &NoopMonitor);
        match res {
            Err(Error::DamagedBackup(label, what)) => {
                assert_eq!(label, "Alice");
                assert_eq!(what, BACKUP_CACHE_NAME);
            }
            _ => panic!("expected a damaged backup failure"),
        }
        // The app was never stopped and its live data is untouched
        assert_eq!(su.force_stops(), stops_before);
        assert!(su.has_node(TARGET_CACHE_DIR));
    }

    #[test]
    fn test_restore_unknown_record() {
        let ctx = TestContext::default();
        let su = FakeSu::new();
        let db = test_db(&ctx);
        assert!(matches!(
            restore(&su, &db, 1234, &NoopMonitor),
            Err(Error::RecordNotFound(1234))
        ));
    }

    #[test]
    fn test_restore_with_sentinel_ssaid_skips_injection() {
        let ctx = TestContext::default();
        let su = FakeSu::new().with_target_app(
            r#"<map><string name="LAST_LOGIN_UID">42</string></map>"#,
        );
        let db = test_db(&ctx);
        let opts = BackupOptions {
            label: Some("NoSsaid".into()),
            ..Default::default()
        };
        let account = match backup(&ctx, &su, &db, &opts, &NoopMonitor).unwrap() {
            BackupOutcome::Partial { account, .. } => account,
            _ => panic!(),
        };

        restore(&su, &db, account.id, &NoopMonitor).unwrap();
        // No store was ever created
        assert!(!su.has_node(SSAID_STORE));
    }
}
