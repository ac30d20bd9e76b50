use time::macros::format_description;
use time::OffsetDateTime;

use crate::db::{Account, Database, InsertAccount};
use crate::device::{
    BACKUP_CACHE_NAME, BACKUP_PREFS_NAME, BACKUP_SSAID_NAME, SSAID_STORE, TARGET_CACHE_DIR,
    TARGET_PACKAGE, TARGET_PREFS_DIR, TARGET_PREFS_FILE,
};
use crate::extract::{extract_identifiers, find_ssaid};
use crate::identifiers::{is_present, SENTINEL};
use crate::su::{FileMeta, Su};
use crate::utils::{epoch_seconds, path_must_str};
use crate::Context;

use super::{Event, EventMonitor, Result};

#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default)]
pub struct BackupOptions {
    /// Human readable label; defaults to the extracted account id
    pub label: Option<String>,

    /// Replace an existing record holding the same primary identifier
    /// instead of reporting a duplicate conflict
    pub overwrite: bool,

    /// Linked-service credentials to store alongside the record
    pub credentials: Option<Credentials>,
}

pub enum BackupOutcome {
    /// All five identifiers were captured
    Full { account: Account },
    /// The record was created but some optional identifiers are absent
    Partial {
        account: Account,
        missing: Vec<&'static str>,
    },
    /// A record with the same primary identifier already exists and
    /// `overwrite` was not set; nothing was persisted
    Duplicate { existing_label: String },
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn backup_dir_name(label: Option<&str>) -> String {
    let fmt = format_description!("[year][month][day]-[hour][minute][second]");
    let ts = OffsetDateTime::now_utc()
        .format(&fmt)
        .unwrap_or_else(|_| "00000000-000000".into());
    match label {
        Some(l) if !l.is_empty() => format!("{}_{}", ts, sanitize_name(l)),
        _ => format!("{}_{}", ts, TARGET_PACKAGE),
    }
}

/// Captures the target app's state into a new backup directory and
/// persists an account record for it.
///
/// The app is stopped first so the cache and preference files are
/// quiescent. A failed or duplicate backup discards the partially created
/// destination directory.
pub fn backup(
    ctx: &dyn Context,
    su: &dyn Su,
    db: &dyn Database,
    opts: &BackupOptions,
    monitor: &dyn EventMonitor<Event>,
) -> Result<BackupOutcome> {
    monitor.on_event(Event::StoppingApp);
    su.force_stop(TARGET_PACKAGE)?;

    monitor.on_event(Event::CapturingMetadata);
    let cache_meta = su.stat_triple(TARGET_CACHE_DIR)?;
    let prefs_meta = su.stat_triple(TARGET_PREFS_DIR)?;

    let backups_root = ctx.get_backups_dir()?;
    let dest = backups_root.join(backup_dir_name(opts.label.as_deref()));
    let dest_str = path_must_str(&dest).to_string();
    su.mkdirs(&dest_str)?;

    let result = snapshot_and_persist(
        su, db, opts, monitor, &dest_str, cache_meta, prefs_meta,
    );

    // Both outright failure and a duplicate conflict leave no directory
    // behind
    let discard = matches!(&result, Err(_) | Ok(BackupOutcome::Duplicate { .. }));
    if discard {
        if let Err(e) = su.remove_recursive(&dest_str) {
            log::warn!("failed to discard backup directory {}: {}", dest_str, e);
        }
    }

    result
}

fn snapshot_and_persist(
    su: &dyn Su,
    db: &dyn Database,
    opts: &BackupOptions,
    monitor: &dyn EventMonitor<Event>,
    dest: &str,
    cache_meta: FileMeta,
    prefs_meta: FileMeta,
) -> Result<BackupOutcome> {
    let cache_dst = format!("{}/{}", dest, BACKUP_CACHE_NAME);
    let prefs_dst = format!("{}/{}", dest, BACKUP_PREFS_NAME);

    monitor.on_event(Event::Copying {
        src: TARGET_CACHE_DIR.into(),
        dst: cache_dst.clone(),
    });
    su.copy_recursive(TARGET_CACHE_DIR, &cache_dst)?;

    monitor.on_event(Event::Copying {
        src: TARGET_PREFS_DIR.into(),
        dst: prefs_dst.clone(),
    });
    su.copy_recursive(TARGET_PREFS_DIR, &prefs_dst)?;

    // The store file may not exist on every build
    let ssaid_dst = format!("{}/{}", dest, BACKUP_SSAID_NAME);
    if let Err(e) = su.copy(SSAID_STORE, &ssaid_dst) {
        log::warn!("could not snapshot the identifier store: {}", e);
    }

    monitor.on_event(Event::ExtractingIdentifiers);
    let prefs_raw = su.read_file_bytes(TARGET_PREFS_FILE)?;
    let ids = extract_identifiers(&String::from_utf8_lossy(&prefs_raw))?;

    let ssaid = match su.read_file_bytes(SSAID_STORE) {
        Ok(raw) => find_ssaid(&raw, TARGET_PACKAGE),
        Err(e) => {
            log::warn!("identifier store unreadable during backup: {}", e);
            SENTINEL.into()
        }
    };

    let mut missing = ids.missing();
    if !is_present(&ssaid) {
        missing.push("ssaid");
    }
    monitor.on_event(Event::IdentifiersExtracted {
        missing: missing.clone(),
    });

    if let Some(existing) = db.find_account_by_account_id(&ids.account_id)? {
        if !opts.overwrite {
            return Ok(BackupOutcome::Duplicate {
                existing_label: existing.label,
            });
        }
        log::info!("overwriting existing record `{}`", existing.label);
        if existing.backup_dir != dest {
            if let Err(e) = su.remove_recursive(&existing.backup_dir) {
                log::warn!(
                    "failed to remove old backup directory {}: {}",
                    existing.backup_dir,
                    e
                );
            }
        }
        db.delete_account_by_id(existing.id)?;
    }

    let now = epoch_seconds();
    let label = opts
        .label
        .clone()
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| ids.account_id.clone());

    let account = db.add_account(InsertAccount {
        account_id: ids.account_id,
        label,
        ad_id: ids.ad_id,
        device_token: ids.device_token,
        app_set_id: ids.app_set_id,
        ssaid,
        backup_dir: dest.into(),
        owner: cache_meta.owner,
        group_name: cache_meta.group,
        cache_mode: cache_meta.mode,
        prefs_mode: prefs_meta.mode,
        created_at: now,
        last_played_at: now,
        last_restored: false,
        service_email: opts.credentials.as_ref().map(|c| c.email.clone()),
        service_password: opts.credentials.as_ref().map(|c| c.password.clone()),
    })?;
    monitor.on_event(Event::RecordPersisted { id: account.id });

    if missing.is_empty() {
        Ok(BackupOutcome::Full { account })
    } else {
        Ok(BackupOutcome::Partial { account, missing })
    }
}
