//! Fixed on-device paths and package names.
//!
//! These are a compatibility surface: the target app, Google Play Services
//! and the settings provider all expect these exact locations, so they are
//! constants rather than configuration.

/// The game package whose state we back up and restore
pub const TARGET_PACKAGE: &str = "com.fun.lastwar.gp";

/// Our own package name, used by the in-process interceptor side
pub const SELF_PACKAGE: &str = "com.gab.manager";

/// The target app's private data root
pub const TARGET_DATA_DIR: &str = "/data/data/com.fun.lastwar.gp";

/// Disk cache directory, relative names mirrored into backups
pub const TARGET_CACHE_DIR: &str = "/data/data/com.fun.lastwar.gp/cache";
pub const TARGET_PREFS_DIR: &str = "/data/data/com.fun.lastwar.gp/shared_prefs";

/// The preference file holding the account identifiers
pub const TARGET_PREFS_FILE: &str =
    "/data/data/com.fun.lastwar.gp/shared_prefs/com.fun.lastwar.gp.v2.playerprefs.xml";

/// Names of the two backed up subdirectories inside a backup dir
pub const BACKUP_CACHE_NAME: &str = "cache";
pub const BACKUP_PREFS_NAME: &str = "shared_prefs";
/// Name under which the SSAID store copy is kept inside a backup dir
pub const BACKUP_SSAID_NAME: &str = "settings_ssaid.xml";

/// The per-user Android-ID store and its safety-copy sibling
pub const SSAID_STORE: &str = "/data/system/users/0/settings_ssaid.xml";
pub const SSAID_STORE_BAK: &str = "/data/system/users/0/settings_ssaid.xml.bak";

/// Some builds keep the per-app identifier table in a small database at a
/// fixed sibling path instead of the xml file
pub const SSAID_SQL_STORE: &str = "/data/system/users/0/settings_ssaid.db";

/// Ownership and mode the settings provider expects on its store file
pub const SSAID_STORE_OWNER: &str = "system";
pub const SSAID_STORE_GROUP: &str = "system";
pub const SSAID_STORE_MODE: &str = "600";

/// Device-provided converters between binary-encoded and plain-text xml
pub const ABX_TO_XML_BIN: &str = "/system/bin/abx2xml";
pub const XML_TO_ABX_BIN: &str = "/system/bin/xml2abx";

/// Scratch space for conversion round trips, world-accessible
pub const DEVICE_TMP_DIR: &str = "/data/local/tmp";

/// World-readable flat file read by the in-process interceptor.
///
/// Written by the restore orchestrator, format:
/// `appSetId|ssaid|accountLabel|timestamp`
pub const IDENTITY_FILE: &str = "/data/local/tmp/.gab_identity";

/// Preference keys extracted from [TARGET_PREFS_FILE]
pub const PREF_KEY_ACCOUNT_ID: &str = "LAST_LOGIN_UID";
pub const PREF_KEY_AD_ID: &str = "GOOGLE_AD_ID";
pub const PREF_KEY_DEVICE_TOKEN: &str = "DEVICE_TOKEN";
pub const PREF_KEY_APP_SET_ID: &str = "APP_SET_ID";
