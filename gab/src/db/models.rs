use std::fmt::{Display, Formatter};

use diesel::prelude::*;
use serde::Serialize;

use crate::identifiers::{is_present, SENTINEL};
use crate::su::FileMeta;

use super::schema::*;

/// One captured account snapshot
#[derive(Debug, Clone, PartialEq, Queryable, Identifiable, AsChangeset, Serialize)]
#[diesel(table_name = accounts)]
// Credentials are cleared by writing None, so None must mean NULL here
#[diesel(treat_none_as_null = true)]
pub struct Account {
    pub id: i32,
    /// Mandatory, unique; a record never exists without it
    pub account_id: String,
    pub label: String,
    pub ad_id: String,
    pub device_token: String,
    pub app_set_id: String,
    pub ssaid: String,
    pub backup_dir: String,
    pub owner: String,
    pub group_name: String,
    pub cache_mode: String,
    pub prefs_mode: String,
    pub created_at: i64,
    pub last_played_at: i64,
    /// At most one record holds this at any time
    pub last_restored: bool,
    /// Linked-service credentials, stored in plain text
    pub service_email: Option<String>,
    pub service_password: Option<String>,
}

impl Account {
    pub fn has_ssaid(&self) -> bool {
        is_present(&self.ssaid)
    }

    pub fn cache_meta(&self) -> FileMeta {
        FileMeta {
            owner: self.owner.clone(),
            group: self.group_name.clone(),
            mode: self.cache_mode.clone(),
        }
    }

    pub fn prefs_meta(&self) -> FileMeta {
        FileMeta {
            owner: self.owner.clone(),
            group: self.group_name.clone(),
            mode: self.prefs_mode.clone(),
        }
    }
}

impl Display for Account {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]", self.label, self.account_id)
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = accounts)]
pub struct InsertAccount {
    pub account_id: String,
    pub label: String,
    pub ad_id: String,
    pub device_token: String,
    pub app_set_id: String,
    pub ssaid: String,
    pub backup_dir: String,
    pub owner: String,
    pub group_name: String,
    pub cache_mode: String,
    pub prefs_mode: String,
    pub created_at: i64,
    pub last_played_at: i64,
    pub last_restored: bool,
    pub service_email: Option<String>,
    pub service_password: Option<String>,
}

impl InsertAccount {
    /// A record with every optional identifier defaulted to the sentinel
    pub fn new(account_id: &str, label: &str, backup_dir: &str) -> Self {
        Self {
            account_id: account_id.into(),
            label: label.into(),
            ad_id: SENTINEL.into(),
            device_token: SENTINEL.into(),
            app_set_id: SENTINEL.into(),
            ssaid: SENTINEL.into(),
            backup_dir: backup_dir.into(),
            owner: String::new(),
            group_name: String::new(),
            cache_mode: String::new(),
            prefs_mode: String::new(),
            created_at: 0,
            last_played_at: 0,
            last_restored: false,
            service_email: None,
            service_password: None,
        }
    }
}
