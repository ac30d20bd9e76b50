use clap::Args;

use gab::db::Database;
use gab::identifiers::is_present;
use gab::DefaultContext;

use crate::utils::{format_ts, open_db};

#[derive(Args)]
pub struct List {}

impl List {
    pub fn run(&self, ctx: &DefaultContext) -> anyhow::Result<()> {
        let db = open_db(ctx)?;
        let accounts = db.get_accounts()?;

        if accounts.is_empty() {
            println!("no accounts captured yet");
            return Ok(());
        }

        println!(
            "{:>4}  {:<24} {:<12} {:<17} {}",
            "id", "label", "account", "last played", "flags"
        );
        for a in accounts {
            let mut flags = String::new();
            if a.last_restored {
                flags.push('*');
            }
            if !is_present(&a.ssaid) {
                flags.push('!');
            }
            println!(
                "{:>4}  {:<24} {:<12} {:<17} {}",
                a.id,
                a.label,
                a.account_id,
                format_ts(a.last_played_at),
                flags
            );
        }
        println!();
        println!("*: last restored   !: no captured android id");
        Ok(())
    }
}
