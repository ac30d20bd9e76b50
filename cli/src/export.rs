use std::fs;
use std::path::PathBuf;

use anyhow::Context as AnyhowContext;
use clap::Args;

use gab::db::Database;
use gab::DefaultContext;

use crate::utils::open_db;

#[derive(Args)]
pub struct Export {
    /// Record id, see `gab list`
    #[arg()]
    id: i32,

    /// Write to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl Export {
    pub fn run(&self, ctx: &DefaultContext) -> anyhow::Result<()> {
        let db = open_db(ctx)?;
        let account = db.get_account_by_id(self.id)?;

        let json = serde_json::to_string_pretty(&account)
            .with_context(|| "serializing the record")?;

        match &self.output {
            Some(path) => {
                fs::write(path, json).with_context(|| format!("writing {:?}", path))?;
                println!("exported `{}` to {:?}", account.label, path);
            }
            None => println!("{}", json),
        }
        Ok(())
    }
}
