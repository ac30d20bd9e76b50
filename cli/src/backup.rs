use anyhow::bail;
use clap::Args;

use gab::tasks::{self, BackupOptions, BackupOutcome, Credentials};
use gab::DefaultContext;

use crate::printer::ProgressPrinter;
use crate::utils::{get_su, open_db};

#[derive(Args)]
pub struct Backup {
    /// Human readable label for the new record
    #[arg(short, long)]
    label: Option<String>,

    /// Replace an existing record for the same account instead of
    /// reporting a conflict
    #[arg(long)]
    overwrite: bool,

    /// Linked-service credentials as EMAIL:PASSWORD (stored in plain text)
    #[arg(long)]
    credentials: Option<String>,
}

impl Backup {
    pub fn run(&self, ctx: &DefaultContext) -> anyhow::Result<()> {
        let su = get_su(ctx)?;
        let db = open_db(ctx)?;

        let credentials = match &self.credentials {
            None => None,
            Some(raw) => match raw.split_once(':') {
                Some((email, password)) => Some(Credentials {
                    email: email.into(),
                    password: password.into(),
                }),
                None => bail!("--credentials must look like EMAIL:PASSWORD"),
            },
        };

        let opts = BackupOptions {
            label: self.label.clone(),
            overwrite: self.overwrite,
            credentials,
        };

        match tasks::backup(ctx, &su, &db, &opts, &ProgressPrinter)? {
            BackupOutcome::Full { account } => {
                println!("backed up `{}` (id {})", account.label, account.id);
            }
            BackupOutcome::Partial { account, missing } => {
                println!(
                    "backed up `{}` (id {}) without: {}",
                    account.label,
                    account.id,
                    missing.join(", ")
                );
            }
            BackupOutcome::Duplicate { existing_label } => {
                bail!(
                    "this account is already captured as `{}` (use --overwrite to replace it)",
                    existing_label
                );
            }
        }
        Ok(())
    }
}
