use anyhow::bail;
use clap::Args;

use gab::db::Database;
use gab::DefaultContext;

use crate::utils::open_db;

#[derive(Args)]
pub struct Edit {
    /// Record id, see `gab list`
    #[arg()]
    id: i32,

    /// New label
    #[arg(short, long)]
    label: Option<String>,

    /// New linked-service credentials as EMAIL:PASSWORD
    #[arg(long)]
    credentials: Option<String>,

    /// Drop any stored linked-service credentials
    #[arg(long, conflicts_with = "credentials")]
    clear_credentials: bool,
}

impl Edit {
    pub fn run(&self, ctx: &DefaultContext) -> anyhow::Result<()> {
        let db = open_db(ctx)?;
        let mut account = db.get_account_by_id(self.id)?;

        let mut changed = false;

        if let Some(label) = &self.label {
            if label.is_empty() {
                bail!("label must not be empty");
            }
            account.label = label.clone();
            changed = true;
        }

        if let Some(raw) = &self.credentials {
            let Some((email, password)) = raw.split_once(':') else {
                bail!("--credentials must look like EMAIL:PASSWORD");
            };
            account.service_email = Some(email.into());
            account.service_password = Some(password.into());
            changed = true;
        }

        if self.clear_credentials {
            account.service_email = None;
            account.service_password = None;
            changed = true;
        }

        if !changed {
            bail!("nothing to change, pass --label or --credentials");
        }

        db.update_account(&account)?;
        println!("updated `{}`", account.label);
        Ok(())
    }
}
