use clap::Args;

use gab::tasks;
use gab::DefaultContext;

use crate::utils::{get_su, open_db};

#[derive(Args)]
pub struct Delete {
    /// Record id, see `gab list`
    #[arg()]
    id: i32,

    /// Keep the backup directory on disk, only drop the record
    #[arg(long)]
    keep_files: bool,
}

impl Delete {
    pub fn run(&self, ctx: &DefaultContext) -> anyhow::Result<()> {
        let su = get_su(ctx)?;
        let db = open_db(ctx)?;

        let label = tasks::delete(&su, &db, self.id, self.keep_files)?;
        println!("deleted `{}`", label);
        Ok(())
    }
}
