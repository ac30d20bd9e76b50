use clap::Args;

use gab::tasks;
use gab::DefaultContext;

use crate::printer::ProgressPrinter;
use crate::utils::{get_su, open_db};

#[derive(Args)]
pub struct Restore {
    /// Record id, see `gab list`
    #[arg()]
    id: i32,
}

impl Restore {
    pub fn run(&self, ctx: &DefaultContext) -> anyhow::Result<()> {
        let su = get_su(ctx)?;
        let db = open_db(ctx)?;

        let account = tasks::restore(&su, &db, self.id, &ProgressPrinter)?;
        println!("restored `{}`", account.label);
        Ok(())
    }
}
