use clap::Args;

use gab::db::Database;
use gab::DefaultContext;

use crate::utils::{format_ts, open_db};

#[derive(Args)]
pub struct Show {
    /// Record id, see `gab list`
    #[arg()]
    id: i32,
}

impl Show {
    pub fn run(&self, ctx: &DefaultContext) -> anyhow::Result<()> {
        let db = open_db(ctx)?;
        let a = db.get_account_by_id(self.id)?;

        println!("label:          {}", a.label);
        println!("account id:     {}", a.account_id);
        println!("advertising id: {}", a.ad_id);
        println!("device token:   {}", a.device_token);
        println!("app set id:     {}", a.app_set_id);
        println!("android id:     {}", a.ssaid);
        println!("backup dir:     {}", a.backup_dir);
        println!(
            "ownership:      {}:{} cache={} prefs={}",
            a.owner, a.group_name, a.cache_mode, a.prefs_mode
        );
        println!("created:        {}", format_ts(a.created_at));
        println!("last played:    {}", format_ts(a.last_played_at));
        println!("last restored:  {}", if a.last_restored { "yes" } else { "no" });
        if let Some(email) = &a.service_email {
            println!("service email:  {}", email);
        }
        if let Some(password) = &a.service_password {
            println!("service pass:   {}", password);
        }
        Ok(())
    }
}
