use anyhow::Context as AnyhowContext;
use time::macros::format_description;
use time::OffsetDateTime;

use gab::db::{get_default_db, RecordsSqliteDatabase};
use gab::{DefaultContext, ExecSu};

pub fn open_db(ctx: &DefaultContext) -> anyhow::Result<RecordsSqliteDatabase> {
    get_default_db(ctx).with_context(|| "opening the records database")
}

pub fn get_su(ctx: &DefaultContext) -> anyhow::Result<ExecSu> {
    ExecSu::new(ctx).with_context(|| "locating a usable su binary")
}

/// Epoch seconds to a short human readable timestamp
pub fn format_ts(ts: i64) -> String {
    if ts <= 0 {
        return "-".into();
    }
    let fmt = format_description!("[year]-[month]-[day] [hour]:[minute]");
    OffsetDateTime::from_unix_timestamp(ts)
        .ok()
        .and_then(|dt| dt.format(&fmt).ok())
        .unwrap_or_else(|| "-".into())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_format_ts() {
        assert_eq!(format_ts(0), "-");
        assert_eq!(format_ts(1700000000), "2023-11-14 22:13");
    }
}
