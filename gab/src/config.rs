use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::utils::read_file;

/// Optional tool configuration, read from `gab.toml` in the gab home
/// directory.
///
/// ```toml
/// su = "/system/xbin/su"
/// backups_dir = "/sdcard/gab-backups"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Override for the `su` binary used by [crate::su::ExecSu]
    pub su: Option<String>,

    /// Where account backup directories are created
    pub backups_dir: Option<PathBuf>,
}

impl Config {
    pub fn parse(source: &Path) -> crate::Result<Self> {
        let as_str = read_file(source)?;

        let cfg: Config = match toml::from_str(&as_str) {
            Ok(v) => v,
            Err(e) => return Err(crate::Error::new_cfg(source, &e)),
        };

        if let Some(su) = &cfg.su {
            if su.is_empty() {
                return Err(crate::Error::new_cfg(source, &"`su` must not be empty"));
            }
        }

        Ok(cfg)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::tmp_context;
    use crate::testing::TestContext;
    use rstest::rstest;

    #[rstest]
    fn test_parse(tmp_context: TestContext) {
        let path = tmp_context
            .new_tmp_file("su = \"/sbin/su\"\nbackups_dir = \"/sdcard/backups\"\n")
            .unwrap();
        let cfg = Config::parse(&path).unwrap();
        assert_eq!(cfg.su.as_deref(), Some("/sbin/su"));
        assert_eq!(
            cfg.backups_dir.as_deref(),
            Some(Path::new("/sdcard/backups"))
        );
    }

    #[rstest]
    fn test_parse_rejects_unknown_keys(tmp_context: TestContext) {
        let path = tmp_context.new_tmp_file("nonsense = 1\n").unwrap();
        assert!(Config::parse(&path).is_err());
    }

    #[rstest]
    fn test_parse_rejects_empty_su(tmp_context: TestContext) {
        let path = tmp_context.new_tmp_file("su = \"\"\n").unwrap();
        assert!(Config::parse(&path).is_err());
    }
}
