use std::env;
use std::path::PathBuf;

use blanket::blanket;
use directories::BaseDirs;
use once_cell::sync::OnceCell;
use which::which;

use crate::config::Config;
use crate::utils::ensure_dir_exists;
use crate::Error;

fn find_program(bin: &str) -> Option<String> {
    which(bin).ok().map(|it| it.to_string_lossy().into())
}

/// Context is a trait for an object that can help standardize file
/// locations, find binaries, and lookup env vars.
///
/// Most methods on this trait have a default implementation that is
/// perfectly safe to leave unchanged.
#[blanket(derive(Ref, Box))]
pub trait Context: Send + Sync {
    fn maybe_get_env(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }

    fn maybe_get_bin(&self, bin: &str) -> Option<String> {
        find_program(bin)
    }

    fn has_bin(&self, bin: &str) -> bool {
        self.maybe_get_bin(bin).is_some()
    }

    fn get_bin(&self, bin: &str) -> crate::Result<String> {
        self.maybe_get_bin(bin)
            .ok_or_else(|| Error::MissingBin(bin.into()))
    }

    fn get_env(&self, key: &str) -> crate::Result<String> {
        self.maybe_get_env(key)
            .ok_or_else(|| Error::MissingEnv(key.into()))
    }

    /// The tool's home directory: `$GAB_HOME` or a per-user data dir
    fn get_home_dir(&self) -> crate::Result<PathBuf> {
        if let Some(home) = self.maybe_get_env("GAB_HOME") {
            return Ok(PathBuf::from(home));
        }
        let dirs = BaseDirs::new().ok_or(Error::NoBaseDirs)?;
        Ok(dirs.data_dir().join("gab"))
    }

    fn get_home_dir_child(&self, child: &str) -> crate::Result<PathBuf> {
        self.get_home_dir().map(|x| x.join(child))
    }

    /// Where account backup directories land; the config can move this
    fn get_backups_dir(&self) -> crate::Result<PathBuf> {
        if let Some(cfg) = self.get_config()? {
            if let Some(dir) = &cfg.backups_dir {
                return Ok(dir.clone());
            }
        }
        self.get_home_dir_child("backups")
    }

    fn get_sqlite_dir(&self) -> crate::Result<PathBuf> {
        let dir = self.get_home_dir_child("db")?;
        ensure_dir_exists(&dir)?;
        Ok(dir)
    }

    fn get_log_dir(&self) -> crate::Result<PathBuf> {
        let dir = self.get_home_dir_child("log")?;
        ensure_dir_exists(&dir)?;
        Ok(dir)
    }

    fn get_config_file(&self) -> crate::Result<PathBuf> {
        self.get_home_dir_child("gab.toml")
    }

    fn get_config<'a>(&'a self) -> crate::Result<Option<&'a Config>>;
}

pub struct DefaultContext {
    config: OnceCell<Option<Config>>,
}

impl DefaultContext {
    pub fn new() -> Self {
        Self {
            config: OnceCell::new(),
        }
    }
}

impl Default for DefaultContext {
    fn default() -> Self {
        Self::new()
    }
}

impl Context for DefaultContext {
    fn get_config<'a>(&'a self) -> crate::Result<Option<&'a Config>> {
        let loaded = self.config.get_or_try_init(|| -> crate::Result<_> {
            let path = self.get_config_file()?;
            if !path.exists() {
                return Ok(None);
            }
            Ok(Some(Config::parse(&path)?))
        })?;
        Ok(loaded.as_ref())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::{tmp_context, TestContext};
    use rstest::rstest;

    #[rstest]
    fn test_home_dir_from_env(tmp_context: TestContext) {
        let home = tmp_context.get_home_dir().unwrap();
        assert!(home.starts_with(tmp_context.get_base_dir()));
    }

    #[rstest]
    fn test_get_bin_missing(tmp_context: TestContext) {
        match tmp_context.get_bin("definitely-not-a-binary") {
            Err(Error::MissingBin(name)) => assert_eq!(name, "definitely-not-a-binary"),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }
}
