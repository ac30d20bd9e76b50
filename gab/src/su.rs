use std::io::{self, Write};

use crate::command::{quote, run_cmd, CmdOutput};
use crate::Context;

/// The Su trait abstracts running a single shell command as superuser.
///
/// Every interaction with system-owned paths goes through this one
/// primitive; the helpers below are just command builders on top of it.
/// Commands block until the child exits, there is no cancellation path.
pub trait Su: Send + Sync {
    /// Run `command` through a root shell and capture its output
    fn execute(&self, command: &str) -> io::Result<CmdOutput>;

    /// Run a command and fail on a non-zero exit status
    fn execute_checked(&self, command: &str) -> crate::Result<CmdOutput> {
        self.execute(command)?.err_on_status()
    }

    /// Reads a file's raw bytes via `cat`.
    ///
    /// Binary content is safe here: stdout is captured as bytes, not text.
    fn read_file_bytes(&self, path: &str) -> crate::Result<Vec<u8>> {
        Ok(self
            .execute(&format!("cat {}", quote(path)))?
            .err_on_status()?
            .stdout)
    }

    /// Stages `content` in a host-side temp file and copies it into place.
    ///
    /// The temp file lives in our own storage; only the final `cp` touches
    /// the (possibly system-owned) destination.
    fn write_file_bytes(&self, path: &str, content: &[u8]) -> crate::Result<()> {
        let mut staged = tempfile::NamedTempFile::new()?;
        staged.write_all(content)?;
        staged.flush()?;
        let local = staged
            .path()
            .to_str()
            .ok_or_else(|| crate::Error::BadPath(staged.path().into()))?;
        self.execute_checked(&format!("cp -f {} {}", quote(local), quote(path)))?;
        Ok(())
    }

    fn file_exists(&self, path: &str) -> bool {
        self.execute(&format!("[ -e {} ]", quote(path)))
            .map(|out| out.ok())
            .unwrap_or(false)
    }

    fn is_executable(&self, path: &str) -> bool {
        self.execute(&format!("[ -x {} ]", quote(path)))
            .map(|out| out.ok())
            .unwrap_or(false)
    }

    fn copy(&self, src: &str, dst: &str) -> crate::Result<()> {
        self.execute_checked(&format!("cp -f {} {}", quote(src), quote(dst)))?;
        Ok(())
    }

    fn copy_recursive(&self, src: &str, dst: &str) -> crate::Result<()> {
        self.execute_checked(&format!("cp -rf {} {}", quote(src), quote(dst)))?;
        Ok(())
    }

    /// Renames within a filesystem, used for atomic replacement
    fn move_file(&self, src: &str, dst: &str) -> crate::Result<()> {
        self.execute_checked(&format!("mv -f {} {}", quote(src), quote(dst)))?;
        Ok(())
    }

    fn remove_recursive(&self, path: &str) -> crate::Result<()> {
        self.execute_checked(&format!("rm -rf {}", quote(path)))?;
        Ok(())
    }

    fn mkdirs(&self, path: &str) -> crate::Result<()> {
        self.execute_checked(&format!("mkdir -p {}", quote(path)))?;
        Ok(())
    }

    fn chown(&self, owner: &str, group: &str, path: &str, recursive: bool) -> crate::Result<()> {
        let flag = if recursive { "-R " } else { "" };
        self.execute_checked(&format!("chown {}{}:{} {}", flag, owner, group, quote(path)))?;
        Ok(())
    }

    fn chmod(&self, mode: &str, path: &str, recursive: bool) -> crate::Result<()> {
        let flag = if recursive { "-R " } else { "" };
        self.execute_checked(&format!("chmod {}{} {}", flag, mode, quote(path)))?;
        Ok(())
    }

    /// Captures `owner group mode` of a path via `stat`
    fn stat_triple(&self, path: &str) -> crate::Result<FileMeta> {
        let out = self
            .execute(&format!("stat -c '%U %G %a' {}", quote(path)))?
            .err_on_status()?;
        let text = out.stdout_utf8_lossy();
        FileMeta::parse(text.trim())
            .ok_or_else(|| crate::Error::Generic(format!("unparseable stat output: {}", text)))
    }

    fn force_stop(&self, package: &str) -> crate::Result<()> {
        self.execute_checked(&format!("am force-stop {}", package))?;
        Ok(())
    }

    /// Flush filesystem buffers after mutating system files
    fn sync_fs(&self) -> crate::Result<()> {
        self.execute_checked("sync")?;
        Ok(())
    }
}

/// Owner, group and permission bits of an on-device path.
///
/// The target app will not start under wrong ownership, so these are
/// captured at backup time and reapplied exactly on restore.
#[derive(Debug, Clone, PartialEq)]
pub struct FileMeta {
    pub owner: String,
    pub group: String,
    pub mode: String,
}

impl FileMeta {
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_ascii_whitespace();
        let owner = parts.next()?;
        let group = parts.next()?;
        let mode = parts.next()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self {
            owner: owner.into(),
            group: group.into(),
            mode: mode.into(),
        })
    }
}

impl<T> Su for Box<T>
where
    T: Su + ?Sized,
{
    fn execute(&self, command: &str) -> io::Result<CmdOutput> {
        self.as_ref().execute(command)
    }
}

/// An `Su` implementation that shells out to the device's `su` binary
#[derive(Clone)]
pub struct ExecSu {
    bin: String,
}

impl ExecSu {
    /// Creates a new `ExecSu` from the given context.
    ///
    /// The config file's `su` entry wins over `$PATH` lookup.
    pub fn new(ctx: &dyn Context) -> crate::Result<Self> {
        if let Some(cfg) = ctx.get_config()? {
            if let Some(bin) = &cfg.su {
                return Ok(Self { bin: bin.clone() });
            }
        }
        let bin = ctx.get_bin("su")?;
        Ok(Self { bin })
    }

    pub fn with_bin(bin: String) -> Self {
        Self { bin }
    }
}

impl Default for ExecSu {
    fn default() -> Self {
        Self { bin: "su".into() }
    }
}

impl Su for ExecSu {
    fn execute(&self, command: &str) -> io::Result<CmdOutput> {
        run_cmd(&self.bin, &["-c", command])
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_file_meta_parse() {
        let meta = FileMeta::parse("u0_a245 u0_a245 771").unwrap();
        assert_eq!(meta.owner, "u0_a245");
        assert_eq!(meta.group, "u0_a245");
        assert_eq!(meta.mode, "771");

        assert_eq!(FileMeta::parse(""), None);
        assert_eq!(FileMeta::parse("too few"), None);
        assert_eq!(FileMeta::parse("way too many fields here"), None);
    }
}
