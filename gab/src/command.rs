use std::borrow::Cow;
use std::ffi::OsStr;
use std::io;
use std::process::{Command, ExitStatus, Output};

use log::Level::Debug;
use log::{debug, log_enabled};

pub struct CmdOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CmdOutput {
    /// Converts to a `Result` object that is `Ok` only if the [ExitStatus] is
    /// success.
    pub fn err_on_status(self) -> crate::Result<Self> {
        if self.status.success() {
            return Ok(self);
        }

        let code = self.status.code().unwrap_or(-1);

        Err(crate::Error::CommandError(
            code,
            self.stderr_utf8_lossy().to_string(),
        ))
    }

    #[inline]
    pub fn ok(&self) -> bool {
        self.status.success()
    }

    #[inline]
    pub fn stdout_contains(&self, needle: &str) -> bool {
        self.stdout_utf8_lossy().contains(needle)
    }

    #[inline]
    pub fn stdout_utf8_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }

    #[inline]
    pub fn stderr_utf8_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stderr)
    }
}

impl From<Output> for CmdOutput {
    fn from(output: Output) -> Self {
        Self {
            status: output.status,
            stdout: output.stdout,
            stderr: output.stderr,
        }
    }
}

/// Quotes a string with single quotes for use in a shell command
pub fn quote(s: &str) -> String {
    let mut new = String::with_capacity(s.len() + 2);
    new.push('\'');
    for c in s.chars() {
        if c == '\'' {
            new.push_str("'\"'\"'");
        } else {
            new.push(c);
        }
    }
    new.push('\'');
    new
}

/// Splits a string the way a POSIX shell would tokenize it
///
/// Returns `None` on unterminated quotes or a trailing escape.
pub fn split(s: &str) -> Option<Vec<String>> {
    let mut out = Vec::new();
    let mut cur = String::new();
    // Tracks whether `cur` holds a token even if it's empty ('' arguments)
    let mut has_token = false;

    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                cur.push(chars.next()?);
                has_token = true;
            }
            '\'' => {
                has_token = true;
                loop {
                    match chars.next()? {
                        '\'' => break,
                        other => cur.push(other),
                    }
                }
            }
            '"' => {
                has_token = true;
                loop {
                    match chars.next()? {
                        '"' => break,
                        '\\' => cur.push(chars.next()?),
                        other => cur.push(other),
                    }
                }
            }
            c if c.is_whitespace() => {
                if has_token {
                    out.push(std::mem::take(&mut cur));
                    has_token = false;
                }
            }
            other => {
                cur.push(other);
                has_token = true;
            }
        }
    }

    if has_token {
        out.push(cur);
    }

    Some(out)
}

pub fn run_cmd<C, S>(cmd: C, args: &[S]) -> io::Result<CmdOutput>
where
    C: AsRef<OsStr>,
    S: AsRef<OsStr>,
{
    if log_enabled!(Debug) {
        log_cmd(&cmd, args);
    }
    Command::new(cmd)
        .args(args)
        .output()
        .map(|output| output.into())
}

pub fn log_cmd<C, S>(cmd: &C, args: &[S])
where
    C: AsRef<OsStr>,
    S: AsRef<OsStr>,
{
    if args.is_empty() {
        debug!("Running command: `{}`", cmd.as_ref().to_string_lossy());
        return;
    }
    let args_string = itertools::join(args.iter().map(|a| a.as_ref().to_string_lossy()), " ");
    debug!(
        "Running command: `{} {}`",
        cmd.as_ref().to_string_lossy(),
        args_string
    );
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_quote() {
        assert_eq!(&quote("simple"), "'simple'");
        assert_eq!(&quote("with'tick"), "'with'\"'\"'tick'");
    }

    #[test]
    fn test_split() {
        assert_eq!(
            split("cp -r /a/b /c/d").unwrap().as_slice(),
            &["cp", "-r", "/a/b", "/c/d"]
        );
        assert_eq!(
            split("cat '/data/with space/file'").unwrap().as_slice(),
            &["cat", "/data/with space/file"]
        );
        assert_eq!(
            split("echo 'it'\"'\"'s fine'").unwrap().as_slice(),
            &["echo", "it's fine"]
        );
        assert_eq!(split("stat -c '%U %G %a' /x").unwrap().len(), 4);
    }

    #[test]
    fn test_split_unterminated() {
        assert_eq!(split("cat 'oops"), None);
        assert_eq!(split("trailing \\"), None);
    }
}
