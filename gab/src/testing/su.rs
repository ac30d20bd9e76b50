#![allow(unused)]
//! A scripted root shell for tests.
//!
//! `FakeSu` interprets the small fixed command vocabulary the crate issues
//! (`cat`, `cp`, `mv`, `rm`, `mkdir`, `chmod`, `chown`, `stat`, `[ -e ]`,
//! `am force-stop`, `sync`, the abx converters and a canned `sqlite3`)
//! against an in-memory device filesystem. Paths outside the device
//! prefixes fall through to the real host filesystem, which is how staged
//! temp files and backup directories work in end-to-end tests.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::os::unix::process::ExitStatusExt;
use std::path::Path;
use std::process::ExitStatus;
use std::sync::Mutex;

use mockall::mock;
use rstest::fixture;

use crate::command::{split, CmdOutput};
use crate::device::{
    ABX_TO_XML_BIN, SSAID_SQL_STORE, SSAID_STORE, TARGET_CACHE_DIR, TARGET_DATA_DIR,
    TARGET_PREFS_DIR, TARGET_PREFS_FILE, XML_TO_ABX_BIN,
};
use crate::ssaid::format::BINARY_MAGIC;
use crate::su::{FileMeta, Su};

mock! {
    pub Su {

    }

    impl crate::su::Su for Su {
        fn execute(&self, command: &str) -> io::Result<CmdOutput>;
    }
}

#[fixture]
pub fn mock_su() -> MockSu {
    MockSu::new()
}

const DEVICE_PREFIXES: &[&str] = &["/data/", "/system/", "/sdcard/", "/mnt/", "/storage/"];

/// Default ownership the fake target app's data carries
pub const APP_OWNER: &str = "u0_a231";
pub const APP_MODE: &str = "771";

fn is_device_path(p: &str) -> bool {
    DEVICE_PREFIXES.iter().any(|pre| p.starts_with(pre))
}

fn basename(p: &str) -> &str {
    p.trim_end_matches('/').rsplit('/').next().unwrap_or(p)
}

#[derive(Clone)]
enum NodeKind {
    File(Vec<u8>),
    Dir,
}

#[derive(Clone)]
struct Node {
    kind: NodeKind,
    owner: String,
    group: String,
    mode: String,
}

impl Node {
    fn file(bytes: &[u8], owner: &str, group: &str, mode: &str) -> Self {
        Self {
            kind: NodeKind::File(bytes.to_vec()),
            owner: owner.into(),
            group: group.into(),
            mode: mode.into(),
        }
    }

    fn dir(owner: &str, group: &str, mode: &str) -> Self {
        Self {
            kind: NodeKind::Dir,
            owner: owner.into(),
            group: group.into(),
            mode: mode.into(),
        }
    }

    fn is_dir(&self) -> bool {
        matches!(self.kind, NodeKind::Dir)
    }
}

#[derive(Default)]
struct DeviceState {
    nodes: BTreeMap<String, Node>,
    converters: bool,
    sql_rows: Option<Vec<(String, String)>>,
    commands: Vec<String>,
    stopped: Vec<String>,
}

struct Out {
    code: i32,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

impl Out {
    fn ok() -> Self {
        Self::with_stdout(Vec::new())
    }

    fn with_stdout(stdout: Vec<u8>) -> Self {
        Self {
            code: 0,
            stdout,
            stderr: Vec::new(),
        }
    }

    fn fail(code: i32, msg: &str) -> Self {
        Self {
            code,
            stdout: Vec::new(),
            stderr: msg.as_bytes().to_vec(),
        }
    }
}

fn fake_abx_encode(text: &[u8]) -> Vec<u8> {
    let mut out = BINARY_MAGIC.to_vec();
    out.extend(text.iter().map(|b| b ^ 0x5A));
    out
}

fn fake_abx_decode(raw: &[u8]) -> Option<Vec<u8>> {
    let payload = raw.strip_prefix(BINARY_MAGIC)?;
    Some(payload.iter().map(|b| b ^ 0x5A).collect())
}

pub struct FakeSu {
    state: Mutex<DeviceState>,
}

impl FakeSu {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(DeviceState {
                converters: true,
                ..Default::default()
            }),
        }
    }

    pub fn with_text_store(self, text: &str) -> Self {
        {
            let mut st = self.state.lock().unwrap();
            st.nodes.insert(
                SSAID_STORE.into(),
                Node::file(text.as_bytes(), "system", "system", "600"),
            );
        }
        self
    }

    pub fn with_binary_store(self, text: &str) -> Self {
        {
            let mut st = self.state.lock().unwrap();
            st.nodes.insert(
                SSAID_STORE.into(),
                Node::file(&fake_abx_encode(text.as_bytes()), "system", "system", "600"),
            );
        }
        self
    }

    pub fn without_converters(self) -> Self {
        self.state.lock().unwrap().converters = false;
        self
    }

    pub fn with_sql_store(self, rows: &[(&str, &str)]) -> Self {
        {
            let mut st = self.state.lock().unwrap();
            st.nodes.insert(
                SSAID_SQL_STORE.into(),
                Node::file(b"sqlite", "system", "system", "600"),
            );
            st.sql_rows = Some(
                rows.iter()
                    .map(|(p, v)| (p.to_string(), v.to_string()))
                    .collect(),
            );
        }
        self
    }

    /// Seeds the target app's data directories and preference file
    pub fn with_target_app(self, prefs_xml: &str) -> Self {
        {
            let mut st = self.state.lock().unwrap();
            st.nodes
                .insert(TARGET_DATA_DIR.into(), Node::dir(APP_OWNER, APP_OWNER, APP_MODE));
            st.nodes
                .insert(TARGET_CACHE_DIR.into(), Node::dir(APP_OWNER, APP_OWNER, APP_MODE));
            st.nodes.insert(
                format!("{}/game.dat", TARGET_CACHE_DIR),
                Node::file(b"cached-bytes", APP_OWNER, APP_OWNER, "600"),
            );
            st.nodes
                .insert(TARGET_PREFS_DIR.into(), Node::dir(APP_OWNER, APP_OWNER, APP_MODE));
            st.nodes.insert(
                TARGET_PREFS_FILE.into(),
                Node::file(prefs_xml.as_bytes(), APP_OWNER, APP_OWNER, "660"),
            );
        }
        self
    }

    pub fn with_file(self, path: &str, bytes: &[u8]) -> Self {
        {
            let mut st = self.state.lock().unwrap();
            st.nodes
                .insert(path.into(), Node::file(bytes, "root", "root", "644"));
        }
        self
    }

    pub fn file_bytes(&self, path: &str) -> Option<Vec<u8>> {
        let st = self.state.lock().unwrap();
        match st.nodes.get(path) {
            Some(Node {
                kind: NodeKind::File(bytes),
                ..
            }) => Some(bytes.clone()),
            _ => None,
        }
    }

    pub fn node_meta(&self, path: &str) -> Option<FileMeta> {
        let st = self.state.lock().unwrap();
        st.nodes.get(path).map(|n| FileMeta {
            owner: n.owner.clone(),
            group: n.group.clone(),
            mode: n.mode.clone(),
        })
    }

    pub fn has_node(&self, path: &str) -> bool {
        self.state.lock().unwrap().nodes.contains_key(path)
    }

    pub fn sql_row_count(&self) -> usize {
        self.state
            .lock()
            .unwrap()
            .sql_rows
            .as_ref()
            .map_or(0, |rows| rows.len())
    }

    pub fn sql_value(&self, package: &str) -> Option<String> {
        self.state.lock().unwrap().sql_rows.as_ref().and_then(|rows| {
            rows.iter()
                .find(|(p, _)| p == package)
                .map(|(_, v)| v.clone())
        })
    }

    pub fn force_stops(&self) -> usize {
        self.state.lock().unwrap().stopped.len()
    }

    pub fn commands(&self) -> Vec<String> {
        self.state.lock().unwrap().commands.clone()
    }
}

impl Default for FakeSu {
    fn default() -> Self {
        Self::new()
    }
}

#[fixture]
pub fn fake_su() -> FakeSu {
    FakeSu::new()
}

impl Su for FakeSu {
    fn execute(&self, command: &str) -> io::Result<CmdOutput> {
        let argv = split(command)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "bad quoting"))?;

        let mut st = self.state.lock().unwrap();
        st.commands.push(command.into());

        let out = if argv.is_empty() {
            Out::fail(2, "empty command")
        } else {
            interpret(&mut st, &argv)
        };

        Ok(CmdOutput {
            status: ExitStatus::from_raw(out.code << 8),
            stdout: out.stdout,
            stderr: out.stderr,
        })
    }
}

fn interpret(st: &mut DeviceState, argv: &[String]) -> Out {
    let args: Vec<&str> = argv.iter().map(|s| s.as_str()).collect();

    match args[0] {
        "cat" => cmd_cat(st, &args),
        "[" => cmd_test(st, &args),
        "cp" => cmd_cp(st, &args),
        "mv" => cmd_mv(st, &args),
        "rm" => cmd_rm(st, &args),
        "mkdir" => cmd_mkdir(st, &args),
        "chmod" => cmd_chmod_chown(st, &args, true),
        "chown" => cmd_chmod_chown(st, &args, false),
        "stat" => cmd_stat(st, &args),
        "am" => {
            if args.len() == 3 && args[1] == "force-stop" {
                st.stopped.push(args[2].into());
                Out::ok()
            } else {
                Out::fail(1, "unsupported am invocation")
            }
        }
        "sync" => Out::ok(),
        "command" => {
            if args.get(1) == Some(&"-v") && args.get(2) == Some(&"sqlite3") {
                if st.sql_rows.is_some() {
                    Out::with_stdout(b"/system/bin/sqlite3\n".to_vec())
                } else {
                    Out::fail(1, "")
                }
            } else {
                Out::fail(1, "")
            }
        }
        "sqlite3" => cmd_sqlite3(st, &args),
        bin if basename(bin) == "abx2xml" => cmd_convert(st, &args, true),
        bin if basename(bin) == "xml2abx" => cmd_convert(st, &args, false),
        other => Out::fail(127, &format!("sh: {}: not found", other)),
    }
}

fn read_any(st: &DeviceState, path: &str) -> Result<Vec<u8>, String> {
    if is_device_path(path) {
        match st.nodes.get(path) {
            Some(Node {
                kind: NodeKind::File(bytes),
                ..
            }) => Ok(bytes.clone()),
            Some(_) => Err(format!("{}: Is a directory", path)),
            None => Err(format!("{}: No such file or directory", path)),
        }
    } else {
        fs::read(path).map_err(|e| format!("{}: {}", path, e))
    }
}

fn write_any(st: &mut DeviceState, path: &str, bytes: &[u8]) -> Result<(), String> {
    if is_device_path(path) {
        st.nodes
            .insert(path.into(), Node::file(bytes, "root", "root", "644"));
        Ok(())
    } else {
        if let Some(parent) = Path::new(path).parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        fs::write(path, bytes).map_err(|e| format!("{}: {}", path, e))
    }
}

fn exists_any(st: &DeviceState, path: &str) -> bool {
    if is_device_path(path) {
        st.nodes.contains_key(path)
    } else {
        Path::new(path).exists()
    }
}

fn is_dir_any(st: &DeviceState, path: &str) -> bool {
    if is_device_path(path) {
        st.nodes.get(path).map_or(false, |n| n.is_dir())
    } else {
        Path::new(path).is_dir()
    }
}

fn cmd_cat(st: &DeviceState, args: &[&str]) -> Out {
    let path = match args.get(1) {
        Some(p) => p,
        None => return Out::fail(1, "cat: missing operand"),
    };
    match read_any(st, path) {
        Ok(bytes) => Out::with_stdout(bytes),
        Err(e) => Out::fail(1, &format!("cat: {}", e)),
    }
}

fn cmd_test(st: &DeviceState, args: &[&str]) -> Out {
    // [ -e path ] / [ -x path ]
    if args.len() != 4 || args[3] != "]" {
        return Out::fail(2, "[: malformed expression");
    }
    let path = args[2];
    let pass = match args[1] {
        "-e" => exists_any(st, path),
        "-x" => {
            if path == ABX_TO_XML_BIN || path == XML_TO_ABX_BIN {
                st.converters
            } else {
                exists_any(st, path)
            }
        }
        _ => false,
    };
    if pass {
        Out::ok()
    } else {
        Out::fail(1, "")
    }
}

/// Files under a device directory, as (relative-suffix, node) pairs
fn device_children(st: &DeviceState, dir: &str) -> Vec<(String, Node)> {
    let prefix = format!("{}/", dir);
    st.nodes
        .iter()
        .filter(|(k, _)| k.starts_with(&prefix))
        .map(|(k, n)| (k[prefix.len()..].to_string(), n.clone()))
        .collect()
}

fn host_children(dir: &Path, rel: &str, into: &mut Vec<(String, Option<Vec<u8>>)>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let child_rel = if rel.is_empty() {
            name.clone()
        } else {
            format!("{}/{}", rel, name)
        };
        if entry.path().is_dir() {
            into.push((child_rel.clone(), None));
            host_children(&entry.path(), &child_rel, into)?;
        } else {
            into.push((child_rel, Some(fs::read(entry.path())?)));
        }
    }
    Ok(())
}

fn copy_tree(st: &mut DeviceState, src: &str, dst: &str, recursive: bool) -> Result<(), String> {
    // (relative path, None for dir / Some bytes for file); "" is src itself
    let mut entries: Vec<(String, Option<Vec<u8>>)> = Vec::new();

    if is_device_path(src) {
        match st.nodes.get(src) {
            None => return Err(format!("{}: No such file or directory", src)),
            Some(node) if node.is_dir() => {
                if !recursive {
                    return Err(format!("omitting directory {}", src));
                }
                entries.push((String::new(), None));
                for (rel, node) in device_children(st, src) {
                    match node.kind {
                        NodeKind::Dir => entries.push((rel, None)),
                        NodeKind::File(bytes) => entries.push((rel, Some(bytes))),
                    }
                }
            }
            Some(Node {
                kind: NodeKind::File(bytes),
                ..
            }) => {
                entries.push((String::new(), Some(bytes.clone())));
            }
            Some(_) => unreachable!(),
        }
    } else {
        let p = Path::new(src);
        if !p.exists() {
            return Err(format!("{}: No such file or directory", src));
        }
        if p.is_dir() {
            if !recursive {
                return Err(format!("omitting directory {}", src));
            }
            entries.push((String::new(), None));
            host_children(p, "", &mut entries).map_err(|e| e.to_string())?;
        } else {
            entries.push((
                String::new(),
                Some(fs::read(p).map_err(|e| e.to_string())?),
            ));
        }
    }

    // `cp src dst` with an existing directory dst copies INTO it
    let base = if is_dir_any(st, dst) {
        format!("{}/{}", dst.trim_end_matches('/'), basename(src))
    } else {
        dst.to_string()
    };

    for (rel, content) in entries {
        let target = if rel.is_empty() {
            base.clone()
        } else {
            format!("{}/{}", base, rel)
        };
        match content {
            None => {
                if is_device_path(&target) {
                    st.nodes.insert(target, Node::dir("root", "root", "755"));
                } else {
                    fs::create_dir_all(&target).map_err(|e| e.to_string())?;
                }
            }
            Some(bytes) => write_any(st, &target, &bytes)?,
        }
    }
    Ok(())
}

fn split_flags<'a>(args: &[&'a str]) -> (Vec<char>, Vec<&'a str>) {
    let mut flags = Vec::new();
    let mut rest = Vec::new();
    for a in &args[1..] {
        if let Some(stripped) = a.strip_prefix('-') {
            flags.extend(stripped.chars());
        } else {
            rest.push(*a);
        }
    }
    (flags, rest)
}

fn cmd_cp(st: &mut DeviceState, args: &[&str]) -> Out {
    let (flags, rest) = split_flags(args);
    if rest.len() != 2 {
        return Out::fail(1, "cp: expected src and dst");
    }
    let recursive = flags.contains(&'r') || flags.contains(&'R');
    match copy_tree(st, rest[0], rest[1], recursive) {
        Ok(()) => Out::ok(),
        Err(e) => Out::fail(1, &format!("cp: {}", e)),
    }
}

fn remove_tree(st: &mut DeviceState, path: &str) -> Result<(), String> {
    if is_device_path(path) {
        let prefix = format!("{}/", path);
        st.nodes
            .retain(|k, _| k != path && !k.starts_with(&prefix));
        Ok(())
    } else {
        let p = Path::new(path);
        if !p.exists() {
            return Ok(());
        }
        if p.is_dir() {
            fs::remove_dir_all(p).map_err(|e| e.to_string())
        } else {
            fs::remove_file(p).map_err(|e| e.to_string())
        }
    }
}

fn cmd_mv(st: &mut DeviceState, args: &[&str]) -> Out {
    let (_, rest) = split_flags(args);
    if rest.len() != 2 {
        return Out::fail(1, "mv: expected src and dst");
    }
    if let Err(e) = copy_tree(st, rest[0], rest[1], true) {
        return Out::fail(1, &format!("mv: {}", e));
    }
    match remove_tree(st, rest[0]) {
        Ok(()) => Out::ok(),
        Err(e) => Out::fail(1, &format!("mv: {}", e)),
    }
}

fn cmd_rm(st: &mut DeviceState, args: &[&str]) -> Out {
    let (flags, rest) = split_flags(args);
    let force = flags.contains(&'f');
    for path in rest {
        if !exists_any(st, path) {
            if force {
                continue;
            }
            return Out::fail(1, &format!("rm: {}: No such file or directory", path));
        }
        if let Err(e) = remove_tree(st, path) {
            return Out::fail(1, &format!("rm: {}", e));
        }
    }
    Out::ok()
}

fn cmd_mkdir(st: &mut DeviceState, args: &[&str]) -> Out {
    let (_, rest) = split_flags(args);
    for path in rest {
        if is_device_path(path) {
            st.nodes
                .insert(path.to_string(), Node::dir("root", "root", "755"));
        } else if let Err(e) = fs::create_dir_all(path) {
            return Out::fail(1, &format!("mkdir: {}", e));
        }
    }
    Out::ok()
}

fn cmd_chmod_chown(st: &mut DeviceState, args: &[&str], is_chmod: bool) -> Out {
    let (flags, rest) = split_flags(args);
    if rest.len() != 2 {
        return Out::fail(1, "expected value and path");
    }
    let recursive = flags.contains(&'R');
    let (value, path) = (rest[0], rest[1]);

    if !is_device_path(path) {
        // Host-side targets are ours already
        return Out::ok();
    }
    if !st.nodes.contains_key(path) {
        return Out::fail(1, &format!("{}: No such file or directory", path));
    }

    let (owner, group) = if is_chmod {
        (String::new(), String::new())
    } else {
        match value.split_once(':') {
            Some((o, g)) => (o.to_string(), g.to_string()),
            None => (value.to_string(), String::new()),
        }
    };

    let prefix = format!("{}/", path);
    for (k, node) in st.nodes.iter_mut() {
        if k != path && !(recursive && k.starts_with(&prefix)) {
            continue;
        }
        if is_chmod {
            node.mode = value.into();
        } else {
            node.owner = owner.clone();
            node.group = group.clone();
        }
    }
    Out::ok()
}

fn cmd_stat(st: &DeviceState, args: &[&str]) -> Out {
    // stat -c '%U %G %a' path
    let path = match args.last() {
        Some(p) => *p,
        None => return Out::fail(1, "stat: missing operand"),
    };
    if is_device_path(path) {
        match st.nodes.get(path) {
            Some(n) => Out::with_stdout(
                format!("{} {} {}\n", n.owner, n.group, n.mode).into_bytes(),
            ),
            None => Out::fail(1, &format!("stat: {}: No such file or directory", path)),
        }
    } else if Path::new(path).exists() {
        Out::with_stdout(b"shell shell 755\n".to_vec())
    } else {
        Out::fail(1, &format!("stat: {}: No such file or directory", path))
    }
}

fn cmd_convert(st: &mut DeviceState, args: &[&str], to_text: bool) -> Out {
    if !st.converters {
        return Out::fail(127, "sh: converter not found");
    }
    if args.len() != 3 {
        return Out::fail(1, "usage: <converter> input output");
    }
    let raw = match read_any(st, args[1]) {
        Ok(v) => v,
        Err(e) => return Out::fail(1, &e),
    };
    let converted = if to_text {
        match fake_abx_decode(&raw) {
            Some(v) => v,
            None => return Out::fail(1, "input is not binary xml"),
        }
    } else {
        fake_abx_encode(&raw)
    };
    match write_any(st, args[2], &converted) {
        Ok(()) => Out::ok(),
        Err(e) => Out::fail(1, &e),
    }
}

/// Pulls the contents of every `'...'` literal out of a SQL string
fn sql_quoted(sql: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut chars = sql.chars();
    while let Some(c) = chars.next() {
        if c != '\'' {
            continue;
        }
        let mut lit = String::new();
        for inner in chars.by_ref() {
            if inner == '\'' {
                break;
            }
            lit.push(inner);
        }
        out.push(lit);
    }
    out
}

fn cmd_sqlite3(st: &mut DeviceState, args: &[&str]) -> Out {
    if args.len() != 3 {
        return Out::fail(1, "usage: sqlite3 db sql");
    }
    if !exists_any(st, args[1]) {
        return Out::fail(1, "unable to open database file");
    }
    let rows = match st.sql_rows.as_mut() {
        Some(v) => v,
        None => return Out::fail(1, "no sqlite support"),
    };
    let sql = args[2].trim();
    let quoted = sql_quoted(sql);

    if sql.starts_with("SELECT value FROM ssaid") {
        let pkg = match quoted.first() {
            Some(p) => p,
            None => return Out::fail(1, "bad select"),
        };
        let found = rows.iter().find(|(p, _)| p == pkg);
        match found {
            Some((_, v)) => Out::with_stdout(format!("{}\n", v).into_bytes()),
            None => Out::with_stdout(Vec::new()),
        }
    } else if sql.starts_with("UPDATE ssaid") {
        // quoted: [value, defaultValue, package]
        if quoted.len() < 3 {
            return Out::fail(1, "bad update");
        }
        let (value, pkg) = (&quoted[0], &quoted[2]);
        let mut changed = 0;
        for row in rows.iter_mut() {
            if &row.0 == pkg {
                row.1 = value.clone();
                changed += 1;
            }
        }
        Out::with_stdout(format!("{}\n", changed).into_bytes())
    } else if sql.starts_with("INSERT INTO ssaid") {
        // quoted: [name, value, package, defaultValue, 'true']
        if quoted.len() < 4 {
            return Out::fail(1, "bad insert");
        }
        rows.push((quoted[2].clone(), quoted[1].clone()));
        Out::ok()
    } else {
        Out::fail(1, "unsupported sql")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_cat_and_exists() {
        let su = FakeSu::new().with_file("/data/local/tmp/x", b"hello");
        assert_eq!(su.read_file_bytes("/data/local/tmp/x").unwrap(), b"hello");
        assert!(su.file_exists("/data/local/tmp/x"));
        assert!(!su.file_exists("/data/local/tmp/y"));
    }

    #[test]
    fn test_cp_into_existing_dir() {
        let su = FakeSu::new()
            .with_file("/data/local/tmp/a.txt", b"A");
        su.execute("mkdir -p /data/local/tmp/sub").unwrap();
        su.execute("cp -f /data/local/tmp/a.txt /data/local/tmp/sub")
            .unwrap();
        assert_eq!(su.file_bytes("/data/local/tmp/sub/a.txt").unwrap(), b"A");
    }

    #[test]
    fn test_recursive_copy_and_remove() {
        let su = FakeSu::new().with_target_app("<map/>");
        su.copy_recursive(TARGET_CACHE_DIR, "/data/local/tmp/cache")
            .unwrap();
        assert_eq!(
            su.file_bytes("/data/local/tmp/cache/game.dat").unwrap(),
            b"cached-bytes"
        );
        su.remove_recursive(TARGET_CACHE_DIR).unwrap();
        assert!(!su.has_node(TARGET_CACHE_DIR));
        assert!(!su.has_node(&format!("{}/game.dat", TARGET_CACHE_DIR)));
    }

    #[test]
    fn test_stat_and_chown() {
        let su = FakeSu::new().with_target_app("<map/>");
        let meta = su.stat_triple(TARGET_CACHE_DIR).unwrap();
        assert_eq!(meta.owner, APP_OWNER);
        assert_eq!(meta.mode, APP_MODE);

        su.chown("root", "root", TARGET_CACHE_DIR, true).unwrap();
        let meta = su
            .node_meta(&format!("{}/game.dat", TARGET_CACHE_DIR))
            .unwrap();
        assert_eq!(meta.owner, "root");
    }

    #[test]
    fn test_write_file_bytes_stages_through_host() {
        let su = FakeSu::new();
        su.write_file_bytes("/data/local/tmp/staged", b"content")
            .unwrap();
        assert_eq!(su.file_bytes("/data/local/tmp/staged").unwrap(), b"content");
    }

    #[test]
    fn test_converter_round_trip() {
        let su = FakeSu::new().with_file("/data/local/tmp/in.xml", b"<settings/>");
        su.execute("/system/bin/xml2abx /data/local/tmp/in.xml /data/local/tmp/out.abx")
            .unwrap()
            .err_on_status()
            .unwrap();
        let raw = su.file_bytes("/data/local/tmp/out.abx").unwrap();
        assert!(raw.starts_with(BINARY_MAGIC));
        su.execute("/system/bin/abx2xml /data/local/tmp/out.abx /data/local/tmp/back.xml")
            .unwrap()
            .err_on_status()
            .unwrap();
        assert_eq!(
            su.file_bytes("/data/local/tmp/back.xml").unwrap(),
            b"<settings/>"
        );
    }

    #[test]
    fn test_unknown_command_fails() {
        let su = FakeSu::new();
        assert!(!su.execute("frobnicate").unwrap().ok());
    }
}
