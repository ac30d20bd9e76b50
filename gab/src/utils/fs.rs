use std::fs::{self, create_dir_all, File};
use std::io::{self, Read};
use std::path::Path;

pub fn ensure_dir_exists(p: &Path) -> io::Result<()> {
    if p.exists() {
        return Ok(());
    }

    create_dir_all(p)
}

/// Panics on invalid UTF-8 paths, which we don't support anyway
pub fn path_must_str(p: &Path) -> &str {
    p.to_str().expect("valid utf-8 path")
}

pub fn read_file(path: &Path) -> io::Result<String> {
    let mut f = File::open(path)?;
    let mut into = String::new();
    f.read_to_string(&mut into)?;
    Ok(into)
}

/// Removes a directory tree, treating "already gone" as success
pub fn remove_dir_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::env;

    #[test]
    fn test_remove_dir_if_exists_missing() {
        let p = env::temp_dir().join("gab_test_definitely_missing_dir");
        assert!(remove_dir_if_exists(&p).is_ok());
    }
}
