//! Directory walking, clearing and writing beneath a root.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::VirtualPath;

fn walk_error(err: walkdir::Error) -> io::Error {
    match err.into_io_error() {
        Some(err) => err,
        None => io::Error::new(io::ErrorKind::Other, "filesystem loop while walking"),
    }
}

/// Remove `root` and everything beneath it. A missing `root` is not an error.
pub fn clear_dir(root: &Path) -> io::Result<()> {
    if !root.is_dir() {
        return Ok(());
    }

    for entry in WalkDir::new(root).contents_first(true) {
        let entry = entry.map_err(walk_error)?;
        if entry.file_type().is_dir() {
            fs::remove_dir(entry.path())?;
        } else {
            fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

/// Every file beneath `root`, as paths relative to it, sorted.
pub fn walk_files(root: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if !root.is_dir() {
        return Ok(files);
    }

    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(walk_error)?;
        if entry.file_type().is_dir() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        files.push(relative.to_path_buf());
    }
    files.sort();
    Ok(files)
}

/// Where a virtual path lands beneath `root`.
pub fn resolve_under(root: &Path, path: &VirtualPath) -> PathBuf {
    path.iter().fold(root.to_path_buf(), |acc, c| acc.join(c))
}

/// Write `contents` to `path` beneath `root`, creating parent directories.
pub fn write_under(root: &Path, path: &VirtualPath, contents: &[u8]) -> io::Result<PathBuf> {
    let target = resolve_under(root, path);
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&target, contents)?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(root: &Path) {
        let v = |s| VirtualPath::parse(s).unwrap();
        write_under(root, &v("index.html"), b"<html>").unwrap();
        write_under(root, &v("Cat/Cat.js"), b"js").unwrap();
        write_under(root, &v("Cat/costumes/a.svg"), b"").unwrap();
    }

    #[test]
    fn walk_lists_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        tree(dir.path());

        let files = walk_files(dir.path()).unwrap();
        assert_eq!(
            files,
            vec![
                PathBuf::from("Cat/Cat.js"),
                PathBuf::from("Cat/costumes/a.svg"),
                PathBuf::from("index.html"),
            ]
        );
    }

    #[test]
    fn clear_removes_everything() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("leopard");
        tree(&root);

        clear_dir(&root).unwrap();
        assert!(!root.exists());
        // Clearing again is a no-op.
        clear_dir(&root).unwrap();
    }

    #[test]
    fn walk_skips_empty_directories() {
        let dir = tempfile::tempdir().unwrap();
        tree(dir.path());
        fs::create_dir_all(dir.path().join("Dog/sounds")).unwrap();

        let files = walk_files(dir.path()).unwrap();
        assert_eq!(files.len(), 3);
        assert!(files.iter().all(|f| !f.starts_with("Dog")));

        clear_dir(dir.path()).unwrap();
        assert!(!dir.path().exists());
    }

    #[test]
    fn missing_root_walks_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(walk_files(&dir.path().join("nope")).unwrap().is_empty());
    }
}
