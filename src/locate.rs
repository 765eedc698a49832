//! Search for the truss description on disk.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

/// Walk `root` depth-first and return the first file called `name`.
///
/// Files directly inside a directory are checked before its subdirectories,
/// and both are visited in sorted order so the result does not depend on the
/// file system. Symbolic links to directories are not followed. Unreadable
/// directories are skipped.
#[must_use]
pub fn find_file(name: &str, root: &Path) -> Option<PathBuf> {
    let mut entries: Vec<(PathBuf, bool)> = match fs::read_dir(root) {
        Ok(entries) => entries
            .filter_map(Result::ok)
            .map(|entry| {
                // `DirEntry::file_type` reports the link itself, not its target.
                let is_dir = entry.file_type().is_ok_and(|kind| kind.is_dir());
                (entry.path(), is_dir)
            })
            .collect(),
        Err(error) => {
            debug!("skipping {}: {error}", root.display());
            return None;
        }
    };
    entries.sort();

    let (dirs, files): (Vec<_>, Vec<_>) = entries.into_iter().partition(|&(_, is_dir)| is_dir);
    if let Some((found, _)) = files.into_iter().find(|(path, _)| {
        path.file_name().is_some_and(|file| file == name) && path.is_file()
    }) {
        return Some(found);
    }
    dirs.iter().find_map(|(dir, _)| find_file(name, dir))
}

/// Resolve the description to read.
///
/// An explicit file is used as is; an explicit directory is searched. Without
/// an explicit input, the parent of `cwd` is searched first, then `cwd`.
#[must_use]
pub fn resolve_input(input: Option<&Path>, name: &str, cwd: &Path) -> Option<PathBuf> {
    match input {
        Some(path) if path.is_file() => Some(path.to_path_buf()),
        Some(path) => find_file(name, path),
        None => cwd
            .parent()
            .and_then(|parent| find_file(name, parent))
            .or_else(|| find_file(name, cwd)),
    }
}
