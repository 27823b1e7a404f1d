//! Local checkout discovery by scanning workspace roots for git directories.

use std::fs;
use std::io;
use std::path::Path;

use super::Repo;

/// Scan one workspace root for immediate subdirectories containing a `.git`.
///
/// A missing root yields an empty list (a freshly configured machine has no
/// clone directory yet); other I/O failures surface to the caller.
pub fn scan_root(root: &Path) -> io::Result<Vec<Repo>> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut repos = Vec::new();
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() || !path.join(".git").exists() {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            repos.push(Repo {
                name: name.to_string(),
                path: Some(path.clone()),
                clone_url: None,
            });
        }
    }

    repos.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(repos)
}
