//! Locating Python sources under a directory tree.

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

use crate::core::{Error, Result};

const PY_EXTENSIONS: &[&str] = &["py", "pxi"];
const PY_SHEBANGS: &[&str] = &["#!/usr/bin/env python", "#!/usr/bin/python"];

/// A file takes part in the migration when it carries a Python extension,
/// or is executable and opens with a recognized Python shebang.
pub fn is_python_file(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        if PY_EXTENSIONS.contains(&ext) {
            return true;
        }
    }
    if !is_executable(path) {
        return false;
    }
    let Ok(file) = std::fs::File::open(path) else {
        return false;
    };
    let mut first = String::new();
    if BufReader::new(file).read_line(&mut first).is_err() {
        return false;
    }
    PY_SHEBANGS.contains(&first.trim())
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    false
}

/// Collect the Python files under `root`, sorted for deterministic
/// processing order. `__pycache__` and `.git` trees are skipped; no
/// gitignore handling, hidden files are fair game.
///
/// With `nosubdir` only `*.py` files directly under `root` are taken.
pub fn collect_python_files(root: &Path, nosubdir: bool, follow_links: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    if nosubdir {
        let pattern = root.join("*.py");
        let pattern = pattern.to_string_lossy();
        let entries = glob::glob(&pattern)
            .map_err(|e| Error::Config(format!("bad glob pattern {pattern}: {e}")))?;
        for entry in entries {
            let path = entry.map_err(|e| Error::io(root, e.into_error()))?;
            if path.is_file() {
                files.push(path);
            }
        }
    } else {
        let walker = WalkBuilder::new(root)
            .hidden(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .follow_links(follow_links)
            .filter_entry(|entry| {
                let name = entry.file_name().to_string_lossy();
                name != "__pycache__" && name != ".git"
            })
            .build();
        for entry in walker {
            let entry = entry.map_err(|e| Error::Config(e.to_string()))?;
            let path = entry.path();
            if is_python_file(path) {
                files.push(path.to_path_buf());
            }
        }
    }

    files.sort();
    Ok(files)
}
