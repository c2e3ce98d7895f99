//! Canonical-path file filtering.

use crate::scope::{ScopeKind, ScopeTree};
use std::fs;
use std::path::{Path, PathBuf};

/// Removes every file scope whose base filename cannot be opened for
/// reading under any directory of `search_paths`. Returns `true` if the
/// tree changed.
pub fn filter_files(tree: &mut ScopeTree, search_paths: &[PathBuf]) -> bool {
    let mut changed = false;
    for lm in tree.children(tree.root()).to_vec() {
        for file in tree.children(lm).to_vec() {
            let ScopeKind::File { name, .. } = &tree.node(file).kind else {
                continue;
            };
            if !locatable(name, search_paths) {
                tree.unlink_and_delete(file);
                changed = true;
            }
        }
    }
    changed
}

fn locatable(name: &str, search_paths: &[PathBuf]) -> bool {
    let Some(base) = Path::new(name).file_name() else {
        return false;
    };
    search_paths
        .iter()
        .any(|dir| fs::File::open(dir.join(base)).is_ok())
}
