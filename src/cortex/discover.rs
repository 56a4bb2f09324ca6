//! Locate the cortex containing a start path.
//!
//! Walks up to `max_depth` ancestors looking for the marker file, then
//! searches breadth-first down to `max_depth` levels below the start.
//! The filesystem is reached only through [`DirectoryProbe`].

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

/// Marker file at the root of every cortex.
pub const CORTEX_MARKER: &str = "cortex.json";

/// Read-only view of a directory tree.
pub trait DirectoryProbe {
    fn is_file(&self, path: &Path) -> bool;

    /// Immediate subdirectories of `dir`. Unreadable directories are empty.
    fn list_dirs(&self, dir: &Path) -> Vec<PathBuf>;
}

/// [`DirectoryProbe`] over the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsProbe;

impl DirectoryProbe for FsProbe {
    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn list_dirs(&self, dir: &Path) -> Vec<PathBuf> {
        match std::fs::read_dir(dir) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
                .map(|e| e.path())
                .collect(),
            Err(e) => {
                trace!(dir = %dir.display(), error = %e, "Skipping unreadable directory");
                Vec::new()
            }
        }
    }
}

fn is_hidden(dir: &Path) -> bool {
    dir.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

/// Find the directory holding [`CORTEX_MARKER`] for `start`.
///
/// `start` itself and up to `max_depth` ancestors are checked first
/// (nearest wins), then descendants level by level in sorted order.
pub fn find_cortex<P: DirectoryProbe + ?Sized>(
    start: &Path,
    probe: &P,
    max_depth: usize,
) -> Option<PathBuf> {
    let mut current = Some(start);
    for _ in 0..=max_depth {
        let Some(dir) = current else { break };
        if probe.is_file(&dir.join(CORTEX_MARKER)) {
            debug!(root = %dir.display(), "Found cortex above start");
            return Some(dir.to_path_buf());
        }
        current = dir.parent();
    }

    let mut queue: VecDeque<(PathBuf, usize)> = VecDeque::new();
    queue.push_back((start.to_path_buf(), 0));
    while let Some((dir, depth)) = queue.pop_front() {
        if depth > 0 && probe.is_file(&dir.join(CORTEX_MARKER)) {
            debug!(root = %dir.display(), depth, "Found cortex below start");
            return Some(dir);
        }
        if depth == max_depth {
            continue;
        }
        let mut children: Vec<PathBuf> = probe
            .list_dirs(&dir)
            .into_iter()
            .filter(|c| !is_hidden(c))
            .collect();
        children.sort();
        for child in children {
            queue.push_back((child, depth + 1));
        }
    }

    debug!(start = %start.display(), max_depth, "No cortex found");
    None
}
