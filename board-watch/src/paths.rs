//! Where board-watch keeps its storage file and logs.

use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use directories::ProjectDirs;

/// Archived logs kept next to `latest.log`.
const KEEP_LOGS: usize = 25;

const LATEST_LOG: &str = "latest.log";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "board-sync", "board-watch")
}

/// Default storage database, the headless counterpart of a browser
/// profile's local storage.
///
/// - Linux: `~/.local/share/board-watch/storage.db`
/// - macOS: `~/Library/Application Support/dev.board-sync.board-watch/storage.db`
pub fn storage_db() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.data_dir().join("storage.db"))
}

/// Log directory.
pub fn log_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.cache_dir().to_path_buf())
}

/// Prepares `dir` for a new run and returns the path to log to.
///
/// An existing `latest.log` is renamed after the current local time, and
/// all but the newest archives are deleted.
pub fn prepare_log(dir: &Path) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let latest = dir.join(LATEST_LOG);

    if latest.exists() {
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        fs::rename(&latest, dir.join(format!("{}.log", stamp)))?;
    }

    prune_archives(dir, KEEP_LOGS)?;
    Ok(latest)
}

fn prune_archives(dir: &Path, keep: usize) -> io::Result<()> {
    let mut archives = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_archive = path.extension().is_some_and(|ext| ext == "log")
            && path.file_name().is_some_and(|name| name != LATEST_LOG);
        if is_archive {
            let modified = fs::metadata(&path).and_then(|m| m.modified()).ok();
            archives.push((modified, path));
        }
    }

    // newest first
    archives.sort_by(|a, b| b.cmp(a));
    for (_, path) in archives.into_iter().skip(keep) {
        fs::remove_file(path)?;
    }
    Ok(())
}
