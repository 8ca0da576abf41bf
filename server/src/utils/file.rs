//! File utility functions

use std::path::PathBuf;

/// Expand a user-supplied path to an absolute path.
///
/// `~` and `~/rest` resolve against the home directory; relative paths and bare
/// names resolve against the current directory. Absolute paths pass through.
///
/// ```text
/// expand_path("~/.rintrack")   // -> /home/user/.rintrack
/// expand_path("./rintrack.db") // -> /current/dir/rintrack.db
/// expand_path("/var/lib/rt")   // -> /var/lib/rt
/// ```
pub fn expand_path(path: &str) -> PathBuf {
    let path = path.trim();

    if path.is_empty() {
        return std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    }

    let expanded = if path == "~" {
        dirs::home_dir().unwrap_or_else(|| PathBuf::from(path))
    } else if let Some(rest) = path.strip_prefix("~/") {
        match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => PathBuf::from(path),
        }
    } else {
        PathBuf::from(path)
    };

    if expanded.is_relative() {
        std::env::current_dir()
            .map(|cwd| cwd.join(&expanded))
            .unwrap_or(expanded)
    } else {
        expanded
    }
}
