//! Main list construction
//!
//! Expands the configured playlist entries (files and directories) into the
//! flat main list. Directories are walked recursively and symlinks followed.

use std::path::{Path, PathBuf};

use remplay_common::config::has_allowed_extension;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Build the main list from `sources`, keeping files with an allowed extension.
///
/// Each directory contributes its files in sorted path order; sources keep
/// the order they were given in. Unreadable entries are logged and skipped.
pub fn scan(sources: &[PathBuf], formats: &[String]) -> Vec<PathBuf> {
    let mut tracks = Vec::new();

    for source in sources {
        if source.is_dir() {
            let found = scan_directory(source, formats);
            debug!("{}: {} tracks", source.display(), found.len());
            tracks.extend(found);
        } else if source.is_file() {
            if has_allowed_extension(source, formats) {
                tracks.push(source.clone());
            } else {
                warn!("Skipping {}: unsupported format", source.display());
            }
        } else {
            warn!("Playlist entry not found: {}", source.display());
        }
    }

    info!("Main list: {} tracks", tracks.len());
    tracks
}

fn scan_directory(root: &Path, formats: &[String]) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Error walking {}: {}", root.display(), e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| has_allowed_extension(path, formats))
        .collect();

    found.sort();
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn formats() -> Vec<String> {
        vec!["mp3".to_string(), "flac".to_string()]
    }

    #[test]
    fn test_scan_directory_recursive_sorted_filtered() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("b/inner")).unwrap();
        fs::write(dir.path().join("b/inner/3.flac"), b"").unwrap();
        fs::write(dir.path().join("a.mp3"), b"").unwrap();
        fs::write(dir.path().join("b/2.MP3"), b"").unwrap();
        fs::write(dir.path().join("cover.jpg"), b"").unwrap();

        let tracks = scan(&[dir.path().to_path_buf()], &formats());
        assert_eq!(
            tracks,
            vec![
                dir.path().join("a.mp3"),
                dir.path().join("b/2.MP3"),
                dir.path().join("b/inner/3.flac"),
            ]
        );
    }

    #[test]
    fn test_scan_keeps_source_order_and_skips_missing() {
        let dir = TempDir::new().unwrap();
        let z = dir.path().join("z.mp3");
        let a = dir.path().join("a.mp3");
        fs::write(&z, b"").unwrap();
        fs::write(&a, b"").unwrap();

        let sources = vec![z.clone(), dir.path().join("missing.mp3"), a.clone()];
        assert_eq!(scan(&sources, &formats()), vec![z, a]);
    }

    #[test]
    fn test_scan_rejects_unsupported_file_entry() {
        let dir = TempDir::new().unwrap();
        let txt = dir.path().join("notes.txt");
        fs::write(&txt, b"").unwrap();
        assert!(scan(&[txt], &formats()).is_empty());
    }
}
