//! Utility functions for output file naming

use crate::config::FileCollisionAction;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Maximum number of rename attempts when resolving file collisions
const MAX_RENAME_ATTEMPTS: u32 = 9999;

/// Characters that are not allowed in file names on common filesystems
const RESERVED_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Make an episode title usable as a file name
///
/// Path separators, characters reserved on Windows and control characters are
/// replaced with `_`. Leading/trailing whitespace and dots are trimmed so the
/// result can never be `.`/`..` or a hidden file. An empty result becomes
/// `"untitled"`.
///
/// # Examples
///
/// ```
/// use qingting_dl::utils::sanitize_file_name;
///
/// assert_eq!(sanitize_file_name("Part 1/2: Intro"), "Part 1_2_ Intro");
/// assert_eq!(sanitize_file_name("  ..  "), "untitled");
/// ```
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| {
            if RESERVED_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    let trimmed = replaced.trim_matches(|c: char| c.is_whitespace() || c == '.');
    if trimmed.is_empty() {
        "untitled".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Get a unique path for a file, handling collisions according to the specified action
///
/// For Rename, this may add a ` (n)` suffix before the extension. For Skip, an
/// existing file is an [`Error::FileCollision`]. For Overwrite, the path is
/// returned unchanged.
///
/// # Examples
///
/// ```
/// use qingting_dl::utils::get_unique_path;
/// use qingting_dl::config::FileCollisionAction;
/// use std::path::Path;
///
/// let path = Path::new("/tmp/episode.mp3");
/// let unique = get_unique_path(path, FileCollisionAction::Rename).unwrap();
/// // If /tmp/episode.mp3 exists, returns /tmp/episode (1).mp3
/// ```
pub fn get_unique_path(path: &Path, action: FileCollisionAction) -> Result<PathBuf> {
    match action {
        FileCollisionAction::Overwrite => Ok(path.to_path_buf()),
        FileCollisionAction::Skip => {
            if path.exists() {
                return Err(Error::FileCollision {
                    path: path.to_path_buf(),
                });
            }
            Ok(path.to_path_buf())
        }
        FileCollisionAction::Rename => {
            if !path.exists() {
                return Ok(path.to_path_buf());
            }

            let stem = path.file_stem().and_then(|s| s.to_str()).ok_or_else(|| {
                invalid_path(path, "cannot extract file stem")
            })?;
            let extension = path.extension().and_then(|e| e.to_str());
            let parent = path
                .parent()
                .ok_or_else(|| invalid_path(path, "cannot extract parent directory"))?;

            for i in 1..=MAX_RENAME_ATTEMPTS {
                let new_name = match extension {
                    Some(ext) => format!("{} ({}).{}", stem, i, ext),
                    None => format!("{} ({})", stem, i),
                };
                let new_path = parent.join(new_name);
                if !new_path.exists() {
                    return Ok(new_path);
                }
            }

            Err(Error::FileCollision {
                path: path.to_path_buf(),
            })
        }
    }
}

fn invalid_path(path: &Path, reason: &str) -> Error {
    Error::Io(std::io::Error::new(
        std::io::ErrorKind::InvalidInput,
        format!("{}: {}", path.display(), reason),
    ))
}
