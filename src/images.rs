use crate::{Error, Result};
use std::fs;
use std::path::Path;
use tracing::warn;

/// Lowercases an extension and gives it a leading dot (`JPG` -> `.jpg`).
pub fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{ext}")
    }
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .is_some_and(|ext| extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(&ext)))
}

/// Returns the image filenames in `directory`, sorted by byte order.
///
/// Only regular files (symlinks are followed) whose extension is one of
/// `extensions` are listed. A path that is missing, not a directory or not
/// readable yields [`Error::DirectoryUnavailable`].
pub fn list_images(directory: &Path, extensions: &[String]) -> Result<Vec<String>> {
    if !directory.is_dir() {
        return Err(Error::DirectoryUnavailable(directory.to_path_buf()));
    }

    let unreadable = |e: std::io::Error| {
        warn!("Cannot read directory {}: {}", directory.display(), e);
        Error::DirectoryUnavailable(directory.to_path_buf())
    };

    let mut images = Vec::new();
    for entry in fs::read_dir(directory).map_err(unreadable)? {
        let entry = entry.map_err(unreadable)?;
        let path = entry.path();

        if !path.is_file() || !has_extension(&path, extensions) {
            continue;
        }

        match entry.file_name().into_string() {
            Ok(name) => images.push(name),
            Err(name) => {
                warn!(
                    "Skipping {:?} in {}: filename is not valid UTF-8",
                    name,
                    directory.display()
                );
            }
        }
    }

    images.sort();
    Ok(images)
}

pub fn count_images(directory: &Path, extensions: &[String]) -> usize {
    list_images(directory, extensions)
        .map(|images| images.len())
        .unwrap_or(0)
}
