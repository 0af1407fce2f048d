use crate::directories::ResolvedDirectories;
use crate::images::list_images;
use crate::state::{SelectionState, directory_key};
use crate::{Error, Result};
use rand::seq::IndexedRandom;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Picks the next wallpaper from `directory`.
///
/// With a state the directory is walked round-robin; without one an image
/// not yet in `used` is picked at random. Either way the chosen filename is
/// added to `used`.
pub fn next_wallpaper(
    directory: &Path,
    extensions: &[String],
    state: Option<&mut SelectionState>,
    used: &mut HashSet<String>,
) -> Result<PathBuf> {
    let images = list_images(directory, extensions)?;
    if images.is_empty() {
        return Err(Error::NoImages(directory.to_path_buf()));
    }

    let selected = match state {
        Some(state) => state
            .next_image(&directory_key(directory), images, used)
            .ok_or_else(|| Error::NoImages(directory.to_path_buf()))?,
        None => {
            let available: Vec<&String> =
                images.iter().filter(|image| !used.contains(*image)).collect();
            let mut rng = rand::rng();
            let picked = if available.is_empty() {
                images.choose(&mut rng)
            } else {
                available.choose(&mut rng).copied()
            };
            let picked = picked
                .cloned()
                .ok_or_else(|| Error::NoImages(directory.to_path_buf()))?;
            info!("Random selection: {} from {}", picked, directory.display());
            picked
        }
    };

    used.insert(selected.clone());
    Ok(directory.join(selected))
}

/// Picks one wallpaper per monitor, in monitor order.
///
/// Monitors whose directory is missing or empty are left out, so the result
/// can be shorter than `monitor_count`. Any other I/O failure aborts the
/// selection.
pub fn select_wallpapers(
    dirs: &ResolvedDirectories,
    monitor_count: usize,
    extensions: &[String],
    mut state: Option<&mut SelectionState>,
) -> Result<Vec<PathBuf>> {
    let mut used = HashSet::new();
    let mut wallpapers = Vec::with_capacity(monitor_count);

    for index in 0..monitor_count {
        let directory = dirs.for_monitor(index);
        match next_wallpaper(directory, extensions, state.as_deref_mut(), &mut used) {
            Ok(path) => wallpapers.push(path),
            Err(e) if e.is_unavailable() => {
                error!(
                    "Failed to select wallpaper for monitor {} from {}: {}",
                    index,
                    directory.display(),
                    e
                );
            }
            Err(e) => return Err(e),
        }
    }

    Ok(wallpapers)
}
