//! Persistent selection state.
//!
//! The state file records, per wallpaper directory, the last seen sorted
//! listing and a round-robin cursor into it, plus which file every monitor
//! is currently showing. It is read once at the start of a run and written
//! once at the end, through a locked temp file that is renamed into place.

use crate::utils::ensure_parent_dir;
use crate::{Error, Result};
use chrono::{DateTime, Local, NaiveDateTime, TimeDelta};
use fs2::FileExt;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

pub const STATE_VERSION: &str = "1.0";

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct CurrentWallpaper {
    pub filename: String,
    #[serde(
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub timestamp: Option<NaiveDateTime>,
}

/// Cursor state for one directory. `position` is kept signed so a stored
/// negative value is clamped on the next draw instead of failing the load.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct RoundRobinEntry {
    pub images: Vec<String>,
    pub position: i64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SelectionState {
    pub version: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub last_run: Option<NaiveDateTime>,
    #[serde(deserialize_with = "lenient_assignments")]
    pub current_wallpapers: BTreeMap<String, CurrentWallpaper>,
    pub round_robin: BTreeMap<String, RoundRobinEntry>,
}

impl Default for SelectionState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION.to_string(),
            last_run: None,
            current_wallpapers: BTreeMap::new(),
            round_robin: BTreeMap::new(),
        }
    }
}

/// Parses an ISO-8601 timestamp, with or without a UTC offset. Offset
/// timestamps are kept as their local wall-clock time.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    value
        .parse::<NaiveDateTime>()
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|stamp| stamp.naive_local())
        })
        .or_else(|| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f").ok())
}

fn lenient_timestamp<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(value)) => {
            let parsed = parse_timestamp(&value);
            if parsed.is_none() {
                warn!("Ignoring unparsable timestamp in state: {}", value);
            }
            parsed
        }
        Some(other) => {
            warn!("Ignoring non-string timestamp in state: {}", other);
            None
        }
    })
}

// Monitor records are rewritten on every successful run, so a malformed
// record is dropped rather than failing the whole document.
fn lenient_assignments<'de, D>(
    deserializer: D,
) -> std::result::Result<BTreeMap<String, CurrentWallpaper>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|(monitor, value)| match serde_json::from_value(value) {
            Ok(current) => Some((monitor, current)),
            Err(e) => {
                warn!("Ignoring unreadable wallpaper record for {}: {}", monitor, e);
                None
            }
        })
        .collect())
}

/// Key under which a directory's cursor is stored: its canonical absolute path.
pub fn directory_key(directory: &Path) -> String {
    fs::canonicalize(directory)
        .or_else(|_| std::path::absolute(directory))
        .unwrap_or_else(|_| directory.to_path_buf())
        .to_string_lossy()
        .into_owned()
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Moves a corrupted state file aside as `<name>.corrupted.<YYYYMMDD_HHMMSS>`.
fn quarantine(path: &Path) -> io::Result<PathBuf> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "state".to_string());
    let base = format!(
        "{}.corrupted.{}",
        file_name,
        Local::now().format("%Y%m%d_%H%M%S")
    );

    let mut backup = path.with_file_name(&base);
    let mut suffix = 1;
    while backup.exists() {
        backup = path.with_file_name(format!("{base}_{suffix}"));
        suffix += 1;
    }

    fs::rename(path, &backup)?;
    Ok(backup)
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a state document. Any syntax or schema problem is reported as
    /// [`Error::StateCorruption`].
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| Error::StateCorruption(e.to_string()))
    }

    /// Loads the state file, falling back to a fresh state when it is
    /// missing, unreadable or corrupt. Corrupt files are kept on disk under a
    /// `.corrupted.<timestamp>` name.
    pub fn load(path: &Path) -> Self {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("State file not found, will create new: {}", path.display());
                return Self::new();
            }
            Err(e) => {
                error!("Failed to read state file {}: {}", path.display(), e);
                return Self::new();
            }
        };

        match Self::parse(&bytes) {
            Ok(state) => {
                if state.version != STATE_VERSION {
                    warn!(
                        "State version {} differs from current version {}, using as is",
                        state.version, STATE_VERSION
                    );
                }
                info!("Loaded state from {}", path.display());
                state
            }
            Err(e) => {
                error!("{}", e);
                match quarantine(path) {
                    Ok(backup) => info!("Backed up corrupted state to: {}", backup.display()),
                    Err(backup_err) => {
                        error!("Failed to backup corrupted state: {}", backup_err)
                    }
                }
                Self::new()
            }
        }
    }

    /// Writes the state atomically.
    ///
    /// The document is written to `<path>.tmp` under an exclusive,
    /// non-blocking lock and then renamed over `path`. If another process
    /// holds the lock this returns [`Error::StateLocked`] straight away and
    /// leaves both files alone.
    pub fn save(&self, path: &Path) -> Result<()> {
        ensure_parent_dir(path)
            .map_err(|e| Error::Persistence(format!("failed to create state directory: {e}")))?;

        let temp_path = temp_path_for(path);
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&temp_path)
            .map_err(|e| {
                Error::Persistence(format!("failed to open {}: {}", temp_path.display(), e))
            })?;

        if let Err(e) = file.try_lock_exclusive() {
            if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() {
                warn!("State file locked by another process, skipping update");
                return Err(Error::StateLocked(temp_path));
            }
            drop(file);
            remove_temp(&temp_path);
            return Err(Error::Persistence(format!(
                "failed to lock {}: {}",
                temp_path.display(),
                e
            )));
        }

        // Another writer may have renamed the file we opened into place
        // between our open and our lock. Writing now would truncate the live
        // state file, so treat it like contention.
        if !holds_current_temp(&file, &temp_path) {
            warn!("State temp file was replaced by another process, skipping update");
            return Err(Error::StateLocked(temp_path));
        }

        let result = self
            .write_locked(&file)
            .and_then(|()| fs::rename(&temp_path, path));

        if let Err(e) = FileExt::unlock(&file) {
            debug!("Failed to unlock {}: {}", temp_path.display(), e);
        }
        drop(file);

        match result {
            Ok(()) => {
                info!("Saved state to {}", path.display());
                Ok(())
            }
            Err(e) => {
                remove_temp(&temp_path);
                Err(Error::Persistence(e.to_string()))
            }
        }
    }

    fn write_locked(&self, mut file: &File) -> io::Result<()> {
        file.set_len(0)?;
        serde_json::to_writer_pretty(file, self)?;
        file.write_all(b"\n")?;
        file.flush()?;
        file.sync_all()
    }

    /// Records which file every monitor now shows and stamps the run time.
    pub fn update<P: AsRef<Path>>(&mut self, wallpapers: &[P], monitors: &[String]) {
        let now = Local::now().naive_local();
        self.last_run = Some(now);
        self.current_wallpapers = monitors
            .iter()
            .zip(wallpapers)
            .filter_map(|(monitor, path)| {
                path.as_ref().file_name().map(|name| {
                    (
                        monitor.clone(),
                        CurrentWallpaper {
                            filename: name.to_string_lossy().into_owned(),
                            timestamp: Some(now),
                        },
                    )
                })
            })
            .collect();
    }

    /// Serves the next image for `key` from the current sorted listing.
    ///
    /// The stored listing is replaced and the cursor reset whenever it
    /// differs from `images`. Images in `used` are skipped while another one
    /// is available; when every image is used the one at the cursor is
    /// served anyway. The cursor ends up one past the served image.
    pub fn next_image(
        &mut self,
        key: &str,
        images: Vec<String>,
        used: &HashSet<String>,
    ) -> Option<String> {
        if images.is_empty() {
            return None;
        }

        let entry = self.round_robin.entry(key.to_string()).or_insert_with(|| {
            info!("Initialized round-robin for {}", key);
            RoundRobinEntry {
                images: images.clone(),
                position: 0,
            }
        });

        if entry.images != images {
            info!("Directory contents changed for {}, resetting position", key);
            entry.images = images;
            entry.position = 0;
        }

        let len = entry.images.len();
        let mut position = match usize::try_from(entry.position) {
            Ok(position) if position < len => position,
            _ => {
                warn!(
                    "Round-robin position {} out of range for {} images in {}, resetting",
                    entry.position, len, key
                );
                0
            }
        };

        for _ in 0..len {
            if !used.contains(&entry.images[position]) {
                break;
            }
            position = (position + 1) % len;
        }

        entry.position = ((position + 1) % len) as i64;
        let selected = entry.images[position].clone();
        info!(
            "Round-robin selection [{}/{}]: {} from {}",
            position + 1,
            len,
            selected,
            key
        );
        Some(selected)
    }

    /// Drops every round-robin cursor when the last run is older than
    /// `max_age_days`.
    pub fn cleanup_old_entries(&mut self, max_age_days: u32) {
        self.cleanup_old_entries_at(Local::now().naive_local(), max_age_days);
    }

    pub fn cleanup_old_entries_at(&mut self, now: NaiveDateTime, max_age_days: u32) {
        let Some(last_run) = self.last_run else {
            return;
        };

        if last_run < now - TimeDelta::days(i64::from(max_age_days)) {
            info!("State older than {} days, clearing round-robin", max_age_days);
            self.round_robin.clear();
        }
    }
}

/// Whether `file` is still the inode found at `temp_path`.
#[cfg(unix)]
fn holds_current_temp(file: &File, temp_path: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    match (file.metadata(), fs::metadata(temp_path)) {
        (Ok(held), Ok(on_disk)) => held.dev() == on_disk.dev() && held.ino() == on_disk.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn holds_current_temp(_file: &File, temp_path: &Path) -> bool {
    temp_path.exists()
}

fn remove_temp(temp_path: &Path) {
    if temp_path.exists() {
        if let Err(e) = fs::remove_file(temp_path) {
            debug!("Failed to remove {}: {}", temp_path.display(), e);
        }
    }
}
