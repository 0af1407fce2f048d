pub mod config;
pub mod cycle;
pub mod desktop;
pub mod directories;
pub mod images;
pub mod selector;
pub mod state;
pub mod utils;

pub use config::WallpaperConfig;
pub use cycle::{RunContext, run_cycle};
pub use desktop::WallpaperManager;
pub use directories::{DirectoryConfig, ResolvedDirectories};
pub use selector::{next_wallpaper, select_wallpapers};
pub use state::SelectionState;

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Desktop environment error: {0}")]
    DesktopEnv(String),
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Wallpaper directory unavailable: {}", .0.display())]
    DirectoryUnavailable(PathBuf),
    #[error("No images found in {}", .0.display())]
    NoImages(PathBuf),
    #[error("Selected {selected} wallpapers for {monitors} monitors")]
    Shortfall { selected: usize, monitors: usize },

    #[error("Corrupted state file: {0}")]
    StateCorruption(String),
    #[error("State file {} is locked by another process", .0.display())]
    StateLocked(PathBuf),
    #[error("Failed to save state: {0}")]
    Persistence(String),
}

impl Error {
    /// Errors that only cost a single monitor its draw.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Error::DirectoryUnavailable(_) | Error::NoImages(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
