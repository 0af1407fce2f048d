use crate::Result;
use std::path::PathBuf;

pub mod sway;
pub mod x11;

pub trait WallpaperManager {
    /// Connected monitors, in the order wallpapers are assigned to them.
    fn get_screens(&self) -> Vec<String>;
    /// Paints `paths[i]` on `screens[i]`.
    fn set_wallpapers(&self, paths: &[PathBuf], screens: &[String]) -> Result<()>;
}

pub fn get_wallpaper_manager() -> Result<Box<dyn WallpaperManager>> {
    let session = std::env::var("XDG_SESSION_TYPE").unwrap_or_else(|_| "unknown".to_string());
    tracing::info!("Detected display server: {}", session);

    match session.to_lowercase().as_str() {
        "wayland" => Ok(Box::new(sway::SwayManager::new()?)),
        "x11" => Ok(Box::new(x11::X11Manager::new()?)),
        other => {
            if sway::SwayManager::is_available() {
                Ok(Box::new(sway::SwayManager::new()?))
            } else if x11::X11Manager::is_available() {
                Ok(Box::new(x11::X11Manager::new()?))
            } else {
                Err(crate::Error::DesktopEnv(format!(
                    "Unsupported display server: {other}"
                )))
            }
        }
    }
}
