//! One wallpaper update: resolve, select, apply, then record and persist.

use crate::config::{ScheduleConfig, WallpaperConfig};
use crate::desktop::WallpaperManager;
use crate::selector::select_wallpapers;
use crate::state::SelectionState;
use crate::{Error, Result};
use chrono::{Datelike, Local, NaiveDateTime};
use std::path::PathBuf;
use tracing::{error, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunContext {
    pub is_holiday: bool,
    pub is_daytime: bool,
}

impl RunContext {
    pub fn at(schedule: &ScheduleConfig, now: NaiveDateTime) -> Result<Self> {
        Ok(Self {
            is_holiday: schedule.is_holiday(now.weekday())?,
            is_daytime: schedule.is_daytime(now.time())?,
        })
    }

    pub fn now(schedule: &ScheduleConfig) -> Result<Self> {
        Self::at(schedule, Local::now().naive_local())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CycleReport {
    pub monitors: Vec<String>,
    pub wallpapers: Vec<PathBuf>,
    pub state_saved: bool,
}

/// Runs a full update cycle against `manager`.
///
/// Nothing is applied unless every monitor got a wallpaper, and the state is
/// only recorded and saved after the wallpapers were applied. A failed save
/// is logged and reported in [`CycleReport::state_saved`] but does not fail
/// the cycle.
pub fn run_cycle(
    config: &WallpaperConfig,
    manager: &dyn WallpaperManager,
    context: RunContext,
) -> Result<CycleReport> {
    let tracking = &config.state_tracking;
    let mut state = if tracking.enabled {
        info!("State tracking enabled");
        let mut state = SelectionState::load(&tracking.state_file);
        if tracking.auto_cleanup {
            state.cleanup_old_entries(tracking.max_age_days);
        }
        Some(state)
    } else {
        None
    };

    info!(
        "Context: {}, {}",
        if context.is_holiday { "Holiday" } else { "Workday" },
        if context.is_daytime { "Day" } else { "Night" }
    );

    let dirs = config
        .directories
        .resolve(context.is_holiday, context.is_daytime)?;

    let monitors = manager.get_screens();
    info!("Active monitors ({}): {:?}", monitors.len(), monitors);
    if monitors.is_empty() {
        return Err(Error::DesktopEnv("No monitors detected".to_string()));
    }

    let wallpapers = select_wallpapers(
        &dirs,
        monitors.len(),
        &config.images.extensions,
        state.as_mut(),
    )?;

    if wallpapers.len() != monitors.len() {
        error!(
            "Selected {} wallpapers for {} monitors",
            wallpapers.len(),
            monitors.len()
        );
        return Err(Error::Shortfall {
            selected: wallpapers.len(),
            monitors: monitors.len(),
        });
    }

    manager.set_wallpapers(&wallpapers, &monitors)?;

    let state_saved = match state.as_mut() {
        Some(state) => {
            state.update(&wallpapers, &monitors);
            match state.save(&tracking.state_file) {
                Ok(()) => true,
                Err(e) => {
                    warn!("Failed to save state, continuing anyway: {}", e);
                    false
                }
            }
        }
        None => false,
    };

    Ok(CycleReport {
        monitors,
        wallpapers,
        state_saved,
    })
}
