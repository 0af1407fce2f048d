use crate::directories::{DayDirs, DirectoryConfig, MonitorDirs};
use crate::images::normalize_extension;
use crate::utils::{ensure_parent_dir, expand_path, get_data_dir};
use crate::{Error, Result};
use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::fs::{read_to_string, write};
use std::path::{Path, PathBuf};

const TIME_FORMAT: &str = "%H:%M";
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct ScheduleConfig {
    pub holiday_days: Vec<String>,
    pub day_start_time: String,
    pub night_start_time: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            holiday_days: vec!["Sunday".to_string()],
            day_start_time: "08:00".to_string(),
            night_start_time: "18:00".to_string(),
        }
    }
}

fn parse_time(value: &str, field: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), TIME_FORMAT).map_err(|_| {
        Error::Config(format!(
            "Invalid time format for {field}: {value}. Expected HH:MM format (e.g., 08:00)"
        ))
    })
}

impl ScheduleConfig {
    pub fn holiday_weekdays(&self) -> Result<Vec<Weekday>> {
        self.holiday_days
            .iter()
            .map(|day| {
                day.trim().parse::<Weekday>().map_err(|_| {
                    Error::Config(format!(
                        "Invalid holiday day: {day}. Must be one of Monday, Tuesday, Wednesday, Thursday, Friday, Saturday, Sunday"
                    ))
                })
            })
            .collect()
    }

    pub fn day_start(&self) -> Result<NaiveTime> {
        parse_time(&self.day_start_time, "day_start_time")
    }

    pub fn night_start(&self) -> Result<NaiveTime> {
        parse_time(&self.night_start_time, "night_start_time")
    }

    pub fn is_holiday(&self, weekday: Weekday) -> Result<bool> {
        Ok(self.holiday_weekdays()?.contains(&weekday))
    }

    /// Whether `now` falls in the light window. A window whose start is not
    /// before its end wraps around midnight.
    pub fn is_daytime(&self, now: NaiveTime) -> Result<bool> {
        let day_start = self.day_start()?;
        let night_start = self.night_start()?;

        if day_start < night_start {
            Ok(day_start <= now && now < night_start)
        } else {
            Ok(now >= day_start || now < night_start)
        }
    }

    fn validate(&self) -> Result<()> {
        self.holiday_weekdays()?;
        self.day_start()?;
        self.night_start()?;
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct ImageConfig {
    pub extensions: Vec<String>,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            extensions: vec![".png".to_string(), ".jpg".to_string(), ".jpeg".to_string()],
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_dir: PathBuf,
    pub log_level: String,
    /// Size at which `main.log` is rotated.
    pub max_size_mb: u64,
    /// Rotated files kept next to `main.log` (`main.log.1` is the newest).
    pub backup_count: usize,
}

fn default_data_path(name: &str) -> PathBuf {
    get_data_dir()
        .unwrap_or_else(|_| PathBuf::from(".wallpaperchanger"))
        .join(name)
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: default_data_path("logs"),
            log_level: "info".to_string(),
            max_size_mb: 1,
            backup_count: 3,
        }
    }
}

impl LoggingConfig {
    pub fn log_file(&self) -> PathBuf {
        self.log_dir.join("main.log")
    }

    pub fn max_size_bytes(&self) -> usize {
        usize::try_from(self.max_size_mb.saturating_mul(1024 * 1024)).unwrap_or(usize::MAX)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct StateTrackingConfig {
    pub enabled: bool,
    pub state_file: PathBuf,
    pub auto_cleanup: bool,
    pub max_age_days: u32,
}

impl Default for StateTrackingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            state_file: default_data_path("state.json"),
            auto_cleanup: false,
            max_age_days: 30,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct WallpaperConfig {
    pub directories: DirectoryConfig,
    pub schedule: ScheduleConfig,
    pub images: ImageConfig,
    pub logging: LoggingConfig,
    pub state_tracking: StateTrackingConfig,
}

impl WallpaperConfig {
    /// Parses a config document, expands `~` in its paths, normalizes the
    /// image extensions and validates the result.
    pub fn from_json(content: &str) -> Result<Self> {
        let mut config: Self =
            serde_json::from_str(content).map_err(|e| Error::Config(e.to_string()))?;

        config.directories.expand_paths();
        config.logging.log_dir = expand_path(&config.logging.log_dir);
        config.state_tracking.state_file = expand_path(&config.state_tracking.state_file);
        config.logging.log_level = config.logging.log_level.trim().to_lowercase();
        config.images.extensions = config
            .images
            .extensions
            .iter()
            .map(|ext| normalize_extension(ext))
            .filter(|ext| ext.len() > 1)
            .collect();

        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::Config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let content = read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn validate(&self) -> Result<()> {
        self.directories.validate()?;
        self.schedule.validate()?;

        if self.images.extensions.is_empty() {
            return Err(Error::Config(
                "At least one image extension is required".to_string(),
            ));
        }

        if !LOG_LEVELS.contains(&self.logging.log_level.as_str()) {
            return Err(Error::Config(format!(
                "Invalid log_level: {}. Must be one of {}",
                self.logging.log_level,
                LOG_LEVELS.join(", ")
            )));
        }

        if self.logging.max_size_mb == 0 {
            return Err(Error::Config(
                "logging.max_size_mb must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// A starting config with time-based directories under
    /// `~/Pictures/Wallpapers`.
    pub fn template() -> Self {
        let root = dirs::picture_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join("Pictures")))
            .unwrap_or_else(|| PathBuf::from("~/Pictures"))
            .join("Wallpapers");

        let themed = |day: &str| DayDirs {
            light: MonitorDirs {
                primary: Some(root.join(day).join("light")),
                left: None,
            },
            dark: MonitorDirs {
                primary: Some(root.join(day).join("dark")),
                left: None,
            },
            ..Default::default()
        };

        Self {
            directories: DirectoryConfig {
                workday: themed("workday"),
                holiday: themed("holiday"),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn create_default(path: &Path) -> Result<()> {
        Self::template().save(path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        ensure_parent_dir(path)?;
        let content =
            serde_json::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        write(path, content)?;
        Ok(())
    }
}
