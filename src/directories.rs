//! Layered wallpaper directory configuration and its resolution.
//!
//! Directories are configured in three tiers, most specific first:
//! time-based (`workday.light.primary`, ...), simple work/holiday
//! (`workday.primary`, ...) and basic (`primary`, `left`, `sunday`).
//! [`DirectoryConfig::resolve`] walks the tiers in order and returns the
//! first one that yields a primary directory.

use crate::utils::expand_path;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A primary directory with an optional left-monitor sibling.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct MonitorDirs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left: Option<PathBuf>,
}

/// Directories for one kind of day (workday or holiday).
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct DayDirs {
    pub light: MonitorDirs,
    pub dark: MonitorDirs,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left: Option<PathBuf>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct DirectoryConfig {
    pub workday: DayDirs,
    pub holiday: DayDirs,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sunday: Option<PathBuf>,
}

/// The concrete directories to draw from for one (holiday, daytime) context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedDirectories {
    pub primary: PathBuf,
    pub left: Option<PathBuf>,
}

impl ResolvedDirectories {
    fn new(primary: &Path, left: Option<&PathBuf>) -> Self {
        Self {
            primary: primary.to_path_buf(),
            left: left.cloned(),
        }
    }

    /// Even monitor indices use `primary`, odd ones use `left` when it is set.
    pub fn for_monitor(&self, index: usize) -> &Path {
        match &self.left {
            Some(left) if index % 2 == 1 => left.as_path(),
            _ => self.primary.as_path(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolutionRule {
    TimeBased,
    WorkHoliday,
    Basic,
}

pub const RESOLUTION_ORDER: [ResolutionRule; 3] = [
    ResolutionRule::TimeBased,
    ResolutionRule::WorkHoliday,
    ResolutionRule::Basic,
];

impl ResolutionRule {
    pub fn apply(
        self,
        dirs: &DirectoryConfig,
        is_holiday: bool,
        is_daytime: bool,
    ) -> Option<ResolvedDirectories> {
        let day = if is_holiday {
            &dirs.holiday
        } else {
            &dirs.workday
        };

        match self {
            ResolutionRule::TimeBased => {
                let theme = if is_daytime { &day.light } else { &day.dark };
                theme
                    .primary
                    .as_deref()
                    .map(|primary| ResolvedDirectories::new(primary, theme.left.as_ref()))
            }
            ResolutionRule::WorkHoliday => day
                .primary
                .as_deref()
                .map(|primary| ResolvedDirectories::new(primary, day.left.as_ref())),
            ResolutionRule::Basic => {
                if is_holiday {
                    if let Some(sunday) = dirs.sunday.as_deref() {
                        return Some(ResolvedDirectories::new(sunday, None));
                    }
                }
                dirs.primary
                    .as_deref()
                    .map(|primary| ResolvedDirectories::new(primary, dirs.left.as_ref()))
            }
        }
    }
}

impl DirectoryConfig {
    pub fn resolve(&self, is_holiday: bool, is_daytime: bool) -> Result<ResolvedDirectories> {
        RESOLUTION_ORDER
            .iter()
            .find_map(|rule| rule.apply(self, is_holiday, is_daytime))
            .ok_or_else(|| Error::Config("No valid wallpaper directories configured".to_string()))
    }

    /// Every configured directory with a human readable label, tier by tier.
    pub fn entries(&self) -> Vec<(&'static str, &Path)> {
        let slots: [(&'static str, &Option<PathBuf>); 15] = [
            ("Workday Light Primary", &self.workday.light.primary),
            ("Workday Light Left", &self.workday.light.left),
            ("Workday Dark Primary", &self.workday.dark.primary),
            ("Workday Dark Left", &self.workday.dark.left),
            ("Holiday Light Primary", &self.holiday.light.primary),
            ("Holiday Light Left", &self.holiday.light.left),
            ("Holiday Dark Primary", &self.holiday.dark.primary),
            ("Holiday Dark Left", &self.holiday.dark.left),
            ("Workday Primary", &self.workday.primary),
            ("Workday Left", &self.workday.left),
            ("Holiday Primary", &self.holiday.primary),
            ("Holiday Left", &self.holiday.left),
            ("Primary", &self.primary),
            ("Left", &self.left),
            ("Sunday", &self.sunday),
        ];

        slots
            .into_iter()
            .filter_map(|(label, path)| path.as_deref().map(|p| (label, p)))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    fn paths_mut(&mut self) -> [&mut Option<PathBuf>; 15] {
        [
            &mut self.workday.light.primary,
            &mut self.workday.light.left,
            &mut self.workday.dark.primary,
            &mut self.workday.dark.left,
            &mut self.holiday.light.primary,
            &mut self.holiday.light.left,
            &mut self.holiday.dark.primary,
            &mut self.holiday.dark.left,
            &mut self.workday.primary,
            &mut self.workday.left,
            &mut self.holiday.primary,
            &mut self.holiday.left,
            &mut self.primary,
            &mut self.left,
            &mut self.sunday,
        ]
    }

    pub fn expand_paths(&mut self) {
        for slot in self.paths_mut() {
            if let Some(path) = slot.as_mut() {
                *path = expand_path(path);
            }
        }
    }

    /// Fails when nothing is configured or a configured path is not a
    /// directory. Missing directories are only logged.
    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(Error::Config(
                "No valid wallpaper directories configured. At least one directory configuration is required."
                    .to_string(),
            ));
        }

        for (label, path) in self.entries() {
            if !path.exists() {
                tracing::warn!("Directory does not exist: {} ({})", path.display(), label);
            } else if !path.is_dir() {
                return Err(Error::Config(format!(
                    "Path is not a directory: {} ({})",
                    path.display(),
                    label
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> Option<PathBuf> {
        Some(PathBuf::from(s))
    }

    fn full_config() -> DirectoryConfig {
        DirectoryConfig {
            workday: DayDirs {
                light: MonitorDirs {
                    primary: p("/w/light/primary"),
                    left: p("/w/light/left"),
                },
                dark: MonitorDirs {
                    primary: p("/w/dark/primary"),
                    left: None,
                },
                primary: p("/w/primary"),
                left: p("/w/left"),
            },
            holiday: DayDirs {
                light: MonitorDirs {
                    primary: p("/h/light/primary"),
                    left: None,
                },
                dark: MonitorDirs::default(),
                primary: p("/h/primary"),
                left: None,
            },
            primary: p("/basic/primary"),
            left: p("/basic/left"),
            sunday: p("/basic/sunday"),
        }
    }

    #[test]
    fn time_based_tier_wins_when_configured() {
        let resolved = full_config().resolve(false, true).unwrap();
        assert_eq!(resolved.primary, PathBuf::from("/w/light/primary"));
        assert_eq!(resolved.left, p("/w/light/left"));

        let resolved = full_config().resolve(false, false).unwrap();
        assert_eq!(resolved.primary, PathBuf::from("/w/dark/primary"));
        assert_eq!(resolved.left, None);
    }

    #[test]
    fn light_and_dark_resolve_independently() {
        // holiday has light but no dark: night falls through to the simple tier
        let config = full_config();
        assert_eq!(
            config.resolve(true, true).unwrap().primary,
            PathBuf::from("/h/light/primary")
        );
        assert_eq!(
            config.resolve(true, false).unwrap().primary,
            PathBuf::from("/h/primary")
        );
    }

    #[test]
    fn simple_tier_only_resolves_both_contexts() {
        let config = DirectoryConfig {
            workday: DayDirs {
                primary: p("/work"),
                left: p("/work-left"),
                ..Default::default()
            },
            holiday: DayDirs {
                primary: p("/holiday"),
                ..Default::default()
            },
            ..Default::default()
        };

        let workday = config.resolve(false, true).unwrap();
        assert_eq!(workday.primary, PathBuf::from("/work"));
        assert_eq!(workday.left, p("/work-left"));

        let holiday = config.resolve(true, false).unwrap();
        assert_eq!(holiday.primary, PathBuf::from("/holiday"));
        assert_eq!(holiday.left, None);
    }

    #[test]
    fn basic_tier_uses_sunday_on_holidays() {
        let config = DirectoryConfig {
            primary: p("/primary"),
            left: p("/left"),
            sunday: p("/sunday"),
            ..Default::default()
        };

        let holiday = config.resolve(true, true).unwrap();
        assert_eq!(holiday.primary, PathBuf::from("/sunday"));
        assert_eq!(holiday.left, None);

        let workday = config.resolve(false, true).unwrap();
        assert_eq!(workday.primary, PathBuf::from("/primary"));
        assert_eq!(workday.left, p("/left"));
    }

    #[test]
    fn basic_tier_holiday_without_sunday_falls_back_to_primary() {
        let config = DirectoryConfig {
            primary: p("/primary"),
            ..Default::default()
        };
        assert_eq!(
            config.resolve(true, false).unwrap().primary,
            PathBuf::from("/primary")
        );
    }

    #[test]
    fn empty_config_is_a_configuration_error() {
        let err = DirectoryConfig::default().resolve(false, true).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(DirectoryConfig::default().validate().is_err());
    }

    #[test]
    fn only_sunday_configured_fails_on_workdays() {
        let config = DirectoryConfig {
            sunday: p("/sunday"),
            ..Default::default()
        };
        assert!(config.resolve(true, true).is_ok());
        assert!(config.resolve(false, true).is_err());
    }

    #[test]
    fn for_monitor_alternates_when_left_is_set() {
        let resolved = ResolvedDirectories {
            primary: PathBuf::from("/primary"),
            left: p("/left"),
        };
        assert_eq!(resolved.for_monitor(0), Path::new("/primary"));
        assert_eq!(resolved.for_monitor(1), Path::new("/left"));
        assert_eq!(resolved.for_monitor(2), Path::new("/primary"));

        let single = ResolvedDirectories {
            primary: PathBuf::from("/primary"),
            left: None,
        };
        assert_eq!(single.for_monitor(1), Path::new("/primary"));
    }

    #[test]
    fn validate_rejects_file_configured_as_directory() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("not-a-dir.jpg");
        std::fs::write(&file, b"x").unwrap();

        let config = DirectoryConfig {
            primary: Some(file),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn validate_tolerates_missing_directories() {
        let temp = tempfile::tempdir().unwrap();
        let config = DirectoryConfig {
            primary: Some(temp.path().join("not-created-yet")),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn deserializes_nested_layout() {
        let json = r#"{
            "workday": { "dark": { "primary": "/w/dark" } },
            "sunday": "/sun"
        }"#;
        let config: DirectoryConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.workday.dark.primary, p("/w/dark"));
        assert_eq!(config.sunday, p("/sun"));
        assert_eq!(config.entries().len(), 2);
    }
}
