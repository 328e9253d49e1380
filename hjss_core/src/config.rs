//! Configuration file support for HJSS.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/hjss/config.toml`.

use crate::scheduler::{DateWindow, RandomAssignment, RotatingAssignment, WeeklyTemplate};
use crate::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub schedule: WeeklyTemplate,

    #[serde(default)]
    pub lessons: LessonsConfig,

    #[serde(default)]
    pub window: WindowConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Lesson staffing configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LessonsConfig {
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    #[serde(default = "default_coaches")]
    pub coaches: Vec<String>,
}

impl Default for LessonsConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            coaches: default_coaches(),
        }
    }
}

/// How many weeks of lessons to generate around today
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_weeks_before")]
    pub weeks_before: u32,

    #[serde(default = "default_weeks_after")]
    pub weeks_after: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            weeks_before: default_weeks_before(),
            weeks_after: default_weeks_after(),
        }
    }
}

// Default value functions
fn home_or(fallback: &str) -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(fallback)
}

fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| home_or(".local/share"));
    base.join("hjss")
}

fn default_capacity() -> usize {
    4
}

fn default_coaches() -> Vec<String> {
    ["Mason", "Ava", "Liam", "Zoe", "Ethan", "Mia", "Logan", "Ella"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_weeks_before() -> u32 {
    4
}

fn default_weeks_after() -> u32 {
    2
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;

        let problems = config.validate();
        if !problems.is_empty() {
            return Err(Error::Config(problems.join("; ")));
        }

        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| home_or(".config"));
        base.join("hjss").join("config.toml")
    }

    /// Check settings that serde cannot, returning every problem found
    pub fn validate(&self) -> Vec<String> {
        let mut problems = self.schedule.validate();
        if self.lessons.capacity == 0 {
            problems.push("lessons.capacity must be at least 1".into());
        }
        if self.lessons.coaches.iter().all(|c| c.trim().is_empty()) {
            problems.push("lessons.coaches must name at least one coach".into());
        }
        problems
    }

    /// The generation window around `today`
    pub fn window_around(&self, today: NaiveDate) -> Result<DateWindow> {
        DateWindow::around(today, self.window.weeks_before, self.window.weeks_after)
    }

    /// Random coach/grade assignment using the configured staff
    pub fn random_assignment(&self, seed: Option<u64>) -> Result<RandomAssignment> {
        RandomAssignment::new(self.lessons.coaches.clone(), self.lessons.capacity, seed)
    }

    /// Round-robin coach/grade assignment using the configured staff
    pub fn rotating_assignment(&self) -> Result<RotatingAssignment> {
        RotatingAssignment::new(self.lessons.coaches.clone(), self.lessons.capacity)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.lessons.capacity, 4);
        assert_eq!(config.lessons.coaches.len(), 8);
        assert_eq!(config.window.weeks_before, 4);
        assert_eq!(config.window.weeks_after, 2);
        assert_eq!(config.schedule.days.len(), 4);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.schedule, parsed.schedule);
        assert_eq!(config.lessons.coaches, parsed.lessons.coaches);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[lessons]
capacity = 6

[window]
weeks_after = 8
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.lessons.capacity, 6);
        assert_eq!(config.lessons.coaches.len(), 8); // default
        assert_eq!(config.window.weeks_before, 4); // default
        assert_eq!(config.window.weeks_after, 8);
        assert_eq!(config.schedule.days[0].weekday, Weekday::Mon);
    }

    #[test]
    fn test_invalid_config_rejected_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[lessons]\ncapacity = 0\ncoaches = []\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        match err {
            Error::Config(msg) => {
                assert!(msg.contains("capacity"));
                assert!(msg.contains("coaches"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_oversized_schedule_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[schedule]\nlesson_minutes = 4294967295\n\n[[schedule.days]]\nweekday = \"Mon\"\nsessions = 4294967295\nfirst_start = \"16:00:00\"\n",
        )
        .unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("past midnight")));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");

        let mut config = Config::default();
        config.lessons.coaches = vec!["Zoe".into()];
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.lessons.coaches, vec!["Zoe".to_string()]);
    }
}
