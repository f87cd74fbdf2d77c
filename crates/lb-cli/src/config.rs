//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the JSON file holding the journal entries.
    pub entries_path: PathBuf,

    /// IANA zone used for calendar days. Defaults to the system zone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<Tz>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("entries_path", &self.entries_path)
            .field("zone", &self.zone.map(Tz::name))
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            entries_path: data_dir.join("entries.json"),
            zone: None,
        }
    }
}

impl Config {
    /// Loads configuration from the default locations, then optionally a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // LB_ENTRIES_PATH, LB_ZONE
        figment = figment.merge(Env::prefixed("LB_"));

        figment.extract()
    }

    /// The configured zone, or the system zone, or UTC.
    pub fn zone(&self) -> Tz {
        self.zone.unwrap_or_else(system_zone)
    }
}

fn system_zone() -> Tz {
    iana_time_zone::get_timezone()
        .ok()
        .and_then(|name| name.parse().ok())
        .unwrap_or(Tz::UTC)
}

/// Returns the platform-specific config directory for lb.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("lb"))
}

/// Returns the platform-specific data directory for lb.
///
/// On Linux: `~/.local/share/lb`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("lb"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirs_data_path_ends_with_lb() {
        let path = dirs_data_path().unwrap();
        assert_eq!(path.file_name().unwrap(), "lb");
    }

    #[test]
    fn test_default_config_uses_data_dir_for_entries() {
        let config = Config::default();
        let data_dir = dirs_data_path().unwrap();
        assert_eq!(config.entries_path, data_dir.join("entries.json"));
        assert!(config.zone.is_none());
    }

    #[test]
    fn test_explicit_zone_wins() {
        let config = Config {
            zone: Some(chrono_tz::Europe::Berlin),
            ..Config::default()
        };
        assert_eq!(config.zone(), chrono_tz::Europe::Berlin);
    }

    #[test]
    fn test_config_file_sets_zone_and_path() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            "entries_path = \"/tmp/journal.json\"\nzone = \"America/New_York\"\n",
        )
        .unwrap();

        let config = Config::load_from(Some(&path)).unwrap();

        assert_eq!(config.entries_path, PathBuf::from("/tmp/journal.json"));
        assert_eq!(config.zone, Some(chrono_tz::America::New_York));
    }

    #[test]
    fn test_config_file_rejects_unknown_zone() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "zone = \"Mars/Olympus_Mons\"\n").unwrap();

        assert!(Config::load_from(Some(&path)).is_err());
    }
}
