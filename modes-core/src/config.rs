//! Configuration file management for modes-decode.
//!
//! Reads/writes `~/.modes-decode/config.yaml`: receiver location, track
//! history and eviction, pipeline sizing, and the checksum policy. The file
//! is a flat two-level YAML subset parsed by hand.

use std::path::{Path, PathBuf};

use chrono::Duration;

use crate::crc::ChecksumPolicy;
use crate::tracker::{TrackerConfig, DEFAULT_HISTORY_CAP, DEFAULT_STALE_SECS};
use crate::types::{ModesError, Result};

/// Full configuration structure.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub receiver: ReceiverConfig,
    pub tracking: TrackingConfig,
    pub pipeline: PipelineConfig,
    pub decode: DecodeConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReceiverConfig {
    pub name: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackingConfig {
    /// Positions kept per aircraft, 0 for unbounded.
    pub history_cap: usize,
    pub stale_after_secs: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub workers: usize,
    pub queue_capacity: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodeConfig {
    pub checksum: ChecksumPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            receiver: ReceiverConfig {
                name: "default".into(),
                lat: None,
                lon: None,
            },
            tracking: TrackingConfig {
                history_cap: DEFAULT_HISTORY_CAP,
                stale_after_secs: DEFAULT_STALE_SECS,
            },
            pipeline: PipelineConfig {
                workers: 5,
                queue_capacity: 1000,
            },
            decode: DecodeConfig {
                checksum: ChecksumPolicy::default(),
            },
        }
    }
}

impl Config {
    /// Receiver position when both coordinates are set.
    pub fn receiver_position(&self) -> Option<(f64, f64)> {
        Some((self.receiver.lat?, self.receiver.lon?))
    }

    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            history_cap: self.tracking.history_cap,
            stale_after: Duration::seconds(self.tracking.stale_after_secs),
            receiver: self.receiver_position(),
        }
    }
}

/// Get the config directory path (`~/.modes-decode/`).
pub fn config_dir() -> PathBuf {
    dirs_home().join(".modes-decode")
}

/// Get the config file path.
pub fn config_file() -> PathBuf {
    config_dir().join("config.yaml")
}

fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Load config from `~/.modes-decode/config.yaml`.
///
/// Returns the default config if the file doesn't exist.
pub fn load_config() -> Result<Config> {
    load_config_from(&config_file())
}

pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let text = std::fs::read_to_string(path)?;
    parse_config(&text)
}

/// Save config to `~/.modes-decode/config.yaml`.
pub fn save_config(config: &Config) -> Result<PathBuf> {
    let path = config_file();
    save_config_to(config, &path)?;
    Ok(path)
}

pub fn save_config_to(config: &Config, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(path, serialize_config(config))?;
    Ok(())
}

/// Parse simple YAML-like config text. Unknown sections and keys are
/// skipped; a known key with an unusable value is an error.
pub fn parse_config(text: &str) -> Result<Config> {
    let mut config = Config::default();
    let mut current_section: Option<&str> = None;

    for (n, line) in text.lines().enumerate() {
        let stripped = line.trim();
        if stripped.is_empty() || stripped.starts_with('#') {
            continue;
        }

        let is_indented = line.starts_with("  ") || line.starts_with('\t');
        let Some((key, val)) = stripped.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let val = val.trim();

        if !is_indented {
            current_section = val.is_empty().then_some(key);
            continue;
        }
        let Some(section) = current_section else {
            continue;
        };

        let bad = || {
            ModesError::Config(format!(
                "line {}: invalid value for {section}.{key}: {val:?}",
                n + 1
            ))
        };
        match (section, key) {
            ("receiver", "name") => {
                if let Some(v) = parse_string_value(val) {
                    config.receiver.name = v;
                }
            }
            ("receiver", "lat") => config.receiver.lat = parse_optional(val).map_err(|_| bad())?,
            ("receiver", "lon") => config.receiver.lon = parse_optional(val).map_err(|_| bad())?,
            ("tracking", "history_cap") => {
                config.tracking.history_cap = val.parse().map_err(|_| bad())?
            }
            ("tracking", "stale_after_secs") => {
                config.tracking.stale_after_secs = val.parse().map_err(|_| bad())?
            }
            ("pipeline", "workers") => {
                config.pipeline.workers = parse_positive(val).ok_or_else(bad)?
            }
            ("pipeline", "queue_capacity") => {
                config.pipeline.queue_capacity = parse_positive(val).ok_or_else(bad)?
            }
            ("decode", "checksum") => {
                let policy = parse_string_value(val).and_then(|v| ChecksumPolicy::parse(&v));
                config.decode.checksum = policy.ok_or_else(bad)?;
            }
            _ => {}
        }
    }

    Ok(config)
}

fn parse_string_value(val: &str) -> Option<String> {
    if val == "null" || val == "~" || val.is_empty() {
        return None;
    }
    // Strip quotes
    if val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')))
    {
        return Some(val[1..val.len() - 1].to_string());
    }
    Some(val.to_string())
}

fn parse_positive(val: &str) -> Option<usize> {
    val.parse::<usize>().ok().filter(|&n| n > 0)
}

fn parse_optional(val: &str) -> std::result::Result<Option<f64>, std::num::ParseFloatError> {
    if val == "null" || val == "~" || val.is_empty() {
        return Ok(None);
    }
    val.parse().map(Some)
}

/// Serialize config to YAML-like text.
pub fn serialize_config(config: &Config) -> String {
    let mut lines = vec!["# modes-decode configuration".to_string(), String::new()];

    let opt = |v: Option<f64>| v.map_or_else(|| "null".to_string(), |v| v.to_string());

    lines.push("receiver:".into());
    lines.push(format!("  name: \"{}\"", config.receiver.name));
    lines.push(format!("  lat: {}", opt(config.receiver.lat)));
    lines.push(format!("  lon: {}", opt(config.receiver.lon)));
    lines.push(String::new());

    lines.push("tracking:".into());
    lines.push(format!("  history_cap: {}", config.tracking.history_cap));
    lines.push(format!("  stale_after_secs: {}", config.tracking.stale_after_secs));
    lines.push(String::new());

    lines.push("pipeline:".into());
    lines.push(format!("  workers: {}", config.pipeline.workers));
    lines.push(format!("  queue_capacity: {}", config.pipeline.queue_capacity));
    lines.push(String::new());

    lines.push("decode:".into());
    lines.push(format!("  checksum: {}", config.decode.checksum.as_str()));

    lines.join("\n") + "\n"
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.receiver.name, "default");
        assert_eq!(config.tracking.history_cap, 10);
        assert_eq!(config.tracking.stale_after_secs, 300);
        assert_eq!(config.pipeline.workers, 5);
        assert_eq!(config.pipeline.queue_capacity, 1000);
        assert_eq!(config.decode.checksum, ChecksumPolicy::Ignore);
        assert!(config.receiver_position().is_none());
    }

    #[test]
    fn test_parse_config() {
        let text = r#"
receiver:
  name: "mystation"
  lat: -31.95
  lon: 115.86

tracking:
  history_cap: 0
  stale_after_secs: 120

pipeline:
  workers: 8
  queue_capacity: 64

decode:
  checksum: enforce
"#;
        let config = parse_config(text).unwrap();
        assert_eq!(config.receiver.name, "mystation");
        assert_eq!(config.receiver_position(), Some((-31.95, 115.86)));
        assert_eq!(config.tracking.history_cap, 0);
        assert_eq!(config.pipeline.workers, 8);
        assert_eq!(config.pipeline.queue_capacity, 64);
        assert_eq!(config.decode.checksum, ChecksumPolicy::Enforce);

        let tracker = config.tracker_config();
        assert_eq!(tracker.stale_after, Duration::seconds(120));
        assert_eq!(tracker.receiver, Some((-31.95, 115.86)));
    }

    #[test]
    fn test_parse_config_null_values() {
        let text = r#"
receiver:
  name: "test"
  lat: null
  lon: ~
"#;
        let config = parse_config(text).unwrap();
        assert!(config.receiver.lat.is_none());
        assert!(config.receiver.lon.is_none());
    }

    #[test]
    fn test_parse_config_unknown_keys_skipped() {
        let text = "database:\n  path: x.db\nreceiver:\n  colour: blue\n  name: r1\n";
        let config = parse_config(text).unwrap();
        assert_eq!(config.receiver.name, "r1");
    }

    #[test]
    fn test_parse_config_invalid_values() {
        for text in [
            "pipeline:\n  workers: 0\n",
            "pipeline:\n  workers: many\n",
            "decode:\n  checksum: strict\n",
            "receiver:\n  lat: north\n",
        ] {
            let err = parse_config(text).unwrap_err();
            assert!(matches!(err, ModesError::Config(_)), "{text:?} gave {err}");
        }
    }

    #[test]
    fn test_roundtrip() {
        let mut config = Config::default();
        config.receiver.name = "test".into();
        config.receiver.lat = Some(35.5);
        config.receiver.lon = Some(-82.5);
        config.tracking.history_cap = 25;
        config.decode.checksum = ChecksumPolicy::Enforce;
        let parsed = parse_config(&serialize_config(&config)).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        let mut config = Config::default();
        config.pipeline.workers = 3;
        save_config_to(&config, &path).unwrap();
        assert_eq!(load_config_from(&path).unwrap(), config);

        let missing = dir.path().join("absent.yaml");
        assert_eq!(load_config_from(&missing).unwrap(), Config::default());
    }
}
