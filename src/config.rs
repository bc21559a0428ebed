//! Configuration loading and management

use std::num::{NonZeroU32, NonZeroU64};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::state::ControllerSettings;

const DEFAULT_API_URL: &str = "http://10.0.2.2:8080";
const DEFAULT_WPM: u32 = 20;
const DEFAULT_SAMPLE_TIMEOUT_MS: u64 = 3000;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the Unix domain socket for IPC
    pub socket_path: PathBuf,

    /// Directory for runtime data
    pub data_dir: PathBuf,

    /// Base URL of the image classifier
    pub api_url: String,

    /// File the camera layer keeps overwriting with the latest frame
    pub frame_path: PathBuf,

    /// Morse playback speed
    pub speed_wpm: NonZeroU32,

    /// Upper bound for one classifier round-trip
    pub sample_timeout: Duration,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup
    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = match lookup("HAPTIC_MORSE_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => {
                let home = lookup("HOME").context("HOME is not set")?;
                PathBuf::from(home)
                    .join(".local")
                    .join("share")
                    .join("haptic-morse")
            }
        };

        let socket_path = lookup("HAPTIC_MORSE_SOCKET")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("daemon.sock"));

        let frame_path = lookup("HAPTIC_MORSE_FRAME_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("frame.jpg"));

        let api_url = lookup("HAPTIC_MORSE_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let wpm: u32 = parse_var(&lookup, "HAPTIC_MORSE_WPM")?.unwrap_or(DEFAULT_WPM);
        let speed_wpm = NonZeroU32::new(wpm).context("HAPTIC_MORSE_WPM must be greater than zero")?;

        let timeout_ms: u64 =
            parse_var(&lookup, "HAPTIC_MORSE_SAMPLE_TIMEOUT_MS")?.unwrap_or(DEFAULT_SAMPLE_TIMEOUT_MS);
        let timeout_ms = NonZeroU64::new(timeout_ms)
            .context("HAPTIC_MORSE_SAMPLE_TIMEOUT_MS must be greater than zero")?;

        Ok(Self {
            socket_path,
            data_dir,
            api_url,
            frame_path,
            speed_wpm,
            sample_timeout: Duration::from_millis(timeout_ms.get()),
        })
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("failed to create {}", self.data_dir.display()))?;
        Ok(())
    }

    /// Controller timing derived from this configuration
    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            speed_wpm: self.speed_wpm,
            sample_timeout: self.sample_timeout,
            ..ControllerSettings::default()
        }
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("invalid value for {key}: {raw:?}"))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load_with(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_under_home() {
        let config = load_with(&[("HOME", "/home/tester")]).unwrap();
        assert_eq!(
            config.socket_path,
            PathBuf::from("/home/tester/.local/share/haptic-morse/daemon.sock")
        );
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.speed_wpm.get(), 20);
        assert_eq!(config.sample_timeout, Duration::from_secs(3));
        assert!(config.frame_path.ends_with("frame.jpg"));
    }

    #[test]
    fn test_overrides() {
        let config = load_with(&[
            ("HAPTIC_MORSE_DATA_DIR", "/tmp/hm"),
            ("HAPTIC_MORSE_API_URL", "http://192.168.1.20:8080"),
            ("HAPTIC_MORSE_WPM", " 13 "),
            ("HAPTIC_MORSE_SAMPLE_TIMEOUT_MS", "1500"),
        ])
        .unwrap();

        assert_eq!(config.socket_path, PathBuf::from("/tmp/hm/daemon.sock"));
        assert_eq!(config.api_url, "http://192.168.1.20:8080");

        let settings = config.controller_settings();
        assert_eq!(settings.speed_wpm.get(), 13);
        assert_eq!(settings.sample_timeout, Duration::from_millis(1500));
        assert_eq!(settings.hold_threshold, Duration::from_millis(250));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(load_with(&[("HOME", "/h"), ("HAPTIC_MORSE_WPM", "0")]).is_err());
        assert!(load_with(&[("HOME", "/h"), ("HAPTIC_MORSE_WPM", "fast")]).is_err());
        assert!(load_with(&[("HOME", "/h"), ("HAPTIC_MORSE_SAMPLE_TIMEOUT_MS", "0")]).is_err());
        assert!(load_with(&[]).is_err());
    }
}
