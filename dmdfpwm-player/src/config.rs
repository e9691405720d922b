//! dmdfpwm-player configuration
//!
//! Loaded from TOML (see `dmdfpwm_common::config` for the file search
//! order). Every field has a built-in default so an absent or partial file
//! is valid. CLI flags are applied on top by the binary.
//!
//! ```toml
//! prefill_frames = 1
//! drain_timeout_ms = 10000
//! sinks = ["left", "right"]
//! output_dir = "/tmp/dmdfpwm"
//!
//! [channels]
//! left = ["left"]
//! right = ["right"]
//!
//! [http]
//! max_request_bytes = 1048576
//!
//! [logging]
//! level = "debug"
//! ```

use crate::error::{Error, Result};
use crate::playback::PlaybackSettings;
use crate::router::RoutingConfig;
use crate::sink::QueueSinkOptions;
use dmdfpwm_common::config::{load_toml, resolve_config_file, CONFIG_ENV_VAR};
use dmdfpwm_common::SourceOptions;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Player configuration file contents
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PlayerConfig {
    /// Time units queued on every sink before the barrier applies
    #[serde(default = "default_prefill_frames")]
    pub prefill_frames: u32,

    /// Barrier wait limit in milliseconds; 0 waits forever
    #[serde(default = "default_drain_timeout_ms")]
    pub drain_timeout_ms: u64,

    /// Positional routing for channels without a `[channels]` entry
    #[serde(default = "default_auto_detect")]
    pub auto_detect: bool,

    /// Sink ids to create, in discovery order; empty means one per channel
    #[serde(default)]
    pub sinks: Vec<String>,

    /// Directory receiving `<sink>.pcm` files; audio is discarded when unset
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Sink buffer size in time units
    #[serde(default = "default_sink_buffer_frames")]
    pub sink_buffer_frames: u32,

    /// Channel name → sink ids
    #[serde(default)]
    pub channels: BTreeMap<String, Vec<String>>,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote source settings
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct HttpConfig {
    /// Split range requests larger than this
    #[serde(default)]
    pub max_request_bytes: Option<u32>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Logging settings; `RUST_LOG` takes precedence
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
pub struct LoggingConfig {
    /// EnvFilter directive, e.g. `debug` or `dmdfpwm_player=trace`
    #[serde(default)]
    pub level: Option<String>,
}

fn default_prefill_frames() -> u32 {
    1
}

fn default_drain_timeout_ms() -> u64 {
    10_000
}

fn default_auto_detect() -> bool {
    true
}

fn default_sink_buffer_frames() -> u32 {
    2
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            max_request_bytes: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            prefill_frames: default_prefill_frames(),
            drain_timeout_ms: default_drain_timeout_ms(),
            auto_detect: default_auto_detect(),
            sinks: Vec::new(),
            output_dir: None,
            sink_buffer_frames: default_sink_buffer_frames(),
            channels: BTreeMap::new(),
            http: HttpConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl PlayerConfig {
    /// Resolve and load the config file, falling back to defaults
    ///
    /// # Errors
    /// `Error::Config` when a file exists but is unreadable, malformed or
    /// fails validation
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        let path = resolve_config_file(cli_path, CONFIG_ENV_VAR);
        let config: Self = load_toml(path.as_deref()).map_err(|e| match e {
            dmdfpwm_common::Error::Config(msg) => Error::Config(msg),
            other => Error::Container(other),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sink_buffer_frames == 0 {
            return Err(Error::Config(
                "sink_buffer_frames must be at least 1".to_string(),
            ));
        }
        if self.http.timeout_secs == 0 {
            return Err(Error::Config("http.timeout_secs must be at least 1".to_string()));
        }
        if self.http.max_request_bytes == Some(0) {
            return Err(Error::Config("http.max_request_bytes must not be 0".to_string()));
        }
        Ok(())
    }

    pub fn playback_settings(&self) -> PlaybackSettings {
        PlaybackSettings {
            prefill_frames: self.prefill_frames,
            drain_timeout: match self.drain_timeout_ms {
                0 => None,
                ms => Some(Duration::from_millis(ms)),
            },
        }
    }

    pub fn routing(&self) -> RoutingConfig {
        RoutingConfig {
            channels: self.channels.clone(),
            auto_detect: self.auto_detect,
        }
    }

    pub fn source_options(&self) -> SourceOptions {
        SourceOptions {
            max_request_bytes: self.http.max_request_bytes,
            request_timeout: Duration::from_secs(self.http.timeout_secs),
        }
    }

    /// Sink sizing for a track producing `samples_per_frame` samples per unit
    pub fn queue_options(&self, samples_per_frame: usize) -> QueueSinkOptions {
        QueueSinkOptions {
            capacity: samples_per_frame.max(1) * self.sink_buffer_frames as usize,
            ..QueueSinkOptions::default()
        }
    }

    /// Sink ids to create for a track with `channel_count` channels
    pub fn sink_ids(&self, channel_count: usize) -> Vec<String> {
        if self.sinks.is_empty() {
            (1..=channel_count).map(|i| format!("sink-{}", i)).collect()
        } else {
            self.sinks.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = PlayerConfig::default();
        assert_eq!(config.playback_settings(), PlaybackSettings::default());
        assert!(config.routing().auto_detect);
        assert_eq!(config.sink_ids(2), vec!["sink-1", "sink-2"]);
        assert_eq!(config.queue_options(48_000).capacity, 96_000);
    }

    #[test]
    fn test_load_full_file() {
        let file = write_config(
            r#"
            prefill_frames = 3
            drain_timeout_ms = 0
            auto_detect = false
            sinks = ["left", "right"]
            output_dir = "/tmp/out"

            [channels]
            L = ["left"]
            R = ["right", "left"]

            [http]
            max_request_bytes = 4096
            timeout_secs = 5

            [logging]
            level = "debug"
            "#,
        );

        let config = PlayerConfig::load(Some(file.path())).unwrap();
        let settings = config.playback_settings();
        assert_eq!(settings.prefill_frames, 3);
        assert_eq!(settings.drain_timeout, None);

        let routing = config.routing();
        assert!(!routing.auto_detect);
        assert_eq!(routing.channels["R"], vec!["right", "left"]);

        let options = config.source_options();
        assert_eq!(options.max_request_bytes, Some(4096));
        assert_eq!(options.request_timeout, Duration::from_secs(5));

        assert_eq!(config.sink_ids(4), vec!["left", "right"]);
        assert_eq!(config.output_dir, Some(PathBuf::from("/tmp/out")));
        assert_eq!(config.logging.level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file = write_config("prefill_frames = 2\n");
        let config = PlayerConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.prefill_frames, 2);
        assert_eq!(config.drain_timeout_ms, 10_000);
        assert_eq!(config.http.timeout_secs, 30);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = PlayerConfig::load(Some(Path::new("/nonexistent/dmdfpwm.toml"))).unwrap();
        assert_eq!(config, PlayerConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let file = write_config("sink_buffer_frames = 0\n");
        assert!(matches!(
            PlayerConfig::load(Some(file.path())),
            Err(Error::Config(_))
        ));

        let file = write_config("prefill_frames = \"many\"\n");
        assert!(matches!(
            PlayerConfig::load(Some(file.path())),
            Err(Error::Config(_))
        ));
    }
}
