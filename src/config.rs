//! Configuration for the head process.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration for the head process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Debounce and idle windows
    pub timings: Timings,

    /// Bus topic names
    pub topics: Topics,

    /// Payload tokens sent to the actuators
    pub cues: Cues,

    /// Log filter used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timings: Timings::default(),
            topics: Topics::default(),
            cues: Cues::default(),
            log_filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, falling back to defaults if it is missing.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("friend-head")
            .join("config.json")
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in self.timings.named() {
            if value.is_zero() {
                return Err(ConfigError::Invalid(format!("timings.{name} must be non-zero")));
            }
        }
        for (name, topic) in self.topics.named() {
            if topic.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("topics.{name} must not be empty")));
            }
        }
        let t = &self.topics;
        if t.touch == t.radar || t.touch == t.sleep || t.radar == t.sleep {
            return Err(ConfigError::Invalid(
                "touch, radar and sleep topics must be distinct".to_string(),
            ));
        }
        Ok(())
    }
}

/// Debounce and idle windows. Serialized as integer milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    /// How long touch must stay released before the attention expression ends
    #[serde(with = "millis_serde")]
    pub touch_release: Duration,

    /// How long proximity must stay clear before it is dropped
    #[serde(with = "millis_serde")]
    pub radar_clear: Duration,

    /// Cooldown after the attention expression ends during which proximity
    /// may not change the face
    #[serde(with = "millis_serde")]
    pub radar_cooldown: Duration,

    /// No-engagement window before the head goes to sleep
    #[serde(with = "millis_serde")]
    pub idle_timeout: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            touch_release: Duration::from_secs(3),
            radar_clear: Duration::from_secs(3),
            radar_cooldown: Duration::from_secs(3),
            idle_timeout: Duration::from_secs(180),
        }
    }
}

impl Timings {
    fn named(&self) -> [(&'static str, Duration); 4] {
        [
            ("touch_release", self.touch_release),
            ("radar_clear", self.radar_clear),
            ("radar_cooldown", self.radar_cooldown),
            ("idle_timeout", self.idle_timeout),
        ]
    }
}

/// Bus topics consumed and published by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Topics {
    pub touch: String,
    pub radar: String,
    pub sleep: String,
    pub haptic: String,
    pub servo: String,
    pub screen: String,
    pub sound: String,
}

impl Default for Topics {
    fn default() -> Self {
        Self {
            touch: "/touch".to_string(),
            radar: "/radar".to_string(),
            sleep: "/sleep".to_string(),
            haptic: "/haptic".to_string(),
            servo: "/servo".to_string(),
            screen: "/screen".to_string(),
            sound: "/sound".to_string(),
        }
    }
}

impl Topics {
    fn named(&self) -> [(&'static str, &str); 7] {
        [
            ("touch", &self.touch),
            ("radar", &self.radar),
            ("sleep", &self.sleep),
            ("haptic", &self.haptic),
            ("servo", &self.servo),
            ("screen", &self.screen),
            ("sound", &self.sound),
        ]
    }
}

/// Payload tokens understood by the servo, screen and sound collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cues {
    pub ear_attention: String,
    pub ear_neutral: String,
    pub face_attention: String,
    pub face_proximity: String,
    pub face_normal: String,
    pub sound_attention: String,
}

impl Default for Cues {
    fn default() -> Self {
        Self {
            ear_attention: "ear1".to_string(),
            ear_neutral: "ear0".to_string(),
            face_attention: "happy".to_string(),
            face_proximity: "dizzy".to_string(),
            face_normal: "normal".to_string(),
            sound_attention: "meow".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(serde_json::Error),
    #[error("Serialize error: {0}")]
    Serialize(serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Serde support for Duration as whole milliseconds.
mod millis_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
