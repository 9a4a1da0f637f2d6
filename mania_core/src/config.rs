use std::{fs, path::Path};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::chart::LANES;
use crate::error::ConfigError;
use crate::time::Millis;

/// Platform input code bound to a column. Codes follow the host toolkit's key numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyCode(pub u32);

/// Absolute time-difference bands in ms, strictly increasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JudgeWindow {
    pub perfect: Millis,
    pub great: Millis,
    pub good: Millis,
    pub miss: Millis,
}

impl Default for JudgeWindow {
    fn default() -> Self {
        Self {
            perfect: 40,
            great: 80,
            good: 120,
            miss: 150,
        }
    }
}

impl JudgeWindow {
    pub fn new(perfect: Millis, great: Millis, good: Millis, miss: Millis) -> Result<Self, ConfigError> {
        let window = Self {
            perfect,
            great,
            good,
            miss,
        };
        window.validate()?;
        Ok(window)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let ordered = 0 <= self.perfect
            && self.perfect < self.great
            && self.great < self.good
            && self.good < self.miss;
        if ordered {
            Ok(())
        } else {
            Err(ConfigError::JudgeWindowOrder {
                perfect: self.perfect,
                great: self.great,
                good: self.good,
                miss: self.miss,
            })
        }
    }
}

/// What a session does when the chart's audio cannot be found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingAudioPolicy {
    /// Play the chart note-only, driven by the clock alone.
    #[default]
    Silent,
    /// Refuse to start; the chart stays loaded but inert.
    Refuse,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Pixels per ms. Rendering only.
    pub scroll_speed: f64,
    pub key_mapping: [KeyCode; LANES],
    pub judge_window: JudgeWindow,
    /// Signed device latency compensation in ms.
    pub audio_offset: Millis,
    /// Countdown before playback starts, in ms.
    pub pre_game_delay: Millis,
    pub missing_audio: MissingAudioPolicy,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            scroll_speed: 0.9,
            // D F J K
            key_mapping: [KeyCode(68), KeyCode(70), KeyCode(74), KeyCode(75)],
            judge_window: JudgeWindow::default(),
            audio_offset: 0,
            pre_game_delay: 2000,
            missing_audio: MissingAudioPolicy::Silent,
        }
    }
}

impl GameConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.judge_window.validate()?;
        if self.pre_game_delay < 0 {
            return Err(ConfigError::NegativePreGameDelay(self.pre_game_delay));
        }
        if !(self.scroll_speed.is_finite() && self.scroll_speed > 0.0) {
            return Err(ConfigError::ScrollSpeed(self.scroll_speed));
        }
        Ok(())
    }

    pub fn column_for_key(&self, key: KeyCode) -> Option<usize> {
        self.key_mapping.iter().position(|&k| k == key)
    }

    /// Reads a settings file; missing fields take their defaults.
    pub fn load_json(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).with_context(|| format!("failed to read config: {}", path.display()))?;
        let config: GameConfig = serde_json::from_slice(&bytes)
            .with_context(|| format!("failed to parse config json: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid config: {}", path.display()))?;
        Ok(config)
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).context("failed to serialize config")?;
        fs::write(path, json).with_context(|| format!("failed to write: {}", path.display()))?;
        Ok(())
    }
}
