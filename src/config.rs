use glam::DVec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Simulation tuning shared by the world and the frame driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub gravity: DVec3,
    /// Fixed integration step in seconds.
    pub fixed_dt: f64,
    /// Per-frame wall-clock cap; elapsed time past it is discarded, which
    /// bounds the steps taken for any single frame.
    pub max_frame_delta: f64,
    /// Minimum approach speed (m/s) for a contact to count as a genuine
    /// impact. Must sit above the per-step gravity jitter (`g * fixed_dt`)
    /// or resting contact would emit events every step.
    pub contact_epsilon: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            gravity: DVec3::new(0.0, -9.82, 0.0),
            fixed_dt: 1.0 / 60.0,
            max_frame_delta: 0.1,
            contact_epsilon: 0.25,
        }
    }
}

/// Impact-audio policy. The defaults reproduce the tuning the engine was
/// calibrated with (play above 1 m/s, full volume at 20 m/s); both are
/// empirical knobs, not physical law.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpactAudioConfig {
    /// Impacts at or below this speed stay silent.
    pub threshold: f64,
    /// Impact speed mapped to volume 1.0; volume scales linearly below it.
    pub normalization: f64,
    /// Sound id used when neither material carries a sound tag.
    pub sound: String,
}

impl Default for ImpactAudioConfig {
    fn default() -> Self {
        Self {
            threshold: 1.0,
            normalization: 20.0,
            sound: "impact".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub sim: SimConfig,
    pub impact_audio: ImpactAudioConfig,
}

impl EngineConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }
}
