use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::SignError;
use super::region::HandMode;
use super::stabilizer::StabilizerConfig;

const MAX_CANVAS_SIZE: u32 = 4096;

/// How a two-hand frame is turned into one label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TwoHandStrategy {
    /// One canvas over the union of both hands.
    #[default]
    Union,
    /// One canvas per hand; the valid result with the highest confidence wins,
    /// ties going to the earlier hand.
    MostConfident,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognizerConfig {
    pub canvas_size: u32,
    pub padding: u32,
    pub min_confidence: f32,
    pub stability_threshold: u32,
    pub max_sentence_len: usize,
    pub commit_cooldown_ms: Option<u64>,
    pub two_hand_strategy: TwoHandStrategy,
    pub initial_mode: HandMode,
    pub labels_path: Option<PathBuf>,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            canvas_size: 300,
            padding: 20,
            min_confidence: 0.8,
            stability_threshold: 5,
            max_sentence_len: 5,
            commit_cooldown_ms: None,
            two_hand_strategy: TwoHandStrategy::Union,
            initial_mode: HandMode::Single,
            labels_path: None,
        }
    }
}

impl RecognizerConfig {
    pub fn for_fast_signing() -> Self {
        let stabilizer = StabilizerConfig::for_fast_signing();
        Self {
            stability_threshold: stabilizer.stability_threshold,
            ..Default::default()
        }
    }

    pub fn for_deliberate_signing() -> Self {
        let stabilizer = StabilizerConfig::for_deliberate_signing();
        Self {
            stability_threshold: stabilizer.stability_threshold,
            commit_cooldown_ms: stabilizer.commit_cooldown.map(|d| d.as_millis() as u64),
            ..Default::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, SignError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, SignError> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), SignError> {
        if self.canvas_size == 0 || self.canvas_size > MAX_CANVAS_SIZE {
            return Err(SignError::InvalidConfig(format!(
                "canvas_size must be in 1..={}, got {}",
                MAX_CANVAS_SIZE, self.canvas_size
            )));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(SignError::InvalidConfig(format!(
                "min_confidence must be in [0, 1], got {}",
                self.min_confidence
            )));
        }
        if self.stability_threshold == 0 {
            return Err(SignError::InvalidConfig(
                "stability_threshold must be at least 1".to_string(),
            ));
        }
        if self.max_sentence_len == 0 {
            return Err(SignError::InvalidConfig(
                "max_sentence_len must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn stabilizer_config(&self) -> StabilizerConfig {
        StabilizerConfig {
            stability_threshold: self.stability_threshold,
            commit_cooldown: self.commit_cooldown_ms.map(Duration::from_millis),
        }
    }
}
