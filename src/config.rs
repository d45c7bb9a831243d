//! Configuration management for the detection pipeline
//!
//! This module provides runtime configuration loading from JSON files,
//! enabling parameter tuning without recompilation. Window geometry,
//! heuristic bark-profile bounds, and ML model parameters can all be
//! adjusted via the config file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Size of the canonical WAV container header the decoder skips once.
pub const WAV_HEADER_LEN: usize = 44;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub audio: AudioConfig,
    pub heuristic: HeuristicConfig,
    pub ml: MlConfig,
    pub pipeline: PipelineConfig,
}

/// Audio format and windowing parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Sample rate the decoding process is asked to produce, in Hz
    pub sample_rate: u32,
    /// Classification window length in samples
    pub window_size: usize,
    /// Overlap between consecutive windows in samples (0 = non-overlapping)
    pub overlap_size: usize,
    /// Maximum transform size for the reduced-resolution spectrum
    pub transform_size: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        // 1 second of audio at 8 kHz, matching the heuristic detection path
        Self {
            sample_rate: 8000,
            window_size: 8000,
            overlap_size: 0,
            transform_size: 512,
        }
    }
}

impl AudioConfig {
    /// ML-oriented defaults: 16 kHz with 25% window overlap.
    pub fn ml_defaults() -> Self {
        Self {
            sample_rate: 16000,
            window_size: 16000,
            overlap_size: 4000,
            transform_size: 512,
        }
    }

    /// Validate the windowing invariant `0 <= overlap < window_size`.
    pub fn validate(&self) -> Result<(), String> {
        if self.window_size == 0 {
            return Err("window_size must be greater than 0".to_string());
        }
        if self.overlap_size >= self.window_size {
            return Err(format!(
                "overlap_size ({}) must be less than window_size ({})",
                self.overlap_size, self.window_size
            ));
        }
        Ok(())
    }
}

/// Heuristic classifier bark profile
///
/// A window scores one point per feature that falls inside its bounds
/// (inclusive); confidence is the matched fraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeuristicConfig {
    pub rms_min: f64,
    pub rms_max: f64,
    pub zcr_min: f64,
    pub zcr_max: f64,
    pub centroid_min_hz: f64,
    pub centroid_max_hz: f64,
    pub rolloff_min_hz: f64,
    pub rolloff_max_hz: f64,
    /// Confidence above which a window counts as a bark
    pub confidence_threshold: f64,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            rms_min: 0.01,
            rms_max: 0.5,
            zcr_min: 0.05,
            zcr_max: 0.3,
            centroid_min_hz: 500.0,
            centroid_max_hz: 3000.0,
            rolloff_min_hz: 1000.0,
            rolloff_max_hz: 8000.0,
            confidence_threshold: 0.7,
        }
    }
}

/// External ML classifier parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlConfig {
    /// Model identifier passed to the loader (URL or path); None disables
    /// the ML path entirely
    pub model: Option<String>,
    /// Expected model input length in samples; windows are zero-padded or
    /// truncated to this length. A loaded model declaring a different
    /// length is rejected at build time.
    pub input_len: usize,
    /// Output index of the bark/dog class in the model's score vector
    pub positive_index: usize,
    /// Score above which a window counts as a bark
    pub score_threshold: f64,
}

impl Default for MlConfig {
    fn default() -> Self {
        // Index 69 is the "Dog" class in the AudioSet score vector the
        // pretrained audio-event model emits.
        Self {
            model: None,
            input_len: 16000,
            positive_index: 69,
            score_threshold: 0.3,
        }
    }
}

/// Pipeline orchestration parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Capacity of the chunk channel between the source and the pipeline
    pub chunk_channel_capacity: usize,
    /// Grace period to wait for the decoding process to exit on shutdown,
    /// in milliseconds; exceeded waits are logged warnings, not errors
    pub shutdown_grace_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_channel_capacity: 64,
            shutdown_grace_ms: 3000,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            heuristic: HeuristicConfig::default(),
            ml: MlConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    ///
    /// Falls back to defaults (with a logged warning) if the file is
    /// missing or fails to parse.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.audio.sample_rate, 8000);
        assert_eq!(config.audio.window_size, 8000);
        assert_eq!(config.audio.overlap_size, 0);
        assert_eq!(config.audio.transform_size, 512);
        assert_eq!(config.heuristic.confidence_threshold, 0.7);
        assert_eq!(config.ml.positive_index, 69);
        assert_eq!(config.ml.score_threshold, 0.3);
    }

    #[test]
    fn test_ml_defaults() {
        let audio = AudioConfig::ml_defaults();
        assert_eq!(audio.sample_rate, 16000);
        assert_eq!(audio.window_size, 16000);
        assert_eq!(audio.overlap_size, 4000);
    }

    #[test]
    fn test_validate_overlap_invariant() {
        let mut audio = AudioConfig::default();
        assert!(audio.validate().is_ok());

        audio.overlap_size = audio.window_size;
        assert!(audio.validate().is_err());

        audio.window_size = 0;
        assert!(audio.validate().is_err());
    }

    #[test]
    fn test_json_roundtrip() {
        let config = AppConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.audio.window_size, config.audio.window_size);
        assert_eq!(parsed.heuristic.rms_max, config.heuristic.rms_max);
        assert_eq!(parsed.ml.input_len, config.ml.input_len);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_from_file("/nonexistent/bark_config.json");
        assert_eq!(config.audio.sample_rate, 8000);
    }
}
