// Classifier module - bark/non-bark scoring of audio windows
//
// Two concrete classifiers share one result shape: HeuristicClassifier
// (rule-based scoring over extracted features) and MlClassifier (external
// pretrained audio-event model). FallbackClassifier decorates the ML path
// with per-window heuristic fallback, and EnsembleClassifier aggregates
// several classifiers under an any-positive rule.
//
// Model loading happens once per pipeline start via build_classifier; a
// load failure permanently routes that pipeline to the heuristic path.

mod ensemble;
mod heuristic;
mod ml;

pub use ensemble::EnsembleClassifier;
pub use heuristic::HeuristicClassifier;
pub use ml::{AudioEventModel, FallbackClassifier, MlClassifier, ModelLoader, NoModels};

use serde::{Deserialize, Serialize};

use crate::analysis::FeatureVector;
use crate::config::AppConfig;

/// Identity of the model that produced a classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Heuristic,
    Ml(String),
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelKind::Heuristic => f.write_str("heuristic"),
            ModelKind::Ml(name) => f.write_str(name),
        }
    }
}

/// One sub-result inside an ensemble classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleMember {
    pub model: ModelKind,
    pub is_bark: bool,
    pub confidence: f64,
}

/// Result of classifying one window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub is_bark: bool,
    /// Confidence in [0, 1]
    pub confidence: f64,
    pub model: ModelKind,
    /// Raw features; present on the heuristic path, absent on the ML path
    pub features: Option<FeatureVector>,
    /// Per-model sub-results when an ensemble produced this result
    pub ensemble: Option<Vec<EnsembleMember>>,
}

/// A bark classifier over fixed-length sample windows.
///
/// `detect` never fails: every error path inside an implementation must
/// resolve to a valid result (the ML path falls back to the heuristic).
pub trait Classifier: Send {
    fn name(&self) -> &str;
    fn detect(&mut self, window: &[f32]) -> ClassificationResult;
}

/// Build the classifier for one pipeline instance.
///
/// Attempts the ML model load exactly once. A missing or failing model is
/// non-fatal: the pipeline is permanently routed to the heuristic path and
/// the failure is logged.
pub fn build_classifier(config: &AppConfig, loader: &dyn ModelLoader) -> Box<dyn Classifier> {
    let heuristic = HeuristicClassifier::new(
        config.heuristic.clone(),
        config.audio.sample_rate,
        config.audio.transform_size,
    );

    let Some(ref model_spec) = config.ml.model else {
        log::info!("[Classifier] No ML model configured, using heuristic detection");
        return Box::new(heuristic);
    };

    match loader.load(model_spec) {
        Ok(model) => {
            // A model whose declared input length disagrees with the
            // configuration would be fed windows prepared for the wrong
            // geometry; treat it like a failed load.
            if model.input_len() != config.ml.input_len {
                log::warn!(
                    "[Classifier] model '{}' declares {} input samples but {} are configured; \
                     permanently falling back to heuristic detection",
                    model.name(),
                    model.input_len(),
                    config.ml.input_len
                );
                return Box::new(heuristic);
            }
            log::info!("[Classifier] Loaded model '{}'", model.name());
            let ml = MlClassifier::new(model, config.ml.positive_index, config.ml.score_threshold);
            Box::new(FallbackClassifier::new(ml, heuristic))
        }
        Err(err) => {
            log::warn!(
                "[Classifier] {}; permanently falling back to heuristic detection",
                err
            );
            Box::new(heuristic)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelLoadError;

    struct AlwaysFails;

    impl ModelLoader for AlwaysFails {
        fn load(&self, spec: &str) -> Result<Box<dyn AudioEventModel>, ModelLoadError> {
            Err(ModelLoadError {
                model: spec.to_string(),
                reason: "unreachable hub".to_string(),
            })
        }
    }

    #[test]
    fn test_build_without_model_spec_is_heuristic() {
        let config = AppConfig::default();
        let mut classifier = build_classifier(&config, &NoModels);
        let result = classifier.detect(&vec![0.0; 512]);
        assert_eq!(result.model, ModelKind::Heuristic);
    }

    #[test]
    fn test_load_failure_routes_to_heuristic_without_error() {
        let mut config = AppConfig::default();
        config.ml.model = Some("yamnet".to_string());

        let mut classifier = build_classifier(&config, &AlwaysFails);
        for _ in 0..3 {
            let result = classifier.detect(&vec![0.0; 512]);
            assert_eq!(result.model, ModelKind::Heuristic);
        }
    }

    /// Loader handing out a model with a fixed declared input length.
    struct LoaderOf {
        input_len: usize,
    }

    struct DeclaredLenModel {
        input_len: usize,
    }

    impl AudioEventModel for DeclaredLenModel {
        fn name(&self) -> &str {
            "declared"
        }

        fn input_len(&self) -> usize {
            self.input_len
        }

        fn infer(&mut self, _waveform: &[f32]) -> Result<Vec<f32>, crate::error::InferenceError> {
            Ok(vec![0.0; 100])
        }
    }

    impl ModelLoader for LoaderOf {
        fn load(&self, _spec: &str) -> Result<Box<dyn AudioEventModel>, ModelLoadError> {
            Ok(Box::new(DeclaredLenModel {
                input_len: self.input_len,
            }))
        }
    }

    #[test]
    fn test_mismatched_input_len_routes_to_heuristic() {
        let mut config = AppConfig::default();
        config.ml.model = Some("yamnet".to_string());
        config.ml.input_len = 16000;

        let mut classifier = build_classifier(&config, &LoaderOf { input_len: 8000 });
        let result = classifier.detect(&vec![0.0; 512]);
        assert_eq!(result.model, ModelKind::Heuristic);
    }

    #[test]
    fn test_matching_input_len_uses_model() {
        let mut config = AppConfig::default();
        config.ml.model = Some("yamnet".to_string());
        config.ml.input_len = 16000;

        let mut classifier = build_classifier(&config, &LoaderOf { input_len: 16000 });
        let result = classifier.detect(&vec![0.0; 512]);
        assert_eq!(result.model, ModelKind::Ml("declared".to_string()));
    }

    #[test]
    fn test_model_kind_display() {
        assert_eq!(ModelKind::Heuristic.to_string(), "heuristic");
        assert_eq!(ModelKind::Ml("yamnet".to_string()).to_string(), "yamnet");
    }
}
