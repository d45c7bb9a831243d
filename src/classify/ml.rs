// MlClassifier - external pretrained audio-event model with fallback
//
// The external model (e.g. an AudioSet-trained event classifier) takes a
// fixed-length waveform and returns a score vector; the bark score is read
// at a fixed class index. Model loading happens once per pipeline start;
// per-window inference failures are caught by FallbackClassifier and the
// window is re-scored heuristically. Neither failure mode ever propagates
// past Classifier::detect.

use crate::classify::{ClassificationResult, Classifier, HeuristicClassifier, ModelKind};
use crate::error::{InferenceError, ModelLoadError};

/// External pretrained audio-event model.
///
/// `infer` takes exactly `input_len` samples and returns the model's class
/// score vector.
pub trait AudioEventModel: Send {
    fn name(&self) -> &str;
    fn input_len(&self) -> usize;
    fn infer(&mut self, waveform: &[f32]) -> Result<Vec<f32>, InferenceError>;
}

/// Loads an [AudioEventModel] from a URL or path, once per pipeline start.
pub trait ModelLoader: Send + Sync {
    fn load(&self, spec: &str) -> Result<Box<dyn AudioEventModel>, ModelLoadError>;
}

/// Loader with no models available; every load fails (non-fatally).
pub struct NoModels;

impl ModelLoader for NoModels {
    fn load(&self, spec: &str) -> Result<Box<dyn AudioEventModel>, ModelLoadError> {
        Err(ModelLoadError {
            model: spec.to_string(),
            reason: "no model backend registered".to_string(),
        })
    }
}

/// Classifier delegating to an external audio-event model.
pub struct MlClassifier {
    model: Box<dyn AudioEventModel>,
    model_kind: ModelKind,
    positive_index: usize,
    score_threshold: f64,
}

impl MlClassifier {
    pub fn new(model: Box<dyn AudioEventModel>, positive_index: usize, score_threshold: f64) -> Self {
        let model_kind = ModelKind::Ml(model.name().to_string());
        Self {
            model,
            model_kind,
            positive_index,
            score_threshold,
        }
    }

    /// Zero-pad or truncate a window to the model's fixed input length.
    fn prepare_input(&self, window: &[f32]) -> Vec<f32> {
        let target = self.model.input_len();
        let mut input = vec![0.0f32; target];
        let copy = window.len().min(target);
        input[..copy].copy_from_slice(&window[..copy]);
        input
    }

    /// Run inference on one window. Errors are handled by the caller
    /// (FallbackClassifier), never surfaced to the pipeline.
    pub fn try_detect(&mut self, window: &[f32]) -> Result<ClassificationResult, InferenceError> {
        let input = self.prepare_input(window);
        let scores = self.model.infer(&input)?;

        let score = *scores
            .get(self.positive_index)
            .ok_or_else(|| InferenceError {
                model: self.model.name().to_string(),
                reason: format!(
                    "score vector has {} entries, expected index {}",
                    scores.len(),
                    self.positive_index
                ),
            })? as f64;

        Ok(ClassificationResult {
            is_bark: score > self.score_threshold,
            confidence: score,
            model: self.model_kind.clone(),
            features: None,
            ensemble: None,
        })
    }
}

/// Tries the ML classifier first and drops to the heuristic on any
/// inference failure for that window only.
pub struct FallbackClassifier {
    ml: MlClassifier,
    heuristic: HeuristicClassifier,
}

impl FallbackClassifier {
    pub fn new(ml: MlClassifier, heuristic: HeuristicClassifier) -> Self {
        Self { ml, heuristic }
    }
}

impl Classifier for FallbackClassifier {
    fn name(&self) -> &str {
        "ml+heuristic"
    }

    fn detect(&mut self, window: &[f32]) -> ClassificationResult {
        match self.ml.try_detect(window) {
            Ok(result) => result,
            Err(err) => {
                log::warn!("[Classifier] {}; re-scoring window heuristically", err);
                self.heuristic.detect(window)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HeuristicConfig;

    /// Model returning a fixed score vector.
    struct ConstModel {
        scores: Vec<f32>,
    }

    impl AudioEventModel for ConstModel {
        fn name(&self) -> &str {
            "const"
        }

        fn input_len(&self) -> usize {
            16
        }

        fn infer(&mut self, waveform: &[f32]) -> Result<Vec<f32>, InferenceError> {
            assert_eq!(waveform.len(), 16, "input must be padded/truncated");
            Ok(self.scores.clone())
        }
    }

    /// Model that fails every invocation.
    struct BrokenModel;

    impl AudioEventModel for BrokenModel {
        fn name(&self) -> &str {
            "broken"
        }

        fn input_len(&self) -> usize {
            16
        }

        fn infer(&mut self, _waveform: &[f32]) -> Result<Vec<f32>, InferenceError> {
            Err(InferenceError {
                model: "broken".to_string(),
                reason: "tensor backend crashed".to_string(),
            })
        }
    }

    fn heuristic() -> HeuristicClassifier {
        HeuristicClassifier::new(HeuristicConfig::default(), 16000, 512)
    }

    #[test]
    fn test_score_above_threshold_is_bark() {
        let mut scores = vec![0.0f32; 100];
        scores[69] = 0.8;
        let mut ml = MlClassifier::new(Box::new(ConstModel { scores }), 69, 0.3);

        let result = ml.try_detect(&[0.1; 8]).unwrap();
        assert!(result.is_bark);
        assert!((result.confidence - 0.8).abs() < 1e-6);
        assert_eq!(result.model, ModelKind::Ml("const".to_string()));
        assert!(result.features.is_none());
    }

    #[test]
    fn test_score_below_threshold_is_not_bark() {
        let mut scores = vec![0.0f32; 100];
        scores[69] = 0.2;
        let mut ml = MlClassifier::new(Box::new(ConstModel { scores }), 69, 0.3);

        let result = ml.try_detect(&[0.1; 8]).unwrap();
        assert!(!result.is_bark);
    }

    #[test]
    fn test_input_truncated_to_model_length() {
        let mut scores = vec![0.0f32; 100];
        scores[69] = 0.5;
        let mut ml = MlClassifier::new(Box::new(ConstModel { scores }), 69, 0.3);

        // 64 samples truncated to 16; ConstModel asserts the length
        assert!(ml.try_detect(&[0.5; 64]).is_ok());
        // 4 samples zero-padded to 16
        assert!(ml.try_detect(&[0.5; 4]).is_ok());
    }

    #[test]
    fn test_short_score_vector_is_inference_error() {
        let mut ml = MlClassifier::new(Box::new(ConstModel { scores: vec![0.1; 10] }), 69, 0.3);
        let err = ml.try_detect(&[0.1; 8]).unwrap_err();
        assert!(err.reason.contains("expected index 69"));
    }

    #[test]
    fn test_fallback_never_raises() {
        let ml = MlClassifier::new(Box::new(BrokenModel), 69, 0.3);
        let mut fallback = FallbackClassifier::new(ml, heuristic());

        let result = fallback.detect(&vec![0.0; 512]);
        assert_eq!(result.model, ModelKind::Heuristic);
        assert!(result.features.is_some());
    }

    #[test]
    fn test_fallback_prefers_ml_when_healthy() {
        let mut scores = vec![0.0f32; 100];
        scores[69] = 0.9;
        let ml = MlClassifier::new(Box::new(ConstModel { scores }), 69, 0.3);
        let mut fallback = FallbackClassifier::new(ml, heuristic());

        let result = fallback.detect(&[0.1; 8]);
        assert_eq!(result.model, ModelKind::Ml("const".to_string()));
    }
}
