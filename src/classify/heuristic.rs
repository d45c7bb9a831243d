// HeuristicClassifier - rule-based bark scoring over acoustic features
//
// Scores four independent range checks against the configured bark profile:
// RMS energy (barks are loud but not clipping), zero-crossing rate (moderate
// noisiness), spectral centroid (mid-range brightness), and spectral rolloff.
// Confidence is the matched fraction, so it is always a multiple of 1/4.

use crate::analysis::{FeatureExtractor, FeatureVector};
use crate::classify::{ClassificationResult, Classifier, ModelKind};
use crate::config::HeuristicConfig;

/// Number of profile checks contributing to the confidence score
const CHECK_COUNT: u32 = 4;

/// Rule-based classifier; stateless across windows.
pub struct HeuristicClassifier {
    profile: HeuristicConfig,
    extractor: FeatureExtractor,
}

impl HeuristicClassifier {
    pub fn new(profile: HeuristicConfig, sample_rate: u32, transform_size: usize) -> Self {
        Self {
            profile,
            extractor: FeatureExtractor::new(sample_rate, transform_size),
        }
    }

    /// Score one feature vector against the bark profile.
    ///
    /// Returns the fraction of checks matched, in {0, 0.25, 0.5, 0.75, 1}.
    pub fn bark_probability(&self, features: &FeatureVector) -> f64 {
        let p = &self.profile;
        let mut score = 0u32;

        if features.rms >= p.rms_min && features.rms <= p.rms_max {
            score += 1;
        }
        if features.zcr >= p.zcr_min && features.zcr <= p.zcr_max {
            score += 1;
        }
        if features.spectral_centroid >= p.centroid_min_hz
            && features.spectral_centroid <= p.centroid_max_hz
        {
            score += 1;
        }
        if features.spectral_rolloff >= p.rolloff_min_hz
            && features.spectral_rolloff <= p.rolloff_max_hz
        {
            score += 1;
        }

        score as f64 / CHECK_COUNT as f64
    }
}

impl Classifier for HeuristicClassifier {
    fn name(&self) -> &str {
        "heuristic"
    }

    fn detect(&mut self, window: &[f32]) -> ClassificationResult {
        let features = self.extractor.extract(window);
        let confidence = self.bark_probability(&features);

        ClassificationResult {
            is_bark: confidence > self.profile.confidence_threshold,
            confidence,
            model: ModelKind::Heuristic,
            features: Some(features),
            ensemble: None,
        }
    }
}
