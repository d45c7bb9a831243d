// EnsembleClassifier - any-positive aggregation over multiple classifiers
//
// Runs every member on the window and reports a bark if any member crosses
// its own threshold. The reported model and confidence come from the most
// confident positive member (or the most confident member overall when none
// is positive); all sub-results are attached for inspection. Aggregation is
// any-positive by design, not averaging.

use crate::classify::{ClassificationResult, Classifier, EnsembleMember};

pub struct EnsembleClassifier {
    members: Vec<Box<dyn Classifier>>,
}

impl EnsembleClassifier {
    /// # Panics
    /// Panics if `members` is empty.
    pub fn new(members: Vec<Box<dyn Classifier>>) -> Self {
        assert!(!members.is_empty(), "ensemble requires at least one member");
        Self { members }
    }
}

impl Classifier for EnsembleClassifier {
    fn name(&self) -> &str {
        "ensemble"
    }

    fn detect(&mut self, window: &[f32]) -> ClassificationResult {
        let results: Vec<ClassificationResult> = self
            .members
            .iter_mut()
            .map(|member| member.detect(window))
            .collect();

        let detail: Vec<EnsembleMember> = results
            .iter()
            .map(|r| EnsembleMember {
                model: r.model.clone(),
                is_bark: r.is_bark,
                confidence: r.confidence,
            })
            .collect();

        let is_bark = results.iter().any(|r| r.is_bark);

        // Winner: most confident positive member, or most confident overall
        let winner = results
            .iter()
            .filter(|r| !is_bark || r.is_bark)
            .max_by(|a, b| {
                a.confidence
                    .partial_cmp(&b.confidence)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .cloned()
            .unwrap_or_else(|| results[0].clone());

        ClassificationResult {
            is_bark,
            confidence: winner.confidence,
            model: winner.model,
            features: winner.features,
            ensemble: Some(detail),
        }
    }
}
