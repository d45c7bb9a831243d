// Analysis module - windowing and acoustic feature extraction
//
// Pipeline position: decoded samples are accumulated by WindowBuffer,
// and each full window is handed to FeatureExtractor for a fixed set of
// scalar descriptors (RMS energy, zero-crossing rate, spectral centroid,
// spectral rolloff) used by the heuristic classifier.

pub mod features;
pub mod window;

pub use features::{FeatureExtractor, FeatureVector};
pub use window::WindowBuffer;
