// FeatureExtractor - acoustic feature extraction for bark classification
//
// Extracts four descriptors from one window of samples:
// 1. RMS energy: loudness proxy
// 2. Zero-crossing rate: noisiness/pitch proxy
// 3. Spectral centroid: amplitude-weighted mean frequency (brightness)
// 4. Spectral rolloff: frequency below which 85% of spectral magnitude lies
//
// The spectral features use a reduced-resolution magnitude spectrum: the
// window is decimated to at most `transform_size` points by uniform
// subsampling, then each bin is computed by direct real/imaginary
// accumulation over a strided pass of the decimated signal. This is a
// deliberate speed/accuracy tradeoff inherited from the detection profile
// the heuristic thresholds were tuned against; the decimation and summation
// order must not change, or the thresholds stop lining up. A true FFT is
// intentionally not used here.

use serde::{Deserialize, Serialize};

/// Spectral rolloff threshold (85% of cumulative spectral magnitude)
const ROLLOFF_THRESHOLD: f64 = 0.85;

/// Features extracted from one audio window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// RMS energy, >= 0
    pub rms: f64,
    /// Zero-crossing rate in [0, 0.5]
    pub zcr: f64,
    /// Spectral centroid in Hz, >= 0
    pub spectral_centroid: f64,
    /// Spectral rolloff in Hz, >= 0
    pub spectral_rolloff: f64,
}

/// FeatureExtractor computes a [FeatureVector] from one window.
///
/// Pure and stateless across windows: the same window always produces the
/// identical vector.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    sample_rate: u32,
    transform_size: usize,
}

impl FeatureExtractor {
    /// Create an extractor for the given sample rate.
    ///
    /// # Arguments
    /// * `sample_rate` - Audio sample rate in Hz (e.g., 8000)
    /// * `transform_size` - Upper bound on the spectrum transform size
    pub fn new(sample_rate: u32, transform_size: usize) -> Self {
        Self {
            sample_rate,
            transform_size,
        }
    }

    /// Extract all features from one window.
    pub fn extract(&self, window: &[f32]) -> FeatureVector {
        let rms = Self::compute_rms(window);
        let zcr = Self::compute_zcr(window);

        let spectrum = self.compute_magnitude_spectrum(window);
        let spectral_centroid = self.compute_centroid(&spectrum);
        let spectral_rolloff = self.compute_rolloff(&spectrum);

        FeatureVector {
            rms,
            zcr,
            spectral_centroid,
            spectral_rolloff,
        }
    }

    /// RMS energy: sqrt(mean(sample^2))
    fn compute_rms(window: &[f32]) -> f64 {
        if window.is_empty() {
            return 0.0;
        }
        let sum: f64 = window.iter().map(|&s| s as f64 * s as f64).sum();
        (sum / window.len() as f64).sqrt()
    }

    /// Zero-crossing rate: sign changes / (2 * window length)
    ///
    /// Zero counts as non-negative, so silence has no crossings.
    fn compute_zcr(window: &[f32]) -> f64 {
        if window.len() < 2 {
            return 0.0;
        }
        let mut crossings = 0u32;
        for i in 1..window.len() {
            if (window[i] >= 0.0) != (window[i - 1] >= 0.0) {
                crossings += 1;
            }
        }
        crossings as f64 / (2.0 * window.len() as f64)
    }

    /// Reduced-resolution magnitude spectrum.
    ///
    /// Decimates the window to at most `transform_size` points, then
    /// accumulates each of `transform_size / 2` bins by direct summation
    /// over a strided pass of the decimated signal.
    fn compute_magnitude_spectrum(&self, window: &[f32]) -> Vec<f64> {
        if window.len() < 2 {
            return Vec::new();
        }

        let fft_size = self.transform_size.min(window.len());
        let decimated = Self::decimate(window, fft_size);
        let half = fft_size / 2;
        if half == 0 {
            return Vec::new();
        }

        let len = decimated.len();
        let step = (len / half).max(1);
        let mut spectrum = Vec::with_capacity(half);

        for k in 0..half {
            let mut real = 0.0f64;
            let mut imag = 0.0f64;
            let mut n = 0;
            while n < len {
                let angle = -2.0 * std::f64::consts::PI * k as f64 * n as f64 / len as f64;
                real += decimated[n] as f64 * angle.cos();
                imag += decimated[n] as f64 * angle.sin();
                n += step;
            }
            spectrum.push((real * real + imag * imag).sqrt());
        }

        spectrum
    }

    /// Uniform subsampling down to roughly `target` points.
    ///
    /// Keeps every `len / target`-th sample starting at index 0; windows no
    /// longer than `target` pass through untouched.
    fn decimate(window: &[f32], target: usize) -> Vec<f32> {
        if window.len() <= target {
            return window.to_vec();
        }
        let step = window.len() / target;
        window.iter().step_by(step).copied().collect()
    }

    /// Frequency of bin `k` on the reduced-resolution axis.
    fn bin_frequency(&self, k: usize, spectrum_len: usize) -> f64 {
        k as f64 * self.sample_rate as f64 / (2.0 * spectrum_len as f64)
    }

    /// Spectral centroid: magnitude-weighted mean frequency, DC excluded.
    ///
    /// Returns 0 when the magnitude sum is 0 (e.g., silence).
    fn compute_centroid(&self, spectrum: &[f64]) -> f64 {
        let mut numerator = 0.0;
        let mut denominator = 0.0;
        for (k, &magnitude) in spectrum.iter().enumerate().skip(1) {
            numerator += self.bin_frequency(k, spectrum.len()) * magnitude;
            denominator += magnitude;
        }
        if denominator > 0.0 {
            numerator / denominator
        } else {
            0.0
        }
    }

    /// Spectral rolloff: smallest bin frequency at which the cumulative
    /// magnitude reaches 85% of the total; Nyquist if never reached.
    fn compute_rolloff(&self, spectrum: &[f64]) -> f64 {
        let total: f64 = spectrum.iter().sum();
        let target = total * ROLLOFF_THRESHOLD;

        let mut cumulative = 0.0;
        for (k, &magnitude) in spectrum.iter().enumerate() {
            cumulative += magnitude;
            if cumulative >= target {
                return self.bin_frequency(k, spectrum.len());
            }
        }

        self.sample_rate as f64 / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(sample_rate: u32, frequency: f64, amplitude: f64, len: usize) -> Vec<f32> {
        (0..len)
            .map(|n| {
                let t = n as f64 / sample_rate as f64;
                (amplitude * (2.0 * std::f64::consts::PI * frequency * t).sin()) as f32
            })
            .collect()
    }

    fn white_noise(len: usize) -> Vec<f32> {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        (0..len).map(|_| rng.gen_range(-1.0..1.0)).collect()
    }

    #[test]
    fn test_silence_features_are_zero() {
        let extractor = FeatureExtractor::new(8000, 512);
        let features = extractor.extract(&vec![0.0; 8000]);

        assert_eq!(features.rms, 0.0);
        assert_eq!(features.zcr, 0.0);
        assert_eq!(features.spectral_centroid, 0.0);
    }

    #[test]
    fn test_constant_max_amplitude() {
        let extractor = FeatureExtractor::new(8000, 512);
        let features = extractor.extract(&vec![1.0; 4]);

        assert_eq!(features.rms, 1.0);
        assert_eq!(features.zcr, 0.0);
    }

    #[test]
    fn test_determinism() {
        let extractor = FeatureExtractor::new(16000, 512);
        let window = sine(16000, 730.0, 0.4, 16000);

        let first = extractor.extract(&window);
        for _ in 0..3 {
            assert_eq!(extractor.extract(&window), first);
        }
    }

    #[test]
    fn test_zcr_range_and_scaling() {
        let extractor = FeatureExtractor::new(8000, 512);

        // 100 Hz sine at 8 kHz: ~2*f/sr sign changes per sample
        let low = extractor.extract(&sine(8000, 100.0, 1.0, 512));
        assert!(low.zcr < 0.05, "expected low ZCR, got {}", low.zcr);

        let noise = extractor.extract(&white_noise(512));
        assert!(noise.zcr > 0.15, "expected high ZCR, got {}", noise.zcr);
        assert!(noise.zcr <= 0.5);
    }

    #[test]
    fn test_bin_aligned_sine_centroid_and_rolloff() {
        // 1500 Hz lands exactly on bin 48 of the 256-bin axis at 16 kHz
        // (48 * 16000 / 512 = 1500), and survives the stride-2 summation
        // because the window is exactly 512 samples (no decimation).
        let extractor = FeatureExtractor::new(16000, 512);
        let features = extractor.extract(&sine(16000, 1500.0, 0.4, 512));

        assert!(
            (features.spectral_centroid - 1500.0).abs() < 100.0,
            "centroid {} not near 1500 Hz",
            features.spectral_centroid
        );
        assert!(
            (features.spectral_rolloff - 1500.0).abs() < 40.0,
            "rolloff {} not near 1500 Hz",
            features.spectral_rolloff
        );
    }

    #[test]
    fn test_features_in_valid_ranges_for_large_window() {
        // A full one-second window exercises the decimation path
        let extractor = FeatureExtractor::new(8000, 512);
        let features = extractor.extract(&sine(8000, 600.0, 0.3, 8000));

        assert!(features.rms > 0.0);
        assert!((0.0..=0.5).contains(&features.zcr));
        assert!(features.spectral_centroid >= 0.0);
        assert!(features.spectral_centroid <= 4000.0);
        assert!(features.spectral_rolloff >= 0.0);
        assert!(features.spectral_rolloff <= 4000.0);
    }

    #[test]
    fn test_decimation_stride() {
        // 8000 samples down to 512: stride 15, keeping indices 0, 15, 30...
        let window: Vec<f32> = (0..8000).map(|i| i as f32).collect();
        let decimated = FeatureExtractor::decimate(&window, 512);
        assert_eq!(decimated[0], 0.0);
        assert_eq!(decimated[1], 15.0);
        assert_eq!(decimated.len(), 534);

        // Short windows pass through untouched
        let short: Vec<f32> = (0..100).map(|i| i as f32).collect();
        assert_eq!(FeatureExtractor::decimate(&short, 512), short);
    }

    #[test]
    fn test_tiny_window_does_not_panic() {
        let extractor = FeatureExtractor::new(8000, 512);
        let features = extractor.extract(&[0.5]);
        assert_eq!(features.zcr, 0.0);
        assert_eq!(features.spectral_centroid, 0.0);
    }
}
