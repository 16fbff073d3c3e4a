//! Windowed real FFT producing half-spectrum magnitudes for the scaled
//! spectrum stage.

use realfft::num_complex::Complex32;
use realfft::{RealFftPlanner, RealToComplex};
use std::sync::Arc;

pub const FFT_WINDOW: usize = 4096;

pub struct FftAnalyzer {
    window_len: usize,
    window: Vec<f32>,
    fft: Arc<dyn RealToComplex<f32>>,
    input_scratch: Vec<f32>,
    output_scratch: Vec<Complex32>,
}

impl FftAnalyzer {
    pub fn new() -> Self {
        Self::with_window(FFT_WINDOW)
    }

    /// Build an analyzer for an arbitrary window length, e.g. the shorter
    /// hop-synchronous window the continuous tempo detector runs on.
    pub fn with_window(window_len: usize) -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(window_len);
        let window: Vec<f32> = apodize::hanning_iter(window_len).map(|v| v as f32).collect();
        let input_scratch = fft.make_input_vec();
        let output_scratch = fft.make_output_vec();
        FftAnalyzer { window_len, window, fft, input_scratch, output_scratch }
    }

    /// Window `samples` (must match this analyzer's window length), run the
    /// forward real FFT, and return half-spectrum magnitudes `mag[k] =
    /// sqrt(re^2+im^2)/10`, with `mag[0]` forced to 0.
    pub fn analyze(&mut self, samples: &[f32]) -> Vec<f32> {
        assert_eq!(samples.len(), self.window_len);
        for (dst, (&s, &w)) in self.input_scratch.iter_mut().zip(samples.iter().zip(self.window.iter())) {
            *dst = s * w;
        }
        self.fft
            .process(&mut self.input_scratch, &mut self.output_scratch)
            .expect("fixed-size fft process should not fail");
        let mut mag: Vec<f32> = self.output_scratch.iter().map(|c| c.norm() / 10.0).collect();
        mag[0] = 0.0;
        mag
    }
}

impl Default for FftAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn sine_tone_peaks_near_its_own_bin() {
        let sample_rate = 44100.0f32;
        let freq = 440.0f32;
        let samples: Vec<f32> = (0..FFT_WINDOW)
            .map(|n| (2.0 * PI * freq * n as f32 / sample_rate).sin())
            .collect();
        let mut analyzer = FftAnalyzer::new();
        let mag = analyzer.analyze(&samples);

        let bin_hz = sample_rate / FFT_WINDOW as f32;
        let expected_bin = (freq / bin_hz).round() as usize;
        let (peak_bin, _) = mag
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .unwrap();
        assert!(
            (peak_bin as i64 - expected_bin as i64).abs() <= 1,
            "peak bin {peak_bin} not within 1 of expected {expected_bin}"
        );
        assert_eq!(mag[0], 0.0);
    }
}
