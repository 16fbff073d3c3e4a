//! Logarithmic frequency rebanding and automatic gain control, grounded on
//! the original `ScaledSpectrum` component's constants and update order.

use std::collections::VecDeque;

pub const DEFAULT_BASE_FREQ: f32 = 20.0;
pub const DEFAULT_LENGTH: usize = 200;
const NYQUIST: f32 = 22050.0;
/// Normalization constant for a 4096-sample FFT window's magnitude sums.
const MAX_FFT_VALUE: f32 = 96.0;

const AGC_AVERAGING_LENGTH: usize = 88;
const AGC_HEADROOM: f32 = 0.1;
const AGC_NOISE_THRESHOLD: f32 = 0.1;
const AGC_INCREMENT_STEPSIZE: f32 = 1.0 / (3.0 * 44.0);
const AGC_DECREMENT_STEPSIZE: f32 = 1.0 / (1.0 * 44.0);
const AGC_MIN_GAIN: f32 = 0.5;
const AGC_MAX_GAIN: f32 = 5.0;

pub struct ScaledSpectrum {
    base_freq: f32,
    length: usize,
    freq_scale_factor: f32,
    log_of_freq_scale_factor: f32,
    gain: f32,
    compression: f32,
    convert_to_db: bool,
    agc_enabled: bool,
    agc_history: VecDeque<f32>,
    spec: Vec<f32>,
}

impl ScaledSpectrum {
    pub fn new(base_freq: f32, length: usize) -> Self {
        let freq_scale_factor = (NYQUIST / base_freq).powf(1.0 / length as f32);
        let log_of_freq_scale_factor = (NYQUIST / base_freq).ln() / length as f32;
        ScaledSpectrum {
            base_freq,
            length,
            freq_scale_factor,
            log_of_freq_scale_factor,
            gain: 1.0,
            compression: 1.0,
            convert_to_db: false,
            agc_enabled: false,
            agc_history: VecDeque::with_capacity(AGC_AVERAGING_LENGTH),
            spec: vec![0.0; length],
        }
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain.clamp(AGC_MIN_GAIN, AGC_MAX_GAIN);
    }

    pub fn set_compression(&mut self, compression: f32) {
        self.compression = compression.max(0.01);
    }

    pub fn set_convert_to_db(&mut self, enabled: bool) {
        self.convert_to_db = enabled;
    }

    pub fn set_agc_enabled(&mut self, enabled: bool) {
        self.agc_enabled = enabled;
    }

    pub fn spec(&self) -> &[f32] {
        &self.spec
    }

    /// Rebin a linear half-spectrum (length `N/2`) into the `length`
    /// logarithmically-spaced output bins, then update AGC.
    pub fn update_with_linear_spectrum(&mut self, linear: &[f32]) {
        let linear_length = linear.len();
        let mut max_value = 0.0f32;
        for i in 0..self.length {
            let cur_freq = self.base_freq * self.freq_scale_factor.powf(i as f32);
            let next_freq = self.base_freq * self.freq_scale_factor.powf((i + 1) as f32);
            let mut start_index = ((cur_freq / NYQUIST) * linear_length as f32) as usize;
            let mut end_index = ((next_freq / NYQUIST) * linear_length as f32) as usize;
            start_index = start_index.min(linear_length.saturating_sub(1));
            end_index = end_index.clamp(start_index + 1, linear_length);

            let energy: f32 = linear[start_index..end_index].iter().sum();
            // `before_gain` feeds the AGC peak tracker and is deliberately left
            // unclamped here, matching the original's maxValue sampled ahead of
            // gain/compression; only `value` (what's stored in `spec`) is clamped.
            let (before_gain, value) = if self.convert_to_db {
                let db = 20.0 * (energy / MAX_FFT_VALUE).max(1e-9).log10();
                let before_gain = (db + 60.0) / 60.0;
                let value = (before_gain * self.gain).clamp(0.0, 1.0).powf(1.0 / self.compression);
                (before_gain, value)
            } else {
                let before_gain = energy / MAX_FFT_VALUE;
                let normalized = before_gain * self.gain;
                let value = normalized.clamp(0.0, 1.0).powf(1.0 / self.compression);
                (before_gain, value)
            };
            self.spec[i] = value;
            max_value = max_value.max(before_gain);
        }

        self.agc_history.push_back(max_value);
        if self.agc_history.len() > AGC_AVERAGING_LENGTH {
            self.agc_history.pop_front();
        }
        self.update_agc();
    }

    fn update_agc(&mut self) {
        if !self.agc_enabled {
            return;
        }
        let peak = self.agc_history.iter().cloned().fold(0.0f32, f32::max);
        if peak < AGC_NOISE_THRESHOLD || peak <= 0.0 {
            return;
        }
        let target = (1.0 - AGC_HEADROOM) / peak;
        if target > self.gain {
            self.gain = (self.gain + AGC_INCREMENT_STEPSIZE).min(target);
        } else if target < self.gain {
            self.gain = (self.gain - AGC_DECREMENT_STEPSIZE).max(target);
        }
        self.gain = self.gain.clamp(AGC_MIN_GAIN, AGC_MAX_GAIN);
    }

    pub fn index_for_freq(&self, freq: f32) -> usize {
        let idx = ((freq / self.base_freq).ln() / self.log_of_freq_scale_factor).round();
        idx.clamp(0.0, (self.length - 1) as f32) as usize
    }

    /// `x in [0,1]` maps to output-bin fraction; strictly increasing in `x`.
    pub fn freq_at_position(&self, x: f32) -> f32 {
        self.base_freq * self.freq_scale_factor.powf(x * self.length as f32)
    }

    pub fn max_level_full(&self) -> f32 {
        self.spec.iter().cloned().fold(0.0, f32::max)
    }

    /// Max of `spec[i]` for `i` in a window centered on `mid_hz`, covering a
    /// fraction `width` of the output length, clamped into range with
    /// `end >= start + 1`.
    pub fn max_level(&self, mid_hz: f32, width: f32) -> f32 {
        let mid_index = self.index_for_freq(mid_hz) as f32;
        let half = self.length as f32 * width / 2.0;
        let last = (self.length - 1) as i64;
        let mut start = (mid_index - half).round() as i64;
        let mut end = (mid_index + half).round() as i64;
        start = start.clamp(0, last);
        end = end.clamp(0, last);
        if end <= start {
            end = (start + 1).min(last);
        }
        self.spec[start as usize..=end as usize].iter().cloned().fold(0.0, f32::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make() -> ScaledSpectrum {
        ScaledSpectrum::new(DEFAULT_BASE_FREQ, DEFAULT_LENGTH)
    }

    #[test]
    fn index_for_freq_boundaries() {
        let s = make();
        assert_eq!(s.index_for_freq(DEFAULT_BASE_FREQ), 0);
        assert_eq!(s.index_for_freq(NYQUIST), DEFAULT_LENGTH - 1);
    }

    #[test]
    fn freq_at_position_strictly_increasing() {
        let s = make();
        let mut last = s.freq_at_position(0.0);
        for i in 1..=DEFAULT_LENGTH {
            let next = s.freq_at_position(i as f32 / DEFAULT_LENGTH as f32);
            assert!(next > last, "freq_at_position must be strictly increasing");
            last = next;
        }
    }

    #[test]
    fn agc_unchanged_below_noise_floor() {
        let mut s = make();
        s.set_agc_enabled(true);
        let before = s.gain();
        // Feed an all-silent linear spectrum repeatedly; per-frame max stays 0.
        let linear = vec![0.0f32; 2048];
        for _ in 0..200 {
            s.update_with_linear_spectrum(&linear);
        }
        assert_eq!(s.gain(), before);
    }

    #[test]
    fn agc_gain_stays_in_bounds() {
        let mut s = make();
        s.set_agc_enabled(true);
        let mut linear = vec![0.0f32; 2048];
        linear[100] = 500.0; // large spike -> small target gain
        for _ in 0..300 {
            s.update_with_linear_spectrum(&linear);
            assert!(s.gain() >= AGC_MIN_GAIN && s.gain() <= AGC_MAX_GAIN);
        }
    }

    #[test]
    fn s1_scenario_440hz_sine_peaks_near_its_bin() {
        use crate::fft_analyzer::{FftAnalyzer, FFT_WINDOW};
        use std::f32::consts::PI;

        let sample_rate = 44100.0f32;
        let freq = 440.0f32;
        let samples: Vec<f32> = (0..FFT_WINDOW)
            .map(|n| (2.0 * PI * freq * n as f32 / sample_rate).sin())
            .collect();
        let mut analyzer = FftAnalyzer::new();
        let mag = analyzer.analyze(&samples);

        let mut spectrum = make();
        spectrum.update_with_linear_spectrum(&mag[..FFT_WINDOW / 2]);

        let idx = spectrum.index_for_freq(freq);
        assert!(spectrum.spec()[idx] > spectrum.spec()[0]);

        let (peak_idx, _) = spectrum
            .spec()
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .unwrap();
        let peak_freq = spectrum.freq_at_position(peak_idx as f32 / DEFAULT_LENGTH as f32);
        let one_bin_hz = spectrum.freq_at_position(1.0 / DEFAULT_LENGTH as f32) - spectrum.base_freq;
        assert!((peak_freq - freq).abs() <= one_bin_hz.max(50.0));
    }
}
