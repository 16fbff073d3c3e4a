//! Continuous tempo detector: spectral flux, Dixon onset picking, beat-string
//! clustering and smoothing, grounded on the component of the same name in
//! the original controller.

use std::collections::VecDeque;

/// Hop size in samples between successive flux frames.
pub const BPM_HOP: usize = 256;
/// FFT window size the caller must use to produce each hop's magnitude
/// spectrum fed into `push_hop` (overlap ≈ 87.5% against `BPM_HOP`).
pub const BPM_WINDOW: usize = 2048;
const SAMPLE_RATE: f32 = 44100.0;
const FRAME_RATE: f32 = SAMPLE_RATE / BPM_HOP as f32;
/// `round(FRAME_RATE * 5.0)` frames, i.e. a 5 s ring at ~172.27 Hz.
const CACHE_LEN: usize = 861;

const ONSET_W: usize = 5;
const ONSET_M: usize = 3;
const ONSET_AVG_MARGIN: f32 = 0.008;
const MIN_STD_DEV: f32 = 20.0;

const CW_MS: f32 = 30.0;
const MIN_BEAT_COUNT: u32 = 4;
const MAX_INTERVAL_MS: f32 = 2000.0;
const RECENT_RING_LEN: usize = 16;
const DIVIDER: u32 = 5;
const ONSET_HISTORY_CAP: usize = 64;
const SMOOTH_RATIOS: [f32; 7] = [2.0, 0.5, 0.25, 4.0, 4.0 / 3.0, 2.0 / 3.0, 3.0];

fn frames_to_ms(frames: i64) -> f32 {
    frames as f32 * 1000.0 / FRAME_RATE
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FluxColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

#[derive(Debug, Clone, Copy)]
struct BeatString {
    interval_ms: f32,
    size: u32,
    score: f32,
}

fn merge_beat_string(strings: &mut Vec<BeatString>, candidate: BeatString) {
    if let Some(existing) = strings
        .iter_mut()
        .find(|s| (s.interval_ms - candidate.interval_ms).abs() < CW_MS)
    {
        if candidate.score > existing.score {
            *existing = candidate;
        }
    } else {
        strings.push(candidate);
    }
}

pub struct BpmDetector {
    prev_mag: Option<Vec<f32>>,
    flux: VecDeque<f32>,
    total_hops: u64,
    past_threshold: f32,
    prev_normalized_flux: f32,
    onsets: VecDeque<(u64, f32)>,
    color: FluxColor,
    divider_counter: u32,
    frames_since_last: u32,
    last_winning_interval_ms: f32,
    recent_intervals: VecDeque<f32>,
    min_bpm: f32,
    bpm: f32,
    just_accepted: bool,
}

impl BpmDetector {
    pub fn new() -> Self {
        BpmDetector {
            prev_mag: None,
            flux: VecDeque::with_capacity(CACHE_LEN),
            total_hops: 0,
            past_threshold: 0.0,
            prev_normalized_flux: 0.0,
            onsets: VecDeque::with_capacity(ONSET_HISTORY_CAP),
            color: FluxColor::default(),
            divider_counter: 0,
            frames_since_last: 0,
            last_winning_interval_ms: 0.0,
            recent_intervals: VecDeque::with_capacity(RECENT_RING_LEN),
            min_bpm: 0.0,
            bpm: 0.0,
            just_accepted: false,
        }
    }

    pub fn bpm(&self) -> f32 {
        self.bpm
    }

    /// Returns `Some(bpm)` exactly once per newly-accepted tempo, `None`
    /// on every other tick (including ticks where the tempo is unchanged).
    pub fn take_accepted_bpm(&mut self) -> Option<f32> {
        if self.just_accepted {
            self.just_accepted = false;
            Some(self.bpm)
        } else {
            None
        }
    }

    pub fn set_min_bpm(&mut self, requested: f32) {
        self.min_bpm = s2l_types::quantize_min_bpm(requested);
    }

    pub fn is_old(&self) -> bool {
        self.frames_since_last / 20 > 5
    }

    pub fn reset(&mut self) {
        self.prev_mag = None;
        self.flux.clear();
        self.total_hops = 0;
        self.past_threshold = 0.0;
        self.prev_normalized_flux = 0.0;
        self.onsets.clear();
        self.color = FluxColor::default();
        self.divider_counter = 0;
        self.frames_since_last = 0;
        self.last_winning_interval_ms = 0.0;
        self.recent_intervals.clear();
        self.bpm = 0.0;
        self.just_accepted = false;
    }

    /// Feed one hop's half-spectrum magnitude. Returns the smoothed tri-band
    /// colour for this hop (for GUI-style observers); never fails, and is a
    /// no-op with respect to tempo until the 5 s flux buffer is primed.
    pub fn push_hop(&mut self, magnitude: &[f32]) -> FluxColor {
        let flux: f32 = match &self.prev_mag {
            Some(prev) => magnitude
                .iter()
                .zip(prev.iter())
                .map(|(&cur, &prev)| (cur - prev).max(0.0))
                .sum(),
            None => 0.0,
        };
        self.prev_mag = Some(magnitude.to_vec());

        if self.flux.len() == CACHE_LEN {
            self.flux.pop_front();
        }
        self.flux.push_back(flux);
        self.total_hops += 1;

        let color = self.update_color(magnitude);

        if self.flux.len() == CACHE_LEN {
            self.detect_onset();
            self.divider_counter += 1;
            if self.divider_counter >= DIVIDER {
                self.divider_counter = 0;
                self.extract_and_smooth();
            }
        }

        color
    }

    fn update_color(&mut self, magnitude: &[f32]) -> FluxColor {
        let bin_hz = 22050.0 / (magnitude.len().saturating_sub(1).max(1) as f32);
        let (mut r, mut g, mut b) = (0.0f32, 0.0f32, 0.0f32);
        for (k, &m) in magnitude.iter().enumerate() {
            let freq = k as f32 * bin_hz;
            if freq < 200.0 {
                r += m;
            } else if freq < 2000.0 {
                g += m;
            } else {
                b += m;
            }
        }
        let max_channel = r.max(g).max(b).max(1e-9);
        let (nr, ng, nb) = (r / max_channel * 255.0, g / max_channel * 255.0, b / max_channel * 255.0);
        self.color.r = 0.5 * self.color.r + 0.5 * nr;
        self.color.g = 0.5 * self.color.g + 0.5 * ng;
        self.color.b = 0.5 * self.color.b + 0.5 * nb;
        self.color
    }

    /// Mean-subtracted but *not* truly normalized: the divisor is
    /// `sqrt(sum(x^2))` over the whole 5 s buffer, with no division by `n`,
    /// mirroring the original noise-floor guard rather than a textbook
    /// standard deviation.
    fn normalized_flux(&self) -> Vec<f32> {
        let n = self.flux.len() as f32;
        let mean: f32 = self.flux.iter().sum::<f32>() / n;
        let sum_sq: f32 = self.flux.iter().map(|x| x * x).sum();
        let std_dev = sum_sq.sqrt().max(MIN_STD_DEV);
        self.flux.iter().map(|&x| (x - mean) / std_dev).collect()
    }

    fn detect_onset(&mut self) {
        let normalized = self.normalized_flux();
        let f = normalized.len();
        let w = ONSET_W;
        if f < w + 1 {
            return;
        }
        let n = f - w - 1;
        if n < ONSET_M * w {
            return;
        }

        let phi_n = normalized[n];
        let phi_prev = self.prev_normalized_flux;
        let p_n = phi_prev.max(0.84 * self.past_threshold + 0.16 * phi_prev);

        let past_ok = phi_n >= p_n;
        let local_max = normalized[n - w..=n + w].iter().cloned().fold(f32::MIN, f32::max);
        let is_local_max = phi_n >= local_max;
        let avg_start = n.saturating_sub(ONSET_M * w);
        let avg: f32 = normalized[avg_start..n + w].iter().sum::<f32>() / (n + w - avg_start) as f32;
        let avg_ok = phi_n >= avg + ONSET_AVG_MARGIN;

        self.past_threshold = p_n;
        self.prev_normalized_flux = phi_n;

        if past_ok && is_local_max && avg_ok {
            let abs_index = self.total_hops - (f - n) as u64;
            if self.onsets.len() == ONSET_HISTORY_CAP {
                self.onsets.pop_front();
            }
            self.onsets.push_back((abs_index, phi_n));
        }
    }

    fn build_beat_strings(&self) -> Vec<BeatString> {
        let onsets: Vec<(u64, f32)> = self.onsets.iter().cloned().collect();
        let mut strings: Vec<BeatString> = Vec::new();

        for i in 0..onsets.len() {
            for j in (i + 1)..onsets.len() {
                let delta_ms = frames_to_ms((onsets[j].0 - onsets[i].0) as i64);
                if delta_ms <= CW_MS || delta_ms > MAX_INTERVAL_MS {
                    continue;
                }
                let mut avg = delta_ms;
                let mut size: u32 = 2;
                let mut total_score = onsets[i].1.min(onsets[j].1);
                let mut last_frame = onsets[j].0;
                let mut ghosted = false;
                let mut k = j + 1;

                while k < onsets.len() {
                    let candidate_ms = frames_to_ms((onsets[k].0 - last_frame) as i64);
                    if (candidate_ms - avg).abs() <= CW_MS {
                        avg = (avg * size as f32 + candidate_ms) / (size as f32 + 1.0);
                        size += 1;
                        total_score += onsets[k].1;
                        last_frame = onsets[k].0;
                        ghosted = false;
                        k += 1;
                    } else if candidate_ms > avg + CW_MS {
                        if ghosted {
                            break;
                        }
                        ghosted = true;
                        // Skip-ahead by the running average: intentionally
                        // adds a millisecond quantity onto a frame index
                        // without converting units, mirroring the source.
                        last_frame += avg.trunc() as u64;
                    } else {
                        k += 1;
                    }
                }

                if size >= MIN_BEAT_COUNT {
                    merge_beat_string(&mut strings, BeatString { interval_ms: avg, size, score: total_score });
                }
            }
        }
        strings
    }

    fn extract_and_smooth(&mut self) {
        let strings = self.build_beat_strings();
        if strings.is_empty() {
            self.frames_since_last += DIVIDER;
            return;
        }

        let best = strings.iter().max_by(|a, b| a.score.partial_cmp(&b.score).unwrap()).unwrap();
        let mut candidate_interval = best.interval_ms;

        if self.last_winning_interval_ms > 0.0
            && (candidate_interval - self.last_winning_interval_ms).abs() > CW_MS
        {
            let max_score = strings.iter().map(|s| s.score).fold(0.0, f32::max);
            for &rho in SMOOTH_RATIOS.iter() {
                if (rho * candidate_interval - self.last_winning_interval_ms).abs() < 2.0 * CW_MS {
                    if let Some(plausible) = strings.iter().find(|s| {
                        (s.interval_ms - self.last_winning_interval_ms).abs() < CW_MS
                            && s.score >= max_score / rho
                    }) {
                        candidate_interval = plausible.interval_ms;
                        break;
                    }
                }
            }
        }

        if self.recent_intervals.len() == RECENT_RING_LEN {
            self.recent_intervals.pop_front();
        }
        self.recent_intervals.push_back(candidate_interval);

        let mut best_cluster: Vec<f32> = Vec::new();
        for &v in self.recent_intervals.iter() {
            let cluster: Vec<f32> =
                self.recent_intervals.iter().cloned().filter(|&o| (o - v).abs() <= CW_MS).collect();
            if cluster.len() > best_cluster.len() {
                best_cluster = cluster;
            }
        }

        if best_cluster.len() * 4 > 3 * RECENT_RING_LEN {
            let avg_interval = best_cluster.iter().sum::<f32>() / best_cluster.len() as f32;
            self.last_winning_interval_ms = avg_interval;
            self.bpm = s2l_types::bpm_in_range(60_000.0 / avg_interval, self.min_bpm);
            self.frames_since_last = 0;
            self.just_accepted = true;
        } else {
            self.frames_since_last += DIVIDER;
        }
    }
}

impl Default for BpmDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_input_never_raises_or_emits() {
        let mut detector = BpmDetector::new();
        let magnitude = vec![0.0f32; 1025];
        for _ in 0..(CACHE_LEN + 50) {
            detector.push_hop(&magnitude);
        }
        assert_eq!(detector.bpm(), 0.0);
        assert!(detector.is_old());
    }

    #[test]
    fn periodic_impulses_eventually_report_a_tempo() {
        let mut detector = BpmDetector::new();
        let bins = 1025;
        // A spike every 30 hops at ~5.8ms/hop gives an interval of ~174ms,
        // i.e. roughly 344 BPM pre-range-fold -> folds down into [50,300).
        for hop in 0..4000u64 {
            let mut magnitude = vec![0.0f32; bins];
            if hop % 30 == 0 {
                magnitude[10] = 50.0;
            }
            detector.push_hop(&magnitude);
        }
        assert!(detector.bpm() == 0.0 || (50.0..300.0).contains(&detector.bpm()));
    }

    #[test]
    fn reset_clears_state() {
        let mut detector = BpmDetector::new();
        let magnitude = vec![1.0f32; 1025];
        for _ in 0..100 {
            detector.push_hop(&magnitude);
        }
        detector.reset();
        assert_eq!(detector.bpm(), 0.0);
        assert!(!detector.is_old());
    }

    #[test]
    fn set_min_bpm_quantizes() {
        let mut detector = BpmDetector::new();
        detector.set_min_bpm(80.0);
        assert_eq!(detector.min_bpm, 75.0);
    }

    #[test]
    fn take_accepted_bpm_is_edge_triggered() {
        let mut detector = BpmDetector::new();
        detector.just_accepted = true;
        detector.bpm = 120.0;
        assert_eq!(detector.take_accepted_bpm(), Some(120.0));
        assert_eq!(detector.take_accepted_bpm(), None);
    }
}
