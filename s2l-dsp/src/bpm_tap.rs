//! Tap-tempo: a tiny companion to the continuous detector driven entirely by
//! user-issued taps instead of spectral analysis.

use std::collections::VecDeque;

use s2l_types::OscSink;

const MIN_BPM_TAP: f32 = 30.0;
const STALE_AFTER_SECONDS: f64 = 60.0 / MIN_BPM_TAP as f64;
const HISTORY_LEN: usize = 3;

pub struct BpmTapDetector {
    history: VecDeque<f64>,
    min_bpm: f32,
    bpm: f32,
}

impl BpmTapDetector {
    pub fn new() -> Self {
        BpmTapDetector { history: VecDeque::with_capacity(HISTORY_LEN), min_bpm: 0.0, bpm: 0.0 }
    }

    pub fn bpm(&self) -> f32 {
        self.bpm
    }

    pub fn set_min_bpm(&mut self, requested: f32) {
        self.min_bpm = s2l_types::quantize_min_bpm(requested);
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.bpm = 0.0;
    }

    /// Register a tap at `now` (monotonic seconds since some fixed origin).
    /// Emits a tempo OSC message once at least two taps are in history.
    pub fn tap(&mut self, now: f64, sink: &mut dyn OscSink) {
        if let Some(&last) = self.history.back() {
            if now - last > STALE_AFTER_SECONDS {
                self.history.clear();
            }
        }
        if self.history.len() == HISTORY_LEN {
            self.history.pop_front();
        }
        self.history.push_back(now);

        if self.history.len() < 2 {
            return;
        }
        let intervals: Vec<f64> = self.history.iter().zip(self.history.iter().skip(1)).map(|(a, b)| b - a).collect();
        let mean_interval = intervals.iter().sum::<f64>() / intervals.len() as f64;
        self.bpm = s2l_types::bpm_in_range(60.0 / mean_interval as f32, self.min_bpm);
        sink.send(&format!("/s2l/out/bpm={}", self.bpm.round() as i32), false);
    }
}

impl Default for BpmTapDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use s2l_types::NullSink;

    #[test]
    fn s3_scenario_three_even_taps_then_a_stale_fourth() {
        let mut detector = BpmTapDetector::new();
        let mut sink = NullSink::default();

        detector.tap(0.0, &mut sink);
        assert!(sink.sent.is_empty());
        detector.tap(0.5, &mut sink);
        detector.tap(1.0, &mut sink);
        assert_eq!(detector.bpm(), 120.0);
        assert_eq!(sink.sent.last().unwrap().0, "/s2l/out/bpm=120");

        let sent_before_fourth = sink.sent.len();
        detector.tap(4.0, &mut sink);
        // Reset by staleness, only one timestamp in history: no new message.
        assert_eq!(sink.sent.len(), sent_before_fourth);
    }

    #[test]
    fn reset_clears_history_and_bpm() {
        let mut detector = BpmTapDetector::new();
        let mut sink = NullSink::default();
        detector.tap(0.0, &mut sink);
        detector.tap(0.4, &mut sink);
        assert!(detector.bpm() > 0.0);
        detector.reset();
        assert_eq!(detector.bpm(), 0.0);
    }
}
