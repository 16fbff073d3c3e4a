//! Fixed-rate tick accumulator: decides which of the three periodic steps
//! (spectrum analysis, tempo hop, level feedback) are due after each chunk
//! of elapsed wall-clock time, independent of how often the caller polls.

use std::time::Duration;

const ANALYSIS_HZ: f64 = 44.0;
const BPM_HZ: f64 = 20.0;
const LEVEL_FEEDBACK_HZ: f64 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Analysis,
    Bpm,
    LevelFeedback,
}

/// One fractional accumulator per cadence, each draining independently so a
/// slow poll interval still yields every tick that was due, in order.
pub struct Scheduler {
    analysis_accumulator: f64,
    bpm_accumulator: f64,
    level_feedback_accumulator: f64,
}

impl Scheduler {
    pub fn new() -> Self {
        Scheduler { analysis_accumulator: 0.0, bpm_accumulator: 0.0, level_feedback_accumulator: 0.0 }
    }

    /// Advance by `elapsed` and return every tick now due, oldest first.
    pub fn advance(&mut self, elapsed: Duration) -> Vec<Tick> {
        let secs = elapsed.as_secs_f64();
        self.analysis_accumulator += secs;
        self.bpm_accumulator += secs;
        self.level_feedback_accumulator += secs;

        let mut due = Vec::new();
        let analysis_period = 1.0 / ANALYSIS_HZ;
        let bpm_period = 1.0 / BPM_HZ;
        let level_feedback_period = 1.0 / LEVEL_FEEDBACK_HZ;

        while self.analysis_accumulator >= analysis_period {
            self.analysis_accumulator -= analysis_period;
            due.push(Tick::Analysis);
        }
        while self.bpm_accumulator >= bpm_period {
            self.bpm_accumulator -= bpm_period;
            due.push(Tick::Bpm);
        }
        while self.level_feedback_accumulator >= level_feedback_period {
            self.level_feedback_accumulator -= level_feedback_period;
            due.push(Tick::LevelFeedback);
        }
        due
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_fires_roughly_every_23ms() {
        let mut scheduler = Scheduler::new();
        let due = scheduler.advance(Duration::from_millis(23));
        assert_eq!(due, vec![Tick::Analysis]);
    }

    #[test]
    fn one_second_yields_expected_counts_of_each() {
        let mut scheduler = Scheduler::new();
        let due = scheduler.advance(Duration::from_secs(1));
        assert_eq!(due.iter().filter(|t| **t == Tick::Analysis).count(), 44);
        assert_eq!(due.iter().filter(|t| **t == Tick::Bpm).count(), 20);
        assert_eq!(due.iter().filter(|t| **t == Tick::LevelFeedback).count(), 15);
    }

    #[test]
    fn accumulator_carries_remainder_across_calls() {
        let mut scheduler = Scheduler::new();
        scheduler.advance(Duration::from_millis(10));
        let due = scheduler.advance(Duration::from_millis(13));
        assert_eq!(due, vec![Tick::Analysis]);
    }
}
