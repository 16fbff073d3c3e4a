//! Trigger generator: threshold decision over the scaled spectrum, plus the
//! level-broadcast side channel, feeding a dedicated `TriggerFilter`.

use s2l_types::{OscSink, TriggerOscParams};

use crate::scaled_spectrum::ScaledSpectrum;
use crate::trigger_filter::{FilterState, TriggerFilter};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeneratorKind {
    Bandpass { center_hz: f32, width: f32 },
    LevelFullband,
    /// Fullband, always read inverted (`1 - value`).
    SilenceFullband,
}

pub struct TriggerGenerator {
    kind: GeneratorKind,
    threshold: f32,
    last_value: f32,
    is_active: bool,
    pub filter: TriggerFilter,
}

impl TriggerGenerator {
    pub fn new(kind: GeneratorKind, osc: TriggerOscParams) -> Self {
        let mut generator = TriggerGenerator {
            kind,
            threshold: 0.0,
            last_value: 0.0,
            is_active: false,
            filter: TriggerFilter::new(osc),
        };
        generator.reset_defaults();
        generator
    }

    pub fn is_bandpass(&self) -> bool {
        matches!(self.kind, GeneratorKind::Bandpass { .. })
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn set_threshold(&mut self, threshold: f32) {
        self.threshold = threshold.clamp(0.0, 1.0);
    }

    pub fn filter_mut(&mut self) -> &mut TriggerFilter {
        &mut self.filter
    }

    /// Reset threshold and delays to this kind's defaults.
    pub fn reset_defaults(&mut self) {
        match self.kind {
            GeneratorKind::Bandpass { .. } => {
                self.threshold = 0.5;
                self.filter.set_delays(0.0, 0.0, 0.0);
            }
            GeneratorKind::LevelFullband => {
                self.threshold = 0.1;
                self.filter.set_delays(0.5, 2.0, 0.0);
            }
            GeneratorKind::SilenceFullband => {
                self.threshold = 0.9;
                self.filter.set_delays(2.5, 1.0, 0.0);
            }
        }
    }

    fn value_from(&self, spectrum: &ScaledSpectrum) -> f32 {
        match self.kind {
            GeneratorKind::Bandpass { center_hz, width } => spectrum.max_level(center_hz, width),
            GeneratorKind::LevelFullband => spectrum.max_level_full(),
            GeneratorKind::SilenceFullband => 1.0 - spectrum.max_level_full(),
        }
    }

    /// One analysis tick: evaluate the threshold, drive the filter's edges
    /// and timers by `dt` seconds, broadcast the level if it moved enough,
    /// and return the post-tick active flag.
    pub fn tick(
        &mut self,
        spectrum: &ScaledSpectrum,
        force_release: bool,
        dt: f32,
        sink: &mut dyn OscSink,
    ) -> bool {
        let value = self.value_from(spectrum);

        if !self.is_active && value >= self.threshold && !force_release {
            self.is_active = true;
            self.filter.trigger_on();
        } else if (self.is_active && value < self.threshold) || force_release {
            self.is_active = false;
            self.filter.trigger_off();
        }

        if (self.last_value - value).abs() > 0.001
            && !self.filter.osc.level_message.is_empty()
            && self.threshold > 0.0
        {
            let fraction = (value / self.threshold).clamp(0.0, 1.0);
            let scaled = self.filter.osc.min_level
                + fraction * (self.filter.osc.max_level - self.filter.osc.min_level);
            let message = format!("{}{:.3}", self.filter.osc.level_message, scaled);
            sink.send(&message, false);
        }
        self.last_value = value;

        self.filter.step(dt, sink);
        self.filter.state() != FilterState::Idle
    }
}
