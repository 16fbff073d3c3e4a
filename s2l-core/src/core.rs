//! The single owning context: ring buffer, spectrum, the six trigger
//! generators, and both tempo detectors. Per-tick steps take the transport
//! by reference rather than owning it, so networking stays swappable.

use s2l_dsp::{
    BpmDetector, BpmTapDetector, FftAnalyzer, GeneratorKind, MonoRingBuffer, ScaledSpectrum,
    TriggerGenerator, BPM_HOP, BPM_WINDOW, DEFAULT_BASE_FREQ, DEFAULT_LENGTH, FFT_WINDOW,
};
use s2l_osc::OscMessage;
use s2l_types::{Band, LevelObserver, OscSink, TriggerOscParams};

use crate::bpm_osc_controller::BpmOscController;
use crate::config::Config;
use crate::dispatch::{self, DispatchEffect};

/// Bandpass centers/widths for the four frequency-selective slots. Not
/// config-driven (the embedded defaults only cover threshold/delays); these
/// match a typical four-band split of the audible range.
const BANDPASS_PARAMS: [(Band, f32, f32); 4] = [
    (Band::Bass, 80.0, 0.15),
    (Band::LoMid, 400.0, 0.15),
    (Band::HiMid, 1500.0, 0.2),
    (Band::High, 6000.0, 0.25),
];

fn generator_kind(band: Band) -> GeneratorKind {
    if let Some(&(_, center_hz, width)) = BANDPASS_PARAMS.iter().find(|(b, _, _)| *b == band) {
        GeneratorKind::Bandpass { center_hz, width }
    } else if band == Band::Envelope {
        GeneratorKind::LevelFullband
    } else {
        GeneratorKind::SilenceFullband
    }
}

fn make_generator(band: Band, config: &Config) -> TriggerGenerator {
    let defaults = config.trigger_defaults(band);
    let osc = TriggerOscParams {
        level_message: format!("/s2l/out/{}", band.osc_suffix()),
        label: band.osc_suffix().to_string(),
        ..Default::default()
    };
    let mut generator = TriggerGenerator::new(generator_kind(band), osc);
    generator.set_threshold(defaults.threshold);
    generator.filter_mut().set_delays(defaults.on_delay, defaults.off_delay, defaults.max_hold);
    generator
}

pub struct Core {
    ring: MonoRingBuffer,
    spectrum_fft: FftAnalyzer,
    bpm_fft: FftAnalyzer,
    spectrum: ScaledSpectrum,
    generators: Vec<(Band, TriggerGenerator)>,
    low_solo: bool,
    bpm_detector: BpmDetector,
    bpm_tap: BpmTapDetector,
    bpm_osc: BpmOscController,
    osc_enabled: bool,
    bpm_active: bool,
    level_feedback_enabled: bool,
    bpm_next_start: u64,
}

impl Core {
    pub fn new(config: &Config, ring_capacity: usize, bpm_templates: Vec<String>) -> Self {
        let mut spectrum = ScaledSpectrum::new(DEFAULT_BASE_FREQ, DEFAULT_LENGTH);
        spectrum.set_agc_enabled(config.agc_enabled());

        let generators = Band::ALL.iter().map(|&band| (band, make_generator(band, config))).collect();

        let mut bpm_detector = BpmDetector::new();
        bpm_detector.set_min_bpm(config.min_bpm());
        let mut bpm_tap = BpmTapDetector::new();
        bpm_tap.set_min_bpm(config.min_bpm());

        Core {
            ring: MonoRingBuffer::new(ring_capacity),
            spectrum_fft: FftAnalyzer::new(),
            bpm_fft: FftAnalyzer::with_window(BPM_WINDOW),
            spectrum,
            generators,
            low_solo: true,
            bpm_detector,
            bpm_tap,
            bpm_osc: BpmOscController::new(bpm_templates),
            osc_enabled: true,
            bpm_active: true,
            level_feedback_enabled: false,
            bpm_next_start: 0,
        }
    }

    pub fn push_audio(&mut self, samples: &[f32], channel_count: usize) {
        self.ring.put(samples, channel_count);
    }

    pub fn osc_enabled(&self) -> bool {
        self.osc_enabled
    }

    pub fn set_min_bpm(&mut self, requested: f32) {
        self.bpm_detector.set_min_bpm(requested);
        self.bpm_tap.set_min_bpm(requested);
    }

    /// One FFT-rate (≈44 Hz) analysis tick: FFT → triggers → filters → OSC,
    /// in that fixed order. No-ops (returns `false`) until the ring holds a
    /// full visualization window.
    pub fn analysis_tick(&mut self, sink: &mut dyn OscSink, observer: &mut dyn LevelObserver) -> bool {
        if self.ring.total_put() < FFT_WINDOW as u64 {
            return false;
        }
        let mut samples = vec![0.0f32; FFT_WINDOW];
        self.ring.copy_latest(FFT_WINDOW, &mut samples);
        let magnitude = self.spectrum_fft.analyze(&samples);
        self.spectrum.update_with_linear_spectrum(&magnitude[..FFT_WINDOW / 2]);

        let dt = FFT_WINDOW as f32 / 44_100.0;
        let mut bandpass_fired = false;
        for (band, generator) in self.generators.iter_mut() {
            let force_release = self.low_solo && band.is_bandpass() && bandpass_fired;
            let active = generator.tick(&self.spectrum, force_release, dt, sink);
            if generator.is_bandpass() && active {
                bandpass_fired = true;
            }
        }

        for (band, generator) in self.generators.iter() {
            observer.on_level(*band, generator_observed_value(&self.spectrum, *band));
        }
        true
    }

    /// Drains every complete BPM hop window currently available in the ring.
    pub fn bpm_tick(&mut self, sink: &mut dyn OscSink) {
        if !self.bpm_active {
            return;
        }
        while self.ring.total_put() >= self.bpm_next_start + BPM_WINDOW as u64 {
            let mut window = vec![0.0f32; BPM_WINDOW];
            for (k, slot) in window.iter_mut().enumerate() {
                *slot = self.ring.at(self.bpm_next_start + k as u64);
            }
            let magnitude = self.bpm_fft.analyze(&window);
            self.bpm_detector.push_hop(&magnitude);
            self.bpm_next_start += BPM_HOP as u64;

            if let Some(bpm) = self.bpm_detector.take_accepted_bpm() {
                self.bpm_osc.on_tempo(bpm, sink);
            }
        }
    }

    pub fn tap(&mut self, now_seconds: f64, sink: &mut dyn OscSink) {
        self.bpm_tap.tap(now_seconds, sink);
    }

    /// The 15 Hz feedback tick: bass → lo_mid → hi_mid → high → envelope →
    /// silence, each as a 3-decimal string, gated on the feedback toggle.
    pub fn level_feedback_tick(&self, sink: &mut dyn OscSink) {
        if !self.level_feedback_enabled {
            return;
        }
        for (band, _generator) in self.generators.iter() {
            let value = generator_observed_value(&self.spectrum, *band);
            sink.send(&format!("/s2l/out/{}={:.3}", band.osc_suffix(), value), false);
        }
    }

    /// `now_seconds` is the same monotonic clock `tap` is otherwise driven by
    /// (seconds since some fixed origin); an incoming `/s2l/bpm/tap` message
    /// registers a tap at that instant exactly as a direct `tap()` call would.
    pub fn handle_incoming(&mut self, message: &OscMessage, now_seconds: f64, sink: &mut dyn OscSink) {
        match dispatch::dispatch(message) {
            DispatchEffect::SetEnabled(v) => self.set_osc_enabled(v, sink),
            DispatchEffect::ToggleEnabled => {
                let next = !self.osc_enabled;
                self.set_osc_enabled(next, sink);
            }
            DispatchEffect::SetLevelFeedback(v) => self.set_level_feedback(v, sink),
            DispatchEffect::ToggleLevelFeedback => {
                let next = !self.level_feedback_enabled;
                self.set_level_feedback(next, sink);
            }
            DispatchEffect::LoadPreset(_name) => {
                // Preset I/O is delegated outside the core; nothing to do here.
            }
            DispatchEffect::SetBpmEnabled(v) => {
                self.bpm_active = v;
                sink.send(&format!("/s2l/out/bpm/enabled={}", v as u8), false);
            }
            DispatchEffect::ToggleBpmEnabled => {
                self.bpm_active = !self.bpm_active;
                sink.send(&format!("/s2l/out/bpm/enabled={}", self.bpm_active as u8), false);
            }
            DispatchEffect::SetMinBpm(requested) => {
                self.set_min_bpm(requested as f32);
                let quantized = s2l_types::quantize_min_bpm(requested as f32);
                sink.send(&format!("/s2l/out/bpm/range={}", quantized.round() as i64), false);
            }
            DispatchEffect::Tap => self.tap(now_seconds, sink),
            DispatchEffect::Unrecognized => {}
        }
    }

    fn set_osc_enabled(&mut self, enabled: bool, sink: &mut dyn OscSink) {
        self.osc_enabled = enabled;
        sink.send(&format!("/s2l/out/enabled={}", enabled as u8), true);
    }

    fn set_level_feedback(&mut self, enabled: bool, sink: &mut dyn OscSink) {
        self.level_feedback_enabled = enabled;
        sink.send(&format!("/s2l/out/level_feedback={}", enabled as u8), false);
    }
}

fn generator_observed_value(spectrum: &ScaledSpectrum, band: Band) -> f32 {
    if let Some(&(_, center_hz, width)) = BANDPASS_PARAMS.iter().find(|(b, _, _)| *b == band) {
        spectrum.max_level(center_hz, width)
    } else {
        spectrum.max_level_full()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use s2l_types::{NullObserver, NullSink};

    #[test]
    fn analysis_tick_is_a_noop_until_primed() {
        let config = Config::load();
        let mut core = Core::new(&config, 4 * FFT_WINDOW, vec![]);
        let mut sink = NullSink::default();
        let mut observer = NullObserver;
        assert!(!core.analysis_tick(&mut sink, &mut observer));
    }

    #[test]
    fn analysis_tick_runs_once_ring_is_full() {
        let config = Config::load();
        let mut core = Core::new(&config, 4 * FFT_WINDOW, vec![]);
        let mut sink = NullSink::default();
        let mut observer = NullObserver;
        core.push_audio(&vec![0.0f32; FFT_WINDOW], 1);
        assert!(core.analysis_tick(&mut sink, &mut observer));
    }

    #[test]
    fn s6_bpm_range_message_quantizes_and_echoes() {
        let config = Config::load();
        let mut core = Core::new(&config, 4 * FFT_WINDOW, vec![]);
        let mut sink = NullSink::default();
        let message = OscMessage::new("/s2l/bpm/range", vec![s2l_osc::OscValue::Int(80)]);
        core.handle_incoming(&message, 0.0, &mut sink);
        assert_eq!(sink.sent.last().unwrap().0, "/s2l/out/bpm/range=75");
    }

    #[test]
    fn toggle_enabled_flips_and_echoes_forced() {
        let config = Config::load();
        let mut core = Core::new(&config, 4 * FFT_WINDOW, vec![]);
        let mut sink = NullSink::default();
        assert!(core.osc_enabled());
        let message = OscMessage::new("/s2l/enabled/toggle", vec![]);
        core.handle_incoming(&message, 0.0, &mut sink);
        assert!(!core.osc_enabled());
        assert_eq!(sink.sent.last().unwrap(), &("/s2l/out/enabled=0".to_string(), true));
    }

    #[test]
    fn incoming_tap_registers_against_the_supplied_clock() {
        let config = Config::load();
        let mut core = Core::new(&config, 4 * FFT_WINDOW, vec![]);
        let mut sink = NullSink::default();
        let tap = OscMessage::new("/s2l/bpm/tap", vec![]);
        core.handle_incoming(&tap, 0.0, &mut sink);
        core.handle_incoming(&tap, 0.5, &mut sink);
        core.handle_incoming(&tap, 1.0, &mut sink);
        assert_eq!(sink.sent.last().unwrap().0, "/s2l/out/bpm=120");
    }
}
