//! Real-time audio analysis: ring buffer, FFT, scaled spectrum, trigger
//! state machines and tempo detection. Free of any networking dependency;
//! all OSC output goes through the `s2l_types::OscSink` trait.

mod bpm_detector;
mod bpm_tap;
mod fft_analyzer;
mod ring_buffer;
mod scaled_spectrum;
mod trigger_filter;
mod trigger_generator;

pub use bpm_detector::{BpmDetector, FluxColor, BPM_HOP, BPM_WINDOW};
pub use bpm_tap::BpmTapDetector;
pub use fft_analyzer::{FftAnalyzer, FFT_WINDOW};
pub use ring_buffer::MonoRingBuffer;
pub use scaled_spectrum::{ScaledSpectrum, DEFAULT_BASE_FREQ, DEFAULT_LENGTH};
pub use trigger_filter::{FilterState, TriggerFilter};
pub use trigger_generator::{GeneratorKind, TriggerGenerator};
