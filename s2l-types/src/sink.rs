/// The narrow interface DSP components need from the transport: fire a
/// message string, optionally bypassing the enabled gate. Kept abstract so
/// `s2l-dsp` never has to depend on `s2l-osc`; `s2l-osc::OscTransport`
/// implements this directly.
pub trait OscSink {
    fn send(&mut self, message: &str, forced: bool);
}

/// A no-op sink, useful for tests that only care about DSP state transitions.
#[derive(Default)]
pub struct NullSink {
    pub sent: Vec<(String, bool)>,
}

impl OscSink for NullSink {
    fn send(&mut self, message: &str, forced: bool) {
        self.sent.push((message.to_string(), forced));
    }
}
