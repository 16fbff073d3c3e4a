//! User-defined BPM message templates, fanned out whenever the tempo
//! detectors accept a new value.

use s2l_types::OscSink;

const TOKENS: [(&str, f32); 12] = [
    ("<BPM1-32>", 1.0 / 32.0),
    ("<BPM1-16>", 1.0 / 16.0),
    ("<BPM1-8>", 1.0 / 8.0),
    ("<BPM1-4>", 1.0 / 4.0),
    ("<BPM1-2>", 1.0 / 2.0),
    ("<BPM32>", 32.0),
    ("<BPM16>", 16.0),
    ("<BPM8>", 8.0),
    ("<BPM4>", 4.0),
    ("<BPM2>", 2.0),
    ("<BPM1>", 1.0),
    ("<BPM>", 1.0),
];

fn format_token(bpm: f32, factor: f32) -> String {
    let rounded = (bpm * factor).round().max(0.0) as i64;
    format!("0{rounded}")
}

fn substitute(template: &str, bpm: f32) -> String {
    let mut out = template.to_string();
    for (token, factor) in TOKENS.iter() {
        if out.contains(token) {
            out = out.replace(token, &format_token(bpm, *factor));
        }
    }
    out
}

pub struct BpmOscController {
    templates: Vec<String>,
    mute: bool,
}

impl BpmOscController {
    pub fn new(templates: Vec<String>) -> Self {
        BpmOscController { templates, mute: false }
    }

    pub fn set_mute(&mut self, mute: bool, sink: &mut dyn OscSink) {
        if mute == self.mute {
            return;
        }
        self.mute = mute;
        sink.send(&format!("/s2l/out/bpm/mute={}", mute as u8), false);
    }

    /// Fan out one accepted tempo across every user template plus the
    /// always-on information message.
    pub fn on_tempo(&self, bpm: f32, sink: &mut dyn OscSink) {
        if !self.mute {
            for template in &self.templates {
                if template.contains("<BPM") {
                    sink.send(&substitute(template, bpm), false);
                }
            }
        }
        sink.send(&format!("/s2l/out/bpm={}", bpm.round() as i64), false);
    }
}
