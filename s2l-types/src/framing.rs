/// TCP stream framing mode, per OSC 1.0 (length-prefix) vs 1.1 (SLIP).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FramingMode {
    LengthPrefix,
    Slip,
}

impl Default for FramingMode {
    fn default() -> Self {
        FramingMode::LengthPrefix
    }
}
