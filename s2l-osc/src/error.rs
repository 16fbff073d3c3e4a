use std::fmt;

/// Error kinds the wire codec and transport can raise. DSP layers have no
/// equivalent — they clamp rather than fail.
#[derive(Debug)]
pub enum OscError {
    /// Socket bind/connect/send/recv failure.
    TransportFailure(String),
    /// Bad packet: wrong length, missing SLIP END, unknown type tag char.
    MalformedPacket(String),
    /// A bundle element's declared size exceeds the bytes remaining.
    BundleMalformed { declared: i32, remaining: usize },
    /// A type-tag character with no decoder.
    UnsupportedArgument(char),
    /// The capture device can't be matched to mono/44.1kHz/16-bit.
    AudioFormatUnsupported(String),
}

impl fmt::Display for OscError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OscError::TransportFailure(msg) => write!(f, "osc transport failure: {msg}"),
            OscError::MalformedPacket(msg) => write!(f, "malformed osc packet: {msg}"),
            OscError::BundleMalformed { declared, remaining } => write!(
                f,
                "malformed osc bundle: element declares {declared} bytes but only {remaining} remain"
            ),
            OscError::UnsupportedArgument(tag) => {
                write!(f, "unsupported osc type tag: '{tag}'")
            }
            OscError::AudioFormatUnsupported(msg) => {
                write!(f, "unsupported audio capture format: {msg}")
            }
        }
    }
}

impl std::error::Error for OscError {}

impl From<std::io::Error> for OscError {
    fn from(e: std::io::Error) -> Self {
        OscError::TransportFailure(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_displays_without_panicking() {
        let variants = [
            OscError::TransportFailure("bind failed".into()),
            OscError::MalformedPacket("bad length".into()),
            OscError::BundleMalformed { declared: 999, remaining: 4 },
            OscError::UnsupportedArgument('z'),
            OscError::AudioFormatUnsupported("no mono device".into()),
        ];
        for v in variants {
            let rendered = v.to_string();
            assert!(!rendered.is_empty());
        }
    }
}
