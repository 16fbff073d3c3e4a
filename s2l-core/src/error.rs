use std::fmt;

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "could not read config file: {e}"),
            ConfigError::Parse(e) => write!(f, "malformed config file: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

#[derive(Debug)]
pub enum CaptureError {
    NoDefaultDevice,
    UnsupportedFormat(String),
    Stream(String),
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::NoDefaultDevice => write!(f, "no default audio input device"),
            CaptureError::UnsupportedFormat(s) => write!(f, "unsupported capture format: {s}"),
            CaptureError::Stream(s) => write!(f, "audio stream error: {s}"),
        }
    }
}

impl std::error::Error for CaptureError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_variants_display_without_panicking() {
        let _ = ConfigError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "x")).to_string();
        let _ = CaptureError::NoDefaultDevice.to_string();
        let _ = CaptureError::UnsupportedFormat("f32/44100".into()).to_string();
        let _ = CaptureError::Stream("underrun".into()).to_string();
    }
}
