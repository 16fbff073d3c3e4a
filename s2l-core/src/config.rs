use std::path::PathBuf;

use s2l_types::{Band, FramingMode};
use serde::Deserialize;

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    ports: PortsFile,
    #[serde(default)]
    framing: FramingFile,
    #[serde(default)]
    bpm: BpmFile,
    #[serde(default)]
    agc: AgcFile,
    #[serde(default)]
    log: LogFile,
    #[serde(default)]
    triggers: TriggersFile,
}

#[derive(Deserialize, Default)]
struct PortsFile {
    udp_tx: Option<u16>,
    udp_rx: Option<u16>,
    tcp: Option<u16>,
}

#[derive(Deserialize, Default)]
struct FramingFile {
    mode: Option<String>,
}

#[derive(Deserialize, Default)]
struct BpmFile {
    min_bpm: Option<f32>,
}

#[derive(Deserialize, Default)]
struct AgcFile {
    enabled: Option<bool>,
}

#[derive(Deserialize, Default)]
struct LogFile {
    level: Option<String>,
}

#[derive(Deserialize, Default, Clone)]
struct TriggerSlotFile {
    threshold: Option<f32>,
    on_delay: Option<f32>,
    off_delay: Option<f32>,
    max_hold: Option<f32>,
}

#[derive(Deserialize, Default)]
struct TriggersFile {
    #[serde(default)]
    bass: TriggerSlotFile,
    #[serde(default)]
    lo_mid: TriggerSlotFile,
    #[serde(default)]
    hi_mid: TriggerSlotFile,
    #[serde(default)]
    high: TriggerSlotFile,
    #[serde(default)]
    envelope: TriggerSlotFile,
    #[serde(default)]
    silence: TriggerSlotFile,
}

/// Threshold/delay defaults for one generator slot, as loaded from config.
#[derive(Debug, Clone, Copy)]
pub struct TriggerDefaults {
    pub threshold: f32,
    pub on_delay: f32,
    pub off_delay: f32,
    pub max_hold: f32,
}

pub struct Config {
    ports: PortsFile,
    framing: FramingFile,
    bpm: BpmFile,
    agc: AgcFile,
    log: LogFile,
    triggers: TriggersFile,
}

impl Config {
    pub fn load() -> Self {
        let mut base: ConfigFile =
            toml::from_str(DEFAULT_CONFIG).expect("embedded config.toml must parse");

        if let Some(path) = user_config_path() {
            if path.exists() {
                match std::fs::read_to_string(&path) {
                    Ok(contents) => merge_user_config(&mut base, &contents),
                    Err(e) => {
                        log::warn!(target: "config", "could not read config {}: {}", path.display(), e)
                    }
                }
            }
        }

        Config {
            ports: base.ports,
            framing: base.framing,
            bpm: base.bpm,
            agc: base.agc,
            log: base.log,
            triggers: base.triggers,
        }
    }

    pub fn udp_tx_port(&self) -> u16 {
        self.ports.udp_tx.unwrap_or(8001)
    }

    pub fn udp_rx_port(&self) -> u16 {
        self.ports.udp_rx.unwrap_or(8000)
    }

    pub fn tcp_port(&self) -> u16 {
        self.ports.tcp.unwrap_or(3032)
    }

    pub fn framing_mode(&self) -> FramingMode {
        self.framing
            .mode
            .as_deref()
            .and_then(parse_framing_mode)
            .unwrap_or_default()
    }

    pub fn min_bpm(&self) -> f32 {
        s2l_types::quantize_min_bpm(self.bpm.min_bpm.unwrap_or(0.0))
    }

    pub fn agc_enabled(&self) -> bool {
        self.agc.enabled.unwrap_or(false)
    }

    pub fn log_level(&self) -> log::LevelFilter {
        self.log
            .level
            .as_deref()
            .and_then(parse_log_level)
            .unwrap_or(log::LevelFilter::Info)
    }

    pub fn trigger_defaults(&self, band: Band) -> TriggerDefaults {
        let slot = match band {
            Band::Bass => &self.triggers.bass,
            Band::LoMid => &self.triggers.lo_mid,
            Band::HiMid => &self.triggers.hi_mid,
            Band::High => &self.triggers.high,
            Band::Envelope => &self.triggers.envelope,
            Band::Silence => &self.triggers.silence,
        };
        TriggerDefaults {
            threshold: slot.threshold.unwrap_or(0.5).clamp(0.0, 1.0),
            on_delay: slot.on_delay.unwrap_or(0.0).max(0.0),
            off_delay: slot.off_delay.unwrap_or(0.0).max(0.0),
            max_hold: slot.max_hold.unwrap_or(0.0).max(0.0),
        }
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("sound2light").join("config.toml"))
}

/// Parse `contents` as free-form TOML and merge each top-level table into
/// `base` independently: a malformed table is logged and skipped, but valid
/// sibling tables still apply.
fn merge_user_config(base: &mut ConfigFile, contents: &str) {
    let raw: toml::Value = match contents.parse() {
        Ok(v) => v,
        Err(e) => {
            log::warn!(target: "config", "ignoring unparsable config: {e}");
            return;
        }
    };
    merge_field(&raw, "ports", &mut base.ports, merge_ports);
    merge_field(&raw, "framing", &mut base.framing, merge_framing);
    merge_field(&raw, "bpm", &mut base.bpm, merge_bpm);
    merge_field(&raw, "agc", &mut base.agc, merge_agc);
    merge_field(&raw, "log", &mut base.log, merge_log);
    merge_field(&raw, "triggers", &mut base.triggers, merge_triggers);
}

fn merge_field<T: Default + serde::de::DeserializeOwned>(
    raw: &toml::Value,
    key: &str,
    base: &mut T,
    merge: fn(&mut T, T),
) {
    merge(base, table_or_warn(raw, key));
}

fn table_or_warn<T: Default + serde::de::DeserializeOwned>(raw: &toml::Value, key: &str) -> T {
    match raw.get(key) {
        Some(value) => match T::deserialize(value.clone()) {
            Ok(parsed) => parsed,
            Err(e) => {
                log::warn!(target: "config", "ignoring malformed [{key}] table: {e}");
                T::default()
            }
        },
        None => T::default(),
    }
}

fn merge_ports(base: &mut PortsFile, user: PortsFile) {
    if user.udp_tx.is_some() {
        base.udp_tx = user.udp_tx;
    }
    if user.udp_rx.is_some() {
        base.udp_rx = user.udp_rx;
    }
    if user.tcp.is_some() {
        base.tcp = user.tcp;
    }
}

fn merge_framing(base: &mut FramingFile, user: FramingFile) {
    if user.mode.is_some() {
        base.mode = user.mode;
    }
}

fn merge_bpm(base: &mut BpmFile, user: BpmFile) {
    if user.min_bpm.is_some() {
        base.min_bpm = user.min_bpm;
    }
}

fn merge_agc(base: &mut AgcFile, user: AgcFile) {
    if user.enabled.is_some() {
        base.enabled = user.enabled;
    }
}

fn merge_log(base: &mut LogFile, user: LogFile) {
    if user.level.is_some() {
        base.level = user.level;
    }
}

fn merge_slot(base: &mut TriggerSlotFile, user: TriggerSlotFile) {
    if user.threshold.is_some() {
        base.threshold = user.threshold;
    }
    if user.on_delay.is_some() {
        base.on_delay = user.on_delay;
    }
    if user.off_delay.is_some() {
        base.off_delay = user.off_delay;
    }
    if user.max_hold.is_some() {
        base.max_hold = user.max_hold;
    }
}

fn merge_triggers(base: &mut TriggersFile, user: TriggersFile) {
    merge_slot(&mut base.bass, user.bass);
    merge_slot(&mut base.lo_mid, user.lo_mid);
    merge_slot(&mut base.hi_mid, user.hi_mid);
    merge_slot(&mut base.high, user.high);
    merge_slot(&mut base.envelope, user.envelope);
    merge_slot(&mut base.silence, user.silence);
}

fn parse_framing_mode(s: &str) -> Option<FramingMode> {
    match s {
        "length_prefix" => Some(FramingMode::LengthPrefix),
        "slip" => Some(FramingMode::Slip),
        _ => None,
    }
}

fn parse_log_level(s: &str) -> Option<log::LevelFilter> {
    match s.to_lowercase().as_str() {
        "off" => Some(log::LevelFilter::Off),
        "error" => Some(log::LevelFilter::Error),
        "warn" => Some(log::LevelFilter::Warn),
        "info" => Some(log::LevelFilter::Info),
        "debug" => Some(log::LevelFilter::Debug),
        "trace" => Some(log::LevelFilter::Trace),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s7_embedded_defaults() {
        let config = Config::load();
        assert_eq!(config.udp_tx_port(), 8001);
        assert_eq!(config.udp_rx_port(), 8000);
        assert_eq!(config.tcp_port(), 3032);
        assert_eq!(config.framing_mode(), FramingMode::LengthPrefix);
        assert_eq!(config.min_bpm(), 0.0);
        assert!(!config.agc_enabled());
        assert_eq!(config.log_level(), log::LevelFilter::Info);
    }

    #[test]
    fn trigger_defaults_match_generator_kind_defaults() {
        let config = Config::load();
        let bass = config.trigger_defaults(Band::Bass);
        assert_eq!(bass.threshold, 0.5);
        let envelope = config.trigger_defaults(Band::Envelope);
        assert_eq!(envelope.threshold, 0.1);
        assert_eq!(envelope.off_delay, 2.0);
        let silence = config.trigger_defaults(Band::Silence);
        assert_eq!(silence.threshold, 0.9);
    }

    #[test]
    fn s8_malformed_ports_table_keeps_other_overrides() {
        let mut base: ConfigFile = toml::from_str(DEFAULT_CONFIG).unwrap();
        merge_user_config(
            &mut base,
            "[ports]\nudp_tx = \"not-a-number\"\n\n[bpm]\nmin_bpm = 100\n",
        );
        // The malformed [ports] table is discarded, so the embedded default survives...
        assert_eq!(base.ports.udp_tx, Some(8001));
        // ...while the valid sibling [bpm] override still applies.
        assert_eq!(base.bpm.min_bpm, Some(100.0));
    }

    #[test]
    fn parse_framing_mode_rejects_unknown_strings() {
        assert_eq!(parse_framing_mode("length_prefix"), Some(FramingMode::LengthPrefix));
        assert_eq!(parse_framing_mode("slip"), Some(FramingMode::Slip));
        assert_eq!(parse_framing_mode("nope"), None);
    }
}
