//! Incoming OSC dispatch: maps a decoded message to the effect it has on
//! core state, by longest-matching path prefix.

use s2l_osc::OscMessage;

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchEffect {
    SetEnabled(bool),
    ToggleEnabled,
    SetLevelFeedback(bool),
    ToggleLevelFeedback,
    LoadPreset(String),
    SetBpmEnabled(bool),
    ToggleBpmEnabled,
    SetMinBpm(i64),
    Tap,
    Unrecognized,
}

fn single_string_arg(message: &OscMessage) -> Option<&str> {
    if message.args.len() != 1 {
        return None;
    }
    match &message.args[0] {
        s2l_osc::OscValue::Str(s) => Some(s.as_str()),
        _ => None,
    }
}

fn single_int_arg(message: &OscMessage) -> Option<i64> {
    if message.args.len() != 1 {
        return None;
    }
    match &message.args[0] {
        s2l_osc::OscValue::Int(v) => Some(*v as i64),
        s2l_osc::OscValue::Long(v) => Some(*v),
        _ => None,
    }
}

pub fn dispatch(message: &OscMessage) -> DispatchEffect {
    let path = message.path.as_str();

    if path.starts_with("/s2l/enabled/toggle") {
        return if message.truthy().is_true() { DispatchEffect::ToggleEnabled } else { DispatchEffect::Unrecognized };
    }
    if path.starts_with("/s2l/enabled") {
        return DispatchEffect::SetEnabled(message.truthy().is_true());
    }
    if path.starts_with("/s2l/level_feedback/toggle") {
        return DispatchEffect::ToggleLevelFeedback;
    }
    if path.starts_with("/s2l/level_feedback") {
        return DispatchEffect::SetLevelFeedback(message.truthy().is_true());
    }
    if path.starts_with("/s2l/preset") {
        return match single_string_arg(message) {
            Some(name) => DispatchEffect::LoadPreset(name.to_string()),
            None => DispatchEffect::Unrecognized,
        };
    }
    if path.starts_with("/s2l/bpm/enabled/toggle") {
        return if message.truthy().is_true() { DispatchEffect::ToggleBpmEnabled } else { DispatchEffect::Unrecognized };
    }
    if path.starts_with("/s2l/bpm/enabled") {
        return DispatchEffect::SetBpmEnabled(message.truthy().is_true());
    }
    if path.starts_with("/s2l/bpm/range") {
        return match single_int_arg(message) {
            Some(value) => DispatchEffect::SetMinBpm(value),
            None => DispatchEffect::Unrecognized,
        };
    }
    if path.starts_with("/s2l/bpm/tap") {
        return if message.args.is_empty() || message.truthy().is_true() {
            DispatchEffect::Tap
        } else {
            DispatchEffect::Unrecognized
        };
    }

    DispatchEffect::Unrecognized
}

#[cfg(test)]
mod tests {
    use super::*;
    use s2l_osc::OscValue;

    #[test]
    fn s6_bpm_range_sets_min_bpm() {
        let message = OscMessage::new("/s2l/bpm/range", vec![OscValue::Int(80)]);
        assert_eq!(dispatch(&message), DispatchEffect::SetMinBpm(80));
    }

    #[test]
    fn enabled_toggle_takes_precedence_over_plain_enabled() {
        let message = OscMessage::new("/s2l/enabled/toggle", vec![]);
        assert_eq!(dispatch(&message), DispatchEffect::ToggleEnabled);
    }

    #[test]
    fn tap_with_no_args_is_a_tap() {
        let message = OscMessage::new("/s2l/bpm/tap", vec![]);
        assert_eq!(dispatch(&message), DispatchEffect::Tap);
    }

    #[test]
    fn tap_with_falsy_arg_is_ignored() {
        let message = OscMessage::new("/s2l/bpm/tap", vec![OscValue::Int(0)]);
        assert_eq!(dispatch(&message), DispatchEffect::Unrecognized);
    }

    #[test]
    fn preset_requires_single_string_arg() {
        let message = OscMessage::new("/s2l/preset", vec![OscValue::Str("show1".into())]);
        assert_eq!(dispatch(&message), DispatchEffect::LoadPreset("show1".into()));
        let bad = OscMessage::new("/s2l/preset", vec![OscValue::Int(1)]);
        assert_eq!(dispatch(&bad), DispatchEffect::Unrecognized);
    }

    #[test]
    fn unknown_path_is_unrecognized() {
        let message = OscMessage::new("/not/a/thing", vec![]);
        assert_eq!(dispatch(&message), DispatchEffect::Unrecognized);
    }
}
