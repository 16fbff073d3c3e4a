/// OSC address templates and level-broadcast scaling for one trigger slot.
///
/// `<USER>` in any of the three messages is substituted by the transport at
/// send time, never stored pre-substituted here.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerOscParams {
    pub on_message: String,
    pub off_message: String,
    pub level_message: String,
    pub min_level: f32,
    pub max_level: f32,
    pub label: String,
}

impl Default for TriggerOscParams {
    fn default() -> Self {
        TriggerOscParams {
            on_message: String::new(),
            off_message: String::new(),
            level_message: String::new(),
            min_level: 0.0,
            max_level: 1.0,
            label: String::new(),
        }
    }
}
