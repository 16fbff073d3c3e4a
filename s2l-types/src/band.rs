/// The six registered trigger-generator slots, in the fixed registration
/// (and level-feedback emission) order the scheduler iterates them in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Band {
    Bass,
    LoMid,
    HiMid,
    High,
    Envelope,
    Silence,
}

impl Band {
    pub const ALL: [Band; 6] = [
        Band::Bass,
        Band::LoMid,
        Band::HiMid,
        Band::High,
        Band::Envelope,
        Band::Silence,
    ];

    /// Whether this slot is a bandpass generator (subject to low-solo).
    pub fn is_bandpass(self) -> bool {
        matches!(self, Band::Bass | Band::LoMid | Band::HiMid | Band::High)
    }

    /// The `/s2l/out/...` path suffix used for level feedback.
    pub fn osc_suffix(self) -> &'static str {
        match self {
            Band::Bass => "bass",
            Band::LoMid => "lo_mid",
            Band::HiMid => "hi_mid",
            Band::High => "high",
            Band::Envelope => "level",
            Band::Silence => "silence",
        }
    }
}
