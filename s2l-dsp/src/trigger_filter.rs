//! Trigger filter: the on-delay/off-delay/max-hold debouncer state machine
//! that turns raw above-threshold edges into hysteretic on/off OSC events.

use s2l_types::{OscSink, TriggerOscParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterState {
    Idle,
    Arming,
    Active,
    Releasing,
}

fn decrement(timer: &mut Option<f32>, dt: f32) -> bool {
    match timer {
        Some(t) => {
            *t -= dt;
            if *t <= 0.0 {
                *timer = None;
                true
            } else {
                false
            }
        }
        None => false,
    }
}

pub struct TriggerFilter {
    on_delay: f32,
    off_delay: f32,
    max_hold: f32,
    mute: bool,
    state: FilterState,
    on_timer: Option<f32>,
    off_timer: Option<f32>,
    max_hold_timer: Option<f32>,
    pub osc: TriggerOscParams,
}

impl TriggerFilter {
    pub fn new(osc: TriggerOscParams) -> Self {
        TriggerFilter {
            on_delay: 0.0,
            off_delay: 0.0,
            max_hold: 0.0,
            mute: false,
            state: FilterState::Idle,
            on_timer: None,
            off_timer: None,
            max_hold_timer: None,
            osc,
        }
    }

    pub fn state(&self) -> FilterState {
        self.state
    }

    pub fn set_mute(&mut self, mute: bool) {
        self.mute = mute;
    }

    pub fn set_delays(&mut self, on_delay: f32, off_delay: f32, max_hold: f32) {
        self.on_delay = on_delay.max(0.0);
        self.off_delay = off_delay.max(0.0);
        self.max_hold = max_hold.max(0.0);
    }

    /// Raw rising edge: ignored unless currently Idle or Releasing.
    pub fn trigger_on(&mut self) {
        match self.state {
            FilterState::Idle => {
                self.state = FilterState::Arming;
                self.on_timer = Some(self.on_delay);
            }
            FilterState::Releasing => {
                self.state = FilterState::Active;
                self.off_timer = None;
            }
            FilterState::Arming | FilterState::Active => {}
        }
    }

    /// Raw falling edge: ignored unless currently Arming or Active.
    pub fn trigger_off(&mut self) {
        match self.state {
            FilterState::Arming => {
                self.state = FilterState::Idle;
                self.on_timer = None;
            }
            FilterState::Active => {
                self.state = FilterState::Releasing;
                self.off_timer = Some(self.off_delay);
            }
            FilterState::Idle | FilterState::Releasing => {}
        }
    }

    /// Advance all running one-shot timers by `dt` seconds, emitting
    /// On/OffSignal through `sink` as timers expire.
    pub fn step(&mut self, dt: f32, sink: &mut dyn OscSink) {
        if decrement(&mut self.on_timer, dt) {
            self.state = FilterState::Active;
            self.send_on(sink);
            if self.max_hold > 0.0 {
                self.max_hold_timer = Some(self.max_hold);
            }
        }
        if decrement(&mut self.off_timer, dt) {
            self.state = FilterState::Idle;
            self.max_hold_timer = None;
            self.send_off(sink);
        }
        if decrement(&mut self.max_hold_timer, dt) {
            self.state = FilterState::Idle;
            self.off_timer = None;
            self.send_off(sink);
        }
    }

    fn send_on(&self, sink: &mut dyn OscSink) {
        if !self.mute && !self.osc.on_message.is_empty() {
            sink.send(&self.osc.on_message, false);
        }
    }

    fn send_off(&self, sink: &mut dyn OscSink) {
        if !self.mute && !self.osc.off_message.is_empty() {
            sink.send(&self.osc.off_message, false);
        }
    }
}
