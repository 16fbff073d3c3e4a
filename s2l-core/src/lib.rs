//! Ties the analysis pipeline, tempo detectors and OSC dispatch together
//! behind a single `Core`, plus the config loader and scheduler cadences
//! that drive it from `s2l-cli`.

mod bpm_osc_controller;
mod config;
mod core;
mod dispatch;
mod error;
mod scheduler;

pub use bpm_osc_controller::BpmOscController;
pub use config::{Config, TriggerDefaults};
pub use core::Core;
pub use dispatch::{dispatch, DispatchEffect};
pub use error::{CaptureError, ConfigError};
pub use scheduler::{Scheduler, Tick};
