use crate::band::Band;

/// Read-only hook a GUI-equivalent would sit behind: invoked once per
/// analysis tick per generator slot with the post-AGC normalized value,
/// independent of whether that slot's trigger fired.
pub trait LevelObserver {
    fn on_level(&mut self, band: Band, value: f32);
}

#[derive(Default)]
pub struct NullObserver;

impl LevelObserver for NullObserver {
    fn on_level(&mut self, _band: Band, _value: f32) {}
}
