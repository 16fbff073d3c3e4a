//! Mono circular audio buffer. The only state shared between the audio
//! capture thread (producer) and the analysis thread (consumer).

/// Fixed-capacity ring of samples in `[-1, 1]`. `put` downmixes
/// multichannel interleaved input to mono before appending; oldest samples
/// are evicted once the buffer is full.
pub struct MonoRingBuffer {
    data: Vec<f32>,
    capacity: usize,
    total_put: u64,
}

impl MonoRingBuffer {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring buffer capacity must be positive");
        MonoRingBuffer { data: vec![0.0; capacity], capacity, total_put: 0 }
    }

    /// Downmix `samples` (interleaved, `channel_count` channels) to mono and
    /// append each resulting frame.
    pub fn put(&mut self, samples: &[f32], channel_count: usize) {
        assert!(channel_count > 0, "channel_count must be positive");
        if channel_count == 1 {
            for &s in samples {
                self.push_one(s);
            }
            return;
        }
        for frame in samples.chunks_exact(channel_count) {
            let sum: f32 = frame.iter().sum();
            self.push_one(sum / channel_count as f32);
        }
    }

    fn push_one(&mut self, sample: f32) {
        let idx = (self.total_put % self.capacity as u64) as usize;
        self.data[idx] = sample;
        self.total_put += 1;
    }

    /// Sample at absolute ring position `i mod capacity`. Undefined (but not
    /// unsafe) for positions whose slot has since been overwritten.
    pub fn at(&self, i: u64) -> f32 {
        self.data[(i % self.capacity as u64) as usize]
    }

    pub fn total_put(&self) -> u64 {
        self.total_put
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Copy the most recent `n` samples (oldest first) into `out`. Panics if
    /// `n > capacity` or fewer than `n` samples have ever been written.
    pub fn copy_latest(&self, n: usize, out: &mut [f32]) {
        assert!(n <= self.capacity && out.len() >= n);
        assert!(self.total_put >= n as u64, "not enough samples written yet");
        let start = self.total_put - n as u64;
        for (k, slot) in out.iter_mut().enumerate().take(n) {
            *slot = self.at(start + k as u64);
        }
    }
}
