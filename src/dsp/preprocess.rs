//! Frame conditioning ahead of the FFT: DC removal, a continuous high-pass
//! and a Hann taper.

use crate::util::audio::{apply_window, remove_dc};

/// Single-pole IIR high-pass, `y[n] = a * (y[n-1] + x[n] - x[n-1])`.
///
/// State runs across calls so consecutive frames see one continuous filter.
#[derive(Debug, Clone)]
pub struct HighPass {
    alpha: f32,
    prev_x: f32,
    prev_y: f32,
}

impl HighPass {
    pub fn new(cutoff_hz: f32, sample_rate: f32) -> Self {
        let rc = 1.0 / (core::f32::consts::TAU * cutoff_hz.max(f32::MIN_POSITIVE));
        let dt = 1.0 / sample_rate.max(1.0);
        Self {
            alpha: rc / (rc + dt),
            prev_x: 0.0,
            prev_y: 0.0,
        }
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn process(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            let x = *sample;
            let y = self.alpha * (self.prev_y + x - self.prev_x);
            self.prev_x = x;
            self.prev_y = y;
            *sample = y;
        }
    }

    pub fn reset(&mut self) {
        self.prev_x = 0.0;
        self.prev_y = 0.0;
    }
}

/// Symmetric Hann taper: `0.5 * (1 - cos(2*pi*i / (len - 1)))`.
pub fn hann_window(len: usize) -> Vec<f32> {
    if len < 2 {
        return vec![1.0; len];
    }
    let denom = (len - 1) as f32;
    (0..len)
        .map(|i| {
            let phase = i as f32 * core::f32::consts::TAU / denom;
            0.5 * (1.0 - phase.cos())
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct Preprocessor {
    window: Vec<f32>,
    filter: HighPass,
}

impl Preprocessor {
    pub fn new(window_size: usize, cutoff_hz: f32, sample_rate: f32) -> Self {
        Self {
            window: hann_window(window_size),
            filter: HighPass::new(cutoff_hz, sample_rate),
        }
    }

    pub fn window_size(&self) -> usize {
        self.window.len()
    }

    /// Condition a raw mono frame in place.
    pub fn process(&mut self, frame: &mut [f32]) {
        debug_assert_eq!(frame.len(), self.window.len());
        remove_dc(frame);
        self.filter.process(frame);
        apply_window(frame, &self.window);
    }

    /// Only called when a new stream starts.
    pub fn reset(&mut self) {
        self.filter.reset();
    }
}
