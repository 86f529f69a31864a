//! Real-to-complex FFT with single-sided, Hann-compensated magnitude scaling.

use realfft::{RealFftPlanner, RealToComplex};
use rustfft::num_complex::Complex32;
use std::sync::Arc;
use tracing::error;

pub struct SpectralTransform {
    fft: Arc<dyn RealToComplex<f32>>,
    size: usize,
    input: Vec<f32>,
    spectrum: Vec<Complex32>,
    scratch: Vec<Complex32>,
    magnitudes: Vec<f32>,
}

impl std::fmt::Debug for SpectralTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectralTransform")
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

impl SpectralTransform {
    pub fn new(size: usize) -> Self {
        let fft = RealFftPlanner::<f32>::new().plan_fft_forward(size);
        Self {
            input: fft.make_input_vec(),
            spectrum: fft.make_output_vec(),
            scratch: fft.make_scratch_vec(),
            magnitudes: vec![0.0; size / 2 + 1],
            size,
            fft,
        }
    }

    pub fn bins(&self) -> usize {
        self.magnitudes.len()
    }

    pub fn magnitudes(&self) -> &[f32] {
        &self.magnitudes
    }

    /// Transform one windowed frame and return per-bin amplitudes.
    ///
    /// Scaled by `4 / N` so a full-scale sine under a Hann window reads 1.0;
    /// DC and Nyquist have no mirror image and are halved.
    pub fn process(&mut self, frame: &[f32]) -> &[f32] {
        debug_assert_eq!(frame.len(), self.size);
        self.input.copy_from_slice(frame);

        if let Err(err) =
            self.fft
                .process_with_scratch(&mut self.input, &mut self.spectrum, &mut self.scratch)
        {
            error!("[transform] fft failed: {err}");
            self.magnitudes.fill(0.0);
            return &self.magnitudes;
        }

        let scale = 4.0 / self.size as f32;
        for (magnitude, bin) in self.magnitudes.iter_mut().zip(self.spectrum.iter()) {
            *magnitude = bin.norm() * scale;
        }

        let last = self.magnitudes.len() - 1;
        self.magnitudes[0] *= 0.5;
        if last > 0 {
            self.magnitudes[last] *= 0.5;
        }
        &self.magnitudes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::preprocess::hann_window;

    fn windowed(signal: impl Fn(usize) -> f32, size: usize) -> Vec<f32> {
        let window = hann_window(size);
        (0..size).map(|n| signal(n) * window[n]).collect()
    }

    #[test]
    fn sine_amplitude_is_recovered() {
        let size = 1024;
        let bin = 64;
        let amplitude = 0.5;
        let frame = windowed(
            |n| {
                amplitude
                    * (core::f32::consts::TAU * bin as f32 * n as f32 / size as f32).sin()
            },
            size,
        );

        let mut transform = SpectralTransform::new(size);
        let magnitudes = transform.process(&frame);
        assert!((magnitudes[bin] - amplitude).abs() < 0.01 * amplitude + 1e-3);
        assert!(magnitudes[bin + 8] < amplitude * 0.01);
    }

    #[test]
    fn dc_bin_is_halved() {
        let size = 512;
        let frame = windowed(|_| 1.0, size);
        let mut transform = SpectralTransform::new(size);
        let magnitudes = transform.process(&frame);
        assert!((magnitudes[0] - 1.0).abs() < 0.01);
    }

    #[test]
    fn output_buffer_is_reused() {
        let mut transform = SpectralTransform::new(256);
        let before = transform.magnitudes().as_ptr();
        transform.process(&vec![0.0; 256]);
        assert_eq!(before, transform.magnitudes().as_ptr());
        assert_eq!(transform.bins(), 129);
        assert!(transform.magnitudes().iter().all(|&m| m == 0.0));
    }
}
