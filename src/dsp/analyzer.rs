//! The per-stream analysis engine.
//!
//! Each tick the caller hands in elapsed time. File streams turn that time
//! into whole hops; live streams drain whatever hops the capture ring holds.
//! Every hop runs pre-processing, FFT and band mapping once. Smoothing, peak
//! tracking and metering then run exactly once per tick.

use super::bands::{BandLayout, BandMapper, BandState, FractionalOctave};
use super::layout::{DEFAULT_SURFACE, PlotRect};
use super::loudness::{LoudnessMeter, MeterReading};
use super::preprocess::Preprocessor;
use super::smoothing::{AveragingMode, Envelope, PeakHold, PeakTracker};
use super::transform::SpectralTransform;
use super::{
    HOP_SIZE, HPF_CUTOFF_HZ, MAX_LIVE_HOPS_PER_TICK, METER_INTERVAL_SECS, MIN_FREQUENCY_HZ,
    Reconfigurable, SampleFormat, WINDOW_SIZE,
};
use crate::audio::capture::LiveWindow;
use crate::settings::AnalyzerSettings;
use crate::util::audio::mixdown_into;
use std::collections::TryReserveError;
use thiserror::Error;
use tracing::{debug, info, warn};

const DROP_CHECK_INTERVAL_SECS: f64 = 5.0;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("sample rate must be positive")]
    InvalidSampleRate,
    #[error("channel count must be at least 1")]
    InvalidChannels,
    #[error("failed to allocate {bands} bands")]
    Allocation {
        bands: usize,
        #[source]
        source: TryReserveError,
    },
}

#[derive(Debug, Error)]
pub enum ResizeError {
    #[error("failed to allocate {bands} bands")]
    Allocation {
        bands: usize,
        #[source]
        source: TryReserveError,
    },
}

#[derive(Debug)]
enum Source {
    File {
        samples: Vec<f32>,
        frames: usize,
        window_index: usize,
        total_windows: usize,
        accumulator: f64,
    },
    Live {
        window: LiveWindow,
        hops: usize,
        drops: DropReport,
    },
}

/// Rate-limited view of the capture ring's drop counter.
#[derive(Debug, Clone, Copy)]
struct DropReport {
    elapsed: f64,
    baseline: u64,
}

impl DropReport {
    fn new(baseline: u64) -> Self {
        Self {
            elapsed: 0.0,
            baseline,
        }
    }

    /// Samples dropped since the last report, at most once per interval.
    fn poll(&mut self, dt: f64, dropped: u64) -> Option<u64> {
        self.elapsed += dt;
        if self.elapsed < DROP_CHECK_INTERVAL_SECS {
            return None;
        }
        self.elapsed -= DROP_CHECK_INTERVAL_SECS;
        if self.elapsed >= DROP_CHECK_INTERVAL_SECS {
            self.elapsed %= DROP_CHECK_INTERVAL_SECS;
        }

        let fresh = dropped.checked_sub(self.baseline).filter(|&n| n > 0)?;
        self.baseline = dropped;
        Some(fresh)
    }
}

/// Pre-processor, FFT and band mapper plus the frame they share.
#[derive(Debug)]
struct WindowPipeline {
    frame: Vec<f32>,
    preprocessor: Preprocessor,
    transform: SpectralTransform,
    mapper: BandMapper,
}

impl WindowPipeline {
    fn run(&mut self, bands: &mut BandState) {
        self.preprocessor.process(&mut self.frame);
        let magnitudes = self.transform.process(&self.frame);
        self.mapper.map(magnitudes, bands);
    }
}

#[derive(Debug)]
pub struct Analyzer {
    format: SampleFormat,
    source: Source,
    pipeline: WindowPipeline,
    layout: BandLayout,
    bands: BandState,
    settings: AnalyzerSettings,
    linear: Envelope,
    decibel: Envelope,
    peaks: PeakTracker,
    meter: LoudnessMeter,
    hop_seconds: f64,
    surface: (u32, u32),
    plot: PlotRect,
}

impl Analyzer {
    /// File-mode stream over interleaved samples.
    pub fn from_samples(
        samples: Vec<f32>,
        format: SampleFormat,
        settings: AnalyzerSettings,
    ) -> Result<Self, AnalyzerError> {
        if format.channels == 0 {
            return Err(AnalyzerError::InvalidChannels);
        }
        let frames = samples.len() / format.channels;
        let total_windows = frames.div_ceil(HOP_SIZE);
        let source = Source::File {
            samples,
            frames,
            window_index: 0,
            total_windows,
            accumulator: 0.0,
        };
        Self::with_source(source, format, settings)
    }

    /// Live stream fed by a capture ring. Samples arrive already mono.
    pub fn live(
        window: LiveWindow,
        sample_rate: u32,
        settings: AnalyzerSettings,
    ) -> Result<Self, AnalyzerError> {
        let drops = DropReport::new(window.dropped_samples());
        let source = Source::Live {
            window,
            hops: 0,
            drops,
        };
        Self::with_source(source, SampleFormat::new(sample_rate, 1), settings)
    }

    fn with_source(
        source: Source,
        format: SampleFormat,
        settings: AnalyzerSettings,
    ) -> Result<Self, AnalyzerError> {
        if format.sample_rate == 0 {
            return Err(AnalyzerError::InvalidSampleRate);
        }
        let settings = settings.sanitized();

        let layout = BandLayout::new(MIN_FREQUENCY_HZ, format.nyquist());
        let plot = PlotRect::for_surface(DEFAULT_SURFACE.0, DEFAULT_SURFACE.1);
        let count = plot.band_count();
        let bands = BandState::allocate(&layout, count)
            .map_err(|source| AnalyzerError::Allocation { bands: count, source })?;

        let transform = SpectralTransform::new(WINDOW_SIZE);
        let mut mapper = BandMapper::new(
            layout,
            transform.bins(),
            format.nyquist(),
            settings.fractional_octave,
        );
        mapper.set_pink_compensation(settings.pink_compensation);

        let pipeline = WindowPipeline {
            frame: vec![0.0; WINDOW_SIZE],
            preprocessor: Preprocessor::new(WINDOW_SIZE, HPF_CUTOFF_HZ, format.sample_rate as f32),
            transform,
            mapper,
        };

        match &source {
            Source::File {
                frames,
                total_windows,
                ..
            } => info!(
                "[analyzer] file stream: {} Hz, {} ch, {frames} frames, {total_windows} windows",
                format.sample_rate, format.channels
            ),
            Source::Live { .. } => info!("[analyzer] live stream: {} Hz", format.sample_rate),
        }
        debug!(
            "[analyzer] window {WINDOW_SIZE}, hop {HOP_SIZE}, {count} bands, {}",
            settings.fractional_octave
        );

        Ok(Self {
            hop_seconds: format.hop_seconds(),
            format,
            source,
            pipeline,
            layout,
            bands,
            linear: Envelope::from_millis(settings.linear_attack_ms, settings.linear_release_ms),
            decibel: Envelope::from_millis(settings.decibel_attack_ms, settings.decibel_release_ms),
            peaks: PeakTracker::new(settings.peak_decay_db_per_sec, settings.peak_hold),
            settings,
            meter: LoudnessMeter::new(METER_INTERVAL_SECS),
            surface: DEFAULT_SURFACE,
            plot,
        })
    }

    /// Advance by `dt` seconds of wall-clock time. Returns the number of
    /// windows analysed this tick.
    pub fn update(&mut self, dt: f64) -> usize {
        let dt = if dt.is_finite() && dt > 0.0 { dt } else { 0.0 };

        let processed = match &mut self.source {
            Source::File {
                samples,
                window_index,
                total_windows,
                accumulator,
                ..
            } => {
                let mut processed = 0;
                if *window_index < *total_windows {
                    *accumulator += dt;
                    while *accumulator >= self.hop_seconds && *window_index < *total_windows {
                        *accumulator -= self.hop_seconds;
                        let start = *window_index * HOP_SIZE;
                        let valid = mixdown_into(
                            &mut self.pipeline.frame,
                            samples,
                            self.format.channels,
                            start,
                        );
                        let fresh = valid.min(HOP_SIZE);
                        self.meter.accumulate(&self.pipeline.frame[..fresh]);
                        self.pipeline.run(&mut self.bands);
                        *window_index += 1;
                        processed += 1;
                    }
                }
                processed
            }
            Source::Live {
                window,
                hops,
                drops,
            } => {
                let pipeline = &mut self.pipeline;
                let bands = &mut self.bands;
                let meter = &mut self.meter;
                let processed = window.drain(MAX_LIVE_HOPS_PER_TICK, |samples, fresh| {
                    meter.accumulate(fresh);
                    pipeline.frame.copy_from_slice(samples);
                    pipeline.run(bands);
                });
                *hops += processed;

                let dropped = window.dropped_samples();
                if let Some(fresh) = drops.poll(dt, dropped) {
                    warn!("[analyzer] capture ring dropped {fresh} samples (total {dropped})");
                }
                processed
            }
        };

        let step = dt as f32;
        let envelope = match self.settings.averaging {
            AveragingMode::Linear => self.linear,
            AveragingMode::Decibel => self.decibel,
        };
        let (targets, smoothed) = self.bands.envelope_mut();
        envelope.apply(self.settings.averaging, targets, smoothed, step);
        let (smoothed, peaks, hold) = self.bands.peaks_mut();
        self.peaks.update(smoothed, peaks, hold, step);

        if let Some(reading) = self.meter.advance(dt) {
            debug!(
                "[analyzer] meter peak {:.1} dBFS, rms {:.1} dBFS",
                reading.peak_dbfs, reading.rms_dbfs
            );
        }

        processed
    }

    /// Re-derive the plot rectangle and band count for a drawing surface.
    ///
    /// Returns `Ok(true)` when the band count changed. Unchanged dimensions
    /// are a no-op. On allocation failure the previous bands stay in place
    /// and the next call retries.
    pub fn handle_resize(&mut self, width: u32, height: u32) -> Result<bool, ResizeError> {
        if (width, height) == self.surface {
            return Ok(false);
        }

        let plot = PlotRect::for_surface(width, height);
        self.apply_plot((width, height), plot, plot.band_count())
    }

    fn apply_plot(
        &mut self,
        surface: (u32, u32),
        plot: PlotRect,
        count: usize,
    ) -> Result<bool, ResizeError> {
        let changed = count != self.bands.len();
        if changed {
            let remapped = self.bands.remapped(&self.layout, count).map_err(|source| {
                warn!("[analyzer] could not allocate {count} bands: {source}");
                ResizeError::Allocation {
                    bands: count,
                    source,
                }
            })?;
            debug!("[analyzer] bands {} -> {count}", self.bands.len());
            self.bands = remapped;
        }

        self.surface = surface;
        self.plot = plot;
        Ok(changed)
    }

    /// True once a file stream has analysed its last window, or a live stream's
    /// producer is gone and the ring is empty.
    pub fn done(&self) -> bool {
        match &self.source {
            Source::File {
                window_index,
                total_windows,
                ..
            } => window_index >= total_windows,
            Source::Live { window, .. } => window.is_finished(),
        }
    }

    /// Restart a file stream from its first window. Filter state is kept.
    pub fn rewind(&mut self) {
        if let Source::File {
            window_index,
            accumulator,
            ..
        } = &mut self.source
        {
            *window_index = 0;
            *accumulator = 0.0;
        }
    }

    /// Override the number of windows a file stream runs for.
    pub fn set_total_windows(&mut self, total: usize) {
        if let Source::File { total_windows, .. } = &mut self.source {
            *total_windows = total;
        }
    }

    pub fn set_fractional_octave(&mut self, resolution: FractionalOctave) {
        if resolution != self.settings.fractional_octave {
            debug!("[analyzer] fractional octave {resolution}");
        }
        self.settings.fractional_octave = resolution;
        self.pipeline.mapper.set_resolution(resolution);
    }

    /// Accepts any fraction and snaps it to the supported set.
    pub fn set_fractional_octave_value(&mut self, octaves: f64) {
        let resolution = FractionalOctave::nearest(octaves);
        if !octaves.is_finite() || octaves <= 0.0 {
            debug!("[analyzer] fractional octave {octaves} is invalid; using {resolution}");
        }
        self.set_fractional_octave(resolution);
    }

    pub fn set_averaging(&mut self, mode: AveragingMode) {
        if mode != self.settings.averaging {
            debug!("[analyzer] averaging {mode}");
        }
        self.settings.averaging = mode;
    }

    pub fn set_pink_compensation(&mut self, enabled: bool) {
        self.settings.pink_compensation = enabled;
        self.pipeline.mapper.set_pink_compensation(enabled);
    }

    pub fn set_peak_hold(&mut self, hold: PeakHold) {
        if hold != self.settings.peak_hold {
            debug!("[analyzer] peak hold {hold}");
        }
        self.settings.peak_hold = hold;
        self.peaks.set_hold(hold);
    }

    pub fn settings(&self) -> &AnalyzerSettings {
        &self.settings
    }

    pub fn format(&self) -> SampleFormat {
        self.format
    }

    pub fn layout(&self) -> &BandLayout {
        &self.layout
    }

    pub fn bands(&self) -> &BandState {
        &self.bands
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    pub fn meter(&self) -> MeterReading {
        self.meter.reading()
    }

    pub fn plot_rect(&self) -> PlotRect {
        self.plot
    }

    /// Windows analysed so far.
    pub fn windows_processed(&self) -> usize {
        match &self.source {
            Source::File { window_index, .. } => *window_index,
            Source::Live { hops, .. } => *hops,
        }
    }

    /// Total windows in a file stream; `None` for live streams.
    pub fn total_windows(&self) -> Option<usize> {
        match &self.source {
            Source::File { total_windows, .. } => Some(*total_windows),
            Source::Live { .. } => None,
        }
    }
}

impl Reconfigurable<AnalyzerSettings> for Analyzer {
    fn update_config(&mut self, config: AnalyzerSettings) {
        let config = config.sanitized();
        self.linear = Envelope::from_millis(config.linear_attack_ms, config.linear_release_ms);
        self.decibel = Envelope::from_millis(config.decibel_attack_ms, config.decibel_release_ms);
        self.peaks = PeakTracker::new(config.peak_decay_db_per_sec, config.peak_hold);
        self.set_fractional_octave(config.fractional_octave);
        self.set_averaging(config.averaging);
        self.set_pink_compensation(config.pink_compensation);
        self.set_peak_hold(config.peak_hold);
        self.settings = config;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::capture::capture_channel;
    use crate::dsp::layout::band_count_for_width;

    const RATE: u32 = 44_100;
    const TICK: f64 = 1.0 / 60.0;

    fn sine(freq: f32, amplitude: f32, frames: usize, channels: usize) -> Vec<f32> {
        (0..frames)
            .flat_map(|n| {
                let value =
                    amplitude * (core::f32::consts::TAU * freq * n as f32 / RATE as f32).sin();
                std::iter::repeat_n(value, channels)
            })
            .collect()
    }

    fn file_analyzer(samples: Vec<f32>, channels: usize) -> Analyzer {
        Analyzer::from_samples(
            samples,
            SampleFormat::new(RATE, channels),
            AnalyzerSettings::default(),
        )
        .expect("analyzer")
    }

    fn argmax(values: &[f32]) -> usize {
        values
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(index, _)| index)
            .unwrap()
    }

    #[test]
    fn rejects_degenerate_formats() {
        assert!(matches!(
            Analyzer::from_samples(vec![], SampleFormat::new(0, 1), AnalyzerSettings::default()),
            Err(AnalyzerError::InvalidSampleRate)
        ));
        assert!(matches!(
            Analyzer::from_samples(vec![], SampleFormat::new(RATE, 0), AnalyzerSettings::default()),
            Err(AnalyzerError::InvalidChannels)
        ));
    }

    #[test]
    fn windows_advance_with_accumulated_time() {
        let mut analyzer = file_analyzer(vec![0.0; HOP_SIZE * 10], 1);
        assert_eq!(analyzer.total_windows(), Some(10));

        let hop = analyzer.format().hop_seconds();
        assert_eq!(analyzer.update(hop * 0.5), 0);
        assert_eq!(analyzer.update(hop * 0.6), 1);
        // A long stall catches up several hops at once.
        assert_eq!(analyzer.update(hop * 3.0), 3);
        assert_eq!(analyzer.windows_processed(), 4);
        assert!(!analyzer.done());

        assert_eq!(analyzer.update(hop * 100.0), 6);
        assert!(analyzer.done());
        assert_eq!(analyzer.update(hop * 10.0), 0);

        analyzer.rewind();
        assert!(!analyzer.done());
        assert_eq!(analyzer.windows_processed(), 0);
    }

    #[test]
    fn total_windows_override_limits_and_extends_the_run() {
        let mut analyzer = file_analyzer(vec![0.0; HOP_SIZE * 10], 1);
        let hop = analyzer.format().hop_seconds();

        analyzer.set_total_windows(3);
        assert_eq!(analyzer.total_windows(), Some(3));
        assert_eq!(analyzer.update(hop * 20.0), 3);
        assert!(analyzer.done());

        // Windows past the last frame read as silence.
        analyzer.set_total_windows(12);
        assert!(!analyzer.done());
        assert_eq!(analyzer.update(hop * 20.0), 9);
        assert!(analyzer.done());
        assert_eq!(analyzer.windows_processed(), 12);
    }

    #[test]
    fn silence_gives_zero_targets_and_negative_infinity() {
        let mut analyzer = file_analyzer(vec![0.0; RATE as usize * 4], 2);
        let mut elapsed = 0.0;
        while elapsed < 1.05 {
            analyzer.update(TICK);
            elapsed += TICK;
        }
        assert!(analyzer.bands().targets().iter().all(|&t| t == 0.0));
        assert!(analyzer.bands().smoothed().iter().all(|&t| t == 0.0));
        let reading = analyzer.meter();
        assert_eq!(reading.peak_dbfs, f32::NEG_INFINITY);
        assert_eq!(reading.rms_dbfs, f32::NEG_INFINITY);
    }

    #[test]
    fn tone_peaks_in_its_band_within_one_window() {
        let samples = sine(1_000.0, 0.5, RATE as usize, 1);
        let mut analyzer = file_analyzer(samples, 1);
        let hop = analyzer.format().hop_seconds();
        assert_eq!(analyzer.update(hop), 1);

        let bands = analyzer.bands();
        let loudest = argmax(bands.targets());
        let center = bands.centers()[loudest];
        assert!((center / 1_000.0 - 1.0).abs() < 0.05, "loudest band at {center} Hz");

        let layout = analyzer.layout();
        let count = analyzer.band_count();
        let octave_below = layout.index_of_frequency(500.0, count);
        let octave_above = layout.index_of_frequency(2_000.0, count);
        let peak = bands.targets()[loudest];
        assert!(peak > 100.0 * bands.targets()[octave_below]);
        assert!(peak > 100.0 * bands.targets()[octave_above]);
    }

    #[test]
    fn stereo_sources_are_downmixed() {
        let samples = sine(1_000.0, 0.5, HOP_SIZE * 8, 2);
        let mut analyzer = file_analyzer(samples, 2);
        assert_eq!(analyzer.total_windows(), Some(8));
        let hop = analyzer.format().hop_seconds();
        analyzer.update(hop * 4.0);
        let loudest = argmax(analyzer.bands().targets());
        let center = analyzer.bands().centers()[loudest];
        assert!((center / 1_000.0 - 1.0).abs() < 0.05);
    }

    #[test]
    fn meter_reads_tone_level() {
        let samples = sine(440.0, 0.5, RATE as usize * 3, 1);
        let mut analyzer = file_analyzer(samples, 1);
        assert!(!analyzer.meter().is_defined());
        let mut elapsed = 0.0;
        while elapsed < 1.01 {
            analyzer.update(TICK);
            elapsed += TICK;
        }
        let reading = analyzer.meter();
        // 0.5 peak -> -6.0 dBFS, RMS a further 3 dB down.
        assert!((reading.peak_dbfs + 6.02).abs() < 0.1);
        assert!((reading.rms_dbfs + 9.03).abs() < 0.2);
    }

    #[test]
    fn smoothing_runs_every_tick_without_new_windows() {
        let samples = sine(1_000.0, 0.5, HOP_SIZE * 4, 1);
        let mut analyzer = file_analyzer(samples, 1);
        analyzer.set_averaging(AveragingMode::Decibel);
        let hop = analyzer.format().hop_seconds();
        analyzer.update(hop);
        let band = argmax(analyzer.bands().targets());
        let first = analyzer.bands().smoothed()[band];

        // Ticks far shorter than a hop: no new window but the envelope moves.
        assert_eq!(analyzer.update(hop * 0.1), 0);
        let second = analyzer.bands().smoothed()[band];
        assert!(second > first);
        assert!(analyzer.bands().peaks()[band] >= second);
    }

    #[test]
    fn resize_changes_band_count_and_is_idempotent() {
        let mut analyzer = file_analyzer(vec![0.0; HOP_SIZE], 1);
        let initial = analyzer.band_count();
        assert!(!analyzer.handle_resize(1280, 720).expect("resize"));

        assert!(analyzer.handle_resize(600, 400).expect("resize"));
        let expected = band_count_for_width(600 - 80);
        assert_eq!(analyzer.band_count(), expected);
        assert_eq!(analyzer.plot_rect().width, 520);
        assert!(!analyzer.handle_resize(600, 400).expect("resize"));

        assert!(analyzer.handle_resize(1280, 720).expect("resize"));
        assert_eq!(analyzer.band_count(), initial);

        // Height-only change keeps the band count.
        assert!(!analyzer.handle_resize(1280, 300).expect("resize"));
        assert_eq!(analyzer.plot_rect().height, 188);
    }

    #[test]
    fn resize_preserves_levels_near_the_same_frequency() {
        let samples = sine(1_000.0, 0.5, RATE as usize, 1);
        let mut analyzer = file_analyzer(samples, 1);
        let hop = analyzer.format().hop_seconds();
        for _ in 0..4 {
            analyzer.update(hop);
        }
        analyzer.handle_resize(500, 400).expect("resize");
        let loudest = argmax(analyzer.bands().smoothed());
        let center = analyzer.bands().centers()[loudest];
        assert!((center / 1_000.0 - 1.0).abs() < 0.1, "loudest band at {center} Hz");
    }

    #[test]
    fn resize_to_tiny_surface_keeps_two_bands() {
        let mut analyzer = file_analyzer(vec![0.0; HOP_SIZE], 1);
        analyzer.handle_resize(1, 1).expect("resize");
        assert_eq!(analyzer.band_count(), 2);
        let centers = analyzer.bands().centers();
        assert!(centers[1] > centers[0]);
    }

    #[test]
    fn failed_band_allocation_keeps_previous_layout() {
        let samples = sine(1_000.0, 0.5, RATE as usize, 1);
        let mut analyzer = file_analyzer(samples, 1);
        analyzer.update(analyzer.format().hop_seconds());
        let count = analyzer.band_count();
        let plot = analyzer.plot_rect();
        let smoothed = analyzer.bands().smoothed().to_vec();

        let wide = PlotRect::for_surface(4_000, 900);
        let err = analyzer
            .apply_plot((4_000, 900), wide, usize::MAX)
            .expect_err("allocation must fail");
        assert!(matches!(err, ResizeError::Allocation { bands, .. } if bands == usize::MAX));

        assert_eq!(analyzer.band_count(), count);
        assert_eq!(analyzer.plot_rect(), plot);
        assert_eq!(analyzer.bands().smoothed(), smoothed.as_slice());

        // The surface was not recorded, so the same size retries and succeeds.
        assert!(analyzer.handle_resize(4_000, 900).expect("resize"));
        assert_eq!(analyzer.plot_rect(), wide);
    }

    #[test]
    fn drop_reports_are_rate_limited_without_drift() {
        let mut report = DropReport::new(10);
        assert_eq!(report.poll(3.0, 50), None);
        assert_eq!(report.poll(3.0, 50), Some(40));
        // 1 s carried over: the next report is due after 4 s, not 5.
        assert_eq!(report.poll(3.9, 70), None);
        assert_eq!(report.poll(0.2, 70), Some(20));
        // Nothing new since the last report.
        assert_eq!(report.poll(5.0, 70), None);
        // A long stall yields one report, not a backlog.
        assert_eq!(report.poll(17.0, 75), Some(5));
        assert_eq!(report.poll(0.5, 80), None);
    }

    #[test]
    fn control_surface_changes_apply_between_ticks() {
        let samples = sine(1_000.0, 0.5, RATE as usize, 1);
        let mut analyzer = file_analyzer(samples, 1);
        let hop = analyzer.format().hop_seconds();
        analyzer.update(hop);
        let band = argmax(analyzer.bands().targets());
        let tilted = analyzer.bands().targets()[band];

        analyzer.set_pink_compensation(false);
        analyzer.set_fractional_octave_value(-3.0);
        assert_eq!(analyzer.settings().fractional_octave, FractionalOctave::default());
        analyzer.set_peak_hold(PeakHold::Two);
        analyzer.update(hop);
        let flat = analyzer.bands().targets()[band];
        let center = analyzer.bands().centers()[band];
        // Pink tilt multiplies by fc / 1000; without it the ratio is undone.
        assert!((tilted / flat - center / 1_000.0).abs() < 0.1);

        let settings = AnalyzerSettings {
            fractional_octave: FractionalOctave::Third,
            averaging: AveragingMode::Decibel,
            ..AnalyzerSettings::default()
        };
        analyzer.update_config(settings);
        assert_eq!(analyzer.settings().fractional_octave, FractionalOctave::Third);
        assert_eq!(analyzer.settings().averaging, AveragingMode::Decibel);
        assert!(analyzer.settings().pink_compensation);
    }

    #[test]
    fn live_stream_drains_capture_ring() {
        let (mut sink, window) = capture_channel(RATE, 2);
        let mut analyzer = Analyzer::live(window, RATE, AnalyzerSettings::default()).expect("live");

        // Nothing captured yet: no windows, not finished.
        assert_eq!(analyzer.update(TICK), 0);
        assert!(!analyzer.done());

        sink.on_input(&sine(1_000.0, 0.5, HOP_SIZE * 6, 2));
        assert_eq!(analyzer.update(TICK), MAX_LIVE_HOPS_PER_TICK);
        assert_eq!(analyzer.update(TICK), 2);
        assert_eq!(analyzer.windows_processed(), 6);

        let loudest = argmax(analyzer.bands().targets());
        let center = analyzer.bands().centers()[loudest];
        assert!((center / 1_000.0 - 1.0).abs() < 0.05);

        drop(sink);
        assert!(analyzer.done());
        assert_eq!(analyzer.total_windows(), None);
    }
}
