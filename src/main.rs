use anyhow::{Context, Result};
use bandscope::audio::capture::{CaptureSink, capture_channel};
use bandscope::dsp::SampleFormat;
use bandscope::settings::{self, SettingsStore};
use bandscope::util::audio::format_dbfs;
use bandscope::{Analyzer, AnalyzerSettings};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const SAMPLE_RATE: u32 = 48_000;
const CHANNELS: usize = 2;
const FILE_SECONDS: usize = 3;
const LIVE_SECONDS: f64 = 2.0;
const TICK: Duration = Duration::from_micros(16_667);
const CALLBACK_FRAMES: usize = 512;

/// Tone partials of the demo signal: (frequency, amplitude).
const PARTIALS: [(f32, f32); 3] = [(110.0, 0.3), (1_000.0, 0.2), (6_000.0, 0.05)];

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let store = SettingsStore::load_or_default(settings::default_path());
    info!("[main] settings from {:?}", store.path());
    let settings = *store.settings();

    run_file(settings).context("file-mode run")?;
    run_live(settings).context("live-mode run")?;
    Ok(())
}

fn synth_frame(frame: usize) -> f32 {
    let t = frame as f32 / SAMPLE_RATE as f32;
    PARTIALS
        .iter()
        .map(|&(freq, amp)| amp * (core::f32::consts::TAU * freq * t).sin())
        .sum()
}

fn synth_interleaved(start_frame: usize, frames: usize, out: &mut Vec<f32>) {
    out.clear();
    for frame in start_frame..start_frame + frames {
        let value = synth_frame(frame);
        // Slightly unbalanced stereo so the downmix is exercised.
        out.extend_from_slice(&[value, 0.8 * value]);
    }
}

fn report(analyzer: &Analyzer) {
    let reading = analyzer.meter();
    let bands = analyzer.bands();
    let loudest = bands
        .smoothed()
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(index, _)| bands.centers()[index]);
    match loudest {
        Some(center) => info!(
            "[main] peak {} dBFS, rms {} dBFS, loudest band {center:.0} Hz",
            format_dbfs(reading.peak_dbfs),
            format_dbfs(reading.rms_dbfs)
        ),
        None => info!(
            "[main] peak {} dBFS, rms {} dBFS",
            format_dbfs(reading.peak_dbfs),
            format_dbfs(reading.rms_dbfs)
        ),
    }
}

/// Analyse a synthesized clip at simulated display rate, without sleeping.
fn run_file(settings: AnalyzerSettings) -> Result<()> {
    let frames = SAMPLE_RATE as usize * FILE_SECONDS;
    let mut samples = Vec::with_capacity(frames * CHANNELS);
    synth_interleaved(0, frames, &mut samples);

    let mut analyzer =
        Analyzer::from_samples(samples, SampleFormat::new(SAMPLE_RATE, CHANNELS), settings)?;
    if let Err(err) = analyzer.handle_resize(960, 540) {
        warn!("[main] resize failed: {err}");
    }

    let dt = TICK.as_secs_f64();
    let mut elapsed = 0.0;
    let mut next_report = 1.0;
    while !analyzer.done() {
        analyzer.update(dt);
        elapsed += dt;
        if elapsed >= next_report {
            report(&analyzer);
            next_report += 1.0;
        }
    }
    info!(
        "[main] file run finished: {} windows in {elapsed:.2} s",
        analyzer.windows_processed()
    );
    Ok(())
}

fn spawn_capture(mut sink: CaptureSink) -> Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("bandscope-capture".into())
        .spawn(move || {
            let block = Duration::from_secs_f64(CALLBACK_FRAMES as f64 / f64::from(SAMPLE_RATE));
            let total = (LIVE_SECONDS * f64::from(SAMPLE_RATE)) as usize;
            let mut buffer = Vec::with_capacity(CALLBACK_FRAMES * sink.channels());
            let mut frame = 0;
            while frame < total {
                synth_interleaved(frame, CALLBACK_FRAMES, &mut buffer);
                sink.on_input(&buffer);
                frame += CALLBACK_FRAMES;
                thread::sleep(block);
            }
        })
        .context("spawn capture thread")
}

/// Feed the analyzer from a simulated audio callback in real time.
fn run_live(settings: AnalyzerSettings) -> Result<()> {
    let (sink, window) = capture_channel(SAMPLE_RATE, CHANNELS);
    let mut analyzer = Analyzer::live(window, SAMPLE_RATE, settings)?;
    let capture = spawn_capture(sink)?;

    let mut last = Instant::now();
    let mut next_report = Instant::now() + Duration::from_secs(1);
    while !analyzer.done() {
        thread::sleep(TICK);
        let now = Instant::now();
        analyzer.update(now.duration_since(last).as_secs_f64());
        last = now;
        if now >= next_report {
            report(&analyzer);
            next_report += Duration::from_secs(1);
        }
    }

    if capture.join().is_err() {
        warn!("[main] capture thread panicked");
    }
    report(&analyzer);
    info!(
        "[main] live run finished: {} windows",
        analyzer.windows_processed()
    );
    Ok(())
}
