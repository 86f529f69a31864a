// decibel conversion constants/utils

// Floor value (dB) below which power readings are clamped.
pub const DB_FLOOR: f32 = -140.0;

// Minimum power value to avoid log(0) in dB conversions.
const POWER_EPSILON: f32 = 1.0e-20;

// Natural log to decibel conversion factor: 10 / ln(10) ~= 4.342944819.
const LN_TO_DB: f32 = 4.342_944_8;

// Convert power (magnitude squared) to decibels with a custom floor.
#[inline(always)]
pub fn power_to_db(power: f32, floor: f32) -> f32 {
    if power > POWER_EPSILON {
        (power.ln() * LN_TO_DB).max(floor)
    } else {
        floor
    }
}

// Convert dB to linear power: 10^(db/10).
#[inline(always)]
pub fn db_to_power(db: f32) -> f32 {
    const DB_TO_LOG2: f32 = 0.1 * core::f32::consts::LOG2_10;
    (db * DB_TO_LOG2).exp2()
}

#[inline]
pub fn apply_window(buffer: &mut [f32], window: &[f32]) {
    debug_assert_eq!(buffer.len(), window.len());
    for (sample, coeff) in buffer.iter_mut().zip(window.iter()) {
        *sample *= *coeff;
    }
}

pub fn remove_dc(buffer: &mut [f32]) {
    if buffer.is_empty() {
        return;
    }

    let mean = buffer.iter().sum::<f32>() / buffer.len() as f32;
    for sample in buffer.iter_mut() {
        *sample -= mean;
    }
}

/// Fill `dst` with mono frames taken from interleaved `samples`, starting at
/// frame `start_frame`. Frames past the end of the source become silence.
/// Returns how many frames came from the source.
pub fn mixdown_into(dst: &mut [f32], samples: &[f32], channels: usize, start_frame: usize) -> usize {
    let channels = channels.max(1);
    let total_frames = samples.len() / channels;
    let available = total_frames.saturating_sub(start_frame).min(dst.len());

    let source = &samples[start_frame.min(total_frames) * channels..];
    match channels {
        1 => dst[..available].copy_from_slice(&source[..available]),
        2 => {
            for (out, frame) in dst[..available].iter_mut().zip(source.chunks_exact(2)) {
                *out = 0.5 * (frame[0] + frame[1]);
            }
        }
        _ => {
            let inv = 1.0 / channels as f32;
            for (out, frame) in dst[..available]
                .iter_mut()
                .zip(source.chunks_exact(channels))
            {
                *out = frame.iter().sum::<f32>() * inv;
            }
        }
    }

    dst[available..].fill(0.0);
    available
}

/// Text form of a dBFS reading: `--.-` before the first measurement,
/// `-inf` for digital silence.
pub fn format_dbfs(value: f32) -> String {
    if value.is_nan() {
        "--.-".to_string()
    } else if value.is_infinite() && value < 0.0 {
        "-inf".to_string()
    } else {
        format!("{value:.1}")
    }
}
