//! Interval peak/RMS metering in dBFS.

const DB_FACTOR: f64 = 20.0;
// Linear amplitudes below this read as digital silence (-inf dBFS).
const MIN_LINEAR: f64 = 1e-10;

fn linear_to_dbfs(value: f64) -> f32 {
    if value < MIN_LINEAR {
        f32::NEG_INFINITY
    } else {
        (DB_FACTOR * value.log10()) as f32
    }
}

/// Most recent completed measurement. Both values are NaN until the first
/// interval completes, and again for any interval that saw no samples.
#[derive(Debug, Clone, Copy)]
pub struct MeterReading {
    pub peak_dbfs: f32,
    pub rms_dbfs: f32,
}

impl MeterReading {
    pub const UNDEFINED: Self = Self {
        peak_dbfs: f32::NAN,
        rms_dbfs: f32::NAN,
    };

    pub fn is_defined(&self) -> bool {
        !self.peak_dbfs.is_nan() && !self.rms_dbfs.is_nan()
    }
}

impl Default for MeterReading {
    fn default() -> Self {
        Self::UNDEFINED
    }
}

/// Accumulates raw mono samples and publishes a reading once per interval
/// of caller-supplied time.
#[derive(Debug, Clone)]
pub struct LoudnessMeter {
    interval: f64,
    elapsed: f64,
    sum_sq: f64,
    peak: f64,
    count: u64,
    reading: MeterReading,
}

impl LoudnessMeter {
    pub fn new(interval_secs: f64) -> Self {
        Self {
            interval: if interval_secs.is_finite() && interval_secs > 0.0 {
                interval_secs
            } else {
                1.0
            },
            elapsed: 0.0,
            sum_sq: 0.0,
            peak: 0.0,
            count: 0,
            reading: MeterReading::UNDEFINED,
        }
    }

    pub fn reading(&self) -> MeterReading {
        self.reading
    }

    pub fn accumulate(&mut self, samples: &[f32]) {
        for &sample in samples {
            let value = f64::from(sample);
            self.sum_sq += value * value;
            self.peak = self.peak.max(value.abs());
        }
        self.count += samples.len() as u64;
    }

    /// Advance the interval clock; returns the new reading when one completes.
    pub fn advance(&mut self, dt: f64) -> Option<MeterReading> {
        self.elapsed += dt;
        if self.elapsed < self.interval {
            return None;
        }

        // Keep the fractional remainder so intervals don't drift.
        self.elapsed -= self.interval;
        if self.elapsed >= self.interval {
            self.elapsed %= self.interval;
        }

        self.reading = if self.count == 0 {
            MeterReading::UNDEFINED
        } else {
            let rms = (self.sum_sq / self.count as f64).sqrt();
            MeterReading {
                peak_dbfs: linear_to_dbfs(self.peak),
                rms_dbfs: linear_to_dbfs(rms),
            }
        };

        self.sum_sq = 0.0;
        self.peak = 0.0;
        self.count = 0;
        Some(self.reading)
    }

    pub fn reset(&mut self) {
        self.elapsed = 0.0;
        self.sum_sq = 0.0;
        self.peak = 0.0;
        self.count = 0;
        self.reading = MeterReading::UNDEFINED;
    }
}
