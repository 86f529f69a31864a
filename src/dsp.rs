macro_rules! settings_enum {
    ($(#[$attr:meta])* $vis:vis enum $name:ident { $($(#[$var_attr:meta])* $variant:ident => $label:expr),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, ::serde::Serialize, ::serde::Deserialize, PartialEq, Eq, Hash, Default)]
        #[serde(rename_all = "snake_case")] $(#[$attr])*
        $vis enum $name { $($(#[$var_attr])* $variant,)+ }
        impl $name {
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];
        }
        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(match self { $(Self::$variant => $label),+ })
            }
        }
    };
}

pub mod analyzer;
pub mod bands;
pub mod layout;
pub mod loudness;
pub mod preprocess;
pub mod smoothing;
pub mod transform;

/// Samples per analysis window (power of two).
pub const WINDOW_SIZE: usize = 4096;
/// Samples advanced between successive windows.
pub const HOP_SIZE: usize = WINDOW_SIZE / 4;
/// Cutoff of the single-pole high-pass applied ahead of the FFT.
pub const HPF_CUTOFF_HZ: f32 = 1.0;
/// Lowest analysed frequency; the highest is Nyquist.
pub const MIN_FREQUENCY_HZ: f32 = 20.0;

pub const LINEAR_ATTACK_MS: f32 = 2.0;
pub const LINEAR_RELEASE_MS: f32 = 100.0;
pub const DECIBEL_ATTACK_MS: f32 = 10.0;
pub const DECIBEL_RELEASE_MS: f32 = 300.0;
pub const PEAK_DECAY_DB_PER_SEC: f32 = 3.0;

/// Wall-clock length of one loudness measurement.
pub const METER_INTERVAL_SECS: f64 = 1.0;
/// Upper bound on live hops analysed per tick after a stall.
pub const MAX_LIVE_HOPS_PER_TICK: usize = 4;

/// Shape of the incoming sample stream, fixed for a stream's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleFormat {
    pub sample_rate: u32,
    pub channels: usize,
}

impl SampleFormat {
    pub const fn new(sample_rate: u32, channels: usize) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    pub fn nyquist(&self) -> f32 {
        self.sample_rate as f32 * 0.5
    }

    pub fn hop_seconds(&self) -> f64 {
        HOP_SIZE as f64 / f64::from(self.sample_rate.max(1))
    }
}

/// Applied by the control surface between ticks.
pub trait Reconfigurable<Cfg> {
    fn update_config(&mut self, config: Cfg);
}
