//! Per-band ballistics: asymmetric envelope follower plus peak hold.

use crate::util::audio::{DB_FLOOR, db_to_power, power_to_db};

settings_enum!(
    /// Domain the envelope follower runs in.
    pub enum AveragingMode {
        #[default]
        Linear => "Lin",
        Decibel => "dB",
    }
);

settings_enum!(
    /// How long a fresh peak is held before it starts to fall.
    pub enum PeakHold {
        #[default]
        Off => "Off",
        Half => "0.5s",
        One => "1.0s",
        Two => "2.0s",
        Four => "4.0s",
    }
);

impl PeakHold {
    pub fn seconds(self) -> f32 {
        match self {
            Self::Off => 0.0,
            Self::Half => 0.5,
            Self::One => 1.0,
            Self::Two => 2.0,
            Self::Four => 4.0,
        }
    }
}

// Within this distance of the floor a dB-domain envelope snaps to silence.
const DECIBEL_SNAP: f32 = 0.5;

/// Attack/release time constants in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    attack: f32,
    release: f32,
}

impl Envelope {
    pub fn from_millis(attack_ms: f32, release_ms: f32) -> Self {
        Self {
            attack: attack_ms.max(0.0) / 1_000.0,
            release: release_ms.max(0.0) / 1_000.0,
        }
    }

    /// `1 - exp(-dt / tau)`; a zero time constant jumps straight to target.
    #[inline]
    fn coefficient(tau: f32, dt: f32) -> f32 {
        if tau <= 0.0 {
            1.0
        } else {
            1.0 - (-dt / tau).exp()
        }
    }

    #[inline]
    pub fn follow(&self, current: f32, target: f32, dt: f32) -> f32 {
        let tau = if target > current {
            self.attack
        } else {
            self.release
        };
        let coefficient = Self::coefficient(tau, dt);
        if coefficient >= 1.0 {
            return target;
        }
        current + coefficient * (target - current)
    }

    pub fn apply(&self, mode: AveragingMode, targets: &[f32], smoothed: &mut [f32], dt: f32) {
        match mode {
            AveragingMode::Linear => {
                for (value, &target) in smoothed.iter_mut().zip(targets) {
                    *value = self.follow(*value, target, dt).max(0.0);
                }
            }
            AveragingMode::Decibel => {
                for (value, &target) in smoothed.iter_mut().zip(targets) {
                    let current_db = power_to_db(*value, DB_FLOOR);
                    let target_db = power_to_db(target, DB_FLOOR);
                    let next_db = self.follow(current_db, target_db, dt);
                    *value = if next_db - DB_FLOOR < DECIBEL_SNAP {
                        0.0
                    } else {
                        db_to_power(next_db)
                    };
                }
            }
        }
    }
}

/// Peak indicator: snaps up, holds, then decays at a fixed dB/s rate without
/// ever dropping below the smoothed level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakTracker {
    decay_db_per_sec: f32,
    hold_secs: f32,
}

impl PeakTracker {
    pub fn new(decay_db_per_sec: f32, hold: PeakHold) -> Self {
        Self {
            decay_db_per_sec: decay_db_per_sec.max(0.0),
            hold_secs: hold.seconds(),
        }
    }

    pub fn set_hold(&mut self, hold: PeakHold) {
        self.hold_secs = hold.seconds();
    }

    pub fn update(&self, smoothed: &[f32], peaks: &mut [f32], hold: &mut [f32], dt: f32) {
        let decay = 10f32.powf(-self.decay_db_per_sec * dt / 10.0);
        for ((peak, remaining), &level) in peaks.iter_mut().zip(hold.iter_mut()).zip(smoothed) {
            if level > *peak {
                *peak = level;
                *remaining = self.hold_secs;
            } else if *remaining > 0.0 {
                *remaining = (*remaining - dt).max(0.0);
            } else {
                *peak = (*peak * decay).max(level);
            }
        }
    }
}
