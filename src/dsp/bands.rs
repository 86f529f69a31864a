//! Log-spaced, constant-Q bands built from linear FFT bins.

use std::collections::TryReserveError;

settings_enum!(
    /// Bandwidth of one band as a fraction of an octave.
    pub enum FractionalOctave {
        Full => "1/1",
        Third => "1/3",
        Sixth => "1/6",
        Twelfth => "1/12",
        #[default]
        TwentyFourth => "1/24",
        FortyEighth => "1/48",
    }
);

impl FractionalOctave {
    pub fn octaves(self) -> f32 {
        match self {
            Self::Full => 1.0,
            Self::Third => 1.0 / 3.0,
            Self::Sixth => 1.0 / 6.0,
            Self::Twelfth => 1.0 / 12.0,
            Self::TwentyFourth => 1.0 / 24.0,
            Self::FortyEighth => 1.0 / 48.0,
        }
    }

    /// Closest member of the set for an arbitrary fraction; anything that is
    /// not a positive finite number falls back to the default.
    pub fn nearest(octaves: f64) -> Self {
        if !octaves.is_finite() || octaves <= 0.0 {
            return Self::default();
        }
        let target = octaves.ln();
        Self::ALL
            .iter()
            .copied()
            .min_by(|a, b| {
                let da = (f64::from(a.octaves()).ln() - target).abs();
                let db = (f64::from(b.octaves()).ln() - target).abs();
                da.total_cmp(&db)
            })
            .unwrap_or_default()
    }

    /// Half-bandwidth factor `k`: a band spans `[fc / k, fc * k]`.
    pub fn edge_factor(self) -> f32 {
        (self.octaves() * 0.5).exp2()
    }
}

/// Log-frequency axis shared by every band count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandLayout {
    f_min: f32,
    f_max: f32,
    log_ratio: f32,
}

impl BandLayout {
    pub fn new(f_min: f32, f_max: f32) -> Self {
        let f_min = f_min.max(f32::MIN_POSITIVE);
        let f_max = f_max.max(f_min * 1.01);
        Self {
            f_min,
            f_max,
            log_ratio: (f_max / f_min).ln(),
        }
    }

    pub fn f_min(&self) -> f32 {
        self.f_min
    }

    pub fn f_max(&self) -> f32 {
        self.f_max
    }

    /// `f_min * (f_max / f_min)^(index / (count - 1))`.
    pub fn center(&self, index: usize, count: usize) -> f32 {
        let t = if count > 1 {
            index as f32 / (count - 1) as f32
        } else {
            0.0
        };
        self.f_min * (self.log_ratio * t).exp()
    }

    pub fn index_of_frequency(&self, freq_hz: f32, count: usize) -> usize {
        if count == 0 {
            return 0;
        }
        let f = freq_hz.clamp(self.f_min, self.f_max);
        let position = (f / self.f_min).ln() / self.log_ratio * (count - 1) as f32;
        (position.round().max(0.0) as usize).min(count - 1)
    }
}

/// Per-band arrays. All fields always share one length and indexing.
#[derive(Debug, Clone, Default)]
pub struct BandState {
    targets: Vec<f32>,
    smoothed: Vec<f32>,
    peaks: Vec<f32>,
    centers: Vec<f32>,
    hold: Vec<f32>,
}

impl BandState {
    pub fn allocate(layout: &BandLayout, count: usize) -> Result<Self, TryReserveError> {
        let mut state = Self::reserve(count)?;
        state.targets.resize(count, 0.0);
        state.smoothed.resize(count, 0.0);
        state.peaks.resize(count, 0.0);
        state.hold.resize(count, 0.0);
        state
            .centers
            .extend((0..count).map(|index| layout.center(index, count)));
        Ok(state)
    }

    /// Build a state with `count` bands, seeding each from the old band
    /// closest to it in log-frequency.
    pub fn remapped(&self, layout: &BandLayout, count: usize) -> Result<Self, TryReserveError> {
        let mut state = Self::reserve(count)?;
        for index in 0..count {
            let center = layout.center(index, count);
            state.centers.push(center);
            match self.nearest_band(center) {
                Some(old) => {
                    state.targets.push(self.targets[old]);
                    state.smoothed.push(self.smoothed[old]);
                    state.peaks.push(self.peaks[old]);
                    state.hold.push(self.hold[old]);
                }
                None => {
                    state.targets.push(0.0);
                    state.smoothed.push(0.0);
                    state.peaks.push(0.0);
                    state.hold.push(0.0);
                }
            }
        }
        Ok(state)
    }

    fn reserve(count: usize) -> Result<Self, TryReserveError> {
        let mut state = Self::default();
        state.targets.try_reserve_exact(count)?;
        state.smoothed.try_reserve_exact(count)?;
        state.peaks.try_reserve_exact(count)?;
        state.centers.try_reserve_exact(count)?;
        state.hold.try_reserve_exact(count)?;
        Ok(state)
    }

    fn nearest_band(&self, freq_hz: f32) -> Option<usize> {
        if self.centers.is_empty() {
            return None;
        }
        let split = self.centers.partition_point(|&c| c < freq_hz);
        let distance = |i: usize| (self.centers[i].ln() - freq_hz.ln()).abs();
        let candidates = [split.checked_sub(1), Some(split).filter(|&i| i < self.centers.len())];
        candidates
            .into_iter()
            .flatten()
            .min_by(|&a, &b| distance(a).total_cmp(&distance(b)))
    }

    pub fn len(&self) -> usize {
        self.centers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }

    pub fn targets(&self) -> &[f32] {
        &self.targets
    }

    pub fn smoothed(&self) -> &[f32] {
        &self.smoothed
    }

    pub fn peaks(&self) -> &[f32] {
        &self.peaks
    }

    pub fn centers(&self) -> &[f32] {
        &self.centers
    }

    pub(crate) fn targets_mut(&mut self) -> (&mut [f32], &[f32]) {
        (&mut self.targets, &self.centers)
    }

    pub(crate) fn envelope_mut(&mut self) -> (&[f32], &mut [f32]) {
        (&self.targets, &mut self.smoothed)
    }

    pub(crate) fn peaks_mut(&mut self) -> (&[f32], &mut [f32], &mut [f32]) {
        (&self.smoothed, &mut self.peaks, &mut self.hold)
    }
}

/// Folds FFT amplitudes into band powers.
#[derive(Debug, Clone, Copy)]
pub struct BandMapper {
    layout: BandLayout,
    edge_factor: f32,
    bins_per_hz: f32,
    pink_compensation: bool,
}

impl BandMapper {
    /// `bins` is the FFT output length (`N / 2 + 1`) and `nyquist` the
    /// frequency of its last bin.
    pub fn new(layout: BandLayout, bins: usize, nyquist: f32, resolution: FractionalOctave) -> Self {
        Self {
            layout,
            edge_factor: resolution.edge_factor(),
            bins_per_hz: bins.saturating_sub(1) as f32 / nyquist.max(f32::MIN_POSITIVE),
            pink_compensation: true,
        }
    }

    pub fn set_resolution(&mut self, resolution: FractionalOctave) {
        self.edge_factor = resolution.edge_factor();
    }

    pub fn set_pink_compensation(&mut self, enabled: bool) {
        self.pink_compensation = enabled;
    }

    pub fn map(&self, magnitudes: &[f32], state: &mut BandState) {
        let (targets, centers) = state.targets_mut();
        for (index, (target, &center)) in targets.iter_mut().zip(centers.iter()).enumerate() {
            *target = self.band_power(magnitudes, center, index == 0);
        }
    }

    /// Weight-normalised mean power over `[fc / k, fc * k]`.
    ///
    /// Bin `i` owns the cell `[i - 0.5, i + 0.5]` in bin units; edge bins
    /// contribute in proportion to how much of their cell the band covers.
    pub fn band_power(&self, magnitudes: &[f32], center: f32, includes_dc: bool) -> f32 {
        let Some(last_bin) = magnitudes.len().checked_sub(1) else {
            return 0.0;
        };

        let low_hz = (center / self.edge_factor).max(self.layout.f_min());
        let high_hz = (center * self.edge_factor).min(self.layout.f_max());

        let low = if includes_dc {
            -0.5
        } else {
            (low_hz * self.bins_per_hz).max(-0.5)
        };
        let high = (high_hz * self.bins_per_hz).min(last_bin as f32 + 0.5);
        if high <= low {
            return 0.0;
        }

        let first = (low + 0.5).floor().max(0.0) as usize;
        let end = ((high + 0.5).ceil().max(0.0) as usize).min(last_bin + 1);

        let mut weight_sum = 0.0f32;
        let mut power_sum = 0.0f32;
        for (bin, &magnitude) in magnitudes.iter().enumerate().take(end).skip(first) {
            let cell_low = bin as f32 - 0.5;
            let cell_high = bin as f32 + 0.5;
            let weight = high.min(cell_high) - low.max(cell_low);
            if weight <= 0.0 {
                continue;
            }
            weight_sum += weight;
            power_sum += weight * magnitude * magnitude;
        }

        if weight_sum <= 0.0 {
            return 0.0;
        }

        let power = power_sum / weight_sum;
        if self.pink_compensation {
            power * (center / 1_000.0)
        } else {
            power
        }
    }
}
