//! User-facing analyzer settings and their JSON persistence.

use crate::dsp::bands::FractionalOctave;
use crate::dsp::smoothing::{AveragingMode, PeakHold};
use crate::dsp::{
    DECIBEL_ATTACK_MS, DECIBEL_RELEASE_MS, LINEAR_ATTACK_MS, LINEAR_RELEASE_MS,
    PEAK_DECAY_DB_PER_SEC,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerSettings {
    pub fractional_octave: FractionalOctave,
    pub averaging: AveragingMode,
    pub linear_attack_ms: f32,
    pub linear_release_ms: f32,
    pub decibel_attack_ms: f32,
    pub decibel_release_ms: f32,
    pub pink_compensation: bool,
    pub peak_hold: PeakHold,
    pub peak_decay_db_per_sec: f32,
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self {
            fractional_octave: FractionalOctave::default(),
            averaging: AveragingMode::default(),
            linear_attack_ms: LINEAR_ATTACK_MS,
            linear_release_ms: LINEAR_RELEASE_MS,
            decibel_attack_ms: DECIBEL_ATTACK_MS,
            decibel_release_ms: DECIBEL_RELEASE_MS,
            pink_compensation: true,
            peak_hold: PeakHold::default(),
            peak_decay_db_per_sec: PEAK_DECAY_DB_PER_SEC,
        }
    }
}

impl AnalyzerSettings {
    /// Replace non-positive or non-finite timings and rates with their defaults.
    pub fn sanitize(&mut self) {
        fn repair(value: &mut f32, fallback: f32, name: &str) {
            if !value.is_finite() || *value <= 0.0 {
                debug!("[settings] {name}={value} is invalid; using {fallback}");
                *value = fallback;
            }
        }
        repair(&mut self.linear_attack_ms, LINEAR_ATTACK_MS, "linear_attack_ms");
        repair(&mut self.linear_release_ms, LINEAR_RELEASE_MS, "linear_release_ms");
        repair(&mut self.decibel_attack_ms, DECIBEL_ATTACK_MS, "decibel_attack_ms");
        repair(&mut self.decibel_release_ms, DECIBEL_RELEASE_MS, "decibel_release_ms");
        repair(
            &mut self.peak_decay_db_per_sec,
            PEAK_DECAY_DB_PER_SEC,
            "peak_decay_db_per_sec",
        );
    }

    pub fn sanitized(mut self) -> Self {
        self.sanitize();
        self
    }
}

pub fn default_path() -> PathBuf {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bandscope")
        .join("settings.json")
}

#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    data: AnalyzerSettings,
}

impl SettingsStore {
    pub fn load_or_default(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = fs::read_to_string(&path)
            .ok()
            .and_then(|s| {
                serde_json::from_str::<AnalyzerSettings>(&s)
                    .map_err(|e| warn!("[settings] parse error {path:?}: {e}"))
                    .ok()
            })
            .unwrap_or_default()
            .sanitized();
        Self { path, data }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &AnalyzerSettings {
        &self.data
    }

    pub fn update<F: FnOnce(&mut AnalyzerSettings) -> R, R>(&mut self, mutate: F) -> R {
        let result = mutate(&mut self.data);
        self.data.sanitize();
        result
    }

    /// Write atomically through a temporary sibling file.
    pub fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.data).context("serialise settings")?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create settings directory {parent:?}"))?;
        }
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, &json).with_context(|| format!("write {temp_path:?}"))?;
        fs::rename(&temp_path, &self.path)
            .with_context(|| format!("replace {:?}", self.path))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SettingsStore::load_or_default(dir.path().join("nope.json"));
        assert_eq!(*store.settings(), AnalyzerSettings::default());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("settings.json");

        let mut store = SettingsStore::load_or_default(&path);
        store.update(|s| {
            s.fractional_octave = FractionalOctave::Sixth;
            s.averaging = AveragingMode::Decibel;
            s.peak_hold = PeakHold::Two;
            s.pink_compensation = false;
        });
        store.save().expect("save");

        let reloaded = SettingsStore::load_or_default(&path);
        assert_eq!(reloaded.settings(), store.settings());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn partial_and_invalid_fields_are_repaired() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            r#"{ "fractional_octave": "third", "linear_release_ms": -5.0 }"#,
        )
        .expect("write");

        let store = SettingsStore::load_or_default(&path);
        let settings = store.settings();
        assert_eq!(settings.fractional_octave, FractionalOctave::Third);
        assert_eq!(settings.linear_release_ms, LINEAR_RELEASE_MS);
        assert_eq!(settings.averaging, AveragingMode::Linear);
    }

    #[test]
    fn zero_times_and_rates_are_repaired() {
        let settings = AnalyzerSettings {
            linear_attack_ms: 0.0,
            linear_release_ms: 0.0,
            decibel_release_ms: f32::NAN,
            peak_decay_db_per_sec: 0.0,
            ..AnalyzerSettings::default()
        }
        .sanitized();
        assert_eq!(settings.linear_attack_ms, LINEAR_ATTACK_MS);
        assert_eq!(settings.linear_release_ms, LINEAR_RELEASE_MS);
        assert_eq!(settings.decibel_release_ms, DECIBEL_RELEASE_MS);
        assert_eq!(settings.peak_decay_db_per_sec, PEAK_DECAY_DB_PER_SEC);

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "peak_decay_db_per_sec": 0.0 }"#).expect("write");
        let store = SettingsStore::load_or_default(&path);
        assert_eq!(store.settings().peak_decay_db_per_sec, PEAK_DECAY_DB_PER_SEC);
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").expect("write");
        let store = SettingsStore::load_or_default(&path);
        assert_eq!(*store.settings(), AnalyzerSettings::default());
    }

    #[test]
    fn enum_labels_match_overlay_text() {
        assert_eq!(FractionalOctave::TwentyFourth.to_string(), "1/24");
        assert_eq!(AveragingMode::Decibel.to_string(), "dB");
        assert_eq!(PeakHold::Off.to_string(), "Off");
    }
}
