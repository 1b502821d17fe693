use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::detection::{EpisodeResetPolicy, ZoneThresholds};
use crate::sampling::DEFAULT_WINDOW_CAPACITY;
use crate::sensor::JointKind;

pub const APPROACH_CUE: &str = "approach";
pub const CAPTURE_CUE: &str = "capture";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct DetectionSettings {
    pub window_capacity: usize,
    pub x_threshold: f32,
    pub z_threshold: f32,
    /// Joints of the first tracked body that feed the sample window.
    pub joints: Vec<JointKind>,
    pub episode_reset: EpisodeResetPolicy,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        let zone = ZoneThresholds::default();
        Self {
            window_capacity: DEFAULT_WINDOW_CAPACITY,
            x_threshold: zone.x,
            z_threshold: zone.z,
            joints: vec![JointKind::SpineBase],
            episode_reset: EpisodeResetPolicy::Never,
        }
    }
}

impl DetectionSettings {
    pub fn thresholds(&self) -> ZoneThresholds {
        ZoneThresholds {
            x: self.x_threshold,
            z: self.z_threshold,
        }
    }
}

/// Remote endpoints. An endpoint left unset makes its notification fail with
/// a transport error, which is logged like any other.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct EndpointSettings {
    pub move_url: Option<String>,
    pub intruder_url: Option<String>,
    pub captured_url: Option<String>,
    pub image_url: Option<String>,
    pub report_positions: bool,
    pub upload_captures: bool,
    pub timeout_secs: u64,
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            move_url: None,
            intruder_url: None,
            captured_url: None,
            image_url: None,
            report_positions: false,
            upload_captures: false,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct SoundSettings {
    /// Cue name to audio file.
    pub cues: HashMap<String, PathBuf>,
    pub volume: f32,
}

impl Default for SoundSettings {
    fn default() -> Self {
        let mut cues = HashMap::new();
        cues.insert(APPROACH_CUE.to_string(), PathBuf::from("sounds/approach.wav"));
        cues.insert(CAPTURE_CUE.to_string(), PathBuf::from("sounds/capture.wav"));
        Self { cues, volume: 1.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CaptureSettings {
    pub directory: PathBuf,
    pub file_prefix: String,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("captures"),
            file_prefix: "Screenshot-Color".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ReplaySettings {
    pub frame_interval_ms: u64,
}

impl Default for ReplaySettings {
    fn default() -> Self {
        // body frames arrive at 30 Hz
        Self {
            frame_interval_ms: 33,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct SentrySettings {
    pub detection: DetectionSettings,
    pub endpoints: EndpointSettings,
    pub sounds: SoundSettings,
    pub capture: CaptureSettings,
    pub replay: ReplaySettings,
}

impl SentrySettings {
    pub fn validate(&self) -> Result<()> {
        if self.detection.window_capacity == 0 {
            bail!("detection.windowCapacity must be at least 1");
        }
        if !(self.detection.x_threshold > 0.0 && self.detection.z_threshold > 0.0) {
            bail!("detection thresholds must be positive");
        }
        if self.detection.joints.is_empty() {
            bail!("detection.joints must name at least one joint");
        }
        Ok(())
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<SentrySettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log::warn!(
                    "Ignoring unparsable settings at {}: {err}; using defaults",
                    path.display()
                );
                SentrySettings::default()
            })
        } else {
            SentrySettings::default()
        };
        data.validate()
            .with_context(|| format!("Invalid settings in {}", path.display()))?;

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn snapshot(&self) -> SentrySettings {
        self.read().clone()
    }

    pub fn detection(&self) -> DetectionSettings {
        self.read().detection.clone()
    }

    pub fn update_detection(&self, detection: DetectionSettings) -> Result<()> {
        let mut guard = self.write();
        let mut candidate = guard.clone();
        candidate.detection = detection;
        candidate.validate()?;
        self.persist(&candidate)?;
        *guard = candidate;
        Ok(())
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)?;
        let data: SentrySettings = serde_json::from_str(&contents)?;
        data.validate()?;
        *self.write() = data;
        Ok(())
    }

    fn persist(&self, data: &SentrySettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, SentrySettings> {
        match self.data.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, SentrySettings> {
        match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();
        let settings = store.snapshot();

        assert_eq!(settings.detection.window_capacity, 10);
        assert_eq!(settings.detection.thresholds(), ZoneThresholds { x: 0.3, z: 1.0 });
        assert_eq!(settings.detection.episode_reset, EpisodeResetPolicy::Never);
        assert!(settings.sounds.cues.contains_key(APPROACH_CUE));
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            r#"{ "detection": { "windowCapacity": 5, "episodeReset": "resetOnExit" },
                 "endpoints": { "intruderUrl": "http://localhost:9000/intruder" } }"#,
        )
        .unwrap();

        let settings = SettingsStore::new(path).unwrap().snapshot();
        assert_eq!(settings.detection.window_capacity, 5);
        assert_eq!(settings.detection.x_threshold, 0.3);
        assert_eq!(settings.detection.episode_reset, EpisodeResetPolicy::ResetOnExit);
        assert_eq!(
            settings.endpoints.intruder_url.as_deref(),
            Some("http://localhost:9000/intruder")
        );
        assert!(!settings.endpoints.report_positions);
    }

    #[test]
    fn zero_window_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "detection": { "windowCapacity": 0 } }"#).unwrap();
        assert!(SettingsStore::new(path).is_err());
    }

    #[test]
    fn update_persists_and_reloads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::new(path.clone()).unwrap();

        let mut detection = store.detection();
        detection.x_threshold = 0.5;
        store.update_detection(detection).unwrap();

        let reopened = SettingsStore::new(path).unwrap();
        assert_eq!(reopened.detection().x_threshold, 0.5);
        reopened.reload().unwrap();
        assert_eq!(reopened.detection().x_threshold, 0.5);
    }

    #[test]
    fn invalid_update_leaves_settings_untouched() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();

        let mut detection = store.detection();
        detection.joints.clear();
        assert!(store.update_detection(detection).is_err());
        assert_eq!(store.detection().joints, vec![JointKind::SpineBase]);
    }
}
