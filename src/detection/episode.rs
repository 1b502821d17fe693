use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The interval between one `EnteredPresence` and the matching
/// `ExitedPresence`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DetectionEpisode {
    pub id: String,
    pub entered_at: DateTime<Utc>,
}

impl DetectionEpisode {
    pub fn begin(entered_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            entered_at,
        }
    }

    pub fn elapsed_ms(&self, now: DateTime<Utc>) -> i64 {
        (now - self.entered_at).num_milliseconds().max(0)
    }
}

/// Whether per-episode action tickets are cleared when the subject leaves the
/// zone. `Never` keeps the one-visit-only behavior: a second visit re-triggers
/// nothing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum EpisodeResetPolicy {
    Never,
    ResetOnExit,
}

impl Default for EpisodeResetPolicy {
    fn default() -> Self {
        EpisodeResetPolicy::Never
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn episodes_get_distinct_ids() {
        let now = Utc::now();
        assert_ne!(DetectionEpisode::begin(now).id, DetectionEpisode::begin(now).id);
    }

    #[test]
    fn elapsed_never_negative() {
        let now = Utc::now();
        let episode = DetectionEpisode::begin(now);
        assert_eq!(episode.elapsed_ms(now - Duration::seconds(5)), 0);
        assert_eq!(episode.elapsed_ms(now + Duration::milliseconds(1500)), 1500);
    }

    #[test]
    fn policy_defaults_to_never() {
        assert_eq!(EpisodeResetPolicy::default(), EpisodeResetPolicy::Never);
        let parsed: EpisodeResetPolicy = serde_json::from_str("\"resetOnExit\"").unwrap();
        assert_eq!(parsed, EpisodeResetPolicy::ResetOnExit);
    }
}
