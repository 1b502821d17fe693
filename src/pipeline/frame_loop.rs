use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;

use crate::collaborators::{Endpoint, NotificationSender, Payload};
use crate::detection::{
    DetectionEpisode, EpisodeResetPolicy, PresenceDetector, PresenceState, Transition,
    ZoneThresholds,
};
use crate::dispatch::TaskDispatcher;
use crate::error::SentryResult;
use crate::sampling::{PositionSample, SampleBuffer, SmoothedEstimate};
use crate::sensor::{BodyFrame, JointKind};
use crate::settings::SentrySettings;
use crate::status::StatusReporter;

use super::actions::{APPROACH_SOUND, CAPTURE_AND_NOTIFY, CAPTURE_SOUND, NOTIFY_INTRUDER};

// Set to false to silence per-window logging
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

#[derive(Debug, Clone)]
pub struct FrameLoopConfig {
    pub window_capacity: usize,
    pub thresholds: ZoneThresholds,
    pub joints: Vec<JointKind>,
    pub episode_reset: EpisodeResetPolicy,
    pub report_positions: bool,
}

impl From<&SentrySettings> for FrameLoopConfig {
    fn from(settings: &SentrySettings) -> Self {
        Self {
            window_capacity: settings.detection.window_capacity,
            thresholds: settings.detection.thresholds(),
            joints: settings.detection.joints.clone(),
            episode_reset: settings.detection.episode_reset,
            // reports to an unset endpoint would only fail every window
            report_positions: settings.endpoints.report_positions
                && settings.endpoints.move_url.is_some(),
        }
    }
}

/// Per-sample orchestration. Must be driven from a single task; every side
/// effect goes through the dispatcher and never blocks this path.
pub struct FrameLoop {
    buffer: SampleBuffer,
    detector: PresenceDetector,
    dispatcher: TaskDispatcher,
    status: StatusReporter,
    notifier: Arc<dyn NotificationSender>,
    joints: Vec<JointKind>,
    episode_reset: EpisodeResetPolicy,
    report_positions: bool,
    episode: Option<DetectionEpisode>,
}

impl FrameLoop {
    pub fn new(
        config: FrameLoopConfig,
        dispatcher: TaskDispatcher,
        status: StatusReporter,
        notifier: Arc<dyn NotificationSender>,
    ) -> SentryResult<Self> {
        Ok(Self {
            buffer: SampleBuffer::new(config.window_capacity)?,
            detector: PresenceDetector::new(config.thresholds),
            dispatcher,
            status,
            notifier,
            joints: config.joints,
            episode_reset: config.episode_reset,
            report_positions: config.report_positions,
            episode: None,
        })
    }

    pub fn state(&self) -> PresenceState {
        self.detector.state()
    }

    pub fn episode(&self) -> Option<&DetectionEpisode> {
        self.episode.as_ref()
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Any tracked body at all raises the intruder signal, regardless of
    /// where it stands.
    pub fn observe_bodies(&mut self, tracked: usize) {
        if tracked > 0 && self.dispatcher.request_once(NOTIFY_INTRUDER) {
            log_info!("{} tracked body(ies) seen; intruder signal raised", tracked);
        }
    }

    pub fn on_body_frame(&mut self, frame: &BodyFrame) -> Vec<Transition> {
        self.observe_bodies(frame.tracked_count());

        frame
            .samples_for(&self.joints)
            .into_iter()
            .filter_map(|sample| self.on_sample(sample))
            .collect()
    }

    /// Returns the presence transition when this sample completed a window.
    pub fn on_sample(&mut self, sample: PositionSample) -> Option<Transition> {
        let estimate = self.buffer.push(sample)?;
        log_debug!("window estimate x={:.3} z={:.3}", estimate.x, estimate.z);

        if self.report_positions {
            self.report_position(estimate);
        }

        let transition = self.detector.evaluate(&estimate);
        match transition {
            Transition::EnteredPresence => self.enter_episode(),
            Transition::ExitedPresence => self.exit_episode(),
            Transition::NoChange => {}
        }

        if self.detector.state() == PresenceState::Present {
            self.dispatcher.request_once(CAPTURE_AND_NOTIFY);
        }

        Some(transition)
    }

    fn enter_episode(&mut self) {
        let episode = DetectionEpisode::begin(Utc::now());
        log_info!("subject entered presence zone (episode {})", episode.id);
        self.episode = Some(episode);
        self.status.set("subject entered presence zone");

        self.dispatcher.request_once(APPROACH_SOUND);
        self.dispatcher.request_once(CAPTURE_SOUND);
    }

    fn exit_episode(&mut self) {
        if let Some(episode) = self.episode.take() {
            log_info!(
                "subject left presence zone after {}ms (episode {})",
                episode.elapsed_ms(Utc::now()),
                episode.id
            );
        }
        self.status.set("subject left presence zone");

        if self.episode_reset == EpisodeResetPolicy::ResetOnExit {
            let reset = self.dispatcher.reset_episode_scoped_tickets();
            log_info!("reset {} episode action ticket(s)", reset);
        }
    }

    fn report_position(&self, estimate: SmoothedEstimate) {
        let notifier = Arc::clone(&self.notifier);
        self.dispatcher.fire_and_forget("position report", async move {
            notifier
                .send(Endpoint::Move, Payload::Position(estimate))
                .await
                .context("position report failed")
        });
    }
}
