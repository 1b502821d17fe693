use std::{path::Path, sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use log::info;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::audio::AudioEngineHandle;
use crate::capture::FrameStore;
use crate::collaborators::NotificationSender;
use crate::dispatch::TaskDispatcher;
use crate::notify::HttpNotifier;
use crate::pipeline::{
    register_standard_actions, CaptureOptions, Collaborators, FrameLoop, FrameLoopConfig,
};
use crate::sensor::ReplaySource;
use crate::settings::SentrySettings;
use crate::status::StatusReporter;

use super::loop_worker::{replay_loop, ReplaySummary};

/// Owns one replay run: the pipeline task plus the dispatcher whose workers
/// outlive individual frames.
pub struct ReplayController {
    handle: Option<JoinHandle<Result<ReplaySummary>>>,
    cancel_token: CancellationToken,
    dispatcher: Option<TaskDispatcher>,
    status: StatusReporter,
}

impl ReplayController {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: CancellationToken::new(),
            dispatcher: None,
            status: StatusReporter::new(),
        }
    }

    pub fn status(&self) -> &StatusReporter {
        &self.status
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    pub async fn start(&mut self, settings: &SentrySettings, replay_path: &Path) -> Result<()> {
        if self.handle.is_some() {
            bail!("replay already active");
        }
        settings.validate()?;

        let notifier: Arc<dyn NotificationSender> = Arc::new(
            HttpNotifier::new(settings.endpoints.clone()).context("failed to build HTTP client")?,
        );
        let frames = FrameStore::new(settings.capture.directory.clone());
        let collaborators = Collaborators {
            notifier: Arc::clone(&notifier),
            audio: Arc::new(AudioEngineHandle::new(
                settings.sounds.cues.clone(),
                settings.sounds.volume,
            )),
            images: Arc::new(frames.clone()),
        };

        let dispatcher = TaskDispatcher::new(Handle::current(), self.status.clone());
        register_standard_actions(
            &dispatcher,
            &collaborators,
            CaptureOptions {
                file_prefix: settings.capture.file_prefix.clone(),
                upload: settings.endpoints.upload_captures,
            },
            &self.status,
        );

        let frame_loop = FrameLoop::new(
            FrameLoopConfig::from(settings),
            dispatcher.clone(),
            self.status.clone(),
            notifier,
        )?;
        let source = ReplaySource::open(replay_path).await?;

        info!(
            "replaying {} (window {}, zone x<={} z<={})",
            replay_path.display(),
            settings.detection.window_capacity,
            settings.detection.x_threshold,
            settings.detection.z_threshold
        );

        let handle = tokio::spawn(replay_loop(
            source,
            frame_loop,
            frames,
            Duration::from_millis(settings.replay.frame_interval_ms),
            self.cancel_token.clone(),
        ));

        self.handle = Some(handle);
        self.dispatcher = Some(dispatcher);
        Ok(())
    }

    /// Waits for the replay to finish (or be cancelled), then lets in-flight
    /// actions complete. Cancellation also cancels the actions.
    pub async fn join(&mut self) -> Result<ReplaySummary> {
        let Some(handle) = self.handle.take() else {
            bail!("replay not started");
        };

        let summary = handle.await.context("replay task failed to join")??;

        if let Some(dispatcher) = self.dispatcher.take() {
            if self.cancel_token.is_cancelled() {
                dispatcher.shutdown().await;
            } else {
                dispatcher.wait_idle().await;
            }
        }

        Ok(summary)
    }

    pub async fn stop(&mut self) -> Result<ReplaySummary> {
        self.cancel_token.cancel();
        self.join().await
    }
}

impl Default for ReplayController {
    fn default() -> Self {
        Self::new()
    }
}
