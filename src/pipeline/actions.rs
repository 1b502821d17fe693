use std::sync::Arc;

use anyhow::{Context, Result};

use crate::collaborators::{
    AudioPlayer, Endpoint, ImageStore, NotificationSender, Payload, PNG_CONTENT_TYPE,
};
use crate::dispatch::{IdempotencyScope, TaskDispatcher};
use crate::settings::{APPROACH_CUE, CAPTURE_CUE};
use crate::status::StatusReporter;

const ENABLE_LOGS: bool = true;

use crate::log_warn;

pub const NOTIFY_INTRUDER: &str = "notify-intruder";
pub const APPROACH_SOUND: &str = "approach-sound";
pub const CAPTURE_SOUND: &str = "capture-sound";
pub const CAPTURE_AND_NOTIFY: &str = "capture-and-notify";

/// The outside world as seen by the action bodies.
#[derive(Clone)]
pub struct Collaborators {
    pub notifier: Arc<dyn NotificationSender>,
    pub audio: Arc<dyn AudioPlayer>,
    pub images: Arc<dyn ImageStore>,
}

#[derive(Debug, Clone)]
pub struct CaptureOptions {
    pub file_prefix: String,
    /// Upload the PNG before sending the captured signal.
    pub upload: bool,
}

pub fn register_standard_actions(
    dispatcher: &TaskDispatcher,
    collaborators: &Collaborators,
    capture: CaptureOptions,
    status: &StatusReporter,
) {
    let notifier = Arc::clone(&collaborators.notifier);
    dispatcher.register(NOTIFY_INTRUDER, IdempotencyScope::PerProcess, move || {
        let notifier = Arc::clone(&notifier);
        async move {
            notifier
                .send(Endpoint::Intruder, Payload::None)
                .await
                .context("intruder notification failed")
        }
    });

    register_cue(dispatcher, APPROACH_SOUND, APPROACH_CUE, &collaborators.audio);
    register_cue(dispatcher, CAPTURE_SOUND, CAPTURE_CUE, &collaborators.audio);

    let collaborators = collaborators.clone();
    let status = status.clone();
    let capture = Arc::new(capture);
    dispatcher.register(CAPTURE_AND_NOTIFY, IdempotencyScope::PerEpisode, move || {
        capture_and_notify(collaborators.clone(), status.clone(), Arc::clone(&capture))
    });
}

fn register_cue(
    dispatcher: &TaskDispatcher,
    action: &'static str,
    cue: &'static str,
    audio: &Arc<dyn AudioPlayer>,
) {
    let audio = Arc::clone(audio);
    dispatcher.register(action, IdempotencyScope::PerEpisode, move || {
        let audio = Arc::clone(&audio);
        async move {
            audio
                .play(cue)
                .await
                .with_context(|| format!("could not play {cue} cue"))
        }
    });
}

/// Capture, persist, optionally upload, then signal. A failed capture or
/// write skips the notifications; the whole sequence is one ticket.
async fn capture_and_notify(
    collaborators: Collaborators,
    status: StatusReporter,
    options: Arc<CaptureOptions>,
) -> Result<()> {
    let png = collaborators
        .images
        .capture_current_frame()
        .await
        .context("capture failed")?;

    let path = collaborators
        .images
        .persist(&png, &options.file_prefix)
        .await
        .context("capture failed")?;
    status.set(format!("saved capture to {}", path.display()));

    if options.upload {
        let upload = collaborators
            .notifier
            .send(
                Endpoint::ImageUpload,
                Payload::Image {
                    bytes: png,
                    content_type: PNG_CONTENT_TYPE.to_string(),
                },
            )
            .await;
        if let Err(err) = upload {
            log_warn!("image upload failed: {err}");
        }
    }

    collaborators
        .notifier
        .send(Endpoint::Captured, Payload::None)
        .await
        .context("captured notification failed")
}
