use anyhow::{bail, Result};
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::capture::FrameStore;
use crate::detection::Transition;
use crate::pipeline::FrameLoop;
use crate::sensor::{ReplaySource, SensorEvent};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info};

const MAX_CONSECUTIVE_READ_ERRORS: u32 = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub body_frames: u64,
    pub color_frames: u64,
    pub windows: u64,
    pub episodes: u64,
}

/// Feeds recorded frames into the frame loop at the sensor cadence. Body
/// frames are paced by `frame_interval`; color frames only refresh the frame
/// store.
pub async fn replay_loop(
    mut source: ReplaySource,
    mut frame_loop: FrameLoop,
    frames: FrameStore,
    frame_interval: Duration,
    cancel_token: CancellationToken,
) -> Result<ReplaySummary> {
    let mut ticker = tokio::time::interval(frame_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut summary = ReplaySummary::default();
    let mut read_errors = 0;

    loop {
        let next = tokio::select! {
            next = source.next_event() => next,
            _ = cancel_token.cancelled() => {
                log_info!("replay loop shutting down");
                break;
            }
        };

        let event = match next {
            Ok(Some(event)) => {
                read_errors = 0;
                event
            }
            Ok(None) => {
                log_info!("replay reached end of recording");
                break;
            }
            Err(err) => {
                read_errors += 1;
                log_error!("skipping replay record: {err:#}");
                if read_errors >= MAX_CONSECUTIVE_READ_ERRORS {
                    bail!("giving up after {read_errors} consecutive replay errors");
                }
                continue;
            }
        };

        match event {
            SensorEvent::Color(frame) => {
                summary.color_frames += 1;
                frames.update_frame(frame).await;
            }
            SensorEvent::Body(frame) => {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = cancel_token.cancelled() => break,
                }

                summary.body_frames += 1;
                for transition in frame_loop.on_body_frame(&frame) {
                    summary.windows += 1;
                    if transition == Transition::EnteredPresence {
                        summary.episodes += 1;
                    }
                }
            }
        }
    }

    Ok(summary)
}
