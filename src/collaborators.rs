use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SentryResult;
use crate::sampling::SmoothedEstimate;

pub const PNG_CONTENT_TYPE: &str = "image/png";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Endpoint {
    /// Per-window position report.
    Move,
    /// Liveness signal sent the first time any body is tracked.
    Intruder,
    /// Sent once a capture has been persisted.
    Captured,
    ImageUpload,
}

impl Endpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::Move => "move",
            Endpoint::Intruder => "intruder",
            Endpoint::Captured => "captured",
            Endpoint::ImageUpload => "image",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    None,
    Position(SmoothedEstimate),
    Image { bytes: Vec<u8>, content_type: String },
}

#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(&self, endpoint: Endpoint, payload: Payload) -> SentryResult<()>;
}

#[async_trait]
pub trait AudioPlayer: Send + Sync {
    async fn play(&self, cue: &str) -> SentryResult<()>;
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Encoded bytes of the most recent color frame.
    async fn capture_current_frame(&self) -> SentryResult<Vec<u8>>;

    async fn persist(&self, bytes: &[u8], suggested_name: &str) -> SentryResult<PathBuf>;
}
