use std::{
    io::Cursor,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use chrono::Local;
use image::{ImageFormat, RgbaImage};
use tokio::sync::Mutex;

use crate::collaborators::ImageStore;
use crate::error::{SentryError, SentryResult};
use crate::sensor::ColorFrame;

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Keeps the latest color frame and writes PNG captures of it to disk.
#[derive(Clone)]
pub struct FrameStore {
    latest: Arc<Mutex<Option<ColorFrame>>>,
    directory: PathBuf,
}

impl FrameStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            latest: Arc::new(Mutex::new(None)),
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Replaces the held frame. Frames whose buffer does not match their
    /// dimensions are dropped.
    pub async fn update_frame(&self, frame: ColorFrame) {
        if !frame.is_well_formed() {
            log_warn!(
                "dropping color frame: {} bytes for {}x{}",
                frame.bgra.len(),
                frame.width,
                frame.height
            );
            return;
        }
        *self.latest.lock().await = Some(frame);
    }
}

#[async_trait]
impl ImageStore for FrameStore {
    async fn capture_current_frame(&self) -> SentryResult<Vec<u8>> {
        let frame = self
            .latest
            .lock()
            .await
            .clone()
            .ok_or_else(|| SentryError::Image("no color frame available yet".into()))?;

        tokio::task::spawn_blocking(move || encode_png(frame))
            .await
            .map_err(|err| SentryError::Image(format!("png encoder join failed: {err}")))?
    }

    async fn persist(&self, bytes: &[u8], suggested_name: &str) -> SentryResult<PathBuf> {
        tokio::fs::create_dir_all(&self.directory).await?;

        let time = Local::now().format("%H-%M-%S");
        let path = self.directory.join(format!("{suggested_name}-{time}.png"));
        tokio::fs::write(&path, bytes).await?;

        log_info!("wrote capture {} ({} bytes)", path.display(), bytes.len());
        Ok(path)
    }
}

fn encode_png(frame: ColorFrame) -> SentryResult<Vec<u8>> {
    let ColorFrame {
        width,
        height,
        mut bgra,
    } = frame;
    for pixel in bgra.chunks_exact_mut(4) {
        pixel.swap(0, 2);
    }

    let image = RgbaImage::from_raw(width, height, bgra)
        .ok_or_else(|| SentryError::Image("color frame buffer size mismatch".into()))?;

    let mut png = Cursor::new(Vec::new());
    image.write_to(&mut png, ImageFormat::Png)?;
    Ok(png.into_inner())
}
