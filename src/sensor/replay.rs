use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use tokio::{
    fs::File,
    io::{AsyncBufReadExt, BufReader, Lines},
};

use super::frame::{BodyFrame, ColorFrame};

/// One line of a replay file.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum ReplayRecord {
    Body(BodyFrame),
    /// Image file (relative to the replay file) standing in for a color frame.
    Color { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq)]
pub enum SensorEvent {
    Body(BodyFrame),
    Color(ColorFrame),
}

/// Plays back a JSON-lines recording of sensor frames.
pub struct ReplaySource {
    lines: Lines<BufReader<File>>,
    base_dir: PathBuf,
    line_no: usize,
}

impl ReplaySource {
    pub async fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .await
            .with_context(|| format!("failed to open replay file {}", path.display()))?;
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self {
            lines: BufReader::new(file).lines(),
            base_dir,
            line_no: 0,
        })
    }

    /// Next event, or `None` at end of file. Blank lines are skipped.
    pub async fn next_event(&mut self) -> Result<Option<SensorEvent>> {
        loop {
            let Some(line) = self.lines.next_line().await? else {
                return Ok(None);
            };
            self.line_no += 1;

            if line.trim().is_empty() {
                continue;
            }

            let record: ReplayRecord = serde_json::from_str(&line)
                .with_context(|| format!("malformed replay record on line {}", self.line_no))?;

            return match record {
                ReplayRecord::Body(frame) => Ok(Some(SensorEvent::Body(frame))),
                ReplayRecord::Color { path } => {
                    let path = self.base_dir.join(path);
                    let frame = tokio::task::spawn_blocking(move || load_color_frame(&path))
                        .await
                        .context("color frame loader join failed")??;
                    Ok(Some(SensorEvent::Color(frame)))
                }
            };
        }
    }
}

fn load_color_frame(path: &Path) -> Result<ColorFrame> {
    let rgba = image::open(path)
        .map_err(|err| anyhow!("failed to load color frame {}: {err}", path.display()))?
        .to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut bgra = rgba.into_raw();
    for pixel in bgra.chunks_exact_mut(4) {
        pixel.swap(0, 2);
    }

    Ok(ColorFrame {
        width,
        height,
        bgra,
    })
}
