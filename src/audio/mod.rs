use async_trait::async_trait;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use std::{
    collections::HashMap,
    fs::File,
    io::BufReader,
    path::PathBuf,
    sync::{
        mpsc::{self, Sender},
        Arc, Mutex,
    },
    thread,
};
use tokio::sync::oneshot;

use crate::collaborators::AudioPlayer;
use crate::error::{SentryError, SentryResult};

type Reply = oneshot::Sender<Result<(), String>>;

enum AudioCommand {
    Play {
        cue: String,
        source: BufReader<File>,
        reply: Reply,
    },
}

/// Plays named sound cues on a dedicated audio thread, which owns the
/// non-`Send` output stream.
pub struct AudioEngineHandle {
    tx: Arc<Mutex<Option<Sender<AudioCommand>>>>,
    cues: HashMap<String, PathBuf>,
    volume: f32,
}

impl AudioEngineHandle {
    pub fn new(cues: HashMap<String, PathBuf>, volume: f32) -> Self {
        Self {
            tx: Arc::new(Mutex::new(None)),
            cues,
            volume,
        }
    }

    fn ensure_thread(&self) -> Result<Sender<AudioCommand>, String> {
        if let Some(tx) = self.tx.lock().map_err(|e| e.to_string())?.as_ref() {
            return Ok(tx.clone());
        }

        let (tx, rx) = mpsc::channel::<AudioCommand>();
        let volume = self.volume.clamp(0.0, 1.0);

        thread::Builder::new()
            .name("audio-cues".to_string())
            .spawn(move || {
                let mut output: Option<(OutputStream, OutputStreamHandle)> = None;

                fn ensure_output(
                    output: &mut Option<(OutputStream, OutputStreamHandle)>,
                ) -> Result<OutputStreamHandle, String> {
                    if output.is_none() {
                        *output = Some(
                            OutputStream::try_default()
                                .map_err(|e| format!("Failed to create audio output stream: {}", e))?,
                        );
                    }
                    match output {
                        Some((_, handle)) => Ok(handle.clone()),
                        None => Err("audio output unavailable".to_string()),
                    }
                }

                while let Ok(cmd) = rx.recv() {
                    match cmd {
                        AudioCommand::Play { cue, source, reply } => {
                            let result = ensure_output(&mut output).and_then(|handle| {
                                let decoder = Decoder::new(source)
                                    .map_err(|e| format!("Failed to decode cue {}: {}", cue, e))?;
                                let sink = Sink::try_new(&handle)
                                    .map_err(|e| format!("Failed to create audio sink: {}", e))?;
                                sink.set_volume(volume);
                                sink.append(decoder);
                                // each cue plays out on its own sink
                                sink.detach();
                                Ok(())
                            });
                            let _ = reply.send(result);
                        }
                    }
                }
            })
            .map_err(|e| e.to_string())?;

        let tx_clone = tx.clone();
        *self.tx.lock().map_err(|e| e.to_string())? = Some(tx);
        Ok(tx_clone)
    }
}

#[async_trait]
impl AudioPlayer for AudioEngineHandle {
    async fn play(&self, cue: &str) -> SentryResult<()> {
        let path = self
            .cues
            .get(cue)
            .ok_or_else(|| SentryError::Playback(format!("unknown sound cue '{cue}'")))?;
        let file = File::open(path).map_err(|e| {
            SentryError::Playback(format!("cannot open {} for cue '{cue}': {e}", path.display()))
        })?;

        let tx = self.ensure_thread().map_err(SentryError::Playback)?;
        let (reply, done) = oneshot::channel();
        tx.send(AudioCommand::Play {
            cue: cue.to_string(),
            source: BufReader::new(file),
            reply,
        })
        .map_err(|e| SentryError::Playback(e.to_string()))?;

        done.await
            .map_err(|_| SentryError::Playback("audio thread exited".into()))?
            .map_err(SentryError::Playback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_cue_is_a_playback_error() {
        let engine = AudioEngineHandle::new(HashMap::new(), 1.0);
        let err = engine.play("approach").await.unwrap_err();
        assert!(matches!(err, SentryError::Playback(_)));
        assert!(err.to_string().contains("approach"));
    }

    #[tokio::test]
    async fn missing_sound_file_is_a_playback_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut cues = HashMap::new();
        cues.insert("capture".to_string(), dir.path().join("missing.wav"));

        let engine = AudioEngineHandle::new(cues, 1.0);
        assert!(matches!(
            engine.play("capture").await,
            Err(SentryError::Playback(_))
        ));
    }
}
