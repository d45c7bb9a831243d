// ByteChunkSource - injected byte-stream capability for the pipeline
//
// The pipeline never manages an OS process directly; it depends on a
// ByteChunkSource that opens into a ChunkStream (a channel of byte chunks
// plus a shutdown handle). FfmpegSource is the production implementation,
// spawning ffmpeg to convert an RTSP URL or media file into a canonical
// 16-bit mono little-endian WAV stream on stdout. StaticChunkSource feeds
// pre-built chunks for tests and offline runs.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};

use crate::error::ProcessError;

/// Read size for the decoder's stdout.
const READ_CHUNK_LEN: usize = 4096;

/// Message emitted by an open source.
#[derive(Debug)]
pub enum SourceEvent {
    /// One chunk of raw stream bytes, in arrival order
    Chunk(Vec<u8>),
    /// The source ended cleanly (end of file, or process exited zero)
    End,
    /// The decoding process died
    Error(ProcessError),
}

/// Handle used to terminate the upstream decoding process.
///
/// The termination signal is issued at most once; further calls are no-ops.
pub struct SourceShutdown {
    kill_tx: Option<oneshot::Sender<()>>,
}

impl SourceShutdown {
    /// Shutdown handle for sources with no process behind them.
    pub fn noop() -> Self {
        Self { kill_tx: None }
    }

    /// Signal the decoding process to terminate. Idempotent.
    pub fn signal(&mut self) {
        if let Some(tx) = self.kill_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// An opened source: ordered chunk events plus a shutdown handle.
pub struct ChunkStream {
    pub events: mpsc::Receiver<SourceEvent>,
    pub shutdown: SourceShutdown,
}

/// Capability producing the raw byte stream the pipeline decodes.
pub trait ByteChunkSource: Send + Sync {
    /// Label recorded on detection events ("rtsp_stream" or a file path).
    fn label(&self) -> &str;

    /// Open the stream. `capacity` bounds the chunk channel.
    fn open(&self, capacity: usize) -> Result<ChunkStream, ProcessError>;
}

/// ffmpeg-backed source converting a URL or file path to raw PCM WAV.
pub struct FfmpegSource {
    input: String,
    label: String,
    sample_rate: u32,
}

impl FfmpegSource {
    /// Source for a live network stream (e.g., an RTSP URL).
    pub fn stream(url: impl Into<String>, sample_rate: u32) -> Self {
        Self {
            input: url.into(),
            label: "rtsp_stream".to_string(),
            sample_rate,
        }
    }

    /// Source for a finite media file; the path doubles as the label.
    pub fn file(path: impl Into<String>, sample_rate: u32) -> Self {
        let input = path.into();
        Self {
            label: input.clone(),
            input,
            sample_rate,
        }
    }

    fn spawn(&self) -> Result<Child, ProcessError> {
        Command::new("ffmpeg")
            .args([
                "-i",
                &self.input,
                "-vn",
                "-acodec",
                "pcm_s16le",
                "-ar",
                &self.sample_rate.to_string(),
                "-ac",
                "1",
                "-threads",
                "0",
                "-f",
                "wav",
                "pipe:1",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| ProcessError::SpawnFailed {
                command: "ffmpeg".to_string(),
                reason: err.to_string(),
            })
    }
}

impl ByteChunkSource for FfmpegSource {
    fn label(&self) -> &str {
        &self.label
    }

    fn open(&self, capacity: usize) -> Result<ChunkStream, ProcessError> {
        let mut child = self.spawn()?;
        log::info!("[Source] Started decoding process for {}", self.input);

        // ffmpeg reports progress on stderr; it is advisory only and must
        // never affect correctness. Drain it so the process cannot block.
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if line.contains("Error") || line.contains("error") {
                        log::warn!("[Source] ffmpeg: {}", line);
                    } else {
                        log::debug!("[Source] ffmpeg: {}", line);
                    }
                }
            });
        }

        let (tx, rx) = mpsc::channel(capacity);
        let (kill_tx, kill_rx) = oneshot::channel();
        tokio::spawn(pump_child(child, tx, kill_rx));

        Ok(ChunkStream {
            events: rx,
            shutdown: SourceShutdown {
                kill_tx: Some(kill_tx),
            },
        })
    }
}

/// Forward the child's stdout to the chunk channel, then report how the
/// process ended. A kill signal or a dropped receiver terminates the child.
async fn pump_child(
    mut child: Child,
    tx: mpsc::Sender<SourceEvent>,
    mut kill_rx: oneshot::Receiver<()>,
) {
    let mut stdout = match child.stdout.take() {
        Some(stdout) => stdout,
        None => {
            let _ = tx
                .send(SourceEvent::Error(ProcessError::ChannelClosed))
                .await;
            return;
        }
    };

    let mut buf = [0u8; READ_CHUNK_LEN];
    let mut killed = false;

    loop {
        tokio::select! {
            _ = &mut kill_rx, if !killed => {
                killed = true;
                if let Err(err) = child.start_kill() {
                    log::debug!("[Source] kill failed (already exited?): {}", err);
                }
            }
            read = stdout.read(&mut buf) => match read {
                Ok(0) => break,
                Ok(n) => {
                    if tx.send(SourceEvent::Chunk(buf[..n].to_vec())).await.is_err() {
                        // Pipeline went away; stop the decoder and bail
                        killed = true;
                        let _ = child.start_kill();
                        break;
                    }
                }
                Err(err) => {
                    log::warn!("[Source] read from decoding process failed: {}", err);
                    break;
                }
            }
        }
    }

    let event = match child.wait().await {
        Ok(status) if status.success() || killed => SourceEvent::End,
        Ok(status) => SourceEvent::Error(ProcessError::Exited {
            code: status.code(),
        }),
        Err(err) => {
            log::warn!("[Source] failed to reap decoding process: {}", err);
            SourceEvent::End
        }
    };
    let _ = tx.send(event).await;
}

/// Synthetic source yielding fixed chunks then a clean end-of-stream.
pub struct StaticChunkSource {
    label: String,
    chunks: Vec<Vec<u8>>,
}

impl StaticChunkSource {
    pub fn new(label: impl Into<String>, chunks: Vec<Vec<u8>>) -> Self {
        Self {
            label: label.into(),
            chunks,
        }
    }

    /// Split one byte buffer into fixed-size chunks.
    pub fn from_bytes(label: impl Into<String>, bytes: &[u8], chunk_len: usize) -> Self {
        let chunks = bytes
            .chunks(chunk_len.max(1))
            .map(|c| c.to_vec())
            .collect();
        Self::new(label, chunks)
    }
}

impl ByteChunkSource for StaticChunkSource {
    fn label(&self) -> &str {
        &self.label
    }

    fn open(&self, capacity: usize) -> Result<ChunkStream, ProcessError> {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let chunks = self.chunks.clone();
        tokio::spawn(async move {
            for chunk in chunks {
                if tx.send(SourceEvent::Chunk(chunk)).await.is_err() {
                    return;
                }
            }
            let _ = tx.send(SourceEvent::End).await;
        });

        Ok(ChunkStream {
            events: rx,
            shutdown: SourceShutdown::noop(),
        })
    }
}

/// Wait up to `grace` for the source to finish after a shutdown signal.
///
/// Consumes (and discards) chunks that were already in flight; an expired
/// grace period is a logged warning, never an error.
pub async fn await_source_exit(stream: &mut ChunkStream, grace: Duration) {
    let deadline = tokio::time::Instant::now() + grace;
    loop {
        match tokio::time::timeout_at(deadline, stream.events.recv()).await {
            Ok(Some(SourceEvent::Chunk(_))) => continue,
            Ok(Some(SourceEvent::End)) | Ok(None) => return,
            Ok(Some(SourceEvent::Error(err))) => {
                log::debug!("[Source] decoding process ended during shutdown: {}", err);
                return;
            }
            Err(_) => {
                log::warn!(
                    "[Source] decoding process did not exit within {:?}; proceeding with shutdown",
                    grace
                );
                return;
            }
        }
    }
}
