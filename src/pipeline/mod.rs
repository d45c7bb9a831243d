//! Detection pipeline - chunk ingestion through detection emission
//!
//! One pipeline instance owns the full path for one source: incremental PCM
//! decoding, overlapping window assembly, classification, and sink emission.
//! All stages for one pipeline run on a single task, so windows are
//! classified and emitted strictly in stream order. Multiple pipelines are
//! fully independent and managed by [registry::PipelineRegistry].

mod registry;
mod source;

pub use registry::{PipelineId, PipelineRegistry};
pub use source::{
    await_source_exit, ByteChunkSource, ChunkStream, FfmpegSource, SourceEvent, SourceShutdown,
    StaticChunkSource,
};

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::analysis::WindowBuffer;
use crate::classify::{build_classifier, Classifier, ModelLoader};
use crate::config::AppConfig;
use crate::decode::SampleDecoder;
use crate::error::ErrorKind;
use crate::sink::{DetectionEvent, DetectionSink};

/// How the source is interpreted for timing purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceMode {
    /// Live stream: events carry wall-clock timestamps only
    Stream,
    /// Finite file: events also carry an offset into the source
    File,
}

/// Lifecycle state of a pipeline instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Running,
    /// The source ended cleanly and the terminal flush has run
    Completed,
    /// Stopped on request
    Stopped,
    /// The source failed; carries the failing stage
    Failed(ErrorKind),
}

/// Summary returned when a pipeline reaches a terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub source: String,
    pub status: PipelineStatus,
    /// Windows classified, including any terminal-flush window
    pub windows_classified: u64,
    /// Qualifying detections emitted
    pub detections: u64,
    /// Total samples decoded from the byte stream
    pub samples_decoded: u64,
}

/// Synchronous detection core: bytes in, detections out.
///
/// The async runner feeds it chunks; everything from decoding to sink
/// emission happens inline, which is what keeps emission in stream order.
pub struct DetectionPipeline {
    decoder: SampleDecoder,
    windows: WindowBuffer,
    classifier: Box<dyn Classifier>,
    sink: Arc<dyn DetectionSink>,
    source: String,
    mode: SourceMode,
    sample_rate: u32,
    /// Absolute sample index of the next window's first sample
    window_start: u64,
    samples_decoded: u64,
    windows_classified: u64,
    detections: u64,
    scratch: Vec<f32>,
}

impl DetectionPipeline {
    pub fn new(
        config: &AppConfig,
        loader: &dyn ModelLoader,
        sink: Arc<dyn DetectionSink>,
        source: String,
        mode: SourceMode,
    ) -> Self {
        let classifier = build_classifier(config, loader);
        Self {
            decoder: SampleDecoder::new(),
            windows: WindowBuffer::new(config.audio.window_size, config.audio.overlap_size),
            classifier,
            sink,
            source,
            mode,
            sample_rate: config.audio.sample_rate,
            window_start: 0,
            samples_decoded: 0,
            windows_classified: 0,
            detections: 0,
            scratch: Vec::new(),
        }
    }

    /// Decode one chunk and classify every full window it completes.
    pub fn push_chunk(&mut self, chunk: &[u8]) {
        self.scratch.clear();
        let decoded = self.decoder.decode_chunk(chunk, &mut self.scratch);
        self.samples_decoded += decoded as u64;
        self.windows.push(&self.scratch);

        while let Some(window) = self.windows.try_take_window() {
            let advance = window.len() as u64 - self.windows.overlap_size() as u64;
            self.classify_window(&window);
            self.window_start += advance;
        }
    }

    /// End of stream: validate the decoder state and, in file mode,
    /// classify the terminal remainder.
    ///
    /// A partial window only ever surfaces as the file-mode terminal flush;
    /// a stream that stops or dies discards its buffered tail.
    pub fn finish(&mut self) {
        if let Err(err) = self.decoder.finish() {
            // A dangling byte or short header means the stream was cut off;
            // the fragment is dropped and everything classified so far stands.
            log::warn!("[Pipeline] {}: {}", self.source, err);
        }
        match self.mode {
            SourceMode::File => {
                if let Some(remainder) = self.windows.flush_remainder() {
                    log::debug!(
                        "[Pipeline] {}: classifying terminal remainder of {} samples",
                        self.source,
                        remainder.len()
                    );
                    self.classify_window(&remainder);
                }
            }
            SourceMode::Stream => {
                let _ = self.windows.flush_remainder();
            }
        }
    }

    fn classify_window(&mut self, window: &[f32]) {
        let result = self.classifier.detect(window);
        self.windows_classified += 1;

        if !result.is_bark {
            return;
        }

        let offset_seconds = match self.mode {
            SourceMode::File => Some(self.window_start as f64 / self.sample_rate as f64),
            SourceMode::Stream => None,
        };

        let event = DetectionEvent {
            timestamp_ms: unix_millis(),
            confidence: result.confidence,
            offset_seconds,
            source: self.source.clone(),
            model: result.model,
            features: result.features,
            ensemble: result.ensemble,
        };

        log::info!(
            "[Pipeline] {}: bark detected (confidence {:.2}, model {})",
            self.source,
            event.confidence,
            event.model
        );

        // Emission is at-most-once: a failed record is logged, not retried.
        match self.sink.record(event) {
            Ok(_) => self.detections += 1,
            Err(err) => log::error!("[Pipeline] {}: failed to record detection: {}", self.source, err),
        }
    }

    fn report(&self, status: PipelineStatus) -> PipelineReport {
        PipelineReport {
            source: self.source.clone(),
            status,
            windows_classified: self.windows_classified,
            detections: self.detections,
            samples_decoded: self.samples_decoded,
        }
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Drive one pipeline until its source ends, fails, or a stop is requested.
///
/// On stop the in-flight chunk finishes classifying, the decoding process is
/// signalled once, and the source is given `grace` to exit.
pub async fn run_pipeline(
    mut pipeline: DetectionPipeline,
    mut stream: ChunkStream,
    mut stop_rx: watch::Receiver<bool>,
    grace: Duration,
) -> PipelineReport {
    let status = loop {
        tokio::select! {
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    log::info!("[Pipeline] {}: stop requested", pipeline.source);
                    stream.shutdown.signal();
                    await_source_exit(&mut stream, grace).await;
                    pipeline.finish();
                    break PipelineStatus::Stopped;
                }
            }
            event = stream.events.recv() => match event {
                Some(SourceEvent::Chunk(chunk)) => pipeline.push_chunk(&chunk),
                Some(SourceEvent::End) => {
                    pipeline.finish();
                    break PipelineStatus::Completed;
                }
                Some(SourceEvent::Error(err)) => {
                    log::error!("[Pipeline] {}: source failed: {}", pipeline.source, err);
                    pipeline.finish();
                    break PipelineStatus::Failed(ErrorKind::Process);
                }
                None => {
                    log::error!("[Pipeline] {}: chunk channel closed unexpectedly", pipeline.source);
                    pipeline.finish();
                    break PipelineStatus::Failed(ErrorKind::Process);
                }
            }
        }
    };

    let report = pipeline.report(status);
    log::info!(
        "[Pipeline] {}: finished with {:?} ({} windows, {} detections)",
        report.source,
        report.status,
        report.windows_classified,
        report.detections
    );
    report
}
