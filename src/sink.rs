// DetectionSink - persistence boundary for qualifying detections
//
// The pipeline hands each bark event to a sink exactly once and never
// retries: a failed record is logged by the caller and the stream carries
// on. Sinks serialize their own writes (one writer at a time), so several
// pipelines may share one sink.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::analysis::FeatureVector;
use crate::classify::{EnsembleMember, ModelKind};
use crate::error::SinkError;

/// Identifier assigned by a sink to a recorded event.
pub type RecordId = u64;

/// One qualifying detection, created once per bark window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionEvent {
    /// Wall-clock timestamp in Unix milliseconds
    pub timestamp_ms: u64,
    /// Classifier confidence in [0, 1]
    pub confidence: f64,
    /// Offset into a finite source in seconds; absent in stream mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset_seconds: Option<f64>,
    /// Source label ("rtsp_stream" or the file path)
    pub source: String,
    pub model: ModelKind,
    /// Raw features when the heuristic path produced the verdict
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<FeatureVector>,
    /// Per-model sub-results when an ensemble produced the verdict
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ensemble: Option<Vec<EnsembleMember>>,
}

/// Accepts ownership of detection events.
pub trait DetectionSink: Send + Sync {
    fn record(&self, event: DetectionEvent) -> Result<RecordId, SinkError>;
}

/// In-memory sink for tests and inspection.
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<DetectionEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded events in record order.
    pub fn events(&self) -> Vec<DetectionEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DetectionSink for MemorySink {
    fn record(&self, event: DetectionEvent) -> Result<RecordId, SinkError> {
        let mut events = self.events.lock().unwrap();
        events.push(event);
        Ok(events.len() as RecordId)
    }
}

/// Append-only JSON-lines sink.
///
/// Writes one serialized event per line; the mutex serializes concurrent
/// writers from independent pipelines.
pub struct JsonlSink {
    writer: Mutex<JsonlWriter>,
}

struct JsonlWriter {
    file: File,
    next_id: RecordId,
}

impl JsonlSink {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, SinkError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;
        Ok(Self {
            writer: Mutex::new(JsonlWriter { file, next_id: 1 }),
        })
    }
}

impl DetectionSink for JsonlSink {
    fn record(&self, event: DetectionEvent) -> Result<RecordId, SinkError> {
        let mut line = serde_json::to_string(&event)?;
        line.push('\n');

        let mut writer = self.writer.lock().map_err(|_| SinkError::Closed)?;
        writer.file.write_all(line.as_bytes())?;
        let id = writer.next_id;
        writer.next_id += 1;
        Ok(id)
    }
}
