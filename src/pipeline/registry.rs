// PipelineRegistry - lifecycle management for concurrent pipelines
//
// Each start spawns one independent pipeline task and hands back an opaque
// id. Stop is idempotent: the stop signal is a watch channel flipped at most
// once per pipeline, and the decoding-process kill behind it fires at most
// once regardless of how often stop is called. The task publishes its
// terminal report through a second watch channel, so `wait` is cancel-safe
// (nothing is torn down until the report has actually been observed).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use tokio::sync::watch;

use crate::classify::ModelLoader;
use crate::config::AppConfig;
use crate::error::ProcessError;
use crate::pipeline::{
    run_pipeline, ByteChunkSource, DetectionPipeline, PipelineReport, PipelineStatus, SourceMode,
};
use crate::sink::DetectionSink;

/// Opaque identifier of a registered pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineId(u64);

impl std::fmt::Display for PipelineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "pipeline-{}", self.0)
    }
}

struct Entry {
    stop_tx: watch::Sender<bool>,
    status: Arc<RwLock<PipelineStatus>>,
    done_rx: watch::Receiver<Option<PipelineReport>>,
}

#[derive(Default)]
pub struct PipelineRegistry {
    next_id: AtomicU64,
    entries: Mutex<HashMap<PipelineId, Entry>>,
}

impl PipelineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a pipeline over `source` and return its id.
    ///
    /// Opening the source (including spawning the decoding process) happens
    /// here, so spawn failures surface synchronously.
    pub fn start(
        &self,
        source: &dyn ByteChunkSource,
        mode: SourceMode,
        config: &AppConfig,
        loader: &dyn ModelLoader,
        sink: Arc<dyn DetectionSink>,
    ) -> Result<PipelineId, ProcessError> {
        let stream = source.open(config.pipeline.chunk_channel_capacity)?;
        let pipeline = DetectionPipeline::new(config, loader, sink, source.label().to_string(), mode);

        let id = PipelineId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let (stop_tx, stop_rx) = watch::channel(false);
        let (done_tx, done_rx) = watch::channel(None);
        let status = Arc::new(RwLock::new(PipelineStatus::Running));
        let grace = Duration::from_millis(config.pipeline.shutdown_grace_ms);

        let task_status = Arc::clone(&status);
        tokio::spawn(async move {
            let report = run_pipeline(pipeline, stream, stop_rx, grace).await;
            *task_status.write().unwrap() = report.status;
            let _ = done_tx.send(Some(report));
        });

        log::info!("[Registry] {} started for {}", id, source.label());
        self.entries.lock().unwrap().insert(
            id,
            Entry {
                stop_tx,
                status,
                done_rx,
            },
        );
        Ok(id)
    }

    /// Current status, or None once the pipeline has been stopped or waited
    /// out of the registry.
    pub fn status(&self, id: PipelineId) -> Option<PipelineStatus> {
        let entries = self.entries.lock().unwrap();
        entries.get(&id).map(|e| *e.status.read().unwrap())
    }

    /// Ids of all pipelines still in the registry.
    pub fn ids(&self) -> Vec<PipelineId> {
        self.entries.lock().unwrap().keys().copied().collect()
    }

    /// Stop a pipeline and wait for its terminal report.
    ///
    /// Idempotent: stopping an unknown or already-stopped id is a no-op
    /// returning None. A pipeline that already completed on its own still
    /// yields its report here.
    pub async fn stop(&self, id: PipelineId) -> Option<PipelineReport> {
        let entry = self.entries.lock().unwrap().remove(&id)?;
        // Flipping the watch is harmless if the task already finished
        let _ = entry.stop_tx.send(true);
        await_report(id, entry.done_rx.clone()).await
    }

    /// Wait for a pipeline to reach a terminal state on its own.
    ///
    /// Cancel-safe: the pipeline keeps running (and stays stoppable) if the
    /// returned future is dropped before completion.
    pub async fn wait(&self, id: PipelineId) -> Option<PipelineReport> {
        let done_rx = {
            let entries = self.entries.lock().unwrap();
            entries.get(&id)?.done_rx.clone()
        };
        let report = await_report(id, done_rx).await?;
        self.entries.lock().unwrap().remove(&id);
        Some(report)
    }

    /// Stop every registered pipeline, collecting the terminal reports.
    pub async fn stop_all(&self) -> Vec<PipelineReport> {
        let mut reports = Vec::new();
        for id in self.ids() {
            if let Some(report) = self.stop(id).await {
                reports.push(report);
            }
        }
        reports
    }
}

async fn await_report(
    id: PipelineId,
    mut done_rx: watch::Receiver<Option<PipelineReport>>,
) -> Option<PipelineReport> {
    match done_rx.wait_for(|report| report.is_some()).await {
        Ok(report) => report.clone(),
        Err(_) => {
            // Sender dropped without publishing: the task panicked
            log::error!("[Registry] {} task ended without a report", id);
            None
        }
    }
}
