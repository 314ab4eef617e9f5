//! Background ingestion queue.
//!
//! Document registration must not wait for ingestion, so submitted work
//! flows through an explicit queue rather than an unawaited future: jobs go
//! into an unbounded mpsc channel drained by a small pool of worker tasks.
//! [`IngestWorker::submit`] is synchronous and never blocks; the submitting
//! request gets no completion signal beyond successful enqueue.
//!
//! Each worker carries its own error handling: a failed job is logged with
//! its document id and the worker moves on. Nothing is retried; the
//! document's `failed` status is the observable outcome.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{mpsc, Mutex};
use tracing::{error, info};

use crate::ingest::IngestionPipeline;

/// One unit of background ingestion work.
#[derive(Debug)]
pub struct IngestJob {
    pub document_id: String,
    pub filepath: std::path::PathBuf,
    pub content_type: String,
}

/// Handle to the ingestion worker pool.
pub struct IngestWorker {
    tx: mpsc::UnboundedSender<IngestJob>,
}

impl IngestWorker {
    /// Spawn `workers` tasks draining a shared job channel.
    pub fn spawn(pipeline: Arc<IngestionPipeline>, workers: usize) -> Self {
        let (tx, rx) = mpsc::unbounded_channel::<IngestJob>();
        let rx = Arc::new(Mutex::new(rx));

        for worker_id in 0..workers.max(1) {
            let pipeline = pipeline.clone();
            let rx = rx.clone();
            tokio::spawn(async move {
                loop {
                    // Hold the lock only while waiting for the next job, so
                    // other workers can receive while this one processes.
                    let job = { rx.lock().await.recv().await };
                    let Some(job) = job else {
                        break;
                    };

                    info!(
                        worker = worker_id,
                        document_id = %job.document_id,
                        "ingestion started"
                    );
                    match pipeline
                        .ingest(&job.document_id, &job.filepath, &job.content_type)
                        .await
                    {
                        Ok(report) => {
                            info!(
                                worker = worker_id,
                                document_id = %job.document_id,
                                embedded = report.chunks_embedded,
                                skipped = report.chunks_skipped,
                                "ingestion finished"
                            );
                        }
                        Err(e) => {
                            error!(
                                worker = worker_id,
                                document_id = %job.document_id,
                                "ingestion failed: {}",
                                e
                            );
                        }
                    }
                }
            });
        }

        Self { tx }
    }

    /// Queue a job. Returns immediately; fails only if the worker pool has
    /// shut down.
    pub fn submit(&self, job: IngestJob) -> Result<()> {
        self.tx
            .send(job)
            .map_err(|e| anyhow::anyhow!("ingestion queue closed: {}", e))
    }
}
