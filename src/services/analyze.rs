//! Image analysis service.
//!
//! Fans per-image pipeline runs out across a bounded worker pool.
//! Separated from UI concerns - emits events for progress tracking.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::warn;

use crate::llm::CompletionBackend;
use crate::models::ImageUnit;
use crate::pipeline::ImagePipeline;
use crate::sink::JsonlSink;

/// Events emitted during an analysis run.
#[derive(Debug, Clone)]
pub enum AnalyzeEvent {
    /// A worker picked up an image.
    Started { worker_id: usize, image_id: String },
    /// The image's record was written to the sink.
    Completed { worker_id: usize, image_id: String },
    /// The image was skipped; no record was written.
    Failed {
        worker_id: usize,
        image_id: String,
        error: String,
    },
}

/// Result of an analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyzeResult {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Service for analyzing a batch of images.
pub struct AnalyzeService {
    backend: Arc<dyn CompletionBackend>,
    sink: Arc<JsonlSink>,
}

impl AnalyzeService {
    pub fn new(backend: Arc<dyn CompletionBackend>, sink: Arc<JsonlSink>) -> Self {
        Self { backend, sink }
    }

    /// Process every image with at most `workers` pipelines in flight.
    ///
    /// Each worker runs one image to completion before claiming the
    /// next. One image's failure never aborts the run; it is counted,
    /// logged, and reported as an event. Successful records stream to
    /// the sink as they complete.
    pub async fn run(
        &self,
        images: Vec<ImageUnit>,
        workers: usize,
        event_tx: mpsc::Sender<AnalyzeEvent>,
    ) -> anyhow::Result<AnalyzeResult> {
        let attempted = images.len();
        let queue = Arc::new(Mutex::new(VecDeque::from(images)));
        let succeeded = Arc::new(AtomicUsize::new(0));
        let failed = Arc::new(AtomicUsize::new(0));

        let workers = workers.max(1);
        let mut handles = Vec::with_capacity(workers);

        for worker_id in 0..workers {
            let backend = self.backend.clone();
            let sink = self.sink.clone();
            let queue = queue.clone();
            let succeeded = succeeded.clone();
            let failed = failed.clone();
            let event_tx = event_tx.clone();

            let handle = tokio::spawn(async move {
                let pipeline = ImagePipeline::new(backend.as_ref());

                loop {
                    let image = queue.lock().await.pop_front();
                    let Some(image) = image else {
                        break;
                    };

                    let _ = event_tx
                        .send(AnalyzeEvent::Started {
                            worker_id,
                            image_id: image.id.clone(),
                        })
                        .await;

                    match pipeline.analyze(&image).await {
                        Ok(record) => match sink.append(&record).await {
                            Ok(()) => {
                                succeeded.fetch_add(1, Ordering::Relaxed);
                                let _ = event_tx
                                    .send(AnalyzeEvent::Completed {
                                        worker_id,
                                        image_id: image.id.clone(),
                                    })
                                    .await;
                            }
                            Err(e) => {
                                warn!("Failed to write record for {}: {}", image.id, e);
                                failed.fetch_add(1, Ordering::Relaxed);
                                let _ = event_tx
                                    .send(AnalyzeEvent::Failed {
                                        worker_id,
                                        image_id: image.id.clone(),
                                        error: e.to_string(),
                                    })
                                    .await;
                            }
                        },
                        Err(e) => {
                            warn!("Analysis failed for {}: {}", image.id, e);
                            failed.fetch_add(1, Ordering::Relaxed);
                            let _ = event_tx
                                .send(AnalyzeEvent::Failed {
                                    worker_id,
                                    image_id: image.id.clone(),
                                    error: e.to_string(),
                                })
                                .await;
                        }
                    }
                }
            });

            handles.push(handle);
        }

        // Drop the service's sender so the event stream closes once
        // every worker clone is gone.
        drop(event_tx);

        for handle in handles {
            let _ = handle.await;
        }

        Ok(AnalyzeResult {
            attempted,
            succeeded: succeeded.load(Ordering::Relaxed),
            failed: failed.load(Ordering::Relaxed),
        })
    }
}
