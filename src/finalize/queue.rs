//! Background finalization queue

use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};

use super::pdf::write_pdf;
use super::{DocumentFinalizer, FinalizeJob};

/// Fire-and-forget PDF writer.
///
/// Jobs go through an unbounded channel to a single dispatcher task, which
/// runs each one on the blocking pool with at most `workers` in flight.
/// The dispatcher exits once every queue handle is dropped and the
/// in-flight jobs are done.
#[derive(Clone)]
pub struct FinalizeQueue {
    sender: mpsc::UnboundedSender<FinalizeJob>,
}

impl FinalizeQueue {
    /// Start the dispatcher. Must be called from within a tokio runtime.
    pub fn start(workers: usize) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let permits = Arc::new(Semaphore::new(workers.max(1)));
        let handle = tokio::spawn(dispatch(receiver, permits));
        (Self { sender }, handle)
    }
}

impl DocumentFinalizer for FinalizeQueue {
    fn finalize(&self, job: FinalizeJob) {
        let document_id = job.document_id;
        if self.sender.send(job).is_err() {
            tracing::error!(document_id, "Finalize queue closed, job dropped");
        } else {
            tracing::debug!(document_id, "Finalize job queued");
        }
    }
}

async fn dispatch(mut receiver: mpsc::UnboundedReceiver<FinalizeJob>, permits: Arc<Semaphore>) {
    let mut running = JoinSet::new();

    while let Some(job) = receiver.recv().await {
        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };
        running.spawn_blocking(move || {
            let _permit = permit;
            run_job(job);
        });

        while let Some(result) = running.try_join_next() {
            log_join(result);
        }
    }

    while let Some(result) = running.join_next().await {
        log_join(result);
    }
    tracing::debug!("Finalize queue drained");
}

fn run_job(job: FinalizeJob) {
    tracing::info!(
        document_id = job.document_id,
        output = %job.output_path.display(),
        "Writing document"
    );

    match write_pdf(
        &job.page_dir,
        &job.image_extension,
        &job.output_path,
        job.bookmark.as_ref(),
        job.quality,
    ) {
        Ok(summary) => tracing::info!(
            document_id = job.document_id,
            pages = summary.pages,
            outline_entries = summary.outline_entries,
            output = %job.output_path.display(),
            "Document written"
        ),
        Err(e) => tracing::error!(
            document_id = job.document_id,
            dir = %job.page_dir.display(),
            error = %e,
            "Failed to write document"
        ),
    }
}

fn log_join(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        tracing::error!(error = %e, "Finalize task panicked");
    }
}
