//! Pipeline dispatcher - Decide se processare inline o tramite worker pool
//!
//! In modalità `Inline` la pipeline gira dentro la richiesta che la innesca (test e
//! ambienti deterministici). In modalità `Deferred` l'id del messaggio viene accodato
//! su un canale mpsc limitato, consumato da un numero fisso di worker: la richiesta
//! ritorna subito e la crescita dei task resta limitata anche sotto carico. A coda
//! piena l'accodamento fallisce subito con `QueueFull` (503 lato HTTP): la richiesta
//! non aspetta mai i worker.
//! Le due modalità producono lo stesso stato finale e la stessa sequenza di eventi.

use super::{EnrichmentPipeline, ProcessOutcome};
use crate::core::error::PipelineError;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineMode {
    Inline,
    Deferred,
}

impl FromStr for PipelineMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inline" | "sync" => Ok(Self::Inline),
            "deferred" | "async" | "background" => Ok(Self::Deferred),
            other => Err(format!(
                "Invalid PIPELINE_MODE '{}': expected 'inline' or 'deferred'",
                other
            )),
        }
    }
}

pub struct PipelineDispatcher {
    pipeline: Arc<EnrichmentPipeline>,
    /// `None` in modalità inline
    queue: Option<mpsc::Sender<i64>>,
    workers: Vec<JoinHandle<()>>,
}

impl PipelineDispatcher {
    pub fn inline(pipeline: Arc<EnrichmentPipeline>) -> Self {
        Self {
            pipeline,
            queue: None,
            workers: Vec::new(),
        }
    }

    /// Avvia `workers` task che consumano una coda di `capacity` id
    ///
    /// Va chiamata dentro un runtime tokio.
    pub fn deferred(pipeline: Arc<EnrichmentPipeline>, workers: usize, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel::<i64>(capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));

        let workers = (0..workers.max(1))
            .map(|worker_id| tokio::spawn(run_worker(worker_id, pipeline.clone(), rx.clone())))
            .collect();

        info!(capacity, "Pipeline worker pool started");
        Self {
            pipeline,
            queue: Some(tx),
            workers,
        }
    }

    pub fn new(
        pipeline: Arc<EnrichmentPipeline>,
        mode: PipelineMode,
        workers: usize,
        capacity: usize,
    ) -> Self {
        match mode {
            PipelineMode::Inline => Self::inline(pipeline),
            PipelineMode::Deferred => Self::deferred(pipeline, workers, capacity),
        }
    }

    pub fn mode(&self) -> PipelineMode {
        if self.queue.is_some() {
            PipelineMode::Deferred
        } else {
            PipelineMode::Inline
        }
    }

    /// Da chiamare dopo aver salvato un nuovo messaggio
    pub async fn on_message_created(&self, id: i64) -> Result<(), PipelineError> {
        self.dispatch(id).await
    }

    /// Da chiamare ogni volta che si scrive un nuovo `source`
    pub async fn on_message_source_changed(&self, id: i64) -> Result<(), PipelineError> {
        self.dispatch(id).await
    }

    #[instrument(skip(self))]
    async fn dispatch(&self, id: i64) -> Result<(), PipelineError> {
        match &self.queue {
            None => {
                let outcome = self.pipeline.process(id).await?;
                debug!(?outcome, "Message processed inline");
                Ok(())
            }
            Some(tx) => {
                tx.try_send(id).map_err(|e| match e {
                    TrySendError::Full(_) => {
                        warn!("Pipeline queue full, message not enqueued");
                        PipelineError::QueueFull
                    }
                    TrySendError::Closed(_) => {
                        warn!("Pipeline queue closed, message not enqueued");
                        PipelineError::QueueClosed
                    }
                })?;
                debug!("Message enqueued for background processing");
                Ok(())
            }
        }
    }

    /// Chiude la coda e aspetta che i worker abbiano smaltito tutti i messaggi accodati
    pub async fn shutdown(mut self) {
        self.queue.take();
        for handle in self.workers.drain(..) {
            if let Err(e) = handle.await {
                error!("Pipeline worker terminated abnormally: {:?}", e);
            }
        }
        info!("Pipeline dispatcher stopped");
    }
}

#[instrument(skip(pipeline, rx))]
async fn run_worker(
    worker_id: usize,
    pipeline: Arc<EnrichmentPipeline>,
    rx: Arc<Mutex<mpsc::Receiver<i64>>>,
) {
    debug!("Pipeline worker started");
    loop {
        // il lock è tenuto solo per ricevere, non durante il processing
        let next = rx.lock().await.recv().await;
        let Some(id) = next else {
            debug!("Queue closed, worker exiting");
            break;
        };

        match pipeline.process(id).await {
            Ok(ProcessOutcome::Missing) => debug!(id, "Message vanished before processing"),
            Ok(outcome) => debug!(id, ?outcome, "Message processed"),
            // nessun chiamante a cui restituire l'errore: si logga
            Err(e) => error!(id, error = %e, "Background processing failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_from_str() {
        assert_eq!("inline".parse::<PipelineMode>(), Ok(PipelineMode::Inline));
        assert_eq!(" Deferred ".parse::<PipelineMode>(), Ok(PipelineMode::Deferred));
        assert_eq!("background".parse::<PipelineMode>(), Ok(PipelineMode::Deferred));
        assert!("later".parse::<PipelineMode>().is_err());
    }
}
