//! Application State - Stato globale dell'applicazione
//!
//! Contiene lo store dei messaggi, il notifier delle modifiche e il dispatcher
//! della pipeline di rendering/enrichment.

use crate::core::Config;
use crate::enrich::{LinkEnricher, LinkFetcher};
use crate::notify::{BroadcastNotifier, NoopNotifier, Notifier};
use crate::pipeline::{EnrichmentPipeline, PipelineDispatcher, PipelineMode};
use crate::repositories::{MessageRepository, MessageStore};
use crate::ws::WsSettings;
use sqlx::SqlitePool;
use std::sync::Arc;

/// Stato globale dell'applicazione condiviso tra tutte le route
pub struct AppState {
    /// Store dei messaggi (sorgente di verità)
    pub store: Arc<dyn MessageStore>,

    /// Notifier condiviso tra pipeline, edit via HTTP e connessioni WebSocket
    pub notifier: Arc<dyn Notifier>,

    /// Punto di ingresso dei trigger `created` / `source changed`
    pub pipeline: PipelineDispatcher,

    /// Keep-alive delle connessioni WebSocket
    pub ws: WsSettings,
}

impl AppState {
    /// Assembla lo stato a partire dai singoli componenti già costruiti
    ///
    /// # Arguments
    /// * `store` - Store dei messaggi
    /// * `notifier` - Broadcast per i subscriber live, oppure [`NoopNotifier`]
    /// * `enricher` - Link enricher con fetcher, timeout e concorrenza già configurati
    /// * `mode` - Pipeline inline o su worker pool
    /// * `workers` / `queue_capacity` - Dimensioni del worker pool (ignorate in inline)
    ///
    /// # Returns
    /// Nuova istanza di AppState. In modalità deferred va chiamata dentro un runtime tokio.
    pub fn new(
        store: Arc<dyn MessageStore>,
        notifier: Arc<dyn Notifier>,
        enricher: LinkEnricher,
        mode: PipelineMode,
        workers: usize,
        queue_capacity: usize,
    ) -> Self {
        let pipeline = Arc::new(EnrichmentPipeline::new(
            store.clone(),
            enricher,
            notifier.clone(),
        ));

        Self {
            store,
            notifier,
            pipeline: PipelineDispatcher::new(pipeline, mode, workers, queue_capacity),
            ws: WsSettings::default(),
        }
    }

    pub fn with_ws_settings(mut self, ws: WsSettings) -> Self {
        self.ws = ws;
        self
    }

    /// Crea lo stato dal pool SQLite e dalla configurazione
    ///
    /// # Arguments
    /// * `config` - Configurazione caricata da env
    /// * `pool` - Pool di connessioni SQLite con migrations già applicate
    /// * `fetcher` - Client usato dall'enricher per scaricare le pagine linkate
    pub fn from_config(config: &Config, pool: SqlitePool, fetcher: Arc<dyn LinkFetcher>) -> Self {
        let enricher = LinkEnricher::new(fetcher)
            .with_timeout(config.fetch_timeout())
            .with_max_concurrency(config.fetch_max_concurrency);

        let notifier: Arc<dyn Notifier> = if config.live_events {
            Arc::new(BroadcastNotifier::new())
        } else {
            Arc::new(NoopNotifier)
        };

        Self::new(
            Arc::new(MessageRepository::new(pool)),
            notifier,
            enricher,
            config.pipeline_mode,
            config.pipeline_workers,
            config.pipeline_queue_capacity,
        )
        .with_ws_settings(config.ws_settings())
    }
}
