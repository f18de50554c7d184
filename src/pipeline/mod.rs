//! Enrichment Pipeline - Orchestratore renderer -> enricher -> store -> notifier
//!
//! Per ogni messaggio le due scritture (render, poi enrichment se cambiato) sono
//! strettamente sequenziali: l'enricher legge sempre l'html appena salvato.
//! Messaggi diversi sono processati in modo indipendente, senza ordine tra loro.

pub mod dispatcher;

pub use dispatcher::{PipelineDispatcher, PipelineMode};

use crate::core::error::PipelineError;
use crate::enrich::{ENRICHMENT_SENTINEL, LinkEnricher};
use crate::notify::{Notifier, message_updated};
use crate::render::render;
use crate::repositories::MessageStore;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Esito di una esecuzione della pipeline su un messaggio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Il messaggio non esiste più (es. cancellato nel frattempo)
    Missing,
    /// Html già renderizzato e arricchito per il sorgente corrente: nessuna scrittura
    AlreadyEnriched,
    /// Renderizzato, nessun blocco di riepilogo aggiunto
    Rendered,
    /// Renderizzato e arricchito
    Enriched,
    /// Il sorgente è cambiato durante l'esecuzione: la scrittura è stata scartata,
    /// ci pensa l'esecuzione innescata dall'edit
    Superseded,
}

pub struct EnrichmentPipeline {
    store: Arc<dyn MessageStore>,
    enricher: LinkEnricher,
    notifier: Arc<dyn Notifier>,
}

impl EnrichmentPipeline {
    pub fn new(
        store: Arc<dyn MessageStore>,
        enricher: LinkEnricher,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            enricher,
            notifier,
        }
    }

    /// Porta il messaggio `id` da `created` a `rendered` (ed eventualmente `enriched`)
    ///
    /// Operazioni:
    /// 1. Caricare il messaggio (se non c'è: no-op)
    /// 2. Renderizzare il sorgente, salvare l'html e notificare
    /// 3. Arricchire l'html appena salvato; se cambiato salvare e notificare di nuovo
    ///
    /// Gli errori dello store interrompono la pipeline e risalgono al chiamante;
    /// ogni scrittura è atomica da sola, quindi un errore al passo 3 lascia il
    /// messaggio valido nello stato `rendered`.
    ///
    /// Ogni scrittura è condizionata al sorgente da cui è stato fatto il render: se un
    /// edit lo ha cambiato nel frattempo l'html è vecchio e non viene salvato.
    #[instrument(skip(self))]
    pub async fn process(&self, id: i64) -> Result<ProcessOutcome, PipelineError> {
        let Some(mut message) = self.store.load(id).await? else {
            debug!("Message not found, nothing to process");
            return Ok(ProcessOutcome::Missing);
        };

        let rendered = render(&message.source);

        if is_enrichment_of(&message.html, &rendered) {
            debug!("Message already rendered and enriched for its current source");
            return Ok(ProcessOutcome::AlreadyEnriched);
        }

        // se l'html è già il render del sorgente non c'è transizione da persistere
        if message.html != rendered {
            let Some(saved) = self.store.save_html(id, &message.source, &rendered).await? else {
                debug!("Source changed before render was persisted");
                return Ok(ProcessOutcome::Superseded);
            };
            message = saved;
            info!("Rendered html persisted");
            self.notifier.publish(message_updated(&message));
        }

        let (enriched, changed) = self.enricher.enrich(&message.html).await;
        if !changed {
            return Ok(ProcessOutcome::Rendered);
        }

        let Some(message) = self.store.save_html(id, &message.source, &enriched).await? else {
            debug!("Source changed while links were being fetched, enrichment discarded");
            return Ok(ProcessOutcome::Superseded);
        };
        info!("Enriched html persisted");
        self.notifier.publish(message_updated(&message));

        Ok(ProcessOutcome::Enriched)
    }
}

/// Vero se `html` è esattamente `rendered` seguito dai blocchi di riepilogo
fn is_enrichment_of(html: &str, rendered: &str) -> bool {
    html.strip_prefix(rendered)
        .is_some_and(|rest| rest.starts_with(ENRICHMENT_SENTINEL))
}
