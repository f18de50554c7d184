//! Link Enricher - Arricchisce i link di un messaggio con titolo e descrizione della pagina
//!
//! Per ogni `<a href>` dell'html renderizzato (in ordine di documento, senza deduplica)
//! viene fatta una GET con timeout; le pagine raggiunte producono un blocco
//! `<blockquote>` appeso in fondo al messaggio. I link irraggiungibili, lenti o con
//! status diverso da 200 vengono saltati in silenzio.
//!
//! Il primo `<blockquote>` fa da sentinella: un html che lo contiene è considerato già
//! arricchito e non viene più toccato (niente rete, nessuna modifica). Il renderer non
//! può produrre `<blockquote>`, quindi la sentinella viene solo da qui.

pub mod fetch;
pub mod metadata;

pub use fetch::{FetchResponse, HttpFetcher, LinkFetcher};
pub use metadata::{NO_DESCRIPTION, PageSummary};

use futures::stream::{self, StreamExt};
use scraper::{Html, Selector};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Marcatore di enrichment già avvenuto
pub const ENRICHMENT_SENTINEL: &str = "<blockquote>";

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Vero se l'html contiene già almeno un blocco di riepilogo
pub fn is_enriched(html: &str) -> bool {
    html.contains(ENRICHMENT_SENTINEL)
}

/// Tutti gli `href` delle ancore, in ordine di prima apparizione e senza deduplica
pub fn extract_links(html: &str) -> Vec<String> {
    let fragment = Html::parse_fragment(html);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    fragment
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .map(|href| href.to_string())
        .collect()
}

/// Solo http/https vengono scaricati; mailto, URL relativi e simili no
fn is_fetchable(href: &str) -> bool {
    Url::parse(href)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}

pub struct LinkEnricher {
    fetcher: Arc<dyn LinkFetcher>,
    timeout: Duration,
    max_concurrency: usize,
}

impl LinkEnricher {
    pub fn new(fetcher: Arc<dyn LinkFetcher>) -> Self {
        Self {
            fetcher,
            timeout: DEFAULT_FETCH_TIMEOUT,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Ritorna il nuovo html e se è cambiato
    ///
    /// L'input non viene mai modificato. `changed` è vero solo se è stato appeso
    /// almeno un blocco; in quel caso l'html in uscita è `html` + i blocchi, nello
    /// stesso ordine delle ancore, indipendentemente da quale GET finisce prima.
    #[instrument(skip(self, html), fields(html_len = html.len()))]
    pub async fn enrich(&self, html: &str) -> (String, bool) {
        if is_enriched(html) {
            debug!("Message already enriched, nothing to do");
            return (html.to_string(), false);
        }

        let links = extract_links(html);
        if links.is_empty() {
            return (html.to_string(), false);
        }
        debug!(count = links.len(), "Links found");

        // buffered() mantiene l'ordine di input anche con GET concorrenti
        let blocks: Vec<Option<String>> = stream::iter(links)
            .map(|url| self.summarize(url))
            .buffered(self.max_concurrency)
            .collect()
            .await;

        let mut enriched = html.to_string();
        let mut appended = 0;
        for block in blocks.into_iter().flatten() {
            enriched.push_str(&block);
            appended += 1;
        }

        info!(appended, "Enrichment completed");
        (enriched, appended > 0)
    }

    /// Blocco di riepilogo per un link, `None` se il link va saltato
    async fn summarize(&self, url: String) -> Option<String> {
        if !is_fetchable(&url) {
            debug!(url = %url, "Skipping non-http link");
            return None;
        }

        // timeout anche attorno al fetcher: un'implementazione che lo ignora non blocca il messaggio
        let result = tokio::time::timeout(self.timeout, self.fetcher.get(&url, self.timeout)).await;
        match result {
            Ok(Ok(response)) if response.status == 200 => {
                let summary = PageSummary::from_html(&url, &response.body);
                Some(summary.to_block(&url))
            }
            Ok(Ok(response)) => {
                warn!(url = %url, status = response.status, "Skipping link: unexpected status");
                None
            }
            Ok(Err(e)) => {
                warn!(url = %url, error = %e, "Skipping link: fetch failed");
                None
            }
            Err(_) => {
                warn!(url = %url, timeout_ms = self.timeout.as_millis() as u64, "Skipping link: timed out");
                None
            }
        }
    }
}
