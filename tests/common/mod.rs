#![allow(dead_code)]

use async_trait::async_trait;
use axum_test::TestServer;
use enrich_server::core::{AppState, FetchError, database};
use enrich_server::dtos::ModelEvent;
use enrich_server::enrich::{FetchResponse, LinkEnricher, LinkFetcher};
use enrich_server::entities::{Message, NewMessage};
use enrich_server::notify::{BroadcastNotifier, Notifier};
use enrich_server::pipeline::PipelineMode;
use enrich_server::repositories::{MessageRepository, MessageStore};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Timeout corto per i test: un link `Hang` viene saltato in fretta
pub const TEST_FETCH_TIMEOUT: Duration = Duration::from_millis(200);

pub const FOO_PAGE: &str = r#"<html><head><title>foo</title><meta name="blah" content="blah"><meta name="description" content="foo descr"></head></html>"#;
pub const BAR_PAGE: &str = "<html><head><title>bar</title></head></html>";
pub const BAZ_PAGE: &str = r#"<html><head><meta name="description" content="baz descr"></head></html>"#;

/// Risposta simulata per una GET
#[derive(Debug, Clone)]
pub enum Reply {
    Page(u16, &'static str),
    Refused,
    Hang,
    /// Pagina 200 consegnata dopo un ritardo
    Slow(Duration, &'static str),
}

pub fn ok(body: &'static str) -> Reply {
    Reply::Page(200, body)
}

/// Fetcher che consuma le risposte nell'ordine delle chiamate; a coda vuota rifiuta
#[derive(Default)]
pub struct SequenceFetcher {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<String>>,
}

impl SequenceFetcher {
    pub fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn push(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(reply);
    }
}

#[async_trait]
impl LinkFetcher for SequenceFetcher {
    async fn get(&self, url: &str, _timeout: Duration) -> Result<FetchResponse, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Page(status, body)) => Ok(FetchResponse {
                status,
                body: body.to_string(),
            }),
            Some(Reply::Slow(delay, body)) => {
                tokio::time::sleep(delay).await;
                Ok(FetchResponse {
                    status: 200,
                    body: body.to_string(),
                })
            }
            Some(Reply::Hang) => {
                std::future::pending::<()>().await;
                Err(FetchError::Timeout)
            }
            Some(Reply::Refused) | None => Err(FetchError::Connect("connection refused".to_string())),
        }
    }
}

/// Notifier che registra ogni evento pubblicato
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<ModelEvent>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<ModelEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Sequenza degli html notificati
    pub fn htmls(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.model.html).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn publish(&self, event: ModelEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Store che delega a un altro store contando le scritture e fallendo su richiesta
pub struct FlakyStore {
    inner: Arc<dyn MessageStore>,
    html_writes: AtomicUsize,
    /// Numero di `save_html` che vanno a buon fine prima di iniziare a fallire
    fail_after: Option<usize>,
}

impl FlakyStore {
    pub fn new(inner: Arc<dyn MessageStore>, fail_after: Option<usize>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            html_writes: AtomicUsize::new(0),
            fail_after,
        })
    }

    pub fn html_writes(&self) -> usize {
        self.html_writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageStore for FlakyStore {
    async fn create(&self, data: &NewMessage) -> Result<Message, sqlx::Error> {
        self.inner.create(data).await
    }

    async fn load(&self, id: i64) -> Result<Option<Message>, sqlx::Error> {
        self.inner.load(id).await
    }

    async fn save(&self, message: &Message) -> Result<Message, sqlx::Error> {
        self.inner.save(message).await
    }

    async fn save_source(&self, id: i64, source: &str) -> Result<Message, sqlx::Error> {
        self.inner.save_source(id, source).await
    }

    async fn save_html(
        &self,
        id: i64,
        rendered_source: &str,
        html: &str,
    ) -> Result<Option<Message>, sqlx::Error> {
        let done = self.html_writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_after.is_some_and(|limit| done >= limit) {
            return Err(sqlx::Error::PoolClosed);
        }
        self.inner.save_html(id, rendered_source, html).await
    }

    async fn list_updated_since(&self, since: i64) -> Result<Vec<Message>, sqlx::Error> {
        self.inner.list_updated_since(since).await
    }
}

/// Store SQLite in memoria con le migrations applicate
pub async fn memory_store() -> Arc<MessageRepository> {
    let pool = database::connect_in_memory()
        .await
        .expect("Failed to open in-memory database");
    Arc::new(MessageRepository::new(pool))
}

/// Enricher con una GET alla volta: il SequenceFetcher assegna le risposte in ordine di chiamata
pub fn test_enricher(fetcher: Arc<dyn LinkFetcher>) -> LinkEnricher {
    LinkEnricher::new(fetcher)
        .with_timeout(TEST_FETCH_TIMEOUT)
        .with_max_concurrency(1)
}

/// Crea un AppState per i test con store in memoria
///
/// # Arguments
/// * `fetcher` - Fetcher usato dall'enricher
/// * `mode` - Pipeline inline o deferred
///
/// # Returns
/// Arc<AppState> pronto per il router
pub async fn create_test_state(fetcher: Arc<dyn LinkFetcher>, mode: PipelineMode) -> Arc<AppState> {
    Arc::new(build_test_state(fetcher, mode, Arc::new(BroadcastNotifier::new())).await)
}

/// Come `create_test_state`, ma con un notifier a scelta e senza `Arc` (per i builder)
pub async fn build_test_state(
    fetcher: Arc<dyn LinkFetcher>,
    mode: PipelineMode,
    notifier: Arc<dyn Notifier>,
) -> AppState {
    AppState::new(memory_store().await, notifier, test_enricher(fetcher), mode, 2, 16)
}

/// Crea un TestServer per i test
///
/// # Arguments
/// * `state` - AppState da utilizzare per il server
///
/// # Returns
/// TestServer configurato e pronto per eseguire richieste
pub fn create_test_server(state: Arc<AppState>) -> TestServer {
    let app = enrich_server::create_router(state);
    TestServer::new(app).expect("Failed to create test server")
}

/// Aspetta (con polling) che il messaggio raggiunga l'html atteso
pub async fn wait_for_html(store: &dyn MessageStore, id: i64, expected: &str) -> Message {
    for _ in 0..200 {
        if let Some(message) = store.load(id).await.expect("load failed") {
            if message.html == expected {
                return message;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("message {} never reached html {:?}", id, expected);
}
