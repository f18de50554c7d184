use crate::pipeline::PipelineMode;
use crate::ws::WsSettings;
use dotenv::dotenv;
use std::env;
use std::time::Duration;
use tracing::info;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://messages.db?mode=rwc";
pub const DEFAULT_USER_AGENT: &str = concat!("enrich-server/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub max_connections: u32,
    pub app_env: String,
    /// Inline (sincrono, per i test) o deferred (worker pool)
    pub pipeline_mode: PipelineMode,
    pub pipeline_workers: usize,
    pub pipeline_queue_capacity: usize,
    /// Timeout di ogni singola GET verso i link del messaggio
    pub fetch_timeout_secs: u64,
    /// Quante GET concorrenti per messaggio
    pub fetch_max_concurrency: usize,
    pub fetch_user_agent: String,
    /// Se falso le notifiche vanno nel NoopNotifier e /ws non è disponibile
    pub live_events: bool,
    /// Ping del server verso i client WebSocket
    pub ws_ping_interval_secs: u64,
    /// Chiusura del socket dopo questo periodo senza frame dal client (pong inclusi)
    pub ws_idle_timeout_secs: u64,
}

impl Config {
    /// Carica la configurazione dalle variabili d'ambiente
    /// Chiama dotenv() automaticamente
    pub fn from_env() -> Result<Self, String> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Costruisce la configurazione da una funzione di lookup chiave -> valore
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url =
            lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let server_host = lookup("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string());

        let server_port = parse_or(&lookup, "SERVER_PORT", 3000u16)
            .map_err(|_| "Invalid SERVER_PORT: must be a number between 0-65535".to_string())?;

        let max_connections = parse_or(&lookup, "MAX_DB_CONNECTIONS", 5u32)
            .map_err(|_| "Invalid MAX_DB_CONNECTIONS: must be a positive number".to_string())?;

        let app_env = lookup("APP_ENV").unwrap_or_else(|| "development".to_string());

        let pipeline_mode = match lookup("PIPELINE_MODE") {
            Some(mode) => mode.parse::<PipelineMode>()?,
            // come nel vecchio TESTING: in test si renderizza in modo sincrono
            None if app_env == "testing" => PipelineMode::Inline,
            None => PipelineMode::Deferred,
        };

        let pipeline_workers = parse_or(&lookup, "PIPELINE_WORKERS", 4usize)
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| "Invalid PIPELINE_WORKERS: must be a positive number".to_string())?;

        let pipeline_queue_capacity = parse_or(&lookup, "PIPELINE_QUEUE_CAPACITY", 256usize)
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| "Invalid PIPELINE_QUEUE_CAPACITY: must be a positive number".to_string())?;

        let fetch_timeout_secs = parse_or(&lookup, "FETCH_TIMEOUT_SECS", 5u64)
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| "Invalid FETCH_TIMEOUT_SECS: must be a positive number".to_string())?;

        let fetch_max_concurrency = parse_or(&lookup, "FETCH_MAX_CONCURRENCY", 4usize)
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| "Invalid FETCH_MAX_CONCURRENCY: must be a positive number".to_string())?;

        let fetch_user_agent =
            lookup("FETCH_USER_AGENT").unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

        let live_events = parse_or(&lookup, "LIVE_EVENTS", true)
            .map_err(|_| "Invalid LIVE_EVENTS: must be 'true' or 'false'".to_string())?;

        let ws_ping_interval_secs = parse_or(&lookup, "WS_PING_INTERVAL_SECS", 30u64)
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| "Invalid WS_PING_INTERVAL_SECS: must be a positive number".to_string())?;

        let ws_idle_timeout_secs = parse_or(&lookup, "WS_IDLE_TIMEOUT_SECS", 300u64)
            .ok()
            .filter(|n| *n > ws_ping_interval_secs)
            .ok_or_else(|| {
                "Invalid WS_IDLE_TIMEOUT_SECS: must be greater than WS_PING_INTERVAL_SECS".to_string()
            })?;

        Ok(Config {
            database_url,
            server_host,
            server_port,
            max_connections,
            app_env,
            pipeline_mode,
            pipeline_workers,
            pipeline_queue_capacity,
            fetch_timeout_secs,
            fetch_max_concurrency,
            fetch_user_agent,
            live_events,
            ws_ping_interval_secs,
            ws_idle_timeout_secs,
        })
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn ws_settings(&self) -> WsSettings {
        WsSettings {
            ping_interval: Duration::from_secs(self.ws_ping_interval_secs),
            idle_timeout: Duration::from_secs(self.ws_idle_timeout_secs),
        }
    }

    /// Logga la configurazione (nascondendo i segreti)
    pub fn print_info(&self) {
        info!(
            environment = %self.app_env,
            address = %format!("{}:{}", self.server_host, self.server_port),
            database = %Self::mask_url(&self.database_url),
            max_db_connections = self.max_connections,
            "Server configuration"
        );
        info!(
            mode = ?self.pipeline_mode,
            workers = self.pipeline_workers,
            queue_capacity = self.pipeline_queue_capacity,
            fetch_timeout_secs = self.fetch_timeout_secs,
            fetch_max_concurrency = self.fetch_max_concurrency,
            "Pipeline configuration"
        );
        info!(
            live_events = self.live_events,
            ws_ping_interval_secs = self.ws_ping_interval_secs,
            ws_idle_timeout_secs = self.ws_idle_timeout_secs,
            "Live events configuration"
        );
    }

    /// Maschera le credenziali dell'URL del database per il logging
    fn mask_url(url: &str) -> String {
        if let Some(at_pos) = url.find('@') {
            if let Some(scheme_end) = url.find("://") {
                let scheme = &url[..scheme_end + 3];
                let after_at = &url[at_pos..];
                return format!("{}***{}", scheme, after_at);
            }
        }
        url.to_string()
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, T::Err>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse::<T>(),
        None => Ok(default),
    }
}
