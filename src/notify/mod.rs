//! Change Notifier - Pubblica un evento ad ogni transizione di stato persistita
//!
//! Fire-and-forget: `publish` non ritorna errori e non blocca. Se nessuno è in
//! ascolto l'evento si perde, e la scrittura che l'ha generato resta valida.

use crate::dtos::{MessageDTO, ModelEvent};
use crate::entities::Message;
use tokio::sync::broadcast::{self, Receiver, Sender};
use tracing::{debug, instrument};

pub const BROADCAST_CHANNEL_CAPACITY: usize = 1024;

/// Trasporto delle notifiche, iniettato nello stato e nella pipeline
pub trait Notifier: Send + Sync {
    fn publish(&self, event: ModelEvent);

    /// Receiver per un nuovo subscriber live, `None` se il trasporto non ne ha
    fn live_events(&self) -> Option<Receiver<ModelEvent>> {
        None
    }
}

/// Evento per la rappresentazione corrente di un messaggio
pub fn message_updated(message: &Message) -> ModelEvent {
    ModelEvent::message(MessageDTO::from(message.clone()))
}

/// Per ambienti senza subscriber live
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn publish(&self, event: ModelEvent) {
        debug!(class = %event.class, id = event.model.id, "No subscribers configured, event dropped");
    }
}

/// Notifier su canale broadcast tokio: ogni connessione WebSocket ha il suo receiver
pub struct BroadcastNotifier {
    tx: Sender<ModelEvent>,
}

impl BroadcastNotifier {
    pub fn new() -> Self {
        Self::with_capacity(BROADCAST_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> Receiver<ModelEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for BroadcastNotifier {
    #[instrument(skip(self, event), fields(class = %event.class, id = event.model.id))]
    fn publish(&self, event: ModelEvent) {
        match self.tx.send(event) {
            Ok(n) => debug!(receivers = n, "Event broadcast to subscribers"),
            // nessun receiver attivo: non è un errore per chi pubblica
            Err(_) => debug!("No active subscribers, event dropped"),
        }
    }

    fn live_events(&self) -> Option<Receiver<ModelEvent>> {
        Some(self.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(id: i64) -> Message {
        Message {
            id,
            created_at: 1,
            updated_at: 2,
            source: "hello *world*!".to_string(),
            html: "hello <em>world</em>!".to_string(),
            author_id: 3,
        }
    }

    #[test]
    fn test_event_carries_full_representation() {
        let event = message_updated(&message(5));
        assert_eq!(event.class, "Message");
        assert_eq!(event.model.id, 5);
        assert_eq!(event.model.html, "hello <em>world</em>!");
        assert_eq!(event.model.links.self_link, "/api/messages/5");
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_subscriber() {
        let notifier = BroadcastNotifier::new();
        let mut rx1 = notifier.subscribe();
        let mut rx2 = notifier.subscribe();
        assert_eq!(notifier.subscriber_count(), 2);

        notifier.publish(message_updated(&message(1)));

        assert_eq!(rx1.recv().await.unwrap().model.id, 1);
        assert_eq!(rx2.recv().await.unwrap().model.id, 1);
    }

    #[test]
    fn test_publish_without_subscribers_does_not_fail() {
        let notifier = BroadcastNotifier::new();
        notifier.publish(message_updated(&message(1)));
        NoopNotifier.publish(message_updated(&message(1)));
    }

    #[tokio::test]
    async fn test_live_events_only_from_broadcast() {
        assert!(NoopNotifier.live_events().is_none());

        let notifier: Box<dyn Notifier> = Box::new(BroadcastNotifier::new());
        let mut rx = notifier.live_events().expect("broadcast has subscribers");
        notifier.publish(message_updated(&message(9)));
        assert_eq!(rx.recv().await.unwrap().model.id, 9);
    }
}
