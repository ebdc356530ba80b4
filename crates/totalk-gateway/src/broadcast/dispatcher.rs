//! Event dispatcher
//!
//! Receives domain events over an mpsc channel and routes them: user
//! notifications to the notification service, broadcasts to the notification
//! hub, chat messages to their room, queue commands to the queue service.

use crate::connection::{ChatRooms, Hub};
use crate::protocol::Envelope;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};
use totalk_core::DomainEvent;
use totalk_service::{NotificationService, QueueService};

/// Event dispatcher that routes domain events to hubs and queues
pub struct Dispatcher {
    notify_hub: Arc<Hub>,
    rooms: Arc<ChatRooms>,
    queues: Arc<QueueService>,
    notifications: Arc<NotificationService>,
    sender: mpsc::Sender<DomainEvent>,
    /// Taken by the loop on `start`
    receiver: Mutex<Option<mpsc::Receiver<DomainEvent>>>,
    running: AtomicBool,
    shutdown: Notify,
}

impl Dispatcher {
    /// Create a dispatcher whose inbound channel holds `buffer` events
    pub fn new(
        notify_hub: Arc<Hub>,
        rooms: Arc<ChatRooms>,
        queues: Arc<QueueService>,
        notifications: Arc<NotificationService>,
        buffer: usize,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        Self {
            notify_hub,
            rooms,
            queues,
            notifications,
            sender,
            receiver: Mutex::new(Some(receiver)),
            running: AtomicBool::new(false),
            shutdown: Notify::new(),
        }
    }

    /// Sender for event sources
    pub fn sender(&self) -> mpsc::Sender<DomainEvent> {
        self.sender.clone()
    }

    /// Start the dispatch loop
    ///
    /// The loop can only be started once; a stopped dispatcher stays stopped.
    pub fn start(self: Arc<Self>) {
        let Some(receiver) = self.receiver.lock().take() else {
            tracing::warn!("Dispatcher was already started");
            return;
        };

        self.running.store(true, Ordering::SeqCst);
        tokio::spawn(async move {
            self.run(receiver).await;
        });

        tracing::info!("Dispatcher started");
    }

    /// Stop the dispatch loop; queued events are dropped
    pub fn stop(&self) {
        self.shutdown.notify_one();
    }

    /// Check if the dispatcher is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn run(&self, mut receiver: mpsc::Receiver<DomainEvent>) {
        loop {
            tokio::select! {
                () = self.shutdown.notified() => break,
                event = receiver.recv() => match event {
                    Some(event) => self.dispatch(event).await,
                    None => break,
                },
            }
        }

        self.running.store(false, Ordering::SeqCst);
        tracing::info!("Dispatcher loop ended");
    }

    /// Route a single event
    pub async fn dispatch(&self, event: DomainEvent) {
        let name = event.name();
        tracing::trace!(event = name, "Dispatching event");

        match event {
            DomainEvent::Notification(notification) => {
                let id = notification.id.clone();
                match self.notifications.publish(notification).await {
                    Ok(stored) => {
                        tracing::trace!(notification_id = %id, status = %stored.status, "Notification dispatched");
                    }
                    Err(e) => {
                        tracing::warn!(notification_id = %id, error = %e, "Notification could not be stored");
                    }
                }
            }
            DomainEvent::Broadcast { kind, payload } => {
                let report = self
                    .notify_hub
                    .broadcast(Envelope::new(kind, payload).to_bytes());
                tracing::trace!(
                    delivered = report.delivered,
                    dropped = report.dropped,
                    "Broadcast dispatched"
                );
            }
            DomainEvent::ChatMessage(message) => match self.rooms.get(&message.chat_id) {
                Some(room) => {
                    room.broadcast(Envelope::chat_message(&message).to_bytes());
                }
                None => {
                    tracing::debug!(chat_id = %message.chat_id, "No live room for chat message");
                }
            },
            DomainEvent::Queue(command) => {
                let resource_id = command.resource_id.clone();
                if let Err(e) = self.queues.execute(command).await {
                    tracing::warn!(resource_id = %resource_id, error = %e, "Queue command rejected");
                }
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{SessionHandle, SessionShared};
    use bytes::Bytes;
    use serde_json::json;
    use std::time::Duration;
    use crate::broadcast::HubNotificationSink;
    use totalk_core::{ChatMessage, Notification, NotificationStatus, QueueAction, QueueCommand};
    use totalk_db::{InMemoryNotificationRepository, InMemoryQueueRepository};

    struct Fixture {
        dispatcher: Arc<Dispatcher>,
        notify_hub: Arc<Hub>,
        rooms: Arc<ChatRooms>,
        queues: Arc<QueueService>,
        notifications: Arc<NotificationService>,
    }

    fn fixture() -> Fixture {
        let notify_hub = Hub::new_shared("notify");
        let rooms = Arc::new(ChatRooms::new());
        let queues = Arc::new(QueueService::new(Arc::new(InMemoryQueueRepository::new())));
        let notifications = Arc::new(NotificationService::new(
            Arc::new(InMemoryNotificationRepository::new()),
            Arc::new(HubNotificationSink::new(Arc::clone(&notify_hub))),
        ));
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&notify_hub),
            Arc::clone(&rooms),
            Arc::clone(&queues),
            Arc::clone(&notifications),
            16,
        ));
        Fixture {
            dispatcher,
            notify_hub,
            rooms,
            queues,
            notifications,
        }
    }

    fn connect(hub: &Hub, user: &str) -> mpsc::Receiver<Bytes> {
        let (tx, rx) = mpsc::channel(8);
        hub.register(user, SessionHandle::new(SessionShared::new(Some(user.into())), tx));
        rx
    }

    fn kind(frame: &Bytes) -> String {
        serde_json::from_slice::<Envelope>(frame).unwrap().kind
    }

    #[tokio::test]
    async fn test_routes_notifications_and_broadcasts() {
        let f = fixture();
        let mut alice = connect(&f.notify_hub, "alice");
        let mut bob = connect(&f.notify_hub, "bob");

        let ping = Notification::new("alice", "ping", json!({}));
        let id = ping.id.clone();
        f.dispatcher.dispatch(DomainEvent::Notification(ping)).await;
        assert_eq!(kind(&alice.recv().await.unwrap()), Envelope::NOTIFICATION);
        assert!(bob.try_recv().is_err());
        assert_eq!(
            f.notifications.find(&id).await.unwrap().status,
            NotificationStatus::Sent
        );

        f.dispatcher
            .dispatch(DomainEvent::Broadcast {
                kind: "maintenance".into(),
                payload: json!({"in": 5}),
            })
            .await;
        assert_eq!(kind(&alice.recv().await.unwrap()), "maintenance");
        assert_eq!(kind(&bob.recv().await.unwrap()), "maintenance");
    }

    #[tokio::test]
    async fn test_routes_chat_messages_to_their_room() {
        let f = fixture();
        let (tx, mut rx) = mpsc::channel(8);
        let shared = SessionShared::new(None);
        f.rooms
            .register("room-1", shared.id().to_owned(), SessionHandle::new(shared, tx));

        let message = ChatMessage::new("room-1", "system", "hello".to_string());
        f.dispatcher.dispatch(DomainEvent::ChatMessage(message)).await;
        assert_eq!(kind(&rx.recv().await.unwrap()), Envelope::CHAT_MESSAGE);

        // No room, nothing to do
        let orphan = ChatMessage::new("room-2", "system", "hello".to_string());
        f.dispatcher.dispatch(DomainEvent::ChatMessage(orphan)).await;
        assert_eq!(f.rooms.room_count(), 1);
    }

    #[tokio::test]
    async fn test_routes_queue_commands() {
        let f = fixture();
        f.dispatcher
            .dispatch(DomainEvent::Queue(QueueCommand {
                resource_id: "event-1".into(),
                action: QueueAction::Join { user_id: "alice".into() },
            }))
            .await;
        assert_eq!(f.queues.position("event-1", "alice").await, Ok(1));

        // A rejected command is only logged
        f.dispatcher
            .dispatch(DomainEvent::Queue(QueueCommand {
                resource_id: "event-1".into(),
                action: QueueAction::Leave { user_id: "bob".into() },
            }))
            .await;
        assert_eq!(f.queues.status("event-1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_start_and_stop() {
        let f = fixture();
        let mut alice = connect(&f.notify_hub, "alice");

        Arc::clone(&f.dispatcher).start();
        assert!(f.dispatcher.is_running());

        f.dispatcher
            .sender()
            .send(DomainEvent::Notification(Notification::new("alice", "ping", json!({}))))
            .await
            .unwrap();
        let frame = tokio::time::timeout(Duration::from_secs(1), alice.recv())
            .await
            .expect("event not dispatched")
            .unwrap();
        assert_eq!(kind(&frame), Envelope::NOTIFICATION);

        f.dispatcher.stop();
        tokio::time::timeout(Duration::from_secs(1), async {
            while f.dispatcher.is_running() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("dispatcher did not stop");

        // Starting again is a no-op
        Arc::clone(&f.dispatcher).start();
        assert!(!f.dispatcher.is_running());
    }
}
