//! Notification channel handler
//!
//! Clients may manage their own queue entries over the notification socket.
//! Successful changes reach them as `queue.update` notifications; failures
//! are answered with an `error` envelope on the same session.

use super::{HandlerError, HandlerResult, InboundHandler};
use crate::connection::{Hub, SessionShared};
use crate::protocol::{ClientCommand, Envelope};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use totalk_service::QueueService;

pub struct NotifyHandler {
    hub: Arc<Hub>,
    /// Key the session is registered under
    key: String,
    queues: Arc<QueueService>,
}

impl NotifyHandler {
    pub fn new(hub: Arc<Hub>, key: impl Into<String>, queues: Arc<QueueService>) -> Self {
        Self {
            hub,
            key: key.into(),
            queues,
        }
    }

    /// Answer the session that sent the frame, never one that replaced it
    fn reply(&self, session: &SessionShared, envelope: &Envelope) {
        self.hub
            .send_to_connection(&self.key, session.id(), envelope.to_bytes());
    }

    async fn execute(
        &self,
        session: &SessionShared,
        user_id: &str,
        command: ClientCommand,
    ) -> HandlerResult<()> {
        match command {
            ClientCommand::QueueJoin { resource_id } => {
                self.queues.join(&resource_id, user_id).await?;
            }
            ClientCommand::QueueLeave { resource_id } => {
                self.queues.leave(&resource_id, user_id).await?;
            }
            ClientCommand::QueuePosition { resource_id } => {
                let position = self.queues.position(&resource_id, user_id).await?;
                self.reply(session, &Envelope::new(
                    Envelope::QUEUE_POSITION,
                    json!({ "resource_id": resource_id, "position": position }),
                ));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl InboundHandler for NotifyHandler {
    async fn handle(&self, session: &SessionShared, text: &str) -> HandlerResult<()> {
        let result = match session.user_id() {
            None => Err(HandlerError::Anonymous),
            Some(user_id) => match ClientCommand::from_json(text) {
                Ok(command) => self.execute(session, user_id, command).await,
                Err(e) => Err(e.into()),
            },
        };

        if let Err(e) = &result {
            self.reply(session, &Envelope::error(e.code(), e.to_string()));
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::SessionHandle;
    use bytes::Bytes;
    use tokio::sync::mpsc;
    use totalk_db::InMemoryQueueRepository;

    fn setup(user: Option<&str>) -> (NotifyHandler, Arc<SessionShared>, mpsc::Receiver<Bytes>, Arc<QueueService>) {
        let hub = Hub::new_shared("notify");
        let queues = Arc::new(QueueService::new(Arc::new(InMemoryQueueRepository::new())));
        let (tx, rx) = mpsc::channel(8);
        let shared = SessionShared::new(user.map(str::to_owned));
        let key = shared.id().to_owned();
        hub.register(key.clone(), SessionHandle::new(Arc::clone(&shared), tx));
        (NotifyHandler::new(hub, key, Arc::clone(&queues)), shared, rx, queues)
    }

    fn envelope(frame: &Bytes) -> Envelope {
        serde_json::from_slice(frame).unwrap()
    }

    #[tokio::test]
    async fn test_join_and_position() {
        let (handler, session, mut rx, queues) = setup(Some("alice"));

        handler
            .handle(&session, r#"{"type":"queue.join","payload":{"resource_id":"event-1"}}"#)
            .await
            .unwrap();
        assert_eq!(queues.position("event-1", "alice").await, Ok(1));

        handler
            .handle(&session, r#"{"type":"queue.position","payload":{"resource_id":"event-1"}}"#)
            .await
            .unwrap();
        let reply = envelope(&rx.recv().await.unwrap());
        assert_eq!(reply.kind, Envelope::QUEUE_POSITION);
        assert_eq!(reply.payload["position"], 1);
    }

    #[tokio::test]
    async fn test_rejections_are_answered() {
        let (handler, session, mut rx, _queues) = setup(Some("alice"));

        let err = handler.handle(&session, "{not json").await.unwrap_err();
        assert!(matches!(err, HandlerError::InvalidFrame(_)));
        assert_eq!(envelope(&rx.recv().await.unwrap()).payload["code"], "INVALID_FRAME");

        let leave = r#"{"type":"queue.leave","payload":{"resource_id":"event-1"}}"#;
        let err = handler.handle(&session, leave).await.unwrap_err();
        assert_eq!(err.code(), "NOT_QUEUED");
        assert_eq!(envelope(&rx.recv().await.unwrap()).kind, Envelope::ERROR);
    }

    #[tokio::test]
    async fn test_anonymous_session_cannot_queue() {
        let (handler, session, _rx, queues) = setup(None);

        let join = r#"{"type":"queue.join","payload":{"resource_id":"event-1"}}"#;
        assert!(matches!(
            handler.handle(&session, join).await,
            Err(HandlerError::Anonymous)
        ));
        assert!(queues.status("event-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_replaced_session_reply_is_not_rerouted() {
        let hub = Hub::new_shared("notify");
        let queues = Arc::new(QueueService::new(Arc::new(InMemoryQueueRepository::new())));
        let (old_tx, _old_rx) = mpsc::channel(8);
        let old = SessionShared::new(Some("alice".into()));
        hub.register("alice", SessionHandle::new(Arc::clone(&old), old_tx));
        let handler = NotifyHandler::new(Arc::clone(&hub), "alice", Arc::clone(&queues));

        // A reconnect takes the key while the old session's frame is in flight
        let (new_tx, mut new_rx) = mpsc::channel(8);
        let replacement = SessionShared::new(Some("alice".into()));
        hub.register("alice", SessionHandle::new(replacement, new_tx));

        handler
            .handle(&old, r#"{"type":"queue.join","payload":{"resource_id":"event-1"}}"#)
            .await
            .unwrap();
        handler
            .handle(&old, r#"{"type":"queue.position","payload":{"resource_id":"event-1"}}"#)
            .await
            .unwrap();
        handler.handle(&old, "{not json").await.unwrap_err();

        assert_eq!(queues.position("event-1", "alice").await, Ok(1));
        assert!(new_rx.try_recv().is_err());
    }
}
