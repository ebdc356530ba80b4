//! Gateway state
//!
//! Every hub, the queue and notification services and the dispatcher are
//! owned here and shared with the handlers through `Arc`s.

use crate::broadcast::{Dispatcher, HubNotificationSink};
use crate::connection::{ChatRooms, Hub};
use std::sync::Arc;
use totalk_common::AppConfig;
use totalk_core::{MessageRepository, NotificationRepository, QueueRepository};
use totalk_service::{NotificationService, QueueService};

/// Gateway state shared across all handlers
#[derive(Clone)]
pub struct GatewayState {
    notify_hub: Arc<Hub>,
    rooms: Arc<ChatRooms>,
    queues: Arc<QueueService>,
    notifications: Arc<NotificationService>,
    messages: Arc<dyn MessageRepository>,
    dispatcher: Arc<Dispatcher>,
    config: Arc<AppConfig>,
}

impl GatewayState {
    /// Wire the hubs, services and dispatcher over the given repositories
    ///
    /// Neither the dispatcher nor the notification scheduler is started.
    pub fn new(
        config: AppConfig,
        queue_repo: Arc<dyn QueueRepository>,
        message_repo: Arc<dyn MessageRepository>,
        notification_repo: Arc<dyn NotificationRepository>,
    ) -> Self {
        let notify_hub = Hub::new_shared("notify");
        let rooms = Arc::new(ChatRooms::new());
        let sink = Arc::new(HubNotificationSink::new(Arc::clone(&notify_hub)));
        let queues = Arc::new(QueueService::new(queue_repo).with_notifications(sink.clone()));
        let notifications = Arc::new(NotificationService::new(notification_repo, sink));
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&notify_hub),
            Arc::clone(&rooms),
            Arc::clone(&queues),
            Arc::clone(&notifications),
            config.hubs.event_buffer,
        ));

        Self {
            notify_hub,
            rooms,
            queues,
            notifications,
            messages: message_repo,
            dispatcher,
            config: Arc::new(config),
        }
    }

    pub fn notify_hub(&self) -> &Arc<Hub> {
        &self.notify_hub
    }

    pub fn rooms(&self) -> &Arc<ChatRooms> {
        &self.rooms
    }

    pub fn queues(&self) -> &Arc<QueueService> {
        &self.queues
    }

    pub fn notifications(&self) -> &Arc<NotificationService> {
        &self.notifications
    }

    pub fn messages(&self) -> &Arc<dyn MessageRepository> {
        &self.messages
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Stop the dispatcher and scheduler, then close every live session
    pub fn shutdown(&self) {
        self.dispatcher.stop();
        self.notifications.stop();
        let notify = self.notify_hub.shutdown();
        let chat = self.rooms.shutdown();
        tracing::info!(notify_sessions = notify, chat_sessions = chat, "Sessions closed");
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("notify_hub", &self.notify_hub)
            .field("rooms", &self.rooms)
            .field("dispatcher", &self.dispatcher)
            .field("notifications", &self.notifications)
            .field("config", &"AppConfig")
            .finish()
    }
}
