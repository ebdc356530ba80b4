//! Notification sink backed by the notification hub

use crate::connection::Hub;
use crate::protocol::Envelope;
use std::sync::Arc;
use totalk_core::{Notification, NotificationSink};

/// Delivers notifications to every notification session of a user
pub struct HubNotificationSink {
    hub: Arc<Hub>,
}

impl HubNotificationSink {
    pub fn new(hub: Arc<Hub>) -> Self {
        Self { hub }
    }
}

impl NotificationSink for HubNotificationSink {
    fn deliver(&self, user_id: &str, notification: &Notification) -> usize {
        self.hub
            .send_to_user(user_id, Envelope::notification(notification).to_bytes())
    }
}
