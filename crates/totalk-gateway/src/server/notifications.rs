//! Notification handlers
//!
//! Publishing goes through the dispatcher like any other event source; the
//! stored notification can then be looked up or, while still pending,
//! cancelled.

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use totalk_common::AppError;
use totalk_core::{DomainEvent, Notification};
use totalk_service::dto::{NotificationResponse, PublishNotificationRequest};

use super::extract::ValidatedJson;
use super::response::{Accepted, ApiResult};
use super::GatewayState;

/// Queue a notification for one user, now or at `scheduled_at`
///
/// POST /notifications
pub async fn publish_notification(
    State(state): State<GatewayState>,
    ValidatedJson(request): ValidatedJson<PublishNotificationRequest>,
) -> ApiResult<Accepted<Json<Value>>> {
    let mut notification = Notification::new(request.user_id, request.kind, request.payload);
    if let Some(at) = request.scheduled_at {
        notification = notification.scheduled_for(at);
    }
    let id = notification.id.clone();

    state
        .dispatcher()
        .sender()
        .send(DomainEvent::Notification(notification))
        .await
        .map_err(|e| AppError::EventBus(e.to_string()))?;

    Ok(Accepted(Json(json!({ "id": id }))))
}

/// Delivery state of a stored notification
///
/// GET /notifications/{notification_id}
pub async fn get_notification(
    State(state): State<GatewayState>,
    Path(notification_id): Path<String>,
) -> ApiResult<Json<NotificationResponse>> {
    let notification = state.notifications().find(&notification_id).await?;
    Ok(Json(notification.into()))
}

/// Cancel a notification that has not gone out yet
///
/// DELETE /notifications/{notification_id}
pub async fn cancel_notification(
    State(state): State<GatewayState>,
    Path(notification_id): Path<String>,
) -> ApiResult<Json<NotificationResponse>> {
    let notification = state.notifications().cancel(&notification_id).await?;
    Ok(Json(notification.into()))
}
