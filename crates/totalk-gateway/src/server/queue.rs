//! Queue handlers
//!
//! HTTP facade over the ordered queue of each event.

use axum::{
    extract::{Path, State},
    Json,
};
use totalk_service::dto::{
    JoinQueueRequest, QueueEntryResponse, QueuePositionResponse, QueueStatusResponse,
};

use super::extract::ValidatedJson;
use super::response::{ApiResult, Created};
use super::GatewayState;

/// Join an event's queue
///
/// POST /events/{event_id}/queue
pub async fn join_queue(
    State(state): State<GatewayState>,
    Path(event_id): Path<String>,
    ValidatedJson(request): ValidatedJson<JoinQueueRequest>,
) -> ApiResult<Created<Json<QueueEntryResponse>>> {
    let entry = state.queues().join(&event_id, &request.user_id).await?;
    Ok(Created(Json(entry.into())))
}

/// Snapshot of an event's queue
///
/// GET /events/{event_id}/queue
pub async fn queue_status(
    State(state): State<GatewayState>,
    Path(event_id): Path<String>,
) -> ApiResult<Json<QueueStatusResponse>> {
    let entries = state.queues().status(&event_id).await?;
    Ok(Json(QueueStatusResponse::new(event_id, entries)))
}

/// Leave an event's queue
///
/// DELETE /events/{event_id}/queue/{user_id}
pub async fn leave_queue(
    State(state): State<GatewayState>,
    Path((event_id, user_id)): Path<(String, String)>,
) -> ApiResult<Json<QueueEntryResponse>> {
    let entry = state.queues().leave(&event_id, &user_id).await?;
    Ok(Json(entry.into()))
}

/// GET /events/{event_id}/queue/{user_id}/position
pub async fn queue_position(
    State(state): State<GatewayState>,
    Path((event_id, user_id)): Path<(String, String)>,
) -> ApiResult<Json<QueuePositionResponse>> {
    let position = state.queues().position(&event_id, &user_id).await?;
    Ok(Json(QueuePositionResponse {
        resource_id: event_id,
        user_id,
        position,
    }))
}

/// Mark a processing entry as done
///
/// POST /events/{event_id}/queue/{user_id}/complete
pub async fn complete_entry(
    State(state): State<GatewayState>,
    Path((event_id, user_id)): Path<(String, String)>,
) -> ApiResult<Json<QueueEntryResponse>> {
    let entry = state.queues().complete(&event_id, &user_id).await?;
    Ok(Json(entry.into()))
}

/// Promote the head of the queue
///
/// POST /events/{event_id}/queue-actions/next
pub async fn process_next(
    State(state): State<GatewayState>,
    Path(event_id): Path<String>,
) -> ApiResult<Json<QueueEntryResponse>> {
    let entry = state.queues().process_next(&event_id).await?;
    Ok(Json(entry.into()))
}

/// Close the queue, cancelling everyone still waiting
///
/// POST /events/{event_id}/queue-actions/close
pub async fn close_queue(
    State(state): State<GatewayState>,
    Path(event_id): Path<String>,
) -> ApiResult<Json<Vec<QueueEntryResponse>>> {
    let cancelled = state.queues().close(&event_id).await?;
    Ok(Json(cancelled.into_iter().map(Into::into).collect()))
}
