//! API handlers mapping the booking core onto HTTP.
//!
//! Handlers stay thin: payload validation, the sync-attempt cap, and
//! response shaping. Everything else lives in the services.

use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use uuid::Uuid;
use validator::Validate;

use crate::app_state::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{
    ApiResponse, ApproveCancellationPayload, AvailabilityResult, CancellationRequest,
    CompleteCancellationPayload, CreateRefundLogPayload, CustomerCancelPayload,
    DeclineCancellationPayload, DownloadSingleQuery, DownloadedFile, ExecuteRefundPayload,
    ProviderBookingStatusView, RefundLogEntry, RequestCancellationPayload,
    UpdateRefundStatusPayload,
};
use crate::services::NewRefundLog;

fn validated(payload: &impl Validate) -> AppResult<()> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))
}

// ===== Sync =====

#[derive(serde::Serialize)]
pub struct SyncResponse {
    pub provider_booking_id: String,
}

/// Trigger provider-side booking creation for a paid booking. Safe to call
/// repeatedly; refuses once the persisted attempt counter hits the cap.
pub async fn sync_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<SyncResponse>>> {
    let booking = state
        .bookings
        .get(booking_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))?;

    if booking.provider_booking_id.is_none() && booking.sync_attempts >= state.max_sync_attempts {
        return Err(AppError::Validation(format!(
            "sync attempt limit reached ({} attempts); escalate for manual review",
            booking.sync_attempts
        )));
    }

    let provider_booking_id = state.sync.sync_after_payment(booking_id).await?;
    Ok(Json(ApiResponse::ok(SyncResponse { provider_booking_id })))
}

/// Manual admin re-sync of provider-side booking status.
pub async fn sync_booking_status(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ProviderBookingStatusView>>> {
    let status = state.sync.sync_status(booking_id).await?;
    Ok(Json(ApiResponse::ok(status)))
}

// ===== E-tickets =====

pub async fn check_ticket_availability(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<AvailabilityResult>>> {
    let result = state.etickets.check_availability(booking_id).await?;
    Ok(Json(ApiResponse::ok(result)))
}

pub async fn download_ticket(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    Query(query): Query<DownloadSingleQuery>,
) -> AppResult<Response> {
    let file = state
        .etickets
        .download_single(booking_id, &query.order_item_id, &query.download_token)
        .await?;
    Ok(file_response(file))
}

pub async fn download_ticket_zip(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> AppResult<Response> {
    let file = state.etickets.download_zip(booking_id).await?;
    Ok(file_response(file))
}

fn file_response(file: DownloadedFile) -> Response {
    let headers = [
        (header::CONTENT_TYPE, file.content_type),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file.filename),
        ),
    ];
    (headers, file.bytes).into_response()
}

// ===== Cancellation =====

pub async fn request_cancellation(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    Json(payload): Json<RequestCancellationPayload>,
) -> AppResult<Json<ApiResponse<CancellationRequest>>> {
    validated(&payload)?;
    let request = state
        .cancellations
        .request_cancellation(
            booking_id,
            payload.customer_id,
            &payload.reason,
            payload.customer_notes,
        )
        .await?;
    Ok(Json(ApiResponse::ok(request)))
}

pub async fn withdraw_cancellation(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    Json(payload): Json<CustomerCancelPayload>,
) -> AppResult<Json<ApiResponse<CancellationRequest>>> {
    let request = state
        .cancellations
        .customer_cancel_request(booking_id, payload.customer_id)
        .await?;
    Ok(Json(ApiResponse::ok(request)))
}

pub async fn approve_cancellation(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
    Json(payload): Json<ApproveCancellationPayload>,
) -> AppResult<Json<ApiResponse<CancellationRequest>>> {
    let request = state
        .cancellations
        .approve(
            request_id,
            payload.admin_id,
            payload.refund_amount,
            payload.notes,
        )
        .await?;
    Ok(Json(ApiResponse::ok(request)))
}

pub async fn decline_cancellation(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
    Json(payload): Json<DeclineCancellationPayload>,
) -> AppResult<Json<ApiResponse<CancellationRequest>>> {
    validated(&payload)?;
    let request = state
        .cancellations
        .decline(request_id, payload.admin_id, payload.notes)
        .await?;
    Ok(Json(ApiResponse::ok(request)))
}

pub async fn complete_cancellation(
    State(state): State<AppState>,
    Path(request_id): Path<Uuid>,
    Json(payload): Json<CompleteCancellationPayload>,
) -> AppResult<Json<ApiResponse<CancellationRequest>>> {
    let request = state
        .cancellations
        .complete(
            request_id,
            payload.admin_id,
            payload.refund_reference,
            payload.notes,
        )
        .await?;
    Ok(Json(ApiResponse::ok(request)))
}

// ===== Refund ledger =====

/// Record a refund that was already executed against the processor.
pub async fn create_refund_log(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    Json(payload): Json<CreateRefundLogPayload>,
) -> AppResult<Json<ApiResponse<RefundLogEntry>>> {
    validated(&payload)?;
    let entry = state
        .refunds
        .create_refund_log(NewRefundLog {
            booking_id,
            amount: payload.amount,
            reason: payload.reason,
            processor_refund_id: payload.processor_refund_id,
            processor_status: payload.processor_status,
            admin_id: payload.admin_id,
            notes: payload.notes,
        })
        .await?;
    Ok(Json(ApiResponse::ok(entry)))
}

/// Execute a refund against the processor and record it in one step.
pub async fn execute_refund(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    Json(payload): Json<ExecuteRefundPayload>,
) -> AppResult<Json<ApiResponse<RefundLogEntry>>> {
    validated(&payload)?;
    let entry = state
        .refunds
        .execute_refund(NewRefundLog {
            booking_id,
            amount: payload.amount,
            reason: payload.reason,
            processor_refund_id: None,
            processor_status: None,
            admin_id: payload.admin_id,
            notes: payload.notes,
        })
        .await?;
    Ok(Json(ApiResponse::ok(entry)))
}

pub async fn list_refund_logs(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Vec<RefundLogEntry>>>> {
    let entries = state.refunds.list_for_booking(booking_id).await?;
    Ok(Json(ApiResponse::ok(entries)))
}

/// Processor confirmation callback: merge a status update onto an entry.
pub async fn update_refund_status(
    State(state): State<AppState>,
    Path(entry_id): Path<Uuid>,
    Json(payload): Json<UpdateRefundStatusPayload>,
) -> AppResult<Json<ApiResponse<RefundLogEntry>>> {
    let entry = state
        .refunds
        .update_status(
            entry_id,
            payload.status,
            payload.processor_reference,
            payload.processor_status,
        )
        .await?;
    Ok(Json(ApiResponse::ok(entry)))
}
