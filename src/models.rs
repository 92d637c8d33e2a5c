//! Data models for the ticketbridge booking core.

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

/// Local booking record, the system of record this service reconciles
/// against the ticketing provider.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Booking {
    pub id: Uuid,
    pub customer_id: Uuid,
    /// Human-facing booking reference, also used to derive ticket filenames.
    pub reference: String,
    pub status: BookingStatus,
    pub total_amount: i64,
    pub event_date: Option<DateTime<Utc>>,
    pub payment_reference: String,

    /// Provider order lines captured at checkout, forwarded verbatim when a
    /// reservation has to be created during sync.
    pub provider_order_payload: serde_json::Value,
    /// Guest details captured at checkout, forwarded verbatim to the
    /// provider's guest submission endpoint.
    pub guest_details: serde_json::Value,

    // Provider linkage, written once by the sync orchestrator.
    pub provider_reservation_id: Option<String>,
    pub provider_booking_id: Option<String>,
    pub provider_booking_code: Option<String>,
    pub provider_financial_status: Option<String>,
    pub provider_logistic_status: Option<String>,
    pub sync_attempts: i32,
    pub last_sync_error: Option<String>,
    pub synced_at: Option<DateTime<Utc>>,

    pub cancellation_status: CancellationState,

    // Cached e-ticket state.
    pub ticket_status: TicketStatus,
    pub ticket_urls: Vec<String>,
    pub ticket_zip_url: Option<String>,
    pub ticket_checksums: Option<serde_json::Value>,
    pub download_count: i32,
    pub first_downloaded_at: Option<DateTime<Utc>>,
    pub last_download_attempt_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Overall booking status. Cancellation is a status change, never a delete.
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "booking_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Active,
    Cancelled,
}

/// Cancellation lifecycle as seen from the booking side.
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "cancellation_state", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CancellationState {
    None,
    Requested,
    Approved,
    Declined,
    Cancelled,
}

/// Cached e-ticket readiness.
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "ticket_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Pending,
    Processing,
    Available,
}

/// Provider-side booking identity and status, persisted as one atomic
/// update so a crash can never leave the linkage half-written.
#[derive(Debug, Clone)]
pub struct ProviderLinkage {
    pub booking_id: String,
    pub booking_code: String,
    pub financial_status: String,
    pub logistic_status: String,
    pub synced_at: DateTime<Utc>,
}

/// One customer-initiated cancellation attempt.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CancellationRequest {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub customer_id: Uuid,
    pub reason: String,
    pub customer_notes: Option<String>,
    pub status: CancellationRequestStatus,
    pub admin_id: Option<Uuid>,
    pub admin_notes: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub refund_amount: Option<i64>,
    pub refund_status: RefundStatus,
    pub refund_processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Cancellation request status. Transitions are restricted; see
/// `services::cancellation::validate_status_transition`.
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "cancellation_request_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CancellationRequestStatus {
    Pending,
    CancelledByCustomer,
    Approved,
    Declined,
    Completed,
}

impl CancellationRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::CancelledByCustomer => "cancelled_by_customer",
            Self::Approved => "approved",
            Self::Declined => "declined",
            Self::Completed => "completed",
        }
    }
}

/// Refund progress attached to a cancellation request.
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "refund_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    NotApplicable,
    Pending,
    Processed,
}

/// Immutable ledger record of one executed refund.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RefundLogEntry {
    pub id: Uuid,
    /// Globally unique, format `REF-{year}-{timestamp}{random4}`.
    pub reference: String,
    pub booking_id: Uuid,
    pub customer_id: Uuid,
    pub requested_amount: i64,
    pub approved_amount: i64,
    pub processing_fee: i64,
    /// Always `approved_amount - processing_fee`, never negative.
    pub net_amount: i64,
    pub refund_type: RefundType,
    pub status: RefundLogStatus,
    pub processor_reference: Option<String>,
    pub processor_status: Option<String>,
    pub reason: String,
    pub admin_id: Option<Uuid>,
    pub notes: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub reviewed_at: DateTime<Utc>,
    pub approved_at: DateTime<Utc>,
    pub processed_at: DateTime<Utc>,
    /// Set only by asynchronous processor confirmation.
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "refund_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RefundType {
    Full,
    Partial,
}

#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "refund_log_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RefundLogStatus {
    Processed,
    Completed,
    Failed,
}

/// One e-ticket download attempt, append-only and best-effort.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DownloadLogEntry {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub order_item_id: Option<String>,
    pub kind: DownloadKind,
    pub success: bool,
    pub error_message: Option<String>,
    pub attempted_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "download_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DownloadKind {
    Single,
    Zip,
}

/// Outcome of a manual provider status re-sync.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderBookingStatusView {
    pub provider_booking_id: String,
    pub financial_status: String,
    pub logistic_status: String,
}

/// Result of an availability check, served from cache when possible.
#[derive(Debug, Clone, Serialize)]
pub struct AvailabilityResult {
    pub status: TicketStatus,
    pub ticket_urls: Vec<String>,
    pub zip_url: Option<String>,
}

/// A proxied ticket file ready to stream back to the customer.
#[derive(Debug, Clone)]
pub struct DownloadedFile {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

// ===== API payloads =====

#[derive(Debug, Deserialize, Validate)]
pub struct RequestCancellationPayload {
    pub customer_id: Uuid,
    #[validate(length(min = 1, message = "reason must not be empty"))]
    pub reason: String,
    pub customer_notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CustomerCancelPayload {
    pub customer_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ApproveCancellationPayload {
    pub admin_id: Uuid,
    pub refund_amount: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct DeclineCancellationPayload {
    pub admin_id: Uuid,
    #[validate(length(min = 1, message = "notes must not be empty"))]
    pub notes: String,
}

#[derive(Debug, Deserialize)]
pub struct CompleteCancellationPayload {
    pub admin_id: Uuid,
    pub refund_reference: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRefundLogPayload {
    #[validate(range(min = 1, message = "amount must be greater than 0"))]
    pub amount: i64,
    #[validate(length(min = 1, message = "reason must not be empty"))]
    pub reason: String,
    pub processor_refund_id: Option<String>,
    pub processor_status: Option<String>,
    pub admin_id: Option<Uuid>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRefundStatusPayload {
    pub status: RefundLogStatus,
    pub processor_reference: Option<String>,
    pub processor_status: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ExecuteRefundPayload {
    #[validate(range(min = 1, message = "amount must be greater than 0"))]
    pub amount: i64,
    #[validate(length(min = 1, message = "reason must not be empty"))]
    pub reason: String,
    pub admin_id: Option<Uuid>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DownloadSingleQuery {
    pub order_item_id: String,
    pub download_token: String,
}

/// API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}
