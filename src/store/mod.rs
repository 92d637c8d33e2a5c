//! Persistence seams for the booking core.
//!
//! Services depend on these traits rather than on `sqlx` directly so the
//! lifecycle logic can be exercised against in-memory fakes. The Postgres
//! implementations live in [`postgres`].

mod postgres;

pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{
    Booking, CancellationRequest, CancellationState, DownloadLogEntry, ProviderLinkage,
    RefundLogEntry, TicketStatus,
};

/// Persistence for the local booking record and its provider linkage.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn get(&self, id: Uuid) -> AppResult<Option<Booking>>;

    /// Bump the sync-attempt counter, returning the new value. Persisted
    /// before any network call so a crash mid-flight is observable.
    async fn increment_sync_attempts(&self, id: Uuid) -> AppResult<i32>;

    /// Record the latest sync failure without touching provider linkage.
    async fn record_sync_error(&self, id: Uuid, message: &str) -> AppResult<()>;

    /// Persist the provider reservation id once guest data is submitted.
    async fn set_reservation(&self, id: Uuid, reservation_id: &str) -> AppResult<()>;

    /// Compare-and-set of the full provider linkage. Returns `false` when
    /// another instance already linked the booking; the row is untouched in
    /// that case.
    async fn set_provider_linkage(&self, id: Uuid, linkage: &ProviderLinkage) -> AppResult<bool>;

    /// Refresh provider-side financial/logistic status (manual re-sync).
    async fn update_provider_status(
        &self,
        id: Uuid,
        financial_status: &str,
        logistic_status: &str,
    ) -> AppResult<()>;

    /// Replace the cached e-ticket state.
    async fn update_eticket_cache(
        &self,
        id: Uuid,
        status: TicketStatus,
        ticket_urls: &[String],
        zip_url: Option<&str>,
        checksums: Option<&serde_json::Value>,
    ) -> AppResult<()>;

    /// Cache a freshly fetched zip URL.
    async fn set_zip_url(&self, id: Uuid, zip_url: &str) -> AppResult<()>;

    /// Stamp a download attempt; successful attempts also bump the download
    /// counter and set `first_downloaded_at` on the first success.
    async fn record_download_attempt(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
        success: bool,
    ) -> AppResult<()>;

    async fn update_cancellation_state(&self, id: Uuid, state: CancellationState) -> AppResult<()>;

    /// Terminal cancellation: booking status and cancellation state flip to
    /// `cancelled` in one write.
    async fn mark_cancelled(&self, id: Uuid) -> AppResult<()>;
}

/// Persistence for cancellation requests, one active per booking.
#[async_trait]
pub trait CancellationStore: Send + Sync {
    /// Insert `request` unless the booking already has a request in
    /// `pending` or `approved` state. Returns `false` (and inserts nothing)
    /// when an active request exists. The check and the insert are one
    /// atomic storage operation; under concurrent calls exactly one wins.
    async fn insert_if_no_active(&self, request: &CancellationRequest) -> AppResult<bool>;

    async fn get(&self, id: Uuid) -> AppResult<Option<CancellationRequest>>;

    async fn update(&self, request: &CancellationRequest) -> AppResult<()>;

    async fn list_for_booking(&self, booking_id: Uuid) -> AppResult<Vec<CancellationRequest>>;
}

/// Append-oriented ledger of executed refunds.
#[async_trait]
pub trait RefundLedger: Send + Sync {
    async fn insert(&self, entry: &RefundLogEntry) -> AppResult<()>;

    async fn get(&self, id: Uuid) -> AppResult<Option<RefundLogEntry>>;

    /// Status/timestamp updates only; amounts are immutable after insert.
    async fn update(&self, entry: &RefundLogEntry) -> AppResult<()>;

    async fn list_for_booking(&self, booking_id: Uuid) -> AppResult<Vec<RefundLogEntry>>;
}

/// Append-only log of e-ticket download attempts. Best-effort: callers
/// swallow failures from this store.
#[async_trait]
pub trait DownloadLogStore: Send + Sync {
    async fn append(&self, entry: &DownloadLogEntry) -> AppResult<()>;
}
