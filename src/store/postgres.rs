//! PostgreSQL implementations of the store traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{
    Booking, CancellationRequest, CancellationState, DownloadLogEntry, ProviderLinkage,
    RefundLogEntry, TicketStatus,
};
use crate::store::{BookingStore, CancellationStore, DownloadLogStore, RefundLedger};

/// Single Postgres-backed store implementing every repository trait.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingStore for PgStore {
    async fn get(&self, id: Uuid) -> AppResult<Option<Booking>> {
        let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(booking)
    }

    async fn increment_sync_attempts(&self, id: Uuid) -> AppResult<i32> {
        let (attempts,): (i32,) = sqlx::query_as(
            r#"
            UPDATE bookings
            SET sync_attempts = sync_attempts + 1, updated_at = $2
            WHERE id = $1
            RETURNING sync_attempts
            "#,
        )
        .bind(id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(attempts)
    }

    async fn record_sync_error(&self, id: Uuid, message: &str) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE bookings
            SET last_sync_error = $2, updated_at = $3
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(message)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_reservation(&self, id: Uuid, reservation_id: &str) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE bookings
            SET provider_reservation_id = $2, updated_at = $3
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(reservation_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_provider_linkage(&self, id: Uuid, linkage: &ProviderLinkage) -> AppResult<bool> {
        // Conditional on the linkage still being unset: the losing side of
        // a concurrent sync leaves the row untouched.
        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET provider_booking_id = $2,
                provider_booking_code = $3,
                provider_financial_status = $4,
                provider_logistic_status = $5,
                synced_at = $6,
                last_sync_error = NULL,
                updated_at = $6
            WHERE id = $1 AND provider_booking_id IS NULL
            "#,
        )
        .bind(id)
        .bind(&linkage.booking_id)
        .bind(&linkage.booking_code)
        .bind(&linkage.financial_status)
        .bind(&linkage.logistic_status)
        .bind(linkage.synced_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn update_provider_status(
        &self,
        id: Uuid,
        financial_status: &str,
        logistic_status: &str,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE bookings
            SET provider_financial_status = $2,
                provider_logistic_status = $3,
                synced_at = $4,
                updated_at = $4
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(financial_status)
        .bind(logistic_status)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_eticket_cache(
        &self,
        id: Uuid,
        status: TicketStatus,
        ticket_urls: &[String],
        zip_url: Option<&str>,
        checksums: Option<&serde_json::Value>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE bookings
            SET ticket_status = $2,
                ticket_urls = $3,
                ticket_zip_url = COALESCE($4, ticket_zip_url),
                ticket_checksums = COALESCE($5, ticket_checksums),
                updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(ticket_urls)
        .bind(zip_url)
        .bind(checksums)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_zip_url(&self, id: Uuid, zip_url: &str) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE bookings
            SET ticket_zip_url = $2, updated_at = $3
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(zip_url)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn record_download_attempt(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
        success: bool,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE bookings
            SET last_download_attempt_at = $2,
                download_count = download_count + CASE WHEN $3 THEN 1 ELSE 0 END,
                first_downloaded_at = CASE
                    WHEN $3 AND first_downloaded_at IS NULL THEN $2
                    ELSE first_downloaded_at
                END,
                updated_at = $2
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(at)
        .bind(success)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_cancellation_state(&self, id: Uuid, state: CancellationState) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE bookings
            SET cancellation_status = $2, updated_at = $3
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(state)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn mark_cancelled(&self, id: Uuid) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE bookings
            SET status = 'cancelled', cancellation_status = 'cancelled', updated_at = $2
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl CancellationStore for PgStore {
    async fn insert_if_no_active(&self, request: &CancellationRequest) -> AppResult<bool> {
        // Guarded insert; the partial unique index on (booking_id) WHERE
        // status IN ('pending','approved') backs this up under races.
        let result = sqlx::query(
            r#"
            INSERT INTO cancellation_requests (
                id, booking_id, customer_id, reason, customer_notes,
                status, refund_status, created_at
            )
            SELECT $1, $2, $3, $4, $5, $6, $7, $8
            WHERE NOT EXISTS (
                SELECT 1 FROM cancellation_requests
                WHERE booking_id = $2 AND status IN ('pending', 'approved')
            )
            "#,
        )
        .bind(request.id)
        .bind(request.booking_id)
        .bind(request.customer_id)
        .bind(&request.reason)
        .bind(&request.customer_notes)
        .bind(request.status)
        .bind(request.refund_status)
        .bind(request.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(done.rows_affected() == 1),
            // Lost the race after the existence check: the partial unique
            // index rejects the second active request.
            Err(sqlx::Error::Database(db)) if db.code().as_deref() == Some("23505") => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<CancellationRequest>> {
        let request = sqlx::query_as::<_, CancellationRequest>(
            "SELECT * FROM cancellation_requests WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(request)
    }

    async fn update(&self, request: &CancellationRequest) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE cancellation_requests
            SET status = $2,
                admin_id = $3,
                admin_notes = $4,
                reviewed_at = $5,
                completed_at = $6,
                refund_amount = $7,
                refund_status = $8,
                refund_processed_at = $9
            WHERE id = $1
            "#,
        )
        .bind(request.id)
        .bind(request.status)
        .bind(request.admin_id)
        .bind(&request.admin_notes)
        .bind(request.reviewed_at)
        .bind(request.completed_at)
        .bind(request.refund_amount)
        .bind(request.refund_status)
        .bind(request.refund_processed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_booking(&self, booking_id: Uuid) -> AppResult<Vec<CancellationRequest>> {
        let requests = sqlx::query_as::<_, CancellationRequest>(
            "SELECT * FROM cancellation_requests WHERE booking_id = $1 ORDER BY created_at DESC",
        )
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(requests)
    }
}

#[async_trait]
impl RefundLedger for PgStore {
    async fn insert(&self, entry: &RefundLogEntry) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO refund_logs (
                id, reference, booking_id, customer_id,
                requested_amount, approved_amount, processing_fee, net_amount,
                refund_type, status, processor_reference, processor_status,
                reason, admin_id, notes,
                requested_at, reviewed_at, approved_at, processed_at, completed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                    $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            "#,
        )
        .bind(entry.id)
        .bind(&entry.reference)
        .bind(entry.booking_id)
        .bind(entry.customer_id)
        .bind(entry.requested_amount)
        .bind(entry.approved_amount)
        .bind(entry.processing_fee)
        .bind(entry.net_amount)
        .bind(entry.refund_type)
        .bind(entry.status)
        .bind(&entry.processor_reference)
        .bind(&entry.processor_status)
        .bind(&entry.reason)
        .bind(entry.admin_id)
        .bind(&entry.notes)
        .bind(entry.requested_at)
        .bind(entry.reviewed_at)
        .bind(entry.approved_at)
        .bind(entry.processed_at)
        .bind(entry.completed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<RefundLogEntry>> {
        let entry = sqlx::query_as::<_, RefundLogEntry>("SELECT * FROM refund_logs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(entry)
    }

    async fn update(&self, entry: &RefundLogEntry) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE refund_logs
            SET status = $2,
                processor_reference = $3,
                processor_status = $4,
                completed_at = $5
            WHERE id = $1
            "#,
        )
        .bind(entry.id)
        .bind(entry.status)
        .bind(&entry.processor_reference)
        .bind(&entry.processor_status)
        .bind(entry.completed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_booking(&self, booking_id: Uuid) -> AppResult<Vec<RefundLogEntry>> {
        let entries = sqlx::query_as::<_, RefundLogEntry>(
            "SELECT * FROM refund_logs WHERE booking_id = $1 ORDER BY requested_at DESC",
        )
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}

#[async_trait]
impl DownloadLogStore for PgStore {
    async fn append(&self, entry: &DownloadLogEntry) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO download_logs (
                id, booking_id, order_item_id, kind, success, error_message, attempted_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(entry.id)
        .bind(entry.booking_id)
        .bind(&entry.order_item_id)
        .bind(entry.kind)
        .bind(entry.success)
        .bind(&entry.error_message)
        .bind(entry.attempted_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
