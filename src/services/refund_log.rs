//! Immutable ledger of executed refunds.
//!
//! Entries model already-decided refunds: approval happened upstream in the
//! cancellation workflow, so a new entry is written with status `processed`
//! and every review timestamp set to now. Only the asynchronous processor
//! confirmation sets `completed_at`.

use std::sync::Arc;

use chrono::{Datelike, Utc};
use rand::Rng;
use tracing::{info, warn};
use uuid::Uuid;

use crate::clients::PaymentsApi;
use crate::error::{AppError, AppResult};
use crate::models::{Booking, RefundLogEntry, RefundLogStatus, RefundType};
use crate::store::{BookingStore, RefundLedger};

/// Input for one ledger entry.
#[derive(Debug, Clone)]
pub struct NewRefundLog {
    pub booking_id: Uuid,
    pub amount: i64,
    pub reason: String,
    pub processor_refund_id: Option<String>,
    pub processor_status: Option<String>,
    pub admin_id: Option<Uuid>,
    pub notes: Option<String>,
}

pub struct RefundLogService {
    bookings: Arc<dyn BookingStore>,
    ledger: Arc<dyn RefundLedger>,
    payments: Arc<dyn PaymentsApi>,
    /// Flat fee (minor units) deducted from every refund.
    processing_fee: i64,
}

impl RefundLogService {
    pub fn new(
        bookings: Arc<dyn BookingStore>,
        ledger: Arc<dyn RefundLedger>,
        payments: Arc<dyn PaymentsApi>,
        processing_fee: i64,
    ) -> Self {
        Self {
            bookings,
            ledger,
            payments,
            processing_fee,
        }
    }

    /// Record one executed refund. The refund is `full` when the amount
    /// covers the booking total, `partial` otherwise.
    pub async fn create_refund_log(&self, new: NewRefundLog) -> AppResult<RefundLogEntry> {
        let booking = self.load_booking(new.booking_id).await?;
        self.validate(&new)?;
        let entry = self.build_entry(&booking, &new);

        self.ledger.insert(&entry).await?;
        info!(
            booking_id = %new.booking_id,
            reference = %entry.reference,
            net_amount = entry.net_amount,
            "refund logged"
        );
        Ok(entry)
    }

    /// Execute a refund against the payment processor and record it. The
    /// processor call is NOT retried on failure (duplicate-refund hazard)
    /// and nothing is written to the ledger unless it succeeds.
    pub async fn execute_refund(&self, new: NewRefundLog) -> AppResult<RefundLogEntry> {
        let booking = self.load_booking(new.booking_id).await?;
        // Validate before touching the processor; a rejected amount must not
        // create a refund.
        self.validate(&new)?;

        let created = self
            .payments
            .create_refund(&booking.payment_reference, Some(new.amount), &new.reason)
            .await
            .map_err(|e| {
                warn!(
                    booking_id = %new.booking_id,
                    error = %e,
                    "processor refused refund; surfacing for manual review"
                );
                e
            })?;

        self.create_refund_log(NewRefundLog {
            processor_refund_id: Some(created.refund_id),
            processor_status: Some(created.status),
            ..new
        })
        .await
    }

    /// Merge a processor-driven status update onto an entry. Entering
    /// `completed` stamps `completed_at`; no transition table is enforced
    /// here because the processor is the source of truth.
    pub async fn update_status(
        &self,
        entry_id: Uuid,
        new_status: RefundLogStatus,
        processor_reference: Option<String>,
        processor_status: Option<String>,
    ) -> AppResult<RefundLogEntry> {
        let mut entry = self
            .ledger
            .get(entry_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("refund log entry {entry_id}")))?;

        entry.status = new_status;
        if processor_reference.is_some() {
            entry.processor_reference = processor_reference;
        }
        if processor_status.is_some() {
            entry.processor_status = processor_status;
        }
        if new_status == RefundLogStatus::Completed && entry.completed_at.is_none() {
            entry.completed_at = Some(Utc::now());
        }

        self.ledger.update(&entry).await?;
        Ok(entry)
    }

    pub async fn list_for_booking(&self, booking_id: Uuid) -> AppResult<Vec<RefundLogEntry>> {
        self.ledger.list_for_booking(booking_id).await
    }

    fn validate(&self, new: &NewRefundLog) -> AppResult<()> {
        if new.amount <= 0 {
            return Err(AppError::Validation(
                "refund amount must be greater than 0".to_string(),
            ));
        }
        if new.reason.trim().is_empty() {
            return Err(AppError::Validation("reason must not be empty".to_string()));
        }
        if self.processing_fee > new.amount {
            return Err(AppError::Validation(format!(
                "processing fee {} exceeds refund amount {}",
                self.processing_fee, new.amount
            )));
        }
        Ok(())
    }

    /// Assumes [`Self::validate`] already passed for `new`.
    fn build_entry(&self, booking: &Booking, new: &NewRefundLog) -> RefundLogEntry {
        let refund_type = if new.amount >= booking.total_amount {
            RefundType::Full
        } else {
            RefundType::Partial
        };

        let now = Utc::now();
        RefundLogEntry {
            id: Uuid::new_v4(),
            reference: generate_reference(),
            booking_id: booking.id,
            customer_id: booking.customer_id,
            requested_amount: new.amount,
            approved_amount: new.amount,
            processing_fee: self.processing_fee,
            net_amount: new.amount - self.processing_fee,
            refund_type,
            status: RefundLogStatus::Processed,
            processor_reference: new.processor_refund_id.clone(),
            processor_status: new.processor_status.clone(),
            reason: new.reason.clone(),
            admin_id: new.admin_id,
            notes: new.notes.clone(),
            requested_at: now,
            reviewed_at: now,
            approved_at: now,
            processed_at: now,
            completed_at: None,
        }
    }

    async fn load_booking(&self, booking_id: Uuid) -> AppResult<Booking> {
        self.bookings
            .get(booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))
    }
}

/// Globally unique ledger reference: `REF-{year}-{unix_ts}{4 random digits}`.
fn generate_reference() -> String {
    let now = Utc::now();
    let suffix: u16 = rand::thread_rng().gen_range(1000..10000);
    format!("REF-{}-{}{}", now.year(), now.timestamp(), suffix)
}
