//! Booking synchronization against the ticketing provider.
//!
//! Turns a paid local booking into a confirmed provider-side booking:
//! reservation -> guest submission -> booking creation, reconciled back onto
//! the local record. Re-invocation is always safe; a booking that already
//! carries a provider booking id short-circuits before any network call.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::clients::TicketingApi;
use crate::error::{AppError, AppResult};
use crate::models::{Booking, ProviderBookingStatusView, ProviderLinkage};
use crate::store::BookingStore;

/// The provider's response omits the distribution channel; this system only
/// issues e-tickets, so it is pinned here. Revisit if the provider contract
/// ever starts returning one.
pub const DISTRIBUTION_CHANNEL: &str = "ETICKET";

/// Where the provider reservation comes from, resolved once per sync run.
enum ReservationSource {
    /// Checkout already created a reservation; reuse it.
    Existing(String),
    /// No reservation yet; create one and submit guest data first.
    New,
}

pub struct BookingSyncOrchestrator {
    bookings: Arc<dyn BookingStore>,
    ticketing: Arc<dyn TicketingApi>,
}

impl BookingSyncOrchestrator {
    pub fn new(bookings: Arc<dyn BookingStore>, ticketing: Arc<dyn TicketingApi>) -> Self {
        Self { bookings, ticketing }
    }

    /// Create the provider-side booking for a paid local booking and return
    /// the provider booking id.
    ///
    /// Idempotent: an already-linked booking returns its provider booking id
    /// without touching the provider. The sync-attempt counter is persisted
    /// before any network call so a crash mid-flight stays observable. This
    /// method never limits attempts itself; callers enforce a cap from the
    /// persisted counter.
    pub async fn sync_after_payment(&self, booking_id: Uuid) -> AppResult<String> {
        let booking = self
            .bookings
            .get(booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))?;

        if let Some(existing) = booking.provider_booking_id.clone() {
            info!(%booking_id, provider_booking_id = %existing, "booking already synced");
            return Ok(existing);
        }

        let attempt = self.bookings.increment_sync_attempts(booking_id).await?;
        info!(%booking_id, attempt, "starting booking sync");

        match self.run_sync(&booking).await {
            Ok(provider_booking_id) => {
                info!(%booking_id, attempt, %provider_booking_id, "booking sync succeeded");
                Ok(provider_booking_id)
            }
            Err(e) => {
                warn!(%booking_id, attempt, error = %e, "booking sync failed");
                if let Err(store_err) = self
                    .bookings
                    .record_sync_error(booking_id, &e.to_string())
                    .await
                {
                    warn!(%booking_id, error = %store_err, "failed to persist sync error");
                }
                Err(e)
            }
        }
    }

    async fn run_sync(&self, booking: &Booking) -> AppResult<String> {
        let source = match &booking.provider_reservation_id {
            Some(id) => ReservationSource::Existing(id.clone()),
            None => ReservationSource::New,
        };

        let reservation_id = match source {
            ReservationSource::Existing(id) => id,
            ReservationSource::New => {
                let created = self
                    .ticketing
                    .create_reservation(&booking.provider_order_payload)
                    .await?;
                // Guest submission must succeed before the reservation id is
                // persisted; a reservation without guests is unusable.
                self.ticketing
                    .submit_guests(&created.reservation_id, &booking.guest_details)
                    .await?;
                self.bookings
                    .set_reservation(booking.id, &created.reservation_id)
                    .await?;
                created.reservation_id
            }
        };

        let created = self
            .ticketing
            .create_booking(&reservation_id, DISTRIBUTION_CHANNEL)
            .await?;

        let linkage = ProviderLinkage {
            booking_id: created.booking_id.clone(),
            booking_code: created.booking_code,
            financial_status: created.financial_status,
            logistic_status: created.logistic_status,
            synced_at: Utc::now(),
        };

        if self
            .bookings
            .set_provider_linkage(booking.id, &linkage)
            .await?
        {
            return Ok(created.booking_id);
        }

        // Another instance linked the booking while this one was in flight.
        // Return the winner's id; the booking created here is orphaned on
        // the provider side and flagged for manual cleanup.
        warn!(
            booking_id = %booking.id,
            orphaned_provider_booking = %created.booking_id,
            "lost linkage race; returning existing provider booking id"
        );
        let current = self
            .bookings
            .get(booking.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("booking {}", booking.id)))?;
        current
            .provider_booking_id
            .ok_or_else(|| AppError::provider("linkage race lost but no winner recorded".to_string()))
    }

    /// Re-fetch provider-side booking status and persist it. Used for manual
    /// admin re-sync; never creates reservations or bookings.
    pub async fn sync_status(&self, booking_id: Uuid) -> AppResult<ProviderBookingStatusView> {
        let booking = self
            .bookings
            .get(booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))?;

        let provider_booking_id = booking.provider_booking_id.ok_or_else(|| {
            AppError::Validation("booking has no provider booking id yet".to_string())
        })?;

        let status = self
            .ticketing
            .get_booking_status(&provider_booking_id)
            .await?;
        self.bookings
            .update_provider_status(booking_id, &status.financial_status, &status.logistic_status)
            .await?;

        Ok(ProviderBookingStatusView {
            provider_booking_id,
            financial_status: status.financial_status,
            logistic_status: status.logistic_status,
        })
    }
}
