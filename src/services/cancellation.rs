//! Cancellation workflow: eligibility, the request state machine, and the
//! time-tiered refund policy.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::config::CancellationPolicy;
use crate::error::{AppError, AppResult};
use crate::models::{
    Booking, BookingStatus, CancellationRequest, CancellationRequestStatus, CancellationState,
    RefundStatus,
};
use crate::store::{BookingStore, CancellationStore};

/// Check one request status transition against the allowed table:
/// `pending -> {cancelled_by_customer, approved, declined}` and
/// `approved -> completed`. Everything else is rejected with an error
/// naming the disallowed pair.
pub fn validate_status_transition(
    current: CancellationRequestStatus,
    next: CancellationRequestStatus,
) -> AppResult<()> {
    use CancellationRequestStatus::*;

    let allowed = matches!(
        (current, next),
        (Pending, CancelledByCustomer) | (Pending, Approved) | (Pending, Declined)
            | (Approved, Completed)
    );

    if allowed {
        Ok(())
    } else {
        Err(AppError::invalid_state(current.as_str(), next.as_str()))
    }
}

/// Refund amount for a cancellation, as a pure function of the policy, the
/// booking total, and the whole days remaining until the event. An unknown
/// event date refunds the full amount.
pub fn compute_refund(
    policy: &CancellationPolicy,
    total_amount: i64,
    event_date: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> i64 {
    let Some(event_date) = event_date else {
        return total_amount;
    };

    let days_until_event = (event_date - now).num_days();

    if days_until_event >= policy.full_refund_days {
        total_amount
    } else if days_until_event >= policy.half_refund_days {
        total_amount * policy.half_refund_percent / 100
    } else {
        0
    }
}

pub struct CancellationWorkflow {
    bookings: Arc<dyn BookingStore>,
    cancellations: Arc<dyn CancellationStore>,
    policy: CancellationPolicy,
}

impl CancellationWorkflow {
    pub fn new(
        bookings: Arc<dyn BookingStore>,
        cancellations: Arc<dyn CancellationStore>,
        policy: CancellationPolicy,
    ) -> Self {
        Self {
            bookings,
            cancellations,
            policy,
        }
    }

    /// Customer-initiated cancellation request. At most one `pending` or
    /// `approved` request may exist per booking; the check and the insert
    /// are a single atomic store operation, so concurrent calls yield
    /// exactly one success.
    pub async fn request_cancellation(
        &self,
        booking_id: Uuid,
        customer_id: Uuid,
        reason: &str,
        customer_notes: Option<String>,
    ) -> AppResult<CancellationRequest> {
        if reason.trim().is_empty() {
            return Err(AppError::Validation("reason must not be empty".to_string()));
        }

        let booking = self.load_booking(booking_id).await?;
        verify_ownership(&booking, customer_id)?;

        if booking.status == BookingStatus::Cancelled {
            return Err(AppError::Validation(
                "booking is already cancelled".to_string(),
            ));
        }

        let request = CancellationRequest {
            id: Uuid::new_v4(),
            booking_id,
            customer_id,
            reason: reason.to_string(),
            customer_notes,
            status: CancellationRequestStatus::Pending,
            admin_id: None,
            admin_notes: None,
            reviewed_at: None,
            completed_at: None,
            refund_amount: None,
            refund_status: RefundStatus::NotApplicable,
            refund_processed_at: None,
            created_at: Utc::now(),
        };

        if !self.cancellations.insert_if_no_active(&request).await? {
            return Err(AppError::Validation(
                "booking already has an active cancellation request".to_string(),
            ));
        }

        self.bookings
            .update_cancellation_state(booking_id, CancellationState::Requested)
            .await?;

        info!(%booking_id, request_id = %request.id, "cancellation requested");
        Ok(request)
    }

    /// Customer withdraws their own pending request.
    pub async fn customer_cancel_request(
        &self,
        booking_id: Uuid,
        customer_id: Uuid,
    ) -> AppResult<CancellationRequest> {
        let booking = self.load_booking(booking_id).await?;
        verify_ownership(&booking, customer_id)?;

        let mut request = self
            .cancellations
            .list_for_booking(booking_id)
            .await?
            .into_iter()
            .find(|r| r.status == CancellationRequestStatus::Pending)
            .ok_or_else(|| {
                AppError::NotFound(format!("pending cancellation request for booking {booking_id}"))
            })?;

        validate_status_transition(request.status, CancellationRequestStatus::CancelledByCustomer)?;
        request.status = CancellationRequestStatus::CancelledByCustomer;
        self.cancellations.update(&request).await?;

        self.bookings
            .update_cancellation_state(booking_id, CancellationState::None)
            .await?;

        Ok(request)
    }

    /// Admin approves a pending request. A missing refund amount is computed
    /// from the time-tiered policy.
    pub async fn approve(
        &self,
        request_id: Uuid,
        admin_id: Uuid,
        refund_amount: Option<i64>,
        notes: Option<String>,
    ) -> AppResult<CancellationRequest> {
        let mut request = self.load_request(request_id).await?;
        validate_status_transition(request.status, CancellationRequestStatus::Approved)?;

        let booking = self.load_booking(request.booking_id).await?;

        let amount = match refund_amount {
            Some(amount) => {
                if amount < 0 || amount > booking.total_amount {
                    return Err(AppError::Validation(format!(
                        "refund amount {amount} is outside 0..={}",
                        booking.total_amount
                    )));
                }
                amount
            }
            None => compute_refund(
                &self.policy,
                booking.total_amount,
                booking.event_date,
                Utc::now(),
            ),
        };

        request.status = CancellationRequestStatus::Approved;
        request.admin_id = Some(admin_id);
        request.admin_notes = notes;
        request.reviewed_at = Some(Utc::now());
        request.refund_amount = Some(amount);
        request.refund_status = if amount > 0 {
            RefundStatus::Pending
        } else {
            RefundStatus::NotApplicable
        };
        self.cancellations.update(&request).await?;

        self.bookings
            .update_cancellation_state(request.booking_id, CancellationState::Approved)
            .await?;

        info!(%request_id, %admin_id, refund_amount = amount, "cancellation approved");
        Ok(request)
    }

    /// Admin declines a pending request.
    pub async fn decline(
        &self,
        request_id: Uuid,
        admin_id: Uuid,
        notes: String,
    ) -> AppResult<CancellationRequest> {
        let mut request = self.load_request(request_id).await?;
        validate_status_transition(request.status, CancellationRequestStatus::Declined)?;

        request.status = CancellationRequestStatus::Declined;
        request.admin_id = Some(admin_id);
        request.admin_notes = Some(notes);
        request.reviewed_at = Some(Utc::now());
        self.cancellations.update(&request).await?;

        self.bookings
            .update_cancellation_state(request.booking_id, CancellationState::Declined)
            .await?;

        info!(%request_id, %admin_id, "cancellation declined");
        Ok(request)
    }

    /// Finalize an approved cancellation: the request completes and the
    /// booking flips to cancelled in the same store write. A supplied refund
    /// reference marks the refund as processed.
    pub async fn complete(
        &self,
        request_id: Uuid,
        admin_id: Uuid,
        refund_reference: Option<String>,
        notes: Option<String>,
    ) -> AppResult<CancellationRequest> {
        let mut request = self.load_request(request_id).await?;
        validate_status_transition(request.status, CancellationRequestStatus::Completed)?;

        request.status = CancellationRequestStatus::Completed;
        request.admin_id = Some(admin_id);
        if notes.is_some() {
            request.admin_notes = notes;
        }
        request.completed_at = Some(Utc::now());
        if refund_reference.is_some() {
            request.refund_status = RefundStatus::Processed;
            request.refund_processed_at = Some(Utc::now());
        }
        self.cancellations.update(&request).await?;

        self.bookings.mark_cancelled(request.booking_id).await?;

        info!(%request_id, %admin_id, "cancellation completed");
        Ok(request)
    }

    async fn load_booking(&self, booking_id: Uuid) -> AppResult<Booking> {
        self.bookings
            .get(booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))
    }

    async fn load_request(&self, request_id: Uuid) -> AppResult<CancellationRequest> {
        self.cancellations
            .get(request_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("cancellation request {request_id}")))
    }
}

fn verify_ownership(booking: &Booking, customer_id: Uuid) -> AppResult<()> {
    if booking.customer_id == customer_id {
        Ok(())
    } else {
        Err(AppError::Unauthorized(format!(
            "booking {} does not belong to customer {customer_id}",
            booking.id
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const ALL: [CancellationRequestStatus; 5] = [
        CancellationRequestStatus::Pending,
        CancellationRequestStatus::CancelledByCustomer,
        CancellationRequestStatus::Approved,
        CancellationRequestStatus::Declined,
        CancellationRequestStatus::Completed,
    ];

    #[test]
    fn test_transition_table_exhaustive() {
        use CancellationRequestStatus::*;

        for current in ALL {
            for next in ALL {
                let allowed = matches!(
                    (current, next),
                    (Pending, CancelledByCustomer)
                        | (Pending, Approved)
                        | (Pending, Declined)
                        | (Approved, Completed)
                );
                let result = validate_status_transition(current, next);
                assert_eq!(
                    result.is_ok(),
                    allowed,
                    "transition {:?} -> {:?}",
                    current,
                    next
                );
            }
        }
    }

    #[test]
    fn test_transition_error_names_pair() {
        let err = validate_status_transition(
            CancellationRequestStatus::Declined,
            CancellationRequestStatus::Approved,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "invalid state transition: declined -> approved");
    }

    #[test]
    fn test_refund_policy_tiers() {
        let policy = CancellationPolicy::default();
        let now = Utc::now();
        let total = 100_000;

        // Unknown event date: full refund.
        assert_eq!(compute_refund(&policy, total, None, now), total);

        let cases = [
            (45, total),      // well beyond the full tier
            (30, total),      // full tier boundary
            (29, total / 2),  // just inside the half tier
            (20, total / 2),
            (15, total / 2),  // half tier boundary
            (14, 0),          // below the half tier
            (1, 0),
            (0, 0),
        ];
        for (days, expected) in cases {
            let event = now + Duration::days(days);
            assert_eq!(
                compute_refund(&policy, total, Some(event), now),
                expected,
                "days={days}"
            );
        }
    }

    #[test]
    fn test_refund_policy_past_event() {
        let policy = CancellationPolicy::default();
        let now = Utc::now();
        let event = now - Duration::days(3);
        assert_eq!(compute_refund(&policy, 100_000, Some(event), now), 0);
    }

    #[test]
    fn test_refund_policy_custom_tiers() {
        let policy = CancellationPolicy {
            full_refund_days: 10,
            half_refund_days: 5,
            half_refund_percent: 25,
        };
        let now = Utc::now();
        let event = now + Duration::days(7);
        assert_eq!(compute_refund(&policy, 1_000, Some(event), now), 250);
    }
}
