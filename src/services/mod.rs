//! Business logic for the booking lifecycle core.

pub mod cancellation;
pub mod etickets;
pub mod refund_log;
pub mod sync;

pub use cancellation::{compute_refund, validate_status_transition, CancellationWorkflow};
pub use etickets::ETicketAvailabilityService;
pub use refund_log::{NewRefundLog, RefundLogService};
pub use sync::{BookingSyncOrchestrator, DISTRIBUTION_CHANNEL};
