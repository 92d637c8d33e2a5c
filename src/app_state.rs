//! Application state shared across handlers

use std::sync::Arc;

use crate::services::{
    BookingSyncOrchestrator, CancellationWorkflow, ETicketAvailabilityService, RefundLogService,
};
use crate::store::BookingStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub bookings: Arc<dyn BookingStore>,
    pub sync: Arc<BookingSyncOrchestrator>,
    pub etickets: Arc<ETicketAvailabilityService>,
    pub cancellations: Arc<CancellationWorkflow>,
    pub refunds: Arc<RefundLogService>,
    /// Sync re-invocations are refused once the persisted counter reaches
    /// this cap; the orchestrator itself never self-limits.
    pub max_sync_attempts: i32,
}
