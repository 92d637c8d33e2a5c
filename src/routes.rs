//! Route definitions for the ticketbridge API

use axum::{routing::get, routing::post, Router};

use crate::app_state::AppState;
use crate::handlers::*;

// Booking sync routes
pub fn sync_routes() -> Router<AppState> {
    Router::new()
        .route("/api/bookings/:id/sync", post(sync_booking))
        .route("/api/bookings/:id/sync-status", post(sync_booking_status))
}

// E-ticket routes
pub fn eticket_routes() -> Router<AppState> {
    Router::new()
        .route("/api/bookings/:id/tickets", get(check_ticket_availability))
        .route("/api/bookings/:id/tickets/download", get(download_ticket))
        .route("/api/bookings/:id/tickets/zip", get(download_ticket_zip))
}

// Cancellation routes
pub fn cancellation_routes() -> Router<AppState> {
    Router::new()
        .route("/api/bookings/:id/cancellation", post(request_cancellation))
        .route(
            "/api/bookings/:id/cancellation/withdraw",
            post(withdraw_cancellation),
        )
        .route(
            "/api/cancellations/:id/approve",
            post(approve_cancellation),
        )
        .route(
            "/api/cancellations/:id/decline",
            post(decline_cancellation),
        )
        .route(
            "/api/cancellations/:id/complete",
            post(complete_cancellation),
        )
}

// Refund ledger routes
pub fn refund_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/bookings/:id/refund-logs",
            post(create_refund_log).get(list_refund_logs),
        )
        .route("/api/bookings/:id/refunds", post(execute_refund))
        .route("/api/refund-logs/:id/status", post(update_refund_status))
}
