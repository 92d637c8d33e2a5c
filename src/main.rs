//! ticketbridge backend server
//!
//! Booking lifecycle orchestration for a ticket-booking intermediary:
//! reconciles locally-owned bookings with the third-party ticketing
//! provider, manages cancellations and refunds, and proxies e-ticket
//! downloads.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use ticketbridge_server::app_state::AppState;
use ticketbridge_server::clients::{ExternalTicketingClient, PaymentRefundClient};
use ticketbridge_server::config::Config;
use ticketbridge_server::routes;
use ticketbridge_server::services::{
    BookingSyncOrchestrator, CancellationWorkflow, ETicketAvailabilityService, RefundLogService,
};
use ticketbridge_server::store::PgStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load environment variables
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;

    let store = Arc::new(PgStore::new(pool));
    let ticketing = Arc::new(ExternalTicketingClient::new(config.provider.clone()));
    let payments = Arc::new(PaymentRefundClient::new(config.processor.clone()));

    let state = AppState {
        bookings: store.clone(),
        sync: Arc::new(BookingSyncOrchestrator::new(
            store.clone(),
            ticketing.clone(),
        )),
        etickets: Arc::new(ETicketAvailabilityService::new(
            store.clone(),
            store.clone(),
            ticketing.clone(),
        )),
        cancellations: Arc::new(CancellationWorkflow::new(
            store.clone(),
            store.clone(),
            config.policy.clone(),
        )),
        refunds: Arc::new(RefundLogService::new(
            store.clone(),
            store.clone(),
            payments,
            config.refund_processing_fee,
        )),
        max_sync_attempts: config.max_sync_attempts,
    };

    let app = Router::new()
        .merge(routes::sync_routes())
        .merge(routes::eticket_routes())
        .merge(routes::cancellation_routes())
        .merge(routes::refund_routes())
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(&config.cors_allowed_origins))
        .with_state(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    info!("Server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allowed_origins = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(false)
}
