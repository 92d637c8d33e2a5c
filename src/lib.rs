//! ticketbridge backend library
//!
//! Booking lifecycle core for a ticket-booking intermediary: provider-side
//! booking synchronization, e-ticket availability and download proxying,
//! the cancellation/refund state machine, and the refund ledger.

pub mod app_state;
pub mod clients;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;
