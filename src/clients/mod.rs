//! HTTP clients for the ticketing provider and the payment processor.
//!
//! Both are exposed behind `async_trait` seams so services can be tested
//! against scripted fakes without a network.

mod payments;
mod ticketing;

pub use payments::{PaymentRefundClient, PaymentsApi, RefundCreated};
pub use ticketing::{
    BookingCreated, ExternalTicketingClient, FetchedFile, ProviderBookingStatus, ProviderTicket,
    ReservationCreated, TicketList, TicketingApi,
};
