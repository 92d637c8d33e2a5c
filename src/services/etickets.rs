//! E-ticket availability cache and download proxy.
//!
//! The provider generates tickets asynchronously after booking creation;
//! this service polls for them, caches what it finds on the booking row,
//! and proxies single/zip downloads. Every download attempt is logged
//! best-effort; log failures never block the response.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::clients::TicketingApi;
use crate::error::{AppError, AppResult};
use crate::models::{
    AvailabilityResult, Booking, DownloadKind, DownloadLogEntry, DownloadedFile, TicketStatus,
};
use crate::store::{BookingStore, DownloadLogStore};

const DEFAULT_SINGLE_CONTENT_TYPE: &str = "application/pdf";
const DEFAULT_ZIP_CONTENT_TYPE: &str = "application/zip";

pub struct ETicketAvailabilityService {
    bookings: Arc<dyn BookingStore>,
    download_log: Arc<dyn DownloadLogStore>,
    ticketing: Arc<dyn TicketingApi>,
}

impl ETicketAvailabilityService {
    pub fn new(
        bookings: Arc<dyn BookingStore>,
        download_log: Arc<dyn DownloadLogStore>,
        ticketing: Arc<dyn TicketingApi>,
    ) -> Self {
        Self {
            bookings,
            download_log,
            ticketing,
        }
    }

    /// Report ticket readiness for a booking, serving from cache when the
    /// cached status is already `available`.
    pub async fn check_availability(&self, booking_id: Uuid) -> AppResult<AvailabilityResult> {
        let booking = self.load(booking_id).await?;

        // Not yet synchronized with the provider; nothing to ask for.
        let Some(provider_booking_id) = booking.provider_booking_id.clone() else {
            return Ok(AvailabilityResult {
                status: TicketStatus::Pending,
                ticket_urls: vec![],
                zip_url: None,
            });
        };

        if booking.ticket_status == TicketStatus::Available && !booking.ticket_urls.is_empty() {
            return Ok(AvailabilityResult {
                status: TicketStatus::Available,
                ticket_urls: booking.ticket_urls,
                zip_url: booking.ticket_zip_url,
            });
        }

        let listing = self.ticketing.get_tickets(&provider_booking_id).await?;

        if listing.tickets.is_empty() {
            self.bookings
                .update_eticket_cache(booking_id, TicketStatus::Processing, &[], None, None)
                .await?;
            return Ok(AvailabilityResult {
                status: TicketStatus::Processing,
                ticket_urls: vec![],
                zip_url: None,
            });
        }

        let urls: Vec<String> = listing
            .tickets
            .iter()
            .map(|t| t.download_url.clone())
            .collect();
        let checksums: Vec<&str> = listing
            .tickets
            .iter()
            .filter_map(|t| t.checksum.as_deref())
            .collect();
        let checksums_json =
            (!checksums.is_empty()).then(|| serde_json::json!(checksums));

        self.bookings
            .update_eticket_cache(
                booking_id,
                TicketStatus::Available,
                &urls,
                listing.zip_url.as_deref(),
                checksums_json.as_ref(),
            )
            .await?;

        info!(%booking_id, tickets = urls.len(), "tickets available");
        Ok(AvailabilityResult {
            status: TicketStatus::Available,
            ticket_urls: urls,
            zip_url: listing.zip_url,
        })
    }

    /// Proxy one ticket file from the provider.
    pub async fn download_single(
        &self,
        booking_id: Uuid,
        order_item_id: &str,
        download_token: &str,
    ) -> AppResult<DownloadedFile> {
        let booking = self.load(booking_id).await?;
        let provider_booking_id = require_linkage(&booking)?;

        let result = self
            .ticketing
            .download_ticket(&provider_booking_id, order_item_id, download_token)
            .await;

        match result {
            Ok(file) => {
                self.log_attempt(booking_id, Some(order_item_id), DownloadKind::Single, None)
                    .await;
                Ok(DownloadedFile {
                    filename: format!("{}-{}.pdf", booking.reference, order_item_id),
                    content_type: file
                        .content_type
                        .unwrap_or_else(|| DEFAULT_SINGLE_CONTENT_TYPE.to_string()),
                    bytes: file.bytes,
                })
            }
            Err(e) => {
                self.log_attempt(
                    booking_id,
                    Some(order_item_id),
                    DownloadKind::Single,
                    Some(e.to_string()),
                )
                .await;
                Err(e)
            }
        }
    }

    /// Proxy the zip package of all tickets, reusing the cached zip URL when
    /// one exists and caching a freshly fetched one otherwise.
    pub async fn download_zip(&self, booking_id: Uuid) -> AppResult<DownloadedFile> {
        let booking = self.load(booking_id).await?;
        require_linkage(&booking)?;

        if booking.ticket_status != TicketStatus::Available {
            return Err(AppError::Validation(
                "tickets are not yet available for this booking".to_string(),
            ));
        }

        let result = self.fetch_zip(&booking).await;

        match result {
            Ok(file) => {
                self.log_attempt(booking_id, None, DownloadKind::Zip, None).await;
                Ok(DownloadedFile {
                    filename: format!("{}-tickets.zip", booking.reference),
                    content_type: file
                        .content_type
                        .unwrap_or_else(|| DEFAULT_ZIP_CONTENT_TYPE.to_string()),
                    bytes: file.bytes,
                })
            }
            Err(e) => {
                self.log_attempt(booking_id, None, DownloadKind::Zip, Some(e.to_string()))
                    .await;
                Err(e)
            }
        }
    }

    async fn fetch_zip(&self, booking: &Booking) -> AppResult<crate::clients::FetchedFile> {
        let provider_booking_id = require_linkage(booking)?;

        let zip_url = match &booking.ticket_zip_url {
            Some(url) => url.clone(),
            None => {
                let url = self.ticketing.get_zip_url(&provider_booking_id).await?;
                self.bookings.set_zip_url(booking.id, &url).await?;
                url
            }
        };

        self.ticketing.download_file(&zip_url).await
    }

    /// Append to the download log and stamp the booking's download counters.
    /// Both writes are best-effort.
    async fn log_attempt(
        &self,
        booking_id: Uuid,
        order_item_id: Option<&str>,
        kind: DownloadKind,
        error_message: Option<String>,
    ) {
        let now = Utc::now();
        let success = error_message.is_none();

        let entry = DownloadLogEntry {
            id: Uuid::new_v4(),
            booking_id,
            order_item_id: order_item_id.map(|s| s.to_string()),
            kind,
            success,
            error_message,
            attempted_at: now,
        };
        if let Err(e) = self.download_log.append(&entry).await {
            warn!(%booking_id, error = %e, "failed to append download log entry");
        }

        if let Err(e) = self
            .bookings
            .record_download_attempt(booking_id, now, success)
            .await
        {
            warn!(%booking_id, error = %e, "failed to stamp download attempt on booking");
        }
    }

    async fn load(&self, booking_id: Uuid) -> AppResult<Booking> {
        self.bookings
            .get(booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))
    }
}

fn require_linkage(booking: &Booking) -> AppResult<String> {
    booking
        .provider_booking_id
        .clone()
        .ok_or_else(|| AppError::Validation("booking has no provider booking id yet".to_string()))
}
