//! Shared test fixtures: in-memory stores and scripted provider/processor
//! fakes so the lifecycle services can run without Postgres or a network.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use ticketbridge_server::clients::{
    BookingCreated, FetchedFile, PaymentsApi, ProviderBookingStatus, ProviderTicket,
    RefundCreated, ReservationCreated, TicketList, TicketingApi,
};
use ticketbridge_server::error::{AppError, AppResult};
use ticketbridge_server::models::{
    Booking, BookingStatus, CancellationRequest, CancellationRequestStatus, CancellationState,
    DownloadLogEntry, ProviderLinkage, RefundLogEntry, TicketStatus,
};
use ticketbridge_server::store::{
    BookingStore, CancellationStore, DownloadLogStore, RefundLedger,
};

// ===== In-memory store =====

#[derive(Default)]
pub struct MemoryStore {
    pub bookings: Mutex<HashMap<Uuid, Booking>>,
    pub requests: Mutex<HashMap<Uuid, CancellationRequest>>,
    pub refunds: Mutex<Vec<RefundLogEntry>>,
    pub downloads: Mutex<Vec<DownloadLogEntry>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert_booking(&self, booking: Booking) {
        self.bookings.lock().unwrap().insert(booking.id, booking);
    }

    pub fn booking(&self, id: Uuid) -> Booking {
        self.bookings.lock().unwrap().get(&id).cloned().unwrap()
    }

    pub fn request(&self, id: Uuid) -> CancellationRequest {
        self.requests.lock().unwrap().get(&id).cloned().unwrap()
    }

    pub fn refund_entries(&self) -> Vec<RefundLogEntry> {
        self.refunds.lock().unwrap().clone()
    }

    pub fn download_entries(&self) -> Vec<DownloadLogEntry> {
        self.downloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn get(&self, id: Uuid) -> AppResult<Option<Booking>> {
        Ok(self.bookings.lock().unwrap().get(&id).cloned())
    }

    async fn increment_sync_attempts(&self, id: Uuid) -> AppResult<i32> {
        let mut bookings = self.bookings.lock().unwrap();
        let booking = bookings.get_mut(&id).unwrap();
        booking.sync_attempts += 1;
        Ok(booking.sync_attempts)
    }

    async fn record_sync_error(&self, id: Uuid, message: &str) -> AppResult<()> {
        let mut bookings = self.bookings.lock().unwrap();
        bookings.get_mut(&id).unwrap().last_sync_error = Some(message.to_string());
        Ok(())
    }

    async fn set_reservation(&self, id: Uuid, reservation_id: &str) -> AppResult<()> {
        let mut bookings = self.bookings.lock().unwrap();
        bookings.get_mut(&id).unwrap().provider_reservation_id = Some(reservation_id.to_string());
        Ok(())
    }

    async fn set_provider_linkage(&self, id: Uuid, linkage: &ProviderLinkage) -> AppResult<bool> {
        let mut bookings = self.bookings.lock().unwrap();
        let booking = bookings.get_mut(&id).unwrap();
        if booking.provider_booking_id.is_some() {
            return Ok(false);
        }
        booking.provider_booking_id = Some(linkage.booking_id.clone());
        booking.provider_booking_code = Some(linkage.booking_code.clone());
        booking.provider_financial_status = Some(linkage.financial_status.clone());
        booking.provider_logistic_status = Some(linkage.logistic_status.clone());
        booking.synced_at = Some(linkage.synced_at);
        booking.last_sync_error = None;
        Ok(true)
    }

    async fn update_provider_status(
        &self,
        id: Uuid,
        financial_status: &str,
        logistic_status: &str,
    ) -> AppResult<()> {
        let mut bookings = self.bookings.lock().unwrap();
        let booking = bookings.get_mut(&id).unwrap();
        booking.provider_financial_status = Some(financial_status.to_string());
        booking.provider_logistic_status = Some(logistic_status.to_string());
        booking.synced_at = Some(Utc::now());
        Ok(())
    }

    async fn update_eticket_cache(
        &self,
        id: Uuid,
        status: TicketStatus,
        ticket_urls: &[String],
        zip_url: Option<&str>,
        checksums: Option<&serde_json::Value>,
    ) -> AppResult<()> {
        let mut bookings = self.bookings.lock().unwrap();
        let booking = bookings.get_mut(&id).unwrap();
        booking.ticket_status = status;
        booking.ticket_urls = ticket_urls.to_vec();
        if let Some(url) = zip_url {
            booking.ticket_zip_url = Some(url.to_string());
        }
        if let Some(checksums) = checksums {
            booking.ticket_checksums = Some(checksums.clone());
        }
        Ok(())
    }

    async fn set_zip_url(&self, id: Uuid, zip_url: &str) -> AppResult<()> {
        let mut bookings = self.bookings.lock().unwrap();
        bookings.get_mut(&id).unwrap().ticket_zip_url = Some(zip_url.to_string());
        Ok(())
    }

    async fn record_download_attempt(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
        success: bool,
    ) -> AppResult<()> {
        let mut bookings = self.bookings.lock().unwrap();
        let booking = bookings.get_mut(&id).unwrap();
        booking.last_download_attempt_at = Some(at);
        if success {
            booking.download_count += 1;
            if booking.first_downloaded_at.is_none() {
                booking.first_downloaded_at = Some(at);
            }
        }
        Ok(())
    }

    async fn update_cancellation_state(&self, id: Uuid, state: CancellationState) -> AppResult<()> {
        let mut bookings = self.bookings.lock().unwrap();
        bookings.get_mut(&id).unwrap().cancellation_status = state;
        Ok(())
    }

    async fn mark_cancelled(&self, id: Uuid) -> AppResult<()> {
        let mut bookings = self.bookings.lock().unwrap();
        let booking = bookings.get_mut(&id).unwrap();
        booking.status = BookingStatus::Cancelled;
        booking.cancellation_status = CancellationState::Cancelled;
        Ok(())
    }
}

#[async_trait]
impl CancellationStore for MemoryStore {
    async fn insert_if_no_active(&self, request: &CancellationRequest) -> AppResult<bool> {
        // Check and insert under one lock, matching the atomicity of the
        // guarded SQL insert.
        let mut requests = self.requests.lock().unwrap();
        let active = requests.values().any(|r| {
            r.booking_id == request.booking_id
                && matches!(
                    r.status,
                    CancellationRequestStatus::Pending | CancellationRequestStatus::Approved
                )
        });
        if active {
            return Ok(false);
        }
        requests.insert(request.id, request.clone());
        Ok(true)
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<CancellationRequest>> {
        Ok(self.requests.lock().unwrap().get(&id).cloned())
    }

    async fn update(&self, request: &CancellationRequest) -> AppResult<()> {
        self.requests
            .lock()
            .unwrap()
            .insert(request.id, request.clone());
        Ok(())
    }

    async fn list_for_booking(&self, booking_id: Uuid) -> AppResult<Vec<CancellationRequest>> {
        Ok(self
            .requests
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.booking_id == booking_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl RefundLedger for MemoryStore {
    async fn insert(&self, entry: &RefundLogEntry) -> AppResult<()> {
        self.refunds.lock().unwrap().push(entry.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<RefundLogEntry>> {
        Ok(self
            .refunds
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.id == id)
            .cloned())
    }

    async fn update(&self, entry: &RefundLogEntry) -> AppResult<()> {
        let mut refunds = self.refunds.lock().unwrap();
        if let Some(existing) = refunds.iter_mut().find(|e| e.id == entry.id) {
            *existing = entry.clone();
        }
        Ok(())
    }

    async fn list_for_booking(&self, booking_id: Uuid) -> AppResult<Vec<RefundLogEntry>> {
        Ok(self
            .refunds
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.booking_id == booking_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl DownloadLogStore for MemoryStore {
    async fn append(&self, entry: &DownloadLogEntry) -> AppResult<()> {
        self.downloads.lock().unwrap().push(entry.clone());
        Ok(())
    }
}

// ===== Scripted ticketing provider =====

#[derive(Default)]
pub struct FakeTicketing {
    pub create_reservation_calls: AtomicUsize,
    pub submit_guests_calls: AtomicUsize,
    pub create_booking_calls: AtomicUsize,
    pub get_tickets_calls: AtomicUsize,
    pub get_zip_url_calls: AtomicUsize,
    pub get_booking_status_calls: AtomicUsize,
    pub download_calls: AtomicUsize,

    pub fail_create_booking: AtomicBool,
    pub fail_downloads: AtomicBool,

    pub tickets: Mutex<Vec<ProviderTicket>>,
    pub zip_url: Mutex<Option<String>>,
}

impl FakeTicketing {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_tickets(tickets: Vec<ProviderTicket>) -> Arc<Self> {
        let fake = Self::default();
        *fake.tickets.lock().unwrap() = tickets;
        Arc::new(fake)
    }

    pub fn total_calls(&self) -> usize {
        self.create_reservation_calls.load(Ordering::SeqCst)
            + self.submit_guests_calls.load(Ordering::SeqCst)
            + self.create_booking_calls.load(Ordering::SeqCst)
            + self.get_tickets_calls.load(Ordering::SeqCst)
            + self.get_zip_url_calls.load(Ordering::SeqCst)
            + self.get_booking_status_calls.load(Ordering::SeqCst)
            + self.download_calls.load(Ordering::SeqCst)
    }
}

pub fn provider_ticket(order_item_id: &str) -> ProviderTicket {
    ProviderTicket {
        download_url: format!("https://provider.test/tickets/{order_item_id}"),
        order_item_id: Some(order_item_id.to_string()),
        checksum: Some(format!("sha256:{order_item_id}")),
    }
}

#[async_trait]
impl TicketingApi for FakeTicketing {
    async fn create_reservation(
        &self,
        _payload: &serde_json::Value,
    ) -> AppResult<ReservationCreated> {
        self.create_reservation_calls.fetch_add(1, Ordering::SeqCst);
        Ok(ReservationCreated {
            reservation_id: "RSV-1".to_string(),
        })
    }

    async fn submit_guests(
        &self,
        _reservation_id: &str,
        _guests: &serde_json::Value,
    ) -> AppResult<()> {
        self.submit_guests_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn create_booking(
        &self,
        _reservation_id: &str,
        _distribution_channel: &str,
    ) -> AppResult<BookingCreated> {
        self.create_booking_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_create_booking.load(Ordering::SeqCst) {
            return Err(AppError::provider("booking creation rejected".to_string()));
        }
        Ok(BookingCreated {
            booking_id: "B-100".to_string(),
            booking_code: "CODE-100".to_string(),
            financial_status: "PAID".to_string(),
            logistic_status: "PROCESSING".to_string(),
        })
    }

    async fn get_tickets(&self, _provider_booking_id: &str) -> AppResult<TicketList> {
        self.get_tickets_calls.fetch_add(1, Ordering::SeqCst);
        Ok(TicketList {
            tickets: self.tickets.lock().unwrap().clone(),
            zip_url: self.zip_url.lock().unwrap().clone(),
        })
    }

    async fn get_zip_url(&self, _provider_booking_id: &str) -> AppResult<String> {
        self.get_zip_url_calls.fetch_add(1, Ordering::SeqCst);
        Ok("https://provider.test/zips/fresh.zip".to_string())
    }

    async fn get_booking_status(
        &self,
        _provider_booking_id: &str,
    ) -> AppResult<ProviderBookingStatus> {
        self.get_booking_status_calls.fetch_add(1, Ordering::SeqCst);
        Ok(ProviderBookingStatus {
            financial_status: "PAID".to_string(),
            logistic_status: "DELIVERED".to_string(),
        })
    }

    async fn download_ticket(
        &self,
        _provider_booking_id: &str,
        _order_item_id: &str,
        _download_token: &str,
    ) -> AppResult<FetchedFile> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_downloads.load(Ordering::SeqCst) {
            return Err(AppError::provider("ticket not ready".to_string()));
        }
        Ok(FetchedFile {
            bytes: b"%PDF-1.4 ticket".to_vec(),
            content_type: None,
        })
    }

    async fn download_file(&self, _url: &str) -> AppResult<FetchedFile> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_downloads.load(Ordering::SeqCst) {
            return Err(AppError::provider("zip not ready".to_string()));
        }
        Ok(FetchedFile {
            bytes: b"PK zip".to_vec(),
            content_type: Some("application/zip".to_string()),
        })
    }
}

// ===== Scripted payment processor =====

#[derive(Default)]
pub struct FakePayments {
    pub create_refund_calls: AtomicUsize,
    pub fail_refunds: AtomicBool,
}

impl FakePayments {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl PaymentsApi for FakePayments {
    async fn create_refund(
        &self,
        _payment_reference: &str,
        _amount: Option<i64>,
        _reason: &str,
    ) -> AppResult<RefundCreated> {
        self.create_refund_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_refunds.load(Ordering::SeqCst) {
            return Err(AppError::processor("card_expired: card no longer valid".to_string()));
        }
        Ok(RefundCreated {
            refund_id: "PR-500".to_string(),
            status: "pending".to_string(),
        })
    }
}

// ===== Fixtures =====

/// A freshly paid booking, not yet synchronized with the provider.
pub fn paid_booking() -> Booking {
    let now = Utc::now();
    Booking {
        id: Uuid::new_v4(),
        customer_id: Uuid::new_v4(),
        reference: "TB-2026-0001".to_string(),
        status: BookingStatus::Active,
        total_amount: 100_000,
        event_date: Some(now + chrono::Duration::days(45)),
        payment_reference: "PAY-abc".to_string(),
        provider_order_payload: serde_json::json!({ "items": [{ "sku": "GA", "qty": 2 }] }),
        guest_details: serde_json::json!([{ "name": "Guest One" }]),
        provider_reservation_id: None,
        provider_booking_id: None,
        provider_booking_code: None,
        provider_financial_status: None,
        provider_logistic_status: None,
        sync_attempts: 0,
        last_sync_error: None,
        synced_at: None,
        cancellation_status: CancellationState::None,
        ticket_status: TicketStatus::Pending,
        ticket_urls: vec![],
        ticket_zip_url: None,
        ticket_checksums: None,
        download_count: 0,
        first_downloaded_at: None,
        last_download_attempt_at: None,
        created_at: now,
        updated_at: now,
    }
}

/// A booking already linked to a provider booking.
pub fn synced_booking(provider_booking_id: &str) -> Booking {
    let mut booking = paid_booking();
    booking.provider_reservation_id = Some("RSV-0".to_string());
    booking.provider_booking_id = Some(provider_booking_id.to_string());
    booking.provider_booking_code = Some("CODE-0".to_string());
    booking.provider_financial_status = Some("PAID".to_string());
    booking.provider_logistic_status = Some("PROCESSING".to_string());
    booking.synced_at = Some(Utc::now());
    booking
}
