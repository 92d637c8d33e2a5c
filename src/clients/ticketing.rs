//! Client for the third-party ticketing provider.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::ProviderConfig;
use crate::error::{AppError, AppResult};

/// Short timeout for pure status reads.
const STATUS_TIMEOUT: Duration = Duration::from_secs(15);
/// Default timeout for mutating calls and ticket listings.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Zip packaging and file downloads are the slowest provider operations.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Deserialize)]
pub struct ReservationCreated {
    pub reservation_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookingCreated {
    pub booking_id: String,
    pub booking_code: String,
    pub financial_status: String,
    pub logistic_status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderTicket {
    pub download_url: String,
    pub order_item_id: Option<String>,
    pub checksum: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TicketList {
    #[serde(default)]
    pub tickets: Vec<ProviderTicket>,
    pub zip_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderBookingStatus {
    pub financial_status: String,
    pub logistic_status: String,
}

/// Raw file fetched from the provider. The content type is `None` when the
/// provider omits the header; callers supply a default.
#[derive(Debug, Clone)]
pub struct FetchedFile {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Provider operations the booking core depends on. Pure request/response,
/// no state.
#[async_trait]
pub trait TicketingApi: Send + Sync {
    async fn create_reservation(&self, payload: &serde_json::Value)
        -> AppResult<ReservationCreated>;

    async fn submit_guests(&self, reservation_id: &str, guests: &serde_json::Value)
        -> AppResult<()>;

    async fn create_booking(
        &self,
        reservation_id: &str,
        distribution_channel: &str,
    ) -> AppResult<BookingCreated>;

    async fn get_tickets(&self, provider_booking_id: &str) -> AppResult<TicketList>;

    async fn get_zip_url(&self, provider_booking_id: &str) -> AppResult<String>;

    async fn get_booking_status(&self, provider_booking_id: &str)
        -> AppResult<ProviderBookingStatus>;

    async fn download_ticket(
        &self,
        provider_booking_id: &str,
        order_item_id: &str,
        download_token: &str,
    ) -> AppResult<FetchedFile>;

    /// Fetch an already-resolved file URL (zip downloads).
    async fn download_file(&self, url: &str) -> AppResult<FetchedFile>;
}

/// reqwest-backed provider client, authenticated with a bearer credential.
pub struct ExternalTicketingClient {
    http_client: reqwest::Client,
    base_url: String,
    api_token: String,
}

impl ExternalTicketingClient {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn check_status(response: reqwest::Response) -> AppResult<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let snippet: String = body.chars().take(200).collect();
        Err(AppError::provider(format!("HTTP {status}: {snippet}")))
    }

    async fn fetch_file(&self, request: reqwest::RequestBuilder) -> AppResult<FetchedFile> {
        let response = request
            .bearer_auth(&self.api_token)
            .timeout(DOWNLOAD_TIMEOUT)
            .send()
            .await
            .map_err(|e| AppError::provider(e.to_string()))?;
        let response = Self::check_status(response).await?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::provider(e.to_string()))?;

        Ok(FetchedFile {
            bytes: bytes.to_vec(),
            content_type,
        })
    }

    async fn post_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> AppResult<T> {
        let response = self
            .http_client
            .post(self.url(path))
            .bearer_auth(&self.api_token)
            .timeout(REQUEST_TIMEOUT)
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::provider(e.to_string()))?;

        Self::check_status(response)
            .await?
            .json::<T>()
            .await
            .map_err(|e| AppError::provider(format!("invalid response body: {e}")))
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        timeout: Duration,
    ) -> AppResult<T> {
        let response = self
            .http_client
            .get(self.url(path))
            .bearer_auth(&self.api_token)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| AppError::provider(e.to_string()))?;

        Self::check_status(response)
            .await?
            .json::<T>()
            .await
            .map_err(|e| AppError::provider(format!("invalid response body: {e}")))
    }
}

#[async_trait]
impl TicketingApi for ExternalTicketingClient {
    async fn create_reservation(
        &self,
        payload: &serde_json::Value,
    ) -> AppResult<ReservationCreated> {
        self.post_json("/reservations", payload).await
    }

    async fn submit_guests(
        &self,
        reservation_id: &str,
        guests: &serde_json::Value,
    ) -> AppResult<()> {
        let response = self
            .http_client
            .post(self.url(&format!("/reservations/{reservation_id}/guests")))
            .bearer_auth(&self.api_token)
            .timeout(REQUEST_TIMEOUT)
            .json(guests)
            .send()
            .await
            .map_err(|e| AppError::provider(e.to_string()))?;

        Self::check_status(response).await?;
        Ok(())
    }

    async fn create_booking(
        &self,
        reservation_id: &str,
        distribution_channel: &str,
    ) -> AppResult<BookingCreated> {
        self.post_json(
            "/bookings",
            &json!({
                "reservation_id": reservation_id,
                "distribution_channel": distribution_channel,
            }),
        )
        .await
    }

    async fn get_tickets(&self, provider_booking_id: &str) -> AppResult<TicketList> {
        self.get_json(
            &format!("/bookings/{provider_booking_id}/tickets"),
            REQUEST_TIMEOUT,
        )
        .await
    }

    async fn get_zip_url(&self, provider_booking_id: &str) -> AppResult<String> {
        #[derive(Deserialize)]
        struct ZipResponse {
            download_url: String,
        }

        let response: ZipResponse = self
            .get_json(
                &format!("/bookings/{provider_booking_id}/tickets/zip"),
                DOWNLOAD_TIMEOUT,
            )
            .await?;
        Ok(response.download_url)
    }

    async fn get_booking_status(
        &self,
        provider_booking_id: &str,
    ) -> AppResult<ProviderBookingStatus> {
        self.get_json(
            &format!("/bookings/{provider_booking_id}/status"),
            STATUS_TIMEOUT,
        )
        .await
    }

    async fn download_ticket(
        &self,
        provider_booking_id: &str,
        order_item_id: &str,
        download_token: &str,
    ) -> AppResult<FetchedFile> {
        let request = self
            .http_client
            .get(self.url(&format!(
                "/bookings/{provider_booking_id}/tickets/{order_item_id}"
            )))
            .query(&[("token", download_token)]);
        self.fetch_file(request).await
    }

    async fn download_file(&self, url: &str) -> AppResult<FetchedFile> {
        self.fetch_file(self.http_client.get(url)).await
    }
}
