use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use shootdesk::auth::USER_ID_HEADER;
use shootdesk::dto::{
    CreateClientDto, CreatePostIdeaDto, CreateShootDto, ShootQuery, SyncRequestDto, UpdatePostIdeaDto,
    UpdateShootDto,
};
use shootdesk::models::{CalendarEvent, Client as ShootClient, PostIdea, Shoot};
use shootdesk::sync::SyncReport;

/// Error type for CLI client operations
#[derive(Debug)]
pub enum ClientError {
    /// Server returned an error status with a message body
    Server { status: reqwest::StatusCode, message: String },
    /// Network/connection/request error
    Request(reqwest::Error),
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Server { status, message } => {
                write!(f, "Server error ({}): {}", status.as_u16(), message)
            }
            ClientError::Request(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Request(err) => Some(err),
            ClientError::Server { .. } => None,
        }
    }
}

/// Extension trait for checking HTTP responses and extracting server error messages
trait ResponseExt {
    /// Checks for error status and extracts the server's error message body
    async fn check(self) -> Result<reqwest::Response, ClientError>;
}

impl ResponseExt for reqwest::Response {
    async fn check(self) -> Result<reqwest::Response, ClientError> {
        if self.status().is_success() {
            return Ok(self);
        }
        let status = self.status();
        let message = match self.json::<Value>().await {
            Ok(body) => body.get("error")
                .and_then(|e| e.as_str())
                .unwrap_or("Unknown error")
                .to_string(),
            Err(_) => format!("HTTP {}", status),
        };
        Err(ClientError::Server { status, message })
    }
}

/// Builds query parameters from a ShootQuery; `statuses` is repeated
fn shoot_query_params(query: &ShootQuery) -> Vec<(&'static str, String)> {
    let mut params: Vec<(&'static str, String)> = Vec::new();

    if let Some(ref id) = query.client_id {
        params.push(("client_id", id.clone()));
    }
    for status in &query.statuses {
        params.push(("statuses", status.to_string()));
    }
    if let Some(ref dt) = query.starts_after {
        params.push(("starts_after", dt.to_rfc3339()));
    }
    if let Some(ref dt) = query.starts_before {
        params.push(("starts_before", dt.to_rfc3339()));
    }

    params
}

/// HTTP client wrapper for communicating with the ShootDesk server
pub struct ShootDeskClient {
    /// The base URL of the server (e.g. "http://localhost:3000")
    base_url: String,
    /// Sent as `X-User-Id` on every request
    user_id: Option<String>,
    /// The underlying HTTP client
    client: Client,
}

impl ShootDeskClient {
    /// Creates a new ShootDeskClient
    ///
    /// ### Arguments
    ///
    /// * `base_url` - The base URL of the ShootDesk server
    /// * `user_id` - The user requests are made on behalf of
    pub fn new(base_url: String, user_id: Option<String>) -> Self {
        Self {
            base_url,
            user_id,
            client: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn with_user(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.user_id {
            Some(id) => builder.header(USER_ID_HEADER, id),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<reqwest::Response, ClientError> {
        self.with_user(builder).send().await.map_err(ClientError::Request)?.check().await
    }

    // ── Client endpoints ─────────────────────────────────────────────

    /// Lists the user's clients
    pub async fn list_clients(&self) -> Result<Vec<ShootClient>, ClientError> {
        let response = self.send(self.client.get(self.url("/clients"))).await?;
        response.json().await.map_err(ClientError::Request)
    }

    /// Creates a new client
    pub async fn create_client(
        &self,
        name: String,
        contact_email: Option<String>,
        notes: Option<String>,
    ) -> Result<ShootClient, ClientError> {
        let dto = CreateClientDto { name, contact_email, notes };
        let response = self.send(self.client.post(self.url("/clients")).json(&dto)).await?;
        response.json().await.map_err(ClientError::Request)
    }

    /// Gets a client by ID
    pub async fn get_client(&self, id: &str) -> Result<ShootClient, ClientError> {
        let response = self.send(self.client.get(self.url(&format!("/clients/{}", id)))).await?;
        response.json().await.map_err(ClientError::Request)
    }

    /// Deletes a client that has no shoots
    pub async fn delete_client(&self, id: &str) -> Result<(), ClientError> {
        self.send(self.client.delete(self.url(&format!("/clients/{}", id)))).await?;
        Ok(())
    }

    // ── Shoot endpoints ──────────────────────────────────────────────

    /// Lists shoots with optional filters
    pub async fn list_shoots(&self, query: &ShootQuery) -> Result<Vec<Shoot>, ClientError> {
        let params = shoot_query_params(query);
        let response = self.send(self.client.get(self.url("/shoots")).query(&params)).await?;
        response.json().await.map_err(ClientError::Request)
    }

    /// Creates a new shoot
    pub async fn create_shoot(&self, dto: &CreateShootDto) -> Result<Shoot, ClientError> {
        let response = self.send(self.client.post(self.url("/shoots")).json(dto)).await?;
        response.json().await.map_err(ClientError::Request)
    }

    /// Gets a shoot by ID
    pub async fn get_shoot(&self, id: &str) -> Result<Shoot, ClientError> {
        let response = self.send(self.client.get(self.url(&format!("/shoots/{}", id)))).await?;
        response.json().await.map_err(ClientError::Request)
    }

    /// Partially updates a shoot
    pub async fn update_shoot(&self, id: &str, dto: &UpdateShootDto) -> Result<Shoot, ClientError> {
        let response = self
            .send(self.client.patch(self.url(&format!("/shoots/{}", id))).json(dto))
            .await?;
        response.json().await.map_err(ClientError::Request)
    }

    /// Deletes a shoot
    pub async fn delete_shoot(&self, id: &str) -> Result<(), ClientError> {
        self.send(self.client.delete(self.url(&format!("/shoots/{}", id)))).await?;
        Ok(())
    }

    // ── Post idea endpoints ──────────────────────────────────────────

    /// Lists a shoot's post ideas
    pub async fn list_post_ideas(&self, shoot_id: &str) -> Result<Vec<PostIdea>, ClientError> {
        let response = self
            .send(self.client.get(self.url(&format!("/shoots/{}/post_ideas", shoot_id))))
            .await?;
        response.json().await.map_err(ClientError::Request)
    }

    /// Adds a post idea to a shoot
    pub async fn create_post_idea(&self, shoot_id: &str, dto: &CreatePostIdeaDto) -> Result<PostIdea, ClientError> {
        let response = self
            .send(self.client.post(self.url(&format!("/shoots/{}/post_ideas", shoot_id))).json(dto))
            .await?;
        response.json().await.map_err(ClientError::Request)
    }

    /// Partially updates a post idea
    pub async fn update_post_idea(&self, id: &str, dto: &UpdatePostIdeaDto) -> Result<PostIdea, ClientError> {
        let response = self
            .send(self.client.patch(self.url(&format!("/post_ideas/{}", id))).json(dto))
            .await?;
        response.json().await.map_err(ClientError::Request)
    }

    /// Deletes a post idea
    pub async fn delete_post_idea(&self, id: &str) -> Result<(), ClientError> {
        self.send(self.client.delete(self.url(&format!("/post_ideas/{}", id)))).await?;
        Ok(())
    }

    // ── Calendar endpoints ───────────────────────────────────────────

    /// Returns the Google consent URL
    pub async fn authorize_url(&self) -> Result<String, ClientError> {
        let response = self.send(self.client.get(self.url("/integrations/google/authorize"))).await?;
        let body: Value = response.json().await.map_err(ClientError::Request)?;
        Ok(body["url"].as_str().unwrap_or_default().to_string())
    }

    /// Disconnects Google Calendar
    pub async fn disconnect(&self) -> Result<(), ClientError> {
        self.send(self.client.delete(self.url("/integrations/google"))).await?;
        Ok(())
    }

    /// Runs a sync now
    pub async fn sync(&self, full: bool) -> Result<SyncReport, ClientError> {
        let dto = SyncRequestDto { full };
        let response = self.send(self.client.post(self.url("/calendar/sync")).json(&dto)).await?;
        response.json().await.map_err(ClientError::Request)
    }

    /// Gets the sync status
    pub async fn sync_status(&self) -> Result<Value, ClientError> {
        let response = self.send(self.client.get(self.url("/calendar/sync"))).await?;
        response.json().await.map_err(ClientError::Request)
    }

    /// Lists cached calendar events, defaulting to the sync window
    pub async fn list_events(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<CalendarEvent>, ClientError> {
        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(start) = start {
            params.push(("start", start.to_rfc3339()));
        }
        if let Some(end) = end {
            params.push(("end", end.to_rfc3339()));
        }
        let response = self.send(self.client.get(self.url("/calendar/events")).query(&params)).await?;
        response.json().await.map_err(ClientError::Request)
    }

    /// Lists conflicts in the sync window, or bookings overlapping a slot
    pub async fn conflicts(
        &self,
        slot: Option<(DateTime<Utc>, DateTime<Utc>)>,
        exclude_shoot_id: Option<String>,
    ) -> Result<Value, ClientError> {
        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some((start, end)) = slot {
            params.push(("start", start.to_rfc3339()));
            params.push(("end", end.to_rfc3339()));
        }
        if let Some(id) = exclude_shoot_id {
            params.push(("exclude_shoot_id", id));
        }
        let response = self.send(self.client.get(self.url("/calendar/conflicts")).query(&params)).await?;
        response.json().await.map_err(ClientError::Request)
    }
}
