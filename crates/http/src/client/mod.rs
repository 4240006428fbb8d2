//! Ecogaspi HTTP client
//!
//! [`ApiClient`] attaches the session's access token to every request. When
//! the backend answers `401 Unauthorized` it refreshes the token once through
//! the bare [`PublicApiClient`] and replays the request once. If the refresh
//! cannot happen, the session is ended and the original `401` is returned.

pub mod auth;
pub mod error;
pub mod request;
pub mod typed;

use crate::envelope::{self, ApiResponse, Page};
use ecogaspi_core::{EndReason, Session, Settings};
use error::ClientError;
use request::PendingRequest;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use typed::{PublicApiClient, ensure_success, read_json};

/// Session-aware API client
#[derive(Clone, Debug)]
pub struct ApiClient {
    public: PublicApiClient,
    session: Session,
    refresh_path: String,
    refresh_gate: Arc<Mutex<()>>,
}

impl ApiClient {
    /// Create a client with default options
    pub fn new(base_url: impl Into<String>, session: Session) -> Result<Self, ClientError> {
        Self::builder().base_url(base_url).session(session).build()
    }

    /// Create a new client builder
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /// Client for the API described by `settings`
    pub fn from_settings(settings: &Settings, session: Session) -> Result<Self, ClientError> {
        Self::builder()
            .base_url(settings.full_api_url())
            .timeout(settings.request_timeout())
            .user_agent(settings.api.user_agent.clone())
            .session(session)
            .build()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        self.public.base_url()
    }

    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// The bare client used for token calls
    pub const fn public(&self) -> &PublicApiClient {
        &self.public
    }

    /// Send a request, recovering once from an expired access token
    ///
    /// Non-success statuses other than a recoverable `401` are returned as errors.
    pub async fn send(&self, request: &PendingRequest) -> Result<Response, ClientError> {
        let sent_with = self.session.access_token();
        let response = self.public.dispatch(request, sent_with.as_deref()).await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return ensure_success(response).await;
        }

        let unauthorized = ClientError::from_response(response).await;
        let Some(token) = self.recover(sent_with.as_deref()).await else {
            return Err(unauthorized);
        };

        debug!(method = %request.method(), path = request.path(), "Retrying with refreshed token");
        let retried = self.public.dispatch(request, Some(&token)).await?;
        ensure_success(retried).await
    }

    /// Send a request and decode the JSON body as-is
    pub async fn execute<T: DeserializeOwned>(
        &self,
        request: &PendingRequest,
    ) -> Result<T, ClientError> {
        read_json(self.send(request).await?).await
    }

    /// Send a request and unwrap the response envelope
    pub async fn execute_envelope<T: DeserializeOwned>(
        &self,
        request: &PendingRequest,
    ) -> Result<ApiResponse<T>, ClientError> {
        envelope::decode(self.execute(request).await?)
    }

    /// Send a request and unwrap the response envelope, keeping only the payload
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        request: &PendingRequest,
    ) -> Result<T, ClientError> {
        Ok(self.execute_envelope(request).await?.data)
    }

    /// Send a request whose payload is not needed, still honouring `success: false`
    pub async fn complete(&self, request: &PendingRequest) -> Result<(), ClientError> {
        self.execute_envelope::<serde_json::Value>(request).await?;
        Ok(())
    }

    /// Send a request and normalize the listing it returns
    pub async fn execute_page<T: DeserializeOwned>(
        &self,
        request: &PendingRequest,
    ) -> Result<Page<T>, ClientError> {
        envelope::decode_page(self.execute(request).await?)
    }

    /// Refresh the access token now
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SessionExpired`] after ending the session if the
    /// token cannot be refreshed.
    pub async fn refresh_session(&self) -> Result<String, ClientError> {
        let _gate = self.refresh_gate.lock().await;
        match self.refresh_locked().await {
            Ok(token) => Ok(token),
            Err(e) => {
                warn!("Token refresh failed: {e}");
                self.session.end(EndReason::RefreshFailed);
                Err(ClientError::SessionExpired)
            }
        }
    }

    /// Obtain a token to retry with after `sent_with` was rejected
    ///
    /// Refreshes are serialized. A caller that finds the stored token already
    /// replaced by another refresh reuses it instead of refreshing again.
    async fn recover(&self, sent_with: Option<&str>) -> Option<String> {
        let _gate = self.refresh_gate.lock().await;

        match (sent_with, self.session.access_token()) {
            (_, Some(current)) if Some(current.as_str()) != sent_with => {
                debug!("Access token already refreshed");
                return Some(current);
            }
            // Another request already ended the session
            (Some(_), None) => return None,
            _ => {}
        }

        match self.refresh_locked().await {
            Ok(token) => Some(token),
            Err(e) => {
                warn!("Token refresh failed, ending session: {e}");
                self.session.end(EndReason::RefreshFailed);
                None
            }
        }
    }

    async fn refresh_locked(&self) -> Result<String, ClientError> {
        let refresh_token = self
            .session
            .refresh_token()
            .ok_or(ClientError::SessionExpired)?;

        let grant = self
            .public
            .refresh_grant(&self.refresh_path, &refresh_token)
            .await?;

        let token = self.session.refresh(&grant)?.ok_or_else(|| {
            ClientError::UnexpectedResponse("refresh response carried no access token".into())
        })?;
        info!("Access token refreshed");
        Ok(token)
    }
}

/// Builder for ApiClient
#[derive(Default)]
pub struct ApiClientBuilder {
    base_url: Option<String>,
    session: Option<Session>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
    refresh_path: Option<String>,
}

impl ApiClientBuilder {
    /// Set the base URL
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the session whose credentials the client uses
    #[must_use]
    pub fn session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    /// Set the request timeout
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Override the refresh endpoint path
    #[must_use]
    pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = Some(path.into());
        self
    }

    /// Build the client
    pub fn build(self) -> Result<ApiClient, ClientError> {
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;
        let session = self
            .session
            .ok_or_else(|| ClientError::Configuration("session is required".into()))?;

        Ok(ApiClient {
            public: PublicApiClient::with_options(base_url, self.timeout, self.user_agent)?,
            session,
            refresh_path: self
                .refresh_path
                .unwrap_or_else(|| auth::REFRESH_PATH.to_string()),
            refresh_gate: Arc::new(Mutex::new(())),
        })
    }
}
