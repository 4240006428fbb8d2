//! Bare API client without session handling

use super::ClientError;
use super::request::PendingRequest;
use reqwest::{Client, ClientBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

pub(crate) const DEFAULT_USER_AGENT: &str = concat!("ecogaspi-client/", env!("CARGO_PKG_VERSION"));

/// Client that sends requests exactly as given
///
/// It never looks at stored credentials and never retries, which makes it the
/// client for login and token refresh calls.
#[derive(Clone, Debug)]
pub struct PublicApiClient {
    client: Client,
    base_url: String,
}

impl PublicApiClient {
    /// Create a new public client
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_options(base_url, None, None)
    }

    pub(crate) fn with_options(
        base_url: impl Into<String>,
        timeout: Option<Duration>,
        user_agent: Option<String>,
    ) -> Result<Self, ClientError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ClientError::Configuration("base_url is required".into()));
        }

        let mut builder =
            ClientBuilder::new().user_agent(user_agent.unwrap_or_else(|| DEFAULT_USER_AGENT.into()));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an endpoint path
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send `request` once, with `bearer` as the access token if given
    ///
    /// Any HTTP status is returned as a response; only transport failures are errors.
    pub async fn dispatch(
        &self,
        request: &PendingRequest,
        bearer: Option<&str>,
    ) -> Result<Response, ClientError> {
        let url = self.url(request.path());
        let builder = request.to_builder(&self.client, &url, bearer)?;

        debug!(method = %request.method(), %url, authenticated = bearer.is_some(), "Sending request");
        let response = builder.send().await?;
        debug!(method = %request.method(), %url, status = %response.status(), "Received response");

        Ok(response)
    }

    /// Send `request` and decode a JSON body, mapping error statuses
    pub async fn execute<T: DeserializeOwned>(
        &self,
        request: &PendingRequest,
        bearer: Option<&str>,
    ) -> Result<T, ClientError> {
        let response = self.dispatch(request, bearer).await?;
        read_json(ensure_success(response).await?).await
    }
}

/// Turn a non-success response into the matching error
pub(crate) async fn ensure_success(response: Response) -> Result<Response, ClientError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(ClientError::from_response(response).await)
    }
}

/// Decode a JSON body; an empty body decodes as `null`
pub(crate) async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let bytes = response.bytes().await?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::from_value(serde_json::Value::Null)?);
    }
    Ok(serde_json::from_slice(&bytes)?)
}
