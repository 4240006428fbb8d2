//! Token endpoint calls
//!
//! These go through [`PublicApiClient`] so that a rejected login or refresh
//! never re-enters the refresh path.

use super::request::PendingRequest;
use super::typed::{PublicApiClient, ensure_success, read_json};
use super::ClientError;
use crate::envelope;
use crate::types::{LoginRequest, RefreshRequest};
use ecogaspi_core::TokenGrant;
use serde_json::Value;

pub const LOGIN_PATH: &str = "/auth/login";
pub const REFRESH_PATH: &str = "/auth/refresh";
pub const LOGOUT_PATH: &str = "/auth/logout";
pub const ME_PATH: &str = "/auth/me";

impl PublicApiClient {
    /// Exchange a phone number and password for tokens
    pub async fn login(&self, request: &LoginRequest) -> Result<TokenGrant, ClientError> {
        let req = PendingRequest::post(LOGIN_PATH).json(request)?;
        self.token_grant(&req).await
    }

    /// Exchange a refresh token for a new access token
    pub async fn refresh_grant(
        &self,
        path: &str,
        refresh_token: &str,
    ) -> Result<TokenGrant, ClientError> {
        let req = PendingRequest::post(path).json(&RefreshRequest {
            refresh_token: refresh_token.to_string(),
        })?;
        self.token_grant(&req).await
    }

    /// Tell the backend the access token is no longer in use
    pub async fn logout(&self, access_token: &str) -> Result<(), ClientError> {
        let response = self
            .dispatch(&PendingRequest::post(LOGOUT_PATH), Some(access_token))
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn token_grant(&self, request: &PendingRequest) -> Result<TokenGrant, ClientError> {
        let response = ensure_success(self.dispatch(request, None).await?).await?;
        let body: Value = read_json(response).await?;
        Ok(envelope::decode::<TokenGrant>(body)?.data)
    }
}
