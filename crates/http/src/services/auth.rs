//! Login, logout and token management

use crate::client::auth::ME_PATH;
use crate::client::request::PendingRequest;
use crate::client::{ApiClient, error::ClientError};
use crate::types::LoginRequest;
use ecogaspi_core::{Credentials, EndReason, Session, UserProfile};
use tracing::{info, warn};

#[derive(Clone, Debug)]
pub struct AuthService {
    client: ApiClient,
}

impl AuthService {
    pub const fn new(client: ApiClient) -> Self {
        Self { client }
    }

    fn session(&self) -> &Session {
        self.client.session()
    }

    /// Log in and persist the resulting session
    ///
    /// Any stored session is dropped first. Users the profile does not admit
    /// are refused with [`ClientError::AccessDenied`] and nothing is stored.
    pub async fn login(
        &self,
        phone_number: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Credentials, ClientError> {
        self.session().clear();

        let grant = self
            .client
            .public()
            .login(&LoginRequest {
                phone_number: phone_number.into(),
                password: password.into(),
            })
            .await?;
        let credentials = grant.into_credentials().ok_or_else(|| {
            ClientError::UnexpectedResponse("login response is missing tokens or user".into())
        })?;

        let profile = self.session().profile();
        if !profile.permits(&credentials.user) {
            warn!(user_id = %credentials.user.id, ?profile, "Login refused by access policy");
            return Err(ClientError::AccessDenied(format!(
                "{} may not use the {profile:?} application",
                credentials.user.display_name()
            )));
        }

        self.session().login(&credentials)?;
        info!(user_id = %credentials.user.id, "Logged in");
        Ok(credentials)
    }

    /// Refresh the access token now
    pub async fn refresh(&self) -> Result<String, ClientError> {
        self.client.refresh_session().await
    }

    /// Log out; the local session always ends even if the backend call fails
    pub async fn logout(&self) {
        if let Some(token) = self.session().access_token() {
            if let Err(e) = self.client.public().logout(&token).await {
                warn!("Backend logout failed, ending session locally: {e}");
            }
        }
        self.session().end(EndReason::Logout);
    }

    /// Profile of the logged-in user as the backend sees it
    pub async fn me(&self) -> Result<UserProfile, ClientError> {
        self.client.fetch(&PendingRequest::get(ME_PATH)).await
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        self.session().user()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session().is_authenticated()
    }
}
