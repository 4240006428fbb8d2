//! Session ownership
//!
//! A [`Session`] is the single owner of persisted credentials for one front
//! end. Login, token refresh and teardown all go through it, and every
//! transition is broadcast to subscribers. Storage is the source of truth;
//! the handle only serializes access to it.

mod credentials;
mod storage;

pub use credentials::{AppProfile, Credentials, TokenGrant, UserProfile, UserRole, is_jwt_expired};
#[cfg(test)]
pub use storage::mock::MockCredentialStorage;
pub use storage::{CredentialStorage, FileStorage, MemoryStorage};

use crate::error::{CoreError, CoreResult};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

const EVENT_CAPACITY: usize = 16;

/// Session transitions broadcast to subscribers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn,
    Refreshed,
    /// Credentials are gone; the front end should return to its login screen
    Ended,
}

/// Why a session was ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    Logout,
    RefreshFailed,
    IdleTimeout,
}

impl std::fmt::Display for EndReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Logout => "logout",
            Self::RefreshFailed => "token refresh failed",
            Self::IdleTimeout => "idle timeout",
        })
    }
}

/// Storage keys for one profile
#[derive(Debug, Clone)]
struct StorageKeys {
    token: String,
    refresh_token: String,
    user: String,
}

impl StorageKeys {
    fn for_profile(profile: AppProfile) -> Self {
        let prefix = profile.storage_prefix();
        Self {
            token: format!("{prefix}_token"),
            refresh_token: format!("{prefix}_refresh_token"),
            user: format!("{prefix}_user"),
        }
    }

    fn all(&self) -> [&str; 3] {
        [&self.token, &self.refresh_token, &self.user]
    }
}

struct SessionInner {
    profile: AppProfile,
    keys: StorageKeys,
    storage: Mutex<Box<dyn CredentialStorage>>,
    events: broadcast::Sender<SessionEvent>,
}

/// Shared handle to the persisted session of one front end
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("profile", &self.inner.profile)
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(profile: AppProfile, storage: impl CredentialStorage + 'static) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(SessionInner {
                profile,
                keys: StorageKeys::for_profile(profile),
                storage: Mutex::new(Box::new(storage)),
                events,
            }),
        }
    }

    /// Session backed by process memory only
    pub fn in_memory(profile: AppProfile) -> Self {
        Self::new(profile, MemoryStorage::new())
    }

    pub fn profile(&self) -> AppProfile {
        self.inner.profile
    }

    /// Receive every subsequent session transition
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    fn storage(&self) -> MutexGuard<'_, Box<dyn CredentialStorage>> {
        self.inner
            .storage
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is not an error
        let _ = self.inner.events.send(event);
    }

    fn read(storage: &dyn CredentialStorage, key: &str) -> Option<String> {
        match storage.get_item(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                warn!(key, "Failed to read credential: {e}");
                None
            }
        }
    }

    fn read_user(storage: &dyn CredentialStorage, key: &str) -> Option<UserProfile> {
        let raw = Self::read(storage, key)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!("Stored user profile is unreadable: {e}");
                None
            }
        }
    }

    fn clear_locked(&self, storage: &dyn CredentialStorage) {
        for key in self.inner.keys.all() {
            if let Err(e) = storage.remove_item(key) {
                warn!(key, "Failed to remove credential: {e}");
            }
        }
    }

    /// Load whatever a previous run persisted
    ///
    /// A stored session is kept only if it has an access token and a readable
    /// user allowed by this profile; anything else is wiped. Returns whether a
    /// session was restored.
    pub fn init(&self) -> bool {
        let storage = self.storage();
        let token = Self::read(&**storage, &self.inner.keys.token);
        let user = Self::read_user(&**storage, &self.inner.keys.user);

        match (token, user) {
            (Some(_), Some(user)) if self.inner.profile.permits(&user) => {
                debug!(user_id = %user.id, "Restored stored session");
                true
            }
            (None, None) => false,
            _ => {
                info!("Discarding incomplete or unauthorized stored session");
                self.clear_locked(&**storage);
                false
            }
        }
    }

    /// Persist freshly issued credentials
    ///
    /// # Errors
    ///
    /// Returns an error if storage rejects a write; partial writes are rolled back.
    pub fn login(&self, credentials: &Credentials) -> CoreResult<()> {
        {
            let storage = self.storage();
            let user = serde_json::to_string(&credentials.user)?;
            let written = storage
                .set_item(&self.inner.keys.token, &credentials.access_token)
                .and_then(|()| {
                    storage.set_item(&self.inner.keys.refresh_token, &credentials.refresh_token)
                })
                .and_then(|()| storage.set_item(&self.inner.keys.user, &user));

            if let Err(e) = written {
                self.clear_locked(&**storage);
                return Err(e);
            }
        }

        info!(user_id = %credentials.user.id, "Session started");
        self.emit(SessionEvent::LoggedIn);
        Ok(())
    }

    /// Apply a refresh grant
    ///
    /// Writes the new access token, plus the rotated refresh token and user
    /// profile when the grant carries them. Returns the new access token, or
    /// `None` (writing nothing) if the grant has no usable access token.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::AccessRevoked`] (writing nothing) if the rotated
    /// user no longer passes the profile's access policy, or an error if
    /// storage rejects a write.
    pub fn refresh(&self, grant: &TokenGrant) -> CoreResult<Option<String>> {
        let Some(access_token) = grant.usable_access_token() else {
            return Ok(None);
        };
        if let Some(user) = grant.user.as_ref().filter(|u| !self.inner.profile.permits(u)) {
            warn!(user_id = %user.id, "Refreshed profile lost access");
            return Err(CoreError::AccessRevoked {
                message: format!("user {} is not permitted in this front end", user.id),
            });
        }

        {
            let storage = self.storage();
            storage.set_item(&self.inner.keys.token, access_token)?;
            if let Some(refresh_token) = grant.refresh_token.as_deref().filter(|t| !t.is_empty()) {
                storage.set_item(&self.inner.keys.refresh_token, refresh_token)?;
            }
            if let Some(user) = &grant.user {
                storage.set_item(&self.inner.keys.user, &serde_json::to_string(user)?)?;
            }
        }

        debug!("Access token refreshed");
        self.emit(SessionEvent::Refreshed);
        Ok(Some(access_token.to_string()))
    }

    /// Drop stored credentials without notifying subscribers
    ///
    /// Used before a fresh login attempt, where no session is being ended.
    pub fn clear(&self) {
        let storage = self.storage();
        self.clear_locked(&**storage);
    }

    /// Tear the session down and notify subscribers
    ///
    /// Credentials are removed before [`SessionEvent::Ended`] is sent, under
    /// the same lock, so no subscriber observes the signal alongside stale
    /// credentials. Storage failures are logged; teardown always completes.
    pub fn end(&self, reason: EndReason) {
        let storage = self.storage();
        self.clear_locked(&**storage);
        self.emit(SessionEvent::Ended);
        drop(storage);

        info!(%reason, "Session ended");
    }

    pub fn access_token(&self) -> Option<String> {
        let storage = self.storage();
        Self::read(&**storage, &self.inner.keys.token)
    }

    pub fn refresh_token(&self) -> Option<String> {
        let storage = self.storage();
        Self::read(&**storage, &self.inner.keys.refresh_token)
    }

    pub fn user(&self) -> Option<UserProfile> {
        let storage = self.storage();
        Self::read_user(&**storage, &self.inner.keys.user)
    }

    /// Full credentials if all three parts are stored
    pub fn credentials(&self) -> Option<Credentials> {
        let storage = self.storage();
        Some(Credentials {
            access_token: Self::read(&**storage, &self.inner.keys.token)?,
            refresh_token: Self::read(&**storage, &self.inner.keys.refresh_token)?,
            user: Self::read_user(&**storage, &self.inner.keys.user)?,
        })
    }

    /// Token and permitted user are present (the backend may still reject the token)
    pub fn is_authenticated(&self) -> bool {
        let storage = self.storage();
        Self::read(&**storage, &self.inner.keys.token).is_some()
            && Self::read_user(&**storage, &self.inner.keys.user)
                .is_some_and(|user| self.inner.profile.permits(&user))
    }

    pub fn authorization_header(&self) -> Option<String> {
        self.access_token().map(|token| format!("Bearer {token}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn admin() -> UserProfile {
        serde_json::from_value(json!({
            "id": "u1",
            "phoneNumber": "0700000000",
            "firstName": "Awa",
            "lastName": "Kone",
            "roles": ["SUPER_ADMIN"]
        }))
        .unwrap()
    }

    fn credentials(access: &str, refresh: &str) -> Credentials {
        Credentials {
            access_token: access.to_string(),
            refresh_token: refresh.to_string(),
            user: admin(),
        }
    }

    #[tokio::test]
    async fn test_login_persists_and_broadcasts() {
        let session = Session::in_memory(AppProfile::Admin);
        let mut events = session.subscribe();

        session.login(&credentials("A1", "R1")).unwrap();

        assert_eq!(events.recv().await.unwrap(), SessionEvent::LoggedIn);
        assert_eq!(session.access_token().as_deref(), Some("A1"));
        assert_eq!(session.refresh_token().as_deref(), Some("R1"));
        assert_eq!(session.authorization_header().as_deref(), Some("Bearer A1"));
        assert_eq!(session.credentials(), Some(credentials("A1", "R1")));
        assert!(session.is_authenticated());
    }

    #[tokio::test]
    async fn test_refresh_keeps_fields_the_grant_omits() {
        let session = Session::in_memory(AppProfile::Admin);
        session.login(&credentials("A1", "R1")).unwrap();

        let grant = TokenGrant {
            access_token: Some("A2".to_string()),
            ..TokenGrant::default()
        };
        assert_eq!(session.refresh(&grant).unwrap().as_deref(), Some("A2"));
        assert_eq!(session.access_token().as_deref(), Some("A2"));
        assert_eq!(session.refresh_token().as_deref(), Some("R1"));
        assert_eq!(session.user(), Some(admin()));

        let rotated = TokenGrant {
            access_token: Some("A3".to_string()),
            refresh_token: Some("R3".to_string()),
            ..TokenGrant::default()
        };
        session.refresh(&rotated).unwrap();
        assert_eq!(session.refresh_token().as_deref(), Some("R3"));
    }

    #[tokio::test]
    async fn test_refresh_without_token_writes_nothing() {
        let session = Session::in_memory(AppProfile::Admin);
        session.login(&credentials("A1", "R1")).unwrap();
        let mut events = session.subscribe();

        assert_eq!(session.refresh(&TokenGrant::default()).unwrap(), None);
        assert_eq!(session.access_token().as_deref(), Some("A1"));
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_refresh_refuses_demoted_user() {
        let session = Session::in_memory(AppProfile::Admin);
        session.login(&credentials("A1", "R1")).unwrap();
        let mut events = session.subscribe();

        let mut demoted = admin();
        demoted.roles = vec![UserRole::Client];
        let grant = TokenGrant {
            access_token: Some("A2".to_string()),
            refresh_token: Some("R2".to_string()),
            user: Some(demoted),
            ..TokenGrant::default()
        };

        assert!(matches!(
            session.refresh(&grant),
            Err(CoreError::AccessRevoked { .. })
        ));
        assert_eq!(session.credentials(), Some(credentials("A1", "R1")));
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_end_clears_before_signalling() {
        let session = Session::in_memory(AppProfile::Admin);
        session.login(&credentials("A1", "R1")).unwrap();
        let mut events = session.subscribe();

        let observer = session.clone();
        let seen = tokio::spawn(async move {
            let event = events.recv().await.unwrap();
            (event, observer.access_token(), observer.refresh_token(), observer.user())
        });

        session.end(EndReason::Logout);

        let (event, token, refresh, user) = seen.await.unwrap();
        assert_eq!(event, SessionEvent::Ended);
        assert_eq!(token, None);
        assert_eq!(refresh, None);
        assert_eq!(user, None);
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_clear_is_silent() {
        let session = Session::in_memory(AppProfile::Storefront);
        session.login(&credentials("A1", "R1")).unwrap();
        let mut events = session.subscribe();

        session.clear();

        assert_eq!(session.credentials(), None);
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_init_restores_valid_session() {
        let storage = MemoryStorage::new();
        storage.set_item("ecogaspi_admin_token", "A1").unwrap();
        storage
            .set_item("ecogaspi_admin_user", &serde_json::to_string(&admin()).unwrap())
            .unwrap();

        let session = Session::new(AppProfile::Admin, storage);
        assert!(session.init());
        assert_eq!(session.access_token().as_deref(), Some("A1"));
        assert_eq!(session.refresh_token(), None);
    }

    #[test]
    fn test_init_discards_unauthorized_user() {
        let storage = MemoryStorage::new();
        storage.set_item("ecogaspi_admin_token", "A1").unwrap();
        storage
            .set_item(
                "ecogaspi_admin_user",
                &json!({"id": "c1", "roles": ["CLIENT"]}).to_string(),
            )
            .unwrap();

        let session = Session::new(AppProfile::Admin, storage);
        assert!(!session.init());
        assert_eq!(session.access_token(), None);
    }

    #[test]
    fn test_init_discards_unreadable_user() {
        let storage = MemoryStorage::new();
        storage.set_item("ecogaspi_front_token", "A1").unwrap();
        storage.set_item("ecogaspi_front_user", "{broken").unwrap();

        let session = Session::new(AppProfile::Storefront, storage);
        assert!(!session.init());
        assert_eq!(session.access_token(), None);
    }

    #[test]
    fn test_profiles_use_separate_keys() {
        let storage = MemoryStorage::new();
        storage.set_item("ecogaspi_admin_token", "A1").unwrap();

        let session = Session::new(AppProfile::Storefront, storage);
        assert_eq!(session.access_token(), None);
    }

    #[test]
    fn test_failed_login_write_rolls_back() {
        let mut storage = MockCredentialStorage::new();
        storage.expect_set_item().returning(|key, _| {
            if key == "ecogaspi_admin_user" {
                Err(CoreError::storage_error("disk full"))
            } else {
                Ok(())
            }
        });
        storage.expect_remove_item().times(3).returning(|_| Ok(()));

        let session = Session::new(AppProfile::Admin, storage);
        let result = session.login(&credentials("A1", "R1"));
        assert!(matches!(result, Err(CoreError::Storage { .. })));
    }

    #[test]
    fn test_end_tolerates_storage_failures() {
        let mut storage = MockCredentialStorage::new();
        storage
            .expect_remove_item()
            .times(3)
            .returning(|_| Err(CoreError::storage_error("read-only")));

        let session = Session::new(AppProfile::Admin, storage);
        let mut events = session.subscribe();
        session.end(EndReason::RefreshFailed);
        assert_eq!(events.try_recv().unwrap(), SessionEvent::Ended);
    }
}
