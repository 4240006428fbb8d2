//! Ecogaspi client core: configuration, session state and idle detection

pub mod config;
pub mod error;
pub mod idle;
pub mod session;

pub use config::Settings;
pub use error::{CoreError, CoreResult};
pub use idle::{ActivityHub, ActivityKind, IdleTimer};
pub use session::{
    AppProfile, CredentialStorage, Credentials, EndReason, FileStorage, MemoryStorage, Session,
    SessionEvent, TokenGrant, UserProfile, UserRole,
};
