//! Credential and user profile types

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Deserializer, Serialize};

/// Roles issued by the backend
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    SuperAdmin,
    AdminShop,
    Vendeur,
    Client,
    #[serde(untagged)]
    Other(String),
}

/// Authenticated user as returned by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub roles: Vec<UserRole>,
    #[serde(
        default,
        deserialize_with = "optional_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub business_id: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image_url: Option<String>,
}

impl UserProfile {
    pub fn has_role(&self, role: &UserRole) -> bool {
        self.roles.contains(role)
    }

    pub fn is_super_admin(&self) -> bool {
        self.has_role(&UserRole::SuperAdmin)
    }

    /// Super admins and shop admins may use the back-office
    pub fn is_admin(&self) -> bool {
        self.is_super_admin() || self.has_role(&UserRole::AdminShop)
    }

    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        let name = name.trim();
        if name.is_empty() {
            self.phone_number.clone()
        } else {
            name.to_string()
        }
    }
}

/// Front end a session belongs to
///
/// Each profile persists its credentials under its own key prefix and applies
/// its own access policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppProfile {
    /// Back-office, restricted to administrators
    Admin,
    /// Consumer marketplace, open to every role
    Storefront,
}

impl AppProfile {
    pub const fn storage_prefix(self) -> &'static str {
        match self {
            Self::Admin => "ecogaspi_admin",
            Self::Storefront => "ecogaspi_front",
        }
    }

    /// Whether `user` may hold a session in this front end
    pub fn permits(self, user: &UserProfile) -> bool {
        match self {
            Self::Admin => user.is_admin(),
            Self::Storefront => true,
        }
    }
}

/// Everything persisted for an authenticated session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserProfile,
}

impl Credentials {
    /// Advisory check of the access token's `exp` claim
    ///
    /// Only the backend decides whether a token is valid; this is used to
    /// report status, never to skip a request.
    pub fn is_access_token_expired(&self) -> bool {
        is_jwt_expired(&self.access_token, chrono::Utc::now().timestamp())
    }
}

/// Token payload returned by the login and refresh endpoints
///
/// Refresh responses may omit the rotated refresh token and the user
/// profile; absent fields keep their stored values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenGrant {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub user: Option<UserProfile>,
}

impl TokenGrant {
    /// Access token if present and non-empty
    pub fn usable_access_token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|t| !t.is_empty())
    }

    /// Full credentials, when the grant carries all three parts
    pub fn into_credentials(self) -> Option<Credentials> {
        let access_token = self.access_token.filter(|t| !t.is_empty())?;
        let refresh_token = self.refresh_token.filter(|t| !t.is_empty())?;
        Some(Credentials {
            access_token,
            refresh_token,
            user: self.user?,
        })
    }
}

/// Whether a JWT's `exp` claim lies before `now` (seconds since the epoch)
///
/// Tokens that are not decodable JWTs, or carry no `exp`, count as expired.
pub fn is_jwt_expired(token: &str, now: i64) -> bool {
    let Some(payload) = token.split('.').nth(1) else {
        return true;
    };
    let Ok(bytes) = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')) else {
        return true;
    };
    let Ok(claims) = serde_json::from_slice::<serde_json::Value>(&bytes) else {
        return true;
    };
    claims
        .get("exp")
        .and_then(serde_json::Value::as_i64)
        .is_none_or(|exp| exp < now)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(serde_json::Number),
}

impl From<StringOrNumber> for String {
    fn from(value: StringOrNumber) -> Self {
        match value {
            StringOrNumber::String(s) => s,
            StringOrNumber::Number(n) => n.to_string(),
        }
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    StringOrNumber::deserialize(deserializer).map(Into::into)
}

fn optional_string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Option::<StringOrNumber>::deserialize(deserializer).map(|v| v.map(Into::into))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn jwt_with(claims: &serde_json::Value) -> String {
        format!(
            "eyJhbGciOiJIUzI1NiJ9.{}.signature",
            URL_SAFE_NO_PAD.encode(claims.to_string())
        )
    }

    #[test]
    fn test_profile_accepts_numeric_ids_and_unknown_roles() {
        let user: UserProfile = serde_json::from_value(json!({
            "id": 17,
            "phoneNumber": "+2250700000000",
            "firstName": "Awa",
            "lastName": "Kone",
            "roles": ["ADMIN_SHOP", "AUDITOR"],
            "businessId": 4,
            "isVerified": true
        }))
        .unwrap();

        assert_eq!(user.id, "17");
        assert_eq!(user.business_id.as_deref(), Some("4"));
        assert_eq!(
            user.roles,
            vec![UserRole::AdminShop, UserRole::Other("AUDITOR".to_string())]
        );
        assert!(user.is_admin());
        assert!(!user.is_super_admin());
        assert_eq!(user.display_name(), "Awa Kone");
    }

    #[test]
    fn test_profile_access_policy() {
        let client: UserProfile = serde_json::from_value(json!({
            "id": "u1",
            "phoneNumber": "0102030405",
            "roles": ["CLIENT"]
        }))
        .unwrap();

        assert!(!AppProfile::Admin.permits(&client));
        assert!(AppProfile::Storefront.permits(&client));
        assert_eq!(client.display_name(), "0102030405");
    }

    #[test]
    fn test_grant_into_credentials_requires_all_parts() {
        let grant: TokenGrant = serde_json::from_value(json!({
            "accessToken": "A1",
            "refreshToken": "R1",
            "tokenType": "Bearer",
            "expiresIn": 3600,
            "user": {"id": "u1", "roles": ["SUPER_ADMIN"]}
        }))
        .unwrap();
        let credentials = grant.into_credentials().unwrap();
        assert_eq!(credentials.access_token, "A1");
        assert_eq!(credentials.refresh_token, "R1");

        let partial: TokenGrant = serde_json::from_value(json!({"accessToken": "A2"})).unwrap();
        assert_eq!(partial.usable_access_token(), Some("A2"));
        assert!(partial.into_credentials().is_none());

        let empty: TokenGrant = serde_json::from_value(json!({"accessToken": ""})).unwrap();
        assert_eq!(empty.usable_access_token(), None);
    }

    #[test]
    fn test_jwt_expiry() {
        let now = 1_700_000_000;
        assert!(!is_jwt_expired(&jwt_with(&json!({"exp": now + 60})), now));
        assert!(is_jwt_expired(&jwt_with(&json!({"exp": now - 60})), now));
        assert!(is_jwt_expired(&jwt_with(&json!({"sub": "u1"})), now));
        assert!(is_jwt_expired("opaque-token", now));
        assert!(is_jwt_expired("a.%%%.c", now));
    }
}
