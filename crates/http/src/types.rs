//! Request and response types for the Ecogaspi API

use crate::client::request::PendingRequest;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

// Authentication

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub phone_number: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

// Merchants

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Kind of business a merchant runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MerchantKind {
    Boutique,
    Depot,
    Grossiste,
    Industriel,
    #[serde(untagged)]
    Other(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Merchant {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub name: String,
    pub store_name: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rccm: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patente: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant_card: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_photo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<MerchantKind>,
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        })
    }
}

/// Filters for the merchant listing; unset fields are not sent
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MerchantListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub status: Option<String>,
    pub verified: Option<bool>,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
}

impl MerchantListParams {
    pub(crate) fn apply(&self, request: PendingRequest) -> PendingRequest {
        request
            .query_opt("page", self.page)
            .query_opt("limit", self.limit)
            .query_opt("search", self.search.as_deref())
            .query_opt("status", self.status.as_deref())
            .query_opt("verified", self.verified)
            .query_opt("sortBy", self.sort_by.as_deref())
            .query_opt("sortOrder", self.sort_order)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MerchantList {
    pub merchants: Vec<Merchant>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MerchantStats {
    pub total: u64,
    pub active: u64,
    pub verified: u64,
    pub pending: u64,
    pub suspended: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuspendRequest {
    pub reason: Option<String>,
}

// Products

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductCondition {
    Parfait,
    PresqueExpire,
    RotationLente,
    #[serde(untagged)]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Active,
    Sold,
    Expired,
    Draft,
    #[serde(untagged)]
    Other(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Product {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(deserialize_with = "id_string")]
    pub merchant_id: String,
    pub name: String,
    pub category: String,
    pub quantity: f64,
    pub unit: String,
    pub unit_price: f64,
    pub lot_price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<String>,
    pub photos: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<ProductCondition>,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProductStatus>,
    pub views: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Filter value meaning "no filter"
pub const ALL: &str = "all";

/// Product listing query, with pages numbered from 1
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductQuery {
    pub page: u32,
    pub size: u32,
    pub search: Option<String>,
    pub category: Option<String>,
    /// `active`, `inactive` or `all`
    pub status: Option<String>,
    pub condition: Option<String>,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            page: 1,
            size: 10,
            search: None,
            category: None,
            status: None,
            condition: None,
        }
    }
}

impl ProductQuery {
    /// Listing request; a search term switches to the search endpoint
    pub(crate) fn to_request(&self) -> PendingRequest {
        let search = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let request = match search {
            Some(_) => PendingRequest::get("products/search"),
            None => PendingRequest::get("products"),
        };

        request
            .query("page", self.page.saturating_sub(1))
            .query("size", self.size)
            .query_opt("query", search)
            .query_opt("category", filter(self.category.as_deref()))
            .query_opt(
                "isActive",
                filter(self.status.as_deref()).map(|status| status == "active"),
            )
            .query_opt("condition", filter(self.condition.as_deref()))
    }
}

fn filter(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty() && *v != ALL)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCategory {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
}

// Announcements

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationStatus {
    Pending,
    Approved,
    Rejected,
    Suspended,
    Active,
    Inactive,
}

/// Moderation queues of the announcement back-office
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnonceQueue {
    Pending,
    Approved,
    Rejected,
    Suspended,
}

impl AnnonceQueue {
    pub const fn path_segment(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Suspended => "suspended",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annonce {
    pub id: i64,
    #[serde(default)]
    pub business_id: i64,
    #[serde(default)]
    pub product_id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub unit_price: f64,
    #[serde(default)]
    pub bulk_price: f64,
    #[serde(default)]
    pub unit: String,
    pub validation_status: ValidationStatus,
    #[serde(default)]
    pub validation_comment: Option<String>,
    #[serde(default)]
    pub validated_by: Option<i64>,
    #[serde(default)]
    pub validated_at: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub expires_at: Option<String>,
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Moderator decision sent with approve, reject and suspend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRequest {
    pub validator_id: String,
    pub validator_name: String,
    pub comment: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationHistory {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(deserialize_with = "id_string")]
    pub annonce_id: String,
    pub action: ValidationStatus,
    #[serde(default, deserialize_with = "id_string")]
    pub validator_id: String,
    #[serde(default)]
    pub validator_name: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub timestamp: String,
}

/// Moderation queue sizes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ValidationCounts")]
pub struct ValidationStats {
    pub pending: u64,
    pub approved: u64,
    pub rejected: u64,
    pub suspended: u64,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct ValidationCounts {
    pending_count: Option<u64>,
    approved_count: Option<u64>,
    rejected_count: Option<u64>,
    suspended_count: Option<u64>,
}

impl From<ValidationCounts> for ValidationStats {
    fn from(counts: ValidationCounts) -> Self {
        Self {
            pending: counts.pending_count.unwrap_or(0),
            approved: counts.approved_count.unwrap_or(0),
            rejected: counts.rejected_count.unwrap_or(0),
            suspended: counts.suspended_count.unwrap_or(0),
        }
    }
}

// Business categories

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessCategory {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessCategoryRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// Uploads

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Image,
    Document,
    Avatar,
}

impl UploadKind {
    pub const fn path(self) -> &'static str {
        match self {
            Self::Image => "upload/image",
            Self::Document => "upload/document",
            Self::Avatar => "upload/avatar",
        }
    }
}

/// Identifiers arrive as strings or numbers depending on the endpoint
fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or number id, got {other}"
        ))),
    }
}
