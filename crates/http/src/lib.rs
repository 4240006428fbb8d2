//! Ecogaspi HTTP client
//!
//! A session-aware REST client that injects the stored access token, renews
//! it once on `401 Unauthorized`, and ends the session when renewal fails,
//! plus thin services over the marketplace resources.

pub mod client;
pub mod envelope;
pub mod services;
pub mod types;

pub use client::error::ClientError;
pub use client::request::{FilePart, PendingRequest, RequestBody};
pub use client::typed::PublicApiClient;
pub use client::{ApiClient, ApiClientBuilder};
pub use envelope::{ApiResponse, Page};
pub use services::{
    AnnonceService, AuthService, BusinessCategoryService, MerchantService, ProductService,
    UploadService,
};
