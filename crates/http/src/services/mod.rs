//! Resource services wrapping the session-aware client

pub mod annonces;
pub mod auth;
pub mod categories;
pub mod merchants;
pub mod products;
pub mod uploads;

pub use annonces::AnnonceService;
pub use auth::AuthService;
pub use categories::BusinessCategoryService;
pub use merchants::MerchantService;
pub use products::ProductService;
pub use uploads::UploadService;
