//! Backoffice API: gateway, entity services and the cached facade.

pub mod api_types;
pub mod cache;
pub mod cached_client;
pub mod client;
pub mod params;
pub mod services;
pub mod types;

pub use cache::Resource;
pub use cached_client::Backoffice;
pub use client::ApiClient;
pub use services::{ReceiptAction, Services};
