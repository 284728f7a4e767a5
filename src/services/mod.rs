// src/services/mod.rs
pub mod api_client;
pub mod catalog;
pub mod flow_registry;
pub mod mock_data;
pub mod photo_validator;
pub mod progress;
pub mod session;
#[cfg(test)]
pub mod stub_backend;

pub use api_client::ApiClient;
pub use flow_registry::FlowRegistry;
pub use photo_validator::PhotoValidator;
