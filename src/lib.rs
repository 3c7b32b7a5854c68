pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{
    memory_store::InMemoryRecipientStore, storage::LocalStorage, whatsapp::WhatsAppClient,
};
pub use app::RelayApp;
pub use config::{ConfiguredCredentials, RelayConfig};
pub use core::{bulk::BulkCoordinator, dispatcher::MessageDispatcher};
pub use utils::error::{RelayError, Result};
