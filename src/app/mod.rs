use crate::adapters::memory_store::InMemoryRecipientStore;
use crate::adapters::storage::LocalStorage;
use crate::adapters::whatsapp::WhatsAppClient;
use crate::config::credentials::ConfiguredCredentials;
use crate::config::toml_config::RelayConfig;
use crate::core::bulk::BulkCoordinator;
use crate::core::dispatcher::MessageDispatcher;
use crate::domain::model::MediaUpload;
use crate::utils::error::{RelayError, Result};
use std::path::Path;
use std::sync::Arc;

pub type Dispatcher = MessageDispatcher<WhatsAppClient, ConfiguredCredentials>;
pub type Coordinator = BulkCoordinator<InMemoryRecipientStore, WhatsAppClient, ConfiguredCredentials>;

/// Everything a command needs, built once from configuration.
pub struct RelayApp {
    pub store: Arc<InMemoryRecipientStore>,
    pub dispatcher: Arc<Dispatcher>,
    pub coordinator: Coordinator,
    storage: LocalStorage,
    store_file: String,
}

impl RelayApp {
    pub async fn open(config: &RelayConfig) -> Result<Self> {
        let (storage, store_file) = split_store_path(&config.store.path)?;
        let store = Arc::new(InMemoryRecipientStore::load(&storage, &store_file).await?);

        let provider = Arc::new(WhatsAppClient::new(config.whatsapp_settings()));
        let credentials = Arc::new(ConfiguredCredentials::from_config(config));
        tracing::debug!("{} credential set(s) configured", credentials.tenant_count());

        let dispatcher = Arc::new(MessageDispatcher::new(provider, credentials));
        let coordinator = BulkCoordinator::new(Arc::clone(&store), Arc::clone(&dispatcher))
            .with_concurrency(config.bulk.concurrency)
            .with_sample_size(config.bulk.sample_size);

        Ok(Self {
            store,
            dispatcher,
            coordinator,
            storage,
            store_file,
        })
    }

    /// Persists the recipient store snapshot.
    pub async fn save(&self) -> Result<()> {
        self.store.save(&self.storage, &self.store_file).await
    }
}

fn split_store_path(path: &str) -> Result<(LocalStorage, String)> {
    let path = Path::new(path);
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| RelayError::validation("store.path", "must name a file"))?
        .to_string();
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    Ok((LocalStorage::new(dir), file_name))
}

/// Reads a local file into an upload, guessing the MIME type from its extension.
pub fn media_upload_from_path(path: &Path) -> Result<MediaUpload> {
    let bytes = std::fs::read(path)?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| RelayError::validation("file", "must name a file"))?
        .to_string();

    Ok(MediaUpload {
        file_name,
        mime_type: mime_guess::from_path(path).first_or_octet_stream().to_string(),
        bytes,
    })
}
