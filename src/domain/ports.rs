use crate::domain::model::{
    Contact, ContactId, Group, GroupId, MediaHandle, MediaUpload, Phone, ProviderCredentials,
    ProviderResponse, TemplateInfo, TenantId,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde_json::Value;

pub trait Storage: Send + Sync {
    /// `Ok(None)` when nothing has been written at `path` yet.
    fn read_file(
        &self,
        path: &str,
    ) -> impl std::future::Future<Output = Result<Option<Vec<u8>>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Contacts, groups and their membership relation.
///
/// Phone numbers are unique across contacts and group names are unique
/// across groups; membership is a set of `(group, contact)` pairs.
#[async_trait]
pub trait RecipientStore: Send + Sync {
    async fn add_contact(&self, name: &str, phone: &Phone) -> Result<Contact>;
    async fn get_contact(&self, id: ContactId) -> Result<Option<Contact>>;
    async fn find_contact_by_phone(&self, phone: &Phone) -> Result<Option<Contact>>;
    async fn list_contacts(&self) -> Result<Vec<Contact>>;

    async fn create_group(&self, name: &str) -> Result<Group>;
    async fn get_group(&self, id: GroupId) -> Result<Option<Group>>;
    async fn find_group_by_name(&self, name: &str) -> Result<Option<Group>>;
    async fn list_groups(&self) -> Result<Vec<Group>>;

    /// Returns `false` when the pair already existed.
    async fn add_membership(&self, group_id: GroupId, contact_id: ContactId) -> Result<bool>;
    /// Fails with `NotFound` for an unknown group.
    async fn list_members(&self, group_id: GroupId) -> Result<Vec<Contact>>;

    /// Looks the phone up and creates a contact named `name` when it is unknown.
    /// The flag is `true` when a contact was created.
    async fn get_or_create_contact(&self, name: &str, phone: &Phone) -> Result<(Contact, bool)> {
        if let Some(existing) = self.find_contact_by_phone(phone).await? {
            return Ok((existing, false));
        }
        Ok((self.add_contact(name, phone).await?, true))
    }

    async fn get_or_create_group(&self, name: &str) -> Result<(Group, bool)> {
        if let Some(existing) = self.find_group_by_name(name).await? {
            return Ok((existing, false));
        }
        Ok((self.create_group(name).await?, true))
    }
}

/// Outbound messaging platform.
#[async_trait]
pub trait MessagingProvider: Send + Sync {
    /// One outbound call; non-2xx answers surface as `ProviderError`.
    async fn send_message(
        &self,
        credentials: &ProviderCredentials,
        payload: &Value,
    ) -> Result<ProviderResponse>;

    async fn upload_media(
        &self,
        credentials: &ProviderCredentials,
        upload: MediaUpload,
    ) -> Result<MediaHandle>;

    async fn list_templates(&self, credentials: &ProviderCredentials) -> Result<Vec<TemplateInfo>>;
}

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Fails with `ConfigError` when the tenant has no usable credentials.
    async fn credentials_for(&self, tenant: &TenantId) -> Result<ProviderCredentials>;
}
