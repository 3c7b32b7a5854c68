pub mod bulk;
pub mod dispatcher;
pub mod membership;
pub mod preview;
pub mod request;
pub mod resolver;

pub use crate::domain::model::{
    Contact, ContactId, Group, GroupId, MediaKind, Phone, RecipientTarget, SendPayload,
    SendRequest, TenantId,
};
pub use crate::domain::ports::{CredentialProvider, MessagingProvider, RecipientStore, Storage};
pub use crate::utils::error::Result;
