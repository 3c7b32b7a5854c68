use crate::domain::model::{GroupId, Phone, RecipientTarget};
use crate::domain::ports::RecipientStore;
use crate::utils::error::{RelayError, Result};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Normalizes every entry, failing with all offending entries at once.
pub fn normalize_phones<'a, I>(raw: I) -> Result<BTreeSet<Phone>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut phones = BTreeSet::new();
    let mut invalid = Vec::new();

    for entry in raw {
        match Phone::parse(entry) {
            Ok(phone) => {
                phones.insert(phone);
            }
            Err(_) => invalid.push(entry.to_string()),
        }
    }

    if !invalid.is_empty() {
        return Err(RelayError::InvalidPhoneNumbers { entries: invalid });
    }
    Ok(phones)
}

/// Turns explicit phones and/or a group reference into the set of recipients.
pub struct RecipientResolver<S: RecipientStore + ?Sized> {
    store: Arc<S>,
}

impl<S: RecipientStore + ?Sized> RecipientResolver<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Output is deduplicated and sorted by normalized phone.
    pub async fn resolve(&self, explicit: &[String], group_id: Option<GroupId>) -> Result<Vec<Phone>> {
        let mut raw: Vec<String> = explicit.to_vec();

        if let Some(group_id) = group_id {
            let members = self.store.list_members(group_id).await?;
            tracing::debug!("Group {} has {} members", group_id, members.len());
            raw.extend(members.into_iter().map(|c| String::from(c.phone)));
        }

        let phones = normalize_phones(raw.iter().map(String::as_str))?;
        if phones.is_empty() {
            return Err(RelayError::EmptyRecipients);
        }
        Ok(phones.into_iter().collect())
    }

    pub async fn resolve_target(&self, target: &RecipientTarget) -> Result<Vec<Phone>> {
        self.resolve(&target.phones, target.group_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_store::InMemoryRecipientStore;

    async fn store_with_group(phones: &[&str]) -> (Arc<InMemoryRecipientStore>, GroupId) {
        let store = Arc::new(InMemoryRecipientStore::new());
        let group = store.create_group("Team").await.unwrap();
        for (i, raw) in phones.iter().enumerate() {
            let contact = store
                .add_contact(&format!("Member {}", i), &Phone::parse(raw).unwrap())
                .await
                .unwrap();
            store.add_membership(group.id, contact.id).await.unwrap();
        }
        (store, group.id)
    }

    #[tokio::test]
    async fn test_group_and_explicit_phones_are_merged_and_deduplicated() {
        let (store, group_id) = store_with_group(&["+2", "+1"]).await;
        let resolver = RecipientResolver::new(store);

        let phones = resolver
            .resolve(&[" +1 ".to_string(), "+3".to_string()], Some(group_id))
            .await
            .unwrap();

        let rendered: Vec<&str> = phones.iter().map(Phone::as_str).collect();
        assert_eq!(rendered, vec!["+1", "+2", "+3"]);
    }

    #[tokio::test]
    async fn test_output_is_sorted_lexicographically() {
        let resolver = RecipientResolver::new(Arc::new(InMemoryRecipientStore::new()));
        let phones = resolver
            .resolve(
                &["+447000".to_string(), "+15550".to_string(), "+15550".to_string()],
                None,
            )
            .await
            .unwrap();
        let rendered: Vec<&str> = phones.iter().map(Phone::as_str).collect();
        assert_eq!(rendered, vec!["+15550", "+447000"]);
    }

    #[tokio::test]
    async fn test_malformed_phone_rejects_whole_request() {
        let resolver = RecipientResolver::new(Arc::new(InMemoryRecipientStore::new()));
        let err = resolver
            .resolve(
                &["+1555".to_string(), "+abc".to_string(), "0044 7".to_string()],
                None,
            )
            .await
            .unwrap_err();

        match err {
            RelayError::InvalidPhoneNumbers { entries } => {
                assert_eq!(entries, vec!["+abc".to_string(), "0044 7".to_string()])
            }
            other => panic!("expected invalid phone numbers, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_group_is_not_found() {
        let resolver = RecipientResolver::new(Arc::new(InMemoryRecipientStore::new()));
        let err = resolver.resolve(&[], Some(GroupId(9))).await.unwrap_err();
        assert!(matches!(err, RelayError::NotFound { entity: "group", .. }));
    }

    #[tokio::test]
    async fn test_empty_group_without_phones_is_empty_recipients() {
        let (store, group_id) = store_with_group(&[]).await;
        let resolver = RecipientResolver::new(store);
        let err = resolver.resolve(&[], Some(group_id)).await.unwrap_err();
        assert!(matches!(err, RelayError::EmptyRecipients));
    }

    #[tokio::test]
    async fn test_every_resolved_phone_is_e164() {
        let (store, group_id) = store_with_group(&["+10", "+20", "+30"]).await;
        let resolver = RecipientResolver::new(store);
        let phones = resolver
            .resolve(&["+20".to_string(), " +40".to_string()], Some(group_id))
            .await
            .unwrap();

        let pattern = regex::Regex::new(r"^\+[0-9]+$").unwrap();
        let unique: BTreeSet<&Phone> = phones.iter().collect();
        assert_eq!(unique.len(), phones.len());
        assert!(phones.iter().all(|p| pattern.is_match(p.as_str())));
        assert_eq!(phones.len(), 4);
    }
}
