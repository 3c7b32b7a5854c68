use crate::core::resolver::normalize_phones;
use crate::domain::model::{ContactId, GroupId};
use crate::domain::ports::RecipientStore;
use crate::utils::error::{RelayError, Result};
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AddMembersReport {
    pub linked: usize,
    pub already_members: usize,
    pub created_contacts: usize,
}

/// Links contacts to a group by id and/or by phone.
///
/// Everything is checked before the first write: the group must exist, every
/// contact id must be known and every phone must be E.164. Phones without a
/// contact get one, named after the phone.
pub async fn add_members<S>(
    store: &S,
    group_id: GroupId,
    contact_ids: &[ContactId],
    phones: &[String],
) -> Result<AddMembersReport>
where
    S: RecipientStore + ?Sized,
{
    if contact_ids.is_empty() && phones.is_empty() {
        return Err(RelayError::validation(
            "contact_ids",
            "contact_ids or phones are required",
        ));
    }

    if store.get_group(group_id).await?.is_none() {
        return Err(RelayError::NotFound {
            entity: "group",
            id: group_id.to_string(),
        });
    }

    for id in contact_ids {
        if store.get_contact(*id).await?.is_none() {
            return Err(RelayError::NotFound {
                entity: "contact",
                id: id.to_string(),
            });
        }
    }

    let phones = normalize_phones(phones.iter().map(String::as_str))?;

    let mut report = AddMembersReport::default();
    let mut targets: Vec<ContactId> = contact_ids.to_vec();

    for phone in &phones {
        let (contact, created) = store.get_or_create_contact(phone.as_str(), phone).await?;
        if created {
            tracing::info!("Created contact {} for unknown phone {}", contact.id, phone);
            report.created_contacts += 1;
        }
        targets.push(contact.id);
    }

    targets.sort();
    targets.dedup();

    for contact_id in targets {
        if store.add_membership(group_id, contact_id).await? {
            report.linked += 1;
        } else {
            report.already_members += 1;
        }
    }

    Ok(report)
}
