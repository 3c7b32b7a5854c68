use crate::domain::model::{Contact, ContactId, Group, GroupId, Phone};
use crate::domain::ports::{RecipientStore, Storage};
use crate::utils::error::{RelayError, Result};
use crate::utils::validation::validate_non_empty_string;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Membership {
    pub group_id: GroupId,
    pub contact_id: ContactId,
}

/// Serialized form of the whole store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub next_contact_id: u64,
    pub next_group_id: u64,
    pub contacts: Vec<Contact>,
    pub groups: Vec<Group>,
    pub memberships: Vec<Membership>,
}

#[derive(Debug, Default)]
struct StoreState {
    next_contact_id: u64,
    next_group_id: u64,
    contacts: BTreeMap<ContactId, Contact>,
    phone_index: HashMap<Phone, ContactId>,
    groups: BTreeMap<GroupId, Group>,
    name_index: HashMap<String, GroupId>,
    memberships: BTreeSet<(GroupId, ContactId)>,
}

impl StoreState {
    fn insert_contact(&mut self, contact: Contact) -> Result<()> {
        if self.phone_index.contains_key(&contact.phone) {
            return Err(RelayError::Conflict {
                entity: "contact",
                key: contact.phone.to_string(),
            });
        }
        self.phone_index.insert(contact.phone.clone(), contact.id);
        self.next_contact_id = self.next_contact_id.max(contact.id.0);
        self.contacts.insert(contact.id, contact);
        Ok(())
    }

    fn insert_group(&mut self, group: Group) -> Result<()> {
        if self.name_index.contains_key(&group.name) {
            return Err(RelayError::Conflict {
                entity: "group",
                key: group.name,
            });
        }
        self.name_index.insert(group.name.clone(), group.id);
        self.next_group_id = self.next_group_id.max(group.id.0);
        self.groups.insert(group.id, group);
        Ok(())
    }
}

/// Recipient store held in memory behind a read/write lock.
///
/// Reads run concurrently, writes are serialized. Persistence is explicit:
/// [`InMemoryRecipientStore::load`] and [`InMemoryRecipientStore::save`] move
/// a JSON [`StoreSnapshot`] through a [`Storage`] backend.
#[derive(Debug, Default)]
pub struct InMemoryRecipientStore {
    state: RwLock<StoreState>,
}

impl InMemoryRecipientStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the indexes and rejects snapshots that break the uniqueness rules.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Result<Self> {
        let mut state = StoreState::default();

        for contact in snapshot.contacts {
            state.insert_contact(contact)?;
        }
        for group in snapshot.groups {
            state.insert_group(group)?;
        }
        for m in snapshot.memberships {
            if !state.groups.contains_key(&m.group_id) {
                return Err(RelayError::NotFound {
                    entity: "group",
                    id: m.group_id.to_string(),
                });
            }
            if !state.contacts.contains_key(&m.contact_id) {
                return Err(RelayError::NotFound {
                    entity: "contact",
                    id: m.contact_id.to_string(),
                });
            }
            state.memberships.insert((m.group_id, m.contact_id));
        }

        state.next_contact_id = state.next_contact_id.max(snapshot.next_contact_id);
        state.next_group_id = state.next_group_id.max(snapshot.next_group_id);

        Ok(Self {
            state: RwLock::new(state),
        })
    }

    pub async fn snapshot(&self) -> StoreSnapshot {
        let state = self.state.read().await;
        StoreSnapshot {
            next_contact_id: state.next_contact_id,
            next_group_id: state.next_group_id,
            contacts: state.contacts.values().cloned().collect(),
            groups: state.groups.values().cloned().collect(),
            memberships: state
                .memberships
                .iter()
                .map(|(group_id, contact_id)| Membership {
                    group_id: *group_id,
                    contact_id: *contact_id,
                })
                .collect(),
        }
    }

    /// An absent snapshot yields an empty store.
    pub async fn load<S: Storage>(storage: &S, path: &str) -> Result<Self> {
        match storage.read_file(path).await? {
            Some(bytes) => {
                let snapshot: StoreSnapshot = serde_json::from_slice(&bytes)?;
                tracing::debug!(
                    "Loaded store snapshot from {}: {} contacts, {} groups, {} memberships",
                    path,
                    snapshot.contacts.len(),
                    snapshot.groups.len(),
                    snapshot.memberships.len()
                );
                Self::from_snapshot(snapshot)
            }
            None => {
                tracing::debug!("No store snapshot at {}, starting empty", path);
                Ok(Self::new())
            }
        }
    }

    pub async fn save<S: Storage>(&self, storage: &S, path: &str) -> Result<()> {
        let snapshot = self.snapshot().await;
        let data = serde_json::to_vec_pretty(&snapshot)?;
        storage.write_file(path, &data).await?;
        tracing::debug!("Saved store snapshot ({} bytes) to {}", data.len(), path);
        Ok(())
    }
}

#[async_trait]
impl RecipientStore for InMemoryRecipientStore {
    async fn add_contact(&self, name: &str, phone: &Phone) -> Result<Contact> {
        let name = validate_non_empty_string("name", name)?;
        let mut state = self.state.write().await;

        let contact = Contact {
            id: ContactId(state.next_contact_id + 1),
            name: name.to_string(),
            phone: phone.clone(),
        };
        state.insert_contact(contact.clone())?;
        Ok(contact)
    }

    async fn get_contact(&self, id: ContactId) -> Result<Option<Contact>> {
        Ok(self.state.read().await.contacts.get(&id).cloned())
    }

    async fn find_contact_by_phone(&self, phone: &Phone) -> Result<Option<Contact>> {
        let state = self.state.read().await;
        Ok(state
            .phone_index
            .get(phone)
            .and_then(|id| state.contacts.get(id))
            .cloned())
    }

    async fn list_contacts(&self) -> Result<Vec<Contact>> {
        Ok(self.state.read().await.contacts.values().cloned().collect())
    }

    async fn create_group(&self, name: &str) -> Result<Group> {
        let name = validate_non_empty_string("name", name)?;
        let mut state = self.state.write().await;

        let group = Group {
            id: GroupId(state.next_group_id + 1),
            name: name.to_string(),
        };
        state.insert_group(group.clone())?;
        Ok(group)
    }

    async fn get_group(&self, id: GroupId) -> Result<Option<Group>> {
        Ok(self.state.read().await.groups.get(&id).cloned())
    }

    async fn find_group_by_name(&self, name: &str) -> Result<Option<Group>> {
        let state = self.state.read().await;
        Ok(state
            .name_index
            .get(name.trim())
            .and_then(|id| state.groups.get(id))
            .cloned())
    }

    async fn list_groups(&self) -> Result<Vec<Group>> {
        Ok(self.state.read().await.groups.values().cloned().collect())
    }

    async fn add_membership(&self, group_id: GroupId, contact_id: ContactId) -> Result<bool> {
        let mut state = self.state.write().await;
        if !state.groups.contains_key(&group_id) {
            return Err(RelayError::NotFound {
                entity: "group",
                id: group_id.to_string(),
            });
        }
        if !state.contacts.contains_key(&contact_id) {
            return Err(RelayError::NotFound {
                entity: "contact",
                id: contact_id.to_string(),
            });
        }
        Ok(state.memberships.insert((group_id, contact_id)))
    }

    async fn list_members(&self, group_id: GroupId) -> Result<Vec<Contact>> {
        let state = self.state.read().await;
        if !state.groups.contains_key(&group_id) {
            return Err(RelayError::NotFound {
                entity: "group",
                id: group_id.to_string(),
            });
        }
        Ok(state
            .memberships
            .range((group_id, ContactId(0))..=(group_id, ContactId(u64::MAX)))
            .filter_map(|(_, contact_id)| state.contacts.get(contact_id).cloned())
            .collect())
    }
}
