use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::{Contact, ContactId, ContactRepository, CoreError, NewContact};

/// Simple in-memory repository for tests and storage-less local runs.
///
/// Ids start at 1 and are never reused, mirroring an autoincrement column.
pub struct InMemoryRepo {
    inner: Mutex<Inner>,
}

struct Inner {
    rows: BTreeMap<ContactId, Contact>,
    next_id: i64,
}

impl InMemoryRepo {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                rows: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }
}

impl Default for InMemoryRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl ContactRepository for InMemoryRepo {
    fn list_all(&self) -> Result<Vec<Contact>, CoreError> {
        let inner = self
            .inner
            .lock()
            .map_err(|_| CoreError::Query("mutex poisoned".into()))?;
        Ok(inner.rows.values().cloned().collect())
    }

    fn find_by_id(&self, id: ContactId) -> Result<Option<Contact>, CoreError> {
        let inner = self
            .inner
            .lock()
            .map_err(|_| CoreError::Query("mutex poisoned".into()))?;
        Ok(inner.rows.get(&id).cloned())
    }

    fn insert(&self, contact: NewContact) -> Result<ContactId, CoreError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| CoreError::Write("mutex poisoned".into()))?;
        let id = ContactId::new(inner.next_id);
        inner.next_id += 1;
        inner.rows.insert(id, Contact::from_new(id, contact));
        Ok(id)
    }

    fn update(&self, contact: &Contact) -> Result<usize, CoreError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| CoreError::Write("mutex poisoned".into()))?;
        match inner.rows.get_mut(&contact.id) {
            Some(row) => {
                row.name = contact.name.clone();
                row.phone = contact.phone.clone();
                row.email = contact.email.clone();
                Ok(1)
            }
            None => Ok(0),
        }
    }
}
