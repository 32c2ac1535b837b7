use tracing::debug;

use crate::{Contact, ContactId, ContactRepository, CoreError, NewContact};

/// Application service the HTTP handlers talk to.
///
/// Generic over the repository so the server can inject SQLite in
/// production and the in-memory adapter in tests.
pub struct ContactService<R: ContactRepository> {
    repo: R,
}

impl<R: ContactRepository> ContactService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// List every stored contact in storage order.
    pub fn list_all(&self) -> Result<Vec<Contact>, CoreError> {
        self.repo.list_all()
    }

    /// Fetch one contact, mapping absence to `CoreError::NotFound`.
    pub fn find(&self, id: ContactId) -> Result<Contact, CoreError> {
        self.repo.find_by_id(id)?.ok_or(CoreError::NotFound)
    }

    /// Store a new contact as-is and return its assigned id.
    pub fn create(&self, input: NewContact) -> Result<ContactId, CoreError> {
        self.repo.insert(input)
    }

    /// Replace the fields of an existing contact.
    ///
    /// Updating an id that matches no row succeeds without effect.
    pub fn update(&self, contact: &Contact) -> Result<(), CoreError> {
        let changed = self.repo.update(contact)?;
        if changed == 0 {
            debug!(id = %contact.id, "update matched no rows");
        }
        Ok(())
    }
}
