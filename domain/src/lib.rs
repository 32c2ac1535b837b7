//! Domain library for the phonebook.
//!
//! Holds the contact types, the repository port (trait), and the error
//! definitions shared by the adapters and the web server. Keep adapters and
//! IO concerns out of this crate.

use std::fmt::{Display, Formatter};

use thiserror::Error;

/// Storage-assigned identifier of a persisted contact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContactId(i64);

impl ContactId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl Display for ContactId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Input data for creating a contact. No identifier until storage assigns one.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct NewContact {
    pub name: String,
    pub phone: String,
    pub email: String,
}

impl NewContact {
    pub fn new(
        name: impl Into<String>,
        phone: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            phone: phone.into(),
            email: email.into(),
        }
    }
}

/// Persisted contact record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Contact {
    pub id: ContactId,
    pub name: String,
    pub phone: String,
    pub email: String,
}

impl Contact {
    /// Attach a storage-assigned id to new contact data.
    pub fn from_new(id: ContactId, data: NewContact) -> Self {
        Self {
            id,
            name: data.name,
            phone: data.phone,
            email: data.email,
        }
    }
}

/// Repository port for persisting and loading contacts.
///
/// Listing order is storage-defined; callers must not rely on it.
pub trait ContactRepository: Send + Sync {
    fn list_all(&self) -> Result<Vec<Contact>, CoreError>;
    fn find_by_id(&self, id: ContactId) -> Result<Option<Contact>, CoreError>;
    /// Insert a contact and return the identifier storage assigned to it.
    fn insert(&self, contact: NewContact) -> Result<ContactId, CoreError>;
    /// Replace name, phone and email of the row keyed by `contact.id`.
    /// Returns the number of rows affected; zero is not an error.
    fn update(&self, contact: &Contact) -> Result<usize, CoreError>;
}

/// Lets the server pick a backend at startup and hold it as a trait object.
impl<R: ContactRepository + ?Sized> ContactRepository for Box<R> {
    fn list_all(&self) -> Result<Vec<Contact>, CoreError> {
        (**self).list_all()
    }

    fn find_by_id(&self, id: ContactId) -> Result<Option<Contact>, CoreError> {
        (**self).find_by_id(id)
    }

    fn insert(&self, contact: NewContact) -> Result<ContactId, CoreError> {
        (**self).insert(contact)
    }

    fn update(&self, contact: &Contact) -> Result<usize, CoreError> {
        (**self).update(contact)
    }
}

/// Core domain errors.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("storage unreachable: {0}")]
    Unreachable(String),
    #[error("query error: {0}")]
    Query(String),
    #[error("write error: {0}")]
    Write(String),
    #[error("not found")]
    NotFound,
    #[error("invalid id: {0}")]
    InvalidId(String),
}

pub mod adapters;
pub mod service;
pub mod validate;
