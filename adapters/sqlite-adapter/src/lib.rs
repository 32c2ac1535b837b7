//! sqlite-adapter — SQLite implementation of the ContactRepository port.
//!
//! Purpose
//! - Own the single database connection the server holds for its lifetime.
//! - Implements the `ContactRepository` trait from the `domain` crate, one
//!   parameterized statement per operation.
//!
//! Notes
//! - Uses `rusqlite` with the `bundled` feature for portability.
//! - `id` is an AUTOINCREMENT primary key, so identifiers are never reused.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use domain::{Contact, ContactId, ContactRepository, CoreError, NewContact};
use rusqlite::{params, Connection};
use tracing::debug;

/// SQLite-backed contact storage.
pub struct SqliteRepo {
    conn: Mutex<Connection>,
}

impl SqliteRepo {
    /// Open (or create) a SQLite database at the given path and ensure schema.
    pub fn connect<P: AsRef<Path>>(path: P) -> Result<Self, CoreError> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| {
                CoreError::Connection(format!("create {}: {e}", dir.display()))
            })?;
        }
        let conn = Connection::open(path).map_err(|e| CoreError::Connection(e.to_string()))?;
        init_schema(&conn)?;
        debug!(path = %path.display(), "sqlite connection open");
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Round-trip a trivial statement to prove the database answers.
    pub fn verify(&self) -> Result<(), CoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| CoreError::Unreachable("mutex poisoned".into()))?;
        let one: i64 = conn
            .query_row("SELECT 1", [], |row| row.get(0))
            .map_err(|e| CoreError::Unreachable(e.to_string()))?;
        if one != 1 {
            return Err(CoreError::Unreachable(format!("unexpected ping result {one}")));
        }
        Ok(())
    }

    fn lock(
        &self,
        on_err: fn(String) -> CoreError,
    ) -> Result<MutexGuard<'_, Connection>, CoreError> {
        self.conn.lock().map_err(|_| on_err("mutex poisoned".into()))
    }
}

fn init_schema(conn: &Connection) -> Result<(), CoreError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS contacts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            phone TEXT NOT NULL,
            email TEXT NOT NULL
        );
        "#,
    )
    .map_err(|e| CoreError::Connection(format!("schema: {e}")))
}

fn query_err<E: std::fmt::Display>(e: E) -> CoreError {
    CoreError::Query(format!("sqlite error: {e}"))
}

fn write_err<E: std::fmt::Display>(e: E) -> CoreError {
    CoreError::Write(format!("sqlite error: {e}"))
}

fn row_to_contact(row: &rusqlite::Row) -> Result<Contact, CoreError> {
    let id: i64 = row.get(0).map_err(query_err)?;
    let name: String = row.get(1).map_err(query_err)?;
    let phone: String = row.get(2).map_err(query_err)?;
    let email: String = row.get(3).map_err(query_err)?;
    Ok(Contact {
        id: ContactId::new(id),
        name,
        phone,
        email,
    })
}

impl ContactRepository for SqliteRepo {
    fn list_all(&self) -> Result<Vec<Contact>, CoreError> {
        let conn = self.lock(CoreError::Query)?;
        let mut stmt = conn
            .prepare("SELECT id, name, phone, email FROM contacts")
            .map_err(query_err)?;
        let mut rows = stmt.query([]).map_err(query_err)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(query_err)? {
            out.push(row_to_contact(row)?);
        }
        Ok(out)
    }

    fn find_by_id(&self, id: ContactId) -> Result<Option<Contact>, CoreError> {
        let conn = self.lock(CoreError::Query)?;
        let mut stmt = conn
            .prepare("SELECT id, name, phone, email FROM contacts WHERE id = ?1")
            .map_err(query_err)?;
        let mut rows = stmt.query(params![id.value()]).map_err(query_err)?;
        if let Some(row) = rows.next().map_err(query_err)? {
            Ok(Some(row_to_contact(row)?))
        } else {
            Ok(None)
        }
    }

    fn insert(&self, contact: NewContact) -> Result<ContactId, CoreError> {
        let conn = self.lock(CoreError::Write)?;
        conn.execute(
            "INSERT INTO contacts (name, phone, email) VALUES (?1, ?2, ?3)",
            params![contact.name, contact.phone, contact.email],
        )
        .map_err(write_err)?;
        Ok(ContactId::new(conn.last_insert_rowid()))
    }

    fn update(&self, contact: &Contact) -> Result<usize, CoreError> {
        let conn = self.lock(CoreError::Write)?;
        conn.execute(
            "UPDATE contacts SET name = ?1, phone = ?2, email = ?3 WHERE id = ?4",
            params![contact.name, contact.phone, contact.email, contact.id.value()],
        )
        .map_err(write_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp_db() -> (SqliteRepo, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.db");
        let repo = SqliteRepo::connect(path).unwrap();
        (repo, dir)
    }

    #[test]
    fn connect_and_verify() {
        let (repo, _dir) = tmp_db();
        repo.verify().unwrap();
    }

    #[test]
    fn connect_creates_missing_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("p.db");
        let repo = SqliteRepo::connect(&path).unwrap();
        repo.verify().unwrap();
        assert!(path.exists());
    }

    #[test]
    fn connect_fails_when_path_is_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = SqliteRepo::connect(dir.path()).err().expect("must fail");
        assert!(matches!(err, CoreError::Connection(_)));
    }

    #[test]
    fn insert_get_roundtrip() {
        let (repo, _dir) = tmp_db();
        let id = repo
            .insert(NewContact::new("Alice", "555-1234", "a@x.com"))
            .unwrap();
        let got = repo.find_by_id(id).unwrap().unwrap();
        assert_eq!(got.id, id);
        assert_eq!(got.name, "Alice");
        assert_eq!(got.phone, "555-1234");
        assert_eq!(got.email, "a@x.com");
    }

    #[test]
    fn find_missing_returns_none() {
        let (repo, _dir) = tmp_db();
        assert!(repo.find_by_id(ContactId::new(999_999)).unwrap().is_none());
    }

    #[test]
    fn list_contains_every_insert_with_fresh_ids() {
        let (repo, _dir) = tmp_db();
        let mut ids = Vec::new();
        for i in 0..4 {
            let id = repo
                .insert(NewContact::new(format!("n{i}"), format!("p{i}"), format!("e{i}")))
                .unwrap();
            assert!(!ids.contains(&id));
            ids.push(id);
        }
        let all = repo.list_all().unwrap();
        assert_eq!(all.len(), 4);
        for (i, id) in ids.iter().enumerate() {
            let c = all.iter().find(|c| c.id == *id).expect("listed");
            assert_eq!(c.name, format!("n{i}"));
        }
    }

    #[test]
    fn update_replaces_fields_and_keeps_id() {
        let (repo, _dir) = tmp_db();
        let id = repo
            .insert(NewContact::new("Alice", "555-1234", "a@x.com"))
            .unwrap();
        let changed = repo
            .update(&Contact {
                id,
                name: "Alice B.".into(),
                phone: "555-9999".into(),
                email: "a@x.com".into(),
            })
            .unwrap();
        assert_eq!(changed, 1);

        let got = repo.find_by_id(id).unwrap().unwrap();
        assert_eq!(got.id, id);
        assert_eq!(got.name, "Alice B.");
        assert_eq!(got.phone, "555-9999");
    }

    #[test]
    fn update_of_missing_id_affects_nothing() {
        let (repo, _dir) = tmp_db();
        let changed = repo
            .update(&Contact {
                id: ContactId::new(12345),
                name: "x".into(),
                phone: "y".into(),
                email: "z".into(),
            })
            .unwrap();
        assert_eq!(changed, 0);
        assert!(repo.list_all().unwrap().is_empty());
    }

    #[test]
    fn values_are_stored_verbatim() {
        let (repo, _dir) = tmp_db();
        let name = "Robert'); DROP TABLE contacts;--";
        let id = repo.insert(NewContact::new(name, "", "<b>")).unwrap();
        let got = repo.find_by_id(id).unwrap().unwrap();
        assert_eq!(got.name, name);
        assert_eq!(got.email, "<b>");
        assert_eq!(repo.list_all().unwrap().len(), 1);
    }

    #[test]
    fn data_survives_reconnect() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.db");
        let id = {
            let repo = SqliteRepo::connect(&path).unwrap();
            repo.insert(NewContact::new("Keep", "1", "k@x")).unwrap()
        };
        let repo = SqliteRepo::connect(&path).unwrap();
        assert_eq!(repo.find_by_id(id).unwrap().unwrap().name, "Keep");
    }
}
