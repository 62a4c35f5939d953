use crate::Database;
use crate::models::{ContactMessageRow, ReportRow, UserRow};
use anyhow::Result;
use rusqlite::Row;

const USER_COLUMNS: &str = "id, name, email, password_hash, created_at";
const REPORT_COLUMNS: &str =
    "id, user_id, title, description, filename, content_type, size_bytes, created_at";
const CONTACT_COLUMNS: &str = "id, name, email, subject, message, created_at";

/// Metadata for a report whose bytes are already on disk.
pub struct NewReport<'a> {
    pub user_id: i64,
    pub title: &'a str,
    pub description: &'a str,
    pub filename: &'a str,
    pub content_type: &'a str,
    pub size_bytes: i64,
}

impl Database {
    // -- Users --

    /// Insert a user. Returns `None` when the email is already registered;
    /// the UNIQUE constraint makes this check-and-insert atomic.
    pub fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!(
                    "INSERT INTO users (name, email, password_hash) VALUES (?1, ?2, ?3)
                     ON CONFLICT(email) DO NOTHING
                     RETURNING {USER_COLUMNS}"
                ),
                (name, email, password_hash),
                user_from_row,
            )
            .optional()
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                [email],
                user_from_row,
            )
            .optional()
        })
    }

    // -- Sessions --

    pub fn create_session(
        &self,
        token_hash: &str,
        user_id: i64,
        lifetime_secs: i64,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sessions (token_hash, user_id, expires_at)
                 VALUES (?1, ?2, strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?3))",
                rusqlite::params![token_hash, user_id, format!("{:+} seconds", lifetime_secs)],
            )?;
            Ok(())
        })
    }

    /// Resolve a session to its user. An expired session is deleted on sight
    /// and reported as absent.
    pub fn get_session_user(&self, token_hash: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM sessions
                 WHERE token_hash = ?1
                   AND expires_at <= strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                [token_hash],
            )?;

            conn.query_row(
                "SELECT u.id, u.name, u.email, u.password_hash, u.created_at
                 FROM sessions s
                 JOIN users u ON u.id = s.user_id
                 WHERE s.token_hash = ?1",
                [token_hash],
                user_from_row,
            )
            .optional()
        })
    }

    /// Returns false if there was no such session.
    pub fn delete_session(&self, token_hash: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM sessions WHERE token_hash = ?1", [token_hash])?;
            Ok(n > 0)
        })
    }

    // -- Reports --

    pub fn insert_report(&self, report: &NewReport<'_>) -> Result<ReportRow> {
        self.with_conn(|conn| {
            let row = conn.query_row(
                &format!(
                    "INSERT INTO reports (user_id, title, description, filename, content_type, size_bytes)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     RETURNING {REPORT_COLUMNS}"
                ),
                rusqlite::params![
                    report.user_id,
                    report.title,
                    report.description,
                    report.filename,
                    report.content_type,
                    report.size_bytes,
                ],
                report_from_row,
            )?;
            Ok(row)
        })
    }

    /// All reports owned by `user_id`, newest first.
    pub fn list_reports(&self, user_id: i64) -> Result<Vec<ReportRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {REPORT_COLUMNS} FROM reports
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, id DESC"
            ))?;

            let rows = stmt
                .query_map([user_id], report_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Ownership is part of the predicate: someone else's report and a
    /// missing one look the same.
    pub fn get_report(&self, id: i64, user_id: i64) -> Result<Option<ReportRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {REPORT_COLUMNS} FROM reports WHERE id = ?1 AND user_id = ?2"),
                [id, user_id],
                report_from_row,
            )
            .optional()
        })
    }

    pub fn delete_report(&self, id: i64, user_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM reports WHERE id = ?1 AND user_id = ?2",
                [id, user_id],
            )?;
            Ok(n > 0)
        })
    }

    // -- Contact messages --

    pub fn insert_contact_message(
        &self,
        name: &str,
        email: &str,
        subject: &str,
        message: &str,
    ) -> Result<ContactMessageRow> {
        self.with_conn(|conn| {
            let row = conn.query_row(
                &format!(
                    "INSERT INTO contact_messages (name, email, subject, message)
                     VALUES (?1, ?2, ?3, ?4)
                     RETURNING {CONTACT_COLUMNS}"
                ),
                (name, email, subject, message),
                |row| {
                    Ok(ContactMessageRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        email: row.get(2)?,
                        subject: row.get(3)?,
                        message: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                },
            )?;
            Ok(row)
        })
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn report_from_row(row: &Row<'_>) -> rusqlite::Result<ReportRow> {
    Ok(ReportRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        filename: row.get(4)?,
        content_type: row.get(5)?,
        size_bytes: row.get(6)?,
        created_at: row.get(7)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_with_user(email: &str) -> (Database, UserRow) {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user("Ada", email, "hash").unwrap().unwrap();
        (db, user)
    }

    fn report<'a>(user_id: i64, filename: &'a str) -> NewReport<'a> {
        NewReport {
            user_id,
            title: "Blood panel",
            description: "",
            filename,
            content_type: "application/pdf",
            size_bytes: 42,
        }
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let (db, user) = db_with_user("ada@example.com");
        assert_eq!(user.email, "ada@example.com");
        assert!(user.to_public().is_ok());

        let again = db.create_user("Other", "ada@example.com", "hash2").unwrap();
        assert!(again.is_none());
    }

    #[test]
    fn looks_up_users() {
        let (db, user) = db_with_user("ada@example.com");
        let by_email = db.get_user_by_email("ada@example.com").unwrap().unwrap();
        assert_eq!(by_email.id, user.id);
        assert!(db.get_user_by_email("nobody@example.com").unwrap().is_none());
    }

    #[test]
    fn session_resolves_until_deleted() {
        let (db, user) = db_with_user("ada@example.com");
        db.create_session("abc", user.id, 3600).unwrap();

        let found = db.get_session_user("abc").unwrap().unwrap();
        assert_eq!(found.id, user.id);

        assert!(db.delete_session("abc").unwrap());
        assert!(db.get_session_user("abc").unwrap().is_none());
        assert!(!db.delete_session("abc").unwrap());
    }

    #[test]
    fn expired_session_is_purged() {
        let (db, user) = db_with_user("ada@example.com");
        db.create_session("old", user.id, -60).unwrap();

        assert!(db.get_session_user("old").unwrap().is_none());
        // Already gone, so there is nothing left to delete.
        assert!(!db.delete_session("old").unwrap());
    }

    #[test]
    fn reports_are_scoped_to_owner() {
        let (db, ada) = db_with_user("ada@example.com");
        let bob = db.create_user("Bob", "bob@example.com", "hash").unwrap().unwrap();

        let row = db.insert_report(&report(ada.id, "a.pdf")).unwrap();
        assert_eq!(row.user_id, ada.id);
        assert_eq!(row.size_bytes, 42);

        assert!(db.get_report(row.id, ada.id).unwrap().is_some());
        assert!(db.get_report(row.id, bob.id).unwrap().is_none());
        assert!(db.list_reports(bob.id).unwrap().is_empty());

        assert!(!db.delete_report(row.id, bob.id).unwrap());
        assert!(db.delete_report(row.id, ada.id).unwrap());
        assert!(db.get_report(row.id, ada.id).unwrap().is_none());
    }

    #[test]
    fn lists_newest_first() {
        let (db, ada) = db_with_user("ada@example.com");
        let first = db.insert_report(&report(ada.id, "a.pdf")).unwrap();
        let second = db.insert_report(&report(ada.id, "b.pdf")).unwrap();

        let ids: Vec<i64> = db.list_reports(ada.id).unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[test]
    fn stores_contact_messages() {
        let db = Database::open_in_memory().unwrap();
        let row = db
            .insert_contact_message("Ada", "not-an-email", "", "Hello")
            .unwrap();
        assert_eq!(row.email, "not-an-email");
        assert_eq!(row.subject, "");
        assert!(row.into_public().is_ok());
    }
}
