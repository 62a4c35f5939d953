//! Database row types. These map directly to SQLite rows and stay distinct
//! from the brainbuddy-types API models to keep the DB layer independent.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use brainbuddy_types::models::{ContactMessage, Report, User};

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct ReportRow {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: String,
    pub filename: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct ContactMessageRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub created_at: String,
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let ts = DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("Malformed timestamp in database: {}", raw))?;
    Ok(ts.with_timezone(&Utc))
}

impl UserRow {
    pub fn to_public(&self) -> Result<User> {
        Ok(User {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

impl ReportRow {
    pub fn into_public(self) -> Result<Report> {
        let created_at = parse_timestamp(&self.created_at)?;
        Ok(Report {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            description: self.description,
            filename: self.filename,
            content_type: self.content_type,
            size_bytes: self.size_bytes,
            created_at,
        })
    }
}

impl ContactMessageRow {
    pub fn into_public(self) -> Result<ContactMessage> {
        let created_at = parse_timestamp(&self.created_at)?;
        Ok(ContactMessage {
            id: self.id,
            name: self.name,
            email: self.email,
            subject: self.subject,
            message: self.message,
            created_at,
        })
    }
}
