use serde::{Deserialize, Serialize};

use crate::models::{ContactMessage, Report, User};

// Request bodies accept JSON or urlencoded forms. Every field is optional at
// the wire level so that "missing" and "blank" produce the same 400.

// -- Auth --

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: &'static str,
    pub user: User,
}

/// `user` is `null` when the caller has no valid session.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: Option<User>,
}

// -- Contact --

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ContactRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub message: &'static str,
    pub data: ContactMessage,
}

// -- Reports --

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: &'static str,
    pub report: Report,
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub report: Report,
}

#[derive(Debug, Serialize)]
pub struct ReportListResponse {
    pub reports: Vec<Report>,
}

// -- Misc --

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct IndexResponse {
    pub app: &'static str,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct PingResponse {
    pub pong: bool,
}
