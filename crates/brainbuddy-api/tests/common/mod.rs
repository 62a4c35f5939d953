// Shared harness for the HTTP flow tests: an in-memory database, a
// throwaway upload directory, and the real router driven via `oneshot`.
#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    body::{Body, Bytes},
    http::{HeaderMap, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use brainbuddy_api::router::build_router;
use brainbuddy_api::session::{SESSION_COOKIE, SessionConfig};
use brainbuddy_api::storage::Storage;
use brainbuddy_api::AppStateInner;
use brainbuddy_db::Database;

pub const BOUNDARY: &str = "brainbuddy-test-boundary";

pub struct TestApp {
    pub router: Router,
    upload_dir: TempDir,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is not JSON")
    }

    /// `name=value` of the session cookie this response set, if any.
    pub fn session_cookie(&self) -> Option<String> {
        self.set_cookie_header()
            .and_then(|raw| raw.split(';').next().map(str::to_string))
    }

    pub fn set_cookie_header(&self) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with(&format!("{}=", SESSION_COOKIE)))
            .map(str::to_string)
    }
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_upload_limit(25 * 1024 * 1024).await
    }

    pub async fn with_upload_limit(max_upload_bytes: usize) -> Self {
        let upload_dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(upload_dir.path().to_path_buf()).await.unwrap();

        let state = Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            storage,
            sessions: SessionConfig {
                secret_key: "test-secret".into(),
                lifetime: chrono::Duration::days(7),
                secure_cookie: false,
            },
        });

        Self {
            router: build_router(state, max_upload_bytes),
            upload_dir,
        }
    }

    pub fn upload_path(&self, filename: &str) -> PathBuf {
        self.upload_dir.path().join(filename)
    }

    pub async fn send(&self, req: Request<Body>) -> TestResponse {
        let resp = self.router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, path: &str, cookie: Option<&str>) -> TestResponse {
        self.send(request("GET", path, cookie).body(Body::empty()).unwrap())
            .await
    }

    pub async fn delete(&self, path: &str, cookie: Option<&str>) -> TestResponse {
        self.send(request("DELETE", path, cookie).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_json(&self, path: &str, body: Value, cookie: Option<&str>) -> TestResponse {
        self.send(
            request("POST", path, cookie)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn post_form(&self, path: &str, body: &str) -> TestResponse {
        self.send(
            request("POST", path, None)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    /// POST text fields as `multipart/form-data`.
    pub async fn post_multipart(&self, path: &str, fields: &[(&str, &str)]) -> TestResponse {
        self.send(
            request("POST", path, None)
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", BOUNDARY),
                )
                .body(Body::from(multipart_body(fields, None)))
                .unwrap(),
        )
        .await
    }

    /// Register a user and return its session cookie.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> String {
        let resp = self
            .post_json(
                "/auth/register",
                serde_json::json!({ "name": name, "email": email, "password": password }),
                None,
            )
            .await;
        assert_eq!(resp.status, StatusCode::CREATED, "register failed: {:?}", resp.body);
        resp.session_cookie().expect("register did not set a session cookie")
    }

    pub async fn upload(
        &self,
        cookie: Option<&str>,
        fields: &[(&str, &str)],
        file: Option<(&str, &str, &[u8])>,
    ) -> TestResponse {
        self.send(
            request("POST", "/api/reports", cookie)
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", BOUNDARY),
                )
                .body(Body::from(multipart_body(fields, file)))
                .unwrap(),
        )
        .await
    }

    /// Upload a PDF with the given title and client filename; returns the
    /// created report JSON.
    pub async fn upload_pdf(&self, cookie: &str, title: &str, filename: &str) -> Value {
        let resp = self
            .upload(
                Some(cookie),
                &[("title", title)],
                Some((filename, "application/pdf", b"%PDF-1.4 test")),
            )
            .await;
        assert_eq!(resp.status, StatusCode::CREATED, "upload failed: {:?}", resp.body);
        resp.json()["report"].clone()
    }
}

fn request(method: &str, path: &str, cookie: Option<&str>) -> axum::http::request::Builder {
    let builder = Request::builder().method(method).uri(path);
    match cookie {
        Some(c) => builder.header(header::COOKIE, c),
        None => builder,
    }
}

/// Encode text fields plus an optional `(filename, content_type, bytes)`
/// file part named `file`.
pub fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((filename, content_type, data)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}
