use std::convert::Infallible;

use axum::{
    Form, Json,
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

/// Request body that may arrive as JSON, as an urlencoded form, or as a
/// multipart form (text parts only).
///
/// An unreadable body is not an error here: it yields `T::default()`, and
/// the handler's required-field checks produce the 400.
pub struct JsonOrForm<T>(pub T);

impl<S, T> FromRequest<S> for JsonOrForm<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Default + Send,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let value = if content_type.starts_with("application/x-www-form-urlencoded") {
            Form::<T>::from_request(req, state).await.map(|Form(v)| v).ok()
        } else if content_type.starts_with("multipart/form-data") {
            match Multipart::from_request(req, state).await {
                Ok(multipart) => multipart_fields(multipart).await,
                Err(_) => None,
            }
        } else {
            Json::<T>::from_request(req, state).await.map(|Json(v)| v).ok()
        };

        if value.is_none() {
            debug!("Unreadable request body, treating as empty");
        }
        Ok(Self(value.unwrap_or_default()))
    }
}

/// Collect the text parts of a multipart body into `T`. File parts are
/// skipped and the first occurrence of a repeated name wins.
async fn multipart_fields<T: DeserializeOwned>(mut multipart: Multipart) -> Option<T> {
    let mut fields = Map::new();
    while let Some(field) = multipart.next_field().await.ok()? {
        if field.file_name().is_some() {
            continue;
        }
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        let text = field.text().await.ok()?;
        fields.entry(name).or_insert(Value::String(text));
    }
    serde_json::from_value(Value::Object(fields)).ok()
}

/// Trimmed field value; missing fields become the empty string.
pub fn trimmed(value: Option<String>) -> String {
    value.map(|v| v.trim().to_string()).unwrap_or_default()
}
