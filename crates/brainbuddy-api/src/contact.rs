use axum::{Json, extract::State, http::StatusCode};
use tracing::info;

use brainbuddy_types::api::{ContactRequest, ContactResponse};

use crate::error::ApiError;
use crate::extract::{JsonOrForm, trimmed};
use crate::{AppState, run_db};

/// POST /api/contact: store a contact-form message. The email is kept as
/// typed; there is no format or duplicate check.
pub async fn submit(
    State(state): State<AppState>,
    JsonOrForm(req): JsonOrForm<ContactRequest>,
) -> Result<(StatusCode, Json<ContactResponse>), ApiError> {
    let name = trimmed(req.name);
    let email = trimmed(req.email);
    let subject = trimmed(req.subject);
    let message = trimmed(req.message);

    if name.is_empty() || email.is_empty() || message.is_empty() {
        return Err(ApiError::validation("name, email, message are required"));
    }

    let row = run_db(&state, move |db| {
        db.insert_contact_message(&name, &email, &subject, &message)
    })
    .await?;
    info!("Contact message {} received", row.id);

    Ok((
        StatusCode::CREATED,
        Json(ContactResponse {
            message: "Message received",
            data: row.into_public()?,
        }),
    ))
}
