//! B2B lead capture endpoints.

use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::AdminUser;
use crate::entities::lead;
use crate::errors::ApiError;
use crate::handlers::common::{created_response, map_service_error, success_response};
use crate::services::leads::CreateLeadInput;
use crate::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct LeadResponse {
    pub id: Uuid,
    pub company: String,
    pub contact_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<lead::Model> for LeadResponse {
    fn from(m: lead::Model) -> Self {
        Self {
            id: m.id,
            company: m.company,
            contact_name: m.contact_name,
            email: m.email,
            phone: m.phone,
            message: m.message,
            created_at: m.created_at,
        }
    }
}

/// Submit a bulk-order enquiry (public form)
#[utoipa::path(
    post,
    path = "/api/v1/leads",
    request_body = CreateLeadInput,
    responses(
        (status = 201, description = "Lead captured", body = LeadResponse),
        (status = 400, description = "Invalid enquiry")
    ),
    tag = "leads"
)]
pub async fn create_lead(
    State(state): State<AppState>,
    Json(payload): Json<CreateLeadInput>,
) -> Result<impl IntoResponse, ApiError> {
    let lead = state
        .services
        .leads
        .create_lead(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(LeadResponse::from(lead)))
}

/// List captured leads (admin)
#[utoipa::path(
    get,
    path = "/api/v1/admin/leads",
    responses(
        (status = 200, description = "Captured leads, newest first", body = [LeadResponse]),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not an admin")
    ),
    security(("bearer_auth" = [])),
    tag = "admin"
)]
pub async fn list_leads(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<impl IntoResponse, ApiError> {
    let leads = state
        .services
        .leads
        .list_leads()
        .await
        .map_err(map_service_error)?;
    let body: Vec<LeadResponse> = leads.into_iter().map(LeadResponse::from).collect();
    Ok(success_response(body))
}

pub fn public_routes() -> Router<AppState> {
    Router::new().route("/leads", post(create_lead))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new().route("/admin/leads", get(list_leads))
}
