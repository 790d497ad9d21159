//! B2B/bulk-order lead capture.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};
use serde::Deserialize;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entities::lead::{self, Entity as Lead};
use crate::errors::ServiceError;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateLeadInput {
    #[validate(length(min = 1, max = 255, message = "Company is required"))]
    pub company: String,
    #[validate(length(min = 1, max = 255, message = "Contact name is required"))]
    pub contact_name: String,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(max = 32, message = "Phone number is too long"))]
    pub phone: Option<String>,
    #[validate(length(max = 4000, message = "Message is too long"))]
    pub message: Option<String>,
}

#[derive(Clone)]
pub struct LeadService {
    db: DatabaseConnection,
}

impl LeadService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Records an enquiry from the public contact form.
    #[instrument(skip(self, input), fields(company = %input.company))]
    pub async fn create_lead(&self, input: CreateLeadInput) -> Result<lead::Model, ServiceError> {
        input.validate()?;

        let model = lead::ActiveModel {
            id: Set(Uuid::new_v4()),
            company: Set(input.company),
            contact_name: Set(input.contact_name),
            email: Set(input.email),
            phone: Set(input.phone),
            message: Set(input.message),
            created_at: Set(Utc::now()),
        }
        .insert(&self.db)
        .await?;

        info!(lead_id = %model.id, "Lead captured");
        Ok(model)
    }

    pub async fn list_leads(&self) -> Result<Vec<lead::Model>, ServiceError> {
        let leads = Lead::find()
            .order_by_desc(lead::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(leads)
    }
}
