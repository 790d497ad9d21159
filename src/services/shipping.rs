//! Shipping collaborator client.
//!
//! Cancellation is advisory: callers decide whether a failure here aborts
//! the surrounding operation (order deletion treats it as best-effort).

use reqwest::Client;
use tracing::{error, instrument};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::errors::ServiceError;

#[derive(Clone)]
pub struct ShippingClient {
    http: Client,
    base_url: String,
    api_token: Option<String>,
}

impl ShippingClient {
    pub fn new(http: Client, base_url: String, api_token: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token,
        }
    }

    pub fn from_config(http: Client, config: &AppConfig) -> Self {
        Self::new(
            http,
            config.shipping_base_url.clone(),
            config.shipping_api_token.clone(),
        )
    }

    /// Asks the shipping collaborator to cancel any shipment for the order.
    #[instrument(skip(self))]
    pub async fn cancel_order(&self, order_id: Uuid) -> Result<(), ServiceError> {
        let mut request = self
            .http
            .post(format!("{}/orders/{}/cancel", self.base_url, order_id));
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            error!("Shipping cancellation request failed: {}", e);
            ServiceError::ExternalServiceError("shipping service unreachable".to_string())
        })?;

        if !response.status().is_success() {
            error!(
                status = %response.status(),
                %order_id,
                "Shipping service rejected cancellation"
            );
            return Err(ServiceError::ExternalServiceError(
                "shipping service rejected cancellation".to_string(),
            ));
        }

        Ok(())
    }
}
