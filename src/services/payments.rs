//! Payment gateway client and payment confirmation verification.
//!
//! The gateway is an external collaborator: checkout creates a gateway-side
//! order, the storefront completes payment against it in the browser, and
//! the confirmation callback is authenticated by an HMAC-SHA256 signature
//! over `"{gateway_order_id}|{payment_id}"` keyed with the gateway secret.

use hmac::{Hmac, Mac};
use reqwest::Client;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{error, instrument};

use crate::config::AppConfig;
use crate::errors::ServiceError;

type HmacSha256 = Hmac<Sha256>;

/// Order as created on the gateway side
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Serialize)]
struct CreateGatewayOrderRequest<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
}

#[derive(Clone)]
pub struct PaymentGatewayClient {
    http: Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

/// Converts a decimal amount to the gateway's minor units (e.g. cents).
fn to_minor_units(amount: Decimal) -> Result<i64, ServiceError> {
    (amount * Decimal::from(100))
        .round()
        .to_i64()
        .ok_or_else(|| {
            ServiceError::InvalidOperation("amount out of range for payment gateway".to_string())
        })
}

impl PaymentGatewayClient {
    pub fn new(http: Client, base_url: String, key_id: String, key_secret: String) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            key_id,
            key_secret,
        }
    }

    pub fn from_config(http: Client, config: &AppConfig) -> Self {
        Self::new(
            http,
            config.payment_base_url.clone(),
            config.payment_key_id.clone(),
            config.payment_key_secret.clone(),
        )
    }

    /// Creates a gateway-side order for the given amount.
    #[instrument(skip(self))]
    pub async fn create_gateway_order(
        &self,
        amount: Decimal,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder, ServiceError> {
        let body = CreateGatewayOrderRequest {
            amount: to_minor_units(amount)?,
            currency,
            receipt,
        };

        let response = self
            .http
            .post(format!("{}/orders", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("Payment gateway request failed: {}", e);
                ServiceError::ExternalServiceError("payment gateway unreachable".to_string())
            })?;

        if !response.status().is_success() {
            error!(
                status = %response.status(),
                "Payment gateway rejected order creation"
            );
            return Err(ServiceError::ExternalServiceError(
                "payment gateway rejected order creation".to_string(),
            ));
        }

        let order = response.json::<GatewayOrder>().await.map_err(|e| {
            error!("Payment gateway returned malformed body: {}", e);
            ServiceError::ExternalServiceError("payment gateway returned malformed body".to_string())
        })?;

        Ok(order)
    }

    /// Verifies a payment confirmation signature in constant time.
    pub fn verify_payment_signature(
        &self,
        gateway_order_id: &str,
        payment_id: &str,
        signature_hex: &str,
    ) -> Result<(), ServiceError> {
        verify_signature(
            &self.key_secret,
            gateway_order_id,
            payment_id,
            signature_hex,
        )
    }
}

fn verify_signature(
    secret: &str,
    gateway_order_id: &str,
    payment_id: &str,
    signature_hex: &str,
) -> Result<(), ServiceError> {
    let expected = hex::decode(signature_hex).map_err(|_| {
        ServiceError::PaymentFailed("payment signature is not valid hex".to_string())
    })?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| ServiceError::InternalError("invalid payment secret".to_string()))?;
    mac.update(gateway_order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());

    mac.verify_slice(&expected)
        .map_err(|_| ServiceError::PaymentFailed("payment signature mismatch".to_string()))
}
