use serde::{Deserialize, Serialize};

use crate::{
    config::RazorpayConfig,
    utils::{now_millis, AppError, AppResult},
};

const RAZORPAY_ORDERS_URL: &str = "https://api.razorpay.com/v1/orders";

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateOrderRequest {
    /// Amount in rupees
    pub amount: f64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct RazorpayOrderBody {
    /// Amount in paise
    pub amount: u64,
    pub currency: String,
    pub receipt: String,
}

/// Validates the amount and converts it to an order body in paise
pub fn order_body(amount: f64, now: i64) -> AppResult<RazorpayOrderBody> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(AppError::BadRequest("Amount must be a positive number".to_string()));
    }
    Ok(RazorpayOrderBody {
        amount: (amount * 100.0).round() as u64,
        currency: "INR".to_string(),
        receipt: format!("receipt_order_{}", now),
    })
}

/// Creates a Razorpay order and returns Razorpay's JSON as is
pub async fn create_order(config: Option<&RazorpayConfig>, amount: f64) -> AppResult<serde_json::Value> {
    let config = config.ok_or_else(|| AppError::Unavailable("Payments are not configured".to_string()))?;
    let body = order_body(amount, now_millis())?;

    log::info!("💳 Creating Razorpay order: {} paise ({})", body.amount, body.receipt);

    let response = reqwest::Client::new()
        .post(RAZORPAY_ORDERS_URL)
        .basic_auth(&config.key_id, Some(&config.key_secret))
        .json(&body)
        .send()
        .await
        .map_err(|e| AppError::Upstream(format!("Razorpay request failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        let detail = response.text().await.unwrap_or_default();
        return Err(AppError::Upstream(format!("Razorpay returned {}: {}", status, detail)));
    }

    response
        .json::<serde_json::Value>()
        .await
        .map_err(|e| AppError::Upstream(format!("Invalid Razorpay response: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_converted_to_paise() {
        let body = order_body(499.99, 1700000000000).unwrap();
        assert_eq!(body.amount, 49999);
        assert_eq!(body.currency, "INR");
        assert_eq!(body.receipt, "receipt_order_1700000000000");
    }

    #[test]
    fn test_invalid_amounts_rejected() {
        assert!(order_body(0.0, 1).is_err());
        assert!(order_body(-5.0, 1).is_err());
        assert!(order_body(f64::NAN, 1).is_err());
    }

    #[tokio::test]
    async fn test_unconfigured_is_unavailable() {
        let err = create_order(None, 100.0).await.unwrap_err();
        assert!(matches!(err, AppError::Unavailable(_)));
    }
}
