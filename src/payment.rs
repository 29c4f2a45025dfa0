// =============================================================================
// PAYMENT MODULE
// =============================================================================
// Mints payment orders at the payment gateway (Razorpay-style REST API).
//
// WHAT HAPPENS ON CHECKOUT:
// 1. The decimal amount is converted to integer minor units (paise, cents)
// 2. A fresh idempotency token is generated for the attempt
// 3. One POST /v1/orders is sent; the gateway's JSON is returned verbatim
//
// There is no retry and no local persistence of the payment order.
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::metrics;
use crate::models::PaymentOrderRequest;

/// Header carrying the per-attempt idempotency token
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

// =============================================================================
// ERRORS
// =============================================================================
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid currency code: {0}")]
    InvalidCurrency(String),

    /// The gateway answered with a non-2xx status
    #[error("payment gateway returned {status}: {message}")]
    Gateway { status: u16, message: String },

    /// The gateway could not be reached or its answer could not be read
    #[error("payment gateway unreachable: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for PaymentError {
    fn from(err: reqwest::Error) -> Self {
        PaymentError::Transport(err.to_string())
    }
}

// =============================================================================
// MINOR UNITS
// =============================================================================
/// Convert a major-unit amount to the gateway's integer minor units.
///
/// `minor = round(amount * 100)`, midpoints rounded away from zero.
///
/// `199.5` becomes `19950`, `0.005` becomes `1`.
pub fn to_minor_units(amount: Decimal) -> Result<i64, PaymentError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(PaymentError::InvalidAmount(format!(
            "{amount} is negative"
        )));
    }
    amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .map(|minor| minor.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|minor| minor.to_i64())
        .ok_or_else(|| PaymentError::InvalidAmount(format!("{amount} is out of range")))
}

fn check_currency(code: &str) -> Result<String, PaymentError> {
    let code = code.trim().to_ascii_uppercase();
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(code)
    } else {
        Err(PaymentError::InvalidCurrency(code))
    }
}

// =============================================================================
// GATEWAY CONTRACT
// =============================================================================

/// Body of the gateway's create-order call. Amount is always minor units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatewayOrderRequest {
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
}

/// One checkout attempt: the request plus its idempotency token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutAttempt {
    pub idempotency_key: Uuid,
    pub order: GatewayOrderRequest,
}

impl CheckoutAttempt {
    /// Validate and convert an API request into a gateway call
    pub fn prepare(
        request: &PaymentOrderRequest,
        default_currency: &str,
    ) -> Result<Self, PaymentError> {
        let idempotency_key = Uuid::new_v4();
        let amount = to_minor_units(request.amount)?;
        let currency = check_currency(request.currency.as_deref().unwrap_or(default_currency))?;
        let receipt = request
            .receipt
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("rcpt_{}", idempotency_key.simple()));

        Ok(Self {
            idempotency_key,
            order: GatewayOrderRequest {
                amount,
                currency,
                receipt,
            },
        })
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync + 'static {
    /// Create one order at the gateway and return its JSON unchanged
    async fn create_order(&self, attempt: &CheckoutAttempt) -> Result<Value, PaymentError>;
}

// =============================================================================
// RAZORPAY CLIENT
// =============================================================================
pub struct RazorpayClient {
    client: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

impl RazorpayClient {
    pub fn new(
        base_url: impl Into<String>,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            key_id: key_id.into(),
            key_secret: key_secret.into(),
        })
    }
}

/// Pull the human-readable message out of a gateway error body
fn gateway_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/description")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("payment gateway error")
                .to_string()
        })
}

#[async_trait]
impl PaymentGateway for RazorpayClient {
    #[instrument(
        name = "payment_create_order",
        skip(self, attempt),
        fields(receipt = %attempt.order.receipt, idempotency_key = %attempt.idempotency_key)
    )]
    async fn create_order(&self, attempt: &CheckoutAttempt) -> Result<Value, PaymentError> {
        let url = format!("{}/v1/orders", self.base_url);
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .header(IDEMPOTENCY_HEADER, attempt.idempotency_key.to_string())
            .json(&attempt.order)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PaymentError::Gateway {
                status: status.as_u16(),
                message: gateway_message(status, &body),
            });
        }

        Ok(response.json::<Value>().await?)
    }
}

/// Id the gateway assigned to a created order, empty when absent
fn gateway_order_id(order: &Value) -> &str {
    order.get("id").and_then(Value::as_str).unwrap_or("")
}

// =============================================================================
// PAYMENT SERVICE
// =============================================================================
// What the checkout handler talks to: validation, logging and metrics around
// a single gateway call.
pub struct PaymentService {
    gateway: Arc<dyn PaymentGateway>,
    default_currency: String,
}

impl PaymentService {
    pub fn new(gateway: Arc<dyn PaymentGateway>, default_currency: impl Into<String>) -> Self {
        Self {
            gateway,
            default_currency: default_currency.into(),
        }
    }

    pub async fn create_payment_order(
        &self,
        request: &PaymentOrderRequest,
    ) -> Result<Value, PaymentError> {
        let attempt = CheckoutAttempt::prepare(request, &self.default_currency)?;

        info!(
            amount_minor = attempt.order.amount,
            currency = %attempt.order.currency,
            receipt = %attempt.order.receipt,
            "Creating payment order"
        );

        match self.gateway.create_order(&attempt).await {
            Ok(order) => {
                metrics::record_payment_order(true);
                let gateway_order_id = gateway_order_id(&order);
                info!(gateway_order_id, "Payment order created");
                Ok(order)
            }
            Err(e) => {
                metrics::record_payment_order(false);
                warn!(error = %e, receipt = %attempt.order.receipt, "Payment order failed");
                Err(e)
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::State, http::HeaderMap, routing::post, Json, Router};
    use serde_json::json;
    use std::sync::Mutex;

    fn request(amount: Decimal) -> PaymentOrderRequest {
        PaymentOrderRequest {
            amount,
            currency: None,
            receipt: None,
        }
    }

    #[test]
    fn test_minor_units_conversion() {
        assert_eq!(to_minor_units(Decimal::new(1995, 1)).unwrap(), 19950);
        assert_eq!(to_minor_units(Decimal::new(10, 0)).unwrap(), 1000);
        assert_eq!(to_minor_units(Decimal::new(1, 3)).unwrap(), 0);
        // 0.005 rupees is half a paisa
        assert_eq!(to_minor_units(Decimal::new(5, 3)).unwrap(), 1);
        assert_eq!(to_minor_units(Decimal::ZERO).unwrap(), 0);
    }

    #[test]
    fn test_minor_units_rejects_negative_and_huge_amounts() {
        assert!(matches!(
            to_minor_units(Decimal::new(-1, 0)),
            Err(PaymentError::InvalidAmount(_))
        ));
        assert!(matches!(
            to_minor_units(Decimal::MAX),
            Err(PaymentError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_prepare_defaults_currency_and_receipt() {
        let attempt = CheckoutAttempt::prepare(&request(Decimal::new(10, 0)), "INR").unwrap();
        assert_eq!(attempt.order.amount, 1000);
        assert_eq!(attempt.order.currency, "INR");
        assert_eq!(
            attempt.order.receipt,
            format!("rcpt_{}", attempt.idempotency_key.simple())
        );

        let other = CheckoutAttempt::prepare(&request(Decimal::new(10, 0)), "INR").unwrap();
        assert_ne!(attempt.idempotency_key, other.idempotency_key);
    }

    #[test]
    fn test_prepare_rejects_bad_currency() {
        let mut req = request(Decimal::new(10, 0));
        req.currency = Some("rupees".to_string());
        assert!(matches!(
            CheckoutAttempt::prepare(&req, "INR"),
            Err(PaymentError::InvalidCurrency(_))
        ));
    }

    // -------------------------------------------------------------------------
    // FAKE GATEWAY
    // -------------------------------------------------------------------------
    #[derive(Default)]
    struct RecordingGateway {
        calls: Mutex<Vec<CheckoutAttempt>>,
        fail: bool,
    }

    #[async_trait]
    impl PaymentGateway for RecordingGateway {
        async fn create_order(&self, attempt: &CheckoutAttempt) -> Result<Value, PaymentError> {
            self.calls.lock().unwrap().push(attempt.clone());
            if self.fail {
                return Err(PaymentError::Gateway {
                    status: 400,
                    message: "amount too low".to_string(),
                });
            }
            Ok(json!({
                "id": "order_test_1",
                "amount": attempt.order.amount,
                "currency": attempt.order.currency,
                "receipt": attempt.order.receipt,
                "status": "created"
            }))
        }
    }

    #[tokio::test]
    async fn test_service_forwards_minor_units_and_returns_gateway_order() {
        let gateway = Arc::new(RecordingGateway::default());
        let service = PaymentService::new(gateway.clone(), "INR");

        let order = service
            .create_payment_order(&request(Decimal::new(1995, 1)))
            .await
            .unwrap();

        assert_eq!(order["amount"], json!(19950));
        assert_eq!(order["status"], json!("created"));
        assert_eq!(gateway.calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_gateway_order_id_reads_id_field() {
        assert_eq!(gateway_order_id(&json!({ "id": "order_9" })), "order_9");
        assert_eq!(gateway_order_id(&json!({ "id": 9 })), "");
        assert_eq!(gateway_order_id(&json!({})), "");
    }

    #[tokio::test]
    async fn test_service_does_not_call_gateway_for_invalid_amount() {
        let gateway = Arc::new(RecordingGateway::default());
        let service = PaymentService::new(gateway.clone(), "INR");

        let err = service
            .create_payment_order(&request(Decimal::new(-5, 0)))
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::InvalidAmount(_)));
        assert!(gateway.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_service_propagates_gateway_failure_without_retry() {
        let gateway = Arc::new(RecordingGateway {
            fail: true,
            ..Default::default()
        });
        let service = PaymentService::new(gateway.clone(), "INR");

        let err = service
            .create_payment_order(&request(Decimal::new(1, 0)))
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::Gateway { status: 400, .. }));
        assert_eq!(gateway.calls.lock().unwrap().len(), 1);
    }

    // -------------------------------------------------------------------------
    // HTTP CLIENT AGAINST A LOCAL STUB GATEWAY
    // -------------------------------------------------------------------------
    type Seen = Arc<Mutex<Vec<(HeaderMap, Value)>>>;

    async fn spawn_stub_gateway(reject: bool) -> (String, Seen) {
        let seen: Seen = Arc::default();
        let app = Router::new()
            .route(
                "/v1/orders",
                post(
                    move |State(seen): State<Seen>, headers: HeaderMap, Json(body): Json<Value>| async move {
                        seen.lock().unwrap().push((headers, body.clone()));
                        if reject {
                            return (
                                axum::http::StatusCode::BAD_REQUEST,
                                Json(json!({
                                    "error": {
                                        "code": "BAD_REQUEST_ERROR",
                                        "description": "Order amount less than minimum amount allowed"
                                    }
                                })),
                            );
                        }
                        (
                            axum::http::StatusCode::OK,
                            Json(json!({
                                "id": "order_stub_1",
                                "amount": body["amount"],
                                "currency": body["currency"],
                                "receipt": body["receipt"],
                                "status": "created"
                            })),
                        )
                    },
                ),
            )
            .with_state(seen.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), seen)
    }

    #[tokio::test]
    async fn test_razorpay_client_posts_order_with_auth_and_idempotency_key() {
        let (base_url, seen) = spawn_stub_gateway(false).await;
        let client =
            RazorpayClient::new(base_url, "rzp_test_key", "secret", Duration::from_secs(5))
                .unwrap();
        let attempt = CheckoutAttempt::prepare(&request(Decimal::new(10, 0)), "INR").unwrap();

        let order = client.create_order(&attempt).await.unwrap();
        assert_eq!(order["id"], json!("order_stub_1"));
        assert_eq!(order["amount"], json!(1000));

        let seen = seen.lock().unwrap();
        let (headers, body) = &seen[0];
        assert_eq!(body["amount"], json!(1000));
        assert_eq!(body["currency"], json!("INR"));
        assert_eq!(
            headers[IDEMPOTENCY_HEADER].to_str().unwrap(),
            attempt.idempotency_key.to_string()
        );
        assert!(headers["authorization"]
            .to_str()
            .unwrap()
            .starts_with("Basic "));
    }

    #[tokio::test]
    async fn test_razorpay_client_surfaces_gateway_error_description() {
        let (base_url, _seen) = spawn_stub_gateway(true).await;
        let client =
            RazorpayClient::new(base_url, "rzp_test_key", "secret", Duration::from_secs(5))
                .unwrap();
        let attempt = CheckoutAttempt::prepare(&request(Decimal::new(1, 2)), "INR").unwrap();

        let err = client.create_order(&attempt).await.unwrap_err();
        match err {
            PaymentError::Gateway { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Order amount less than minimum amount allowed");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
