//! API error types with HTTP response mapping.
//!
//! | error                              | status |
//! |------------------------------------|--------|
//! | malformed input                    | 400    |
//! | unknown order / sale               | 404    |
//! | concurrent modification            | 409    |
//! | business rejection                 | 422    |
//! | store unreachable or timed out     | 503    |

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{CheckoutError, DomainError};
use projections::ProjectionError;
use serde::Serialize;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest { code: &'static str, message: String },
    /// Checkout could not be priced.
    Checkout(CheckoutError),
    /// Domain logic error.
    Domain(DomainError),
    /// The read side could not catch up.
    Projection(ProjectionError),
}

impl ApiError {
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            code,
            message: message.into(),
        }
    }
}

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Stable machine-readable reason code.
    pub code: &'static str,
    /// Message suitable for display.
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest { code, message } => (StatusCode::BAD_REQUEST, code, message),
            ApiError::Checkout(err) => checkout_error_to_response(&err),
            ApiError::Domain(err) => domain_error_to_response(err),
            ApiError::Projection(err) => {
                tracing::error!(error = %err, "projection catch-up failed");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "READ_MODEL_UNAVAILABLE",
                    err.to_string(),
                )
            }
        };

        (
            status,
            axum::Json(ErrorBody {
                code,
                error: message,
            }),
        )
            .into_response()
    }
}

fn checkout_error_to_response(err: &CheckoutError) -> (StatusCode, &'static str, String) {
    let status = if err.is_input_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    (status, err.code(), err.user_message())
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, &'static str, String) {
    match &err {
        DomainError::Order(order_err) => {
            tracing::debug!(reason = order_err.code(), "order request rejected");
            let status = if order_err.is_input_error() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::UNPROCESSABLE_ENTITY
            };
            (status, order_err.code(), err.to_string())
        }
        DomainError::OrderNotFound(_) => (StatusCode::NOT_FOUND, "ORDER_NOT_FOUND", err.to_string()),
        DomainError::Conflict { .. } => {
            tracing::warn!(error = %err, "order changed concurrently");
            (StatusCode::CONFLICT, "CONFLICT", err.to_string())
        }
        DomainError::StoreUnavailable(_) => {
            tracing::error!(error = %err, "store unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "STORE_UNAVAILABLE",
                err.to_string(),
            )
        }
        DomainError::OrderCodeExhausted { .. } => {
            tracing::error!(error = %err, "could not allocate an order code");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "ORDER_CODE_EXHAUSTED",
                err.to_string(),
            )
        }
        DomainError::Store(_) | DomainError::Serialization(_) => {
            tracing::error!(error = %err, "internal server error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL",
                err.to_string(),
            )
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::Checkout(err)
    }
}

impl From<ProjectionError> for ApiError {
    fn from(err: ProjectionError) -> Self {
        ApiError::Projection(err)
    }
}

#[cfg(test)]
mod tests {
    use common::AggregateId;
    use domain::{OrderError, PricingError, TransitionError, VoucherRejection};
    use event_store::Version;

    use super::*;

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_checkout_errors_split_input_from_rejection() {
        assert_eq!(
            status_of(CheckoutError::Pricing(PricingError::EmptyCart).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(
                CheckoutError::Voucher(VoucherRejection::NotFound {
                    code: "NOPE".to_string()
                })
                .into()
            ),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_domain_error_statuses() {
        let id = AggregateId::new();
        let cases = [
            (
                DomainError::Order(OrderError::MissingCustomerField("phone")),
                StatusCode::BAD_REQUEST,
            ),
            (
                DomainError::Order(OrderError::Transition(TransitionError::IllegalTransition {
                    from: domain::FulfillmentStatus::Completed,
                    to: domain::FulfillmentStatus::Pending,
                })),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (DomainError::OrderNotFound(id), StatusCode::NOT_FOUND),
            (
                DomainError::Conflict {
                    aggregate_id: id,
                    expected: Version::new(1),
                    actual: Version::new(2),
                },
                StatusCode::CONFLICT,
            ),
            (
                DomainError::StoreUnavailable("timed out".to_string()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(status_of(err.into()), expected);
        }
    }
}
