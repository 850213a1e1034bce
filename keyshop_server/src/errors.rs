use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use keyshop_engine::traits::{
    CatalogError,
    InventoryError,
    OrderFlowError,
    PaymentError,
    PermissionError,
    WalletError,
};
use log::error;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Payload deserialization error")]
    CouldNotDeserializePayload,
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("{0}")]
    Inventory(#[from] InventoryError),
    #[error("{0}")]
    Wallet(#[from] WalletError),
    #[error("{0}")]
    OrderFlow(#[from] OrderFlowError),
    #[error("{0}")]
    Payment(#[from] PaymentError),
    #[error("{0}")]
    Catalog(#[from] CatalogError),
    #[error("{0}")]
    Permission(#[from] PermissionError),
}

impl ServerError {
    /// The stable, machine-readable code sent alongside the message.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::InitializeError(_) | Self::ConfigurationError(_) | Self::Unspecified(_) | Self::IOError(_) => {
                "INTERNAL_ERROR"
            },
            Self::BackendError(_) => "DATABASE_ERROR",
            Self::CouldNotDeserializePayload | Self::InvalidRequestBody(_) | Self::InvalidRequestPath(_) => {
                "VALIDATION_ERROR"
            },
            Self::AuthenticationError(AuthError::InsufficientRole(_) | AuthError::ForbiddenPeer) => "FORBIDDEN",
            Self::AuthenticationError(_) => "UNAUTHORIZED",
            Self::NoRecordFound(_) => "NOT_FOUND",
            Self::InsufficientPermissions(_) => "FORBIDDEN",
            Self::Inventory(e) => e.reason(),
            Self::Wallet(e) => e.reason(),
            Self::OrderFlow(e) => e.reason(),
            Self::Payment(e) => e.reason(),
            Self::Catalog(e) => e.reason(),
            Self::Permission(e) => e.reason(),
        }
    }
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self.reason() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" | "VOUCHER_NOT_FOUND" => StatusCode::NOT_FOUND,
            "CONFLICT" => StatusCode::CONFLICT,
            "DATABASE_ERROR" | "INTERNAL_ERROR" => StatusCode::INTERNAL_SERVER_ERROR,
            // Business rule rejections: validation, balance, inventory, voucher and state errors
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!("💻️ {self}");
        }
        HttpResponse::build(status)
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string(), "reason": self.reason() }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No bearer token was provided.")]
    MissingToken,
    #[error("Bearer token is not in the correct format. {0}")]
    PoorlyFormattedToken(String),
    #[error("Bearer token signature is invalid.")]
    InvalidSignature,
    #[error("Bearer token has expired.")]
    Expired,
    #[error("This action requires the {0} role.")]
    InsufficientRole(String),
    #[error("Requests from this address are not allowed.")]
    ForbiddenPeer,
    #[error("Webhook authentication failed. {0}")]
    WebhookRejected(String),
}

#[cfg(test)]
mod test {
    use keyshop_engine::db_types::{ProductId, Vnd};

    use super::*;

    #[test]
    fn engine_errors_map_to_http_statuses() {
        let e = ServerError::from(WalletError::InsufficientBalance { balance: Vnd::from(10), required: Vnd::from(20) });
        assert_eq!(e.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(e.reason(), "INSUFFICIENT_BALANCE");
        let e = ServerError::from(OrderFlowError::ProductNotFound(ProductId::from("p1")));
        assert_eq!(e.status_code(), StatusCode::NOT_FOUND);
        let e = ServerError::from(CatalogError::Conflict("Slug netflix".into()));
        assert_eq!(e.status_code(), StatusCode::CONFLICT);
        let e = ServerError::from(PermissionError::Forbidden("orders.refund".into()));
        assert_eq!(e.status_code(), StatusCode::FORBIDDEN);
        let e = ServerError::from(PaymentError::MissingCode);
        assert_eq!(e.status_code(), StatusCode::BAD_REQUEST);
        let e = ServerError::from(InventoryError::DatabaseError("disk full".into()));
        assert_eq!(e.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let e = ServerError::from(AuthError::Expired);
        assert_eq!(e.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn error_body_carries_message_and_reason() {
        let e = ServerError::from(OrderFlowError::InvalidState("Can only refund paid orders".into()));
        let res = e.error_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(e.reason(), "INVALID_STATE");
        assert_eq!(e.to_string(), "Can only refund paid orders");
    }
}
