use thiserror::Error;

use crate::db_types::{NewProduct, NewVoucher, Product, ProductId, ProductUpdate, Voucher, VoucherId, VoucherUpdate};

/// The product and voucher records that checkout and inventory depend on.
#[allow(async_fn_in_trait)]
pub trait CatalogManagement: Clone {
    async fn insert_product(&self, product: NewProduct) -> Result<Product, CatalogError>;

    async fn fetch_product(&self, id: &ProductId) -> Result<Option<Product>, CatalogError>;

    /// Applies only the fields present in `update`. Stock cannot be changed this way.
    async fn update_product(&self, id: &ProductId, update: ProductUpdate) -> Result<Product, CatalogError>;

    async fn insert_voucher(&self, voucher: NewVoucher) -> Result<Voucher, CatalogError>;

    async fn fetch_voucher(&self, id: &VoucherId) -> Result<Option<Voucher>, CatalogError>;

    async fn update_voucher(&self, id: &VoucherId, update: VoucherUpdate) -> Result<Voucher, CatalogError>;
}

#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("Product {0} does not exist")]
    ProductNotFound(ProductId),
    #[error("Voucher {0} does not exist")]
    VoucherNotFound(VoucherId),
    #[error("{0} already exists")]
    Conflict(String),
    #[error("{0}")]
    Validation(String),
    #[error("The update does not contain any fields")]
    EmptyUpdate,
}

impl CatalogError {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::DatabaseError(_) => "DATABASE_ERROR",
            Self::ProductNotFound(_) | Self::VoucherNotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::Validation(_) | Self::EmptyUpdate => "VALIDATION_ERROR",
        }
    }
}

impl From<sqlx::Error> for CatalogError {
    fn from(e: sqlx::Error) -> Self {
        match e.as_database_error() {
            Some(db) if db.is_unique_violation() => CatalogError::Conflict(db.message().to_string()),
            Some(db) if db.is_check_violation() => CatalogError::Validation(db.message().to_string()),
            _ => CatalogError::DatabaseError(e.to_string()),
        }
    }
}
