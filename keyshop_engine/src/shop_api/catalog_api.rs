use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{NewProduct, NewVoucher, Product, ProductId, ProductUpdate, Voucher, VoucherId, VoucherUpdate},
    traits::{CatalogError, CatalogManagement},
};

/// Admin maintenance of the product and voucher records that checkout depends on.
pub struct CatalogApi<B> {
    db: B,
}

impl<B: Debug> Debug for CatalogApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CatalogApi ({:?})", self.db)
    }
}

impl<B> CatalogApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> CatalogApi<B>
where B: CatalogManagement
{
    pub async fn create_product(&self, product: NewProduct) -> Result<Product, CatalogError> {
        if product.name.trim().is_empty() || product.slug.trim().is_empty() {
            return Err(CatalogError::Validation("Product name and slug are required".into()));
        }
        if product.price.value() < 0 {
            return Err(CatalogError::Validation("Price cannot be negative".into()));
        }
        let product = self.db.insert_product(product).await?;
        info!("🗃️ Product {} ({}) created", product.slug, product.id);
        Ok(product)
    }

    pub async fn product(&self, id: &ProductId) -> Result<Product, CatalogError> {
        self.db.fetch_product(id).await?.ok_or_else(|| CatalogError::ProductNotFound(id.clone()))
    }

    pub async fn update_product(&self, id: &ProductId, update: ProductUpdate) -> Result<Product, CatalogError> {
        if update.price.map(|p| p.value() < 0).unwrap_or(false) {
            return Err(CatalogError::Validation("Price cannot be negative".into()));
        }
        self.db.update_product(id, update).await
    }

    pub async fn create_voucher(&self, voucher: NewVoucher) -> Result<Voucher, CatalogError> {
        if voucher.code.trim().is_empty() {
            return Err(CatalogError::Validation("Voucher code is required".into()));
        }
        if voucher.discount_percent.is_none() && voucher.discount_amount.is_none() {
            return Err(CatalogError::Validation("A voucher needs a percent or a flat discount".into()));
        }
        let voucher = self.db.insert_voucher(voucher).await?;
        info!("🗃️ Voucher {} created", voucher.code);
        Ok(voucher)
    }

    pub async fn voucher(&self, id: &VoucherId) -> Result<Voucher, CatalogError> {
        self.db.fetch_voucher(id).await?.ok_or_else(|| CatalogError::VoucherNotFound(id.clone()))
    }

    pub async fn update_voucher(&self, id: &VoucherId, update: VoucherUpdate) -> Result<Voucher, CatalogError> {
        self.db.update_voucher(id, update).await
    }
}
