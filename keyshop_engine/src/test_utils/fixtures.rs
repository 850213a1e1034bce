use crate::{
    db_types::{NewInventoryItem, NewProduct, NewWalletTransaction, Product, UserId, Vnd, WalletTxType},
    traits::{CatalogManagement, InventoryManagement, WalletManagement},
    SqliteDatabase,
};

/// Inserts an active product with `count` distinct secrets in stock.
pub async fn product_with_stock(db: &SqliteDatabase, slug: &str, price: i64, count: usize) -> Product {
    let product = db
        .insert_product(NewProduct::new(slug.to_uppercase(), slug.to_string(), Vnd::from(price)))
        .await
        .expect("Error inserting product");
    if count > 0 {
        let items = (0..count)
            .map(|i| NewInventoryItem::new(product.id.clone(), format!("{slug}-secret-{i:04}-user:pass")))
            .collect();
        db.insert_inventory_items(items).await.expect("Error inserting inventory");
    }
    product
}

/// Credits `amount` to the user's wallet as a deposit.
pub async fn fund_wallet(db: &SqliteDatabase, user_id: &UserId, amount: i64) {
    let tx = NewWalletTransaction::new(WalletTxType::Deposit, Vnd::from(amount), "test")
        .with_description("Test funding")
        .with_reference("test", user_id.as_str());
    db.post_transaction(user_id, tx).await.expect("Error funding wallet");
}
