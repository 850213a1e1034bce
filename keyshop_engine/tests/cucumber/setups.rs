use cucumber::given;
use keyshop_engine::{
    db_types::{NewVoucher, UserId, Vnd},
    test_utils::{fund_wallet, product_with_stock},
};

use crate::cucumber::{shop_world::ShopSystem, ShopWorld};

#[given("a fresh install")]
async fn fresh_database(world: &mut ShopWorld) {
    let system = ShopSystem::new().await;
    world.system = Some(system);
}

#[given(expr = "a product '{word}' priced at {int} VND with {int} items in stock")]
async fn stocked_product(world: &mut ShopWorld, slug: String, price: i64, count: usize) {
    let system = world.system_mut();
    let product = product_with_stock(&system.db, &slug, price, count).await;
    system.products.insert(slug, product.id);
}

#[given(expr = "a voucher '{word}' for {int} percent off")]
async fn percent_voucher(world: &mut ShopWorld, code: String, pct: i64) {
    world.system().catalog.create_voucher(NewVoucher::percent(code, pct)).await.expect("Error creating voucher");
}

#[given(expr = "a voucher '{word}' for {int} VND off that can be used {int} time(s)")]
async fn limited_voucher(world: &mut ShopWorld, code: String, amount: i64, uses: i64) {
    let voucher = NewVoucher::flat(code, Vnd::from(amount)).with_max_uses(uses);
    world.system().catalog.create_voucher(voucher).await.expect("Error creating voucher");
}

#[given(expr = "'{word}' has {int} VND in their wallet")]
async fn funded_wallet(world: &mut ShopWorld, user: String, amount: i64) {
    fund_wallet(&world.system().db, &UserId::from(user), amount).await;
}
