use std::collections::HashMap;

use cucumber::World;
use keyshop_engine::{
    db_types::{OrderId, ProductId},
    events::EventProducers,
    test_utils::{create_database, random_db_path, run_migrations},
    CatalogApi,
    CheckoutApi,
    InventoryApi,
    PaymentProviderConfig,
    PaymentWebhookApi,
    SqliteDatabase,
    WalletApi,
};
use log::*;
use tokio::time::sleep;

#[derive(Default, Debug, World)]
pub struct ShopWorld {
    pub system: Option<ShopSystem>,
}

#[derive(Debug)]
pub struct ShopSystem {
    pub db_path: String,
    pub db: SqliteDatabase,
    pub catalog: CatalogApi<SqliteDatabase>,
    pub checkout: CheckoutApi<SqliteDatabase>,
    pub inventory: InventoryApi<SqliteDatabase>,
    pub wallet: WalletApi<SqliteDatabase>,
    pub webhooks: PaymentWebhookApi<SqliteDatabase>,
    /// Product ids by slug
    pub products: HashMap<String, ProductId>,
    /// The most recent order of each user
    pub orders: HashMap<String, OrderId>,
    /// The transfer code of each user's most recent deposit request
    pub deposits: HashMap<String, String>,
    pub last_error: Option<String>,
}

impl ShopWorld {
    pub fn system(&self) -> &ShopSystem {
        self.system.as_ref().expect("Shop not initialised")
    }

    pub fn system_mut(&mut self) -> &mut ShopSystem {
        self.system.as_mut().expect("Shop not initialised")
    }
}

impl ShopSystem {
    pub async fn new() -> Self {
        let url = prepare_test_env().await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");
        debug!("Created database: {url}");
        sleep(std::time::Duration::from_millis(50)).await;
        let producers = EventProducers::default();
        let providers = PaymentProviderConfig::default();
        Self {
            db_path: url,
            catalog: CatalogApi::new(db.clone()),
            checkout: CheckoutApi::new(db.clone(), producers.clone(), providers.clone()),
            inventory: InventoryApi::new(db.clone()),
            wallet: WalletApi::new(db.clone(), providers),
            webhooks: PaymentWebhookApi::new(db.clone(), producers),
            db,
            products: HashMap::new(),
            orders: HashMap::new(),
            deposits: HashMap::new(),
            last_error: None,
        }
    }

    pub fn product(&self, slug: &str) -> &ProductId {
        self.products.get(slug).unwrap_or_else(|| panic!("Product {slug} has not been set up"))
    }

    pub fn last_order(&self, user: &str) -> &OrderId {
        self.orders.get(user).unwrap_or_else(|| panic!("{user} has not placed an order"))
    }
}

pub async fn prepare_test_env() -> String {
    let path = random_db_path();
    create_database(&path).await;
    run_migrations(&path).await;
    path
}
