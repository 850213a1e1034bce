use std::time::Duration;

use actix_web::{
    dev::{Server, Service},
    http::KeepAlive,
    middleware::Logger,
    web,
    App,
    HttpServer,
};
use futures::future::{ok, FutureExt};
use keyshop_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    CatalogApi,
    CheckoutApi,
    InventoryApi,
    PaymentWebhookApi,
    PermissionApi,
    PermissionCache,
    SqliteDatabase,
    StockSyncApi,
    WalletApi,
};
use log::*;

use crate::{
    auth::TokenVerifier,
    config::{ServerConfig, ServerOptions, SweeperConfig},
    errors::{AuthError, ServerError},
    helpers::get_remote_ip,
    middleware::{BearerAuthFactory, HmacMiddlewareFactory},
    routes::*,
    workers::{start_delivery_sweeper, start_deposit_sweeper, start_stock_sync_worker},
};

const EVENT_BUFFER_SIZE: usize = 25;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = open_database(&config).await?;
    info!("🚀️ Running database migrations on {}", db.url());
    db.migrate().await.map_err(|e| ServerError::InitializeError(format!("Database migration failed. {e}")))?;
    let hooks = create_event_hooks(db.clone());
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;
    start_workers(&config, &db);
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

async fn open_database(config: &ServerConfig) -> Result<SqliteDatabase, ServerError> {
    let db = if config.database_url.is_empty() {
        SqliteDatabase::new(config.max_connections).await
    } else {
        SqliteDatabase::new_with_url(&config.database_url, config.max_connections).await
    };
    db.map_err(|e| ServerError::InitializeError(e.to_string()))
}

/// The server's own reactions to engine events. Paid and refunded orders are logged, every fulfillment refreshes the
/// stock counters, and failed fulfillments are raised as errors so that somebody resolves them by hand.
fn create_event_hooks(db: SqliteDatabase) -> EventHooks {
    let stock_sync = StockSyncApi::new(db);
    let mut hooks = EventHooks::default();
    hooks
        .on_order_paid(|ev| {
            info!("📬️ Order {} was paid ({} via {})", ev.order.id, ev.order.total_amount, ev.order.payment_method);
            Box::pin(async {})
        })
        .on_order_fulfilled(move |ev| {
            info!("📬️ Order {} fulfilled with {} deliveries", ev.order_id, ev.deliveries.len());
            let api = stock_sync.clone();
            Box::pin(async move {
                match api.sync_all().await {
                    Ok(changed) => debug!("📬️ Stock sync after fulfillment corrected {} product(s)", changed.len()),
                    Err(e) => warn!("📬️ Stock sync after fulfillment failed. {e}"),
                }
            })
        })
        .on_fulfillment_failed(|ev| {
            error!("📬️ Order {} is paid but could not be fulfilled. {}", ev.order_id, ev.reason);
            Box::pin(async {})
        })
        .on_order_refunded(|ev| {
            info!("📬️ Order {} refunded ({}). {}", ev.order.id, ev.amount, ev.reason);
            Box::pin(async {})
        })
        .on_deposit_completed(|ev| {
            info!("📬️ Deposit {} of {} credited to {}", ev.deposit.payment_code, ev.deposit.amount, ev.deposit.user_id);
            Box::pin(async {})
        });
    hooks
}

fn start_workers(config: &ServerConfig, db: &SqliteDatabase) {
    let SweeperConfig { delivery_interval, deposit_interval, stock_sync_interval } = config.sweepers;
    let _ = start_delivery_sweeper(InventoryApi::new(db.clone()), delivery_interval);
    let _ = start_deposit_sweeper(WalletApi::new(db.clone(), config.payment_providers.clone()), deposit_interval);
    match stock_sync_interval {
        Some(interval) => {
            let _ = start_stock_sync_worker(StockSyncApi::new(db.clone()), interval);
        },
        None => info!("🕰️ Periodic stock sync is disabled"),
    }
}

/// Maps extractor failures (malformed JSON, unknown fields, bad query strings and path segments) onto the standard
/// error body.
pub fn configure_extractors(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default().error_handler(|e, _| ServerError::InvalidRequestBody(e.to_string()).into()),
    )
    .app_data(web::QueryConfig::default().error_handler(|e, _| ServerError::InvalidRequestBody(e.to_string()).into()))
    .app_data(web::PathConfig::default().error_handler(|e, _| ServerError::InvalidRequestPath(e.to_string()).into()));
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let permission_cache = PermissionCache::new(config.permission_cache_ttl);
    let verifier = TokenVerifier::new(&config.auth);
    let options = ServerOptions::from_config(&config);
    let srv = HttpServer::new(move || {
        let checkout_api = CheckoutApi::new(db.clone(), producers.clone(), config.payment_providers.clone());
        let wallet_api = WalletApi::new(db.clone(), config.payment_providers.clone());
        let inventory_api = InventoryApi::new(db.clone());
        let catalog_api = CatalogApi::new(db.clone());
        let stock_sync_api = StockSyncApi::new(db.clone());
        let webhook_api = PaymentWebhookApi::new(db.clone(), producers.clone());
        let permission_api = PermissionApi::new(db.clone(), permission_cache.clone());
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("ksp::access_log"))
            .configure(configure_extractors)
            .app_data(web::Data::new(checkout_api))
            .app_data(web::Data::new(wallet_api))
            .app_data(web::Data::new(inventory_api))
            .app_data(web::Data::new(catalog_api))
            .app_data(web::Data::new(stock_sync_api))
            .app_data(web::Data::new(webhook_api))
            .app_data(web::Data::new(permission_api));
        let admin_scope = web::scope("/admin")
            .service(AddInventoryRoute::<SqliteDatabase>::new())
            .service(BulkInventoryRoute::<SqliteDatabase>::new())
            .service(InventoryStatsRoute::<SqliteDatabase>::new())
            .service(ExpiringInventoryRoute::<SqliteDatabase>::new())
            .service(SyncStockRoute::<SqliteDatabase>::new())
            .service(ProductInventoryRoute::<SqliteDatabase>::new())
            .service(DeleteInventoryItemRoute::<SqliteDatabase>::new())
            .service(RefundOrderRoute::<SqliteDatabase>::new())
            .service(AdjustWalletRoute::<SqliteDatabase>::new())
            .service(UpdateAdminRoleRoute::<SqliteDatabase>::new())
            .service(CreateProductRoute::<SqliteDatabase>::new())
            .service(UpdateProductRoute::<SqliteDatabase>::new())
            .service(CreateVoucherRoute::<SqliteDatabase>::new())
            .service(UpdateVoucherRoute::<SqliteDatabase>::new());
        // Routes that require authentication
        let auth_scope = web::scope("/api")
            .wrap(BearerAuthFactory::new(verifier.clone()))
            .service(admin_scope)
            .service(MyCartRoute::<SqliteDatabase>::new())
            .service(ClearCartRoute::<SqliteDatabase>::new())
            .service(AddToCartRoute::<SqliteDatabase>::new())
            .service(UpdateCartItemRoute::<SqliteDatabase>::new())
            .service(RemoveFromCartRoute::<SqliteDatabase>::new())
            .service(CheckoutRoute::<SqliteDatabase>::new())
            .service(MyOrdersRoute::<SqliteDatabase>::new())
            .service(MyOrderStatsRoute::<SqliteDatabase>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(StartPaymentRoute::<SqliteDatabase>::new())
            .service(MyResourcesRoute::<SqliteDatabase>::new())
            .service(CheckVoucherRoute::<SqliteDatabase>::new())
            .service(MyWalletRoute::<SqliteDatabase>::new())
            .service(CreateDepositRoute::<SqliteDatabase>::new())
            .service(MyDepositsRoute::<SqliteDatabase>::new())
            .service(WalletTransactionsRoute::<SqliteDatabase>::new())
            .service(DepositStatusRoute::<SqliteDatabase>::new());
        let whitelist = config.webhooks.whitelist.clone();
        let webhook_scope = web::scope("/webhooks")
            .wrap(HmacMiddlewareFactory::new(config.webhooks.hmac_secret.clone(), config.webhooks.api_key.clone()))
            .wrap_fn(move |req, srv| {
                // Collect the peer IP from x-forwarded-for or forwarded headers _if_ the options allow it. Otherwise, use
                // the peer address of the connection.
                let peer_ip = get_remote_ip(req.request(), options.use_x_forwarded_for, options.use_forwarded);
                let whitelisted = match (peer_ip, &whitelist) {
                    (Some(ip), Some(allowed)) => {
                        info!("🔔️ Webhook call from {ip}");
                        allowed.contains(&ip)
                    },
                    (_, None) => true,
                    (None, Some(_)) => {
                        warn!("🔔️ No IP address found in webhook request. Denying access.");
                        false
                    },
                };
                if whitelisted {
                    srv.call(req).boxed_local()
                } else {
                    ok(req.error_response(ServerError::AuthenticationError(AuthError::ForbiddenPeer))).boxed_local()
                }
            })
            .service(SepayWebhookRoute::<SqliteDatabase>::new())
            .service(DepositWebhookRoute::<SqliteDatabase>::new());
        app.service(health).service(auth_scope).service(webhook_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
