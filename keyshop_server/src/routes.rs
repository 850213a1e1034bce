//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate function. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Every engine call is async, so keep it that way: no blocking I/O
//! and no `std::thread::sleep` in a handler.
//!
//! Routes under `/api` sit behind bearer authentication, and the caller's [`JwtClaims`] are available to every handler
//! there. Admin routes additionally require the `admin` or `super` role, and check the specific permission they need
//! (e.g. `orders.refund`) against the [`PermissionApi`].
use actix_web::{get, web, HttpResponse, Responder};
use keyshop_engine::{
    db_types::{DepositRequestId, InventoryItemId, NewInventoryItem, NewProduct, NewVoucher, OrderId, ProductId, Role},
    db_types::{ProductUpdate, UserId, VoucherId, VoucherUpdate},
    shop_api::permission_api::{CATALOG_MANAGE, INVENTORY_MANAGE, ORDERS_REFUND, USERS_MANAGE, WALLETS_ADJUST},
    traits::{
        CatalogManagement,
        CheckoutRequest,
        DeliveryManagement,
        DepositQueryFilter,
        InventoryManagement,
        InventoryQueryFilter,
        OrderManagement,
        Paging,
        PaymentReconciliation,
        PermissionManagement,
        WalletManagement,
        WalletTransactionFilter,
    },
    CatalogApi,
    CheckoutApi,
    InventoryApi,
    PaymentWebhookApi,
    PermissionApi,
    StockSyncApi,
    TransferNotification,
    WalletApi,
};
use log::*;
use serde_json::Value;

use crate::{
    auth::JwtClaims,
    data_objects::{
        AddToCartParams,
        AdminRoleParams,
        BulkInventoryParams,
        DepositParams,
        ExpiringParams,
        JsonResponse,
        ProductFilterParams,
        RefundParams,
        UpdateCartItemParams,
        VoucherCheckParams,
        WalletAdjustmentParams,
    },
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:path),+ where requires [$($roles:expr),+]) => {
        paste::paste! { pub struct [<$name:camel Route>]<B>(core::marker::PhantomData<fn() -> B>);}
        paste::paste! { impl<B> [<$name:camel Route>]<B> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> B>)
            }
        }}
        paste::paste! { impl<B> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<B>
        where
            B: $($bounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<B>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:path),+) => {
        paste::paste! { pub struct [<$name:camel Route>]<B>(core::marker::PhantomData<fn() -> B>);}
        paste::paste! { impl<B> [<$name:camel Route>]<B> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> B>)
            }
        }}
        paste::paste! { impl<B> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<B>
        where
            B: $($bounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<B>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Cart  ----------------------------------------------------
route!(my_cart => Get "/cart" impl OrderManagement);
pub async fn my_cart<B: OrderManagement>(
    claims: JwtClaims,
    api: web::Data<CheckoutApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET cart for {}", claims.user_id);
    let cart = api.cart(&claims.user_id).await?;
    Ok(HttpResponse::Ok().json(cart))
}

route!(add_to_cart => Post "/cart/items" impl OrderManagement);
pub async fn add_to_cart<B: OrderManagement>(
    claims: JwtClaims,
    body: web::Json<AddToCartParams>,
    api: web::Data<CheckoutApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let AddToCartParams { product_id, quantity } = body.into_inner();
    debug!("💻️ {} adds {quantity} x {product_id} to their cart", claims.user_id);
    let item = api.add_to_cart(&claims.user_id, &product_id, quantity).await?;
    Ok(HttpResponse::Ok().json(item))
}

route!(update_cart_item => Patch "/cart/items/{product_id}" impl OrderManagement);
pub async fn update_cart_item<B: OrderManagement>(
    claims: JwtClaims,
    path: web::Path<ProductId>,
    body: web::Json<UpdateCartItemParams>,
    api: web::Data<CheckoutApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let product_id = path.into_inner();
    match api.update_cart_item(&claims.user_id, &product_id, body.quantity).await? {
        Some(item) => Ok(HttpResponse::Ok().json(item)),
        None => Ok(HttpResponse::Ok().json(JsonResponse::success("Item removed from cart"))),
    }
}

route!(remove_from_cart => Delete "/cart/items/{product_id}" impl OrderManagement);
pub async fn remove_from_cart<B: OrderManagement>(
    claims: JwtClaims,
    path: web::Path<ProductId>,
    api: web::Data<CheckoutApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let product_id = path.into_inner();
    if api.remove_from_cart(&claims.user_id, &product_id).await? {
        Ok(HttpResponse::Ok().json(JsonResponse::success("Item removed from cart")))
    } else {
        Err(ServerError::NoRecordFound(format!("Product {product_id} is not in the cart")))
    }
}

route!(clear_cart => Delete "/cart" impl OrderManagement);
pub async fn clear_cart<B: OrderManagement>(
    claims: JwtClaims,
    api: web::Data<CheckoutApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let removed = api.clear_cart(&claims.user_id).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("{removed} item(s) removed from cart"))))
}

//----------------------------------------------   Checkout  ----------------------------------------------------
route!(checkout => Post "/checkout" impl OrderManagement);
/// Turns the caller's cart into an order.
///
/// With `useWallet: true` the order is paid from the wallet and fulfilled immediately; the response carries the
/// deliveries. Otherwise the order stays pending and the response carries transfer instructions with the payment
/// code that the provider webhook will later match.
pub async fn checkout<B: OrderManagement>(
    claims: JwtClaims,
    body: web::Json<CheckoutRequest>,
    api: web::Data<CheckoutApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let request = body.into_inner();
    let method = request.resolved_payment_method()?;
    debug!("💻️ Checkout for {} via {method}", claims.user_id);
    let response = api.checkout(&claims.user_id, request).await.map_err(|e| {
        debug!("💻️ Checkout for {} failed. {e}", claims.user_id);
        e
    })?;
    Ok(HttpResponse::Ok().json(response))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(my_orders => Get "/orders" impl OrderManagement);
pub async fn my_orders<B: OrderManagement>(
    claims: JwtClaims,
    paging: web::Query<Paging>,
    api: web::Data<CheckoutApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let orders = api.user_orders(&claims.user_id, paging.into_inner()).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(my_order_stats => Get "/orders/stats" impl OrderManagement);
pub async fn my_order_stats<B: OrderManagement>(
    claims: JwtClaims,
    api: web::Data<CheckoutApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let stats = api.order_stats(&claims.user_id).await?;
    Ok(HttpResponse::Ok().json(stats))
}

route!(order_by_id => Get "/orders/{id}" impl OrderManagement, DeliveryManagement, WalletManagement);
pub async fn order_by_id<B>(
    claims: JwtClaims,
    path: web::Path<OrderId>,
    api: web::Data<CheckoutApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + DeliveryManagement + WalletManagement,
{
    let order_id = path.into_inner();
    let detail = api.order_detail(&claims.user_id, &order_id).await?;
    Ok(HttpResponse::Ok().json(detail))
}

route!(start_payment => Post "/orders/{id}/payment" impl OrderManagement);
pub async fn start_payment<B: OrderManagement>(
    claims: JwtClaims,
    path: web::Path<OrderId>,
    api: web::Data<CheckoutApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ {} starts payment for order {order_id}", claims.user_id);
    let payment = api.start_payment(&claims.user_id, &order_id).await?;
    Ok(HttpResponse::Ok().json(payment))
}

//----------------------------------------------   Resources  ----------------------------------------------------
route!(my_resources => Get "/resources" impl DeliveryManagement);
pub async fn my_resources<B: DeliveryManagement>(
    claims: JwtClaims,
    api: web::Data<InventoryApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let resources = api.user_resources(&claims.user_id).await?;
    Ok(HttpResponse::Ok().json(resources))
}

//----------------------------------------------   Vouchers  ----------------------------------------------------
route!(check_voucher => Get "/vouchers/{code}" impl OrderManagement);
pub async fn check_voucher<B: OrderManagement>(
    path: web::Path<String>,
    query: web::Query<VoucherCheckParams>,
    api: web::Data<CheckoutApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let code = path.into_inner();
    let preview = api.check_voucher(&code, query.subtotal).await?;
    Ok(HttpResponse::Ok().json(preview))
}

//----------------------------------------------   Wallet  ----------------------------------------------------
route!(my_wallet => Get "/wallet" impl WalletManagement);
pub async fn my_wallet<B: WalletManagement>(
    claims: JwtClaims,
    api: web::Data<WalletApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let info = api.wallet_info(&claims.user_id).await?;
    Ok(HttpResponse::Ok().json(info))
}

route!(create_deposit => Post "/wallet/deposits" impl WalletManagement);
pub async fn create_deposit<B: WalletManagement>(
    claims: JwtClaims,
    body: web::Json<DepositParams>,
    api: web::Data<WalletApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let DepositParams { amount, payment_method } = body.into_inner();
    let ticket = api.create_deposit(&claims.user_id, amount, payment_method.as_deref()).await?;
    Ok(HttpResponse::Ok().json(ticket))
}

route!(my_deposits => Get "/wallet/deposits" impl WalletManagement);
pub async fn my_deposits<B: WalletManagement>(
    claims: JwtClaims,
    filter: web::Query<DepositQueryFilter>,
    api: web::Data<WalletApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let deposits = api.deposit_history(&claims.user_id, filter.into_inner()).await?;
    Ok(HttpResponse::Ok().json(deposits))
}

route!(deposit_status => Get "/wallet/deposits/{id}" impl WalletManagement);
pub async fn deposit_status<B: WalletManagement>(
    claims: JwtClaims,
    path: web::Path<DepositRequestId>,
    api: web::Data<WalletApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let report = api.deposit_status(&claims.user_id, &path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(report))
}

route!(wallet_transactions => Get "/wallet/transactions" impl WalletManagement);
pub async fn wallet_transactions<B: WalletManagement>(
    claims: JwtClaims,
    filter: web::Query<WalletTransactionFilter>,
    api: web::Data<WalletApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let transactions = api.transaction_history(&claims.user_id, filter.into_inner()).await?;
    Ok(HttpResponse::Ok().json(transactions))
}

//----------------------------------------------   Webhooks  ----------------------------------------------------
route!(sepay_webhook => Post "/sepay" impl PaymentReconciliation, InventoryManagement);
/// The combined provider notification. A transfer can carry an order code, a deposit code, or both; each flow runs
/// independently and a failure in one does not undo the other.
///
/// Replays of a settled transfer are answered with `success: true` and change nothing.
pub async fn sepay_webhook<B>(
    body: web::Json<Value>,
    api: web::Data<PaymentWebhookApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentReconciliation + InventoryManagement,
{
    let notification = TransferNotification::from_json(&body)?;
    info!("🔔️ Payment notification received: {} VND, '{}'", notification.amount, notification.content);
    let response = api.process_notification(&notification).await.into_response()?;
    Ok(HttpResponse::Ok().json(response))
}

route!(deposit_webhook => Post "/deposit" impl PaymentReconciliation, InventoryManagement);
pub async fn deposit_webhook<B>(
    body: web::Json<Value>,
    api: web::Data<PaymentWebhookApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentReconciliation + InventoryManagement,
{
    let notification = TransferNotification::from_json(&body)?;
    info!("🔔️ Deposit notification received: {} VND, '{}'", notification.amount, notification.content);
    let result = api.process_deposit(&notification).await?;
    Ok(HttpResponse::Ok().json(result.response()))
}

//----------------------------------------------   Admin: inventory  -------------------------------------------------
async fn require_permission<B: PermissionManagement>(
    api: &PermissionApi<B>,
    claims: &JwtClaims,
    permission: &str,
) -> Result<(), ServerError> {
    api.require(&claims.user_id, claims.role, permission).await.map_err(|e| {
        info!("💻️ {} was refused {permission}. {e}", claims.user_id);
        ServerError::from(e)
    })
}

route!(add_inventory => Post "/inventory" impl InventoryManagement, PermissionManagement
    where requires [Role::Admin, Role::Super]);
pub async fn add_inventory<B: InventoryManagement + PermissionManagement>(
    claims: JwtClaims,
    body: web::Json<NewInventoryItem>,
    api: web::Data<InventoryApi<B>>,
    permissions: web::Data<PermissionApi<B>>,
) -> Result<HttpResponse, ServerError> {
    require_permission(&permissions, &claims, INVENTORY_MANAGE).await?;
    let item = api.add_inventory_item(body.into_inner()).await?;
    info!("💻️ {} added inventory item {} for product {}", claims.user_id, item.id, item.product_id);
    Ok(HttpResponse::Created().json(item))
}

route!(bulk_inventory => Post "/inventory/bulk" impl InventoryManagement, PermissionManagement
    where requires [Role::Admin, Role::Super]);
pub async fn bulk_inventory<B: InventoryManagement + PermissionManagement>(
    claims: JwtClaims,
    body: web::Json<BulkInventoryParams>,
    api: web::Data<InventoryApi<B>>,
    permissions: web::Data<PermissionApi<B>>,
) -> Result<HttpResponse, ServerError> {
    require_permission(&permissions, &claims, INVENTORY_MANAGE).await?;
    let params = body.into_inner();
    let options = params.options();
    let result = api.import_inventory(&params.product_id, params.items, options).await?;
    info!("💻️ {} imported {} item(s) as batch {}", claims.user_id, result.count, result.batch_id);
    Ok(HttpResponse::Created().json(result))
}

route!(product_inventory => Get "/inventory/products/{product_id}" impl InventoryManagement, PermissionManagement
    where requires [Role::Admin, Role::Super]);
pub async fn product_inventory<B: InventoryManagement + PermissionManagement>(
    claims: JwtClaims,
    path: web::Path<ProductId>,
    filter: web::Query<InventoryQueryFilter>,
    api: web::Data<InventoryApi<B>>,
    permissions: web::Data<PermissionApi<B>>,
) -> Result<HttpResponse, ServerError> {
    require_permission(&permissions, &claims, INVENTORY_MANAGE).await?;
    let items = api.list_inventory(&path.into_inner(), filter.into_inner()).await?;
    Ok(HttpResponse::Ok().json(items))
}

route!(delete_inventory_item => Delete "/inventory/items/{id}" impl InventoryManagement, PermissionManagement
    where requires [Role::Admin, Role::Super]);
pub async fn delete_inventory_item<B: InventoryManagement + PermissionManagement>(
    claims: JwtClaims,
    path: web::Path<InventoryItemId>,
    api: web::Data<InventoryApi<B>>,
    permissions: web::Data<PermissionApi<B>>,
) -> Result<HttpResponse, ServerError> {
    require_permission(&permissions, &claims, INVENTORY_MANAGE).await?;
    let item = api.delete_inventory_item(&path.into_inner()).await?;
    info!("💻️ {} deleted inventory item {}", claims.user_id, item.id);
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Inventory item {} deleted", item.id))))
}

route!(inventory_stats => Get "/inventory/stats" impl InventoryManagement, PermissionManagement
    where requires [Role::Admin, Role::Super]);
pub async fn inventory_stats<B: InventoryManagement + PermissionManagement>(
    claims: JwtClaims,
    query: web::Query<ProductFilterParams>,
    api: web::Data<InventoryApi<B>>,
    permissions: web::Data<PermissionApi<B>>,
) -> Result<HttpResponse, ServerError> {
    require_permission(&permissions, &claims, INVENTORY_MANAGE).await?;
    let stats = api.inventory_stats(query.product_id.as_ref()).await?;
    Ok(HttpResponse::Ok().json(stats))
}

route!(expiring_inventory => Get "/inventory/expiring" impl InventoryManagement, PermissionManagement
    where requires [Role::Admin, Role::Super]);
pub async fn expiring_inventory<B: InventoryManagement + PermissionManagement>(
    claims: JwtClaims,
    query: web::Query<ExpiringParams>,
    api: web::Data<InventoryApi<B>>,
    permissions: web::Data<PermissionApi<B>>,
) -> Result<HttpResponse, ServerError> {
    require_permission(&permissions, &claims, INVENTORY_MANAGE).await?;
    let items = api.expiring_inventory(query.days).await?;
    Ok(HttpResponse::Ok().json(items))
}

route!(sync_stock => Post "/inventory/sync-stock" impl InventoryManagement, PermissionManagement
    where requires [Role::Admin, Role::Super]);
pub async fn sync_stock<B: InventoryManagement + PermissionManagement>(
    claims: JwtClaims,
    query: web::Query<ProductFilterParams>,
    api: web::Data<StockSyncApi<B>>,
    permissions: web::Data<PermissionApi<B>>,
) -> Result<HttpResponse, ServerError> {
    require_permission(&permissions, &claims, INVENTORY_MANAGE).await?;
    let changed = match &query.product_id {
        Some(id) => api.sync_product(id).await?,
        None => api.sync_all().await?,
    };
    info!("💻️ {} ran a stock sync. {} product(s) corrected", claims.user_id, changed.len());
    Ok(HttpResponse::Ok().json(changed))
}

//----------------------------------------------   Admin: orders & wallets  ----------------------------------------
route!(refund_order => Post "/orders/{id}/refund" impl OrderManagement, PermissionManagement
    where requires [Role::Admin, Role::Super]);
pub async fn refund_order<B: OrderManagement + PermissionManagement>(
    claims: JwtClaims,
    path: web::Path<OrderId>,
    body: web::Json<RefundParams>,
    api: web::Data<CheckoutApi<B>>,
    permissions: web::Data<PermissionApi<B>>,
) -> Result<HttpResponse, ServerError> {
    require_permission(&permissions, &claims, ORDERS_REFUND).await?;
    let order_id = path.into_inner();
    let outcome = api.refund_order(&order_id, body.reason()).await?;
    info!("💻️ {} refunded order {order_id}", claims.user_id);
    Ok(HttpResponse::Ok().json(outcome))
}

route!(adjust_wallet => Post "/wallets/{user_id}/adjust" impl WalletManagement, PermissionManagement
    where requires [Role::Admin, Role::Super]);
pub async fn adjust_wallet<B: WalletManagement + PermissionManagement>(
    claims: JwtClaims,
    path: web::Path<UserId>,
    body: web::Json<WalletAdjustmentParams>,
    api: web::Data<WalletApi<B>>,
    permissions: web::Data<PermissionApi<B>>,
) -> Result<HttpResponse, ServerError> {
    require_permission(&permissions, &claims, WALLETS_ADJUST).await?;
    let user_id = path.into_inner();
    let WalletAdjustmentParams { amount, description } = body.into_inner();
    let result = api.admin_adjust(&user_id, amount, &description, &claims.user_id).await?;
    Ok(HttpResponse::Ok().json(result))
}

route!(update_admin_role => Put "/users/{user_id}/admin-role" impl PermissionManagement
    where requires [Role::Admin, Role::Super]);
pub async fn update_admin_role<B: PermissionManagement>(
    claims: JwtClaims,
    path: web::Path<UserId>,
    body: web::Json<AdminRoleParams>,
    permissions: web::Data<PermissionApi<B>>,
) -> Result<HttpResponse, ServerError> {
    require_permission(&permissions, &claims, USERS_MANAGE).await?;
    let user_id = path.into_inner();
    let role = body.role.as_deref().map(str::trim).filter(|r| !r.is_empty());
    permissions.assign_admin_role(&user_id, role).await?;
    info!("💻️ {} set the admin role of {user_id} to {}", claims.user_id, role.unwrap_or("none"));
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Admin role of {user_id} updated"))))
}

//----------------------------------------------   Admin: catalog  ----------------------------------------------
route!(create_product => Post "/products" impl CatalogManagement, PermissionManagement
    where requires [Role::Admin, Role::Super]);
pub async fn create_product<B: CatalogManagement + PermissionManagement>(
    claims: JwtClaims,
    body: web::Json<NewProduct>,
    api: web::Data<CatalogApi<B>>,
    permissions: web::Data<PermissionApi<B>>,
) -> Result<HttpResponse, ServerError> {
    require_permission(&permissions, &claims, CATALOG_MANAGE).await?;
    let product = api.create_product(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(product))
}

route!(update_product => Patch "/products/{id}" impl CatalogManagement, PermissionManagement
    where requires [Role::Admin, Role::Super]);
pub async fn update_product<B: CatalogManagement + PermissionManagement>(
    claims: JwtClaims,
    path: web::Path<ProductId>,
    body: web::Json<ProductUpdate>,
    api: web::Data<CatalogApi<B>>,
    permissions: web::Data<PermissionApi<B>>,
) -> Result<HttpResponse, ServerError> {
    require_permission(&permissions, &claims, CATALOG_MANAGE).await?;
    let product = api.update_product(&path.into_inner(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(product))
}

route!(create_voucher => Post "/vouchers" impl CatalogManagement, PermissionManagement
    where requires [Role::Admin, Role::Super]);
pub async fn create_voucher<B: CatalogManagement + PermissionManagement>(
    claims: JwtClaims,
    body: web::Json<NewVoucher>,
    api: web::Data<CatalogApi<B>>,
    permissions: web::Data<PermissionApi<B>>,
) -> Result<HttpResponse, ServerError> {
    require_permission(&permissions, &claims, CATALOG_MANAGE).await?;
    let voucher = api.create_voucher(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(voucher))
}

route!(update_voucher => Patch "/vouchers/{id}" impl CatalogManagement, PermissionManagement
    where requires [Role::Admin, Role::Super]);
pub async fn update_voucher<B: CatalogManagement + PermissionManagement>(
    claims: JwtClaims,
    path: web::Path<VoucherId>,
    body: web::Json<VoucherUpdate>,
    api: web::Data<CatalogApi<B>>,
    permissions: web::Data<PermissionApi<B>>,
) -> Result<HttpResponse, ServerError> {
    require_permission(&permissions, &claims, CATALOG_MANAGE).await?;
    let voucher = api.update_voucher(&path.into_inner(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(voucher))
}
