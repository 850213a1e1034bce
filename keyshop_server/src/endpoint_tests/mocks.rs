use chrono::Duration;
use keyshop_engine::{
    db_types::{
        CartItem,
        Delivery,
        DepositRequest,
        DepositRequestId,
        InventoryItem,
        InventoryItemId,
        NewDepositRequest,
        NewInventoryItem,
        NewWalletTransaction,
        Order,
        OrderId,
        OrderItem,
        OrderItemId,
        OrderVoucher,
        PaymentTransaction,
        ProductId,
        UserId,
        Voucher,
        Wallet,
        WalletTransaction,
    },
    traits::{
        CheckoutOutcome,
        CheckoutRequest,
        DepositQueryFilter,
        InventoryError,
        InventoryManagement,
        InventoryQueryFilter,
        InventoryStats,
        OrderFlowError,
        OrderManagement,
        OrderStats,
        Paging,
        PermissionError,
        PermissionManagement,
        RefundOutcome,
        StockSyncResult,
        WalletError,
        WalletManagement,
        WalletStats,
        WalletTransactionFilter,
    },
};
use mockall::mock;

mock! {
    pub WalletManager {}
    impl Clone for WalletManager {
        fn clone(&self) -> Self;
    }
    impl WalletManagement for WalletManager {
        async fn fetch_or_create_wallet(&self, user_id: &UserId) -> Result<Wallet, WalletError>;
        async fn post_transaction(&self, user_id: &UserId, tx: NewWalletTransaction) -> Result<WalletTransaction, WalletError>;
        async fn wallet_stats(&self, user_id: &UserId) -> Result<WalletStats, WalletError>;
        async fn fetch_wallet_transactions(&self, user_id: &UserId, filter: WalletTransactionFilter) -> Result<Vec<WalletTransaction>, WalletError>;
        async fn fetch_wallet_transactions_for_reference(&self, reference_type: &str, reference_id: &str) -> Result<Vec<WalletTransaction>, WalletError>;
        async fn insert_deposit_request(&self, request: NewDepositRequest) -> Result<DepositRequest, WalletError>;
        async fn fetch_deposit_request(&self, user_id: &UserId, id: &DepositRequestId) -> Result<Option<DepositRequest>, WalletError>;
        async fn fetch_deposit_requests(&self, user_id: &UserId, filter: DepositQueryFilter) -> Result<Vec<DepositRequest>, WalletError>;
        async fn expire_deposit_requests(&self) -> Result<Vec<DepositRequest>, WalletError>;
    }
}

mock! {
    pub OrderManager {}
    impl Clone for OrderManager {
        fn clone(&self) -> Self;
    }
    impl OrderManagement for OrderManager {
        async fn fetch_cart(&self, user_id: &UserId) -> Result<Vec<CartItem>, OrderFlowError>;
        async fn add_to_cart(&self, user_id: &UserId, product_id: &ProductId, quantity: i64) -> Result<CartItem, OrderFlowError>;
        async fn update_cart_item(&self, user_id: &UserId, product_id: &ProductId, quantity: i64) -> Result<Option<CartItem>, OrderFlowError>;
        async fn remove_from_cart(&self, user_id: &UserId, product_id: &ProductId) -> Result<bool, OrderFlowError>;
        async fn clear_cart(&self, user_id: &UserId) -> Result<u64, OrderFlowError>;
        async fn fetch_voucher_by_code(&self, code: &str) -> Result<Option<Voucher>, OrderFlowError>;
        async fn checkout(&self, user_id: &UserId, request: &CheckoutRequest) -> Result<CheckoutOutcome, OrderFlowError>;
        async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, OrderFlowError>;
        async fn fetch_order_items(&self, order_id: &OrderId) -> Result<Vec<OrderItem>, OrderFlowError>;
        async fn fetch_order_voucher(&self, order_id: &OrderId) -> Result<Option<OrderVoucher>, OrderFlowError>;
        async fn fetch_payment_for_order(&self, order_id: &OrderId) -> Result<Option<PaymentTransaction>, OrderFlowError>;
        async fn start_payment_for_order(&self, order_id: &OrderId, provider: &str) -> Result<PaymentTransaction, OrderFlowError>;
        async fn fetch_orders_for_user(&self, user_id: &UserId, paging: Paging) -> Result<Vec<Order>, OrderFlowError>;
        async fn order_stats(&self, user_id: &UserId) -> Result<OrderStats, OrderFlowError>;
        async fn refund_order(&self, order_id: &OrderId, reason: &str) -> Result<RefundOutcome, OrderFlowError>;
    }
}

// Admin routes need the inventory and the permission store behind the same backend.
mock! {
    pub InventoryManager {}
    impl Clone for InventoryManager {
        fn clone(&self) -> Self;
    }
    impl InventoryManagement for InventoryManager {
        async fn insert_inventory_items(&self, items: Vec<NewInventoryItem>) -> Result<Vec<InventoryItem>, InventoryError>;
        async fn fetch_inventory_item(&self, id: &InventoryItemId) -> Result<Option<InventoryItem>, InventoryError>;
        async fn fetch_inventory_for_product(&self, product_id: &ProductId, filter: InventoryQueryFilter) -> Result<Vec<InventoryItem>, InventoryError>;
        async fn available_inventory_count(&self, product_id: &ProductId) -> Result<i64, InventoryError>;
        async fn delete_inventory_item(&self, id: &InventoryItemId) -> Result<InventoryItem, InventoryError>;
        async fn inventory_stats<'a>(&self, product_id: Option<&'a ProductId>) -> Result<Vec<InventoryStats>, InventoryError>;
        async fn expiring_inventory(&self, within: Duration) -> Result<Vec<InventoryItem>, InventoryError>;
        async fn allocate_inventory_for_order(&self, order_id: &OrderId) -> Result<Vec<Delivery>, InventoryError>;
        async fn refund_inventory(&self, order_item_id: &OrderItemId) -> Result<Vec<InventoryItem>, InventoryError>;
        async fn sync_stock<'a>(&self, product_id: Option<&'a ProductId>) -> Result<Vec<StockSyncResult>, InventoryError>;
    }
    impl PermissionManagement for InventoryManager {
        async fn fetch_permissions(&self, user_id: &UserId) -> Result<Vec<String>, PermissionError>;
        async fn assign_admin_role<'a>(&self, user_id: &UserId, role: Option<&'a str>) -> Result<(), PermissionError>;
    }
}
