use keyshop_engine::{
    db_types::{Role, UserId},
    shop_api::permission_api::{CATALOG_MANAGE, INVENTORY_MANAGE, ORDERS_REFUND, USERS_MANAGE, WALLETS_ADJUST},
    test_utils::new_test_database,
    traits::PermissionError,
    PermissionApi,
    PermissionCache,
    SqliteDatabase,
};
use sqlx::{migrate::MigrateDatabase, Sqlite};

async fn tear_down(mut db: SqliteDatabase) {
    let _ = db.close().await;
    let _ = Sqlite::drop_database(db.url()).await;
}

#[tokio::test]
async fn roles_grant_their_permissions() {
    let db = new_test_database(2).await;
    let api = PermissionApi::new(db.clone(), PermissionCache::default());
    let keeper = UserId::from("kate");
    let support = UserId::from("sam");
    api.assign_admin_role(&keeper, Some("stock_keeper")).await.unwrap();
    api.assign_admin_role(&support, Some("support")).await.unwrap();

    assert!(api.has_permission(&keeper, Role::Admin, INVENTORY_MANAGE).await.unwrap());
    assert!(api.has_permission(&keeper, Role::Admin, CATALOG_MANAGE).await.unwrap());
    assert!(!api.has_permission(&keeper, Role::Admin, ORDERS_REFUND).await.unwrap());
    assert!(api.has_permission(&support, Role::Admin, WALLETS_ADJUST).await.unwrap());
    let err = api.require(&support, Role::Admin, INVENTORY_MANAGE).await.unwrap_err();
    assert!(matches!(err, PermissionError::Forbidden(p) if p == INVENTORY_MANAGE));

    // Super admins need no role at all
    let root = UserId::from("root");
    assert!(api.permissions(&root).await.unwrap().is_empty());
    api.require(&root, Role::Super, USERS_MANAGE).await.unwrap();

    let err = api.assign_admin_role(&root, Some("janitor")).await.unwrap_err();
    assert!(matches!(err, PermissionError::RoleNotFound(_)));
    tear_down(db).await;
}

#[tokio::test]
async fn role_changes_apply_immediately() {
    let db = new_test_database(2).await;
    let api = PermissionApi::new(db.clone(), PermissionCache::default());
    let user = UserId::from("kate");
    api.assign_admin_role(&user, Some("support")).await.unwrap();
    assert!(api.has_permission(&user, Role::Admin, ORDERS_REFUND).await.unwrap());
    assert_eq!(api.cache().len(), 1);

    api.assign_admin_role(&user, Some("stock_keeper")).await.unwrap();
    assert!(!api.has_permission(&user, Role::Admin, ORDERS_REFUND).await.unwrap());
    assert!(api.has_permission(&user, Role::Admin, INVENTORY_MANAGE).await.unwrap());

    api.assign_admin_role(&user, None).await.unwrap();
    assert!(api.permissions(&user).await.unwrap().is_empty());
    tear_down(db).await;
}
