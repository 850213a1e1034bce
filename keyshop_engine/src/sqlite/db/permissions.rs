use chrono::Utc;
use sqlx::SqliteConnection;

use crate::db_types::UserId;

pub async fn fetch_permissions(user_id: &UserId, conn: &mut SqliteConnection) -> Result<Vec<String>, sqlx::Error> {
    let permissions = sqlx::query_scalar(
        r#"
            SELECT p.name FROM users u
            JOIN admin_roles r ON r.id = u.admin_role_id AND r.is_active = 1
            JOIN role_permissions rp ON rp.role_id = r.id
            JOIN permissions p ON p.id = rp.permission_id
            WHERE u.id = $1
            ORDER BY p.name
        "#,
    )
    .bind(user_id)
    .fetch_all(conn)
    .await?;
    Ok(permissions)
}

pub async fn fetch_role_id(name: &str, conn: &mut SqliteConnection) -> Result<Option<String>, sqlx::Error> {
    let id = sqlx::query_scalar("SELECT id FROM admin_roles WHERE name = $1").bind(name).fetch_optional(conn).await?;
    Ok(id)
}

pub async fn set_admin_role(
    user_id: &UserId,
    role_id: Option<String>,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            INSERT INTO users (id, admin_role_id, created_at, updated_at) VALUES ($1, $2, $3, $3)
            ON CONFLICT (id) DO UPDATE SET admin_role_id = excluded.admin_role_id, updated_at = excluded.updated_at;
        "#,
    )
    .bind(user_id)
    .bind(role_id)
    .bind(Utc::now())
    .execute(conn)
    .await?;
    Ok(())
}
