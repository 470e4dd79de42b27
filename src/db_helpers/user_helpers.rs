use chrono::Utc;
use sqlx::{Sqlite, SqlitePool};

use crate::data_formats::{CreateUserRequest, PageQueryParams, PageWindow};
use crate::errors::RequestError;
use crate::models::UserAccount;

use super::count_rows;

const USER_QUERY: &str = r#"
    SELECT users.id                                                         AS "id",
           users.name                                                       AS "name",
           users.email                                                      AS "email",
           users.image                                                      AS "image",
           users.email_verified                                             AS "email_verified",
           users.created_at                                                 AS "created_at",
           (SELECT COUNT(*) FROM accounts WHERE accounts.user_id = users.id) AS "accounts_count",
           (SELECT COUNT(*) FROM sessions WHERE sessions.user_id = users.id) AS "sessions_count"
    FROM   users
"#;

pub async fn list_users_in_db(
    pool: &SqlitePool,
    PageQueryParams { page, limit }: PageQueryParams,
) -> Result<(Vec<UserAccount>, i64, PageWindow), RequestError> {
    let window = PageWindow::new(page, limit);
    let total = count_rows(pool, "users", "", Vec::new()).await?;
    let query = format!("{USER_QUERY} ORDER BY users.created_at DESC, users.id DESC LIMIT ? OFFSET ?");
    let users = sqlx::query_as::<Sqlite, UserAccount>(&query)
        .bind(window.limit as i64)
        .bind(window.offset())
        .fetch_all(pool)
        .await?;
    Ok((users, total, window))
}

pub async fn get_user_by_id(pool: &SqlitePool, id: i64) -> Result<Option<UserAccount>, RequestError> {
    let query = format!("{USER_QUERY} WHERE users.id = ?");
    let user = sqlx::query_as::<Sqlite, UserAccount>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn insert_user(
    pool: &SqlitePool,
    CreateUserRequest { name, email, image }: CreateUserRequest,
) -> Result<UserAccount, RequestError> {
    let mut tx = pool.begin().await?;
    let id = sqlx::query_scalar::<Sqlite, i64>(
        r#"
        INSERT INTO users (name, email, image, created_at)
        VALUES (?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(name.filter(|n| !n.trim().is_empty()))
    .bind(email.trim().to_lowercase())
    .bind(image)
    .bind(Utc::now())
    .fetch_one(&mut tx)
    .await?;
    tx.commit().await?;

    match get_user_by_id(pool, id).await? {
        Some(user) => Ok(user),
        None => Err(RequestError::ServerError),
    }
}

pub async fn delete_user_in_db(pool: &SqlitePool, id: i64) -> Result<(), RequestError> {
    let mut tx = pool.begin().await?;
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(&mut tx)
        .await?;
    if result.rows_affected() == 0 {
        return Err(RequestError::NotFound("User not found"));
    }
    tx.commit().await?;
    Ok(())
}
