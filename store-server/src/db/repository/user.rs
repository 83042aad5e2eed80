//! User Repository

use super::{RepoError, RepoResult};
use shared::models::{User, UserCreate};
use sqlx::SqlitePool;

const USER_COLS: &str = "id, email, name, created_at";

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<User>> {
    let row = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLS} FROM user WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> RepoResult<Option<User>> {
    let row = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLS} FROM user WHERE email = ?"))
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn create(pool: &SqlitePool, data: UserCreate) -> RepoResult<User> {
    if find_by_email(pool, &data.email).await?.is_some() {
        return Err(RepoError::Duplicate(format!(
            "User '{}' already exists",
            data.email
        )));
    }

    let id = shared::util::snowflake_id();
    let now = shared::util::now_millis();
    sqlx::query("INSERT INTO user (id, email, name, created_at) VALUES (?, ?, ?, ?)")
        .bind(id)
        .bind(&data.email)
        .bind(&data.name)
        .bind(now)
        .execute(pool)
        .await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create user".into()))
}
