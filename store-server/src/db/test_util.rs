//! Test fixtures: in-memory pool + seed helpers
//!
//! Shared by the repository, pricing and order action tests. The pool runs
//! the real migrations; a single connection keeps the in-memory database
//! alive and shared across queries.

use shared::models::{Discount, DiscountMethod, DiscountScope, DiscountType};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

/// Create an in-memory SQLite pool with the full schema applied.
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();

    sqlx::query("PRAGMA foreign_keys = ON;")
        .execute(&pool)
        .await
        .unwrap();

    sqlx::migrate!("./migrations").run(&pool).await.unwrap();

    pool
}

/// Insert a user created at the given timestamp, returning its id.
pub async fn seed_user(pool: &SqlitePool, id: i64, email: &str, created_at: i64) -> i64 {
    sqlx::query("INSERT INTO user (id, email, name, created_at) VALUES (?, ?, ?, ?)")
        .bind(id)
        .bind(email)
        .bind("Test User")
        .bind(created_at)
        .execute(pool)
        .await
        .unwrap();
    id
}

/// Insert an active product, returning its id.
pub async fn seed_product(pool: &SqlitePool, id: i64, name: &str, price: f64, stock: i64) -> i64 {
    sqlx::query(
        "INSERT INTO product (id, name, price, stock, is_active, created_at, updated_at) VALUES (?, ?, ?, ?, 1, 0, 0)",
    )
    .bind(id)
    .bind(name)
    .bind(price)
    .bind(stock)
    .execute(pool)
    .await
    .unwrap();
    id
}

/// Insert a variant for a product, returning its id.
pub async fn seed_variant(
    pool: &SqlitePool,
    id: i64,
    product_id: i64,
    name: &str,
    price: f64,
    stock: i64,
) -> i64 {
    sqlx::query(
        "INSERT INTO product_variant (id, product_id, name, price, stock, is_active) VALUES (?, ?, ?, ?, ?, 1)",
    )
    .bind(id)
    .bind(product_id)
    .bind(name)
    .bind(price)
    .bind(stock)
    .execute(pool)
    .await
    .unwrap();
    id
}

/// Builder for discount fixtures; `seed()` inserts and returns the row.
pub struct DiscountFixture {
    pub id: i64,
    pub code: String,
    pub discount_type: DiscountType,
    pub scope: DiscountScope,
    pub method: DiscountMethod,
    pub is_stackable: bool,
    pub value: f64,
    pub min_order: Option<f64>,
    pub max_uses: Option<i64>,
    pub used_count: i64,
    pub is_active: bool,
    pub starts_at: Option<i64>,
    pub expires_at: Option<i64>,
    pub created_at: i64,
    pub product_ids: Vec<i64>,
}

impl DiscountFixture {
    pub fn new(id: i64, code: &str) -> Self {
        Self {
            id,
            code: code.to_string(),
            discount_type: DiscountType::Percentage,
            scope: DiscountScope::Order,
            method: DiscountMethod::Code,
            is_stackable: false,
            value: 10.0,
            min_order: None,
            max_uses: None,
            used_count: 0,
            is_active: true,
            starts_at: None,
            expires_at: None,
            created_at: 0,
            product_ids: vec![],
        }
    }

    pub fn fixed(mut self, value: f64) -> Self {
        self.discount_type = DiscountType::Fixed;
        self.value = value;
        self
    }

    pub fn percentage(mut self, value: f64) -> Self {
        self.discount_type = DiscountType::Percentage;
        self.value = value;
        self
    }

    pub fn auto(mut self) -> Self {
        self.method = DiscountMethod::Auto;
        self
    }

    pub fn stackable(mut self) -> Self {
        self.is_stackable = true;
        self
    }

    pub fn product_scoped(mut self, product_ids: Vec<i64>) -> Self {
        self.scope = DiscountScope::Product;
        self.product_ids = product_ids;
        self
    }

    pub fn min_order(mut self, min: f64) -> Self {
        self.min_order = Some(min);
        self
    }

    pub fn max_uses(mut self, max: i64, used: i64) -> Self {
        self.max_uses = Some(max);
        self.used_count = used;
        self
    }

    pub fn window(mut self, starts_at: Option<i64>, expires_at: Option<i64>) -> Self {
        self.starts_at = starts_at;
        self.expires_at = expires_at;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn created_at(mut self, ts: i64) -> Self {
        self.created_at = ts;
        self
    }

    pub async fn seed(self, pool: &SqlitePool) -> Discount {
        sqlx::query(
            "INSERT INTO discount (id, code, discount_type, scope, method, is_stackable, value, min_order, max_uses, used_count, is_active, starts_at, expires_at, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(self.id)
        .bind(&self.code)
        .bind(self.discount_type)
        .bind(self.scope)
        .bind(self.method)
        .bind(self.is_stackable)
        .bind(self.value)
        .bind(self.min_order)
        .bind(self.max_uses)
        .bind(self.used_count)
        .bind(self.is_active)
        .bind(self.starts_at)
        .bind(self.expires_at)
        .bind(self.created_at)
        .bind(self.created_at)
        .execute(pool)
        .await
        .unwrap();

        for pid in &self.product_ids {
            sqlx::query("INSERT INTO discount_product (discount_id, product_id) VALUES (?, ?)")
                .bind(self.id)
                .bind(pid)
                .execute(pool)
                .await
                .unwrap();
        }

        super::repository::discount::find_by_id(pool, self.id)
            .await
            .unwrap()
            .unwrap()
    }
}
