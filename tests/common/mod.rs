#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request},
    response::Response,
    Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, PaginatorTrait, Set};
use serde_json::Value;
use storefront_api::{
    config::AppConfig,
    db,
    entities::{
        cart, order_method, payment_method, product, product_size, product_variant,
        transaction, transaction_item, user,
    },
    events::{Event, EventSender},
    AppState,
};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;

pub const JWT_SECRET: &str =
    "integration-test-secret-0123456789-abcdefghijklmnopqrstuvwxyz-ABCDEFGHIJKLMNOP";

/// Application state backed by a throwaway SQLite file.
pub struct TestApp {
    pub state: AppState,
    pub events: mpsc::Receiver<Event>,
    router: Router,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config(tweak: impl FnOnce(&mut AppConfig)) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let url = format!("sqlite://{}/storefront.db?mode=rwc", dir.path().display());

        let mut cfg = AppConfig::new(url, JWT_SECRET.to_string(), "development".to_string());
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        tweak(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_tx, events) = mpsc::channel(64);
        let state = AppState::new(Arc::new(pool), cfg, EventSender::new(event_tx));
        let router = storefront_api::build_router(state.clone());

        Self {
            state,
            events,
            router,
            _dir: dir,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.state.db
    }

    pub fn token_for(&self, user_id: i32, roles: &[&str]) -> String {
        self.state
            .auth
            .issue_token(
                user_id,
                None,
                roles.iter().map(|r| r.to_string()).collect(),
                chrono::Duration::hours(1),
            )
            .expect("issue test token")
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    // ---- seeding ----

    pub async fn seed_user(
        &self,
        email: &str,
        full_name: Option<&str>,
        address: Option<&str>,
        phone: Option<&str>,
    ) -> user::Model {
        user::ActiveModel {
            full_name: Set(full_name.map(str::to_string)),
            email: Set(email.to_string()),
            address: Set(address.map(str::to_string)),
            phone: Set(phone.map(str::to_string)),
            role: Set("customer".to_string()),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
            ..Default::default()
        }
        .insert(self.db())
        .await
        .expect("seed user")
    }

    /// User with every contact field filled in.
    pub async fn seed_customer(&self, email: &str) -> user::Model {
        self.seed_user(
            email,
            Some("Grace Hopper"),
            Some("1 Harbour Road"),
            Some("555-0100"),
        )
        .await
    }

    pub async fn seed_product(&self, name: &str, price: Decimal, stock: i32) -> product::Model {
        self.seed_discounted_product(name, price, Decimal::ZERO, stock)
            .await
    }

    pub async fn seed_discounted_product(
        &self,
        name: &str,
        price: Decimal,
        discount_percent: Decimal,
        stock: i32,
    ) -> product::Model {
        product::ActiveModel {
            name: Set(name.to_string()),
            price: Set(price),
            discount_percent: Set(discount_percent),
            stock: Set(stock),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
            ..Default::default()
        }
        .insert(self.db())
        .await
        .expect("seed product")
    }

    pub async fn seed_size(&self, name: &str, additional_price: Decimal) -> product_size::Model {
        product_size::ActiveModel {
            name: Set(name.to_string()),
            additional_price: Set(additional_price),
            ..Default::default()
        }
        .insert(self.db())
        .await
        .expect("seed size")
    }

    pub async fn seed_variant(
        &self,
        name: &str,
        additional_price: Decimal,
    ) -> product_variant::Model {
        product_variant::ActiveModel {
            name: Set(name.to_string()),
            additional_price: Set(additional_price),
            ..Default::default()
        }
        .insert(self.db())
        .await
        .expect("seed variant")
    }

    pub async fn seed_order_method(&self, name: &str, fee: Option<Decimal>) -> order_method::Model {
        order_method::ActiveModel {
            name: Set(name.to_string()),
            delivery_fee: Set(fee),
            ..Default::default()
        }
        .insert(self.db())
        .await
        .expect("seed order method")
    }

    pub async fn seed_payment_method(
        &self,
        name: &str,
        fee: Option<Decimal>,
    ) -> payment_method::Model {
        payment_method::ActiveModel {
            name: Set(name.to_string()),
            admin_fee: Set(fee),
            ..Default::default()
        }
        .insert(self.db())
        .await
        .expect("seed payment method")
    }

    pub async fn add_to_cart(
        &self,
        user_id: i32,
        product_id: i32,
        quantity: i32,
    ) -> cart::Model {
        self.add_configured_to_cart(user_id, product_id, None, None, quantity)
            .await
    }

    pub async fn add_configured_to_cart(
        &self,
        user_id: i32,
        product_id: i32,
        size_id: Option<i32>,
        variant_id: Option<i32>,
        quantity: i32,
    ) -> cart::Model {
        cart::ActiveModel {
            user_id: Set(user_id),
            product_id: Set(product_id),
            size_id: Set(size_id),
            variant_id: Set(variant_id),
            quantity: Set(quantity),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
            ..Default::default()
        }
        .insert(self.db())
        .await
        .expect("seed cart line")
    }

    // ---- inspection ----

    pub async fn stock_of(&self, product_id: i32) -> i32 {
        product::Entity::find_by_id(product_id)
            .one(self.db())
            .await
            .expect("load product")
            .expect("product exists")
            .stock
    }

    pub async fn transaction_count(&self) -> u64 {
        transaction::Entity::find()
            .count(self.db())
            .await
            .expect("count transactions")
    }

    pub async fn transaction_item_count(&self) -> u64 {
        transaction_item::Entity::find()
            .count(self.db())
            .await
            .expect("count transaction items")
    }

    pub async fn cart_count(&self) -> u64 {
        cart::Entity::find()
            .count(self.db())
            .await
            .expect("count cart lines")
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}
